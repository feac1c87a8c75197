use crate::model::{ParticipantId, RotationShift, Shift, UserId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Intervalle fusionnable.
trait Span {
    fn start(&self) -> DateTime<Utc>;
    fn end(&self) -> DateTime<Utc>;
    fn extend_to(&mut self, end: DateTime<Utc>);
}

impl Span for Shift {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }
    fn end(&self) -> DateTime<Utc> {
        self.end
    }
    fn extend_to(&mut self, end: DateTime<Utc>) {
        self.end = end;
    }
}

impl Span for RotationShift {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }
    fn end(&self) -> DateTime<Utc> {
        self.end
    }
    fn extend_to(&mut self, end: DateTime<Utc>) {
        self.end = end;
    }
}

/// Trie par (début, fin, utilisateur).
pub fn sort_shifts(shifts: &mut [Shift]) {
    shifts.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(a.end.cmp(&b.end))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
}

/// Fusionne, par utilisateur, les shifts qui se chevauchent ou se touchent.
///
/// Jamais de fusion entre deux utilisateurs différents ; le résultat est
/// trié comme par [`sort_shifts`].
pub fn merge_shifts(mut shifts: Vec<Shift>) -> Vec<Shift> {
    sort_shifts(&mut shifts);
    let mut by_user: BTreeMap<UserId, Vec<Shift>> = BTreeMap::new();
    for s in shifts {
        by_user.entry(s.user_id.clone()).or_default().push(s);
    }

    let mut merged: Vec<Shift> = by_user.into_values().flat_map(coalesce).collect();
    sort_shifts(&mut merged);
    merged
}

/// Même fusion pour les créneaux de rotation, par participant.
pub fn merge_rotation_shifts(mut shifts: Vec<RotationShift>) -> Vec<RotationShift> {
    shifts.sort_by_key(|s| (s.start, s.end));
    let mut by_part: BTreeMap<ParticipantId, Vec<RotationShift>> = BTreeMap::new();
    for s in shifts {
        by_part.entry(s.participant_id.clone()).or_default().push(s);
    }

    let mut merged: Vec<RotationShift> = by_part.into_values().flat_map(coalesce).collect();
    merged.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(a.end.cmp(&b.end))
            .then_with(|| a.participant_id.cmp(&b.participant_id))
    });
    merged
}

/// `sorted` doit être trié par début.
fn coalesce<T: Span>(sorted: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(sorted.len());
    for item in sorted {
        match out.last_mut() {
            Some(cur) if item.start() <= cur.end() => {
                if item.end() > cur.end() {
                    cur.extend_to(item.end());
                }
            }
            _ => out.push(item),
        }
    }
    out
}
