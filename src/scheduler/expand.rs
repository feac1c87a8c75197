//! Expansion d'une règle en shifts concrets.

use super::CalcError;
use crate::config::EngineOptions;
use crate::error::{IterationGuard, InvariantViolation};
use crate::model::{Rotation, RotationId, RotationState, Shift, Target, UserId};
use crate::rotation::{self, RotationClock};
use crate::rule::Rule;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Accès aux rotations ciblées par les règles d'un planning.
pub trait RotationLookup {
    fn rotation(&self, id: &RotationId) -> Option<&Rotation>;
    fn state(&self, id: &RotationId) -> Option<&RotationState>;
    /// Utilisateurs de la rotation, dans l'ordre des positions.
    fn participant_users(&self, id: &RotationId) -> Vec<UserId>;
}

/// Fenêtre active d'une règle, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Fenêtres actives de `rule` rencontrées sur `[start, end]`.
///
/// Les fenêtres ne sont pas tronquées : la première peut commencer avant
/// `start`, la dernière finir après `end`.
pub fn rule_windows(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    rule: &Rule,
    tz: Tz,
    max_iterations: usize,
) -> Result<Vec<Window>, InvariantViolation> {
    if end < start || rule.never_active() {
        return Ok(Vec::new());
    }
    if rule.always_active() {
        return Ok(vec![Window { start, end }]);
    }

    let mut guard = IterationGuard::new("rule expansion", max_iterations);
    let mut windows = Vec::new();
    let mut next = rule.start_time(start, tz);
    while let Some(ws) = next {
        let Some(we) = rule.end_time(ws, tz) else {
            break;
        };
        guard.tick()?;
        windows.push(Window { start: ws, end: we });
        next = rule.start_time(we, tz).filter(|s| *s <= end);
    }
    Ok(windows)
}

/// Shifts produits par une règle sur `[start, end)`.
///
/// Une règle ciblant une rotation ne produit rien avant le curseur persisté
/// de la rotation, ni si la rotation n'a pas d'état ou pas de participant.
pub fn expand_rule<L: RotationLookup + ?Sized>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    rule: &Rule,
    tz: Tz,
    lookup: &L,
    opts: &EngineOptions,
) -> Result<Vec<Shift>, CalcError> {
    let windows = rule_windows(start, end, rule, tz, opts.max_iterations)?;
    let rotation_id = match &rule.target {
        Target::User(user_id) => {
            return Ok(windows
                .into_iter()
                .map(|w| Shift::new(w.start, w.end, user_id.clone()))
                .collect())
        }
        Target::Rotation(id) => id,
    };
    if windows.is_empty() {
        return Ok(Vec::new());
    }

    let Some(state) = lookup.state(rotation_id) else {
        return Ok(Vec::new());
    };
    if end <= state.shift_start {
        return Ok(Vec::new());
    }
    let Some(rot) = lookup.rotation(rotation_id) else {
        return Ok(Vec::new());
    };
    let users = lookup.participant_users(rotation_id);
    let clock = rotation::clock_as_of(rot, state.shift_start, opts)?;
    let shifts = split_by_rotation(windows, state, &clock, &users, opts.max_iterations)?;
    Ok(shifts)
}

/// Découpe les fenêtres aux relèves de la rotation, chaque morceau revenant
/// au participant de garde à ce moment.
fn split_by_rotation(
    windows: Vec<Window>,
    state: &RotationState,
    clock: &RotationClock,
    users: &[UserId],
    max_iterations: usize,
) -> Result<Vec<Shift>, InvariantViolation> {
    let windows: Vec<Window> = windows
        .into_iter()
        .filter(|w| w.end >= state.shift_start)
        .collect();
    let (Some(first), Some(mut cursor)) =
        (windows.first(), RotationCursor::new(clock, users, state))
    else {
        return Ok(Vec::new());
    };
    cursor.seek(first.start);

    let mut guard = IterationGuard::new("rotation cursor", max_iterations);
    let mut shifts = Vec::with_capacity(windows.len());
    for w in &windows {
        if w.end < cursor.shift_start {
            continue;
        }
        cursor.seek(w.start);
        let mut start = w.start.max(cursor.shift_start);
        while cursor.shift_end < w.end {
            guard.tick()?;
            shifts.push(Shift::new(start, cursor.shift_end, cursor.current().clone()));
            start = cursor.shift_end;
            cursor.next();
        }
        if start < w.end {
            shifts.push(Shift::new(start, w.end, cursor.current().clone()));
        }
    }
    Ok(shifts)
}

/// Curseur roulant sur les shifts d'une rotation.
pub(crate) struct RotationCursor<'a, P> {
    clock: &'a RotationClock,
    members: &'a [P],
    position: usize,
    pub(crate) shift_start: DateTime<Utc>,
    pub(crate) shift_end: DateTime<Utc>,
}

impl<'a, P> RotationCursor<'a, P> {
    /// `None` sans membre.
    pub(crate) fn new(
        clock: &'a RotationClock,
        members: &'a [P],
        state: &RotationState,
    ) -> Option<Self> {
        if members.is_empty() {
            return None;
        }
        Some(Self {
            clock,
            members,
            position: state.position % members.len(),
            shift_start: state.shift_start,
            shift_end: clock.end_time(state.shift_start),
        })
    }

    pub(crate) fn current(&self) -> &'a P {
        &self.members[self.position]
    }

    pub(crate) fn next(&mut self) {
        self.position = (self.position + 1) % self.members.len();
        self.shift_start = self.shift_end;
        self.shift_end = self.clock.end_time(self.shift_start);
    }

    /// Avance jusqu'au shift contenant `t` ; sans effet si le shift courant
    /// finit après `t`.
    ///
    /// La position avance d'autant de relèves distinctes que `next` en
    /// franchirait ; les bornes sont recalculées depuis `t`
    /// (`start_time(t)`, `end_time(t)`) et non depuis le curseur.
    pub(crate) fn seek(&mut self, t: DateTime<Utc>) {
        if self.shift_end > t {
            return;
        }
        let handoffs = self.clock.handoffs_between(self.shift_start, t);
        self.position = (self.position + handoffs % self.members.len()) % self.members.len();
        self.shift_start = self.clock.start_time(t);
        self.shift_end = self.clock.end_time(t);
    }
}
