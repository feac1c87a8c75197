//! Résolution des heures locales dans un fuseau IANA.
//!
//! Une heure murale peut ne pas exister (passage à l'heure d'été) ou exister
//! deux fois (retour à l'heure d'hiver). Les rotations et les règles passent
//! toutes par ces fonctions pour trancher de la même façon.

use chrono::{
    DateTime, Duration, DurationRound, LocalResult, NaiveDateTime, Offset, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Instance retenue quand une heure locale se répète.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeated {
    First,
    Last,
}

/// Convertit une heure murale en instant UTC.
///
/// Heure répétée : `repeated` choisit la première ou la seconde occurrence.
/// Heure inexistante : on retourne l'instant de la transition, c'est-à-dire la
/// première heure locale valide après le trou (02:30 un jour de 02:00→03:00
/// donne 03:00).
pub fn resolve_local(tz: Tz, naive: NaiveDateTime, repeated: Repeated) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(first, last) => match repeated {
            Repeated::First => first.with_timezone(&Utc),
            Repeated::Last => last.with_timezone(&Utc),
        },
        LocalResult::None => after_gap(tz, naive),
    }
}

fn after_gap(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    let mut probe = naive
        .with_second(0)
        .and_then(|n| n.with_nanosecond(0))
        .unwrap_or(naive);
    for _ in 0..MINUTES_PER_DAY {
        probe += Duration::minutes(1);
        if let Some(t) = tz.from_local_datetime(&probe).earliest() {
            return t.with_timezone(&Utc);
        }
    }

    // aucun fuseau réel n'a de trou de plus d'un jour
    let before = tz
        .offset_from_utc_datetime(&(naive - Duration::days(1)))
        .fix();
    Utc.from_utc_datetime(&(naive - Duration::seconds(i64::from(before.local_minus_utc()))))
}

/// Heure murale de `t` dans `tz`.
pub fn local_naive(t: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    t.with_timezone(&tz).naive_local()
}

/// Tronque à la minute (les bornes de rotation et de règle sont à la minute).
pub fn truncate_minute(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_trunc(Duration::minutes(1)).unwrap_or(t)
}
