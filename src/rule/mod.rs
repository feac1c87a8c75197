//! Règles de planning : fenêtres horaires hebdomadaires récurrentes.
//!
//! Les heures `start`/`end` sont des heures murales du fuseau du planning.
//! Trois formes :
//! - `start < end` : fenêtre dans la journée (08:00-20:00)
//! - `start > end` : fenêtre de nuit, finit le lendemain (20:00-08:00)
//! - `start == end` : 24 h, les jours actifs consécutifs s'enchaînent

mod weekday;

pub use weekday::WeekdayFilter;

use crate::model::{RuleId, ScheduleId, Target};
use crate::timeutil::{self, Repeated};
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub schedule_id: ScheduleId,
    #[serde(default = "WeekdayFilter::every_day")]
    pub weekdays: WeekdayFilter,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub target: Target,
}

impl Rule {
    /// Heures tronquées à la minute.
    pub fn new(
        schedule_id: ScheduleId,
        weekdays: WeekdayFilter,
        start: NaiveTime,
        end: NaiveTime,
        target: Target,
    ) -> Self {
        Self {
            id: RuleId::random(),
            schedule_id,
            weekdays,
            start: truncate_clock(start),
            end: truncate_clock(end),
            target,
        }
    }

    /// Règle active en permanence.
    pub fn always(schedule_id: ScheduleId, target: Target) -> Self {
        Self::new(
            schedule_id,
            WeekdayFilter::every_day(),
            NaiveTime::MIN,
            NaiveTime::MIN,
            target,
        )
    }

    pub fn always_active(&self) -> bool {
        self.weekdays.is_always() && self.start == self.end
    }

    pub fn never_active(&self) -> bool {
        self.weekdays.is_never()
    }

    /// La règle est-elle active à l'instant `t` ?
    pub fn is_active(&self, t: DateTime<Utc>, tz: Tz) -> bool {
        if self.never_active() {
            return false;
        }
        if self.always_active() {
            return true;
        }
        self.start_time(t, tz).is_some_and(|start| start <= t)
    }

    /// Début de la fenêtre active contenant `t` (dans le passé), ou de la
    /// prochaine fenêtre si la règle est inactive à `t`.
    ///
    /// `None` pour une règle toujours ou jamais active.
    pub fn start_time(&self, t: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        if self.never_active() || self.always_active() {
            return None;
        }
        let t = timeutil::truncate_minute(t);
        let today = timeutil::local_naive(t, tz).date();
        let yesterday = today.pred_opt()?;
        let today_on = self.weekdays.day(today.weekday());
        let yesterday_on = self.weekdays.day(yesterday.weekday());
        let before_end_today = t < last_of_day(self.end, today, tz);

        if self.start == self.end {
            let day = if today_on {
                self.weekdays.run_start(today)?
            } else if yesterday_on && before_end_today {
                // la série finie hier déborde jusqu'à `end` aujourd'hui
                self.weekdays.run_start(yesterday)?
            } else {
                self.weekdays.next_active(today)?
            };
            return Some(first_of_day(self.start, day, tz));
        }

        let day = if self.start < self.end {
            if today_on && before_end_today {
                today
            } else {
                self.weekdays.next_active(today)?
            }
        } else if yesterday_on && before_end_today {
            yesterday
        } else if today_on {
            today
        } else {
            self.weekdays.next_active(today)?
        };
        Some(first_of_day(self.start, day, tz))
    }

    /// Fin de la fenêtre qui commence à `start_time(t)`.
    pub fn end_time(&self, t: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let start = self.start_time(t, tz)?;
        let start_day = timeutil::local_naive(start, tz).date();
        let end_day = if self.start < self.end {
            start_day
        } else if self.start > self.end {
            start_day.checked_add_days(Days::new(1))?
        } else {
            self.weekdays.next_inactive(start_day)?
        };
        Some(last_of_day(self.end, end_day, tz))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.always_active() {
            return f.write_str("Always");
        }
        if self.never_active() {
            return f.write_str("Never");
        }
        write!(
            f,
            "{}-{} {}",
            format_clock(self.start),
            format_clock(self.end),
            self.weekdays
        )
    }
}

/// Première occurrence de l'heure murale `clock` le jour `day`.
fn first_of_day(clock: NaiveTime, day: NaiveDate, tz: Tz) -> DateTime<Utc> {
    timeutil::resolve_local(tz, day.and_time(clock), Repeated::First)
}

/// Dernière occurrence de l'heure murale `clock` le jour `day`.
fn last_of_day(clock: NaiveTime, day: NaiveDate, tz: Tz) -> DateTime<Utc> {
    timeutil::resolve_local(tz, day.and_time(clock), Repeated::Last)
}

fn truncate_clock(t: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(t)
}

fn format_clock(t: NaiveTime) -> String {
    if t.minute() == 0 {
        t.format("%-I%P").to_string()
    } else {
        t.format("%-I:%M%P").to_string()
    }
}
