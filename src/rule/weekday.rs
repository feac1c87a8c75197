use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

const SHORT_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Jours actifs d'une règle, dimanche en premier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekdayFilter([bool; 7]);

impl WeekdayFilter {
    pub const fn new(days: [bool; 7]) -> Self {
        Self(days)
    }

    pub const fn every_day() -> Self {
        Self([true; 7])
    }

    pub const fn never() -> Self {
        Self([false; 7])
    }

    pub fn from_days(days: &[Weekday]) -> Self {
        let mut f = Self::never();
        for d in days {
            f.set_day(*d, true);
        }
        f
    }

    pub fn day(&self, d: Weekday) -> bool {
        self.0[d.num_days_from_sunday() as usize]
    }

    pub fn set_day(&mut self, d: Weekday, enabled: bool) {
        self.0[d.num_days_from_sunday() as usize] = enabled;
    }

    pub fn is_always(&self) -> bool {
        self.0.iter().all(|d| *d)
    }

    pub fn is_never(&self) -> bool {
        !self.0.iter().any(|d| *d)
    }

    /// Premier jour de la série de jours actifs contenant `date`.
    ///
    /// Si `date` est inactif, le prochain jour actif.
    pub fn run_start(&self, date: NaiveDate) -> Option<NaiveDate> {
        let active = (0..7u64)
            .take_while(|back| {
                date.checked_sub_days(Days::new(*back))
                    .is_some_and(|d| self.day(d.weekday()))
            })
            .count() as u64;
        if active == 0 {
            return self.next_active(date);
        }
        date.checked_sub_days(Days::new(active - 1))
    }

    /// Prochain jour actif, strictement après `date`.
    pub fn next_active(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.next_matching(date, true)
    }

    /// Prochain jour inactif, strictement après `date`.
    pub fn next_inactive(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.next_matching(date, false)
    }

    fn next_matching(&self, date: NaiveDate, enabled: bool) -> Option<NaiveDate> {
        (1..=7u64)
            .filter_map(|ahead| date.checked_add_days(Days::new(ahead)))
            .find(|d| self.day(d.weekday()) == enabled)
    }
}

impl fmt::Display for WeekdayFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let named = match self.0 {
            [true, false, false, false, false, false, true] => Some("weekends"),
            [false, true, true, true, true, true, false] => Some("M-F"),
            [false, true, true, true, true, true, true] => Some("M-F and Sat"),
            [true, true, true, true, true, true, false] => Some("M-F and Sun"),
            _ if self.is_never() => Some("never"),
            _ if self.is_always() => Some("every day"),
            _ => None,
        };
        if let Some(name) = named {
            return f.write_str(name);
        }

        // 3 jours consécutifs ou plus : plage "Mon-Wed"
        let mut parts: Vec<String> = Vec::new();
        let mut chain: Vec<usize> = Vec::new();
        let mut flush = |chain: &mut Vec<usize>| {
            if chain.len() < 3 {
                parts.extend(chain.iter().map(|i| SHORT_NAMES[*i].to_string()));
            } else if let (Some(first), Some(last)) = (chain.first(), chain.last()) {
                parts.push(format!("{}-{}", SHORT_NAMES[*first], SHORT_NAMES[*last]));
            }
            chain.clear();
        };
        for (i, active) in self.0.iter().enumerate() {
            if *active {
                chain.push(i);
            } else {
                flush(&mut chain);
            }
        }
        flush(&mut chain);
        f.write_str(&parts.join(","))
    }
}
