use super::RotationError;
use crate::model::{Rotation, RotationType};
use crate::timeutil::{self, Repeated};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Algorithme de calcul des relèves.
///
/// `Current` avance de N heures (ou jours) *murales* depuis l'ancre : une
/// rotation horaire de 3 h qui démarre à minuit le jour du passage à l'heure
/// d'été dure 2 h réelles, 4 h au retour à l'heure d'hiver.
///
/// `Legacy` reproduit les bornes calculées avant la correction DST : les
/// rotations horaires avancent d'une durée fixe, sans tenir compte du fuseau.
/// Il ne sert qu'à relire des relèves historiques déjà persistées.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryStrategy {
    #[default]
    Current,
    Legacy,
}

impl BoundaryStrategy {
    /// Choisit l'algorithme pour un instant donné ; sans date de bascule
    /// configurée, l'algorithme historique n'est jamais utilisé.
    pub fn as_of(at: DateTime<Utc>, legacy_before: Option<DateTime<Utc>>) -> Self {
        match legacy_before {
            Some(cutover) if at < cutover => BoundaryStrategy::Legacy,
            _ => BoundaryStrategy::Current,
        }
    }
}

/// Arithmétique des relèves d'une rotation (pure, sans I/O).
///
/// Les relèves forment une grille alignée sur l'ancre de la rotation :
/// `end_time(t)` retourne toujours la plus petite relève de la grille
/// strictement après `t`, même si la longueur de shift a changé depuis.
#[derive(Debug, Clone)]
pub struct RotationClock {
    kind: RotationType,
    anchor: NaiveDateTime,
    anchor_utc: DateTime<Utc>,
    time_zone: Tz,
    step_minutes: i64,
    strategy: BoundaryStrategy,
}

impl RotationClock {
    pub fn new(rotation: &Rotation) -> Result<Self, RotationError> {
        if rotation.shift_length <= 0 {
            return Err(RotationError::InvalidShiftLength(rotation.shift_length));
        }
        let days = match rotation.kind {
            RotationType::Hourly => 0,
            RotationType::Daily => rotation.shift_length,
            RotationType::Weekly => rotation.shift_length * 7,
        };
        let step_minutes = if days == 0 {
            rotation.shift_length * 60
        } else {
            days * 24 * 60
        };
        let anchor_utc = timeutil::truncate_minute(rotation.start);

        Ok(Self {
            kind: rotation.kind,
            anchor: timeutil::local_naive(anchor_utc, rotation.time_zone),
            anchor_utc,
            time_zone: rotation.time_zone,
            step_minutes,
            strategy: BoundaryStrategy::Current,
        })
    }

    pub fn with_strategy(mut self, strategy: BoundaryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> BoundaryStrategy {
        self.strategy
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Fin du shift contenant `t` (relève suivante, strictement après `t`).
    pub fn end_time(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        self.boundary(self.end_index(t))
    }

    /// Début du shift contenant `t` : la relève précédant `end_time(t)`.
    pub fn start_time(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        self.boundary(self.end_index(t) - 1)
    }

    /// Les `count` prochaines relèves après `after`.
    pub fn next_handoffs(&self, after: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut k = self.end_index(after);
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            let b = self.boundary(k);
            // deux points de grille peuvent tomber dans le même trou DST
            if out.last() != Some(&b) {
                out.push(b);
            }
            k += 1;
        }
        out
    }

    /// Nombre de relèves distinctes dans `(from, to]`, soit autant de pas
    /// `end_time` successifs depuis `from`.
    ///
    /// Deux points de grille peuvent se résoudre au même instant dans un trou
    /// DST (pas horaire plus court que le trou) ; ils ne comptent qu'une fois.
    pub fn handoffs_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> usize {
        let (lo, hi) = (self.end_index(from), self.end_index(to));
        if hi <= lo {
            return 0;
        }
        let span = usize::try_from(hi - lo).unwrap_or(0);
        if !self.may_collapse() {
            return span;
        }
        let mut prev = self.boundary(lo - 1);
        let mut count = 0;
        for k in lo..hi {
            let b = self.boundary(k);
            if b != prev {
                count += 1;
            }
            prev = b;
        }
        count
    }

    /// Seule la grille horaire murale peut avoir des points confondus :
    /// les pas en jours dépassent tout trou DST.
    fn may_collapse(&self) -> bool {
        self.kind == RotationType::Hourly && self.strategy == BoundaryStrategy::Current
    }

    fn end_index(&self, t: DateTime<Utc>) -> i64 {
        let t = timeutil::truncate_minute(t);
        let elapsed = (timeutil::local_naive(t, self.time_zone) - self.anchor).num_minutes();
        let mut k = elapsed.div_euclid(self.step_minutes);

        // l'estimation par heure murale peut être décalée d'un décalage de fuseau
        while self.boundary(k) > t {
            k -= 1;
        }
        while self.boundary(k) <= t {
            k += 1;
        }
        k
    }

    fn boundary(&self, k: i64) -> DateTime<Utc> {
        if k == 0 {
            return self.anchor_utc;
        }
        let offset = Duration::minutes(k * self.step_minutes);
        match (self.strategy, self.kind) {
            (BoundaryStrategy::Legacy, RotationType::Hourly) => self.anchor_utc + offset,
            _ => timeutil::resolve_local(self.time_zone, self.anchor + offset, Repeated::First),
        }
    }
}
