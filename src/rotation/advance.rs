use super::{RotationClock, RotationError};
use crate::config::EngineOptions;
use crate::error::IterationGuard;
use crate::model::{RotationId, RotationState};
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

/// Nouveau curseur à persister pour une rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub shift_start: DateTime<Utc>,
    pub position: usize,
    /// La position persistée était hors bornes et a été ramenée à 0.
    pub repaired: bool,
    /// Nombre de relèves franchies.
    pub handoffs: usize,
    /// Retard de la première relève franchie, au-delà du seuil d'alerte.
    pub late_by: Option<Duration>,
}

/// Calcule si (et comment) le curseur d'une rotation doit avancer à `now`.
///
/// Fonction pure : `Ok(None)` signifie que le curseur est à jour.
pub fn calc_advance(
    now: DateTime<Utc>,
    rotation_id: &RotationId,
    clock: &RotationClock,
    state: &RotationState,
    participant_count: usize,
    opts: &EngineOptions,
) -> Result<Option<Advance>, RotationError> {
    if participant_count == 0 {
        return Err(RotationError::NoParticipants);
    }

    let mut position = state.position;
    let mut repaired = false;
    if position >= participant_count {
        position = 0;
        repaired = true;
    }

    let mut shift_start = state.shift_start;
    let mut end = clock.end_time(shift_start);
    if end > now {
        if !repaired {
            return Ok(None);
        }
        return Ok(Some(Advance {
            shift_start,
            position,
            repaired,
            handoffs: 0,
            late_by: None,
        }));
    }

    let mut late_by = None;
    let overdue = now - end;
    if overdue > opts.delayed_advance_after() {
        warn!(
            rotation_id = %rotation_id,
            late_by_minutes = overdue.num_minutes(),
            "unexpectedly delayed rotation advancement"
        );
        late_by = Some(overdue);
    }

    let mut guard = IterationGuard::new("rotation advancement", opts.max_iterations);
    let mut handoffs = 0usize;
    while end <= now {
        guard.tick()?;
        position = (position + 1) % participant_count;
        shift_start = end;
        end = clock.end_time(shift_start);
        handoffs += 1;
    }

    Ok(Some(Advance {
        shift_start,
        position,
        repaired,
        handoffs,
        late_by,
    }))
}

/// Phase d'une rotation dans sa machine à états.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPhase {
    Uninitialized,
    Started,
    Stable,
    Advancing,
    Repairing,
    Cleared,
}

/// Transition à appliquer au curseur persisté.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Premier démarrage : position 0 à `shift_start`.
    Start { shift_start: DateTime<Utc> },
    /// Position hors bornes ramenée à 0, sans relève franchie.
    Repair { shift_start: DateTime<Utc> },
    Advance(Advance),
    /// Plus aucun participant : le curseur est effacé.
    Clear,
}

impl Transition {
    pub fn phase(&self) -> RotationPhase {
        match self {
            Transition::Start { .. } => RotationPhase::Started,
            Transition::Repair { .. } => RotationPhase::Repairing,
            Transition::Advance(_) => RotationPhase::Advancing,
            Transition::Clear => RotationPhase::Cleared,
        }
    }

    /// Curseur résultant (`None` après effacement).
    pub fn cursor(&self) -> Option<(DateTime<Utc>, usize)> {
        match self {
            Transition::Start { shift_start } | Transition::Repair { shift_start } => {
                Some((*shift_start, 0))
            }
            Transition::Advance(adv) => Some((adv.shift_start, adv.position)),
            Transition::Clear => None,
        }
    }
}

/// Choisit la transition d'une rotation à `now`.
///
/// `Ok(None)` : rien à faire (rotation stable, ou non initialisée sans
/// participant).
pub fn plan_transition(
    now: DateTime<Utc>,
    rotation_id: &RotationId,
    clock: &RotationClock,
    state: Option<&RotationState>,
    participant_count: usize,
    opts: &EngineOptions,
) -> Result<Option<Transition>, RotationError> {
    match (state, participant_count) {
        (None, 0) => Ok(None),
        (Some(_), 0) => Ok(Some(Transition::Clear)),
        (None, _) => Ok(Some(Transition::Start { shift_start: now })),
        (Some(state), count) => {
            let advance = calc_advance(now, rotation_id, clock, state, count, opts)?;
            Ok(advance.map(|adv| {
                if adv.repaired && adv.handoffs == 0 {
                    Transition::Repair {
                        shift_start: adv.shift_start,
                    }
                } else {
                    Transition::Advance(adv)
                }
            }))
        }
    }
}
