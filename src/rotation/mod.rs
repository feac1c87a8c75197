//! Rotations : arithmétique des relèves, avancement du curseur et
//! orchestration transactionnelle.

mod advance;
mod clock;
mod manager;
mod types;

pub use advance::{calc_advance, plan_transition, Advance, RotationPhase, Transition};
pub use clock::{BoundaryStrategy, RotationClock};
pub use manager::{AdvanceOutcome, CancelFlag, Handled, RotationManager, SweepReport};
pub use types::{ManagerError, RotationError};

use crate::config::EngineOptions;
use crate::model::{Rotation, RotationState};
use chrono::{DateTime, Utc};

/// Fin du shift de `rotation` contenant `t`.
pub fn rotation_end_time(
    rotation: &Rotation,
    t: DateTime<Utc>,
) -> Result<DateTime<Utc>, RotationError> {
    Ok(rotation.clock()?.end_time(t))
}

/// Début du shift de `rotation` contenant `t`.
pub fn rotation_start_time(
    rotation: &Rotation,
    t: DateTime<Utc>,
) -> Result<DateTime<Utc>, RotationError> {
    Ok(rotation.clock()?.start_time(t))
}

/// Décision d'avancement pour une rotation, sans I/O.
///
/// L'algorithme de relève est choisi d'après le début du shift persisté.
pub fn calc_rotation_advance(
    now: DateTime<Utc>,
    rotation: &Rotation,
    state: &RotationState,
    participant_count: usize,
    opts: &EngineOptions,
) -> Result<Option<Advance>, RotationError> {
    let clock = clock_as_of(rotation, state.shift_start, opts)?;
    calc_advance(now, &rotation.id, &clock, state, participant_count, opts)
}

pub(crate) fn clock_as_of(
    rotation: &Rotation,
    at: DateTime<Utc>,
    opts: &EngineOptions,
) -> Result<RotationClock, RotationError> {
    let strategy = BoundaryStrategy::as_of(at, opts.legacy_boundaries_before);
    Ok(rotation.clock()?.with_strategy(strategy))
}
