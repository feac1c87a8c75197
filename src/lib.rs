#![forbid(unsafe_code)]
//! Tour de garde : moteur de calcul des plannings d'astreinte.
//!
//! - Relèves de rotation (horaires, quotidiennes, hebdomadaires), sûres vis-à-vis
//!   des changements d'heure.
//! - Avancement transactionnel du curseur de rotation, jobs auto-replanifiés.
//! - Expansion des règles hebdomadaires en shifts, fusion par personne,
//!   remplacements temporaires.
//! - Tout en UTC ; les fuseaux IANA ne servent qu'à l'arithmétique murale.

pub mod config;
pub mod error;
pub mod io;
pub mod jobs;
pub mod model;
pub mod rotation;
pub mod rule;
pub mod scheduler;
pub mod storage;
pub mod timeutil;

pub use config::EngineOptions;
pub use error::InvariantViolation;
pub use jobs::{Job, JobKind, JobQueue, MemoryJobQueue};
pub use model::{
    OverrideId, Participant, ParticipantId, Rotation, RotationId, RotationShift, RotationState,
    RotationType, RuleId, Schedule, ScheduleId, Shift, Target, UserId, UserOverride,
};
pub use rotation::{
    calc_rotation_advance, rotation_end_time, rotation_start_time, BoundaryStrategy,
    RotationClock, RotationManager,
};
pub use rule::{Rule, WeekdayFilter};
pub use scheduler::{apply_overrides, merge_shifts, ScheduleAssignment, ShiftCalculator};
pub use storage::{Dataset, JsonStorage, MemoryStore, Storage};
