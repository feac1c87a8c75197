use crate::error::InvariantViolation;
use crate::model::{ScheduleId, Shift, Target};
use crate::rotation::RotationError;
use crate::rule::Rule;
use crate::storage::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalcError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Rotation(#[from] RotationError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

/// Règles d'un planning regroupées par cible, avec leurs shifts fusionnés.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleAssignment {
    pub target: Target,
    pub schedule_id: ScheduleId,
    pub rules: Vec<Rule>,
    pub shifts: Vec<Shift>,
}
