use crate::error::InvariantViolation;
use crate::jobs::QueueError;
use crate::storage::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RotationError {
    #[error("invalid shift length: {0} (must be > 0)")]
    InvalidShiftLength(i64),
    #[error("rotation has no participants")]
    NoParticipants,
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Rotation(#[from] RotationError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("sweep cancelled after {examined} rotation(s)")]
    Cancelled { examined: usize },
}
