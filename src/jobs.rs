//! Contrat minimal de la file de jobs utilisée par le gestionnaire de
//! rotations, et une implémentation en mémoire.

use crate::model::RotationId;
use crate::timeutil;
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("job queue unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobKind {
    /// Avance une rotation puis se replanifie à sa prochaine relève.
    AdvanceRotation { rotation_id: RotationId },
    /// Balayage de rattrapage de toutes les rotations.
    SweepRotations,
}

impl JobKind {
    /// Arguments servant de clé d'unicité.
    pub fn args(&self) -> String {
        match self {
            JobKind::AdvanceRotation { rotation_id } => format!("advance:{rotation_id}"),
            JobKind::SweepRotations => "sweep".to_string(),
        }
    }
}

/// Unicité par (arguments, tranche de temps) parmi les jobs en attente.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueKey {
    pub args: String,
    pub bucket: DateTime<Utc>,
}

impl UniqueKey {
    pub fn new(kind: &JobKind, at: DateTime<Utc>, bucket: Duration) -> Self {
        Self {
            args: kind.args(),
            bucket: at
                .duration_trunc(bucket)
                .unwrap_or_else(|_| timeutil::truncate_minute(at)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub kind: JobKind,
    pub run_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<UniqueKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Inserted,
    Duplicate,
}

pub trait JobQueue {
    /// Planifie un job ; un job en attente avec la même clé l'absorbe.
    fn enqueue(&self, job: Job) -> Result<Enqueued, QueueError>;
}

impl<Q: JobQueue + ?Sized> JobQueue for &Q {
    fn enqueue(&self, job: Job) -> Result<Enqueued, QueueError> {
        (**self).enqueue(job)
    }
}

/// File en mémoire ; `workers` borne le nombre de jobs rendus par `take_due`.
#[derive(Debug)]
pub struct MemoryJobQueue {
    pending: Mutex<Vec<Job>>,
    workers: usize,
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new(1)
    }
}

impl MemoryJobQueue {
    pub fn new(workers: usize) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            workers: workers.max(1),
        }
    }

    /// Jobs en attente, triés par date d'exécution.
    pub fn pending(&self) -> Vec<Job> {
        let mut jobs = self.lock().clone();
        jobs.sort_by_key(|j| j.run_at);
        jobs
    }

    /// Retire et retourne les jobs échus, au plus `workers` à la fois.
    pub fn take_due(&self, now: DateTime<Utc>) -> Vec<Job> {
        let mut pending = self.lock();
        pending.sort_by_key(|j| j.run_at);
        let due = pending
            .iter()
            .take_while(|j| j.run_at <= now)
            .count()
            .min(self.workers);
        pending.drain(..due).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Job>> {
        // un panic pendant un enqueue ne laisse pas la liste incohérente
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl JobQueue for MemoryJobQueue {
    fn enqueue(&self, job: Job) -> Result<Enqueued, QueueError> {
        let mut pending = self.lock();
        if let Some(key) = &job.unique {
            if pending.iter().any(|j| j.unique.as_ref() == Some(key)) {
                debug!(args = %key.args, bucket = %key.bucket, "duplicate job suppressed");
                return Ok(Enqueued::Duplicate);
            }
        }
        pending.push(job);
        Ok(Enqueued::Inserted)
    }
}
