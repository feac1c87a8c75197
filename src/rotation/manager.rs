use super::advance::{plan_transition, RotationPhase, Transition};
use super::{clock_as_of, ManagerError, RotationClock, RotationError};
use crate::config::EngineOptions;
use crate::jobs::{Enqueued, Job, JobKind, JobQueue, QueueError, UniqueKey};
use crate::model::{RotationId, RotationState};
use crate::storage::{LockKey, RotationSnapshot, RotationStore, RotationTx, StoreError};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Demande d'annulation partagée, consultée entre deux rotations.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bilan d'un balayage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub updated: usize,
    /// Rotations à mettre à jour laissées au balayage suivant (lot plein).
    pub deferred: usize,
}

/// Résultat du job d'une rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceOutcome {
    pub rotation_id: RotationId,
    /// `None` : la rotation a été supprimée, le job ne fait rien.
    pub phase: Option<RotationPhase>,
    /// Curseur après le job.
    pub state: Option<RotationState>,
    /// Prochaine exécution planifiée.
    pub next_run: Option<DateTime<Utc>>,
    pub rescheduled: Option<Enqueued>,
}

/// Résultat d'un job traité par [`RotationManager::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    Advanced(AdvanceOutcome),
    Swept(SweepReport),
}

/// Persistance et planification autour de l'avancement des rotations.
pub struct RotationManager<S, Q> {
    store: S,
    queue: Q,
    opts: EngineOptions,
}

impl<S: RotationStore, Q: JobQueue> RotationManager<S, Q> {
    pub fn new(store: S, queue: Q, opts: EngineOptions) -> Self {
        Self { store, queue, opts }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.opts
    }

    /// Balayage de rattrapage : une seule transaction sous verrou consultatif.
    ///
    /// Au plus `sweep_batch_size` rotations sont écrites ; les autres sont
    /// comptées dans `deferred`. Une annulation observée entre deux rotations
    /// annule toute la transaction.
    pub fn sweep(&self, cancel: &CancelFlag) -> Result<SweepReport, ManagerError> {
        let report = self.store.transaction::<_, ManagerError, _>(|tx| {
            tx.advisory_lock(LockKey::RotationSweep)?;
            let now = tx.now()?;
            let snapshots = tx.rotations()?;

            let mut report = SweepReport::default();
            for snap in &snapshots {
                if cancel.is_cancelled() {
                    return Err(ManagerError::Cancelled {
                        examined: report.examined,
                    });
                }
                report.examined += 1;

                let Some(transition) = self.plan(now, snap)? else {
                    continue;
                };
                if report.updated >= self.opts.sweep_batch_size {
                    report.deferred += 1;
                    continue;
                }
                apply(tx, snap, &transition)?;
                report.updated += 1;
            }
            Ok(report)
        })?;

        info!(
            examined = report.examined,
            updated = report.updated,
            deferred = report.deferred,
            "rotation sweep complete"
        );
        Ok(report)
    }

    /// Job d'une rotation : applique la transition due puis se replanifie à
    /// la prochaine relève, qu'il y ait eu une écriture ou non.
    pub fn advance_rotation(&self, id: &RotationId) -> Result<AdvanceOutcome, ManagerError> {
        let mut outcome = self.store.transaction::<_, ManagerError, _>(|tx| {
            let now = tx.now()?;
            let Some(snap) = tx.rotation_for_share(id)? else {
                debug!(rotation_id = %id, "rotation deleted, nothing to advance");
                return Ok(AdvanceOutcome {
                    rotation_id: id.clone(),
                    phase: None,
                    state: None,
                    next_run: None,
                    rescheduled: None,
                });
            };

            let (phase, state) = match self.plan(now, &snap)? {
                Some(transition) => {
                    let state = apply(tx, &snap, &transition)?;
                    (transition.phase(), state)
                }
                None if snap.state.is_some() => (RotationPhase::Stable, snap.state.clone()),
                None => (RotationPhase::Uninitialized, None),
            };

            let from = state.as_ref().map_or(now, |s| s.shift_start);
            let next_run = clock_as_of(&snap.rotation, from, &self.opts)?.end_time(from);
            Ok(AdvanceOutcome {
                rotation_id: id.clone(),
                phase: Some(phase),
                state,
                next_run: Some(next_run),
                rescheduled: None,
            })
        })?;

        if let Some(run_at) = outcome.next_run {
            outcome.rescheduled = Some(self.schedule_advance(id, run_at)?);
        }
        Ok(outcome)
    }

    /// Planifie le job d'une rotation (dédoublonné par tranche de temps).
    pub fn schedule_advance(
        &self,
        id: &RotationId,
        run_at: DateTime<Utc>,
    ) -> Result<Enqueued, QueueError> {
        let kind = JobKind::AdvanceRotation {
            rotation_id: id.clone(),
        };
        let unique = UniqueKey::new(&kind, run_at, self.opts.reschedule_bucket());
        self.queue.enqueue(Job {
            kind,
            run_at,
            unique: Some(unique),
        })
    }

    pub fn handle(&self, job: &Job) -> Result<Handled, ManagerError> {
        match &job.kind {
            JobKind::AdvanceRotation { rotation_id } => {
                self.advance_rotation(rotation_id).map(Handled::Advanced)
            }
            JobKind::SweepRotations => self.sweep(&CancelFlag::new()).map(Handled::Swept),
        }
    }

    fn plan(
        &self,
        now: DateTime<Utc>,
        snap: &RotationSnapshot,
    ) -> Result<Option<Transition>, RotationError> {
        let clock: RotationClock = {
            let at = snap.state.as_ref().map_or(now, |s| s.shift_start);
            clock_as_of(&snap.rotation, at, &self.opts)?
        };
        plan_transition(
            now,
            &snap.rotation.id,
            &clock,
            snap.state.as_ref(),
            snap.participant_count,
            &self.opts,
        )
    }
}

/// Écrit la transition, avec contrôle de version sur l'état lu.
fn apply(
    tx: &mut dyn RotationTx,
    snap: &RotationSnapshot,
    transition: &Transition,
) -> Result<Option<RotationState>, StoreError> {
    let id = &snap.rotation.id;
    let expected = snap.state.as_ref().map(|s| s.version);
    let state = match transition.cursor() {
        Some((shift_start, position)) => {
            Some(tx.save_state(id, shift_start, position, expected)?)
        }
        None => {
            tx.clear_state(id)?;
            None
        }
    };
    debug!(rotation_id = %id, phase = ?transition.phase(), "rotation state updated");
    Ok(state)
}
