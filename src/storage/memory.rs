use super::{
    Dataset, LockKey, RotationSnapshot, RotationStore, RotationTx, ScheduleStore, StoreError,
};
use crate::model::{Participant, Rotation, RotationId, RotationState, ScheduleId, UserOverride};
use crate::scheduler::{overlaps, ScheduleData};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

/// Stockage en mémoire.
///
/// Une transaction détient le verrou global jusqu'à sa fin : verrous
/// consultatifs et verrous de ligne sont donc toujours acquis. Les écritures
/// portent sur une copie de travail, publiée seulement si la transaction
/// réussit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Dataset>,
    now: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(data: Dataset) -> Self {
        Self {
            data: Mutex::new(data),
            now: Mutex::new(None),
        }
    }

    /// Fige l'heure vue par les transactions (`None` : horloge système).
    pub fn set_now(&self, now: Option<DateTime<Utc>>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Copie de l'état validé.
    pub fn dataset(&self) -> Dataset {
        self.data().clone()
    }

    /// Modifie directement l'état validé (hors transaction).
    pub fn update<T>(&self, f: impl FnOnce(&mut Dataset) -> T) -> T {
        let mut data = self.data();
        f(&mut *data)
    }

    fn data(&self) -> MutexGuard<'_, Dataset> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clock(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .unwrap_or_else(Utc::now)
    }
}

struct MemoryTx {
    work: Dataset,
    now: DateTime<Utc>,
    locks: HashSet<LockKey>,
}

impl RotationTx for MemoryTx {
    fn now(&mut self) -> Result<DateTime<Utc>, StoreError> {
        Ok(self.now)
    }

    fn advisory_lock(&mut self, key: LockKey) -> Result<(), StoreError> {
        if self.locks.insert(key) {
            trace!(?key, "advisory lock acquired");
        }
        Ok(())
    }

    fn rotations(&mut self) -> Result<Vec<RotationSnapshot>, StoreError> {
        Ok(self
            .work
            .rotations
            .iter()
            .map(|r| self.work.snapshot(r))
            .collect())
    }

    fn rotation_for_share(
        &mut self,
        id: &RotationId,
    ) -> Result<Option<RotationSnapshot>, StoreError> {
        Ok(self.work.find_rotation(id).map(|r| self.work.snapshot(r)))
    }

    fn save_state(
        &mut self,
        rotation_id: &RotationId,
        shift_start: DateTime<Utc>,
        position: usize,
        expected_version: Option<u64>,
    ) -> Result<RotationState, StoreError> {
        if self.work.find_rotation(rotation_id).is_none() {
            return Err(StoreError::RotationNotFound(rotation_id.to_string()));
        }
        let found = self.work.find_state(rotation_id).map(|s| s.version);
        if found != expected_version {
            return Err(StoreError::StaleState {
                rotation: rotation_id.to_string(),
                expected: expected_version,
                found,
            });
        }

        let state = RotationState {
            rotation_id: rotation_id.clone(),
            shift_start,
            position,
            version: found.map_or(1, |v| v + 1),
        };
        match self
            .work
            .states
            .iter_mut()
            .find(|s| &s.rotation_id == rotation_id)
        {
            Some(slot) => *slot = state.clone(),
            None => self.work.states.push(state.clone()),
        }
        Ok(state)
    }

    fn clear_state(&mut self, id: &RotationId) -> Result<(), StoreError> {
        self.work.states.retain(|s| &s.rotation_id != id);
        Ok(())
    }
}

impl RotationStore for MemoryStore {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn RotationTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let now = self.clock();
        let mut committed = self.data();
        let mut tx = MemoryTx {
            work: committed.clone(),
            now,
            locks: HashSet::new(),
        };
        let out = f(&mut tx)?;
        *committed = tx.work;
        Ok(out)
    }
}

impl ScheduleStore for MemoryStore {
    fn schedule_data(&self, id: &ScheduleId) -> Result<ScheduleData, StoreError> {
        self.data()
            .schedule_data(id)
            .ok_or_else(|| StoreError::ScheduleNotFound(id.to_string()))
    }

    fn user_overrides(
        &self,
        schedule_id: &ScheduleId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UserOverride>, StoreError> {
        Ok(self
            .data()
            .overrides
            .iter()
            .filter(|o| &o.schedule_id == schedule_id && overlaps(o.start, o.end, start, end))
            .cloned()
            .collect())
    }

    fn rotation(&self, id: &RotationId) -> Result<Rotation, StoreError> {
        self.data()
            .find_rotation(id)
            .cloned()
            .ok_or_else(|| StoreError::RotationNotFound(id.to_string()))
    }

    fn participants(&self, id: &RotationId) -> Result<Vec<Participant>, StoreError> {
        Ok(self.data().participants_of(id))
    }

    fn rotation_state(&self, id: &RotationId) -> Result<RotationState, StoreError> {
        self.data()
            .find_state(id)
            .cloned()
            .ok_or_else(|| StoreError::NoState(id.to_string()))
    }
}
