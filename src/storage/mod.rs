//! Contrats de lecture/écriture consommés par le moteur.
//!
//! Le calcul des shifts ne fait que lire ([`ScheduleStore`]) ; seul le
//! gestionnaire de rotations écrit, dans des transactions ([`RotationStore`]).

mod json;
mod memory;

pub use json::{JsonStorage, Storage};
pub use memory::MemoryStore;

use crate::model::{
    Participant, Rotation, RotationId, RotationState, Schedule, ScheduleId, Target, UserOverride,
};
use crate::rule::Rule;
use crate::scheduler::ScheduleData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unknown schedule: {0}")]
    ScheduleNotFound(String),
    #[error("unknown rotation: {0}")]
    RotationNotFound(String),
    /// La rotation existe mais n'a jamais démarré.
    #[error("no state for rotation: {0}")]
    NoState(String),
    #[error("stale rotation state for {rotation}: expected version {expected:?}, found {found:?}")]
    StaleState {
        rotation: String,
        expected: Option<u64>,
        found: Option<u64>,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Verrous consultatifs (exclusion mutuelle à l'échelle du cluster).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKey {
    RotationSweep,
}

/// Vue d'une rotation lue dans une transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationSnapshot {
    pub rotation: Rotation,
    pub participant_count: usize,
    pub state: Option<RotationState>,
}

/// Contenu logique complet lu par le moteur.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    #[serde(default)]
    pub rotations: Vec<Rotation>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub overrides: Vec<UserOverride>,
    #[serde(default)]
    pub states: Vec<RotationState>,
}

impl Dataset {
    pub fn find_schedule<'a>(&'a self, id: &ScheduleId) -> Option<&'a Schedule> {
        self.schedules.iter().find(|s| &s.id == id)
    }
    pub fn find_rotation<'a>(&'a self, id: &RotationId) -> Option<&'a Rotation> {
        self.rotations.iter().find(|r| &r.id == id)
    }
    pub fn find_state<'a>(&'a self, id: &RotationId) -> Option<&'a RotationState> {
        self.states.iter().find(|s| &s.rotation_id == id)
    }

    /// Participants d'une rotation, triés par position.
    pub fn participants_of(&self, id: &RotationId) -> Vec<Participant> {
        let mut parts: Vec<Participant> = self
            .participants
            .iter()
            .filter(|p| &p.rotation_id == id)
            .cloned()
            .collect();
        parts.sort_by_key(|p| p.position);
        parts
    }

    /// Données nécessaires au calcul des shifts d'un planning.
    pub fn schedule_data(&self, id: &ScheduleId) -> Option<ScheduleData> {
        let schedule = self.find_schedule(id)?.clone();
        let rules: Vec<Rule> = self
            .rules
            .iter()
            .filter(|r| &r.schedule_id == id)
            .cloned()
            .collect();
        let rotation_ids: Vec<&RotationId> = rules
            .iter()
            .filter_map(|r| match &r.target {
                Target::Rotation(rid) => Some(rid),
                Target::User(_) => None,
            })
            .collect();
        let wanted = |rid: &RotationId| rotation_ids.contains(&rid);

        let rotations: Vec<Rotation> = self
            .rotations
            .iter()
            .filter(|r| wanted(&r.id))
            .cloned()
            .collect();
        let participants: Vec<Participant> = self
            .participants
            .iter()
            .filter(|p| wanted(&p.rotation_id))
            .cloned()
            .collect();
        let states: Vec<RotationState> = self
            .states
            .iter()
            .filter(|s| wanted(&s.rotation_id))
            .cloned()
            .collect();

        Some(ScheduleData {
            schedule,
            rules,
            rotations,
            participants,
            states,
        })
    }

    pub(crate) fn snapshot(&self, rotation: &Rotation) -> RotationSnapshot {
        RotationSnapshot {
            rotation: rotation.clone(),
            participant_count: self
                .participants
                .iter()
                .filter(|p| p.rotation_id == rotation.id)
                .count(),
            state: self.find_state(&rotation.id).cloned(),
        }
    }
}

/// Lecture seule, pour le calcul des shifts.
pub trait ScheduleStore {
    fn schedule_data(&self, id: &ScheduleId) -> Result<ScheduleData, StoreError>;

    /// Remplacements du planning qui chevauchent `[start, end)`.
    fn user_overrides(
        &self,
        schedule_id: &ScheduleId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UserOverride>, StoreError>;

    /// `RotationNotFound` si la rotation n'existe pas.
    fn rotation(&self, id: &RotationId) -> Result<Rotation, StoreError>;

    /// Participants triés par position.
    fn participants(&self, id: &RotationId) -> Result<Vec<Participant>, StoreError>;

    /// `NoState` si la rotation n'a pas encore démarré.
    fn rotation_state(&self, id: &RotationId) -> Result<RotationState, StoreError>;
}

impl<S: ScheduleStore + ?Sized> ScheduleStore for &S {
    fn schedule_data(&self, id: &ScheduleId) -> Result<ScheduleData, StoreError> {
        (**self).schedule_data(id)
    }
    fn user_overrides(
        &self,
        schedule_id: &ScheduleId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UserOverride>, StoreError> {
        (**self).user_overrides(schedule_id, start, end)
    }
    fn rotation(&self, id: &RotationId) -> Result<Rotation, StoreError> {
        (**self).rotation(id)
    }
    fn participants(&self, id: &RotationId) -> Result<Vec<Participant>, StoreError> {
        (**self).participants(id)
    }
    fn rotation_state(&self, id: &RotationId) -> Result<RotationState, StoreError> {
        (**self).rotation_state(id)
    }
}

/// Opérations disponibles dans une transaction.
pub trait RotationTx {
    /// Heure de référence de la transaction.
    fn now(&mut self) -> Result<DateTime<Utc>, StoreError>;

    /// Prend un verrou consultatif, relâché en fin de transaction.
    fn advisory_lock(&mut self, key: LockKey) -> Result<(), StoreError>;

    fn rotations(&mut self) -> Result<Vec<RotationSnapshot>, StoreError>;

    /// Lit une rotation sous verrou partagé ; `None` si elle a été supprimée.
    fn rotation_for_share(&mut self, id: &RotationId)
        -> Result<Option<RotationSnapshot>, StoreError>;

    /// Écrit le curseur si la version persistée vaut `expected_version`
    /// (`None` : aucun état ne doit exister). Retourne l'état stocké, version
    /// incrémentée.
    fn save_state(
        &mut self,
        rotation_id: &RotationId,
        shift_start: DateTime<Utc>,
        position: usize,
        expected_version: Option<u64>,
    ) -> Result<RotationState, StoreError>;

    fn clear_state(&mut self, id: &RotationId) -> Result<(), StoreError>;
}

/// Stockage transactionnel des curseurs de rotation.
pub trait RotationStore {
    /// Exécute `f` dans une transaction : validée si `f` réussit, annulée
    /// sinon.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn RotationTx) -> Result<T, E>,
        E: From<StoreError>;
}

impl<S: RotationStore> RotationStore for &S {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn RotationTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        (**self).transaction(f)
    }
}
