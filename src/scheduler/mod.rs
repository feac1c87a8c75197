//! Calcul des shifts d'un planning : expansion des règles, fusion par
//! personne, puis application des remplacements.

mod expand;
mod merge;
mod overrides;
mod types;
mod util;

pub use expand::{expand_rule, rule_windows, RotationLookup, Window};
pub use merge::{merge_rotation_shifts, merge_shifts, sort_shifts};
pub use overrides::apply_overrides;
pub use types::{CalcError, ScheduleAssignment};

pub(crate) use util::overlaps;

use crate::config::EngineOptions;
use crate::error::IterationGuard;
use crate::model::{
    Participant, Rotation, RotationId, RotationShift, RotationState, Schedule, ScheduleId, Shift,
    Target, UserId, UserOverride,
};
use crate::rotation;
use crate::rule::Rule;
use crate::storage::{ScheduleStore, StoreError};
use chrono::{DateTime, Utc};
use expand::RotationCursor;
use std::collections::BTreeMap;
use tracing::debug;

/// Tout ce qu'il faut pour calculer les shifts d'un planning, lu en une fois.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleData {
    pub schedule: Schedule,
    pub rules: Vec<Rule>,
    pub rotations: Vec<Rotation>,
    pub participants: Vec<Participant>,
    pub states: Vec<RotationState>,
}

impl RotationLookup for ScheduleData {
    fn rotation(&self, id: &RotationId) -> Option<&Rotation> {
        self.rotations.iter().find(|r| &r.id == id)
    }

    fn state(&self, id: &RotationId) -> Option<&RotationState> {
        self.states.iter().find(|s| &s.rotation_id == id)
    }

    fn participant_users(&self, id: &RotationId) -> Vec<UserId> {
        let mut parts: Vec<&Participant> = self
            .participants
            .iter()
            .filter(|p| &p.rotation_id == id)
            .collect();
        parts.sort_by_key(|p| p.position);
        parts.into_iter().map(|p| p.user_id.clone()).collect()
    }
}

impl ScheduleData {
    /// Règles groupées par cible (utilisateurs d'abord, puis par identifiant).
    pub fn rules_by_target(&self) -> BTreeMap<Target, Vec<Rule>> {
        let mut m: BTreeMap<Target, Vec<Rule>> = BTreeMap::new();
        for r in &self.rules {
            m.entry(r.target.clone()).or_default().push(r.clone());
        }
        m
    }

    /// Shifts fusionnés d'un groupe de règles.
    pub fn shifts_for_rules(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rules: &[Rule],
        opts: &EngineOptions,
    ) -> Result<Vec<Shift>, CalcError> {
        let mut shifts = Vec::new();
        for rule in rules {
            shifts.extend(expand_rule(
                start,
                end,
                rule,
                self.schedule.time_zone,
                self,
                opts,
            )?);
        }
        Ok(merge_shifts(shifts))
    }

    pub fn assignments(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        opts: &EngineOptions,
    ) -> Result<Vec<ScheduleAssignment>, CalcError> {
        self.rules_by_target()
            .into_iter()
            .map(|(target, rules)| {
                let shifts = self.shifts_for_rules(start, end, &rules, opts)?;
                Ok(ScheduleAssignment {
                    target,
                    schedule_id: self.schedule.id.clone(),
                    rules,
                    shifts,
                })
            })
            .collect()
    }

    /// Shifts finaux, toutes cibles confondues (plusieurs cibles peuvent
    /// désigner la même personne).
    pub fn final_shifts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        opts: &EngineOptions,
    ) -> Result<Vec<Shift>, CalcError> {
        let mut shifts = Vec::new();
        for rules in self.rules_by_target().values() {
            shifts.extend(self.shifts_for_rules(start, end, rules, opts)?);
        }
        Ok(merge_shifts(shifts))
    }

    pub fn final_shifts_with_overrides(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        overrides: &[UserOverride],
        opts: &EngineOptions,
    ) -> Result<Vec<Shift>, CalcError> {
        let shifts = self.final_shifts(start, end, opts)?;
        Ok(apply_overrides(shifts, overrides))
    }
}

/// Façade de calcul au-dessus d'un [`ScheduleStore`].
pub struct ShiftCalculator<S> {
    store: S,
    opts: EngineOptions,
}

impl<S: ScheduleStore> ShiftCalculator<S> {
    pub fn new(store: S, opts: EngineOptions) -> Self {
        Self { store, opts }
    }

    pub fn schedule_final_shifts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        schedule_id: &ScheduleId,
    ) -> Result<Vec<Shift>, CalcError> {
        let data = self.store.schedule_data(schedule_id)?;
        data.final_shifts(start, end, &self.opts)
    }

    pub fn schedule_final_shifts_with_overrides(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        schedule_id: &ScheduleId,
    ) -> Result<Vec<Shift>, CalcError> {
        let data = self.store.schedule_data(schedule_id)?;
        let overrides = self.store.user_overrides(schedule_id, start, end)?;
        data.final_shifts_with_overrides(start, end, &overrides, &self.opts)
    }

    pub fn schedule_assignments(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        schedule_id: &ScheduleId,
    ) -> Result<Vec<ScheduleAssignment>, CalcError> {
        let data = self.store.schedule_data(schedule_id)?;
        data.assignments(start, end, &self.opts)
    }

    /// Shifts d'une rotation, alignés strictement sur `[start, end)`.
    ///
    /// Vide si la rotation n'a pas encore démarré ou n'a aucun participant ;
    /// `RotationNotFound` si elle n'existe pas.
    pub fn rotation_shifts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rotation_id: &RotationId,
    ) -> Result<Vec<RotationShift>, CalcError> {
        if end < start {
            return Ok(Vec::new());
        }
        let rot = self.store.rotation(rotation_id)?;
        let state = match self.store.rotation_state(rotation_id) {
            Ok(state) => state,
            Err(StoreError::NoState(_)) => {
                debug!(rotation_id = %rotation_id, "rotation not started, no shifts");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };
        let parts: Vec<_> = self
            .store
            .participants(rotation_id)?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let clock = rotation::clock_as_of(&rot, state.shift_start, &self.opts)?;
        let Some(mut cursor) = RotationCursor::new(&clock, &parts, &state) else {
            return Ok(Vec::new());
        };
        if state.shift_start > end {
            return Ok(Vec::new());
        }
        cursor.seek(start);

        let mut guard = IterationGuard::new("rotation shifts", self.opts.max_iterations);
        let mut shifts = Vec::new();
        loop {
            guard.tick()?;
            let c_start = cursor.shift_start.max(start);
            let c_end = cursor.shift_end.min(end);
            if c_start < c_end {
                shifts.push(RotationShift {
                    start: c_start,
                    end: c_end,
                    participant_id: cursor.current().clone(),
                });
            }
            if c_end == end {
                break;
            }
            cursor.next();
        }
        Ok(merge_rotation_shifts(shifts))
    }
}
