use crate::rotation::{RotationClock, RotationError};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new<S: AsRef<str>>(s: S) -> Self {
                Self(s.as_ref().to_owned())
            }
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Identifiant fort pour un utilisateur d'astreinte
    UserId
);
string_id!(
    /// Identifiant fort pour Rotation
    RotationId
);
string_id!(
    /// Identifiant fort pour Participant
    ParticipantId
);
string_id!(
    /// Identifiant fort pour Schedule
    ScheduleId
);
string_id!(
    /// Identifiant fort pour Rule
    RuleId
);
string_id!(
    /// Identifiant fort pour UserOverride
    OverrideId
);

/// Pas de rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationType {
    Hourly,
    Daily,
    Weekly,
}

/// Rotation : liste ordonnée et cyclique de participants.
///
/// `start` est l'ancre de la grille des relèves, interprétée dans
/// `time_zone` (les relèves gardent l'heure murale de l'ancre).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub id: RotationId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: RotationType,
    pub start: DateTime<Utc>,
    pub shift_length: i64,
    pub time_zone: Tz,
}

impl Rotation {
    pub fn new<N: Into<String>>(
        name: N,
        kind: RotationType,
        start: DateTime<Tz>,
        shift_length: i64,
    ) -> Self {
        Self {
            id: RotationId::random(),
            name: name.into(),
            description: String::new(),
            kind,
            start: start.with_timezone(&Utc),
            shift_length,
            time_zone: start.timezone(),
        }
    }

    /// Horloge de relève ; échoue si `shift_length` n'est pas positif.
    pub fn clock(&self) -> Result<RotationClock, RotationError> {
        RotationClock::new(self)
    }
}

/// Place d'une personne dans une rotation (positions denses, base 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub rotation_id: RotationId,
    pub position: usize,
    pub user_id: UserId,
}

/// Curseur persisté d'une rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    pub rotation_id: RotationId,
    pub shift_start: DateTime<Utc>,
    pub position: usize,
    #[serde(default)]
    pub version: u64,
}

/// Cible d'une règle de planning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Target {
    User(UserId),
    Rotation(RotationId),
}

impl Target {
    pub fn id(&self) -> &str {
        match self {
            Target::User(id) => id.as_str(),
            Target::Rotation(id) => id.as_str(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::User(id) => write!(f, "user:{id}"),
            Target::Rotation(id) => write!(f, "rotation:{id}"),
        }
    }
}

/// Planning : les règles sont évaluées dans son fuseau.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub name: String,
    pub time_zone: Tz,
}

impl Schedule {
    pub fn new<N: Into<String>>(name: N, time_zone: Tz) -> Self {
        Self {
            id: ScheduleId::random(),
            name: name.into(),
            time_zone,
        }
    }
}

/// Créneau calculé `[start, end)` (jamais persisté)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub user_id: UserId,
}

impl Shift {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, user_id: UserId) -> Self {
        Self {
            start,
            end,
            user_id,
        }
    }

    /// Durée en minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {} | {}",
            self.start.to_rfc3339(),
            self.end.to_rfc3339(),
            self.user_id
        )
    }
}

/// Créneau d'une rotation, aligné sur la fenêtre demandée.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationShift {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub participant_id: ParticipantId,
}

/// Remplacement temporaire sur un planning.
///
/// - `remove_user` seul : retrait de couverture
/// - `add_user` seul : couverture ajoutée
/// - les deux : remplacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOverride {
    pub id: OverrideId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_user: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_user: Option<UserId>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub schedule_id: ScheduleId,
}

impl UserOverride {
    pub fn new(
        schedule_id: ScheduleId,
        add_user: Option<UserId>,
        remove_user: Option<UserId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, String> {
        if end <= start {
            return Err("override end must be after start".to_string());
        }
        if add_user.is_none() && remove_user.is_none() {
            return Err("override must add or remove a user".to_string());
        }
        Ok(Self {
            id: OverrideId::random(),
            add_user,
            remove_user,
            start,
            end,
            schedule_id,
        })
    }
}
