use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Réglages du moteur
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Nombre maximal de rotations mises à jour par balayage.
    pub sweep_batch_size: usize,
    /// Borne des boucles d'avance et d'expansion (garde-fou de corruption).
    pub max_iterations: usize,
    /// Retard de relève au-delà duquel un avertissement est émis.
    pub delayed_advance_after_minutes: i64,
    /// Granularité de dédoublonnage des jobs de rotation.
    pub reschedule_bucket_minutes: i64,
    /// Avant cette date, les relèves utilisent l'algorithme historique.
    pub legacy_boundaries_before: Option<DateTime<Utc>>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sweep_batch_size: 150,
            max_iterations: 10_000,
            delayed_advance_after_minutes: 15,
            reschedule_bucket_minutes: 1,
            legacy_boundaries_before: None,
        }
    }
}

impl EngineOptions {
    /// Charge les réglages depuis un fichier JSON (champs absents = défauts).
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let opts: EngineOptions = serde_json::from_slice(&data)
            .with_context(|| format!("parsing engine options {}", path.display()))?;
        anyhow::ensure!(opts.sweep_batch_size > 0, "sweep_batch_size must be > 0");
        anyhow::ensure!(opts.max_iterations > 0, "max_iterations must be > 0");
        anyhow::ensure!(
            opts.reschedule_bucket_minutes > 0,
            "reschedule_bucket_minutes must be > 0"
        );
        Ok(opts)
    }

    pub fn delayed_advance_after(&self) -> Duration {
        Duration::minutes(self.delayed_advance_after_minutes)
    }

    pub fn reschedule_bucket(&self) -> Duration {
        Duration::minutes(self.reschedule_bucket_minutes)
    }
}
