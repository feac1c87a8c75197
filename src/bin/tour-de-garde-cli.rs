#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tour_de_garde::{
    io,
    jobs::MemoryJobQueue,
    model::{RotationId, ScheduleId},
    rotation::{BoundaryStrategy, CancelFlag, RotationManager},
    scheduler::ShiftCalculator,
    storage::{Dataset, JsonStorage, MemoryStore, Storage},
    EngineOptions,
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// Calcul des tours de garde à partir d'un jeu de données JSON
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON du jeu de données
    #[arg(long, global = true, default_value = "dataset.json")]
    data: String,

    /// Réglages du moteur (JSON) ; défauts sinon
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Shifts finaux d'un planning
    Shifts {
        #[arg(long)]
        schedule: String,
        /// RFC3339
        #[arg(long)]
        start: String,
        /// RFC3339
        #[arg(long)]
        end: String,
        /// Ignorer les remplacements
        #[arg(long)]
        no_overrides: bool,
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Règles et shifts par cible (JSON)
    Assignments {
        #[arg(long)]
        schedule: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },

    /// Shifts d'une rotation, alignés sur la fenêtre
    RotationShifts {
        #[arg(long)]
        rotation: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },

    /// Prochaines relèves d'une rotation
    Handoffs {
        #[arg(long)]
        rotation: String,
        /// RFC3339 ; maintenant par défaut
        #[arg(long)]
        after: Option<String>,
        #[arg(long, default_value_t = 5)]
        count: usize,
    },

    /// Exécuter le job d'avancement d'une rotation
    Advance {
        #[arg(long)]
        rotation: String,
        /// RFC3339 ; maintenant par défaut
        #[arg(long)]
        now: Option<String>,
    },

    /// Balayer toutes les rotations
    Sweep {
        #[arg(long)]
        now: Option<String>,
    },

    /// Importer des remplacements depuis un CSV
    ImportOverrides {
        #[arg(long)]
        schedule: String,
        #[arg(long)]
        csv: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let opts = match &cli.config {
        Some(path) => EngineOptions::load(path)?,
        None => EngineOptions::default(),
    };
    let storage = JsonStorage::open(&cli.data)?;
    let dataset = storage
        .load()
        .with_context(|| format!("loading dataset {}", cli.data))?;

    let code = match cli.cmd {
        Commands::Shifts {
            schedule,
            start,
            end,
            no_overrides,
            out_csv,
        } => {
            let store = MemoryStore::from_dataset(dataset);
            let calc = ShiftCalculator::new(&store, opts);
            let id = ScheduleId::new(schedule);
            let (start, end) = (parse_instant(&start)?, parse_instant(&end)?);
            let shifts = if no_overrides {
                calc.schedule_final_shifts(start, end, &id)?
            } else {
                calc.schedule_final_shifts_with_overrides(start, end, &id)?
            };
            if let Some(path) = out_csv {
                io::export_shifts_csv(path, &shifts)?;
            }
            for s in &shifts {
                println!("{s}");
            }
            0
        }
        Commands::Assignments {
            schedule,
            start,
            end,
        } => {
            let store = MemoryStore::from_dataset(dataset);
            let calc = ShiftCalculator::new(&store, opts);
            let assignments = calc.schedule_assignments(
                parse_instant(&start)?,
                parse_instant(&end)?,
                &ScheduleId::new(schedule),
            )?;
            println!("{}", serde_json::to_string_pretty(&assignments)?);
            0
        }
        Commands::RotationShifts {
            rotation,
            start,
            end,
        } => {
            let store = MemoryStore::from_dataset(dataset);
            let calc = ShiftCalculator::new(&store, opts);
            let shifts = calc.rotation_shifts(
                parse_instant(&start)?,
                parse_instant(&end)?,
                &RotationId::new(rotation),
            )?;
            for s in &shifts {
                println!(
                    "{} → {} | {}",
                    s.start.to_rfc3339(),
                    s.end.to_rfc3339(),
                    s.participant_id
                );
            }
            0
        }
        Commands::Handoffs {
            rotation,
            after,
            count,
        } => {
            let id = RotationId::new(rotation);
            let rot = dataset
                .find_rotation(&id)
                .ok_or_else(|| anyhow::anyhow!("unknown rotation: {}", id))?;
            let after = parse_optional_instant(after.as_deref())?;
            let strategy = BoundaryStrategy::as_of(after, opts.legacy_boundaries_before);
            let clock = rot.clock()?.with_strategy(strategy);
            for t in clock.next_handoffs(after, count) {
                println!("{}", t.with_timezone(&rot.time_zone).to_rfc3339());
            }
            0
        }
        Commands::Advance { rotation, now } => {
            let now = parse_optional_instant(now.as_deref())?;
            let (store, queue) = (MemoryStore::from_dataset(dataset), MemoryJobQueue::default());
            store.set_now(Some(now));
            let manager = RotationManager::new(&store, &queue, opts);
            let outcome = manager.advance_rotation(&RotationId::new(rotation))?;
            save(&storage, store.dataset())?;
            match (&outcome.phase, &outcome.state) {
                (None, _) => println!("{}: rotation deleted, nothing to do", outcome.rotation_id),
                (Some(phase), Some(state)) => println!(
                    "{}: {:?}, position {} since {}",
                    outcome.rotation_id,
                    phase,
                    state.position,
                    state.shift_start.to_rfc3339()
                ),
                (Some(phase), None) => println!("{}: {:?}, no state", outcome.rotation_id, phase),
            }
            if let Some(next) = outcome.next_run {
                println!("next run at {}", next.to_rfc3339());
            }
            0
        }
        Commands::Sweep { now } => {
            let now = parse_optional_instant(now.as_deref())?;
            let (store, queue) = (MemoryStore::from_dataset(dataset), MemoryJobQueue::default());
            store.set_now(Some(now));
            let manager = RotationManager::new(&store, &queue, opts);
            let report = manager.sweep(&CancelFlag::new())?;
            save(&storage, store.dataset())?;
            println!(
                "examined {}, updated {}, deferred {}",
                report.examined, report.updated, report.deferred
            );
            // Code 2 = lot plein, un autre balayage est nécessaire
            if report.deferred > 0 {
                2
            } else {
                0
            }
        }
        Commands::ImportOverrides { schedule, csv } => {
            let id = ScheduleId::new(schedule);
            let mut dataset = dataset;
            if dataset.find_schedule(&id).is_none() {
                anyhow::bail!("unknown schedule: {}", id);
            }
            let overrides = io::import_overrides_csv(csv, &id)?;
            println!("imported {} override(s)", overrides.len());
            dataset.overrides.extend(overrides);
            save(&storage, dataset)?;
            0
        }
    };

    std::process::exit(code);
}

fn save(storage: &JsonStorage, dataset: Dataset) -> Result<()> {
    storage
        .save(&dataset)
        .with_context(|| format!("saving dataset {}", storage.path().display()))
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .with_context(|| format!("invalid RFC3339 instant: {raw}"))
}

fn parse_optional_instant(raw: Option<&str>) -> Result<DateTime<Utc>> {
    raw.map_or_else(|| Ok(Utc::now()), parse_instant)
}
