mod batch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use diagnost_ai::{InferenceService, ModelRegistry};
use diagnost_core::{AppointmentNote, ModelsConfig, PatientContext};
use diagnost_store::{DuckRecommendations, MemoryRecommendations, RecommendationStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "diagnost", version, about = "Diagnosis classification from clinical notes")]
struct Cli {
    /// Directory holding the model artifacts.
    #[arg(long, env = "DIAGNOST_MODELS_DIR", global = true)]
    models_dir: Option<PathBuf>,

    /// JSON file overriding the artifact layout.
    #[arg(long, env = "DIAGNOST_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load every artifact and report their shapes.
    Check,
    /// Classify one appointment note.
    Predict {
        /// `single` (alias `bert`) or `ensemble`.
        #[arg(long, default_value = "ensemble")]
        mode: String,
        #[arg(long)]
        complaints: Option<String>,
        #[arg(long)]
        anamnesis: Option<String>,
        #[arg(long = "objective")]
        objective_status: Option<String>,
        /// Patient gender (`male` or `female`).
        #[arg(long)]
        gender: Option<String>,
        /// Patient birth date, YYYY-MM-DD.
        #[arg(long)]
        birth_date: Option<NaiveDate>,
    },
    /// Classify a JSON-lines file of `{"mode": .., "complaints": .., ...}` requests.
    Batch {
        input: PathBuf,
        /// Predictions in flight at once.
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Look up the recommendation for a diagnosis label.
    Recommend {
        #[arg(long)]
        label: String,
        /// JSON object `{label: text}`.
        #[arg(long, conflicts_with = "duckdb", required_unless_present = "duckdb")]
        json: Option<PathBuf>,
        /// DuckDB file with a `recommendations` table.
        #[arg(long)]
        duckdb: Option<PathBuf>,
    },
}

impl Cli {
    fn models_config(&self) -> anyhow::Result<ModelsConfig> {
        let mut config = match &self.config {
            Some(path) => ModelsConfig::from_file(path)?,
            None => ModelsConfig::default(),
        };
        if let Some(dir) = &self.models_dir {
            config.models_dir = dir.clone();
        }
        Ok(config)
    }

    fn service(&self) -> anyhow::Result<InferenceService> {
        let config = self.models_config()?;
        let registry = ModelRegistry::load(&config).context("loading model registry")?;
        Ok(InferenceService::new(Arc::new(registry)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("diagnost v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let today = chrono::Local::now().date_naive();

    match &cli.command {
        Command::Check => {
            let service = cli.service()?;
            let s = service.registry().summary();
            println!("device:            {}", s.device.as_str());
            println!("single classes:    {}", s.single_classes);
            println!("ensemble classes:  {}", s.ensemble_classes);
            println!("fusion input dim:  {}", s.fusion_input_dim);
            println!("synonym entries:   {}", s.synonyms);
        }
        Command::Predict {
            mode,
            complaints,
            anamnesis,
            objective_status,
            gender,
            birth_date,
        } => {
            // Reject unknown modes before paying for model loading.
            mode.parse::<diagnost_core::ClassifierMode>()?;
            let note = AppointmentNote {
                complaints: complaints.clone(),
                anamnesis: anamnesis.clone(),
                objective_status: objective_status.clone(),
                patient: (gender.is_some() || birth_date.is_some()).then(|| PatientContext {
                    gender: gender.clone(),
                    birth_date: *birth_date,
                }),
            };
            let service = cli.service()?;
            let result = service.predict_note(mode, &note, today)?;
            println!("{}", result.result);
        }
        Command::Batch { input, concurrency } => {
            let raw = tokio::fs::read_to_string(input)
                .await
                .with_context(|| format!("reading {}", input.display()))?;
            let service = cli.service()?;
            let mut stdout = std::io::stdout().lock();
            let stats = batch::run_batch(&service, &raw, today, *concurrency, &mut stdout).await?;
            eprintln!(
                "  Classified {}/{} requests in {:.2}s ({} failed)",
                stats.succeeded,
                stats.total,
                stats.elapsed_secs,
                stats.total - stats.succeeded
            );
        }
        Command::Recommend {
            label,
            json,
            duckdb,
        } => {
            let store: Box<dyn RecommendationStore> = match (json, duckdb) {
                (Some(path), _) => Box::new(MemoryRecommendations::load(path)?),
                (None, Some(path)) => Box::new(DuckRecommendations::open_persistent(path)?),
                (None, None) => anyhow::bail!("one of --json or --duckdb is required"),
            };
            println!("{}", store.recommendation(label)?);
        }
    }

    Ok(())
}
