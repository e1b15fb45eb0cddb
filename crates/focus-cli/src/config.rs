//! CLI configuration, env-driven via `clap`'s `env` feature.
//!
//! One `#[derive(Parser)]` root struct flattening one `Args` group per
//! concern (storage, pipeline tuning, encryption, the GCP warehouse
//! connection).

use std::process;

use anyhow::{Context, Result as AnyhowResult, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::{Args, Parser, Subcommand};
use focus_core::crypto::EncryptionKey;
use focus_pipeline::CoordinatorConfig;
use focus_store::StoreConfig;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const TRACING_TARGET_STARTUP: &str = "focus_cli::startup";
pub const TRACING_TARGET_CONFIG: &str = "focus_cli::config";

/// Top-level CLI: a storage/pipeline configuration shared by every
/// subcommand, plus the subcommand itself.
#[derive(Debug, Clone, Parser)]
#[command(name = "focus-cli")]
#[command(about = "Trigger surface over the FOCUS billing ETL run coordinator")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub storage: StorageArgs,

    #[clap(flatten)]
    pub pipeline: PipelineArgs,

    #[clap(flatten)]
    pub encryption: EncryptionArgs,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads `.env` (if the `dotenv` feature is enabled) before parsing, so
    /// clap's `env` attributes see values a `.env` file supplies.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    pub fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "build information"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv"), cfg!(feature = "otel").then_some("otel")]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct StorageArgs {
    /// PostgreSQL connection URL for the billing store.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Maximum pooled connections to the billing store.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub database_max_connections: u32,

    /// Records merged per `upsert_focus` transaction.
    #[arg(long, env = "DATABASE_BATCH_SIZE", default_value_t = 500)]
    pub database_batch_size: usize,

    /// Optional BigQuery-fronting warehouse connection string for the
    /// `gcp` provider type's SQL extractor. The `gcp` provider type is not
    /// registered when this is absent.
    #[arg(long, env = "GCP_WAREHOUSE_URL")]
    pub gcp_warehouse_url: Option<String>,
}

impl StorageArgs {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.database_url.clone())
            .with_max_connections(self.database_max_connections)
            .with_batch_size(self.database_batch_size)
    }
}

/// Run coordinator tuning knobs.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct PipelineArgs {
    /// Max sources extracted, or load batches written, concurrently within one run.
    #[arg(long, env = "WORKER_COUNT", default_value_t = 4)]
    pub worker_count: usize,

    /// Fraction of sources that may fail extraction before Extract fails the run.
    #[arg(long, env = "EXTRACT_FAILURE_RATIO", default_value_t = 0.30)]
    pub extract_failure_ratio: f64,

    /// Fraction of batches that may fail to commit before Load fails the run.
    #[arg(long, env = "LOAD_FAILURE_RATIO", default_value_t = 0.10)]
    pub load_failure_ratio: f64,

    /// Records per `upsert_focus` call within one run.
    #[arg(long, env = "LOAD_BATCH_SIZE", default_value_t = 500)]
    pub load_batch_size: usize,

    /// Whether Transform validates in strict mode.
    #[arg(long, env = "STRICT_VALIDATION", default_value_t = true)]
    pub strict_validation: bool,

    /// Strict-mode violation count above which a record is rejected.
    #[arg(long, env = "MAX_VIOLATIONS_BEFORE_REJECT", default_value_t = 3)]
    pub max_violations_before_reject: usize,
}

impl PipelineArgs {
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            worker_count: self.worker_count,
            extract_failure_ratio: self.extract_failure_ratio,
            load_failure_ratio: self.load_failure_ratio,
            load_batch_size: self.load_batch_size,
            strict_validation: self.strict_validation,
            max_violations_before_reject: self.max_violations_before_reject,
        }
    }

    pub fn validate(&self) -> AnyhowResult<()> {
        if !(0.0..=1.0).contains(&self.extract_failure_ratio) {
            return Err(anyhow!("extract-failure-ratio must be between 0.0 and 1.0"));
        }
        if !(0.0..=1.0).contains(&self.load_failure_ratio) {
            return Err(anyhow!("load-failure-ratio must be between 0.0 and 1.0"));
        }
        if self.worker_count == 0 {
            return Err(anyhow!("worker-count must be greater than zero"));
        }
        Ok(())
    }
}

/// Field-level auth encryption configuration.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct EncryptionArgs {
    /// Base64-encoded 32-byte master key used to encrypt/decrypt provider
    /// auth fields. Without it, `provider.auth` is treated as already
    /// plaintext (fine for local development, not for production).
    #[arg(long, env = "ENCRYPTION_KEY")]
    #[serde(skip)]
    pub encryption_key: Option<String>,
}

impl EncryptionArgs {
    /// Decodes the configured key, if any.
    pub fn encryption_key(&self) -> AnyhowResult<Option<EncryptionKey>> {
        let Some(encoded) = &self.encryption_key else { return Ok(None) };
        let bytes = BASE64.decode(encoded).context("ENCRYPTION_KEY is not valid base64")?;
        let key = EncryptionKey::from_bytes(&bytes).map_err(|err| anyhow!("invalid encryption key: {err}"))?;
        Ok(Some(key))
    }
}

/// The `focus-cli` subcommand surface: migrations, provider and run
/// administration, and triggering runs, on top of the programmatic
/// trigger/cancel/status API.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Runs pending database migrations and exits.
    Migrate,

    /// Registers a new provider row.
    ProviderAdd {
        /// Short machine name for the provider row.
        #[arg(long)]
        name: String,
        /// Registered provider type tag (openai, aws, azure, gcp).
        #[arg(long)]
        type_tag: String,
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        endpoint: Option<String>,
        /// JSON object of non-sensitive provider params.
        #[arg(long, default_value = "{}")]
        params: String,
        /// JSON object of provider-specific extra config.
        #[arg(long, default_value = "{}")]
        additional_config: String,
        /// JSON-encoded `AuthConfig` (plaintext; encrypted before storage
        /// when an encryption key is configured).
        #[arg(long)]
        auth: String,
    },

    /// Lists registered provider types and active providers.
    ProviderList,

    /// Triggers a run. Omit `--provider-id` to trigger every active provider.
    Trigger {
        #[arg(long)]
        provider_id: Option<uuid::Uuid>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        days_back: Option<i64>,
    },

    /// Requests cancellation of a running or pending run.
    Cancel { run_id: uuid::Uuid },

    /// Creates and spawns a new run retrying a terminal one.
    Retry { run_id: uuid::Uuid },

    /// Reports a run's current state, or lists recent runs for a provider.
    Status {
        #[arg(long)]
        run_id: Option<uuid::Uuid>,
        #[arg(long)]
        provider_id: Option<uuid::Uuid>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Summarizes recent run outcomes for a provider.
    Stats {
        #[arg(long)]
        provider_id: uuid::Uuid,
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}
