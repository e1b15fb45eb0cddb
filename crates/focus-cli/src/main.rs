#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod providers;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use focus_extract::SqlDatabaseExtractor;
use focus_pipeline::RunCoordinator;
use focus_registry::{Extractor, ProviderRegistry};
use focus_store::{PostgresStore, StoragePort};

use crate::config::{Cli, Command};

pub const TRACING_TARGET_SHUTDOWN: &str = "focus_cli::shutdown";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(target: TRACING_TARGET_SHUTDOWN, error = %error, "command failed");
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    Cli::log_build_info();

    cli.pipeline.validate().context("invalid pipeline configuration")?;

    if matches!(cli.command, Command::Migrate) {
        return commands::migrate(&cli.storage.database_url).await;
    }

    let store_config = cli.storage.store_config();
    let storage = PostgresStore::connect(&store_config).context("failed to connect to the billing store")?;
    let storage: Arc<dyn StoragePort> = Arc::new(storage);

    let registry = Arc::new(ProviderRegistry::new());
    let gcp_extractor: Option<Arc<dyn Extractor>> = match &cli.storage.gcp_warehouse_url {
        Some(url) => Some(Arc::new(SqlDatabaseExtractor::connect(url).await.context("failed to connect to the GCP warehouse")?)),
        None => None,
    };
    providers::register_builtin(&registry, gcp_extractor).context("failed to register built-in provider types")?;

    let encryption_key = cli.encryption.encryption_key()?;
    let mut coordinator = RunCoordinator::new(storage.clone(), registry.clone(), cli.pipeline.coordinator_config());
    if let Some(key) = encryption_key.clone() {
        coordinator = coordinator.with_encryption_key(key);
    }
    let coordinator = Arc::new(coordinator);

    match cli.command {
        Command::Migrate => unreachable!("handled above"),
        Command::ProviderAdd { name, type_tag, display_name, endpoint, params, additional_config, auth } => {
            commands::provider_add(&storage, &registry, encryption_key.as_ref(), name, type_tag, display_name, endpoint, params, additional_config, auth).await
        }
        Command::ProviderList => commands::provider_list(&storage, &registry).await,
        Command::Trigger { provider_id, start, end, days_back } => commands::trigger(&coordinator, &storage, provider_id, start, end, days_back).await,
        Command::Cancel { run_id } => commands::cancel(&coordinator, run_id).await,
        Command::Retry { run_id } => commands::retry(&coordinator, run_id).await,
        Command::Status { run_id, provider_id, limit } => commands::status(&coordinator, run_id, provider_id, limit).await,
        Command::Stats { provider_id, days } => commands::stats(&coordinator, provider_id, days).await,
    }
}
