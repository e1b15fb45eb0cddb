//! Subcommand handlers. Each takes the already-wired coordinator/storage/
//! registry and whatever the subcommand's own arguments were, and prints
//! its result as pretty JSON to stdout — this binary has no other surface.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use focus_core::crypto::{encrypt_str, EncryptionKey};
use focus_core::provider_entity::{LastSyncStatus, ProviderEntity};
use focus_core::run::RunType;
use focus_pipeline::RunCoordinator;
use focus_registry::ProviderRegistry;
use focus_store::StoragePort;
use jiff::Timestamp;
use serde_json::Value;
use uuid::Uuid;

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_timestamp(raw: &str) -> Result<Timestamp> {
    raw.parse::<Timestamp>().with_context(|| format!("invalid timestamp: {raw}"))
}

/// Recursively encrypts every string leaf of an auth JSON value, the
/// mirror image of the coordinator's `decrypt_auth_value`. Plaintext
/// values are always encrypted (never conditionally, unlike decrypt's
/// pass-through for already-plaintext values), since this runs exactly
/// once at registration time.
fn encrypt_auth_value(key: &EncryptionKey, value: &Value) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(encrypt_str(key, s).map_err(|err| anyhow!("failed to encrypt auth field: {err}"))?)),
        Value::Array(items) => Ok(Value::Array(items.iter().map(|item| encrypt_auth_value(key, item)).collect::<Result<_>>()?)),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), encrypt_auth_value(key, v)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

pub async fn migrate(database_url: &str) -> Result<()> {
    focus_store::postgres::PostgresStore::run_pending_migrations(database_url).context("failed to run migrations")?;
    println!("migrations applied");
    Ok(())
}

pub async fn provider_add(
    storage: &Arc<dyn StoragePort>,
    registry: &ProviderRegistry,
    encryption_key: Option<&EncryptionKey>,
    name: String,
    type_tag: String,
    display_name: String,
    endpoint: Option<String>,
    params: String,
    additional_config: String,
    auth: String,
) -> Result<()> {
    registry.get_metadata(&type_tag).context("unknown provider type_tag; is it registered?")?;

    let params: Value = serde_json::from_str(&params).context("--params must be valid JSON")?;
    let additional_config: Value = serde_json::from_str(&additional_config).context("--additional-config must be valid JSON")?;
    let auth_plain: Value = serde_json::from_str(&auth).context("--auth must be valid JSON")?;

    let auth_stored = match encryption_key {
        Some(key) => encrypt_auth_value(key, &auth_plain)?,
        None => auth_plain,
    };

    let provider = ProviderEntity {
        id: Uuid::new_v4(),
        name,
        type_tag,
        display_name,
        endpoint,
        params,
        additional_config,
        auth: auth_stored,
        active: true,
        validated: false,
        last_synced_at: None,
        last_sync_status: LastSyncStatus::Never,
    };
    provider.validate().map_err(|err| anyhow!("{err}"))?;

    let created = storage.create_provider(&provider).await.map_err(|err| anyhow!("{err}"))?;
    print_json(&created)
}

pub async fn provider_list(storage: &Arc<dyn StoragePort>, registry: &ProviderRegistry) -> Result<()> {
    let types = registry.list_metadata();
    let providers = storage.list_active_providers().await.map_err(|err| anyhow!("{err}"))?;
    print_json(&serde_json::json!({ "registered_types": types, "active_providers": providers }))
}

pub async fn trigger(
    coordinator: &Arc<RunCoordinator>,
    storage: &Arc<dyn StoragePort>,
    provider_id: Option<Uuid>,
    start: Option<String>,
    end: Option<String>,
    days_back: Option<i64>,
) -> Result<()> {
    let start = start.map(|s| parse_timestamp(&s)).transpose()?;
    let end = end.map(|s| parse_timestamp(&s)).transpose()?;

    let targets = match provider_id {
        Some(id) => vec![id],
        None => storage
            .list_active_providers()
            .await
            .map_err(|err| anyhow!("{err}"))?
            .into_iter()
            .map(|p| p.id)
            .collect(),
    };

    let mut run_ids = Vec::new();
    let mut errors = Vec::new();
    for id in targets {
        match coordinator.trigger(id, start, end, days_back, RunType::Manual).await {
            Ok(run) => run_ids.push(run.id),
            Err(err) => errors.push(serde_json::json!({ "provider_id": id, "error": err.to_string() })),
        }
    }

    print_json(&serde_json::json!({ "run_ids": run_ids, "errors": errors }))
}

pub async fn cancel(coordinator: &Arc<RunCoordinator>, run_id: Uuid) -> Result<()> {
    let cancelled = coordinator.cancel(run_id).await.map_err(|err| anyhow!("{err}"))?;
    print_json(&serde_json::json!({ "run_id": run_id, "cancel_requested": cancelled }))
}

pub async fn retry(coordinator: &Arc<RunCoordinator>, run_id: Uuid) -> Result<()> {
    let run = coordinator.retry(run_id).await.map_err(|err| anyhow!("{err}"))?;
    print_json(&run)
}

pub async fn status(coordinator: &Arc<RunCoordinator>, run_id: Option<Uuid>, provider_id: Option<Uuid>, limit: i64) -> Result<()> {
    match (run_id, provider_id) {
        (Some(run_id), _) => {
            let run = coordinator.status(run_id).await.map_err(|err| anyhow!("{err}"))?;
            print_json(&run)
        }
        (None, Some(provider_id)) => {
            let runs = coordinator.list_runs(provider_id, limit).await.map_err(|err| anyhow!("{err}"))?;
            print_json(&runs)
        }
        (None, None) => Err(anyhow!("status requires --run-id or --provider-id")),
    }
}

pub async fn stats(coordinator: &Arc<RunCoordinator>, provider_id: Uuid, days: i64) -> Result<()> {
    let stats = coordinator.stats(provider_id, days).await.map_err(|err| anyhow!("{err}"))?;
    print_json(&stats)
}
