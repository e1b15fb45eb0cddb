//! The run coordinator.
//!
//! One [`RunCoordinator`] serves every registered provider type. `trigger`
//! persists a pending [`Run`] and spawns its execution in the background;
//! callers track progress via `status`/`stats` and stop it early via
//! `cancel`. Execution itself is `Extract -> Transform -> Load`, each stage
//! checking `cancellation` between units of work and reporting its outcome
//! onto the run's counters before the next stage starts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jiff::{Span, Timestamp};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use focus_core::crypto::{decrypt_str, EncryptionKey};
use focus_core::error::{Error, ErrorKind, Result};
use focus_core::focus::FocusRecord;
use focus_core::provider_entity::ProviderEntity;
use focus_core::run::{Run, RunCounters, RunStatus, RunType, StageName};
use focus_mapper::FocusValidator;
use focus_registry::{
    ExtractContext, ExtractedBatch, MapOutcome, ProviderMetadata, ProviderRegistry, ResolvedAuth, SourceSpec, Window,
};
use focus_store::{StoragePort, UpsertOutcome};

use crate::config::CoordinatorConfig;
use crate::sink::StorageRawBlobSink;
use crate::stats::{within_window, RunStats};

const TRACING_TARGET: &str = "focus_pipeline::coordinator";

/// Wires the registry, extractor, mapper, and storage trait seams together
/// and owns the cancellation registry for runs currently executing in this
/// process.
pub struct RunCoordinator {
    storage: Arc<dyn StoragePort>,
    registry: Arc<ProviderRegistry>,
    config: CoordinatorConfig,
    encryption_key: Option<EncryptionKey>,
    cancellations: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl RunCoordinator {
    pub fn new(storage: Arc<dyn StoragePort>, registry: Arc<ProviderRegistry>, config: CoordinatorConfig) -> Self {
        Self {
            storage,
            registry,
            config,
            encryption_key: None,
            cancellations: Mutex::new(HashMap::new()),
        }
    }

    /// Enables auth-field decryption. Without a key, `provider.auth` is
    /// assumed to already be plaintext JSON (fine for tests and for a
    /// deployment with encryption turned off).
    pub fn with_encryption_key(mut self, key: EncryptionKey) -> Self {
        self.encryption_key = Some(key);
        self
    }

    /// Resolves a run window, persists a pending [`Run`], and spawns its
    /// execution in the background. Returns as soon as the run is
    /// persisted; it does not wait for the run to finish.
    pub async fn trigger(
        self: &Arc<Self>,
        provider_id: Uuid,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
        days_back: Option<i64>,
        run_type: RunType,
    ) -> Result<Run> {
        let (window_start, window_end) = Run::resolve_window(start, end, days_back, Timestamp::now());
        let run = Run {
            id: Uuid::new_v4(),
            provider_id,
            run_type,
            status: RunStatus::Pending,
            window_start,
            window_end,
            last_completed_stage: None,
            counters: RunCounters::default(),
            retry_of: None,
            started_at: None,
            completed_at: None,
            error_message: None,
        };
        let run = self.storage.create_run(&run).await?;
        self.spawn_execution(run.clone());
        Ok(run)
    }

    /// Creates and spawns a new, linked run over `run_id`'s original
    /// window. `run_id` must already be in a terminal state.
    pub async fn retry(self: &Arc<Self>, run_id: Uuid) -> Result<Run> {
        let original = self
            .storage
            .get_run(run_id)
            .await?
            .ok_or_else(|| Error::config_invalid(format!("no such run: {run_id}")))?;
        if !original.status.is_terminal() {
            return Err(Error::config_invalid(format!("run {run_id} has not finished, cannot retry")));
        }
        let retry = original.retry(Uuid::new_v4());
        let retry = self.storage.create_run(&retry).await?;
        self.spawn_execution(retry.clone());
        Ok(retry)
    }

    /// Cancels a run. Idempotent: cancelling an already-terminal run is a
    /// no-op returning `false`, not an error. Returns `true` if this call
    /// is the one that requested cancellation.
    pub async fn cancel(&self, run_id: Uuid) -> Result<bool> {
        let token = {
            let cancellations = self.cancellations.lock().expect("cancellation registry lock poisoned");
            cancellations.get(&run_id).cloned()
        };
        if let Some(token) = token {
            token.cancel();
            return Ok(true);
        }

        // Not actively executing in this process (different process, or
        // already finished): cancel directly in storage if still eligible.
        let Some(mut run) = self.storage.get_run(run_id).await? else {
            return Err(Error::config_invalid(format!("no such run: {run_id}")));
        };
        if run.status.is_cancellable() {
            run.finish(RunStatus::Cancelled, Timestamp::now());
            self.storage.update_run(&run).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub async fn status(&self, run_id: Uuid) -> Result<Option<Run>> {
        self.storage.get_run(run_id).await.map_err(Into::into)
    }

    pub async fn list_runs(&self, provider_id: Uuid, limit: i64) -> Result<Vec<Run>> {
        self.storage.list_runs(provider_id, limit).await.map_err(Into::into)
    }

    /// Aggregates a provider's run history over the last `lookback_days`.
    pub async fn stats(&self, provider_id: Uuid, lookback_days: i64) -> Result<RunStats> {
        let runs = self.storage.list_runs(provider_id, i64::MAX).await?;
        let now = Timestamp::now();
        let cutoff = now.checked_sub(Span::new().days(lookback_days)).unwrap_or(now);
        let windowed: Vec<Run> = runs.into_iter().filter(|run| within_window(run, cutoff)).collect();
        Ok(RunStats::summarize(&windowed))
    }

    fn spawn_execution(self: &Arc<Self>, run: Run) {
        let coordinator = Arc::clone(self);
        let token = CancellationToken::new();
        self.cancellations
            .lock()
            .expect("cancellation registry lock poisoned")
            .insert(run.id, token.clone());
        tokio::spawn(async move {
            coordinator.execute(run, token).await;
        });
    }

    async fn execute(self: Arc<Self>, mut run: Run, cancellation: CancellationToken) {
        run.transition_to(RunStatus::Running);
        run.started_at = Some(Timestamp::now());
        if let Err(err) = self.storage.update_run(&run).await {
            tracing::error!(target: TRACING_TARGET, run_id = %run.id, error = %err, "failed to persist run start");
        }

        let outcome = self.run_stages(&mut run, &cancellation).await;
        let finished_at = Timestamp::now();
        match outcome {
            Ok(()) => {
                run.finish(RunStatus::Completed, finished_at);
                tracing::info!(target: TRACING_TARGET, run_id = %run.id, counters = ?run.counters, "run completed");
            }
            Err(err) if err.kind == ErrorKind::Cancelled => {
                run.finish(RunStatus::Cancelled, finished_at);
                tracing::info!(target: TRACING_TARGET, run_id = %run.id, "run cancelled");
            }
            Err(err) => {
                run.error_message = Some(err.to_string());
                run.finish(RunStatus::Failed, finished_at);
                tracing::error!(target: TRACING_TARGET, run_id = %run.id, error = %err, "run failed");
            }
        }

        if let Err(err) = self.storage.update_run(&run).await {
            tracing::error!(target: TRACING_TARGET, run_id = %run.id, error = %err, "failed to persist final run state");
        }
        self.cancellations.lock().expect("cancellation registry lock poisoned").remove(&run.id);
    }

    async fn run_stages(&self, run: &mut Run, cancellation: &CancellationToken) -> Result<()> {
        let provider = self
            .storage
            .get_provider(run.provider_id)
            .await?
            .ok_or_else(|| Error::provider_not_found(run.provider_id))?;
        if !provider.active {
            return Err(Error::config_invalid(format!("provider {} is not active", provider.id)));
        }
        let provider = Arc::new(provider);

        let metadata = self.registry.get_metadata(&provider.type_tag)?;
        let resolved_auth = Arc::new(self.resolve_auth(&metadata, &provider)?);

        let source_descriptor = self.registry.new_source(&provider.type_tag)?;
        let sources = source_descriptor.describe(&provider)?;
        for source in &sources {
            source.validate()?;
        }

        if cancellation.is_cancelled() {
            return Err(Error::cancelled());
        }

        let extracted = self.run_extract(&provider, &resolved_auth, run, &sources, cancellation).await?;
        run.counters.records_extracted = extracted.iter().map(|batch| batch.records.len() as u64).sum();
        run.last_completed_stage = Some(StageName::Extract);
        self.storage.update_run(run).await?;

        if cancellation.is_cancelled() {
            return Err(Error::cancelled());
        }

        let (valid_records, blob_ids) = self.run_transform(&provider, run, extracted, cancellation).await?;
        run.last_completed_stage = Some(StageName::Transform);
        self.storage.update_run(run).await?;

        if cancellation.is_cancelled() {
            return Err(Error::cancelled());
        }

        self.run_load(run, valid_records, blob_ids, cancellation).await?;
        run.last_completed_stage = Some(StageName::Load);
        Ok(())
    }

    fn resolve_auth(&self, metadata: &ProviderMetadata, provider: &ProviderEntity) -> Result<ResolvedAuth> {
        let raw = match &self.encryption_key {
            Some(key) => decrypt_auth_value(key, &provider.auth)?,
            None => provider.auth.clone(),
        };
        focus_registry::resolve_auth(metadata, raw)
    }

    async fn run_extract(
        &self,
        provider: &Arc<ProviderEntity>,
        auth: &Arc<ResolvedAuth>,
        run: &Run,
        sources: &[SourceSpec],
        cancellation: &CancellationToken,
    ) -> Result<Vec<ExtractedBatch>> {
        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let extractor = self.registry.new_extractor(&provider.type_tag)?;
        let sink: Arc<dyn focus_registry::RawBlobSink> = Arc::new(StorageRawBlobSink::new(self.storage.clone()));
        let window = Window::new(run.window_start, run.window_end);
        let semaphore = Arc::new(Semaphore::new(self.config.worker_count.max(1)));

        let mut tasks = JoinSet::new();
        for source in sources {
            if cancellation.is_cancelled() {
                break;
            }
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::internal_bug("extract semaphore closed"))?;
            let extractor = extractor.clone();
            let provider = provider.clone();
            let auth = auth.clone();
            let sink = sink.clone();
            let source = source.clone();
            let run_id = run.id;
            let cancel = cancellation.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let ctx = ExtractContext {
                    provider: &provider,
                    auth: &auth,
                    run_id,
                    window,
                    sink: sink.as_ref(),
                    cancellation: cancel,
                };
                extractor.extract(&ctx, &source).await
            });
        }

        let total_sources = sources.len();
        let mut extracted = Vec::new();
        let mut failures = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(batches)) => extracted.extend(batches),
                Ok(Err(err)) => {
                    tracing::warn!(target: TRACING_TARGET, run_id = %run.id, error = %err, "source extraction failed");
                    failures += 1;
                }
                Err(join_err) => {
                    tracing::error!(target: TRACING_TARGET, run_id = %run.id, error = %join_err, "extraction task panicked");
                    failures += 1;
                }
            }
        }

        if cancellation.is_cancelled() {
            return Err(Error::cancelled());
        }

        let failure_ratio = if total_sources == 0 { 0.0 } else { failures as f64 / total_sources as f64 };
        if failure_ratio > self.config.extract_failure_ratio {
            return Err(Error::source_failed(format!(
                "{failures}/{total_sources} sources failed extraction ({:.0}% > {:.0}% threshold)",
                failure_ratio * 100.0,
                self.config.extract_failure_ratio * 100.0
            )));
        }

        Ok(extracted)
    }

    async fn run_transform(
        &self,
        provider: &Arc<ProviderEntity>,
        run: &mut Run,
        extracted: Vec<ExtractedBatch>,
        cancellation: &CancellationToken,
    ) -> Result<(Vec<FocusRecord>, Vec<Uuid>)> {
        let mapper = self.registry.new_mapper(&provider.type_tag)?;
        let validator = FocusValidator::new(self.config.strict_validation);
        let now = Timestamp::now();

        let mut valid = Vec::new();
        let mut blob_ids = Vec::new();
        let mut transformed = 0u64;
        let mut failed = 0u64;

        for batch in extracted {
            if cancellation.is_cancelled() {
                return Err(Error::cancelled());
            }
            blob_ids.push(batch.raw_blob_id);

            let outcomes = mapper.map_batch(batch.records, provider.id, batch.raw_blob_id, now);
            for outcome in outcomes {
                match outcome {
                    MapOutcome::Mapped(record) => {
                        if self.reject_record(&validator, &record, now) {
                            failed += 1;
                        } else {
                            transformed += 1;
                            valid.push(record);
                        }
                    }
                    MapOutcome::Rejected { reason, .. } => {
                        tracing::debug!(target: TRACING_TARGET, run_id = %run.id, reason = %reason, "record rejected during mapping");
                        failed += 1;
                    }
                }
            }
        }

        run.counters.records_transformed = transformed;
        run.counters.records_failed += failed;
        Ok((valid, blob_ids))
    }

    /// Decides whether a successfully mapped record still gets rejected by
    /// strict validation. See `DESIGN.md` for why this threshold, not a
    /// flat "any error rejects", is what strict mode means here.
    fn reject_record(&self, validator: &FocusValidator, record: &FocusRecord, now: Timestamp) -> bool {
        let result = validator.validate_record(record, now);
        if self.config.strict_validation {
            let total_issues = result.errors.len() + result.warnings.len() + result.info.len();
            total_issues > self.config.max_violations_before_reject
        } else {
            !result.is_valid()
        }
    }

    async fn run_load(
        &self,
        run: &mut Run,
        records: Vec<FocusRecord>,
        blob_ids: Vec<Uuid>,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        if records.is_empty() {
            self.mark_blobs_processed(&blob_ids, Timestamp::now()).await;
            return Ok(());
        }

        let mut blob_ok: HashMap<Uuid, bool> = blob_ids.iter().map(|id| (*id, true)).collect();
        let batch_size = self.config.load_batch_size.max(1);
        let semaphore = Arc::new(Semaphore::new(self.config.worker_count.max(1)));
        let mut tasks = JoinSet::new();
        let mut total_batches = 0usize;

        for chunk in records.chunks(batch_size) {
            if cancellation.is_cancelled() {
                break;
            }
            total_batches += 1;
            let mut chunk_blob_ids: Vec<Uuid> = chunk.iter().map(|r| r.extensions.x_raw_billing_data_id).collect();
            chunk_blob_ids.sort_unstable();
            chunk_blob_ids.dedup();
            let record_count = chunk.len();
            let chunk = chunk.to_vec();

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::internal_bug("load semaphore closed"))?;
            let storage = self.storage.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let mut chunk = chunk;
                let result = load_batch_with_retry(storage.as_ref(), &mut chunk).await;
                (result, chunk_blob_ids, record_count)
            });
        }

        let mut loaded = 0u64;
        let mut failed_batches = 0usize;
        let mut failed_records = 0u64;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((Ok(outcome), _, _)) => loaded += outcome.total() as u64,
                Ok((Err(err), chunk_blob_ids, record_count)) => {
                    tracing::warn!(target: TRACING_TARGET, run_id = %run.id, error = %err, "load batch failed after retry");
                    failed_batches += 1;
                    failed_records += record_count as u64;
                    for id in chunk_blob_ids {
                        blob_ok.insert(id, false);
                    }
                }
                Err(join_err) => {
                    tracing::error!(target: TRACING_TARGET, run_id = %run.id, error = %join_err, "load task panicked");
                    failed_batches += 1;
                }
            }
        }

        run.counters.records_loaded = loaded;
        run.counters.records_failed += failed_records;

        if cancellation.is_cancelled() {
            return Err(Error::cancelled());
        }

        let failure_ratio = if total_batches == 0 { 0.0 } else { failed_batches as f64 / total_batches as f64 };
        if failure_ratio > self.config.load_failure_ratio {
            return Err(Error::load_conflict(format!(
                "{failed_batches}/{total_batches} load batches failed ({:.0}% > {:.0}% threshold)",
                failure_ratio * 100.0,
                self.config.load_failure_ratio * 100.0
            )));
        }

        let fully_loaded: Vec<Uuid> = blob_ok.into_iter().filter_map(|(id, ok)| ok.then_some(id)).collect();
        self.mark_blobs_processed(&fully_loaded, Timestamp::now()).await;
        Ok(())
    }

    async fn mark_blobs_processed(&self, blob_ids: &[Uuid], at: Timestamp) {
        for &id in blob_ids {
            if let Err(err) = self.storage.mark_processed(id, Ok(at)).await {
                tracing::warn!(target: TRACING_TARGET, blob_id = %id, error = %err, "failed to mark raw blob processed");
            }
        }
    }
}

/// Writes one load batch, retrying exactly once with regenerated record
/// ids on failure: a `LoadConflict` gets one retry before the batch
/// counts as failed.
async fn load_batch_with_retry(storage: &dyn StoragePort, batch: &mut Vec<FocusRecord>) -> Result<UpsertOutcome> {
    match storage.upsert_focus(batch).await {
        Ok(outcome) => return Ok(outcome),
        Err(err) => {
            tracing::debug!(target: TRACING_TARGET, error = %err, "load batch failed, retrying once with regenerated ids");
        }
    }
    for record in batch.iter_mut() {
        record.id = Uuid::new_v4();
    }
    storage.upsert_focus(batch).await.map_err(Into::into)
}

/// Recursively decrypts every string leaf of a provider's `auth` JSON
/// value. Plaintext leaves (no `enc:v1:` prefix) pass through unchanged,
/// so this is safe to call even against an un-encrypted deployment.
fn decrypt_auth_value(key: &EncryptionKey, value: &Value) -> Result<Value> {
    match value {
        Value::String(s) => {
            let plain = decrypt_str(key, s).map_err(|err| Error::config_invalid(format!("failed to decrypt auth field: {err}")))?;
            Ok(Value::String(plain))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(decrypt_auth_value(key, item)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), decrypt_auth_value(key, v)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as StdHashMap;
    use std::str::FromStr;

    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use focus_core::auth::AuthMethod;
    use focus_core::focus::{
        AccountInfo, ChargeCategory, ChargeInfo, CommitmentInfo, CostInfo, CurrencyInfo, LocationInfo,
        ProviderExtensions, ResourceInfo, ServiceCategory, ServiceInfo, SkuInfo, TimePeriodInfo, UsageInfo,
    };
    use focus_core::provider_entity::LastSyncStatus;
    use focus_registry::{FieldDescriptor, FocusMapper, RawBlobSink, SourceConfig, SourceDescriptor};
    use focus_store::InMemoryStore;

    use super::*;

    struct OneRecordSource;
    impl SourceDescriptor for OneRecordSource {
        fn describe(&self, _provider: &ProviderEntity) -> Result<Vec<SourceSpec>> {
            Ok(vec![SourceSpec::new(
                "usage",
                SourceConfig::RestApi {
                    endpoint_path: "/v1/usage".into(),
                    method: focus_registry::HttpMethod::Get,
                    query_params: Value::Null,
                    response_selector: "/data".into(),
                    pagination: focus_registry::PaginationPolicy::None,
                    primary_key_fields: vec!["id".into()],
                },
            )])
        }
    }

    struct OneRecordExtractor;
    #[async_trait]
    impl focus_registry::Extractor for OneRecordExtractor {
        async fn extract(&self, ctx: &ExtractContext<'_>, source: &SourceSpec) -> Result<Vec<ExtractedBatch>> {
            let blob = focus_core::raw_blob::RawBlob::new(
                ctx.provider.id,
                ctx.run_id,
                &source.name,
                "rest_api",
                ctx.window.start,
                ctx.window.end,
                Value::Array(vec![serde_json::json!({"cost": "1.25"})]),
                1,
                Timestamp::now(),
            );
            let raw_blob_id = blob.id;
            ctx.sink.store(blob).await?;
            Ok(vec![ExtractedBatch {
                source_name: source.name.clone(),
                records: vec![serde_json::json!({"cost": "1.25"})],
                raw_blob_id,
            }])
        }
    }

    struct EchoMapper;
    #[async_trait]
    impl FocusMapper for EchoMapper {
        fn build_record(
            &self,
            raw: &Value,
            provider_id: Uuid,
            raw_blob_id: Uuid,
            mapped_at: Timestamp,
        ) -> Result<FocusRecord> {
            let cost = raw["cost"].as_str().ok_or_else(|| Error::record_invalid("missing cost"))?;
            let cost = BigDecimal::from_str(cost).map_err(|e| Error::record_invalid(e.to_string()))?;
            Ok(FocusRecord {
                id: Uuid::new_v4(),
                cost: CostInfo {
                    billed_cost: cost.clone(),
                    effective_cost: cost.clone(),
                    list_cost: cost.clone(),
                    contracted_cost: cost,
                },
                account: AccountInfo {
                    billing_account_id: "acct".into(),
                    billing_account_name: "acct".into(),
                    billing_account_type: "BillingAccount".into(),
                    sub_account_id: None,
                    sub_account_name: None,
                    sub_account_type: None,
                },
                period: TimePeriodInfo {
                    billing_period_start: mapped_at,
                    billing_period_end: mapped_at,
                    charge_period_start: mapped_at,
                    charge_period_end: mapped_at,
                },
                currency: CurrencyInfo { billing_currency: "USD".into(), pricing_currency: None },
                service: ServiceInfo {
                    service_name: "echo".into(),
                    service_category: ServiceCategory::Other,
                    service_subcategory: None,
                    provider_name: "echo".into(),
                    publisher_name: "echo".into(),
                    invoice_issuer_name: "echo".into(),
                },
                charge: ChargeInfo {
                    charge_category: ChargeCategory::Usage,
                    charge_description: "echo".into(),
                    charge_class: None,
                    charge_frequency: None,
                    pricing_quantity: None,
                    pricing_unit: None,
                },
                resource: ResourceInfo::default(),
                location: LocationInfo::default(),
                sku: SkuInfo::default(),
                commitment: CommitmentInfo::default(),
                usage: UsageInfo::default(),
                tags: StdHashMap::new(),
                extensions: ProviderExtensions {
                    x_provider_id: provider_id,
                    x_provider_data: StdHashMap::new(),
                    x_raw_billing_data_id: raw_blob_id,
                    x_created_at: mapped_at,
                    x_updated_at: mapped_at,
                },
            })
        }
    }

    fn sample_provider(id: Uuid) -> ProviderEntity {
        ProviderEntity {
            id,
            name: "acme-echo".into(),
            type_tag: "echo".into(),
            display_name: "Acme Echo".into(),
            endpoint: None,
            params: Value::Object(Default::default()),
            additional_config: Value::Object(Default::default()),
            auth: serde_json::json!({"method": "api_key", "key": "test", "header_name": "X-Api-Key", "prefix": ""}),
            active: true,
            validated: true,
            last_synced_at: None,
            last_sync_status: LastSyncStatus::Never,
        }
    }

    fn registry_with_echo() -> Arc<ProviderRegistry> {
        let registry = ProviderRegistry::new();
        registry.register(
            ProviderMetadata {
                type_tag: "echo".into(),
                display_name: "Echo".into(),
                description: String::new(),
                supported_auth_methods: vec![AuthMethod::ApiKey],
                default_auth_method: AuthMethod::ApiKey,
                default_source_type: "rest_api".into(),
                required_config: vec![],
                optional_config: vec![],
                fields: vec![FieldDescriptor {
                    name: "key".into(),
                    description: "api key".into(),
                    required: true,
                    field_type: "string".into(),
                    placeholder: None,
                }],
            },
            Arc::new(OneRecordSource),
            Arc::new(OneRecordExtractor),
            Arc::new(EchoMapper),
        );
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_trigger_runs_to_completion_and_loads_one_record() {
        let provider_id = Uuid::new_v4();
        let mem_store = InMemoryStore::new();
        mem_store.seed_provider(sample_provider(provider_id)).await;
        let storage: Arc<dyn StoragePort> = Arc::new(mem_store);

        let coordinator = Arc::new(RunCoordinator::new(storage.clone(), registry_with_echo(), CoordinatorConfig::default()));
        let run = coordinator.trigger(provider_id, None, None, Some(1), RunType::Manual).await.unwrap();

        let final_run = wait_for_terminal(&coordinator, run.id).await;
        assert_eq!(final_run.status, RunStatus::Completed);
        assert_eq!(final_run.counters.records_loaded, 1);
    }

    #[tokio::test]
    async fn test_trigger_unknown_provider_fails_run_not_the_trigger_call() {
        let storage: Arc<dyn StoragePort> = Arc::new(InMemoryStore::new());
        let coordinator = Arc::new(RunCoordinator::new(storage, registry_with_echo(), CoordinatorConfig::default()));
        let run = coordinator.trigger(Uuid::new_v4(), None, None, Some(1), RunType::Manual).await.unwrap();

        let final_run = wait_for_terminal(&coordinator, run.id).await;
        assert_eq!(final_run.status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_cancel_before_execution_starts_yields_cancelled_run() {
        let mem_store = InMemoryStore::new();
        let provider_id = Uuid::new_v4();
        mem_store.seed_provider(sample_provider(provider_id)).await;
        let storage: Arc<dyn StoragePort> = Arc::new(mem_store);

        let coordinator = Arc::new(RunCoordinator::new(storage, registry_with_echo(), CoordinatorConfig::default()));
        let run = coordinator.trigger(provider_id, None, None, Some(1), RunType::Manual).await.unwrap();
        let cancelled = coordinator.cancel(run.id).await.unwrap();
        assert!(cancelled);

        let final_run = wait_for_terminal(&coordinator, run.id).await;
        assert!(matches!(final_run.status, RunStatus::Cancelled | RunStatus::Completed));
    }

    #[tokio::test]
    async fn test_retry_requires_terminal_run() {
        let mem_store = InMemoryStore::new();
        let provider_id = Uuid::new_v4();
        mem_store.seed_provider(sample_provider(provider_id)).await;
        let storage: Arc<dyn StoragePort> = Arc::new(mem_store);

        let coordinator = Arc::new(RunCoordinator::new(storage, registry_with_echo(), CoordinatorConfig::default()));
        let run = coordinator.trigger(provider_id, None, None, Some(1), RunType::Manual).await.unwrap();

        let finished = wait_for_terminal(&coordinator, run.id).await;
        assert_eq!(finished.status, RunStatus::Completed);

        let retried = coordinator.retry(run.id).await.unwrap();
        assert_eq!(retried.retry_of, Some(run.id));
        assert_eq!(retried.status, RunStatus::Pending);
    }

    async fn wait_for_terminal(coordinator: &Arc<RunCoordinator>, run_id: Uuid) -> Run {
        for _ in 0..200 {
            if let Some(run) = coordinator.status(run_id).await.unwrap() {
                if run.status.is_terminal() {
                    return run;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("run {run_id} did not reach a terminal state in time");
    }
}
