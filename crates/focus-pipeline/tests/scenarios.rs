//! End-to-end scenario tests, driven through the public `RunCoordinator`
//! surface against an `InMemoryStore` and hand-written
//! `SourceDescriptor`/`Extractor` fakes, the same shape `coordinator.rs`'s
//! own unit tests use but wired as a separate source-kind per scenario
//! (one-bucket REST source, zero-record REST source, a source that never
//! returns so cancellation can be observed mid-Extract).

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use focus_core::auth::AuthMethod;
use focus_core::error::{Error, Result};
use focus_core::focus::{ChargeCategory, FocusRecord, ServiceCategory};
use focus_core::provider_entity::{LastSyncStatus, ProviderEntity};
use focus_core::raw_blob::RawBlob;
use focus_mapper::{ModelPricing, OpenAiMapper, PricingTable};
use focus_pipeline::{CoordinatorConfig, RunCoordinator};
use focus_registry::{
    ExtractContext, ExtractedBatch, Extractor, FieldDescriptor, HttpMethod, PaginationPolicy, ProviderMetadata,
    ProviderRegistry, RawBlobSink, SourceConfig, SourceDescriptor, SourceSpec,
};
use focus_store::{InMemoryStore, StoragePort};
use jiff::Timestamp;
use serde_json::{json, Value};
use uuid::Uuid;

fn gpt4o_pricing() -> PricingTable {
    let mut models = HashMap::new();
    models.insert(
        "gpt-4o".to_string(),
        ModelPricing {
            input_per_1k: BigDecimal::from_str("0.005").unwrap(),
            output_per_1k: BigDecimal::from_str("0.015").unwrap(),
            unit_price: BigDecimal::from(0),
        },
    );
    PricingTable::new(models)
}

fn rest_source(name: &str) -> SourceSpec {
    SourceSpec::new(
        name,
        SourceConfig::RestApi {
            endpoint_path: "/usage/completions".into(),
            method: HttpMethod::Get,
            query_params: Value::Null,
            response_selector: "/data".into(),
            pagination: PaginationPolicy::None,
            primary_key_fields: vec!["model".into()],
        },
    )
}

struct FixedSource(SourceSpec);
impl SourceDescriptor for FixedSource {
    fn describe(&self, _provider: &ProviderEntity) -> Result<Vec<SourceSpec>> {
        Ok(vec![self.0.clone()])
    }
}

/// Emits one bucketed OpenAI usage row with both input and output tokens.
struct OneBucketExtractor;
#[async_trait]
impl Extractor for OneBucketExtractor {
    async fn extract(&self, ctx: &ExtractContext<'_>, source: &SourceSpec) -> Result<Vec<ExtractedBatch>> {
        let record = json!({
            "model": "gpt-4o",
            "input_tokens": 1000,
            "output_tokens": 500,
            "bucket_start_time": 1_704_067_200i64,
            "bucket_end_time": 1_704_153_600i64,
        });
        let blob = RawBlob::new(
            ctx.provider.id,
            ctx.run_id,
            &source.name,
            "rest_api",
            ctx.window.start,
            ctx.window.end,
            Value::Array(vec![record.clone()]),
            1,
            Timestamp::now(),
        );
        let raw_blob_id = blob.id;
        ctx.sink.store(blob).await?;
        Ok(vec![ExtractedBatch { source_name: source.name.clone(), records: vec![record], raw_blob_id }])
    }
}

/// A source whose window genuinely has nothing in it. No `RawBlob` is
/// written -- a zero-record extraction is a valid, blob-less outcome.
struct EmptyWindowExtractor;
#[async_trait]
impl Extractor for EmptyWindowExtractor {
    async fn extract(&self, _ctx: &ExtractContext<'_>, _source: &SourceSpec) -> Result<Vec<ExtractedBatch>> {
        Ok(Vec::new())
    }
}

/// Never completes on its own; notifies the test once it has started
/// so cancellation can be issued deterministically mid-Extract rather than
/// racing a sleep.
struct NeverReturnsExtractor {
    started: Arc<tokio::sync::Notify>,
}
#[async_trait]
impl Extractor for NeverReturnsExtractor {
    async fn extract(&self, ctx: &ExtractContext<'_>, _source: &SourceSpec) -> Result<Vec<ExtractedBatch>> {
        self.started.notify_one();
        loop {
            if ctx.cancellation.is_cancelled() {
                return Err(Error::cancelled());
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

fn openai_metadata() -> ProviderMetadata {
    ProviderMetadata {
        type_tag: "openai-test".into(),
        display_name: "OpenAI".into(),
        description: String::new(),
        supported_auth_methods: vec![AuthMethod::BearerToken],
        default_auth_method: AuthMethod::BearerToken,
        default_source_type: "rest_api".into(),
        required_config: vec![],
        optional_config: vec![],
        fields: vec![FieldDescriptor {
            name: "token".into(),
            description: "bearer token".into(),
            required: true,
            field_type: "string".into(),
            placeholder: None,
        }],
    }
}

fn registry_with(extractor: Arc<dyn Extractor>, source: SourceSpec) -> Arc<ProviderRegistry> {
    let registry = ProviderRegistry::new();
    registry.register(
        openai_metadata(),
        Arc::new(FixedSource(source)),
        extractor,
        Arc::new(OpenAiMapper::new(gpt4o_pricing())),
    );
    Arc::new(registry)
}

fn openai_provider(id: Uuid) -> ProviderEntity {
    ProviderEntity {
        id,
        name: "openai-prod".into(),
        type_tag: "openai-test".into(),
        display_name: "OpenAI Production".into(),
        endpoint: None,
        params: Value::Object(Default::default()),
        additional_config: Value::Object(Default::default()),
        auth: json!({"method": "bearer_token", "token": "sk-test"}),
        active: true,
        validated: true,
        last_synced_at: None,
        last_sync_status: LastSyncStatus::Never,
    }
}

async fn wait_for_terminal(coordinator: &Arc<RunCoordinator>, run_id: Uuid) -> focus_core::run::Run {
    for _ in 0..500 {
        if let Some(run) = coordinator.status(run_id).await.unwrap() {
            if run.status.is_terminal() {
                return run;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run {run_id} did not reach a terminal state in time");
}

/// Happy path, REST source: one bucketed usage row with both
/// `input_tokens` and `output_tokens` splits into two FocusRecords.
#[tokio::test]
async fn happy_path_rest_source_splits_into_two_records() {
    let provider_id = Uuid::new_v4();
    let mem_store = Arc::new(InMemoryStore::new());
    mem_store.seed_provider(openai_provider(provider_id)).await;
    let storage: Arc<dyn StoragePort> = mem_store.clone();

    let registry = registry_with(Arc::new(OneBucketExtractor), rest_source("usage"));
    let coordinator = Arc::new(RunCoordinator::new(storage.clone(), registry, CoordinatorConfig::default()));

    let start = "2024-01-01T00:00:00Z".parse::<Timestamp>().unwrap();
    let end = "2024-01-08T00:00:00Z".parse::<Timestamp>().unwrap();
    let run = coordinator
        .trigger(provider_id, Some(start), Some(end), None, focus_core::run::RunType::Manual)
        .await
        .unwrap();

    let finished = wait_for_terminal(&coordinator, run.id).await;
    assert_eq!(finished.status, focus_core::run::RunStatus::Completed);
    assert_eq!(finished.counters.records_loaded, 2);

    let records = mem_store.all_records().await;
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.service.service_category, ServiceCategory::AiAndMachineLearning);
        assert_eq!(record.charge.charge_category, ChargeCategory::Usage);
        assert_eq!(record.currency.billing_currency, "USD");
        assert_eq!(record.charge.pricing_unit.as_deref(), Some("tokens"));
        assert!(record.cost.billed_cost >= BigDecimal::from(0));
    }
}

/// Empty window: zero buckets returned, no `RawBlob` persisted, run
/// still completes.
#[tokio::test]
async fn empty_window_completes_with_no_raw_blob() {
    let provider_id = Uuid::new_v4();
    let mem_store = Arc::new(InMemoryStore::new());
    mem_store.seed_provider(openai_provider(provider_id)).await;
    let storage: Arc<dyn StoragePort> = mem_store.clone();

    let registry = registry_with(Arc::new(EmptyWindowExtractor), rest_source("usage"));
    let coordinator = Arc::new(RunCoordinator::new(storage.clone(), registry, CoordinatorConfig::default()));

    let start = "2030-01-01T00:00:00Z".parse::<Timestamp>().unwrap();
    let end = "2030-01-02T00:00:00Z".parse::<Timestamp>().unwrap();
    let run = coordinator
        .trigger(provider_id, Some(start), Some(end), None, focus_core::run::RunType::Manual)
        .await
        .unwrap();

    let finished = wait_for_terminal(&coordinator, run.id).await;
    assert_eq!(finished.status, focus_core::run::RunStatus::Completed);
    assert_eq!(finished.counters.records_loaded, 0);

    assert!(mem_store.all_raw_blobs().await.is_empty());
    assert!(mem_store.all_records().await.is_empty());
}

/// Merge idempotence: running the same (provider, window, payload)
/// twice leaves exactly the records of one run in the store, not their sum.
#[tokio::test]
async fn rerunning_same_window_is_idempotent() {
    let provider_id = Uuid::new_v4();
    let mem_store = Arc::new(InMemoryStore::new());
    mem_store.seed_provider(openai_provider(provider_id)).await;
    let storage: Arc<dyn StoragePort> = mem_store.clone();

    let registry = registry_with(Arc::new(OneBucketExtractor), rest_source("usage"));
    let coordinator = Arc::new(RunCoordinator::new(storage.clone(), Arc::clone(&registry), CoordinatorConfig::default()));

    let start = "2024-01-01T00:00:00Z".parse::<Timestamp>().unwrap();
    let end = "2024-01-08T00:00:00Z".parse::<Timestamp>().unwrap();

    let first = coordinator
        .trigger(provider_id, Some(start), Some(end), None, focus_core::run::RunType::Manual)
        .await
        .unwrap();
    wait_for_terminal(&coordinator, first.id).await;

    let second = coordinator
        .trigger(provider_id, Some(start), Some(end), None, focus_core::run::RunType::Manual)
        .await
        .unwrap();
    let finished = wait_for_terminal(&coordinator, second.id).await;
    assert_eq!(finished.status, focus_core::run::RunStatus::Completed);

    let records: Vec<FocusRecord> = mem_store.all_records().await;
    assert_eq!(records.len(), 2, "second run must merge onto the first run's records, not duplicate them");
}

/// Cancellation: cancelling a run that is blocked mid-Extract yields
/// a terminal `Cancelled` run with nothing loaded, and the in-flight
/// extractor task observes the cancellation token rather than running to
/// completion.
#[tokio::test]
async fn cancel_mid_extract_yields_cancelled_run() {
    let provider_id = Uuid::new_v4();
    let mem_store = Arc::new(InMemoryStore::new());
    mem_store.seed_provider(openai_provider(provider_id)).await;
    let storage: Arc<dyn StoragePort> = mem_store.clone();

    let started = Arc::new(tokio::sync::Notify::new());
    let registry = registry_with(Arc::new(NeverReturnsExtractor { started: started.clone() }), rest_source("usage"));
    let coordinator = Arc::new(RunCoordinator::new(storage.clone(), registry, CoordinatorConfig::default()));

    let run = coordinator
        .trigger(provider_id, None, None, Some(1), focus_core::run::RunType::Manual)
        .await
        .unwrap();

    started.notified().await;
    let cancelled = coordinator.cancel(run.id).await.unwrap();
    assert!(cancelled);

    let finished = wait_for_terminal(&coordinator, run.id).await;
    assert_eq!(finished.status, focus_core::run::RunStatus::Cancelled);
    assert_eq!(finished.counters.records_loaded, 0);

    assert!(mem_store.all_records().await.is_empty());
}

/// Invalid enum correction: an unrecognized provider-native category
/// falls back to `Other` with the charge category left untouched, rather
/// than rejecting the record outright.
#[tokio::test]
async fn unrecognized_category_falls_back_to_other() {
    let provider_id = Uuid::new_v4();
    let mem_store = Arc::new(InMemoryStore::new());
    mem_store.seed_provider(openai_provider(provider_id)).await;
    let storage: Arc<dyn StoragePort> = mem_store.clone();

    struct UnknownCategoryExtractor;
    #[async_trait]
    impl Extractor for UnknownCategoryExtractor {
        async fn extract(&self, ctx: &ExtractContext<'_>, source: &SourceSpec) -> Result<Vec<ExtractedBatch>> {
            let record = json!({
                "model": "gpt-4o",
                "usage_type": "tokens",
                "category": "some-unmapped-product-line",
                "input_tokens": 10,
                "output_tokens": 5,
                "start_time": 1_704_067_200i64,
                "end_time": 1_704_067_260i64,
            });
            let blob = RawBlob::new(
                ctx.provider.id,
                ctx.run_id,
                &source.name,
                "rest_api",
                ctx.window.start,
                ctx.window.end,
                Value::Array(vec![record.clone()]),
                1,
                Timestamp::now(),
            );
            let raw_blob_id = blob.id;
            ctx.sink.store(blob).await?;
            Ok(vec![ExtractedBatch { source_name: source.name.clone(), records: vec![record], raw_blob_id }])
        }
    }

    let registry = registry_with(Arc::new(UnknownCategoryExtractor), rest_source("usage"));
    let coordinator = Arc::new(RunCoordinator::new(storage.clone(), registry, CoordinatorConfig::default()));

    let run = coordinator
        .trigger(provider_id, None, None, Some(1), focus_core::run::RunType::Manual)
        .await
        .unwrap();
    let finished = wait_for_terminal(&coordinator, run.id).await;
    assert_eq!(finished.status, focus_core::run::RunStatus::Completed);

    let records = mem_store.all_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].service.service_category, ServiceCategory::Other);
    assert_eq!(records[0].charge.charge_category, ChargeCategory::Usage);
}

