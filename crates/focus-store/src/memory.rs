//! In-memory [`StoragePort`] double.
//!
//! Used by `focus-pipeline`'s coordinator tests and this crate's own tests
//! where spinning up Postgres is unnecessary. Implements the same
//! merge-on-key and transactional-batch semantics [`crate::postgres::PostgresStore`]
//! promises, just over `tokio::sync::Mutex`-guarded maps instead of SQL.

use std::collections::HashMap;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::Mutex;
use uuid::Uuid;

use focus_core::focus::FocusRecord;
use focus_core::provider_entity::ProviderEntity;
use focus_core::raw_blob::RawBlob;
use focus_core::run::Run;

use crate::error::Result;
use crate::port::{StoragePort, UpsertOutcome};

/// Owned form of [`FocusRecord::merge_key_parts`], since a `HashMap` key
/// can't borrow from the value it's about to be inserted alongside.
type MergeKey = (Uuid, Timestamp, Timestamp, Option<String>, Uuid);

fn merge_key(record: &FocusRecord) -> MergeKey {
    let (provider_id, charge_start, charge_end, sku_id, id) = record.merge_key_parts();
    (provider_id, charge_start, charge_end, sku_id.map(str::to_string), id)
}

#[derive(Default)]
struct State {
    raw_blobs: HashMap<Uuid, RawBlob>,
    records: HashMap<MergeKey, FocusRecord>,
    runs: HashMap<Uuid, Run>,
    providers: HashMap<Uuid, ProviderEntity>,
}

/// A test double for [`StoragePort`] with no external dependencies.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a provider row, the one piece of state a coordinator test
    /// needs present before a run can even resolve its plugin.
    pub async fn seed_provider(&self, provider: ProviderEntity) {
        let mut state = self.state.lock().await;
        state.providers.insert(provider.id, provider);
    }

    /// Returns every stored [`FocusRecord`], for test assertions on set
    /// equality after merge/idempotence scenarios.
    pub async fn all_records(&self) -> Vec<FocusRecord> {
        self.state.lock().await.records.values().cloned().collect()
    }

    /// Returns every stored [`RawBlob`], for raw-before-normalized and
    /// processed-only-after-load invariant checks.
    pub async fn all_raw_blobs(&self) -> Vec<RawBlob> {
        self.state.lock().await.raw_blobs.values().cloned().collect()
    }
}

#[async_trait]
impl StoragePort for InMemoryStore {
    async fn save_raw_blob(&self, blob: &RawBlob) -> Result<()> {
        let mut state = self.state.lock().await;
        state.raw_blobs.insert(blob.id, blob.clone());
        Ok(())
    }

    async fn mark_processed(&self, blob_id: Uuid, outcome: std::result::Result<Timestamp, String>) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(blob) = state.raw_blobs.get_mut(&blob_id) {
            match outcome {
                Ok(at) => blob.mark_processed(at),
                Err(message) => blob.mark_failed(message),
            }
        }
        Ok(())
    }

    async fn get_unprocessed_raw_blobs(&self, run_id: Uuid) -> Result<Vec<RawBlob>> {
        let state = self.state.lock().await;
        Ok(state
            .raw_blobs
            .values()
            .filter(|blob| blob.run_id == run_id && !blob.processed)
            .cloned()
            .collect())
    }

    async fn upsert_focus(&self, records: &[FocusRecord]) -> Result<UpsertOutcome> {
        let mut state = self.state.lock().await;
        let mut outcome = UpsertOutcome::default();
        for record in records {
            let key = merge_key(record);
            match state.records.insert(key, record.clone()) {
                Some(_) => outcome.merged += 1,
                None => outcome.inserted += 1,
            }
        }
        Ok(outcome)
    }

    async fn create_run(&self, run: &Run) -> Result<Run> {
        let mut state = self.state.lock().await;
        state.runs.insert(run.id, run.clone());
        Ok(run.clone())
    }

    async fn update_run(&self, run: &Run) -> Result<Run> {
        let mut state = self.state.lock().await;
        state.runs.insert(run.id, run.clone());
        Ok(run.clone())
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<Run>> {
        Ok(self.state.lock().await.runs.get(&run_id).cloned())
    }

    async fn list_runs(&self, provider_id: Uuid, limit: i64) -> Result<Vec<Run>> {
        let state = self.state.lock().await;
        let mut runs: Vec<Run> = state.runs.values().filter(|run| run.provider_id == provider_id).cloned().collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit.max(0) as usize);
        Ok(runs)
    }

    async fn get_provider(&self, provider_id: Uuid) -> Result<Option<ProviderEntity>> {
        Ok(self.state.lock().await.providers.get(&provider_id).cloned())
    }

    async fn create_provider(&self, provider: &ProviderEntity) -> Result<ProviderEntity> {
        let mut state = self.state.lock().await;
        state.providers.insert(provider.id, provider.clone());
        Ok(provider.clone())
    }

    async fn list_active_providers(&self) -> Result<Vec<ProviderEntity>> {
        let state = self.state.lock().await;
        Ok(state.providers.values().filter(|p| p.active).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use focus_core::focus::{
        AccountInfo, ChargeCategory, ChargeInfo, CommitmentInfo, CostInfo, CurrencyInfo, LocationInfo,
        ProviderExtensions, ResourceInfo, ServiceCategory, ServiceInfo, SkuInfo, TimePeriodInfo, UsageInfo,
    };

    use super::*;

    fn sample_record(provider_id: Uuid, sku_id: Option<&str>) -> FocusRecord {
        let at = Timestamp::from_second(1_700_000_000).unwrap();
        let cost = BigDecimal::from_str("1.50").unwrap();
        FocusRecord {
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
                billing_period_start: at,
                billing_period_end: at,
                charge_period_start: at,
                charge_period_end: at,
            },
            currency: CurrencyInfo { billing_currency: "USD".into(), pricing_currency: None },
            service: ServiceInfo {
                service_name: "svc".into(),
                service_category: ServiceCategory::Compute,
                service_subcategory: None,
                provider_name: "acme".into(),
                publisher_name: "acme".into(),
                invoice_issuer_name: "acme".into(),
            },
            charge: ChargeInfo {
                charge_category: ChargeCategory::Usage,
                charge_description: "usage".into(),
                charge_class: None,
                charge_frequency: None,
                pricing_quantity: None,
                pricing_unit: None,
            },
            resource: ResourceInfo::default(),
            location: LocationInfo::default(),
            sku: SkuInfo { sku_id: sku_id.map(str::to_string), ..SkuInfo::default() },
            commitment: CommitmentInfo::default(),
            usage: UsageInfo::default(),
            tags: HashMap::new(),
            extensions: ProviderExtensions {
                x_provider_id: provider_id,
                x_provider_data: HashMap::new(),
                x_raw_billing_data_id: Uuid::new_v4(),
                x_created_at: at,
                x_updated_at: at,
            },
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_on_merge_key() {
        let store = InMemoryStore::new();
        let provider_id = Uuid::new_v4();
        let record = sample_record(provider_id, Some("sku-1"));

        let first = store.upsert_focus(&[record.clone()]).await.unwrap();
        assert_eq!(first.inserted, 1);
        assert_eq!(first.merged, 0);

        let second = store.upsert_focus(&[record]).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.merged, 1);
        assert_eq!(store.all_records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_sku_ids_do_not_collide() {
        let store = InMemoryStore::new();
        let provider_id = Uuid::new_v4();
        store.upsert_focus(&[sample_record(provider_id, Some("sku-1"))]).await.unwrap();
        store.upsert_focus(&[sample_record(provider_id, Some("sku-2"))]).await.unwrap();
        assert_eq!(store.all_records().await.len(), 2);
    }

    #[tokio::test]
    async fn test_records_sharing_every_merge_field_but_id_do_not_collide() {
        let store = InMemoryStore::new();
        let provider_id = Uuid::new_v4();
        let first = sample_record(provider_id, Some("gpt-4o"));
        let mut second = first.clone();
        second.id = Uuid::new_v4();
        store.upsert_focus(&[first, second]).await.unwrap();
        assert_eq!(store.all_records().await.len(), 2);
    }

    #[tokio::test]
    async fn test_mark_processed_only_affects_named_blob() {
        let store = InMemoryStore::new();
        let blob = RawBlob::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "usage",
            "rest_api",
            Timestamp::from_second(1_700_000_000).unwrap(),
            Timestamp::from_second(1_700_600_000).unwrap(),
            serde_json::json!([]),
            0,
            Timestamp::now(),
        );
        let run_id = blob.run_id;
        let blob_id = blob.id;
        store.save_raw_blob(&blob).await.unwrap();

        let unprocessed = store.get_unprocessed_raw_blobs(run_id).await.unwrap();
        assert_eq!(unprocessed.len(), 1);

        store.mark_processed(blob_id, Ok(Timestamp::now())).await.unwrap();
        let unprocessed = store.get_unprocessed_raw_blobs(run_id).await.unwrap();
        assert!(unprocessed.is_empty());
    }
}
