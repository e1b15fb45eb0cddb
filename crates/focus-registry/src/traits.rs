//! Plugin trait seams a provider implements.
//!
//! A provider plugin is the tuple `(ProviderMetadata, Box<dyn SourceDescriptor>,
//! Box<dyn Extractor>, Box<dyn FocusMapper>)` registered together in the
//! [`crate::registry::ProviderRegistry`]. None of the three traits reference
//! the others directly; the coordinator in `focus-pipeline` wires them
//! together per run.

use async_trait::async_trait;
use jiff::Timestamp;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use focus_core::error::Result;
use focus_core::focus::FocusRecord;
use focus_core::provider_entity::ProviderEntity;
use focus_core::raw_blob::RawBlob;

use crate::auth_resolver::ResolvedAuth;
use crate::source::{SourceSpec, Window};

/// Sink an [`Extractor`] writes every captured [`RawBlob`] to before
/// returning control to the coordinator: raw data is always persisted
/// before it is normalized.
#[async_trait]
pub trait RawBlobSink: Send + Sync {
    async fn store(&self, blob: RawBlob) -> Result<()>;
}

/// One batch of records an extractor pulled for a single source and window.
#[derive(Debug, Clone)]
pub struct ExtractedBatch {
    pub source_name: String,
    pub records: Vec<Value>,
    pub raw_blob_id: Uuid,
}

/// Everything an [`Extractor`] needs to pull one source's records for one
/// run, bundled so the trait signature doesn't grow with every new concern.
pub struct ExtractContext<'a> {
    pub provider: &'a ProviderEntity,
    pub auth: &'a ResolvedAuth,
    pub run_id: Uuid,
    pub window: Window,
    pub sink: &'a (dyn RawBlobSink + 'a),
    pub cancellation: CancellationToken,
}

/// Pulls raw records for one [`SourceSpec`] within a window.
///
/// Implementations own all provider-protocol detail (HTTP, object storage,
/// SQL) behind this one method. They are expected to check
/// `ctx.cancellation` between network calls/pages/chunks and return
/// [`focus_core::error::ErrorKind::Cancelled`] promptly rather than after
/// the whole source finishes.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extracts every record `source` yields for `ctx.window`, writing one
    /// or more [`RawBlob`]s to `ctx.sink` as it goes and returning them
    /// alongside the decoded records for immediate mapping.
    async fn extract(&self, ctx: &ExtractContext<'_>, source: &SourceSpec) -> Result<Vec<ExtractedBatch>>;
}

/// Describes which sources a provider type exposes, given its
/// non-sensitive configuration. Most provider plugins return a fixed list;
/// a plugin whose sources depend on discovered config (e.g. a CUR export
/// whose bucket layout is only known once connected) may compute it.
pub trait SourceDescriptor: Send + Sync {
    fn describe(&self, provider: &ProviderEntity) -> Result<Vec<SourceSpec>>;
}

/// One successfully mapped and validated record, or the reason the source
/// record was rejected. [`crate::registry::ProviderRegistry`] callers fold
/// these into a run's statistics; no early return on the first rejection.
#[derive(Debug, Clone)]
pub enum MapOutcome {
    Mapped(FocusRecord),
    Rejected { reason: String, raw: Value },
}

/// Turns one provider-native record into zero or one
/// [`FocusRecord`], then strictly validates the result.
///
/// Implementations are expected to build on [`FocusMapper::map_one`]'s
/// default-provided workflow (`is_valid_record` -> `split_record` ->
/// `build_record` hooks) rather than overriding [`FocusMapper::map_batch`]
/// directly, but the split exists so a mapper with a genuinely different
/// shape (e.g. one raw row fans out to N charges) still fits the trait.
#[async_trait]
pub trait FocusMapper: Send + Sync {
    /// Returns false to silently drop a record before mapping is attempted
    /// (e.g. a zero-cost keep-alive heartbeat row some APIs emit).
    fn is_valid_record(&self, raw: &Value) -> bool {
        let _ = raw;
        true
    }

    /// Splits one raw record into the one or more raw records that each
    /// become a single [`FocusRecord`]. The default is the common case of
    /// a 1:1 mapping.
    fn split_record(&self, raw: Value) -> Vec<Value> {
        vec![raw]
    }

    /// Builds one [`FocusRecord`] from one already-split raw record.
    /// `provider_id` and `raw_blob_id` seed the record's provider
    /// extensions; `mapped_at` seeds `x_created_at`/`x_updated_at`.
    fn build_record(
        &self,
        raw: &Value,
        provider_id: Uuid,
        raw_blob_id: Uuid,
        mapped_at: Timestamp,
    ) -> Result<FocusRecord>;

    /// The default mapping workflow: filter, split, build, for one raw
    /// record. Returns one outcome per record produced by `split_record`.
    fn map_one(&self, raw: Value, provider_id: Uuid, raw_blob_id: Uuid, mapped_at: Timestamp) -> Vec<MapOutcome> {
        if !self.is_valid_record(&raw) {
            return Vec::new();
        }
        self.split_record(raw)
            .into_iter()
            .map(|part| match self.build_record(&part, provider_id, raw_blob_id, mapped_at) {
                Ok(record) => MapOutcome::Mapped(record),
                Err(err) => MapOutcome::Rejected { reason: err.to_string(), raw: part },
            })
            .collect()
    }

    /// Maps a whole extracted batch, never stopping at the first failure.
    fn map_batch(&self, records: Vec<Value>, provider_id: Uuid, raw_blob_id: Uuid, mapped_at: Timestamp) -> Vec<MapOutcome> {
        records
            .into_iter()
            .flat_map(|raw| self.map_one(raw, provider_id, raw_blob_id, mapped_at))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use focus_core::error::Error;
    use focus_core::focus::{AccountInfo, ChargeCategory, ChargeInfo, CostInfo, CurrencyInfo, ProviderExtensions, ResourceInfo, LocationInfo, ServiceCategory, ServiceInfo, SkuInfo, CommitmentInfo, UsageInfo, TimePeriodInfo};
    use std::collections::HashMap;
    use std::str::FromStr;

    use super::*;

    struct EchoMapper;

    impl FocusMapper for EchoMapper {
        fn is_valid_record(&self, raw: &Value) -> bool {
            raw.get("cost").is_some()
        }

        fn build_record(&self, raw: &Value, provider_id: Uuid, raw_blob_id: Uuid, mapped_at: Timestamp) -> Result<FocusRecord> {
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
                tags: HashMap::new(),
                extensions: ProviderExtensions {
                    x_provider_id: provider_id,
                    x_provider_data: HashMap::new(),
                    x_raw_billing_data_id: raw_blob_id,
                    x_created_at: mapped_at,
                    x_updated_at: mapped_at,
                },
            })
        }
    }

    #[test]
    fn test_invalid_record_is_silently_dropped() {
        let mapper = EchoMapper;
        let outcomes = mapper.map_one(serde_json::json!({"no_cost": true}), Uuid::new_v4(), Uuid::new_v4(), Timestamp::now());
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_valid_record_maps_to_one_focus_record() {
        let mapper = EchoMapper;
        let outcomes = mapper.map_one(serde_json::json!({"cost": "1.50"}), Uuid::new_v4(), Uuid::new_v4(), Timestamp::now());
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], MapOutcome::Mapped(_)));
    }

    #[test]
    fn test_build_failure_yields_rejected_outcome() {
        let mapper = EchoMapper;
        let outcomes = mapper.map_one(serde_json::json!({"cost": "not-a-number"}), Uuid::new_v4(), Uuid::new_v4(), Timestamp::now());
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], MapOutcome::Rejected { .. }));
    }

    #[test]
    fn test_map_batch_does_not_stop_at_first_failure() {
        let mapper = EchoMapper;
        let batch = vec![serde_json::json!({"cost": "bad"}), serde_json::json!({"cost": "2.00"})];
        let outcomes = mapper.map_batch(batch, Uuid::new_v4(), Uuid::new_v4(), Timestamp::now());
        assert_eq!(outcomes.len(), 2);
    }
}
