//! OpenAI FOCUS mapper.
//!
//! A raw usage record carries a `usage_type` (`tokens`, `images`, `audio`, or
//! an unrecognized fallback billed per request) and this module prices it
//! against [`ModelPricing`] before handing the priced record to
//! [`OpenAiMapper::build_record`].
//!
//! The usage API's bucketed endpoint (`/usage/completions`) reports one row
//! per model per time bucket carrying both `input_tokens` and `output_tokens`
//! side by side, with no `usage_type` discriminator and its window given as
//! `bucket_start_time`/`bucket_end_time` epoch seconds. `split_record` turns
//! that single bucket into one synthetic per-token-type raw record apiece so
//! each prices and lands as its own [`focus_core::focus::FocusRecord`], tying
//! them back together with a shared `token_type` discriminator recorded in
//! `x_provider_data`.

use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use focus_core::error::{Error, Result};
use focus_core::focus::{
    AccountInfo, ChargeCategory, ChargeInfo, CommitmentInfo, CostInfo, CurrencyInfo, LocationInfo,
    ProviderExtensions, ResourceInfo, ServiceInfo, SkuInfo, TimePeriodInfo, UsageInfo,
};
use focus_registry::{FocusMapper, MapOutcome};
use jiff::Timestamp;
use serde_json::Value;
use uuid::Uuid;

use crate::category;

pub const TRACING_TARGET: &str = "focus_mapper::providers::openai";

/// Per-model per-unit pricing, in USD. `input`/`output` price a token pair;
/// `unit` prices a single image or audio-second; all default to zero so an
/// unknown model never panics, only under-costs (and the record still goes
/// through FOCUS validation downstream, where a zero-cost record is a valid
/// if noteworthy outcome rather than a silently wrong one).
#[derive(Debug, Clone, Default)]
pub struct ModelPricing {
    pub input_per_1k: BigDecimal,
    pub output_per_1k: BigDecimal,
    pub unit_price: BigDecimal,
}

/// Breakdown of a calculated cost, mirroring the original cost calculator's
/// `{total, input_cost, output_cost, unit_price, breakdown}` return shape.
#[derive(Debug, Clone)]
pub struct CostBreakdown {
    pub total: BigDecimal,
    pub input_cost: BigDecimal,
    pub output_cost: BigDecimal,
    pub unit_price: BigDecimal,
}

impl CostBreakdown {
    fn zero() -> Self {
        let z = BigDecimal::from(0);
        Self { total: z.clone(), input_cost: z.clone(), output_cost: z.clone(), unit_price: z }
    }
}

/// A provider-wide pricing table, keyed by model name. Looked up once per
/// raw record; a missing model prices at zero rather than rejecting the
/// record, matching the original calculator's fail-open behavior.
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    pub models: HashMap<String, ModelPricing>,
}

impl PricingTable {
    pub fn new(models: HashMap<String, ModelPricing>) -> Self {
        Self { models }
    }

    fn get(&self, model: &str) -> Option<&ModelPricing> {
        self.models.get(model)
    }
}

/// Dispatches on `usage_type` to the matching cost calculation, exactly as
/// `calculate_costs` in the original dispatches on the Python usage record's
/// `usage_type` field.
fn calculate_costs(pricing: &PricingTable, model: &str, usage_type: &str, raw: &Value) -> CostBreakdown {
    match usage_type {
        "tokens" => calculate_token_cost(pricing, model, raw),
        "images" => calculate_unit_cost(pricing, model, raw, "n_images"),
        "audio" => calculate_unit_cost(pricing, model, raw, "seconds"),
        _ => calculate_request_fallback_cost(raw),
    }
}

fn decimal_field(raw: &Value, field: &str) -> BigDecimal {
    raw.get(field)
        .and_then(|v| v.as_f64().map(|f| f.to_string()).or_else(|| v.as_str().map(str::to_string)))
        .and_then(|s| BigDecimal::from_str(&s).ok())
        .unwrap_or_else(|| BigDecimal::from(0))
}

fn calculate_token_cost(pricing: &PricingTable, model: &str, raw: &Value) -> CostBreakdown {
    let Some(model_pricing) = pricing.get(model) else {
        return CostBreakdown::zero();
    };
    let input_tokens = decimal_field(raw, "input_tokens");
    let output_tokens = decimal_field(raw, "output_tokens");
    let thousand = BigDecimal::from(1000);

    let input_cost = &input_tokens / &thousand * &model_pricing.input_per_1k;
    let output_cost = &output_tokens / &thousand * &model_pricing.output_per_1k;
    CostBreakdown {
        total: &input_cost + &output_cost,
        input_cost,
        output_cost,
        unit_price: model_pricing.input_per_1k.clone(),
    }
}

fn calculate_unit_cost(pricing: &PricingTable, model: &str, raw: &Value, quantity_field: &str) -> CostBreakdown {
    let Some(model_pricing) = pricing.get(model) else {
        return CostBreakdown::zero();
    };
    let quantity = decimal_field(raw, quantity_field);
    let total = &quantity * &model_pricing.unit_price;
    CostBreakdown { total, input_cost: BigDecimal::from(0), output_cost: BigDecimal::from(0), unit_price: model_pricing.unit_price.clone() }
}

/// An unrecognized `usage_type` is billed per request at a flat rate, the
/// same `0.001`-per-request fallback the original calculator uses when it
/// has no other pricing signal to go on.
fn calculate_request_fallback_cost(raw: &Value) -> CostBreakdown {
    let unit_price = BigDecimal::from_str("0.001").expect("static literal parses");
    let requests = raw.get("requests").and_then(Value::as_f64).unwrap_or(1.0);
    let total = BigDecimal::from_str(&requests.to_string()).unwrap_or_else(|_| BigDecimal::from(1)) * &unit_price;
    CostBreakdown { total, input_cost: BigDecimal::from(0), output_cost: BigDecimal::from(0), unit_price }
}

pub struct OpenAiMapper {
    pricing: PricingTable,
}

impl OpenAiMapper {
    pub fn new(pricing: PricingTable) -> Self {
        Self { pricing }
    }

    /// Falls back to `"unknown"` rather than rejecting the record: the
    /// bucketed usage endpoint's rows don't carry an organization id at all,
    /// only the request that fetched them is scoped to one.
    fn billing_account_id(raw: &Value) -> String {
        raw.get("organization_id").and_then(Value::as_str).unwrap_or("unknown").to_string()
    }

    /// Accepts either the per-event `start_time`/`end_time` field names or
    /// the bucketed endpoint's `bucket_start_time`/`bucket_end_time`.
    fn charge_period(raw: &Value) -> Result<(Timestamp, Timestamp)> {
        let start = raw
            .get("start_time")
            .or_else(|| raw.get("bucket_start_time"))
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::record_invalid("openai usage record missing start_time/bucket_start_time"))?;
        let end = raw
            .get("end_time")
            .or_else(|| raw.get("bucket_end_time"))
            .and_then(Value::as_i64)
            .unwrap_or(start + 1);
        Ok((Timestamp::from_second(start).map_err(|e| Error::record_invalid(e.to_string()))?,
            Timestamp::from_second(end).map_err(|e| Error::record_invalid(e.to_string()))?))
    }
}

impl FocusMapper for OpenAiMapper {
    fn is_valid_record(&self, raw: &Value) -> bool {
        let has_model = raw.get("model").and_then(Value::as_str).is_some();
        let has_usage_type = raw.get("usage_type").and_then(Value::as_str).is_some();
        let has_token_bucket = raw.get("input_tokens").is_some() || raw.get("output_tokens").is_some();
        has_model && (has_usage_type || has_token_bucket)
    }

    /// A record that already carries `usage_type` (images, audio, or a
    /// per-event token row) passes through unchanged. A bucketed row with no
    /// `usage_type` but an `input_tokens`/`output_tokens` pair fans out into
    /// one synthetic `"tokens"` row per token type present, each zeroing out
    /// the other type's quantity so [`calculate_token_cost`] prices only its
    /// own share, and tagging itself with a `token_type` discriminator that
    /// [`OpenAiMapper::build_record`] carries into `x_provider_data`.
    fn split_record(&self, raw: Value) -> Vec<Value> {
        if raw.get("usage_type").and_then(Value::as_str).is_some() {
            return vec![raw];
        }

        let mut parts = Vec::with_capacity(2);
        for (token_type, field) in [("input", "input_tokens"), ("output", "output_tokens")] {
            let Some(quantity) = raw.get(field) else { continue };
            let mut part = raw.clone();
            part["usage_type"] = Value::String("tokens".into());
            part["token_type"] = Value::String(token_type.into());
            part["input_tokens"] = if token_type == "input" { quantity.clone() } else { Value::from(0) };
            part["output_tokens"] = if token_type == "output" { quantity.clone() } else { Value::from(0) };
            parts.push(part);
        }
        if parts.is_empty() { vec![raw] } else { parts }
    }

    fn build_record(&self, raw: &Value, provider_id: Uuid, raw_blob_id: Uuid, mapped_at: Timestamp) -> Result<focus_core::focus::FocusRecord> {
        let model = raw["model"].as_str().expect("is_valid_record checked model");
        let usage_type = raw["usage_type"].as_str().expect("is_valid_record checked usage_type");
        let cost = calculate_costs(&self.pricing, model, usage_type, raw);
        let (charge_period_start, charge_period_end) = Self::charge_period(raw)?;
        let billing_account_id = Self::billing_account_id(raw);
        let native_category = raw.get("category").and_then(Value::as_str).unwrap_or(usage_type);
        let mut x_provider_data = HashMap::new();
        if let Some(token_type) = raw.get("token_type").and_then(Value::as_str) {
            x_provider_data.insert("token_type".to_string(), Value::String(token_type.to_string()));
        }

        Ok(focus_core::focus::FocusRecord {
            id: focus_core::focus::surrogate_id(provider_id, raw),
            cost: CostInfo {
                billed_cost: cost.total.clone(),
                effective_cost: cost.total.clone(),
                list_cost: cost.total.clone(),
                contracted_cost: cost.total,
            },
            account: AccountInfo {
                billing_account_id: billing_account_id.clone(),
                billing_account_name: billing_account_id,
                billing_account_type: "BillingAccount".into(),
                sub_account_id: raw.get("project_id").and_then(Value::as_str).map(str::to_string),
                sub_account_name: raw.get("project_name").and_then(Value::as_str).map(str::to_string),
                sub_account_type: raw
                    .get("project_id")
                    .and_then(Value::as_str)
                    .map(|_| "Project".to_string()),
            },
            period: TimePeriodInfo {
                billing_period_start: charge_period_start,
                billing_period_end: charge_period_end,
                charge_period_start,
                charge_period_end,
            },
            currency: CurrencyInfo { billing_currency: "USD".into(), pricing_currency: None },
            service: ServiceInfo {
                service_name: format!("OpenAI {model}"),
                service_category: category::resolve(native_category),
                service_subcategory: Some(usage_type.to_string()),
                provider_name: "OpenAI".into(),
                publisher_name: "OpenAI".into(),
                invoice_issuer_name: "OpenAI".into(),
            },
            charge: ChargeInfo {
                charge_category: ChargeCategory::Usage,
                charge_description: format!("{model} {usage_type} usage"),
                charge_class: None,
                charge_frequency: None,
                pricing_quantity: Some(decimal_field(raw, quantity_field(raw, usage_type))),
                pricing_unit: Some(usage_quantity_unit(usage_type).to_string()),
            },
            resource: ResourceInfo::default(),
            location: LocationInfo::default(),
            sku: SkuInfo {
                sku_id: Some(model.to_string()),
                sku_price_id: None,
                sku_meter: None,
                sku_price_details: None,
                list_unit_price: Some(cost.unit_price.clone()),
                contracted_unit_price: Some(cost.unit_price),
            },
            commitment: CommitmentInfo::default(),
            usage: UsageInfo {
                consumed_quantity: Some(decimal_field(raw, quantity_field(raw, usage_type))),
                consumed_unit: Some(usage_quantity_unit(usage_type).to_string()),
            },
            tags: HashMap::new(),
            extensions: ProviderExtensions {
                x_provider_id: provider_id,
                x_provider_data,
                x_raw_billing_data_id: raw_blob_id,
                x_created_at: mapped_at,
                x_updated_at: mapped_at,
            },
        })
    }
}

fn usage_quantity_field(usage_type: &str) -> &'static str {
    match usage_type {
        "tokens" => "output_tokens",
        "images" => "n_images",
        "audio" => "seconds",
        _ => "requests",
    }
}

/// Like [`usage_quantity_field`] but honors a `token_type` discriminator
/// left by [`OpenAiMapper::split_record`], so a split input-token record
/// reports its `input_tokens` quantity rather than the zeroed-out
/// `output_tokens` field it carries alongside.
fn quantity_field(raw: &Value, usage_type: &str) -> &'static str {
    match raw.get("token_type").and_then(Value::as_str) {
        Some("input") => "input_tokens",
        Some("output") => "output_tokens",
        _ => usage_quantity_field(usage_type),
    }
}

fn usage_quantity_unit(usage_type: &str) -> &'static str {
    match usage_type {
        "tokens" => "tokens",
        "images" => "images",
        "audio" => "seconds",
        _ => "requests",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_token_cost_uses_input_and_output_rates() {
        let pricing = gpt4o_pricing();
        let raw = serde_json::json!({"input_tokens": 1000, "output_tokens": 500});
        let cost = calculate_costs(&pricing, "gpt-4o", "tokens", &raw);
        assert_eq!(cost.input_cost, BigDecimal::from_str("0.005").unwrap());
        assert_eq!(cost.output_cost, BigDecimal::from_str("0.0075").unwrap());
    }

    #[test]
    fn test_unknown_model_prices_at_zero() {
        let pricing = gpt4o_pricing();
        let raw = serde_json::json!({"input_tokens": 1000, "output_tokens": 500});
        let cost = calculate_costs(&pricing, "unknown-model", "tokens", &raw);
        assert_eq!(cost.total, BigDecimal::from(0));
    }

    #[test]
    fn test_unrecognized_usage_type_falls_back_to_per_request_billing() {
        let pricing = gpt4o_pricing();
        let raw = serde_json::json!({"requests": 3});
        let cost = calculate_costs(&pricing, "gpt-4o", "moderation", &raw);
        assert_eq!(cost.total, BigDecimal::from_str("0.003").unwrap());
    }

    fn usage_bucket() -> Value {
        serde_json::json!({
            "model": "gpt-4o",
            "input_tokens": 1000,
            "output_tokens": 500,
            "bucket_start_time": 1_704_067_200i64,
            "bucket_end_time": 1_704_153_600i64,
        })
    }

    #[test]
    fn test_bucket_row_without_usage_type_is_valid() {
        let mapper = OpenAiMapper::new(gpt4o_pricing());
        assert!(mapper.is_valid_record(&usage_bucket()));
        assert!(!mapper.is_valid_record(&serde_json::json!({"model": "gpt-4o"})));
    }

    #[test]
    fn test_split_record_fans_out_bucket_into_two_token_type_rows() {
        let mapper = OpenAiMapper::new(gpt4o_pricing());
        let parts = mapper.split_record(usage_bucket());
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["token_type"], "input");
        assert_eq!(parts[0]["input_tokens"], 1000);
        assert_eq!(parts[0]["output_tokens"], 0);
        assert_eq!(parts[1]["token_type"], "output");
        assert_eq!(parts[1]["input_tokens"], 0);
        assert_eq!(parts[1]["output_tokens"], 500);
    }

    #[test]
    fn test_map_one_splits_bucket_into_two_focus_records() {
        let mapper = OpenAiMapper::new(gpt4o_pricing());
        let outcomes = mapper.map_one(usage_bucket(), Uuid::new_v4(), Uuid::new_v4(), Timestamp::now());
        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            let MapOutcome::Mapped(record) = outcome else { panic!("expected mapped record, got {outcome:?}") };
            assert_eq!(record.service.service_category, focus_core::focus::ServiceCategory::AiAndMachineLearning);
            assert_eq!(record.charge.charge_category, ChargeCategory::Usage);
            assert_eq!(record.currency.billing_currency, "USD");
            assert_eq!(record.charge.pricing_unit.as_deref(), Some("tokens"));
            assert!(record.cost.billed_cost >= BigDecimal::from(0));
        }
    }

    #[test]
    fn test_split_bucket_records_share_keys_but_differ_by_discriminator() {
        let mapper = OpenAiMapper::new(gpt4o_pricing());
        let provider_id = Uuid::new_v4();
        let raw_blob_id = Uuid::new_v4();
        let mapped_at = Timestamp::now();
        let outcomes = mapper.map_one(usage_bucket(), provider_id, raw_blob_id, mapped_at);
        let records: Vec<_> = outcomes
            .into_iter()
            .map(|o| match o {
                MapOutcome::Mapped(record) => record,
                MapOutcome::Rejected { reason, .. } => panic!("unexpected rejection: {reason}"),
            })
            .collect();
        assert_eq!(records[0].period.charge_period_start, records[1].period.charge_period_start);
        assert_eq!(records[0].period.charge_period_end, records[1].period.charge_period_end);
        assert_eq!(records[0].sku.sku_id, records[1].sku.sku_id);
        assert_ne!(records[0].id, records[1].id);
        assert_ne!(
            records[0].extensions.x_provider_data.get("token_type"),
            records[1].extensions.x_provider_data.get("token_type")
        );
    }

    #[test]
    fn test_legacy_event_with_explicit_usage_type_is_not_split() {
        let mapper = OpenAiMapper::new(gpt4o_pricing());
        let raw = serde_json::json!({
            "model": "gpt-4o",
            "usage_type": "tokens",
            "input_tokens": 1000,
            "output_tokens": 500,
            "start_time": 1_704_067_200i64,
            "end_time": 1_704_153_600i64,
        });
        let outcomes = mapper.map_one(raw, Uuid::new_v4(), Uuid::new_v4(), Timestamp::now());
        assert_eq!(outcomes.len(), 1);
    }
}
