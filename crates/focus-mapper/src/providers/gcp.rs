//! GCP FOCUS mapper.
//!
//! GCP's detailed billing export (BigQuery `gcp_billing_export_v1_*` table,
//! queried by `usage_start_time`/`usage_end_time`) nests most fields under
//! `service`, `sku`, `project`, and `location` objects. A raw record here
//! is one decoded BigQuery row, already flattened to JSON by
//! `focus-extract`'s SQL extractor.

use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use focus_core::error::Result;
use focus_core::focus::{
    AccountInfo, ChargeCategory, ChargeInfo, CommitmentInfo, CostInfo, CurrencyInfo, FocusRecord, LocationInfo,
    ProviderExtensions, ResourceInfo, ServiceInfo, SkuInfo, TimePeriodInfo, UsageInfo,
};
use focus_registry::FocusMapper;
use jiff::Timestamp;
use serde_json::Value;
use uuid::Uuid;

use crate::category;

fn nested_str<'a>(raw: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut cursor = raw;
    for segment in path {
        cursor = cursor.get(segment)?;
    }
    cursor.as_str()
}

fn str_field<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str)
}

fn decimal_at(raw: &Value, path: &[&str]) -> Option<BigDecimal> {
    let mut cursor = raw;
    for segment in path {
        cursor = cursor.get(segment)?;
    }
    cursor
        .as_f64()
        .map(|f| f.to_string())
        .or_else(|| cursor.as_str().map(str::to_string))
        .and_then(|s| BigDecimal::from_str(&s).ok())
}

fn parse_timestamp(raw: &Value, key: &str) -> Option<Timestamp> {
    str_field(raw, key).and_then(|s| s.parse::<Timestamp>().ok())
}

/// GCP's `cost_type` vocabulary (`regular`, `tax`, `adjustment`, `rounding_error`).
fn charge_category(cost_type: &str) -> ChargeCategory {
    match cost_type {
        "tax" => ChargeCategory::Tax,
        "adjustment" | "rounding_error" => ChargeCategory::Adjustment,
        _ => ChargeCategory::Usage,
    }
}

pub struct GcpMapper;

impl GcpMapper {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GcpMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusMapper for GcpMapper {
    fn is_valid_record(&self, raw: &Value) -> bool {
        raw.is_object() && raw.get("billing_account_id").is_some() && raw.get("cost").is_some()
    }

    fn build_record(&self, raw: &Value, provider_id: Uuid, raw_blob_id: Uuid, mapped_at: Timestamp) -> Result<FocusRecord> {
        let billing_account_id = str_field(raw, "billing_account_id").unwrap_or("unknown").to_string();
        let project_id = nested_str(raw, &["project", "id"]).map(str::to_string);
        let project_name = nested_str(raw, &["project", "name"]).map(str::to_string);

        let charge_period_start = parse_timestamp(raw, "usage_start_time").unwrap_or(mapped_at);
        let charge_period_end = parse_timestamp(raw, "usage_end_time").unwrap_or(mapped_at);
        let billing_period_start = parse_timestamp(raw, "invoice_month_start").unwrap_or(charge_period_start);
        let billing_period_end = parse_timestamp(raw, "invoice_month_end").unwrap_or(charge_period_end);

        let native_category = nested_str(raw, &["service", "description"]).unwrap_or("Other");

        let resource = match nested_str(raw, &["resource", "name"]) {
            Some(name) if !name.is_empty() => ResourceInfo {
                resource_id: Some(name.to_string()),
                resource_name: Some(name.to_string()),
                resource_type: nested_str(raw, &["resource", "global_name"]).map(str::to_string),
            },
            _ => ResourceInfo::default(),
        };

        let region_id = nested_str(raw, &["location", "region"]);
        let location = match region_id {
            Some(id) if !id.is_empty() => LocationInfo {
                region_id: Some(id.to_string()),
                region_name: nested_str(raw, &["location", "location"]).map(str::to_string),
                availability_zone: nested_str(raw, &["location", "zone"]).map(str::to_string),
            },
            _ => LocationInfo::default(),
        };

        let sku_id = nested_str(raw, &["sku", "id"]);
        let sku = match sku_id {
            Some(id) if !id.is_empty() => SkuInfo {
                sku_id: Some(id.to_string()),
                sku_price_id: None,
                sku_meter: nested_str(raw, &["sku", "description"]).map(str::to_string),
                sku_price_details: None,
                list_unit_price: decimal_at(raw, &["price", "effective_price"]),
                contracted_unit_price: decimal_at(raw, &["price", "effective_price"]),
            },
            _ => SkuInfo::default(),
        };

        let usage_amount = decimal_at(raw, &["usage", "amount"]);
        let usage_unit = nested_str(raw, &["usage", "unit"]).map(str::to_string);

        let cost = decimal_at(raw, &["cost"]).unwrap_or_else(|| BigDecimal::from(0));
        let credits_total = raw
            .get("credits")
            .and_then(Value::as_array)
            .map(|credits| {
                credits
                    .iter()
                    .filter_map(|c| c.get("amount").and_then(Value::as_f64))
                    .sum::<f64>()
            })
            .map(|total| BigDecimal::from_str(&total.to_string()).unwrap_or_else(|_| BigDecimal::from(0)))
            .unwrap_or_else(|| BigDecimal::from(0));
        let effective_cost = &cost + &credits_total;

        Ok(FocusRecord {
            id: focus_core::focus::surrogate_id(provider_id, raw),
            cost: CostInfo {
                billed_cost: cost.clone(),
                effective_cost,
                list_cost: cost.clone(),
                contracted_cost: cost,
            },
            account: AccountInfo {
                billing_account_id: billing_account_id.clone(),
                billing_account_name: billing_account_id,
                billing_account_type: "BillingAccount".into(),
                sub_account_id: project_id.clone(),
                sub_account_name: project_name,
                sub_account_type: project_id.map(|_| "Project".to_string()),
            },
            period: TimePeriodInfo { billing_period_start, billing_period_end, charge_period_start, charge_period_end },
            currency: CurrencyInfo {
                billing_currency: str_field(raw, "currency").unwrap_or("USD").to_string(),
                pricing_currency: None,
            },
            service: ServiceInfo {
                service_name: nested_str(raw, &["service", "description"]).unwrap_or("Unknown Service").to_string(),
                service_category: category::resolve(native_category),
                service_subcategory: None,
                provider_name: "Google Cloud Platform".into(),
                publisher_name: "Google".into(),
                invoice_issuer_name: "Google Cloud Platform".into(),
            },
            charge: ChargeInfo {
                charge_category: str_field(raw, "cost_type").map(charge_category).unwrap_or(ChargeCategory::Usage),
                charge_description: nested_str(raw, &["sku", "description"]).unwrap_or_default().to_string(),
                charge_class: None,
                charge_frequency: None,
                pricing_quantity: usage_amount.clone(),
                pricing_unit: usage_unit.clone(),
            },
            resource,
            location,
            sku,
            commitment: CommitmentInfo::default(),
            usage: UsageInfo { consumed_quantity: usage_amount, consumed_unit: usage_unit },
            tags: collect_labels(raw),
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

/// GCP's billing export represents labels as a repeated `{key, value}`
/// struct column rather than a flat map.
fn collect_labels(raw: &Value) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    if let Some(labels) = raw.get("labels").and_then(Value::as_array) {
        for label in labels {
            if let (Some(key), Some(value)) = (label.get("key").and_then(Value::as_str), label.get("value").and_then(Value::as_str)) {
                tags.insert(key.to_string(), value.to_string());
            }
        }
    }
    tags
}
