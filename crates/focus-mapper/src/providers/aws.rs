//! AWS FOCUS mapper.
//!
//! AWS's Cost and Usage Report (CUR 2.0) uses `/`-namespaced column names
//! (`lineItem/UnblendedCost`, `bill/BillingPeriodStartDate`, ...). A raw
//! record here is one CUR row, already decoded to JSON by `focus-extract`'s
//! filesystem extractor.

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

fn str_field<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str)
}

fn decimal_field(raw: &Value, key: &str) -> BigDecimal {
    str_field(raw, key).filter(|s| !s.is_empty()).and_then(|s| BigDecimal::from_str(s).ok()).unwrap_or_else(|| BigDecimal::from(0))
}

fn optional_decimal_field(raw: &Value, key: &str) -> Option<BigDecimal> {
    str_field(raw, key).filter(|s| !s.is_empty()).and_then(|s| BigDecimal::from_str(s).ok())
}

fn parse_timestamp(raw: &Value, key: &str) -> Option<Timestamp> {
    str_field(raw, key).and_then(|s| s.parse::<Timestamp>().ok())
}

/// AWS's `lineItem/LineItemType` vocabulary maps onto FOCUS charge category;
/// anything unrecognized (e.g. `Fee`, `RIFee`) falls back to `Usage` since
/// it still represents a consumption charge rather than a pure adjustment.
fn charge_category(line_item_type: &str) -> ChargeCategory {
    match line_item_type {
        "Usage" | "DiscountedUsage" | "SavingsPlanCoveredUsage" => ChargeCategory::Usage,
        "Tax" => ChargeCategory::Tax,
        "Credit" | "Refund" => ChargeCategory::Credit,
        "Purchase" | "SavingsPlanUpfrontFee" | "RIFee" => ChargeCategory::Purchase,
        _ => ChargeCategory::Usage,
    }
}

pub struct AwsMapper;

impl AwsMapper {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AwsMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusMapper for AwsMapper {
    fn is_valid_record(&self, raw: &Value) -> bool {
        raw.is_object() && raw.get("lineItem/UnblendedCost").is_some()
    }

    fn build_record(&self, raw: &Value, provider_id: Uuid, raw_blob_id: Uuid, mapped_at: Timestamp) -> Result<FocusRecord> {
        let billing_account_id = str_field(raw, "bill/PayerAccountId").unwrap_or("unknown").to_string();
        let sub_account_id = str_field(raw, "lineItem/UsageAccountId").map(str::to_string);

        let billing_period_start = parse_timestamp(raw, "bill/BillingPeriodStartDate").unwrap_or(mapped_at);
        let billing_period_end = parse_timestamp(raw, "bill/BillingPeriodEndDate").unwrap_or(mapped_at);
        let charge_period_start = parse_timestamp(raw, "lineItem/UsageStartDate").unwrap_or(mapped_at);
        let charge_period_end = parse_timestamp(raw, "lineItem/UsageEndDate").unwrap_or(mapped_at);

        let native_category = str_field(raw, "product/servicecode")
            .or_else(|| str_field(raw, "product/ProductName"))
            .or_else(|| str_field(raw, "lineItem/ProductCode"))
            .unwrap_or("Other");

        let resource = match str_field(raw, "lineItem/ResourceId") {
            Some(id) if !id.is_empty() => ResourceInfo {
                resource_id: Some(id.to_string()),
                resource_name: Some(id.to_string()),
                resource_type: str_field(raw, "product/instanceType").map(str::to_string),
            },
            _ => ResourceInfo::default(),
        };

        let region_id = str_field(raw, "product/regionCode").or_else(|| str_field(raw, "product/region"));
        let location = match region_id {
            Some(id) => LocationInfo {
                region_id: Some(id.to_string()),
                region_name: str_field(raw, "product/location").map(str::to_string),
                availability_zone: str_field(raw, "lineItem/AvailabilityZone").map(str::to_string),
            },
            None => LocationInfo::default(),
        };

        let sku = match str_field(raw, "pricing/RateCode") {
            Some(id) if !id.is_empty() => SkuInfo {
                sku_id: Some(id.to_string()),
                sku_price_id: str_field(raw, "pricing/RateId").map(str::to_string),
                sku_meter: str_field(raw, "lineItem/UsageType").map(str::to_string),
                sku_price_details: None,
                list_unit_price: optional_decimal_field(raw, "pricing/publicOnDemandRate"),
                contracted_unit_price: optional_decimal_field(raw, "lineItem/UnblendedRate"),
            },
            _ => SkuInfo::default(),
        };

        let quantity = optional_decimal_field(raw, "lineItem/UsageAmount");
        let unit = str_field(raw, "pricing/unit").map(str::to_string);

        Ok(FocusRecord {
            id: focus_core::focus::surrogate_id(provider_id, raw),
            cost: CostInfo {
                billed_cost: decimal_field(raw, "lineItem/UnblendedCost"),
                effective_cost: decimal_field(raw, "lineItem/BlendedCost"),
                list_cost: optional_decimal_field(raw, "pricing/publicOnDemandCost")
                    .unwrap_or_else(|| decimal_field(raw, "lineItem/UnblendedCost")),
                contracted_cost: decimal_field(raw, "lineItem/UnblendedCost"),
            },
            account: AccountInfo {
                billing_account_id: billing_account_id.clone(),
                billing_account_name: billing_account_id,
                billing_account_type: "BillingAccount".into(),
                sub_account_id: sub_account_id.clone(),
                sub_account_name: sub_account_id.clone(),
                sub_account_type: sub_account_id.map(|_| "LinkedAccount".to_string()),
            },
            period: TimePeriodInfo { billing_period_start, billing_period_end, charge_period_start, charge_period_end },
            currency: CurrencyInfo {
                billing_currency: str_field(raw, "lineItem/CurrencyCode").or_else(|| str_field(raw, "pricing/currency")).unwrap_or("USD").to_string(),
                pricing_currency: None,
            },
            service: ServiceInfo {
                service_name: str_field(raw, "product/ProductName").unwrap_or("Unknown Service").to_string(),
                service_category: category::resolve(native_category),
                service_subcategory: None,
                provider_name: "Amazon Web Services".into(),
                publisher_name: "Amazon Web Services".into(),
                invoice_issuer_name: "Amazon Web Services".into(),
            },
            charge: ChargeInfo {
                charge_category: str_field(raw, "lineItem/LineItemType").map(charge_category).unwrap_or(ChargeCategory::Usage),
                charge_description: str_field(raw, "lineItem/LineItemDescription").unwrap_or_default().to_string(),
                charge_class: None,
                charge_frequency: None,
                pricing_quantity: quantity.clone(),
                pricing_unit: unit.clone(),
            },
            resource,
            location,
            sku,
            commitment: CommitmentInfo::default(),
            usage: UsageInfo { consumed_quantity: quantity, consumed_unit: unit },
            tags: collect_resource_tags(raw),
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

/// AWS CUR flattens cost allocation tags into `resourceTags/user:<Key>`
/// columns.
fn collect_resource_tags(raw: &Value) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    if let Some(object) = raw.as_object() {
        for (key, value) in object {
            if let Some(tag_key) = key.strip_prefix("resourceTags/user:") {
                if let Some(s) = value.as_str() {
                    tags.insert(tag_key.to_string(), s.to_string());
                }
            }
        }
    }
    tags
}
