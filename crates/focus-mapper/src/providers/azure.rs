//! Azure FOCUS mapper.
//!
//! Azure's Cost Management export is already close to FOCUS-shaped: raw
//! records carry FOCUS field names directly (`BilledCost`, `ServiceName`,
//! `ChargePeriodStart`, ...), so this mapper is mostly field copying plus
//! category/charge-class/commitment-status alias resolution and filtering.

use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use focus_core::error::Result;
use focus_core::focus::{
    AccountInfo, ChargeCategory, ChargeClass, ChargeInfo, CommitmentDiscountStatus, CommitmentInfo, CostInfo,
    CurrencyInfo, FocusRecord, LocationInfo, ProviderExtensions, ResourceInfo, ServiceInfo, SkuInfo, TimePeriodInfo,
    UsageInfo,
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
    str_field(raw, key)
        .filter(|s| !s.is_empty())
        .and_then(|s| BigDecimal::from_str(s).ok())
        .unwrap_or_else(|| BigDecimal::from(0))
}

fn optional_decimal_field(raw: &Value, key: &str) -> Option<BigDecimal> {
    str_field(raw, key).filter(|s| !s.is_empty()).and_then(|s| BigDecimal::from_str(s).ok())
}

fn parse_timestamp(raw: &Value, key: &str) -> Option<Timestamp> {
    str_field(raw, key).and_then(|s| s.parse::<Timestamp>().ok())
}

/// `ChargeClass`'s only FOCUS-compliant value is `Correction`; anything else
/// Azure's export puts there (occasionally a stray product field) is
/// dropped rather than surfaced as an invalid enum.
fn filter_charge_class(raw: &Value) -> Option<ChargeClass> {
    match str_field(raw, "ChargeClass") {
        Some("Correction") => Some(ChargeClass::Correction),
        _ => None,
    }
}

fn filter_commitment_status(raw: &Value) -> Option<CommitmentDiscountStatus> {
    match str_field(raw, "CommitmentDiscountStatus") {
        Some("Used") => Some(CommitmentDiscountStatus::Used),
        Some("Unused") => Some(CommitmentDiscountStatus::Unused),
        _ => None,
    }
}

/// Azure sometimes sends a near-FOCUS category spelling (`"AI + Machine
/// Learning"`, `"Database"`); those are normalized before falling through to
/// the shared alias table.
fn normalize_category_alias(category: &str) -> &str {
    match category {
        "AI + Machine Learning" => "AI and Machine Learning",
        "Database" => "Databases",
        other => other,
    }
}

pub struct AzureMapper;

impl AzureMapper {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AzureMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusMapper for AzureMapper {
    fn is_valid_record(&self, raw: &Value) -> bool {
        raw.is_object() && (raw.get("BilledCost").is_some() || raw.get("ServiceName").is_some())
    }

    fn build_record(&self, raw: &Value, provider_id: Uuid, raw_blob_id: Uuid, mapped_at: Timestamp) -> Result<FocusRecord> {
        let billing_account_id = str_field(raw, "BillingAccountId").unwrap_or("unknown").to_string();
        let billing_account_name = str_field(raw, "BillingAccountName").unwrap_or(&billing_account_id).to_string();
        let sub_account_id = str_field(raw, "SubAccountId").map(str::to_string);

        let billing_period_start = parse_timestamp(raw, "BillingPeriodStart").unwrap_or(mapped_at);
        let billing_period_end = parse_timestamp(raw, "BillingPeriodEnd").unwrap_or(mapped_at);
        let charge_period_start = parse_timestamp(raw, "ChargePeriodStart").unwrap_or(mapped_at);
        let charge_period_end = parse_timestamp(raw, "ChargePeriodEnd").unwrap_or(mapped_at);

        let native_category = str_field(raw, "ServiceCategory")
            .map(normalize_category_alias)
            .or_else(|| str_field(raw, "ChargeClass"))
            .or_else(|| str_field(raw, "ServiceName"))
            .unwrap_or("Other");

        let resource = match str_field(raw, "ResourceId") {
            Some(id) => ResourceInfo {
                resource_id: Some(id.to_string()),
                resource_name: Some(str_field(raw, "ResourceName").unwrap_or(id).to_string()),
                resource_type: str_field(raw, "ResourceType").map(str::to_string),
            },
            None => ResourceInfo::default(),
        };

        let location = if str_field(raw, "RegionId").is_some() || str_field(raw, "RegionName").is_some() {
            LocationInfo {
                region_id: str_field(raw, "RegionId").map(str::to_string),
                region_name: str_field(raw, "RegionName").map(str::to_string),
                availability_zone: str_field(raw, "AvailabilityZone").map(str::to_string),
            }
        } else {
            LocationInfo::default()
        };

        let sku = match str_field(raw, "SkuId") {
            Some(id) => SkuInfo {
                sku_id: Some(id.to_string()),
                sku_price_id: str_field(raw, "SkuPriceId").map(str::to_string),
                sku_meter: None,
                sku_price_details: None,
                list_unit_price: optional_decimal_field(raw, "ListUnitPrice"),
                contracted_unit_price: optional_decimal_field(raw, "ContractedUnitPrice"),
            },
            None => SkuInfo::default(),
        };

        let commitment = match str_field(raw, "CommitmentDiscountId") {
            Some(id) => CommitmentInfo {
                commitment_discount_id: Some(id.to_string()),
                commitment_discount_type: str_field(raw, "CommitmentDiscountType").map(str::to_string),
                commitment_discount_category: str_field(raw, "CommitmentDiscountCategory").map(str::to_string),
                commitment_discount_name: str_field(raw, "CommitmentDiscountName").map(str::to_string),
                commitment_discount_status: filter_commitment_status(raw),
                commitment_discount_quantity: optional_decimal_field(raw, "CommitmentDiscountQuantity"),
                commitment_discount_unit: str_field(raw, "CommitmentDiscountUnit").map(str::to_string),
            },
            None => CommitmentInfo::default(),
        };

        let tags = collect_tags(raw);

        Ok(FocusRecord {
            id: focus_core::focus::surrogate_id(provider_id, raw),
            cost: CostInfo {
                billed_cost: decimal_field(raw, "BilledCost"),
                effective_cost: decimal_field(raw, "EffectiveCost"),
                list_cost: decimal_field(raw, "ListCost"),
                contracted_cost: decimal_field(raw, "ContractedCost"),
            },
            account: AccountInfo {
                billing_account_id,
                billing_account_name,
                billing_account_type: "BillingAccount".into(),
                sub_account_id: sub_account_id.clone(),
                sub_account_name: str_field(raw, "SubAccountName").map(str::to_string),
                sub_account_type: sub_account_id.map(|_| "Subscription".to_string()),
            },
            period: TimePeriodInfo { billing_period_start, billing_period_end, charge_period_start, charge_period_end },
            currency: CurrencyInfo {
                billing_currency: str_field(raw, "BillingCurrency").unwrap_or("USD").to_string(),
                pricing_currency: None,
            },
            service: ServiceInfo {
                service_name: str_field(raw, "ServiceName").unwrap_or("Unknown Service").to_string(),
                service_category: category::resolve(native_category),
                service_subcategory: None,
                provider_name: "Microsoft Azure".into(),
                publisher_name: "Microsoft".into(),
                invoice_issuer_name: "Microsoft Azure".into(),
            },
            charge: ChargeInfo {
                charge_category: str_field(raw, "ChargeCategory")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(ChargeCategory::Usage),
                charge_description: str_field(raw, "ChargeDescription").unwrap_or_default().to_string(),
                charge_class: filter_charge_class(raw),
                charge_frequency: None,
                pricing_quantity: optional_decimal_field(raw, "PricingQuantity"),
                pricing_unit: str_field(raw, "PricingUnit").map(str::to_string),
            },
            resource,
            location,
            sku,
            commitment,
            usage: UsageInfo {
                consumed_quantity: Some(decimal_field(raw, "ConsumedQuantity")),
                consumed_unit: str_field(raw, "ConsumedUnit").map(str::to_string),
            },
            tags,
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

/// Azure exports tags either flattened as `Tags/<key>` columns (CSV export)
/// or as a nested `Tags` object (REST export); both forms are merged.
fn collect_tags(raw: &Value) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    if let Some(object) = raw.as_object() {
        for (key, value) in object {
            if let Some(tag_key) = key.strip_prefix("Tags/") {
                if let Some(s) = value.as_str() {
                    tags.insert(tag_key.to_string(), s.to_string());
                }
            }
        }
    }
    if let Some(Value::Object(nested)) = raw.get("Tags") {
        for (key, value) in nested {
            if let Some(s) = value.as_str() {
                tags.insert(key.clone(), s.to_string());
            }
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_record() -> Value {
        serde_json::json!({
            "BilledCost": "100.50",
            "EffectiveCost": "95.00",
            "ListCost": "110.00",
            "ContractedCost": "95.00",
            "BillingCurrency": "USD",
            "BillingAccountId": "12345-67890",
            "BillingAccountName": "Test Billing Account",
            "SubAccountId": "sub-123",
            "SubAccountName": "Test Subscription",
            "ChargePeriodStart": "2024-01-01T00:00:00Z",
            "ChargePeriodEnd": "2024-01-02T00:00:00Z",
            "BillingPeriodStart": "2024-01-01T00:00:00Z",
            "BillingPeriodEnd": "2024-01-31T23:59:59Z",
            "ServiceName": "Virtual Machines",
            "ServiceCategory": "Compute",
            "ChargeCategory": "Usage",
            "ChargeDescription": "VM usage charge",
            "PricingQuantity": "24.0",
            "PricingUnit": "Hours",
            "ResourceId": "/subscriptions/sub-123/resourceGroups/rg-test/providers/Microsoft.Compute/virtualMachines/vm-test",
            "ResourceName": "vm-test",
            "ResourceType": "Microsoft.Compute/virtualMachines",
            "RegionId": "eastus",
            "RegionName": "East US",
            "AvailabilityZone": "1",
            "SkuId": "Standard_D2s_v3",
            "SkuPriceId": "price-123",
            "ListUnitPrice": "0.096",
            "ContractedUnitPrice": "0.096",
            "ConsumedQuantity": "24.0",
            "ConsumedUnit": "Hours",
        })
    }

    #[test]
    fn test_is_valid_record_requires_cost_or_service_name() {
        let mapper = AzureMapper::new();
        assert!(mapper.is_valid_record(&valid_record()));
        assert!(!mapper.is_valid_record(&serde_json::json!({"RandomField": "value"})));
    }

    #[test]
    fn test_build_record_maps_costs_and_account() {
        let mapper = AzureMapper::new();
        let record = mapper
            .build_record(&valid_record(), Uuid::new_v4(), Uuid::new_v4(), Timestamp::now())
            .unwrap();
        assert_eq!(record.cost.billed_cost, BigDecimal::from_str("100.50").unwrap());
        assert_eq!(record.account.billing_account_id, "12345-67890");
        assert_eq!(record.account.sub_account_type.as_deref(), Some("Subscription"));
    }

    #[test]
    fn test_non_focus_charge_class_is_filtered() {
        let mapper = AzureMapper::new();
        let mut raw = valid_record();
        raw["ChargeClass"] = Value::String("Compute".into());
        let record = mapper.build_record(&raw, Uuid::new_v4(), Uuid::new_v4(), Timestamp::now()).unwrap();
        assert!(record.charge.charge_class.is_none());
    }

    #[test]
    fn test_ai_category_alias_is_normalized() {
        let mapper = AzureMapper::new();
        let mut raw = valid_record();
        raw["ServiceCategory"] = Value::String("AI + Machine Learning".into());
        let record = mapper.build_record(&raw, Uuid::new_v4(), Uuid::new_v4(), Timestamp::now()).unwrap();
        assert_eq!(record.service.service_category, focus_core::focus::ServiceCategory::AiAndMachineLearning);
    }

    #[test]
    fn test_missing_sku_id_yields_default_sku_info() {
        let mapper = AzureMapper::new();
        let record = mapper
            .build_record(&serde_json::json!({"BilledCost": "1.00"}), Uuid::new_v4(), Uuid::new_v4(), Timestamp::now())
            .unwrap();
        assert!(record.sku.sku_id.is_none());
    }

    #[test]
    fn test_tags_merge_prefixed_and_nested_forms() {
        let raw = serde_json::json!({
            "BilledCost": "1.00",
            "Tags/Environment": "Production",
            "Tags": {"Team": "DevOps"},
        });
        let tags = collect_tags(&raw);
        assert_eq!(tags.get("Environment").map(String::as_str), Some("Production"));
        assert_eq!(tags.get("Team").map(String::as_str), Some("DevOps"));
    }
}
