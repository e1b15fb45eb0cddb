//! FOCUS 1.2 record types.
//!
//! [`FocusRecord`] is the pure-value representation of a single normalized
//! billing line produced by a FOCUS mapper. It is distinct from any
//! persistence row: `focus-store` translates between the two at the loader
//! boundary, so mapper and validator code never has to think about column
//! types or ORM traits.

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// FOCUS 1.2 service categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString, strum::EnumIter)]
pub enum ServiceCategory {
    #[serde(rename = "AI and Machine Learning")]
    #[strum(serialize = "AI and Machine Learning")]
    AiAndMachineLearning,
    #[serde(rename = "Analytics")]
    #[strum(serialize = "Analytics")]
    Analytics,
    #[serde(rename = "Compute")]
    #[strum(serialize = "Compute")]
    Compute,
    #[serde(rename = "Databases")]
    #[strum(serialize = "Databases")]
    Databases,
    #[serde(rename = "Developer Tools")]
    #[strum(serialize = "Developer Tools")]
    DeveloperTools,
    #[serde(rename = "Management and Governance")]
    #[strum(serialize = "Management and Governance")]
    ManagementAndGovernance,
    #[serde(rename = "Networking")]
    #[strum(serialize = "Networking")]
    Networking,
    #[serde(rename = "Security, Identity, and Compliance")]
    #[strum(serialize = "Security, Identity, and Compliance")]
    SecurityIdentityAndCompliance,
    #[serde(rename = "Storage")]
    #[strum(serialize = "Storage")]
    Storage,
    #[serde(rename = "Other")]
    #[strum(serialize = "Other")]
    Other,
}

/// FOCUS 1.2 charge categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString, strum::EnumIter)]
pub enum ChargeCategory {
    Usage,
    Purchase,
    Tax,
    Credit,
    Adjustment,
}

/// FOCUS 1.2 charge class. The only defined value is `Correction`; absence
/// means the charge is not a correction of a prior charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
pub enum ChargeClass {
    Correction,
}

/// FOCUS 1.2 commitment discount status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
pub enum CommitmentDiscountStatus {
    Used,
    Unused,
}

/// FOCUS 1.2 charge frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
pub enum ChargeFrequency {
    #[serde(rename = "One-Time")]
    #[strum(serialize = "One-Time")]
    OneTime,
    Recurring,
    #[serde(rename = "Usage-Based")]
    #[strum(serialize = "Usage-Based")]
    UsageBased,
}

/// Mandatory cost fields. All four are non-negative in a
/// compliant record; the validator (not this type) enforces that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostInfo {
    pub billed_cost: BigDecimal,
    pub effective_cost: BigDecimal,
    pub list_cost: BigDecimal,
    pub contracted_cost: BigDecimal,
}

/// Mandatory account identification fields, with the optional sub-account
/// triple (name/type require id to be present).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub billing_account_id: String,
    pub billing_account_name: String,
    pub billing_account_type: String,
    pub sub_account_id: Option<String>,
    pub sub_account_name: Option<String>,
    pub sub_account_type: Option<String>,
}

/// Mandatory billing and charge period fields, both timezone-aware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePeriodInfo {
    pub billing_period_start: Timestamp,
    pub billing_period_end: Timestamp,
    pub charge_period_start: Timestamp,
    pub charge_period_end: Timestamp,
}

/// Mandatory currency plus the optional pricing currency, used when pricing
/// is denominated differently from billing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub billing_currency: String,
    pub pricing_currency: Option<String>,
}

/// Mandatory service identification fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service_name: String,
    pub service_category: ServiceCategory,
    pub service_subcategory: Option<String>,
    pub provider_name: String,
    pub publisher_name: String,
    pub invoice_issuer_name: String,
}

/// Mandatory charge classification and pricing-quantity fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeInfo {
    pub charge_category: ChargeCategory,
    pub charge_description: String,
    pub charge_class: Option<ChargeClass>,
    pub charge_frequency: Option<ChargeFrequency>,
    pub pricing_quantity: Option<BigDecimal>,
    pub pricing_unit: Option<String>,
}

/// Optional resource identification group (name/type require id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResourceInfo {
    pub resource_id: Option<String>,
    pub resource_name: Option<String>,
    pub resource_type: Option<String>,
}

/// Optional location group (region/availability zone; name requires id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LocationInfo {
    pub region_id: Option<String>,
    pub region_name: Option<String>,
    pub availability_zone: Option<String>,
}

/// Optional SKU identification group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SkuInfo {
    pub sku_id: Option<String>,
    pub sku_price_id: Option<String>,
    pub sku_meter: Option<String>,
    pub sku_price_details: Option<Value>,
    pub list_unit_price: Option<BigDecimal>,
    pub contracted_unit_price: Option<BigDecimal>,
}

/// Optional commitment discount group (name requires id, quantity requires unit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CommitmentInfo {
    pub commitment_discount_id: Option<String>,
    pub commitment_discount_type: Option<String>,
    pub commitment_discount_category: Option<String>,
    pub commitment_discount_name: Option<String>,
    pub commitment_discount_status: Option<CommitmentDiscountStatus>,
    pub commitment_discount_quantity: Option<BigDecimal>,
    pub commitment_discount_unit: Option<String>,
}

/// Optional consumed-usage group (unit requires quantity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UsageInfo {
    pub consumed_quantity: Option<BigDecimal>,
    pub consumed_unit: Option<String>,
}

/// Provider-defined extensions. All keys conventionally begin with `x_`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderExtensions {
    pub x_provider_id: Uuid,
    pub x_provider_data: HashMap<String, Value>,
    pub x_raw_billing_data_id: Uuid,
    pub x_created_at: Timestamp,
    pub x_updated_at: Timestamp,
}

/// Namespace UUID for [`surrogate_id`]'s `Uuid::new_v5` derivation. Arbitrary
/// but fixed: changing it would reassign every surrogate id ever produced.
const SURROGATE_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6f, 0x2e, 0x3d, 0x4a, 0x9b, 0x71, 0x4c, 0x8e, 0xae, 0x02, 0x1d, 0x3f, 0x5a, 0x7c, 0x9e, 0x01,
]);

/// Derives a deterministic surrogate id for a mapped record from the raw
/// record it was built from.
///
/// Replaying extraction over the same raw payload must assign the same
/// `FocusRecord::id` so the merge key in [`FocusRecord::merge_key_parts`]
/// stays stable across runs. A provider mapper that fans one raw record out
/// into several [`FocusRecord`]s (e.g. splitting by token type) must pass
/// each split's own distinguishing raw value, not the shared source row, so
/// the splits keep receiving distinct ids.
pub fn surrogate_id(provider_id: Uuid, raw: &Value) -> Uuid {
    let mut bytes = provider_id.as_bytes().to_vec();
    bytes.extend_from_slice(&serde_json::to_vec(raw).expect("Value serialization is infallible"));
    Uuid::new_v5(&SURROGATE_ID_NAMESPACE, &bytes)
}

/// A single normalized FOCUS 1.2 billing record.
///
/// `id` is a surrogate key deterministically derived (see [`surrogate_id`])
/// by the mapper from the raw record it was built from; together with
/// `(x_provider_id, charge_period_start, charge_period_end, sku_id)` it
/// forms the merge/idempotence key the loader upserts on. Including `id`
/// keeps records a single raw row fans out into (e.g. OpenAI's per-token-type
/// split) distinct even when they share provider, charge period, and SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusRecord {
    pub id: Uuid,
    pub cost: CostInfo,
    pub account: AccountInfo,
    pub period: TimePeriodInfo,
    pub currency: CurrencyInfo,
    pub service: ServiceInfo,
    pub charge: ChargeInfo,
    pub resource: ResourceInfo,
    pub location: LocationInfo,
    pub sku: SkuInfo,
    pub commitment: CommitmentInfo,
    pub usage: UsageInfo,
    pub tags: HashMap<String, String>,
    pub extensions: ProviderExtensions,
}

impl FocusRecord {
    /// The tuple this record's merge/idempotence key is derived from.
    ///
    /// Replaying extraction over the same raw data must produce records
    /// whose merge key (computed by the loader from these fields) is
    /// identical across runs, including `id`, since it is itself derived
    /// deterministically from the raw record by [`surrogate_id`].
    pub fn merge_key_parts(&self) -> (Uuid, Timestamp, Timestamp, Option<&str>, Uuid) {
        (
            self.extensions.x_provider_id,
            self.period.charge_period_start,
            self.period.charge_period_end,
            self.sku.sku_id.as_deref(),
            self.id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surrogate_id_is_deterministic() {
        let provider_id = Uuid::new_v4();
        let raw = serde_json::json!({"a": 1, "b": "x"});
        assert_eq!(surrogate_id(provider_id, &raw), surrogate_id(provider_id, &raw));
    }

    #[test]
    fn test_surrogate_id_differs_by_raw_content() {
        let provider_id = Uuid::new_v4();
        let a = serde_json::json!({"token_type": "input"});
        let b = serde_json::json!({"token_type": "output"});
        assert_ne!(surrogate_id(provider_id, &a), surrogate_id(provider_id, &b));
    }

    #[test]
    fn test_surrogate_id_differs_by_provider() {
        let raw = serde_json::json!({"a": 1});
        assert_ne!(surrogate_id(Uuid::new_v4(), &raw), surrogate_id(Uuid::new_v4(), &raw));
    }

    #[test]
    fn test_surrogate_id_is_order_independent_over_keys() {
        // serde_json's default `Map` is BTreeMap-backed (no `preserve_order`
        // feature), so insertion order cannot affect the derived id.
        let provider_id = Uuid::new_v4();
        let a = serde_json::json!({"a": 1, "b": 2});
        let b: Value = serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap();
        assert_eq!(surrogate_id(provider_id, &a), surrogate_id(provider_id, &b));
    }
}
