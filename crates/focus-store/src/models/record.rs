//! FOCUS record persistence row. `merge_sku_key` is a Postgres `GENERATED
//! ALWAYS ... STORED` column, collapsing `sku_id IS NULL` into a constant so
//! two NULLs still count as equal for the unique index, so it never
//! appears on [`NewBillingData`]; `billing_data (x_provider_id,
//! charge_period_start, charge_period_end, merge_sku_key, id)` is the `ON
//! CONFLICT` target the loader upserts against. `id` is included because a
//! single raw record can fan out into several [`FocusRecord`]s sharing every
//! other merge component (e.g. a provider splitting usage by token type);
//! since `id` is derived deterministically from the raw record
//! (`focus_core::focus::surrogate_id`), replays still upsert onto the same
//! row instead of drifting to a new one each run.

use bigdecimal::BigDecimal;
use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use crate::schema::billing_data;
use crate::types::{DbChargeCategory, DbChargeClass, DbChargeFrequency, DbCommitmentDiscountStatus, DbServiceCategory};
use focus_core::focus::{
    AccountInfo, ChargeInfo, CommitmentInfo, CostInfo, CurrencyInfo, FocusRecord, LocationInfo, ProviderExtensions,
    ResourceInfo, ServiceInfo, SkuInfo, TimePeriodInfo, UsageInfo,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = billing_data)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BillingDataRow {
    pub id: Uuid,

    pub billed_cost: BigDecimal,
    pub effective_cost: BigDecimal,
    pub list_cost: BigDecimal,
    pub contracted_cost: BigDecimal,

    pub billing_account_id: String,
    pub billing_account_name: String,
    pub billing_account_type: String,
    pub sub_account_id: Option<String>,
    pub sub_account_name: Option<String>,
    pub sub_account_type: Option<String>,

    pub billing_period_start: Timestamp,
    pub billing_period_end: Timestamp,
    pub charge_period_start: Timestamp,
    pub charge_period_end: Timestamp,

    pub billing_currency: String,
    pub pricing_currency: Option<String>,

    pub service_name: String,
    pub service_category: DbServiceCategory,
    pub service_subcategory: Option<String>,
    pub provider_name: String,
    pub publisher_name: String,
    pub invoice_issuer_name: String,

    pub charge_category: DbChargeCategory,
    pub charge_description: String,
    pub charge_class: Option<DbChargeClass>,
    pub charge_frequency: Option<DbChargeFrequency>,
    pub pricing_quantity: Option<BigDecimal>,
    pub pricing_unit: Option<String>,

    pub resource_id: Option<String>,
    pub resource_name: Option<String>,
    pub resource_type: Option<String>,

    pub region_id: Option<String>,
    pub region_name: Option<String>,
    pub availability_zone: Option<String>,

    pub sku_id: Option<String>,
    pub sku_price_id: Option<String>,
    pub sku_meter: Option<String>,
    pub sku_price_details: Option<serde_json::Value>,
    pub list_unit_price: Option<BigDecimal>,
    pub contracted_unit_price: Option<BigDecimal>,

    pub commitment_discount_id: Option<String>,
    pub commitment_discount_type: Option<String>,
    pub commitment_discount_category: Option<String>,
    pub commitment_discount_name: Option<String>,
    pub commitment_discount_status: Option<DbCommitmentDiscountStatus>,
    pub commitment_discount_quantity: Option<BigDecimal>,
    pub commitment_discount_unit: Option<String>,

    pub consumed_quantity: Option<BigDecimal>,
    pub consumed_unit: Option<String>,

    pub tags: serde_json::Value,

    pub x_provider_id: Uuid,
    pub x_provider_data: serde_json::Value,
    pub x_raw_billing_data_id: Uuid,
    pub x_created_at: Timestamp,
    pub x_updated_at: Timestamp,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = billing_data)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewBillingData {
    pub id: Uuid,

    pub billed_cost: BigDecimal,
    pub effective_cost: BigDecimal,
    pub list_cost: BigDecimal,
    pub contracted_cost: BigDecimal,

    pub billing_account_id: String,
    pub billing_account_name: String,
    pub billing_account_type: String,
    pub sub_account_id: Option<String>,
    pub sub_account_name: Option<String>,
    pub sub_account_type: Option<String>,

    pub billing_period_start: Timestamp,
    pub billing_period_end: Timestamp,
    pub charge_period_start: Timestamp,
    pub charge_period_end: Timestamp,

    pub billing_currency: String,
    pub pricing_currency: Option<String>,

    pub service_name: String,
    pub service_category: DbServiceCategory,
    pub service_subcategory: Option<String>,
    pub provider_name: String,
    pub publisher_name: String,
    pub invoice_issuer_name: String,

    pub charge_category: DbChargeCategory,
    pub charge_description: String,
    pub charge_class: Option<DbChargeClass>,
    pub charge_frequency: Option<DbChargeFrequency>,
    pub pricing_quantity: Option<BigDecimal>,
    pub pricing_unit: Option<String>,

    pub resource_id: Option<String>,
    pub resource_name: Option<String>,
    pub resource_type: Option<String>,

    pub region_id: Option<String>,
    pub region_name: Option<String>,
    pub availability_zone: Option<String>,

    pub sku_id: Option<String>,
    pub sku_price_id: Option<String>,
    pub sku_meter: Option<String>,
    pub sku_price_details: Option<serde_json::Value>,
    pub list_unit_price: Option<BigDecimal>,
    pub contracted_unit_price: Option<BigDecimal>,

    pub commitment_discount_id: Option<String>,
    pub commitment_discount_type: Option<String>,
    pub commitment_discount_category: Option<String>,
    pub commitment_discount_name: Option<String>,
    pub commitment_discount_status: Option<DbCommitmentDiscountStatus>,
    pub commitment_discount_quantity: Option<BigDecimal>,
    pub commitment_discount_unit: Option<String>,

    pub consumed_quantity: Option<BigDecimal>,
    pub consumed_unit: Option<String>,

    pub tags: serde_json::Value,

    pub x_provider_id: Uuid,
    pub x_provider_data: serde_json::Value,
    pub x_raw_billing_data_id: Uuid,
    pub x_created_at: Timestamp,
    pub x_updated_at: Timestamp,
}

impl From<&FocusRecord> for NewBillingData {
    fn from(record: &FocusRecord) -> Self {
        Self {
            id: record.id,

            billed_cost: record.cost.billed_cost.clone(),
            effective_cost: record.cost.effective_cost.clone(),
            list_cost: record.cost.list_cost.clone(),
            contracted_cost: record.cost.contracted_cost.clone(),

            billing_account_id: record.account.billing_account_id.clone(),
            billing_account_name: record.account.billing_account_name.clone(),
            billing_account_type: record.account.billing_account_type.clone(),
            sub_account_id: record.account.sub_account_id.clone(),
            sub_account_name: record.account.sub_account_name.clone(),
            sub_account_type: record.account.sub_account_type.clone(),

            billing_period_start: Timestamp::from(record.period.billing_period_start),
            billing_period_end: Timestamp::from(record.period.billing_period_end),
            charge_period_start: Timestamp::from(record.period.charge_period_start),
            charge_period_end: Timestamp::from(record.period.charge_period_end),

            billing_currency: record.currency.billing_currency.clone(),
            pricing_currency: record.currency.pricing_currency.clone(),

            service_name: record.service.service_name.clone(),
            service_category: record.service.service_category.into(),
            service_subcategory: record.service.service_subcategory.clone(),
            provider_name: record.service.provider_name.clone(),
            publisher_name: record.service.publisher_name.clone(),
            invoice_issuer_name: record.service.invoice_issuer_name.clone(),

            charge_category: record.charge.charge_category.into(),
            charge_description: record.charge.charge_description.clone(),
            charge_class: record.charge.charge_class.map(Into::into),
            charge_frequency: record.charge.charge_frequency.map(Into::into),
            pricing_quantity: record.charge.pricing_quantity.clone(),
            pricing_unit: record.charge.pricing_unit.clone(),

            resource_id: record.resource.resource_id.clone(),
            resource_name: record.resource.resource_name.clone(),
            resource_type: record.resource.resource_type.clone(),

            region_id: record.location.region_id.clone(),
            region_name: record.location.region_name.clone(),
            availability_zone: record.location.availability_zone.clone(),

            sku_id: record.sku.sku_id.clone(),
            sku_price_id: record.sku.sku_price_id.clone(),
            sku_meter: record.sku.sku_meter.clone(),
            sku_price_details: record.sku.sku_price_details.clone(),
            list_unit_price: record.sku.list_unit_price.clone(),
            contracted_unit_price: record.sku.contracted_unit_price.clone(),

            commitment_discount_id: record.commitment.commitment_discount_id.clone(),
            commitment_discount_type: record.commitment.commitment_discount_type.clone(),
            commitment_discount_category: record.commitment.commitment_discount_category.clone(),
            commitment_discount_name: record.commitment.commitment_discount_name.clone(),
            commitment_discount_status: record.commitment.commitment_discount_status.map(Into::into),
            commitment_discount_quantity: record.commitment.commitment_discount_quantity.clone(),
            commitment_discount_unit: record.commitment.commitment_discount_unit.clone(),

            consumed_quantity: record.usage.consumed_quantity.clone(),
            consumed_unit: record.usage.consumed_unit.clone(),

            tags: serde_json::to_value(&record.tags).unwrap_or(serde_json::Value::Null),

            x_provider_id: record.extensions.x_provider_id,
            x_provider_data: serde_json::to_value(&record.extensions.x_provider_data).unwrap_or(serde_json::Value::Null),
            x_raw_billing_data_id: record.extensions.x_raw_billing_data_id,
            x_created_at: Timestamp::from(record.extensions.x_created_at),
            x_updated_at: Timestamp::from(record.extensions.x_updated_at),
        }
    }
}

impl From<BillingDataRow> for FocusRecord {
    fn from(row: BillingDataRow) -> Self {
        Self {
            id: row.id,
            cost: CostInfo {
                billed_cost: row.billed_cost,
                effective_cost: row.effective_cost,
                list_cost: row.list_cost,
                contracted_cost: row.contracted_cost,
            },
            account: AccountInfo {
                billing_account_id: row.billing_account_id,
                billing_account_name: row.billing_account_name,
                billing_account_type: row.billing_account_type,
                sub_account_id: row.sub_account_id,
                sub_account_name: row.sub_account_name,
                sub_account_type: row.sub_account_type,
            },
            period: TimePeriodInfo {
                billing_period_start: jiff::Timestamp::from(row.billing_period_start),
                billing_period_end: jiff::Timestamp::from(row.billing_period_end),
                charge_period_start: jiff::Timestamp::from(row.charge_period_start),
                charge_period_end: jiff::Timestamp::from(row.charge_period_end),
            },
            currency: CurrencyInfo { billing_currency: row.billing_currency, pricing_currency: row.pricing_currency },
            service: ServiceInfo {
                service_name: row.service_name,
                service_category: row.service_category.into(),
                service_subcategory: row.service_subcategory,
                provider_name: row.provider_name,
                publisher_name: row.publisher_name,
                invoice_issuer_name: row.invoice_issuer_name,
            },
            charge: ChargeInfo {
                charge_category: row.charge_category.into(),
                charge_description: row.charge_description,
                charge_class: row.charge_class.map(Into::into),
                charge_frequency: row.charge_frequency.map(Into::into),
                pricing_quantity: row.pricing_quantity,
                pricing_unit: row.pricing_unit,
            },
            resource: ResourceInfo {
                resource_id: row.resource_id,
                resource_name: row.resource_name,
                resource_type: row.resource_type,
            },
            location: LocationInfo {
                region_id: row.region_id,
                region_name: row.region_name,
                availability_zone: row.availability_zone,
            },
            sku: SkuInfo {
                sku_id: row.sku_id,
                sku_price_id: row.sku_price_id,
                sku_meter: row.sku_meter,
                sku_price_details: row.sku_price_details,
                list_unit_price: row.list_unit_price,
                contracted_unit_price: row.contracted_unit_price,
            },
            commitment: CommitmentInfo {
                commitment_discount_id: row.commitment_discount_id,
                commitment_discount_type: row.commitment_discount_type,
                commitment_discount_category: row.commitment_discount_category,
                commitment_discount_name: row.commitment_discount_name,
                commitment_discount_status: row.commitment_discount_status.map(Into::into),
                commitment_discount_quantity: row.commitment_discount_quantity,
                commitment_discount_unit: row.commitment_discount_unit,
            },
            usage: UsageInfo { consumed_quantity: row.consumed_quantity, consumed_unit: row.consumed_unit },
            tags: serde_json::from_value(row.tags).unwrap_or_default(),
            extensions: ProviderExtensions {
                x_provider_id: row.x_provider_id,
                x_provider_data: serde_json::from_value(row.x_provider_data).unwrap_or_default(),
                x_raw_billing_data_id: row.x_raw_billing_data_id,
                x_created_at: jiff::Timestamp::from(row.x_created_at),
                x_updated_at: jiff::Timestamp::from(row.x_updated_at),
            },
        }
    }
}
