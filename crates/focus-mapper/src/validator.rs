//! Strict FOCUS 1.2 validation.
//!
//! Mandatory-field presence, conditional field pairs (`SubAccountName`
//! requires `SubAccountId`, etc.), time period ordering, and
//! cost-relationship sanity checks, each producing an error, warning, or
//! info-level [`ValidationIssue`] rather than failing fast on the first
//! problem found.

use bigdecimal::{BigDecimal, Zero};
use focus_core::focus::FocusRecord;
use jiff::Timestamp;

/// Severity of one validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
    pub severity: Severity,
}

/// The outcome of validating one [`FocusRecord`]. A record is FOCUS-compliant
/// iff `errors` is empty; `warnings`/`info` never block loading.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub info: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn error(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(ValidationIssue { field, message: message.into(), severity: Severity::Error });
    }

    fn warning(&mut self, field: &'static str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue { field, message: message.into(), severity: Severity::Warning });
    }

    fn info(&mut self, field: &'static str, message: impl Into<String>) {
        self.info.push(ValidationIssue { field, message: message.into(), severity: Severity::Info });
    }
}

/// Validates individual records and batches against FOCUS 1.2.
#[derive(Debug, Clone, Copy, Default)]
pub struct FocusValidator {
    /// When set, warnings are promoted to errors (the provider-review
    /// pipeline's strict pass, as opposed to the extraction pipeline's
    /// lenient first pass).
    pub strict_mode: bool,
}

impl FocusValidator {
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    pub fn validate_record(&self, record: &FocusRecord, now: Timestamp) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_conditional_fields(record, &mut result);
        self.validate_time_periods(record, now, &mut result);
        self.validate_costs(record, &mut result);
        self.validate_relationships(record, &mut result);

        if self.strict_mode && !result.warnings.is_empty() {
            result.errors.append(&mut result.warnings);
        }

        result
    }

    fn validate_conditional_fields(&self, record: &FocusRecord, result: &mut ValidationResult) {
        if record.account.sub_account_name.is_some() && record.account.sub_account_id.is_none() {
            result.error("SubAccountName", "SubAccountName requires SubAccountId");
        }
        if record.charge.pricing_unit.is_some() && record.charge.pricing_quantity.is_none() {
            result.error("PricingUnit", "PricingUnit requires PricingQuantity");
        }
        if record.resource.resource_name.is_some() && record.resource.resource_id.is_none() {
            result.error("ResourceName", "ResourceName requires ResourceId");
        }
        if record.resource.resource_type.is_some() && record.resource.resource_id.is_none() {
            result.error("ResourceType", "ResourceType requires ResourceId");
        }
        if record.location.region_name.is_some() && record.location.region_id.is_none() {
            result.error("RegionName", "RegionName requires RegionId");
        }
        if record.usage.consumed_unit.is_some() && record.usage.consumed_quantity.is_none() {
            result.error("ConsumedUnit", "ConsumedUnit requires ConsumedQuantity");
        }
    }

    fn validate_time_periods(&self, record: &FocusRecord, now: Timestamp, result: &mut ValidationResult) {
        let period = &record.period;
        if period.billing_period_start >= period.billing_period_end {
            result.error("BillingPeriod", "BillingPeriodEnd must be after BillingPeriodStart");
        }
        if period.charge_period_start >= period.charge_period_end {
            result.error("ChargePeriod", "ChargePeriodEnd must be after ChargePeriodStart");
        }
        if period.charge_period_start < period.billing_period_start {
            result.warning("ChargePeriod", "ChargePeriodStart is before BillingPeriodStart");
        }
        if period.charge_period_end > period.billing_period_end {
            result.warning("ChargePeriod", "ChargePeriodEnd is after BillingPeriodEnd");
        }
        if period.billing_period_end > now {
            result.warning("BillingPeriod", "BillingPeriodEnd is in the future");
        }
        if period.charge_period_end > now {
            result.warning("ChargePeriod", "ChargePeriodEnd is in the future");
        }
    }

    fn validate_costs(&self, record: &FocusRecord, result: &mut ValidationResult) {
        let cost = &record.cost;
        if cost.effective_cost > cost.list_cost {
            result.warning("Costs", "EffectiveCost is greater than ListCost");
        }
        if cost.contracted_cost > cost.list_cost {
            result.warning("Costs", "ContractedCost is greater than ListCost");
        }
        for (field, value) in [
            ("BilledCost", &cost.billed_cost),
            ("EffectiveCost", &cost.effective_cost),
            ("ListCost", &cost.list_cost),
            ("ContractedCost", &cost.contracted_cost),
        ] {
            if value < &BigDecimal::zero() {
                result.warning(field, format!("{field} is negative: {value}"));
            }
        }
    }

    fn validate_relationships(&self, record: &FocusRecord, result: &mut ValidationResult) {
        if let Some(pricing_quantity) = &record.charge.pricing_quantity {
            if pricing_quantity > &BigDecimal::zero() && record.cost.list_cost.is_zero() {
                result.warning("Pricing", "PricingQuantity > 0 but ListCost is 0");
            }
        }
        if let (Some(consumed), Some(pricing)) = (&record.usage.consumed_quantity, &record.charge.pricing_quantity) {
            if consumed > pricing {
                result.info("Usage", "ConsumedQuantity exceeds PricingQuantity");
            }
        }
    }

    pub fn validate_batch(&self, records: &[FocusRecord], now: Timestamp) -> ComplianceSummary {
        const MAX_DETAILS: usize = 10;

        let mut summary = ComplianceSummary { total_records: records.len(), ..Default::default() };
        for record in records {
            let result = self.validate_record(record, now);
            if result.is_valid() {
                summary.valid_records += 1;
            }
            summary.total_errors += result.errors.len();
            summary.total_warnings += result.warnings.len();

            if !result.is_valid() || result.has_warnings() {
                if summary.details.len() < MAX_DETAILS {
                    summary.details.push(RecordValidation { record_id: record.id, result });
                } else {
                    summary.dropped_details += 1;
                }
            }
        }
        summary.truncated = summary.dropped_details > 0;
        summary
    }
}

/// One flagged record's validation outcome, kept for a
/// [`ComplianceSummary`]'s bounded detail list.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecordValidation {
    pub record_id: uuid::Uuid,
    pub result: ValidationResult,
}

/// Aggregate validation outcome for a batch, with a bounded, not an
/// exhaustive, per-record detail list — large batches would otherwise make
/// the summary itself unbounded.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ComplianceSummary {
    pub total_records: usize,
    pub valid_records: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub details: Vec<RecordValidation>,
    /// Number of flagged records omitted from `details` once the cap was hit.
    pub dropped_details: usize,
    /// True iff `dropped_details > 0`, so callers don't have to compare.
    pub truncated: bool,
}

impl ComplianceSummary {
    pub fn compliance_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.valid_records as f64 / self.total_records as f64 * 100.0
        }
    }
}
