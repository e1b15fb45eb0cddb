#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod category;
pub mod providers;
pub mod validator;

pub use providers::{AwsMapper, AzureMapper, GcpMapper, ModelPricing, OpenAiMapper, PricingTable};
pub use validator::{ComplianceSummary, FocusValidator, RecordValidation, Severity, ValidationIssue, ValidationResult};
