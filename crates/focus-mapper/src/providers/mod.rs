//! Per-provider [`focus_registry::FocusMapper`] implementations.

pub mod aws;
pub mod azure;
pub mod gcp;
pub mod openai;

pub use aws::AwsMapper;
pub use azure::AzureMapper;
pub use gcp::GcpMapper;
pub use openai::{ModelPricing, OpenAiMapper, PricingTable};
