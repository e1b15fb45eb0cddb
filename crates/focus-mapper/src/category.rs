//! Known service-category aliases.
//!
//! Provider billing APIs use their own category vocabularies (AWS's
//! `serviceCode` families, Azure's `MeterCategory`, GCP's `service.description`,
//! OpenAI's product lines). `resolve` maps the aliases this crate's provider
//! mappers actually encounter onto [`ServiceCategory`]; anything unrecognized
//! falls back to `ServiceCategory::Other` rather than erroring, since FOCUS
//! 1.2 treats category as best-effort classification, not a mandatory-value
//! validation target.

use focus_core::focus::ServiceCategory;

const ALIASES: &[(&str, ServiceCategory)] = &[
    ("chat", ServiceCategory::AiAndMachineLearning),
    ("completions", ServiceCategory::AiAndMachineLearning),
    ("embeddings", ServiceCategory::AiAndMachineLearning),
    ("fine-tuning", ServiceCategory::AiAndMachineLearning),
    ("fine_tuning", ServiceCategory::AiAndMachineLearning),
    ("images", ServiceCategory::AiAndMachineLearning),
    ("audio", ServiceCategory::AiAndMachineLearning),
    ("moderation", ServiceCategory::AiAndMachineLearning),
    ("assistants", ServiceCategory::AiAndMachineLearning),
    ("tokens", ServiceCategory::AiAndMachineLearning),
    ("ec2", ServiceCategory::Compute),
    ("lambda", ServiceCategory::Compute),
    ("ecs", ServiceCategory::Compute),
    ("virtual machines", ServiceCategory::Compute),
    ("compute engine", ServiceCategory::Compute),
    ("app service", ServiceCategory::Compute),
    ("cloud functions", ServiceCategory::Compute),
    ("s3", ServiceCategory::Storage),
    ("ebs", ServiceCategory::Storage),
    ("blob storage", ServiceCategory::Storage),
    ("cloud storage", ServiceCategory::Storage),
    ("storage", ServiceCategory::Storage),
    ("rds", ServiceCategory::Databases),
    ("dynamodb", ServiceCategory::Databases),
    ("cosmos db", ServiceCategory::Databases),
    ("cloud sql", ServiceCategory::Databases),
    ("bigquery", ServiceCategory::Analytics),
    ("redshift", ServiceCategory::Analytics),
    ("synapse analytics", ServiceCategory::Analytics),
    ("vpc", ServiceCategory::Networking),
    ("virtual network", ServiceCategory::Networking),
    ("cloudfront", ServiceCategory::Networking),
    ("load balancing", ServiceCategory::Networking),
    ("iam", ServiceCategory::SecurityIdentityAndCompliance),
    ("key vault", ServiceCategory::SecurityIdentityAndCompliance),
    ("security command center", ServiceCategory::SecurityIdentityAndCompliance),
    ("cloudwatch", ServiceCategory::ManagementAndGovernance),
    ("azure monitor", ServiceCategory::ManagementAndGovernance),
    ("cloud monitoring", ServiceCategory::ManagementAndGovernance),
    ("codebuild", ServiceCategory::DeveloperTools),
    ("devops", ServiceCategory::DeveloperTools),
    ("cloud build", ServiceCategory::DeveloperTools),
];

/// Resolves a provider-native category string (case-insensitive, trimmed) to
/// a FOCUS service category, falling back to `Other`.
pub fn resolve(native_category: &str) -> ServiceCategory {
    let needle = native_category.trim().to_ascii_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == needle)
        .map(|(_, category)| *category)
        .unwrap_or(ServiceCategory::Other)
}
