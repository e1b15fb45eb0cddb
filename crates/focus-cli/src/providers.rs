//! Built-in provider type registrations.
//!
//! Each provider type pairs one declarative [`ProviderMetadata`], one
//! [`SourceDescriptor`] translating a provider row's `params` into concrete
//! [`SourceSpec`]s, and the matching extractor/mapper from `focus-extract`/
//! `focus-mapper`. REST and filesystem extractors are provider-agnostic and
//! stateless, so one instance is shared across every provider of that type;
//! a BigQuery-via-SQL extractor, supplied by the caller, is the exception
//! (see `register_builtin`'s doc comment).

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::Value;

use focus_core::auth::AuthMethod;
use focus_core::error::{Error, Result};
use focus_core::provider_entity::ProviderEntity;
use focus_extract::{FilesystemExtractor, RestApiExtractor, RestClientConfig};
use focus_mapper::{AwsMapper, AzureMapper, GcpMapper, ModelPricing, OpenAiMapper, PricingTable};
use focus_registry::source::{Compression, FileFormat, HttpMethod, PaginationPolicy, SourceConfig};
use focus_registry::{Extractor, FieldDescriptor, ProviderMetadata, ProviderRegistry, SourceDescriptor, SourceSpec};

fn deserialize_params<T: for<'de> Deserialize<'de>>(provider: &ProviderEntity) -> Result<T> {
    serde_json::from_value(provider.params.clone())
        .map_err(|err| Error::config_invalid(format!("{}: invalid params: {err}", provider.type_tag)))
}

// ---------------------------------------------------------------------
// OpenAI: REST usage API, priced per model from a static pricing table.
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OpenAiParams {
    #[serde(default = "default_openai_endpoint_path")]
    endpoint_path: String,
    #[serde(default = "default_openai_selector")]
    response_selector: String,
}

fn default_openai_endpoint_path() -> String {
    "/v1/organization/usage/completions".to_string()
}

fn default_openai_selector() -> String {
    "/data".to_string()
}

struct OpenAiSource;

impl SourceDescriptor for OpenAiSource {
    fn describe(&self, provider: &ProviderEntity) -> Result<Vec<SourceSpec>> {
        let params: OpenAiParams = deserialize_params(provider)?;
        let spec = SourceSpec::new(
            "usage",
            SourceConfig::RestApi {
                endpoint_path: params.endpoint_path,
                method: HttpMethod::Get,
                query_params: Value::Null,
                response_selector: params.response_selector,
                pagination: PaginationPolicy::Cursor { cursor_field: "next_page".into(), cursor_param: "page".into() },
                primary_key_fields: vec!["model".into(), "bucket_start_time".into()],
            },
        );
        spec.validate()?;
        Ok(vec![spec])
    }
}

/// A small seed pricing table covering the models the scenario fixtures
/// exercise. A real deployment would load this from the same config bag
/// as everything else; this crate has no config source for it yet, so a
/// static table is the pragmatic placeholder (documented in DESIGN.md).
fn default_openai_pricing() -> PricingTable {
    let mut models = HashMap::new();
    models.insert(
        "gpt-4o".to_string(),
        ModelPricing {
            input_per_1k: BigDecimal::from_str("0.005").expect("static literal parses"),
            output_per_1k: BigDecimal::from_str("0.015").expect("static literal parses"),
            unit_price: BigDecimal::from_str("0.01").expect("static literal parses"),
        },
    );
    models.insert(
        "gpt-4o-mini".to_string(),
        ModelPricing {
            input_per_1k: BigDecimal::from_str("0.00015").expect("static literal parses"),
            output_per_1k: BigDecimal::from_str("0.0006").expect("static literal parses"),
            unit_price: BigDecimal::from_str("0.002").expect("static literal parses"),
        },
    );
    PricingTable::new(models)
}

fn openai_metadata() -> ProviderMetadata {
    ProviderMetadata {
        type_tag: "openai".into(),
        display_name: "OpenAI".into(),
        description: "OpenAI organization usage and cost API".into(),
        supported_auth_methods: vec![AuthMethod::BearerToken, AuthMethod::ApiKey],
        default_auth_method: AuthMethod::BearerToken,
        default_source_type: "rest_api".into(),
        required_config: vec![],
        optional_config: vec!["endpoint_path".into(), "response_selector".into()],
        fields: vec![FieldDescriptor {
            name: "endpoint_path".into(),
            description: "Usage endpoint path, relative to api.openai.com".into(),
            required: false,
            field_type: "string".into(),
            placeholder: Some(default_openai_endpoint_path()),
        }],
    }
}

// ---------------------------------------------------------------------
// AWS: Cost and Usage Report 2.0, parquet export on S3.
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AwsParams {
    bucket: String,
    #[serde(default)]
    prefix: String,
    #[serde(default = "default_cur_glob")]
    glob: String,
}

fn default_cur_glob() -> String {
    "*.parquet".to_string()
}

struct AwsSource;

impl SourceDescriptor for AwsSource {
    fn describe(&self, provider: &ProviderEntity) -> Result<Vec<SourceSpec>> {
        let params: AwsParams = deserialize_params(provider)?;
        let url = format!("s3://{}/{}", params.bucket, params.prefix.trim_matches('/'));
        let spec = SourceSpec::new(
            "cur-export",
            SourceConfig::Filesystem {
                url,
                glob: params.glob,
                format: FileFormat::Parquet,
                compression: Compression::Snappy,
                date_column: "lineItem/UsageStartDate".into(),
            },
        );
        spec.validate()?;
        Ok(vec![spec])
    }
}

fn aws_metadata() -> ProviderMetadata {
    ProviderMetadata {
        type_tag: "aws".into(),
        display_name: "AWS Cost and Usage Report".into(),
        description: "AWS CUR 2.0 parquet export on S3".into(),
        supported_auth_methods: vec![AuthMethod::Custom, AuthMethod::DefaultCredentials],
        default_auth_method: AuthMethod::Custom,
        default_source_type: "filesystem".into(),
        required_config: vec!["bucket".into()],
        optional_config: vec!["prefix".into(), "glob".into()],
        fields: vec![
            FieldDescriptor { name: "bucket".into(), description: "S3 bucket holding the CUR export".into(), required: true, field_type: "string".into(), placeholder: None },
            FieldDescriptor { name: "prefix".into(), description: "Key prefix under the bucket".into(), required: false, field_type: "string".into(), placeholder: None },
        ],
    }
}

// ---------------------------------------------------------------------
// Azure: Cost Management export, CSV on blob storage.
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AzureParams {
    container: String,
    #[serde(default)]
    prefix: String,
    #[serde(default = "default_azure_glob")]
    glob: String,
}

fn default_azure_glob() -> String {
    "*.csv.gz".to_string()
}

struct AzureSource;

impl SourceDescriptor for AzureSource {
    fn describe(&self, provider: &ProviderEntity) -> Result<Vec<SourceSpec>> {
        let params: AzureParams = deserialize_params(provider)?;
        let url = format!("az://{}/{}", params.container, params.prefix.trim_matches('/'));
        let spec = SourceSpec::new(
            "cost-export",
            SourceConfig::Filesystem {
                url,
                glob: params.glob,
                format: FileFormat::Csv,
                compression: Compression::Gzip,
                date_column: "ChargePeriodStart".into(),
            },
        );
        spec.validate()?;
        Ok(vec![spec])
    }
}

fn azure_metadata() -> ProviderMetadata {
    ProviderMetadata {
        type_tag: "azure".into(),
        display_name: "Azure Cost Management".into(),
        description: "Azure Cost Management scheduled export, FOCUS-shaped CSV".into(),
        supported_auth_methods: vec![AuthMethod::Custom, AuthMethod::ManagedIdentity],
        default_auth_method: AuthMethod::Custom,
        default_source_type: "filesystem".into(),
        required_config: vec!["container".into()],
        optional_config: vec!["prefix".into(), "glob".into()],
        fields: vec![
            FieldDescriptor { name: "container".into(), description: "Blob container holding the export".into(), required: true, field_type: "string".into(), placeholder: None },
            FieldDescriptor { name: "prefix".into(), description: "Blob path prefix".into(), required: false, field_type: "string".into(), placeholder: None },
        ],
    }
}

// ---------------------------------------------------------------------
// GCP: BigQuery detailed billing export, read via the SQL extractor.
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GcpParams {
    table: String,
    #[serde(default = "default_gcp_chunk_size")]
    chunk_size: u32,
}

fn default_gcp_chunk_size() -> u32 {
    1000
}

struct GcpSource;

impl SourceDescriptor for GcpSource {
    fn describe(&self, provider: &ProviderEntity) -> Result<Vec<SourceSpec>> {
        let params: GcpParams = deserialize_params(provider)?;
        let spec = SourceSpec::new(
            "billing-export",
            SourceConfig::SqlDatabase {
                query_template: "select * from {table} where usage_start_time >= {start} and usage_start_time < {end}".into(),
                table: params.table,
                chunk_size: params.chunk_size,
            },
        );
        spec.validate()?;
        Ok(vec![spec])
    }
}

fn gcp_metadata() -> ProviderMetadata {
    ProviderMetadata {
        type_tag: "gcp".into(),
        display_name: "Google Cloud Billing".into(),
        description: "GCP detailed billing export, queried from BigQuery".into(),
        supported_auth_methods: vec![AuthMethod::ServiceAccount, AuthMethod::DefaultCredentials],
        default_auth_method: AuthMethod::ServiceAccount,
        default_source_type: "sql_database".into(),
        required_config: vec!["table".into()],
        optional_config: vec!["chunk_size".into()],
        fields: vec![FieldDescriptor {
            name: "table".into(),
            description: "gcp_billing_export_v1_* table name".into(),
            required: true,
            field_type: "string".into(),
            placeholder: None,
        }],
    }
}

/// Registers every built-in provider type against `registry`.
///
/// `gcp_extractor` is supplied by the caller rather than built here because
/// [`focus_extract::sql::SqlDatabaseExtractor::connect`] is async and binds
/// one live connection at construction time; every `gcp`-typed provider in
/// this process shares that one warehouse connection (see DESIGN.md).
/// Pass `None` to skip registering the `gcp` type (e.g. when no warehouse
/// URL is configured).
pub fn register_builtin(registry: &ProviderRegistry, gcp_extractor: Option<Arc<dyn Extractor>>) -> Result<()> {
    let openai_extractor = Arc::new(RestApiExtractor::new(RestClientConfig::new("https://api.openai.com"))?);
    registry.register(openai_metadata(), Arc::new(OpenAiSource), openai_extractor, Arc::new(OpenAiMapper::new(default_openai_pricing())));

    let fs_extractor: Arc<dyn Extractor> = Arc::new(FilesystemExtractor::new());
    registry.register(aws_metadata(), Arc::new(AwsSource), fs_extractor.clone(), Arc::new(AwsMapper::new()));
    registry.register(azure_metadata(), Arc::new(AzureSource), fs_extractor, Arc::new(AzureMapper::new()));

    if let Some(extractor) = gcp_extractor {
        registry.register(gcp_metadata(), Arc::new(GcpSource), extractor, Arc::new(GcpMapper::new()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use focus_core::provider_entity::LastSyncStatus;
    use uuid::Uuid;

    use super::*;

    fn sample_provider(type_tag: &str, params: Value) -> ProviderEntity {
        ProviderEntity {
            id: Uuid::new_v4(),
            name: "test".into(),
            type_tag: type_tag.into(),
            display_name: "test".into(),
            endpoint: None,
            params,
            additional_config: Value::Null,
            auth: Value::Null,
            active: true,
            validated: true,
            last_synced_at: None,
            last_sync_status: LastSyncStatus::Never,
        }
    }

    #[test]
    fn test_openai_source_uses_defaults_when_params_empty() {
        let provider = sample_provider("openai", serde_json::json!({}));
        let specs = OpenAiSource.describe(&provider).unwrap();
        assert_eq!(specs.len(), 1);
        match &specs[0].config {
            SourceConfig::RestApi { endpoint_path, .. } => assert_eq!(endpoint_path, &default_openai_endpoint_path()),
            _ => panic!("expected rest_api"),
        }
    }

    #[test]
    fn test_aws_source_requires_bucket() {
        let provider = sample_provider("aws", serde_json::json!({}));
        assert!(AwsSource.describe(&provider).is_err());
    }

    #[test]
    fn test_aws_source_builds_s3_url() {
        let provider = sample_provider("aws", serde_json::json!({"bucket": "acme-cur", "prefix": "/exports/"}));
        let specs = AwsSource.describe(&provider).unwrap();
        match &specs[0].config {
            SourceConfig::Filesystem { url, .. } => assert_eq!(url, "s3://acme-cur/exports"),
            _ => panic!("expected filesystem"),
        }
    }

    #[test]
    fn test_gcp_source_builds_sql_spec() {
        let provider = sample_provider("gcp", serde_json::json!({"table": "gcp_billing_export_v1_ABC"}));
        let specs = GcpSource.describe(&provider).unwrap();
        match &specs[0].config {
            SourceConfig::SqlDatabase { table, chunk_size, .. } => {
                assert_eq!(table, "gcp_billing_export_v1_ABC");
                assert_eq!(*chunk_size, default_gcp_chunk_size());
            }
            _ => panic!("expected sql_database"),
        }
    }

    #[test]
    fn test_register_builtin_without_gcp_extractor() {
        let registry = ProviderRegistry::new();
        register_builtin(&registry, None).unwrap();
        let tags = registry.type_tags();
        assert!(tags.contains(&"openai".to_string()));
        assert!(tags.contains(&"aws".to_string()));
        assert!(tags.contains(&"azure".to_string()));
        assert!(!tags.contains(&"gcp".to_string()));
    }
}
