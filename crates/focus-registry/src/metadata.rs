//! Declarative provider-type metadata.
//!
//! A [`ProviderMetadata`] value is what a plugin hands to [`crate::ProviderRegistry::register`]
//! alongside its factories. It never drives behavior on its own; the auth
//! resolver and the CLI / (future) admin surfaces read it to validate
//! configuration and render forms.

use std::collections::HashMap;

use focus_core::auth::AuthMethod;
use serde::{Deserialize, Serialize};

/// A single configuration field a provider type accepts, described for
/// both validation (`required`) and UI rendering (the rest). Descriptive
/// only: the core never enforces `field_type`/`placeholder` itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub description: String,
    pub required: bool,
    #[serde(default = "default_field_type")]
    pub field_type: String,
    #[serde(default)]
    pub placeholder: Option<String>,
}

fn default_field_type() -> String {
    "string".to_string()
}

/// Declarative metadata for one registered provider type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub type_tag: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Auth methods this provider type accepts; the auth resolver rejects
    /// any `AuthConfig::method()` outside this set.
    pub supported_auth_methods: Vec<AuthMethod>,
    pub default_auth_method: AuthMethod,
    /// The source-type tag ("rest_api" | "filesystem" | "sql_database")
    /// used when a provider's source descriptor doesn't name one explicitly.
    pub default_source_type: String,
    #[serde(default)]
    pub required_config: Vec<String>,
    #[serde(default)]
    pub optional_config: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl ProviderMetadata {
    /// Returns whether `method` is in this provider type's supported set.
    pub fn supports_auth_method(&self, method: AuthMethod) -> bool {
        self.supported_auth_methods.contains(&method)
    }

    /// Validates `params` (a provider's non-sensitive config bag) has every
    /// key in `required_config`.
    pub fn missing_required_keys(&self, params: &HashMap<String, serde_json::Value>) -> Vec<String> {
        self.required_config
            .iter()
            .filter(|key| !params.contains_key(key.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProviderMetadata {
        ProviderMetadata {
            type_tag: "openai".into(),
            display_name: "OpenAI".into(),
            description: "OpenAI usage and cost API".into(),
            supported_auth_methods: vec![AuthMethod::BearerToken, AuthMethod::ApiKey],
            default_auth_method: AuthMethod::BearerToken,
            default_source_type: "rest_api".into(),
            required_config: vec!["organization_id".into()],
            optional_config: vec![],
            fields: vec![],
        }
    }

    #[test]
    fn test_supports_auth_method() {
        let meta = sample();
        assert!(meta.supports_auth_method(AuthMethod::BearerToken));
        assert!(!meta.supports_auth_method(AuthMethod::Certificate));
    }

    #[test]
    fn test_missing_required_keys() {
        let meta = sample();
        let params = HashMap::new();
        assert_eq!(meta.missing_required_keys(&params), vec!["organization_id".to_string()]);
    }
}
