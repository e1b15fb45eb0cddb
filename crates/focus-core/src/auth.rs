//! Generic authentication configuration for provider integrations.
//!
//! Every provider declares, in its registered metadata, which [`AuthMethod`]
//! variants it supports. A concrete [`AuthConfig`] is validated against that
//! set by the auth resolver in `focus-registry`; this module only knows how
//! to parse, structurally validate, and walk a single config for sensitive
//! fields.
//!
//! Unlike some looser auth-config designs, an [`AuthConfig`] whose `method`
//! does not match any known variant is a hard [`crate::ErrorKind::UnsupportedAuthMethod`]
//! error rather than falling back to a generic "custom" bucket.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Authentication methods a provider may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthMethod {
    ApiKey,
    BearerToken,
    Basic,
    Oauth2ClientCredentials,
    Oauth2AuthorizationCode,
    ServiceAccount,
    Certificate,
    ManagedIdentity,
    DefaultCredentials,
    CredentialsFile,
    MultiFactor,
    Custom,
}

/// A fully structured authentication configuration.
///
/// `method` drives which variant this deserializes into; unknown top-level
/// keys for a known variant are rejected rather than silently retained
/// (`deny_unknown_fields`), matching the rest of the pipeline's preference
/// for typed configuration over open config bags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AuthConfig {
    ApiKey(ApiKeyAuth),
    BearerToken(BearerTokenAuth),
    Basic(BasicAuth),
    Oauth2ClientCredentials(OAuth2ClientCredentialsAuth),
    Oauth2AuthorizationCode(OAuth2AuthorizationCodeAuth),
    ServiceAccount(ServiceAccountAuth),
    Certificate(CertificateAuth),
    ManagedIdentity(ManagedIdentityAuth),
    DefaultCredentials(DefaultCredentialsAuth),
    CredentialsFile(CredentialsFileAuth),
    MultiFactor(MultiFactorAuth),
    Custom(CustomAuth),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKeyAuth {
    pub key: String,
    #[serde(default = "default_api_key_header")]
    pub header_name: String,
    #[serde(default)]
    pub prefix: String,
}

fn default_api_key_header() -> String {
    "X-API-Key".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BearerTokenAuth {
    pub token: String,
    #[serde(default = "default_bearer_header")]
    pub header_name: String,
    #[serde(default = "default_bearer_prefix")]
    pub prefix: String,
}

fn default_bearer_header() -> String {
    "Authorization".to_string()
}

fn default_bearer_prefix() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OAuth2ClientCredentialsAuth {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub additional_params: HashMap<String, Value>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OAuth2AuthorizationCodeAuth {
    pub client_id: String,
    pub client_secret: String,
    pub authorization_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceAccountAuth {
    pub credentials: HashMap<String, Value>,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertificateAuth {
    #[serde(default)]
    pub cert_content: Option<String>,
    #[serde(default)]
    pub cert_path: Option<String>,
    #[serde(default)]
    pub key_content: Option<String>,
    #[serde(default)]
    pub key_path: Option<String>,
    #[serde(default)]
    pub ca_cert_content: Option<String>,
    #[serde(default)]
    pub ca_cert_path: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagedIdentityAuth {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultCredentialsAuth {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsFileAuth {
    pub file_path: String,
    #[serde(default)]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MultiFactorAuth {
    pub primary: Box<AuthConfig>,
    #[serde(default)]
    pub secondary: Option<Box<AuthConfig>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomAuth {
    pub auth_type: String,
    #[serde(default)]
    pub config: HashMap<String, Value>,
}

/// Substrings that mark a config field name as holding sensitive data.
pub const SENSITIVE_FIELD_PATTERNS: &[&str] = &[
    "key",
    "secret",
    "password",
    "token",
    "private_key",
    "passphrase",
    "credentials",
    "cert_content",
    "key_content",
];

/// Returns true if `field_name` (case-insensitively) looks like it holds
/// sensitive data, per [`SENSITIVE_FIELD_PATTERNS`].
pub fn is_sensitive_field(field_name: &str) -> bool {
    let lower = field_name.to_lowercase();
    SENSITIVE_FIELD_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

impl AuthConfig {
    /// Returns the [`AuthMethod`] this configuration was constructed as.
    pub fn method(&self) -> AuthMethod {
        match self {
            AuthConfig::ApiKey(_) => AuthMethod::ApiKey,
            AuthConfig::BearerToken(_) => AuthMethod::BearerToken,
            AuthConfig::Basic(_) => AuthMethod::Basic,
            AuthConfig::Oauth2ClientCredentials(_) => AuthMethod::Oauth2ClientCredentials,
            AuthConfig::Oauth2AuthorizationCode(_) => AuthMethod::Oauth2AuthorizationCode,
            AuthConfig::ServiceAccount(_) => AuthMethod::ServiceAccount,
            AuthConfig::Certificate(_) => AuthMethod::Certificate,
            AuthConfig::ManagedIdentity(_) => AuthMethod::ManagedIdentity,
            AuthConfig::DefaultCredentials(_) => AuthMethod::DefaultCredentials,
            AuthConfig::CredentialsFile(_) => AuthMethod::CredentialsFile,
            AuthConfig::MultiFactor(_) => AuthMethod::MultiFactor,
            AuthConfig::Custom(_) => AuthMethod::Custom,
        }
    }

    /// Structural validation beyond what serde's `deny_unknown_fields`
    /// already enforces: cross-field requirements that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        match self {
            AuthConfig::Certificate(cert) => {
                let has_cert = cert.cert_content.is_some() || cert.cert_path.is_some();
                let has_key = cert.key_content.is_some() || cert.key_path.is_some();
                if !has_cert {
                    return Err(Error::missing_auth_field("cert_content or cert_path"));
                }
                if !has_key {
                    return Err(Error::missing_auth_field("key_content or key_path"));
                }
                Ok(())
            }
            AuthConfig::MultiFactor(mfa) => {
                mfa.primary.validate()?;
                if let Some(secondary) = &mfa.secondary {
                    secondary.validate()?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Walks this config (including nested multi-factor branches) and
    /// returns the dotted field paths that look sensitive.
    pub fn sensitive_fields(&self) -> Vec<String> {
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        let mut found = Vec::new();
        walk_sensitive(&value, "", &mut found);
        found
    }
}

fn walk_sensitive(value: &Value, prefix: &str, found: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                if is_sensitive_field(key) {
                    found.push(path.clone());
                }
                walk_sensitive(inner, &path, found);
            }
        }
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                let path = format!("{prefix}[{idx}]");
                walk_sensitive(item, &path, found);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_deserializes() {
        let json = serde_json::json!({
            "method": "api_key",
            "key": "sk-abc123",
        });
        let config: AuthConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.method(), AuthMethod::ApiKey);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_method_rejected() {
        let json = serde_json::json!({
            "method": "smoke_signal",
            "key": "value",
        });
        let result: std::result::Result<AuthConfig, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_certificate_requires_cert_and_key() {
        let cert_only = AuthConfig::Certificate(CertificateAuth {
            cert_content: Some("pem".into()),
            cert_path: None,
            key_content: None,
            key_path: None,
            ca_cert_content: None,
            ca_cert_path: None,
            passphrase: None,
        });
        assert!(cert_only.validate().is_err());

        let both = AuthConfig::Certificate(CertificateAuth {
            cert_content: Some("pem".into()),
            cert_path: None,
            key_content: Some("key-pem".into()),
            key_path: None,
            ca_cert_content: None,
            ca_cert_path: None,
            passphrase: None,
        });
        assert!(both.validate().is_ok());
    }

    #[test]
    fn test_multi_factor_validates_branches() {
        let bad_primary = AuthConfig::MultiFactor(MultiFactorAuth {
            primary: Box::new(AuthConfig::Certificate(CertificateAuth {
                cert_content: None,
                cert_path: None,
                key_content: None,
                key_path: None,
                ca_cert_content: None,
                ca_cert_path: None,
                passphrase: None,
            })),
            secondary: None,
        });
        assert!(bad_primary.validate().is_err());
    }

    #[test]
    fn test_sensitive_fields_found() {
        let config = AuthConfig::BearerToken(BearerTokenAuth {
            token: "secret-token".into(),
            header_name: "Authorization".into(),
            prefix: "Bearer".into(),
        });
        let sensitive = config.sensitive_fields();
        assert!(sensitive.contains(&"token".to_string()));
    }

    #[test]
    fn test_is_sensitive_field_case_insensitive() {
        assert!(is_sensitive_field("API_KEY"));
        assert!(is_sensitive_field("ClientSecret"));
        assert!(!is_sensitive_field("header_name"));
    }
}
