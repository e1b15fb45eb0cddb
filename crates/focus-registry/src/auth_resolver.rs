//! Auth resolver.
//!
//! Validates a raw auth configuration against a provider type's metadata
//! and produces a [`ResolvedAuth`]: a typed `AuthConfig` plus the sensitive
//! field paths the surrounding encryption collaborator needs to know about.
//! Resolution never talks to a provider; it is pure structural validation.

use focus_core::auth::AuthConfig;
use focus_core::error::{Error, Result};

use crate::metadata::ProviderMetadata;

/// A validated auth configuration, bound to the provider type it was
/// resolved against.
#[derive(Debug, Clone)]
pub struct ResolvedAuth {
    pub config: AuthConfig,
    /// Dotted paths into `config`'s JSON form that hold sensitive data,
    /// precomputed once at resolution time for the encryption collaborator.
    pub sensitive_paths: Vec<String>,
}

impl ResolvedAuth {
    /// Returns the `Authorization`-style header value for methods that
    /// carry one, or `None` for methods resolved at use time (managed
    /// identity, default credentials) or methods with no single header
    /// (OAuth2 flows resolve a token separately).
    pub fn header(&self) -> Option<(String, String)> {
        match &self.config {
            AuthConfig::ApiKey(api_key) => {
                let value = if api_key.prefix.is_empty() {
                    api_key.key.clone()
                } else {
                    format!("{} {}", api_key.prefix, api_key.key)
                };
                Some((api_key.header_name.clone(), value))
            }
            AuthConfig::BearerToken(bearer) => {
                Some((bearer.header_name.clone(), format!("{} {}", bearer.prefix, bearer.token)))
            }
            _ => None,
        }
    }
}

/// Resolves and validates `raw` against `metadata`'s supported auth methods.
///
/// - `method` must be present and belong to `metadata.supported_auth_methods`.
/// - Per-variant required fields are enforced by `AuthConfig`'s own
///   `deny_unknown_fields`/required-field deserialization.
/// - Cross-field requirements (certificate cert+key, multi-factor branches)
///   are checked by [`AuthConfig::validate`].
/// - Unknown methods are rejected outright rather than silently falling
///   back to a generic method.
pub fn resolve(metadata: &ProviderMetadata, raw: serde_json::Value) -> Result<ResolvedAuth> {
    let config: AuthConfig = serde_json::from_value(raw).map_err(|err| {
        Error::config_invalid(format!("invalid auth configuration: {err}"))
    })?;

    if !metadata.supports_auth_method(config.method()) {
        return Err(Error::unsupported_auth_method(config.method()));
    }

    config.validate()?;

    let sensitive_paths = config.sensitive_fields();
    Ok(ResolvedAuth { config, sensitive_paths })
}
