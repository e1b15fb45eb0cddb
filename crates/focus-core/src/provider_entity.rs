//! The persisted provider entity: one row per configured integration.
//!
//! A [`ProviderEntity`] names which plugin (`type_tag`) handles it, carries
//! that plugin's non-sensitive parameters and (encrypted, opaque to this
//! type) credential string, and is the unit the run coordinator triggers
//! syncs against.

use jiff::Timestamp;
use serde_json::Value;
use uuid::Uuid;

/// Outcome of the most recent sync attempt, surfaced on the provider row so
/// a dashboard can show sync health without joining to `pipeline_runs`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LastSyncStatus {
    #[default]
    Never,
    Succeeded,
    Failed,
    Cancelled,
}

/// A configured provider integration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProviderEntity {
    pub id: Uuid,
    pub name: String,
    /// Plugin lookup key, e.g. `"openai"`, `"aws_cur"`, `"azure_cost_management"`.
    pub type_tag: String,
    pub display_name: String,
    /// Base endpoint for REST-sourced providers; absent for filesystem/SQL ones.
    pub endpoint: Option<String>,
    /// Non-sensitive, plugin-specific configuration (bucket name, table, model, ...).
    pub params: Value,
    /// Provider-specific knobs that don't fit `params`'s typed shape, kept
    /// as an explicit open bag rather than widening `params` itself.
    pub additional_config: Value,
    /// The provider's [`crate::auth::AuthConfig`] serialized to JSON, with
    /// any sensitive leaves passed through [`crate::crypto::encrypt_str`]
    /// before this value is persisted.
    pub auth: Value,
    /// Soft-delete flag. A provider with `active = false` is excluded from
    /// scheduled triggers but its history is retained.
    pub active: bool,
    /// Set once the auth resolver has successfully validated `auth` against
    /// the provider type's supported methods. Cleared whenever `auth`
    /// changes, forcing re-validation before the next sync.
    pub validated: bool,
    pub last_synced_at: Option<Timestamp>,
    pub last_sync_status: LastSyncStatus,
}

impl ProviderEntity {
    /// Structural validation a provider row must pass regardless of plugin:
    /// non-empty name and type tag.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::error::Error::config_invalid("provider name must not be empty"));
        }
        if self.type_tag.trim().is_empty() {
            return Err(crate::error::Error::config_invalid("provider type_tag must not be empty"));
        }
        Ok(())
    }

    /// Marks this provider's auth as unvalidated, e.g. after an auth config
    /// update; the next trigger must re-resolve it before extraction starts.
    pub fn invalidate_auth(&mut self) {
        self.validated = false;
    }

    /// Records the outcome of a completed sync.
    pub fn record_sync(&mut self, status: LastSyncStatus, at: Timestamp) {
        self.last_sync_status = status;
        self.last_synced_at = Some(at);
    }
}
