//! Provider persistence row. Conversion to/from `focus_core::provider_entity::ProviderEntity`
//! happens only here, at the loader boundary.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use focus_core::provider_entity::ProviderEntity;
use crate::schema::providers;
use crate::types::DbLastSyncStatus;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = providers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
    pub type_tag: String,
    pub display_name: String,
    pub endpoint: Option<String>,
    pub params: serde_json::Value,
    pub additional_config: serde_json::Value,
    pub auth: serde_json::Value,
    pub active: bool,
    pub validated: bool,
    pub last_synced_at: Option<Timestamp>,
    pub last_sync_status: DbLastSyncStatus,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = providers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewProvider {
    pub id: Uuid,
    pub name: String,
    pub type_tag: String,
    pub display_name: String,
    pub endpoint: Option<String>,
    pub params: serde_json::Value,
    pub additional_config: serde_json::Value,
    pub auth: serde_json::Value,
    pub active: bool,
    pub validated: bool,
    pub last_synced_at: Option<Timestamp>,
    pub last_sync_status: DbLastSyncStatus,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = providers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdateProvider {
    pub auth: Option<serde_json::Value>,
    pub active: Option<bool>,
    pub validated: Option<bool>,
    pub last_synced_at: Option<Option<Timestamp>>,
    pub last_sync_status: Option<DbLastSyncStatus>,
}

impl From<&ProviderEntity> for NewProvider {
    fn from(entity: &ProviderEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name.clone(),
            type_tag: entity.type_tag.clone(),
            display_name: entity.display_name.clone(),
            endpoint: entity.endpoint.clone(),
            params: entity.params.clone(),
            additional_config: entity.additional_config.clone(),
            auth: entity.auth.clone(),
            active: entity.active,
            validated: entity.validated,
            last_synced_at: entity.last_synced_at.map(Timestamp::from),
            last_sync_status: entity.last_sync_status.into(),
        }
    }
}

impl From<Provider> for ProviderEntity {
    fn from(row: Provider) -> Self {
        Self {
            id: row.id,
            name: row.name,
            type_tag: row.type_tag,
            display_name: row.display_name,
            endpoint: row.endpoint,
            params: row.params,
            additional_config: row.additional_config,
            auth: row.auth,
            active: row.active,
            validated: row.validated,
            last_synced_at: row.last_synced_at.map(jiff::Timestamp::from),
            last_sync_status: row.last_sync_status.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_core::provider_entity::LastSyncStatus;

    fn sample_entity() -> ProviderEntity {
        ProviderEntity {
            id: Uuid::new_v4(),
            name: "acme-openai".into(),
            type_tag: "openai".into(),
            display_name: "Acme OpenAI usage".into(),
            endpoint: Some("https://api.openai.com".into()),
            params: serde_json::json!({}),
            additional_config: serde_json::json!({}),
            auth: serde_json::Value::Null,
            active: true,
            validated: true,
            last_synced_at: Some(jiff::Timestamp::from_second(1_700_000_000).unwrap()),
            last_sync_status: LastSyncStatus::Succeeded,
        }
    }

    #[test]
    fn test_new_provider_preserves_fields() {
        let entity = sample_entity();
        let row = NewProvider::from(&entity);
        assert_eq!(row.id, entity.id);
        assert_eq!(row.type_tag, entity.type_tag);
        assert_eq!(row.last_sync_status, DbLastSyncStatus::Succeeded);
    }

    #[test]
    fn test_provider_row_round_trips_into_entity() {
        let entity = sample_entity();
        let row = Provider {
            id: entity.id,
            name: entity.name.clone(),
            type_tag: entity.type_tag.clone(),
            display_name: entity.display_name.clone(),
            endpoint: entity.endpoint.clone(),
            params: entity.params.clone(),
            additional_config: entity.additional_config.clone(),
            auth: entity.auth.clone(),
            active: entity.active,
            validated: entity.validated,
            last_synced_at: entity.last_synced_at.map(Timestamp::from),
            last_sync_status: entity.last_sync_status.into(),
        };
        let round_tripped: ProviderEntity = row.into();
        assert_eq!(round_tripped.id, entity.id);
        assert_eq!(round_tripped.last_synced_at, entity.last_synced_at);
    }
}
