use diesel_derive_enum::DbEnum;
use focus_core::provider_entity::LastSyncStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::LastSyncStatus"]
pub enum DbLastSyncStatus {
    #[db_rename = "never"]
    Never,
    #[db_rename = "succeeded"]
    Succeeded,
    #[db_rename = "failed"]
    Failed,
    #[db_rename = "cancelled"]
    Cancelled,
}

impl From<LastSyncStatus> for DbLastSyncStatus {
    fn from(value: LastSyncStatus) -> Self {
        match value {
            LastSyncStatus::Never => DbLastSyncStatus::Never,
            LastSyncStatus::Succeeded => DbLastSyncStatus::Succeeded,
            LastSyncStatus::Failed => DbLastSyncStatus::Failed,
            LastSyncStatus::Cancelled => DbLastSyncStatus::Cancelled,
        }
    }
}

impl From<DbLastSyncStatus> for LastSyncStatus {
    fn from(value: DbLastSyncStatus) -> Self {
        match value {
            DbLastSyncStatus::Never => LastSyncStatus::Never,
            DbLastSyncStatus::Succeeded => LastSyncStatus::Succeeded,
            DbLastSyncStatus::Failed => LastSyncStatus::Failed,
            DbLastSyncStatus::Cancelled => LastSyncStatus::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_sync_status_round_trips() {
        for status in [LastSyncStatus::Never, LastSyncStatus::Succeeded, LastSyncStatus::Failed, LastSyncStatus::Cancelled] {
            assert_eq!(LastSyncStatus::from(DbLastSyncStatus::from(status)), status);
        }
    }
}
