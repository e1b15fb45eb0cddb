use diesel_derive_enum::DbEnum;
use focus_core::run::{RunStatus, RunType, StageName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::RunStatus"]
pub enum DbRunStatus {
    #[db_rename = "pending"]
    Pending,
    #[db_rename = "running"]
    Running,
    #[db_rename = "completed"]
    Completed,
    #[db_rename = "failed"]
    Failed,
    #[db_rename = "cancelled"]
    Cancelled,
}

impl From<RunStatus> for DbRunStatus {
    fn from(value: RunStatus) -> Self {
        match value {
            RunStatus::Pending => DbRunStatus::Pending,
            RunStatus::Running => DbRunStatus::Running,
            RunStatus::Completed => DbRunStatus::Completed,
            RunStatus::Failed => DbRunStatus::Failed,
            RunStatus::Cancelled => DbRunStatus::Cancelled,
        }
    }
}

impl From<DbRunStatus> for RunStatus {
    fn from(value: DbRunStatus) -> Self {
        match value {
            DbRunStatus::Pending => RunStatus::Pending,
            DbRunStatus::Running => RunStatus::Running,
            DbRunStatus::Completed => RunStatus::Completed,
            DbRunStatus::Failed => RunStatus::Failed,
            DbRunStatus::Cancelled => RunStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::RunType"]
pub enum DbRunType {
    #[db_rename = "scheduled"]
    Scheduled,
    #[db_rename = "manual"]
    Manual,
    #[db_rename = "retry"]
    Retry,
}

impl From<RunType> for DbRunType {
    fn from(value: RunType) -> Self {
        match value {
            RunType::Scheduled => DbRunType::Scheduled,
            RunType::Manual => DbRunType::Manual,
            RunType::Retry => DbRunType::Retry,
        }
    }
}

impl From<DbRunType> for RunType {
    fn from(value: DbRunType) -> Self {
        match value {
            DbRunType::Scheduled => RunType::Scheduled,
            DbRunType::Manual => RunType::Manual,
            DbRunType::Retry => RunType::Retry,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::StageName"]
pub enum DbStageName {
    #[db_rename = "extract"]
    Extract,
    #[db_rename = "transform"]
    Transform,
    #[db_rename = "load"]
    Load,
}

impl From<StageName> for DbStageName {
    fn from(value: StageName) -> Self {
        match value {
            StageName::Extract => DbStageName::Extract,
            StageName::Transform => DbStageName::Transform,
            StageName::Load => DbStageName::Load,
        }
    }
}

impl From<DbStageName> for StageName {
    fn from(value: DbStageName) -> Self {
        match value {
            DbStageName::Extract => StageName::Extract,
            DbStageName::Transform => StageName::Transform,
            DbStageName::Load => StageName::Load,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_round_trips() {
        for status in [RunStatus::Pending, RunStatus::Running, RunStatus::Completed, RunStatus::Failed, RunStatus::Cancelled] {
            assert_eq!(RunStatus::from(DbRunStatus::from(status)), status);
        }
    }

    #[test]
    fn test_run_type_round_trips() {
        for run_type in [RunType::Scheduled, RunType::Manual, RunType::Retry] {
            assert_eq!(RunType::from(DbRunType::from(run_type)), run_type);
        }
    }
}
