//! Pipeline run persistence row. `created_at` has no counterpart on
//! [`focus_core::run::Run`] (the column default is `now()`), so it is never
//! read back into the domain type.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use crate::schema::pipeline_runs;
use crate::types::{DbRunStatus, DbRunType, DbStageName};
use focus_core::run::{Run, RunCounters, RunStatus, RunType, StageName};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pipeline_runs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PipelineRunRow {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub run_type: DbRunType,
    pub status: DbRunStatus,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub last_completed_stage: Option<DbStageName>,
    pub records_extracted: i64,
    pub records_transformed: i64,
    pub records_loaded: i64,
    pub records_failed: i64,
    pub retry_of: Option<Uuid>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pipeline_runs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPipelineRun {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub run_type: DbRunType,
    pub status: DbRunStatus,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub retry_of: Option<Uuid>,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = pipeline_runs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdatePipelineRun {
    pub status: Option<DbRunStatus>,
    pub last_completed_stage: Option<Option<DbStageName>>,
    pub records_extracted: Option<i64>,
    pub records_transformed: Option<i64>,
    pub records_loaded: Option<i64>,
    pub records_failed: Option<i64>,
    pub started_at: Option<Option<Timestamp>>,
    pub completed_at: Option<Option<Timestamp>>,
    pub error_message: Option<Option<String>>,
}

impl From<&Run> for NewPipelineRun {
    fn from(run: &Run) -> Self {
        Self {
            id: run.id,
            provider_id: run.provider_id,
            run_type: run.run_type.into(),
            status: run.status.into(),
            window_start: Timestamp::from(run.window_start),
            window_end: Timestamp::from(run.window_end),
            retry_of: run.retry_of,
        }
    }
}

impl From<PipelineRunRow> for Run {
    fn from(row: PipelineRunRow) -> Self {
        Self {
            id: row.id,
            provider_id: row.provider_id,
            run_type: row.run_type.into(),
            status: row.status.into(),
            window_start: jiff::Timestamp::from(row.window_start),
            window_end: jiff::Timestamp::from(row.window_end),
            last_completed_stage: row.last_completed_stage.map(StageName::from),
            counters: RunCounters {
                records_extracted: row.records_extracted.max(0) as u64,
                records_transformed: row.records_transformed.max(0) as u64,
                records_loaded: row.records_loaded.max(0) as u64,
                records_failed: row.records_failed.max(0) as u64,
            },
            retry_of: row.retry_of,
            started_at: row.started_at.map(jiff::Timestamp::from),
            completed_at: row.completed_at.map(jiff::Timestamp::from),
            error_message: row.error_message,
        }
    }
}

impl UpdatePipelineRun {
    /// Builds the changeset for a status transition, stamping `started_at`
    /// or `completed_at` the same way [`Run::transition_to`]/[`Run::finish`] do.
    pub fn for_transition(next: RunStatus, at: jiff::Timestamp) -> Self {
        let mut update = Self { status: Some(next.into()), ..Self::default() };
        match next {
            RunStatus::Running => update.started_at = Some(Some(Timestamp::from(at))),
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled => {
                update.completed_at = Some(Some(Timestamp::from(at)))
            }
            RunStatus::Pending => {}
        }
        update
    }

    pub fn with_last_completed_stage(mut self, stage: StageName) -> Self {
        self.last_completed_stage = Some(Some(stage.into()));
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(Some(message.into()));
        self
    }

    pub fn with_counters(mut self, counters: RunCounters) -> Self {
        self.records_extracted = Some(counters.records_extracted as i64);
        self.records_transformed = Some(counters.records_transformed as i64);
        self.records_loaded = Some(counters.records_loaded as i64);
        self.records_failed = Some(counters.records_failed as i64);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_run() -> Run {
        Run {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            run_type: RunType::Scheduled,
            status: RunStatus::Pending,
            window_start: jiff::Timestamp::from_second(1_700_000_000).unwrap(),
            window_end: jiff::Timestamp::from_second(1_700_600_000).unwrap(),
            last_completed_stage: None,
            counters: RunCounters::default(),
            retry_of: None,
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    #[test]
    fn test_new_pipeline_run_preserves_window() {
        let run = sample_run();
        let row = NewPipelineRun::from(&run);
        assert_eq!(row.id, run.id);
        assert_eq!(row.window_start, Timestamp::from(run.window_start));
    }

    #[test]
    fn test_for_transition_to_running_sets_started_at() {
        let at = jiff::Timestamp::from_second(1_700_000_500).unwrap();
        let update = UpdatePipelineRun::for_transition(RunStatus::Running, at);
        assert_eq!(update.status, Some(DbRunStatus::Running));
        assert!(update.started_at.flatten().is_some());
        assert!(update.completed_at.is_none());
    }

    #[test]
    fn test_for_transition_to_failed_sets_completed_at() {
        let at = jiff::Timestamp::from_second(1_700_001_000).unwrap();
        let update = UpdatePipelineRun::for_transition(RunStatus::Failed, at);
        assert!(update.completed_at.flatten().is_some());
    }

    #[test]
    fn test_row_round_trips_counters() {
        let run = sample_run();
        let row = PipelineRunRow {
            id: run.id,
            provider_id: run.provider_id,
            run_type: run.run_type.into(),
            status: run.status.into(),
            window_start: Timestamp::from(run.window_start),
            window_end: Timestamp::from(run.window_end),
            last_completed_stage: None,
            records_extracted: 12,
            records_transformed: 12,
            records_loaded: 10,
            records_failed: 2,
            retry_of: None,
            started_at: None,
            completed_at: None,
            error_message: None,
        };
        let round_tripped: Run = row.into();
        assert_eq!(round_tripped.counters.records_loaded, 10);
        assert_eq!(round_tripped.counters.records_failed, 2);
    }
}
