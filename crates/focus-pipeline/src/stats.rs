//! Aggregate run statistics for one provider.
//!
//! Every rate here is zero-guarded: an empty run window reports `0.0`
//! rather than dividing by zero.

use jiff::Timestamp;

use focus_core::run::{Run, RunStatus};

/// Aggregate outcome over the runs a `stats` call considered.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RunStats {
    pub total_runs: usize,
    pub completed_runs: usize,
    pub failed_runs: usize,
    pub cancelled_runs: usize,
    pub running_runs: usize,
    pub total_records_extracted: u64,
    pub total_records_transformed: u64,
    pub total_records_loaded: u64,
    pub total_records_failed: u64,
    /// `completed_runs / (completed_runs + failed_runs + cancelled_runs)`,
    /// `0.0` if no run reached a terminal state.
    pub success_rate: f64,
    /// Mean wall-clock duration, in seconds, of completed runs only.
    pub avg_duration_secs: f64,
}

impl RunStats {
    /// Summarizes `runs`, which the caller has already filtered to the
    /// provider and lookback window it cares about.
    pub fn summarize(runs: &[Run]) -> Self {
        let mut stats = RunStats { total_runs: runs.len(), ..Default::default() };
        let mut duration_total_secs = 0.0f64;
        let mut duration_count: u32 = 0;

        for run in runs {
            stats.total_records_extracted += run.counters.records_extracted;
            stats.total_records_transformed += run.counters.records_transformed;
            stats.total_records_loaded += run.counters.records_loaded;
            stats.total_records_failed += run.counters.records_failed;

            match run.status {
                RunStatus::Completed => {
                    stats.completed_runs += 1;
                    if let (Some(started), Some(completed)) = (run.started_at, run.completed_at) {
                        if let Ok(span) = completed.since(started) {
                            if let Ok(secs) = span.total(jiff::Unit::Second) {
                                duration_total_secs += secs;
                                duration_count += 1;
                            }
                        }
                    }
                }
                RunStatus::Failed => stats.failed_runs += 1,
                RunStatus::Cancelled => stats.cancelled_runs += 1,
                RunStatus::Running | RunStatus::Pending => stats.running_runs += 1,
            }
        }

        let terminal = stats.completed_runs + stats.failed_runs + stats.cancelled_runs;
        stats.success_rate = if terminal == 0 { 0.0 } else { stats.completed_runs as f64 / terminal as f64 };
        stats.avg_duration_secs = if duration_count == 0 { 0.0 } else { duration_total_secs / f64::from(duration_count) };

        stats
    }
}

/// Returns true if `run` started on or after `cutoff`, for filtering a
/// provider's run history down to a lookback window before summarizing.
pub fn within_window(run: &Run, cutoff: Timestamp) -> bool {
    run.started_at.map(|started| started >= cutoff).unwrap_or(true)
}
