//! Pipeline run state machine.
//!
//! A `Run` tracks one provider sync from trigger to terminal state. The
//! state machine is intentionally small: `pending -> running -> {completed,
//! failed}`, with `cancelled` reachable from either `pending` or `running`.
//! Once in a terminal state (`completed`, `failed`, `cancelled`) a run never
//! transitions again; retrying creates a new, linked run instead.

use jiff::{Span, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Execution status of a pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    /// Returns whether the run has reached a terminal state.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }

    /// Returns whether this run can still be cancelled.
    #[inline]
    pub fn is_cancellable(self) -> bool {
        matches!(self, RunStatus::Pending | RunStatus::Running)
    }

    /// Returns the set of statuses this status may transition to.
    pub fn allowed_transitions(self) -> &'static [RunStatus] {
        match self {
            RunStatus::Pending => &[RunStatus::Running, RunStatus::Cancelled],
            RunStatus::Running => &[RunStatus::Completed, RunStatus::Failed, RunStatus::Cancelled],
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled => &[],
        }
    }

    /// Returns true if transitioning from `self` to `next` is legal.
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

/// Distinguishes a normal trigger from a run created by retrying a failed one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunType {
    #[default]
    Scheduled,
    Manual,
    Retry,
}

/// Which DAG stage a run is currently executing, for crash-recoverable resume.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StageName {
    #[default]
    Extract,
    Transform,
    Load,
}

/// Per-stage record counters for one run, reported by the coordinator as
/// each stage completes: extracted/transformed/loaded/failed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub records_extracted: u64,
    pub records_transformed: u64,
    pub records_loaded: u64,
    pub records_failed: u64,
}

/// One provider sync attempt over a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub run_type: RunType,
    pub status: RunStatus,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub last_completed_stage: Option<StageName>,
    pub counters: RunCounters,
    pub retry_of: Option<Uuid>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
}

/// Default lookback window when no explicit window is given.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;

impl Run {
    /// Resolves a run window from the trigger surface's optional inputs.
    ///
    /// - Both `start` and `end` omitted: `end` = start of tomorrow (UTC),
    ///   `start` = `end` minus [`DEFAULT_LOOKBACK_DAYS`].
    /// - Only `days_back` given: `start` = `end` minus `days_back` days.
    /// - Explicit `start`/`end` are used as given.
    pub fn resolve_window(
        start: Option<Timestamp>,
        end: Option<Timestamp>,
        days_back: Option<i64>,
        now: Timestamp,
    ) -> (Timestamp, Timestamp) {
        let resolved_end = end.unwrap_or_else(|| start_of_tomorrow(now));
        let lookback_days = days_back.unwrap_or(DEFAULT_LOOKBACK_DAYS);
        let resolved_start = start.unwrap_or_else(|| {
            resolved_end
                .checked_sub(Span::new().days(lookback_days))
                .unwrap_or(resolved_end)
        });
        (resolved_start, resolved_end)
    }

    /// Attempts a status transition, returning `false` (without mutating) if illegal.
    #[must_use]
    pub fn transition_to(&mut self, next: RunStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    /// Transitions to a terminal status and stamps `completed_at`. A no-op
    /// (returns `false`) if `next` is not terminal or the transition is
    /// illegal from the current state, so `completed_at` is never set
    /// except exactly when the status becomes terminal.
    #[must_use]
    pub fn finish(&mut self, next: RunStatus, at: Timestamp) -> bool {
        if !next.is_terminal() || !self.transition_to(next) {
            return false;
        }
        self.completed_at = Some(at);
        true
    }

    /// Builds a new run that retries this one over the same window.
    pub fn retry(&self, new_id: Uuid) -> Run {
        Run {
            id: new_id,
            provider_id: self.provider_id,
            run_type: RunType::Retry,
            status: RunStatus::Pending,
            window_start: self.window_start,
            window_end: self.window_end,
            last_completed_stage: None,
            counters: RunCounters::default(),
            retry_of: Some(self.id),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }
}

fn start_of_tomorrow(now: Timestamp) -> Timestamp {
    let zoned = now.to_zoned(jiff::tz::TimeZone::UTC);
    let tomorrow = zoned.date().tomorrow().unwrap_or(zoned.date());
    tomorrow
        .to_zoned(jiff::tz::TimeZone::UTC)
        .map(|z| z.timestamp())
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_to_running_allowed() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Running));
    }

    #[test]
    fn test_completed_is_terminal_no_transitions() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Completed.allowed_transitions().is_empty());
    }

    #[test]
    fn test_cancel_from_pending_and_running() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Cancelled));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Cancelled));
        assert!(!RunStatus::Completed.can_transition_to(RunStatus::Cancelled));
    }

    #[test]
    fn test_transition_to_mutates_only_on_success() {
        let mut run = sample_run();
        assert!(run.transition_to(RunStatus::Running));
        assert_eq!(run.status, RunStatus::Running);

        assert!(!run.transition_to(RunStatus::Pending));
        assert_eq!(run.status, RunStatus::Running);
    }

    #[test]
    fn test_retry_links_to_original_and_resets_progress() {
        let mut run = sample_run();
        run.status = RunStatus::Failed;
        run.counters.records_loaded = 42;

        let retry = run.retry(Uuid::new_v4());
        assert_eq!(retry.retry_of, Some(run.id));
        assert_eq!(retry.run_type, RunType::Retry);
        assert_eq!(retry.status, RunStatus::Pending);
        assert_eq!(retry.counters.records_loaded, 0);
        assert_eq!(retry.window_start, run.window_start);
        assert_eq!(retry.window_end, run.window_end);
    }

    #[test]
    fn test_finish_sets_completed_at_only_for_terminal_status() {
        let mut run = sample_run();
        let at = Timestamp::from_second(1_700_700_000).unwrap();

        assert!(!run.finish(RunStatus::Completed, at));
        assert!(run.completed_at.is_none());

        assert!(run.transition_to(RunStatus::Running));
        assert!(run.finish(RunStatus::Completed, at));
        assert_eq!(run.completed_at, Some(at));
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[test]
    fn test_resolve_window_defaults_to_seven_day_lookback() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let (start, end) = Run::resolve_window(None, None, None, now);
        assert!(start < end);
        let span = end.since(start).unwrap();
        assert_eq!(span.get_days().abs() >= 6, true);
    }

    #[test]
    fn test_resolve_window_days_back_only() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let end = start_of_tomorrow(now);
        let (start, resolved_end) = Run::resolve_window(None, None, Some(3), now);
        assert_eq!(resolved_end, end);
        assert!(start < end);
    }

    fn sample_run() -> Run {
        Run {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            run_type: RunType::Scheduled,
            status: RunStatus::Pending,
            window_start: Timestamp::from_second(1_700_000_000).unwrap(),
            window_end: Timestamp::from_second(1_700_600_000).unwrap(),
            last_completed_stage: None,
            counters: RunCounters::default(),
            retry_of: None,
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }
}
