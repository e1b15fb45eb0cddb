//! Coordinator tuning knobs.

/// Default number of sources extracted, or load batches written,
/// concurrently within one run.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default fraction of a stage's units of work (sources for Extract,
/// batches for Load) allowed to fail before the stage itself is failed.
pub const DEFAULT_EXTRACT_FAILURE_RATIO: f64 = 0.30;
pub const DEFAULT_LOAD_FAILURE_RATIO: f64 = 0.10;

/// Default count of mapped records handed to `StoragePort::upsert_focus`
/// per call (and per concurrency unit in the Load stage).
pub const DEFAULT_LOAD_BATCH_SIZE: usize = 500;

/// Default violation-count threshold above which a strict-mode record is
/// rejected outright rather than loaded with its issues merely counted.
pub const DEFAULT_MAX_VIOLATIONS_BEFORE_REJECT: usize = 3;

/// Tuning knobs for one [`crate::coordinator::RunCoordinator`] instance.
/// A single coordinator serves every provider type; these values are not
/// per-provider.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Max sources extracted, or load batches written, concurrently.
    pub worker_count: usize,
    /// Fraction of sources that may fail extraction before Extract fails the run.
    pub extract_failure_ratio: f64,
    /// Fraction of batches that may fail to commit before Load fails the run.
    pub load_failure_ratio: f64,
    /// Records per `upsert_focus` call.
    pub load_batch_size: usize,
    /// Whether Transform validates in strict mode (see `DESIGN.md` for how
    /// this interacts with `max_violations_before_reject`).
    pub strict_validation: bool,
    /// Strict-mode violation count above which a record is rejected.
    pub max_violations_before_reject: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            extract_failure_ratio: DEFAULT_EXTRACT_FAILURE_RATIO,
            load_failure_ratio: DEFAULT_LOAD_FAILURE_RATIO,
            load_batch_size: DEFAULT_LOAD_BATCH_SIZE,
            strict_validation: true,
            max_violations_before_reject: DEFAULT_MAX_VIOLATIONS_BEFORE_REJECT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_documented_constants() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.worker_count, DEFAULT_WORKER_COUNT);
        assert_eq!(config.load_batch_size, DEFAULT_LOAD_BATCH_SIZE);
        assert!(config.strict_validation);
    }
}
