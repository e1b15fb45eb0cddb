//! Storage port.
//!
//! `StoragePort` is the seam between the pipeline and whatever persists
//! [`RawBlob`]s, [`FocusRecord`]s, [`Run`]s, and [`ProviderEntity`]s. The
//! spec names five operations (`save_raw_blob`, `mark_processed`,
//! `upsert_focus`, `update_run`, `get_provider`); this trait adds the small
//! set of read/create operations a coordinator and a CLI need to drive a run
//! end to end (`create_run`, `get_run`, `list_runs`, `get_unprocessed_raw_blobs`,
//! `create_provider`, `list_active_providers`), documented in DESIGN.md as
//! pragmatic extensions of the named contract.
//!
//! `PostgresStore` (this crate) is the production implementation;
//! `InMemoryStore` is a test double with identical semantics used by
//! `focus-pipeline`'s coordinator tests and this crate's own loader tests.

use async_trait::async_trait;
use jiff::Timestamp;
use uuid::Uuid;

use focus_core::focus::FocusRecord;
use focus_core::provider_entity::ProviderEntity;
use focus_core::raw_blob::RawBlob;
use focus_core::run::Run;

use crate::error::Result;

/// Outcome of a single `upsert_focus` call: how many records were inserted
/// vs. merged into an existing row, distinguishing the two for the run's
/// `records_loaded` counter and for idempotence acceptance checks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub inserted: u64,
    pub merged: u64,
}

impl UpsertOutcome {
    pub fn total(&self) -> u64 {
        self.inserted + self.merged
    }
}

/// The storage seam the loader and run coordinator depend on.
///
/// Implementors must make `upsert_focus` idempotent on
/// [`FocusRecord::merge_key_parts`] (replaying the same extraction twice
/// must not duplicate rows) and must never partially apply a batch passed to
/// `upsert_focus` -- either the whole batch's statements commit or none do,
/// so the loader's per-batch failure counting reflects reality.
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Persists a raw extracted payload before any FOCUS mapping is attempted.
    async fn save_raw_blob(&self, blob: &RawBlob) -> Result<()>;

    /// Marks a raw blob processed (success) or records a processing error
    /// (failure, blob stays unprocessed) per [`RawBlob::mark_processed`] /
    /// [`RawBlob::mark_failed`].
    async fn mark_processed(&self, blob_id: Uuid, outcome: std::result::Result<Timestamp, String>) -> Result<()>;

    /// Returns raw blobs for a run that have not yet been successfully
    /// processed, so a clean-up pass can retry mapping without re-extracting.
    async fn get_unprocessed_raw_blobs(&self, run_id: Uuid) -> Result<Vec<RawBlob>>;

    /// Upserts a batch of FOCUS records on their merge key, returning how
    /// many were newly inserted vs. merged into an existing row.
    async fn upsert_focus(&self, records: &[FocusRecord]) -> Result<UpsertOutcome>;

    /// Creates a new pipeline run row.
    async fn create_run(&self, run: &Run) -> Result<Run>;

    /// Applies a full replacement of a run's mutable state (status, stage,
    /// counters, timestamps, error). Coordinators build the new [`Run`] value
    /// with [`Run::transition_to`]/[`Run::finish`] and pass the result here.
    async fn update_run(&self, run: &Run) -> Result<Run>;

    /// Fetches a run by id.
    async fn get_run(&self, run_id: Uuid) -> Result<Option<Run>>;

    /// Lists runs for a provider, most recent first.
    async fn list_runs(&self, provider_id: Uuid, limit: i64) -> Result<Vec<Run>>;

    /// Fetches a provider by id.
    async fn get_provider(&self, provider_id: Uuid) -> Result<Option<ProviderEntity>>;

    /// Registers a new provider row. Callers (the CLI's `provider add`
    /// command, the test fixtures) are expected to have already run
    /// [`ProviderEntity::validate`].
    async fn create_provider(&self, provider: &ProviderEntity) -> Result<ProviderEntity>;

    /// Lists every active provider, for `trigger`'s no-`provider_id` form,
    /// which sweeps all active providers when `provider_id` is omitted.
    async fn list_active_providers(&self) -> Result<Vec<ProviderEntity>>;
}
