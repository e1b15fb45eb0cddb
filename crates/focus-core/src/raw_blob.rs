//! Raw extracted payloads, persisted before any FOCUS normalization.
//!
//! Every extractor writes a [`RawBlob`] before it returns a batch to the
//! coordinator, regardless of whether the records inside it ever become
//! valid [`crate::focus::FocusRecord`]s. This preserves the ability to
//! re-run mapping against historical payloads without re-hitting the
//! provider, and is what the raw-before-normalized testable property in
//! the pipeline's acceptance suite checks for.

use jiff::Timestamp;
use serde_json::Value;
use uuid::Uuid;

/// One raw payload captured from a provider source, prior to mapping.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawBlob {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub run_id: Uuid,
    pub source_name: String,
    /// The source-descriptor variant this blob came from (`rest_api`,
    /// `filesystem`, `sql_database`), kept alongside the name for display
    /// and for clean-up passes that need to re-dispatch by source type.
    pub source_type: String,
    /// The extraction window this blob was pulled for, independent of the
    /// owning run's window (a run may cover the same [start,end) for every
    /// source, but nothing requires that).
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    /// The extractor's verbatim output for this batch (JSON array of records,
    /// or a single JSON object for sources that emit one record per blob).
    pub payload: Value,
    pub record_count: u32,
    pub captured_at: Timestamp,
    pub processed: bool,
    pub processed_at: Option<Timestamp>,
    /// Set if mapping/loading records derived from this blob failed; the
    /// blob stays unprocessed so a clean-up pass can retry it.
    pub processing_error: Option<String>,
}

impl RawBlob {
    /// Builds a new, not-yet-processed raw blob.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider_id: Uuid,
        run_id: Uuid,
        source_name: impl Into<String>,
        source_type: impl Into<String>,
        window_start: Timestamp,
        window_end: Timestamp,
        payload: Value,
        record_count: u32,
        captured_at: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider_id,
            run_id,
            source_name: source_name.into(),
            source_type: source_type.into(),
            window_start,
            window_end,
            payload,
            record_count,
            captured_at,
            processed: false,
            processed_at: None,
            processing_error: None,
        }
    }

    /// Marks this blob as processed. Idempotent: calling it twice just
    /// overwrites `processed_at`.
    pub fn mark_processed(&mut self, at: Timestamp) {
        self.processed = true;
        self.processed_at = Some(at);
        self.processing_error = None;
    }

    /// Records a processing failure without marking the blob processed, so
    /// a subsequent run's clean-up pass can find and retry it.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.processing_error = Some(error.into());
    }
}
