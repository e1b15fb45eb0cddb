//! Raw extracted payload persistence row.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use crate::schema::raw_billing_data;
use focus_core::raw_blob::RawBlob;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = raw_billing_data)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RawBlobRow {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub run_id: Uuid,
    pub source_name: String,
    pub source_type: String,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub payload: serde_json::Value,
    pub record_count: i32,
    pub captured_at: Timestamp,
    pub processed: bool,
    pub processed_at: Option<Timestamp>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = raw_billing_data)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewRawBlob {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub run_id: Uuid,
    pub source_name: String,
    pub source_type: String,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub payload: serde_json::Value,
    pub record_count: i32,
    pub captured_at: Timestamp,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = raw_billing_data)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdateRawBlob {
    pub processed: Option<bool>,
    pub processed_at: Option<Option<Timestamp>>,
    pub error: Option<Option<String>>,
}

impl UpdateRawBlob {
    pub fn mark_processed(at: jiff::Timestamp) -> Self {
        Self { processed: Some(true), processed_at: Some(Some(Timestamp::from(at))), error: Some(None) }
    }

    pub fn mark_failed(message: impl Into<String>) -> Self {
        Self { processed: Some(false), processed_at: None, error: Some(Some(message.into())) }
    }
}

impl From<&RawBlob> for NewRawBlob {
    fn from(blob: &RawBlob) -> Self {
        Self {
            id: blob.id,
            provider_id: blob.provider_id,
            run_id: blob.run_id,
            source_name: blob.source_name.clone(),
            source_type: blob.source_type.clone(),
            window_start: Timestamp::from(blob.window_start),
            window_end: Timestamp::from(blob.window_end),
            payload: blob.payload.clone(),
            record_count: blob.record_count as i32,
            captured_at: Timestamp::from(blob.captured_at),
        }
    }
}

impl From<RawBlobRow> for RawBlob {
    fn from(row: RawBlobRow) -> Self {
        Self {
            id: row.id,
            provider_id: row.provider_id,
            run_id: row.run_id,
            source_name: row.source_name,
            source_type: row.source_type,
            window_start: jiff::Timestamp::from(row.window_start),
            window_end: jiff::Timestamp::from(row.window_end),
            payload: row.payload,
            record_count: row.record_count.max(0) as u32,
            captured_at: jiff::Timestamp::from(row.captured_at),
            processed: row.processed,
            processed_at: row.processed_at.map(jiff::Timestamp::from),
            processing_error: row.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blob() -> RawBlob {
        RawBlob::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "invoices",
            "rest_api",
            jiff::Timestamp::from_second(1_700_000_000).unwrap(),
            jiff::Timestamp::from_second(1_700_600_000).unwrap(),
            serde_json::json!([]),
            0,
            jiff::Timestamp::now(),
        )
    }

    #[test]
    fn test_new_raw_blob_preserves_source_type() {
        let blob = sample_blob();
        let row = NewRawBlob::from(&blob);
        assert_eq!(row.source_type, "rest_api");
        assert_eq!(row.id, blob.id);
    }

    #[test]
    fn test_mark_processed_clears_error() {
        let at = jiff::Timestamp::now();
        let update = UpdateRawBlob::mark_processed(at);
        assert_eq!(update.processed, Some(true));
        assert_eq!(update.error, Some(None));
    }

    #[test]
    fn test_mark_failed_leaves_unprocessed() {
        let update = UpdateRawBlob::mark_failed("boom");
        assert_eq!(update.processed, Some(false));
        assert_eq!(update.error, Some(Some("boom".to_string())));
    }
}
