//! Error type for storage operations, wrapping the diesel/deadpool backend
//! into this crate's own enum rather than leaking their types across the
//! `focus-core::error::Error` boundary callers see.

use diesel::result::Error as DieselError;
use diesel_async::pooled_connection::PoolError as DieselPoolError;
use diesel_async::pooled_connection::deadpool::PoolError as DeadpoolError;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database configuration error: {0}")]
    Config(String),

    #[error("database connection pool error: {0}")]
    Pool(String),

    #[error("database query error: {0}")]
    Query(#[from] DieselError),

    #[error("database migration error: {0}")]
    Migration(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Mirrors `focus_core::error::Error::is_retryable`'s intent: pool
    /// timeouts and connection errors may succeed on a fresh attempt,
    /// constraint violations and syntax errors will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Pool(_))
    }
}

impl From<DeadpoolError> for StoreError {
    fn from(value: DeadpoolError) -> Self {
        match value {
            DeadpoolError::Timeout(kind) => StoreError::Pool(format!("pool timeout: {kind:?}")),
            DeadpoolError::Backend(DieselPoolError::QueryError(err)) => StoreError::Query(err),
            DeadpoolError::Backend(DieselPoolError::ConnectionError(err)) => StoreError::Pool(err.to_string()),
            other => StoreError::Pool(other.to_string()),
        }
    }
}

impl From<StoreError> for focus_core::error::Error {
    fn from(value: StoreError) -> Self {
        match &value {
            StoreError::Pool(_) => focus_core::error::Error::source_transient(value.to_string()),
            StoreError::Config(_) => focus_core::error::Error::config_invalid(value.to_string()),
            StoreError::Query(_) | StoreError::Migration(_) => focus_core::error::Error::internal_bug(value.to_string()),
        }
    }
}
