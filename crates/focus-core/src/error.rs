//! Common error type definitions shared across the billing pipeline crates.

use std::time::Duration;

use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors that can occur anywhere in the provider-pluggable
/// billing ETL pipeline (registry, auth, extraction, mapping, validation,
/// loading, and run coordination).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A provider, source, or run configuration failed validation. Never retryable.
    ConfigInvalid,
    /// An auth config named a `method` outside the provider's supported set.
    UnsupportedAuthMethod,
    /// An auth config variant was missing a field required for that variant.
    MissingAuthField,
    /// A provider type tag has no registered metadata/extractor/mapper/source.
    ProviderNotFound,
    /// A single source failed in a way that may succeed on retry (network, 5xx, 429).
    SourceTransient,
    /// A source exhausted its retry budget and is being reported as failed.
    SourceFailed,
    /// A single record failed FOCUS mapping or strict validation; the record is skipped.
    RecordInvalid,
    /// A load batch could not be committed (unique-constraint clash, deadlock, etc).
    LoadConflict,
    /// The run was cancelled cooperatively.
    Cancelled,
    /// A bug: an invariant the code assumed was violated.
    InternalBug,
}

/// A structured error type used throughout the pipeline.
#[derive(Debug, Error)]
#[error("{kind:?}{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional human-readable detail.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
    /// A minimum delay the producer of this error is asking for before the
    /// next retry (e.g. a parsed HTTP `Retry-After` header). `None` leaves
    /// the retrying component's own backoff schedule untouched.
    pub retry_after: Option<Duration>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
            retry_after: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Records a minimum retry delay the caller asked for, e.g. a parsed
    /// `Retry-After` header on a 429 response. See [`Error::retry_delay`].
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid).with_message(message)
    }

    pub fn unsupported_auth_method(method: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::UnsupportedAuthMethod).with_message(method.to_string())
    }

    pub fn missing_auth_field(field: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::MissingAuthField).with_message(field.to_string())
    }

    pub fn provider_not_found(type_tag: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::ProviderNotFound).with_message(type_tag.to_string())
    }

    pub fn source_transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SourceTransient).with_message(message)
    }

    pub fn source_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SourceFailed).with_message(message)
    }

    pub fn record_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RecordInvalid).with_message(message)
    }

    pub fn load_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LoadConflict).with_message(message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled)
    }

    pub fn internal_bug(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalBug).with_message(message)
    }

    /// Returns true if retrying the owning component's operation might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::SourceTransient)
    }

    /// Returns true if this error should cause the owning *stage* to fail
    /// outright rather than merely being counted and tolerated.
    pub fn is_stage_fatal(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::ConfigInvalid
                | ErrorKind::ProviderNotFound
                | ErrorKind::Cancelled
                | ErrorKind::InternalBug
        )
    }

    /// Returns the minimum delay the error source explicitly asked for
    /// before the next retry (e.g. a parsed `Retry-After` header), if any.
    /// `None` means the caller's own backoff schedule is unconstrained.
    pub fn retry_delay(&self) -> Option<Duration> {
        self.retry_after
    }
}
