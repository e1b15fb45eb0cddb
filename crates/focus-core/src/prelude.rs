//! Commonly used items from `focus-core`.
//!
//! This prelude re-exports the types most consuming crates need to import
//! to work with provider configuration, FOCUS records, and run state.

pub use crate::auth::{AuthConfig, AuthMethod};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::focus::FocusRecord;
pub use crate::provider_entity::ProviderEntity;
pub use crate::raw_blob::RawBlob;
pub use crate::run::{Run, RunStatus, RunType};
