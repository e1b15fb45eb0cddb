//! Persistence-side mirrors of `focus-core`'s enums.
//!
//! `focus-core` stays free of a diesel dependency, so every
//! enum that needs a native Postgres type gets a local `Db*` twin here,
//! wired to `crate::schema::sql_types` via `diesel-derive-enum`, with a
//! lossless `From` conversion in each direction.

mod provider;
mod record;
mod run;

pub use provider::DbLastSyncStatus;
pub use record::{DbChargeCategory, DbChargeClass, DbChargeFrequency, DbCommitmentDiscountStatus, DbServiceCategory};
pub use run::{DbRunStatus, DbRunType, DbStageName};
