//! Persistence row types and their lossless conversions to/from the pure
//! `focus-core` value types. Kept deliberately separate from those value
//! types: a mapper or coordinator never imports anything from here.

mod provider;
mod raw_blob;
mod record;
mod run;

pub use provider::{NewProvider, Provider, UpdateProvider};
pub use raw_blob::{NewRawBlob, RawBlobRow, UpdateRawBlob};
pub use record::{BillingDataRow, NewBillingData};
pub use run::{NewPipelineRun, PipelineRunRow, UpdatePipelineRun};
