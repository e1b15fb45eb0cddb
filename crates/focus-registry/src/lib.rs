#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod auth_resolver;
pub mod metadata;
pub mod registry;
pub mod source;
pub mod traits;

pub use auth_resolver::{resolve as resolve_auth, ResolvedAuth};
pub use metadata::{FieldDescriptor, ProviderMetadata};
pub use registry::{global, ProviderRegistry};
pub use source::{Compression, FileFormat, HttpMethod, PaginationPolicy, SourceConfig, SourceSpec, Window};
pub use traits::{ExtractContext, ExtractedBatch, Extractor, FocusMapper, MapOutcome, RawBlobSink, SourceDescriptor};
