#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod coordinator;
pub mod sink;
pub mod stats;

pub use config::CoordinatorConfig;
pub use coordinator::RunCoordinator;
pub use sink::StorageRawBlobSink;
pub use stats::RunStats;
