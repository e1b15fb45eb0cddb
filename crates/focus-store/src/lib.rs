#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod port;
pub mod postgres;
pub mod schema;
pub mod types;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use port::{StoragePort, UpsertOutcome};
pub use postgres::PostgresStore;
