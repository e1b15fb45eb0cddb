#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod filesystem;
pub mod rest;
pub mod retry;
pub mod sql;

pub use filesystem::FilesystemExtractor;
pub use rest::{RestApiExtractor, RestClientConfig};
pub use sql::SqlDatabaseExtractor;
