#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod auth;

#[cfg(feature = "encryption")]
#[cfg_attr(docsrs, doc(cfg(feature = "encryption")))]
pub mod crypto;

pub mod focus;
pub mod provider_entity;
pub mod raw_blob;
pub mod run;

mod common;
pub mod error;

#[doc(hidden)]
pub mod prelude;

pub use common::{ServiceHealth, ServiceStatus, Timing};
pub use error::{BoxedError, Error, ErrorKind, Result};
