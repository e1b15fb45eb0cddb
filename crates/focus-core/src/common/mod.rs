//! Common types shared across the billing pipeline crates.

#[path = "../health.rs"]
mod health;
mod timing;

pub use health::{ServiceHealth, ServiceStatus};
pub use timing::Timing;
