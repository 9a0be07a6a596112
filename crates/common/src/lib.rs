//! Common utilities and types shared across the keepalived exporter crates.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
