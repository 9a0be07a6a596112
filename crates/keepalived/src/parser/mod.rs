//! Parsers for the three keepalived dump formats.
//!
//! All of them are pure: they read the supplied stream and nothing else.

mod data;
mod json;
mod stats;

pub use data::{DataDump, parse_data};
pub use json::parse_json;
pub use stats::{InstanceCounters, parse_stats};
