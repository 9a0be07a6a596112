//! Snapshot acquisition for a running keepalived daemon.
//!
//! keepalived reports its VRRP state only on request: a signal makes it
//! write a dump file, which is later read and parsed. This crate wraps
//! that exchange:
//! - Version probing and capability detection
//! - Signal name to number resolution
//! - Bounded exponential-backoff waits for dump files
//! - Parsers for the text data/stats dumps and the JSON dump
//! - Correlation of both text dumps into one [`Snapshot`]
//!
//! Interaction with the daemon goes through the [`KeepalivedHost`] trait so
//! callers decide whether keepalived runs locally, in a container, or
//! behind an HTTP agent.
//!
//! # Example
//!
//! ```no_run
//! use keepalived::{AcquirerConfig, KeepalivedHost, SnapshotAcquirer};
//! use std::sync::Arc;
//!
//! # async fn example(host: Arc<dyn KeepalivedHost>) -> keepalived::Result<()> {
//! let acquirer = SnapshotAcquirer::initialize(host, AcquirerConfig::default()).await?;
//! let snapshot = acquirer.acquire().await?;
//! for vrrp in &snapshot.vrrps {
//!     println!("{} is {}", vrrp.instance.name, vrrp.instance.state);
//! }
//! # Ok(())
//! # }
//! ```

pub mod acquirer;
pub mod error;
pub mod host;
pub mod parser;
pub mod retry;
pub mod signal;
pub mod types;
pub mod version;

pub use acquirer::{AcquirerConfig, DumpMode, SnapshotAcquirer};
pub use error::{Error, ParseError, Result};
pub use host::{CommandOutput, ControlCommand, DumpReader, DumpStamp, KeepalivedHost};
pub use retry::{Clock, RetryPolicy, TokioClock};
pub use signal::{SignalName, SignalResolver};
pub use types::{
    DumpPaths, ScriptState, ScriptStatus, Snapshot, VRRP, VRRPCounters, VRRPInstance, VRRPScript,
    VRRPState, VirtualIp,
};
pub use version::{Capabilities, Version};
