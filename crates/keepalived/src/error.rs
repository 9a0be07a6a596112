//! Error taxonomy for snapshot acquisition.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A specialized Result type for keepalived operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while resolving signals or acquiring a snapshot.
///
/// `VersionUnavailable` is recoverable (callers assume the newest feature
/// set) and `SignalResolutionFailed` is a startup failure. Everything else
/// is scoped to a single acquisition.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("keepalived version unavailable: {0}")]
    VersionUnavailable(String),

    #[error("failed to resolve signal {signal}: {reason}")]
    SignalResolutionFailed { signal: String, reason: String },

    #[error("{} was not written within {:?}: {last_error}", path.display(), elapsed)]
    SnapshotTimeout {
        path: PathBuf,
        elapsed: Duration,
        last_error: String,
    },

    #[error(
        "keepalived.data and keepalived.stats are not synced (only in data: {only_in_data:?}, only in stats: {only_in_stats:?}, duplicated: {duplicated:?})"
    )]
    SnapshotDesynced {
        only_in_data: Vec<String>,
        only_in_stats: Vec<String>,
        duplicated: Vec<String>,
    },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("transport error: {0}")]
    Transport(#[from] common::Error),
}

impl Error {
    /// Create a new version-unavailable error.
    pub fn version_unavailable(msg: impl fmt::Display) -> Self {
        Error::VersionUnavailable(msg.to_string())
    }

    /// Create a new signal resolution error.
    pub fn signal_resolution(signal: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Error::SignalResolutionFailed {
            signal: signal.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Malformed dump content, with enough context to find the offending line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: invalid value {value:?} for {key:?}: {reason}")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
        reason: String,
    },

    #[error("line {line}: malformed line {content:?}")]
    Malformed { line: usize, content: String },

    #[error("line {line}: instance {instance:?} declares {expected} virtual IPs but only {found} follow")]
    TruncatedVirtualIps {
        line: usize,
        instance: String,
        expected: usize,
        found: usize,
    },

    #[error("block {name:?} ends without required field {field:?}")]
    MissingField { name: String, field: &'static str },

    #[error("invalid JSON dump: {0}")]
    Json(String),

    #[error("read error: {0}")]
    Read(String),
}

impl ParseError {
    pub(crate) fn invalid(
        line: usize,
        key: &str,
        value: &str,
        reason: impl fmt::Display,
    ) -> Self {
        ParseError::InvalidValue {
            line,
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        ParseError::Read(err.to_string())
    }
}
