//! Transport-level error types shared by every way of reaching keepalived.

use std::fmt;

/// A specialized Result type for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to the keepalived daemon, wherever it runs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("command `{program}` failed: {message}")]
    Command { program: String, message: String },

    #[error("HTTP agent error: {0}")]
    Http(String),

    #[error("PID file error: {0}")]
    Pid(String),

    #[error("Signal delivery error: {0}")]
    Signal(String),
}

impl Error {
    /// Create a new command error.
    pub fn command(program: impl Into<String>, msg: impl fmt::Display) -> Self {
        Error::Command {
            program: program.into(),
            message: msg.to_string(),
        }
    }

    /// Create a new HTTP agent error.
    pub fn http(msg: impl fmt::Display) -> Self {
        Error::Http(msg.to_string())
    }

    /// Create a new PID file error.
    pub fn pid(msg: impl fmt::Display) -> Self {
        Error::Pid(msg.to_string())
    }

    /// Create a new signal delivery error.
    pub fn signal(msg: impl fmt::Display) -> Self {
        Error::Signal(msg.to_string())
    }
}
