//! The capability seam between the core and wherever keepalived runs.
//!
//! The core never spawns processes or talks to docker/HTTP itself. A
//! transport implements [`KeepalivedHost`] once and the version probe,
//! signal resolver and acquirer only ever see the trait.

use crate::signal::SignalName;
use async_trait::async_trait;
use std::fmt;
use std::io::{self, Cursor};
use std::path::Path;
use std::time::SystemTime;

/// A control command understood by the keepalived binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// `keepalived -v`
    Version,
    /// `keepalived --signum=<NAME>`
    SignalNumber(SignalName),
}

impl ControlCommand {
    /// Command-line arguments for the keepalived binary.
    pub fn args(&self) -> Vec<String> {
        match self {
            ControlCommand::Version => vec!["-v".to_string()],
            ControlCommand::SignalNumber(name) => vec![format!("--signum={}", name)],
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "keepalived {}", self.args().join(" "))
    }
}

/// Captured output of a control command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// The stream keepalived writes diagnostics to.
    ///
    /// Local processes print the version report on stderr; transports that
    /// merge both streams hand everything back as stdout.
    pub fn diagnostic(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// A readable dump file.
pub type DumpReader = Cursor<Vec<u8>>;

/// Identifies one write of a dump file.
///
/// keepalived rewrites the same path for every dump, so a stamp taken
/// before signalling tells a fresh dump apart from the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpStamp {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl DumpStamp {
    pub fn new(len: u64, modified: Option<SystemTime>) -> Self {
        Self { len, modified }
    }
}

/// Operations the core needs from the keepalived host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeepalivedHost: Send + Sync {
    /// Run a keepalived control command and capture its output.
    async fn run_control_command(&self, command: ControlCommand) -> common::Result<CommandOutput>;

    /// Deliver a numeric signal to the keepalived process.
    async fn send_signal(&self, signal: i32) -> common::Result<()>;

    /// Open a dump file for reading.
    ///
    /// Dump directories are shared with the daemon, so every transport
    /// reads them from the local filesystem unless it says otherwise.
    async fn open_file(&self, path: &Path) -> io::Result<DumpReader> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Cursor::new(bytes))
    }

    /// Stamp of the dump currently at `path`, or `None` if there is none.
    ///
    /// Must describe the same file `open_file` reads.
    async fn dump_stamp(&self, path: &Path) -> Option<DumpStamp> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        Some(DumpStamp::new(metadata.len(), metadata.modified().ok()))
    }

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_command_args() {
        assert_eq!(ControlCommand::Version.args(), vec!["-v"]);
        assert_eq!(
            ControlCommand::SignalNumber(SignalName::Stats).args(),
            vec!["--signum=STATS"]
        );
        assert_eq!(
            ControlCommand::SignalNumber(SignalName::Json).to_string(),
            "keepalived --signum=JSON"
        );
    }

    #[test]
    fn test_diagnostic_stream() {
        let local = CommandOutput::new("", "Keepalived v2.2.8 (01/23,2023)\n");
        assert!(local.diagnostic().starts_with("Keepalived"));

        let merged = CommandOutput::new("Keepalived v2.2.8 (01/23,2023)\n", "  ");
        assert!(merged.diagnostic().starts_with("Keepalived"));
    }
}
