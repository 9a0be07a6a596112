//! keepalived running as a process on this host.

use super::{DEFAULT_COMMAND_TIMEOUT, KEEPALIVED, run_command};
use async_trait::async_trait;
use keepalived::{CommandOutput, ControlCommand, KeepalivedHost};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runs the keepalived binary locally and signals the daemon found in
/// its PID file.
pub struct LocalHost {
    pid_path: PathBuf,
    timeout: Duration,
}

impl LocalHost {
    pub fn new(pid_path: impl Into<PathBuf>) -> Self {
        Self {
            pid_path: pid_path.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Limit for each keepalived control command.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pid_path(&self) -> &Path {
        &self.pid_path
    }

    async fn read_pid(&self) -> common::Result<libc::pid_t> {
        let contents = tokio::fs::read_to_string(&self.pid_path)
            .await
            .map_err(|e| common::Error::pid(format!("{}: {}", self.pid_path.display(), e)))?;

        parse_pid(&contents).ok_or_else(|| {
            common::Error::pid(format!(
                "invalid pid {:?} in {}",
                contents.trim(),
                self.pid_path.display()
            ))
        })
    }
}

fn parse_pid(contents: &str) -> Option<libc::pid_t> {
    contents.trim().parse().ok().filter(|pid| *pid > 0)
}

#[async_trait]
impl KeepalivedHost for LocalHost {
    async fn run_control_command(&self, command: ControlCommand) -> common::Result<CommandOutput> {
        run_command(KEEPALIVED, &command.args(), self.timeout).await
    }

    async fn send_signal(&self, signal: i32) -> common::Result<()> {
        let pid = self.read_pid().await?;

        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid, signal) };
        if rc != 0 {
            return Err(common::Error::signal(format!(
                "kill({}, {}): {}",
                pid,
                signal,
                io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "host"
    }
}
