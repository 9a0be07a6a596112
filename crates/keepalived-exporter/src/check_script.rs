//! Operator-supplied script run once per virtual IP on every scrape.

use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

const SHELL: &str = "/bin/sh";

/// Runs `<script> <vip>` through the shell.
#[derive(Debug, Clone)]
pub struct CheckScript {
    script: String,
    timeout: Duration,
}

impl CheckScript {
    pub fn new(script: impl Into<String>, timeout: Duration) -> Self {
        Self {
            script: script.into(),
            timeout,
        }
    }

    /// Whether the script exited 0 for `vip` within the timeout.
    pub async fn check(&self, vip: &str) -> bool {
        let command_line = format!("{} {}", self.script, vip);
        let child = Command::new(SHELL)
            .arg("-c")
            .arg(&command_line)
            .kill_on_drop(true)
            .output();

        match timeout(self.timeout, child).await {
            Ok(Ok(output)) if output.status.success() => {
                debug!(vip, "Check script succeeded");
                true
            }
            Ok(Ok(output)) => {
                warn!(
                    vip,
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "Check script failed"
                );
                false
            }
            Ok(Err(e)) => {
                warn!(vip, error = %e, "Check script could not be started");
                false
            }
            Err(_) => {
                warn!(vip, timeout_ms = self.timeout.as_millis() as u64, "Check script timed out");
                false
            }
        }
    }
}
