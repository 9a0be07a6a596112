//! keepalived running inside a docker container.

use super::{DEFAULT_COMMAND_TIMEOUT, KEEPALIVED, run_command};
use async_trait::async_trait;
use keepalived::{CommandOutput, ControlCommand, KeepalivedHost};
use std::time::Duration;

const DOCKER: &str = "docker";

/// Drives the daemon through the docker CLI.
///
/// The container's dump directory must be mounted where the exporter
/// expects to read it.
pub struct ContainerHost {
    container: String,
    timeout: Duration,
}

impl ContainerHost {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Limit for each docker invocation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn exec_args(&self, command: ControlCommand) -> Vec<String> {
        let mut args = vec![
            "exec".to_string(),
            self.container.clone(),
            KEEPALIVED.to_string(),
        ];
        args.extend(command.args());
        args
    }

    fn kill_args(&self, signal: i32) -> Vec<String> {
        vec![
            "kill".to_string(),
            format!("--signal={}", signal),
            self.container.clone(),
        ]
    }
}

#[async_trait]
impl KeepalivedHost for ContainerHost {
    async fn run_control_command(&self, command: ControlCommand) -> common::Result<CommandOutput> {
        run_command(DOCKER, &self.exec_args(command), self.timeout).await
    }

    async fn send_signal(&self, signal: i32) -> common::Result<()> {
        run_command(DOCKER, &self.kill_args(signal), self.timeout)
            .await
            .map(|_| ())
            .map_err(|e| common::Error::signal(format!("container {}: {}", self.container, e)))
    }

    fn name(&self) -> &'static str {
        "container"
    }
}
