//! Ways of reaching the keepalived daemon.
//!
//! Each transport implements [`KeepalivedHost`] for one deployment shape.
//! Dump files are always read from the local dump directory, which the
//! daemon shares with the exporter.

pub mod container;
pub mod endpoint;
pub mod host;

pub use container::ContainerHost;
pub use endpoint::EndpointHost;
pub use host::LocalHost;

use crate::config::{Config, TransportKind};
use keepalived::{CommandOutput, KeepalivedHost};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Binary name of the daemon.
pub const KEEPALIVED: &str = "keepalived";

/// Limit for a single control command when none is configured.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the transport selected by `config`.
pub fn from_config(config: &Config) -> common::Result<Arc<dyn KeepalivedHost>> {
    let timeout = config.keepalived.request_timeout;
    let host: Arc<dyn KeepalivedHost> = match config.transport() {
        TransportKind::Host { pid_path } => {
            Arc::new(LocalHost::new(pid_path).with_timeout(timeout))
        }
        TransportKind::Container { name } => {
            Arc::new(ContainerHost::new(name).with_timeout(timeout))
        }
        TransportKind::Endpoint { url } => Arc::new(EndpointHost::new(url, timeout)?),
    };
    Ok(host)
}

/// Run `program` to completion and capture both streams.
///
/// A non-zero exit status is an error carrying whatever the program
/// printed. A program still running after `timeout` is killed.
pub(crate) async fn run_command(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> common::Result<CommandOutput> {
    debug!(program, ?args, "Running command");

    let child = Command::new(program).args(args).kill_on_drop(true).output();
    let output = tokio::time::timeout(timeout, child)
        .await
        .map_err(|_| common::Error::command(program, format!("timed out after {:?}", timeout)))?
        .map_err(|e| common::Error::command(program, e))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let detail = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        return Err(common::Error::command(
            program,
            format!("{}: {}", output.status, detail),
        ));
    }

    Ok(CommandOutput::new(stdout, stderr))
}
