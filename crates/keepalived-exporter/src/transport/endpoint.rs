//! keepalived reached through a small HTTP agent running next to it.
//!
//! The agent exposes three GET routes:
//! - `/version` returns the `keepalived -v` report
//! - `/signal/num?signal=<NAME>` returns `keepalived --signum=<NAME>`
//! - `/signal?signal=<n>` delivers signal `n` to the daemon

use async_trait::async_trait;
use keepalived::{CommandOutput, ControlCommand, KeepalivedHost};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

pub struct EndpointHost {
    base_url: String,
    client: reqwest::Client,
}

impl EndpointHost {
    /// Create a transport for the agent at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> common::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(common::Error::http)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route)
    }

    async fn get(&self, route: &str, query: &[(&str, String)]) -> common::Result<String> {
        let url = self.url(route);
        debug!(%url, ?query, "Calling keepalived agent");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| common::Error::http(format!("{}: {}", url, e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(%url, status = status.as_u16(), "Agent request was not successful");
            return Err(common::Error::http(format!("{} returned {}", url, status)));
        }

        response
            .text()
            .await
            .map_err(|e| common::Error::http(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl KeepalivedHost for EndpointHost {
    async fn run_control_command(&self, command: ControlCommand) -> common::Result<CommandOutput> {
        let body = match command {
            ControlCommand::Version => self.get("version", &[]).await?,
            ControlCommand::SignalNumber(name) => {
                self.get("signal/num", &[("signal", name.to_string())])
                    .await?
            }
        };
        Ok(CommandOutput::new(body, ""))
    }

    async fn send_signal(&self, signal: i32) -> common::Result<()> {
        self.get("signal", &[("signal", signal.to_string())])
            .await
            .map(|_| ())
    }

    fn name(&self) -> &'static str {
        "endpoint"
    }
}
