//! Scrape orchestration: one acquisition per scrape, rendered as metrics.

use crate::check_script::CheckScript;
use crate::config::{Config, ConfigError};
use crate::http_server::MetricsServer;
use crate::metrics::{ScrapeMetrics, VipChecks};
use crate::transport;
use keepalived::{DumpMode, KeepalivedHost, Snapshot, SnapshotAcquirer, version};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Startup failures
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Keepalived(#[from] keepalived::Error),

    #[error(transparent)]
    Transport(#[from] common::Error),

    #[error("keepalived was built without --enable-json; disable keepalived.json or rebuild it")]
    JsonUnsupported,

    #[error("HTTP server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Turns scrapes into snapshots.
pub struct Exporter {
    acquirer: SnapshotAcquirer,
    check_script: Option<CheckScript>,
    // Two scrapes must never wait on the same dump file.
    acquire_lock: Mutex<()>,
}

impl Exporter {
    pub fn new(acquirer: SnapshotAcquirer, check_script: Option<CheckScript>) -> Self {
        Self {
            acquirer,
            check_script,
            acquire_lock: Mutex::new(()),
        }
    }

    /// Build an exporter for `config` on top of `host`.
    ///
    /// Fails when JSON mode is requested from a daemon that cannot produce
    /// JSON dumps, or when a needed signal cannot be resolved.
    pub async fn initialize(
        config: &Config,
        host: Arc<dyn KeepalivedHost>,
    ) -> Result<Self, ExporterError> {
        let acquirer_config = config.to_acquirer_config();

        if acquirer_config.mode == DumpMode::Json {
            if !version::probe_json_support(host.as_ref()).await? {
                return Err(ExporterError::JsonUnsupported);
            }
            info!("keepalived supports JSON dumps");
        }

        let acquirer = SnapshotAcquirer::initialize(host, acquirer_config).await?;
        let check_script = config
            .check_script
            .path
            .as_ref()
            .map(|path| CheckScript::new(path.clone(), config.check_script.timeout));

        Ok(Self::new(acquirer, check_script))
    }

    /// Acquire a snapshot and render it.
    pub async fn scrape(&self) -> ScrapeMetrics {
        let snapshot = {
            let _guard = self.acquire_lock.lock().await;
            self.acquirer.acquire().await
        };

        match snapshot {
            Ok(snapshot) => {
                let checks = self.run_check_script(&snapshot).await;
                ScrapeMetrics::from_snapshot(
                    &snapshot,
                    &self.acquirer.capabilities(),
                    checks.as_ref(),
                )
            }
            Err(e) => {
                error!(error = %e, mode = ?self.acquirer.mode(), "No data found to be exported");
                ScrapeMetrics::down()
            }
        }
    }

    async fn run_check_script(&self, snapshot: &Snapshot) -> Option<VipChecks> {
        let script = self.check_script.as_ref()?;
        let mut checks = VipChecks::new();

        for vrrp in &snapshot.vrrps {
            for vip in &vrrp.instance.virtual_ips {
                let address = vip.address();
                if checks.contains_key(address) {
                    continue;
                }
                let ok = script.check(address).await;
                checks.insert(address.to_string(), ok);
            }
        }

        debug!(vips = checks.len(), "Ran check script");
        Some(checks)
    }
}

/// Load everything from `config` and serve until the listener fails.
pub async fn run(config: Config) -> Result<(), ExporterError> {
    let host = transport::from_config(&config)?;
    info!(transport = host.name(), json = config.keepalived.json, "Starting keepalived exporter");

    let exporter = Arc::new(Exporter::initialize(&config, host).await?);

    MetricsServer::new(
        exporter,
        config.server.listen_address.clone(),
        config.server.metrics_path.clone(),
    )
    .run()
    .await?;

    info!("Keepalived exporter stopped");
    Ok(())
}
