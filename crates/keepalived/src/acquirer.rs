//! Snapshot acquisition: signal, wait for the dump, parse, correlate.

use crate::error::{Error, Result};
use crate::host::{DumpReader, KeepalivedHost};
use crate::parser::{self, DataDump, InstanceCounters};
use crate::retry::{Clock, RetryPolicy, TokioClock};
use crate::signal::{SignalName, SignalResolver};
use crate::types::{DumpPaths, Snapshot, VRRP};
use crate::version::{self, Capabilities, Version};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Which dump format the acquirer asks keepalived for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpMode {
    /// `keepalived.data` + `keepalived.stats`
    #[default]
    Text,
    /// `keepalived.json`
    Json,
}

impl DumpMode {
    /// Signals this mode needs resolved at startup.
    pub fn signals(&self) -> &'static [SignalName] {
        match self {
            DumpMode::Text => &[SignalName::Data, SignalName::Stats],
            DumpMode::Json => &[SignalName::Json],
        }
    }
}

/// Acquirer settings.
#[derive(Debug, Clone, Default)]
pub struct AcquirerConfig {
    pub mode: DumpMode,
    pub paths: DumpPaths,
    pub retry: RetryPolicy,
}

/// Produces independent snapshots of the daemon's state.
///
/// Holds only read-only state after construction, so `acquire` can be
/// called from several tasks at once.
pub struct SnapshotAcquirer {
    host: Arc<dyn KeepalivedHost>,
    clock: Arc<dyn Clock>,
    signals: SignalResolver,
    config: AcquirerConfig,
    version: Option<Version>,
    capabilities: Capabilities,
}

impl SnapshotAcquirer {
    /// Probe the daemon and resolve every signal the configured mode needs.
    ///
    /// A failed version probe is tolerated; a failed signal resolution is not.
    pub async fn initialize(host: Arc<dyn KeepalivedHost>, config: AcquirerConfig) -> Result<Self> {
        let version = version::probe_version_or_latest(host.as_ref()).await;
        let capabilities = Capabilities::for_version(version.as_ref());
        let signals =
            SignalResolver::resolve_all(host.as_ref(), &capabilities, config.mode.signals()).await?;

        info!(
            host = host.name(),
            version = version.map(|v| v.to_string()).unwrap_or_else(|| "unknown".into()),
            mode = ?config.mode,
            "Snapshot acquirer initialized"
        );

        Ok(Self::new(host, signals, config, version))
    }

    /// Build an acquirer from an already resolved signal mapping.
    pub fn new(
        host: Arc<dyn KeepalivedHost>,
        signals: SignalResolver,
        config: AcquirerConfig,
        version: Option<Version>,
    ) -> Self {
        Self {
            host,
            clock: Arc::new(TokioClock),
            signals,
            config,
            capabilities: Capabilities::for_version(version.as_ref()),
            version,
        }
    }

    /// Replace the clock driving the retry loop.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Probed daemon version, if the probe succeeded.
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn mode(&self) -> DumpMode {
        self.config.mode
    }

    /// Take a fresh snapshot.
    pub async fn acquire(&self) -> Result<Snapshot> {
        match self.config.mode {
            DumpMode::Json => self.acquire_json().await,
            DumpMode::Text => self.acquire_text().await,
        }
    }

    async fn acquire_json(&self) -> Result<Snapshot> {
        let reader = self.request_dump(SignalName::Json, &self.config.paths.json).await?;
        let vrrps = parser::parse_json(reader)?;
        debug!(instances = vrrps.len(), "Decoded JSON dump");

        Ok(Snapshot {
            vrrps,
            scripts: Vec::new(),
        })
    }

    async fn acquire_text(&self) -> Result<Snapshot> {
        let reader = self
            .request_dump(SignalName::Stats, &self.config.paths.stats)
            .await?;
        let counters = parser::parse_stats(reader)?;

        let reader = self.request_dump(SignalName::Data, &self.config.paths.data).await?;
        let data = parser::parse_data(reader)?;
        debug!(
            instances = data.instances.len(),
            scripts = data.scripts.len(),
            "Parsed text dumps"
        );

        join(data, counters)
    }

    async fn request_dump(&self, name: SignalName, path: &Path) -> Result<DumpReader> {
        let signal = self.signals.signal(name)?;
        let previous = self.host.dump_stamp(path).await;
        self.host.send_signal(signal).await?;
        self.config
            .retry
            .open(self.host.as_ref(), self.clock.as_ref(), path, previous)
            .await
    }
}

/// Join instances with their counters by instance name.
///
/// Both dumps must describe exactly the same set of instances.
pub fn join(data: DataDump, counters: Vec<InstanceCounters>) -> Result<Snapshot> {
    let mut duplicated = BTreeSet::new();
    let data_names = unique_names(
        data.instances.iter().map(|i| i.name.as_str()),
        &mut duplicated,
    );
    let stats_names = unique_names(counters.iter().map(|c| c.name.as_str()), &mut duplicated);

    if data_names != stats_names || !duplicated.is_empty() {
        return Err(Error::SnapshotDesynced {
            only_in_data: data_names
                .difference(&stats_names)
                .map(|s| s.to_string())
                .collect(),
            only_in_stats: stats_names
                .difference(&data_names)
                .map(|s| s.to_string())
                .collect(),
            duplicated: duplicated.into_iter().map(str::to_string).collect(),
        });
    }

    let mut by_name: HashMap<String, _> = counters
        .into_iter()
        .map(|c| (c.name, c.counters))
        .collect();

    let vrrps = data
        .instances
        .into_iter()
        .map(|instance| {
            let counters = by_name.remove(&instance.name).unwrap_or_default();
            VRRP { instance, counters }
        })
        .collect();

    Ok(Snapshot {
        vrrps,
        scripts: data.scripts,
    })
}

/// Collect `names`, recording any seen more than once in `duplicated`.
fn unique_names<'a>(
    names: impl Iterator<Item = &'a str>,
    duplicated: &mut BTreeSet<&'a str>,
) -> BTreeSet<&'a str> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            duplicated.insert(name);
        }
    }
    seen
}
