//! Resolution of logical dump requests to concrete OS signal numbers.

use crate::error::{Error, Result};
use crate::host::{ControlCommand, KeepalivedHost};
use crate::version::Capabilities;
use std::collections::HashMap;
use std::fmt;
use tracing::info;

/// A logical request keepalived answers by writing a dump file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalName {
    /// Instance dump (`keepalived.data`)
    Data,
    /// Statistics dump (`keepalived.stats`)
    Stats,
    /// JSON dump (`keepalived.json`)
    Json,
}

impl SignalName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalName::Data => "DATA",
            SignalName::Stats => "STATS",
            SignalName::Json => "JSON",
        }
    }

    /// Fixed signal used by daemons that cannot be asked for it.
    pub fn legacy_signal(&self) -> Option<i32> {
        match self {
            SignalName::Data => Some(libc::SIGUSR1),
            SignalName::Stats => Some(libc::SIGUSR2),
            SignalName::Json => None,
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse `--signum` output, which is a bare integer on some releases and a
/// JSON-encoded one (possibly quoted, possibly with a newline) on others.
pub fn parse_signal_number(output: &str) -> std::result::Result<i32, String> {
    let digits: String = output.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(format!("no signal number in {:?}", output));
    }
    digits
        .parse()
        .map_err(|e| format!("invalid signal number {:?}: {}", output, e))
}

/// Immutable mapping from logical names to signal numbers.
///
/// Built once at startup and shared read-only by every acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalResolver {
    signals: HashMap<SignalName, i32>,
}

impl SignalResolver {
    /// Resolve every name in `names`, failing on the first one that cannot
    /// be mapped.
    pub async fn resolve_all<H: KeepalivedHost + ?Sized>(
        host: &H,
        capabilities: &Capabilities,
        names: &[SignalName],
    ) -> Result<Self> {
        let mut signals = HashMap::with_capacity(names.len());
        for name in names {
            let signal = Self::resolve_one(host, capabilities, *name).await?;
            info!(
                signal = %name,
                number = signal,
                dynamic = capabilities.dynamic_signals,
                "Resolved keepalived signal"
            );
            signals.insert(*name, signal);
        }
        Ok(Self { signals })
    }

    async fn resolve_one<H: KeepalivedHost + ?Sized>(
        host: &H,
        capabilities: &Capabilities,
        name: SignalName,
    ) -> Result<i32> {
        if !capabilities.dynamic_signals {
            return name.legacy_signal().ok_or_else(|| {
                Error::signal_resolution(name, "not supported by this keepalived version")
            });
        }

        let output = host
            .run_control_command(ControlCommand::SignalNumber(name))
            .await
            .map_err(|e| Error::signal_resolution(name, e))?;

        parse_signal_number(&output.stdout).map_err(|e| Error::signal_resolution(name, e))
    }

    /// Build a resolver from already-known numbers.
    pub fn from_signals(signals: impl IntoIterator<Item = (SignalName, i32)>) -> Self {
        Self {
            signals: signals.into_iter().collect(),
        }
    }

    /// Signal number for `name`.
    pub fn signal(&self, name: SignalName) -> Result<i32> {
        self.signals
            .get(&name)
            .copied()
            .ok_or_else(|| Error::signal_resolution(name, "was not resolved at startup"))
    }
}
