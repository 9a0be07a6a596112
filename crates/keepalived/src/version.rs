//! Daemon version probing and the capabilities derived from it.

use crate::error::{Error, Result};
use crate::host::{ControlCommand, KeepalivedHost};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// First release that answers `--signum`.
pub const DYNAMIC_SIGNALS_SINCE: Version = Version::new(1, 3, 8);

/// First release that prints the run state of tracked scripts.
pub const SCRIPT_STATE_SINCE: Version = Version::new(1, 4, 0);

/// Configure option echoed by builds that can write JSON dumps.
const JSON_BUILD_OPTION: &str = "--enable-json";

/// Semantic version of the keepalived binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = String;

    /// Accepts `major[.minor[.patch]]`, ignoring a `-pre` or `+build` suffix.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let core = s.split(['-', '+']).next().unwrap_or("");
        let parts: Vec<&str> = core.split('.').collect();
        if core.is_empty() || parts.len() > 3 {
            return Err(format!("malformed version {:?}", s));
        }

        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|e| format!("malformed version {:?}: {}", s, e))?;
        }

        Ok(Version::new(numbers[0], numbers[1], numbers[2]))
    }
}

/// Extract the version from a `keepalived -v` report.
///
/// The version is the second word of the first line, with its leading
/// `v` dropped: `Keepalived v2.2.8 (01/23,2023)`.
pub fn parse_version_output(output: &str) -> Result<Version> {
    let Some((first_line, _)) = output.split_once('\n') else {
        return Err(Error::version_unavailable(format!(
            "unexpected version output {:?}",
            output
        )));
    };

    let token = first_line.split_whitespace().nth(1).ok_or_else(|| {
        Error::version_unavailable(format!("unknown version format {:?}", first_line))
    })?;
    let token = token.strip_prefix(['v', 'V']).unwrap_or(token);

    token.parse().map_err(Error::version_unavailable)
}

async fn version_report<H: KeepalivedHost + ?Sized>(host: &H) -> Result<String> {
    let output = host
        .run_control_command(ControlCommand::Version)
        .await
        .map_err(Error::version_unavailable)?;
    Ok(output.diagnostic().to_string())
}

/// Run the version command on the host and parse its report.
pub async fn probe_version<H: KeepalivedHost + ?Sized>(host: &H) -> Result<Version> {
    let report = version_report(host).await?;
    let version = parse_version_output(&report)?;
    debug!(host = host.name(), %version, "Probed keepalived version");
    Ok(version)
}

/// Whether the daemon was built with JSON dump support.
pub async fn probe_json_support<H: KeepalivedHost + ?Sized>(host: &H) -> Result<bool> {
    let report = version_report(host).await?;
    Ok(report.contains(JSON_BUILD_OPTION))
}

/// Version-dependent features of the running daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Signal numbers must be asked for with `--signum`
    pub dynamic_signals: bool,
    /// Tracked scripts report their run state
    pub script_state: bool,
}

impl Capabilities {
    /// Capabilities of a daemon version; an unknown version is assumed to
    /// be the newest.
    pub fn for_version(version: Option<&Version>) -> Self {
        match version {
            None => Self {
                dynamic_signals: true,
                script_state: true,
            },
            Some(v) => Self {
                dynamic_signals: *v >= DYNAMIC_SIGNALS_SINCE,
                script_state: *v >= SCRIPT_STATE_SINCE,
            },
        }
    }
}

/// Probe the version, logging and swallowing a failure.
pub async fn probe_version_or_latest<H: KeepalivedHost + ?Sized>(host: &H) -> Option<Version> {
    match probe_version(host).await {
        Ok(version) => Some(version),
        Err(e) => {
            warn!(error = %e, "Version detection failed, assuming the latest keepalived");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CommandOutput, MockKeepalivedHost};

    const REPORT: &str = "Keepalived v2.2.8 (01/23,2023)\n\nCopyright(C) 2001-2023 Alexandre Cassen\n\nConfigure options: --enable-json --enable-snmp\n";

    #[test]
    fn test_parse_version_output() {
        assert_eq!(parse_version_output(REPORT).unwrap(), Version::new(2, 2, 8));
        assert_eq!(
            parse_version_output("Keepalived v1.3.5 (03/19,2017)\n").unwrap(),
            Version::new(1, 3, 5)
        );
    }

    #[test]
    fn test_parse_version_output_failures() {
        // No second line
        assert!(matches!(
            parse_version_output("Keepalived v2.2.8"),
            Err(Error::VersionUnavailable(_))
        ));
        // Single word
        assert!(parse_version_output("Keepalived\n").is_err());
        // Not a version
        assert!(parse_version_output("Keepalived vnext\n").is_err());
    }

    #[test]
    fn test_version_from_str() {
        assert_eq!("1.3".parse::<Version>().unwrap(), Version::new(1, 3, 0));
        assert_eq!("2.0.20-rc1".parse::<Version>().unwrap(), Version::new(2, 0, 20));
        assert!("1.2.3.4".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
        assert!("1.x".parse::<Version>().is_err());
    }

    #[test]
    fn test_capabilities() {
        let old = Capabilities::for_version(Some(&Version::new(1, 3, 5)));
        assert!(!old.dynamic_signals);
        assert!(!old.script_state);

        let mid = Capabilities::for_version(Some(&Version::new(1, 3, 8)));
        assert!(mid.dynamic_signals);
        assert!(!mid.script_state);

        let new = Capabilities::for_version(Some(&Version::new(1, 4, 0)));
        assert!(new.dynamic_signals);
        assert!(new.script_state);

        let unknown = Capabilities::for_version(None);
        assert!(unknown.dynamic_signals);
        assert!(unknown.script_state);
    }

    #[tokio::test]
    async fn test_probe_version_uses_diagnostic_stream() {
        let mut host = MockKeepalivedHost::new();
        host.expect_run_control_command()
            .withf(|cmd| *cmd == ControlCommand::Version)
            .returning(|_| Ok(CommandOutput::new("", REPORT)));
        host.expect_name().return_const("mock");

        assert_eq!(probe_version(&host).await.unwrap(), Version::new(2, 2, 8));
        assert!(probe_json_support(&host).await.unwrap());
    }

    #[test]
    fn test_probe_failure_falls_back_to_latest() {
        let mut host = MockKeepalivedHost::new();
        host.expect_run_control_command()
            .returning(|_| Err(common::Error::command("keepalived", "not found")));
        host.expect_name().return_const("mock");

        let version = tokio_test::block_on(probe_version_or_latest(&host));
        assert!(version.is_none());
        assert_eq!(Capabilities::for_version(version.as_ref()), Capabilities::for_version(None));
    }
}
