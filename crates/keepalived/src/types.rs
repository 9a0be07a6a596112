//! Keepalived snapshot data model.
//!
//! Every type here is built fresh by one acquisition and never mutated
//! afterwards; the exporter only reads it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name of the JSON dump.
pub const JSON_DUMP_FILE: &str = "keepalived.json";

/// File name of the statistics dump.
pub const STATS_DUMP_FILE: &str = "keepalived.stats";

/// File name of the instance (data) dump.
pub const DATA_DUMP_FILE: &str = "keepalived.data";

/// VRRP instance state as reported by keepalived.
///
/// The numeric values match the daemon's own encoding, which is also
/// what the JSON dump carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VRRPState {
    Init = 0,
    Backup = 1,
    Master = 2,
    Fault = 3,
}

impl VRRPState {
    /// All states in numeric order.
    pub const ALL: [VRRPState; 4] = [
        VRRPState::Init,
        VRRPState::Backup,
        VRRPState::Master,
        VRRPState::Fault,
    ];

    /// Numeric value as exported in metrics.
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

impl fmt::Display for VRRPState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VRRPState::Init => write!(f, "INIT"),
            VRRPState::Backup => write!(f, "BACKUP"),
            VRRPState::Master => write!(f, "MASTER"),
            VRRPState::Fault => write!(f, "FAULT"),
        }
    }
}

impl FromStr for VRRPState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INIT" => Ok(VRRPState::Init),
            "BACKUP" => Ok(VRRPState::Backup),
            "MASTER" => Ok(VRRPState::Master),
            "FAULT" => Ok(VRRPState::Fault),
            other => Err(format!("unknown VRRP state {:?}", other)),
        }
    }
}

impl TryFrom<i64> for VRRPState {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        VRRPState::ALL
            .into_iter()
            .find(|state| state.as_i64() == value)
            .ok_or_else(|| format!("VRRP state {} out of range", value))
    }
}

impl From<VRRPState> for i64 {
    fn from(state: VRRPState) -> Self {
        state.as_i64()
    }
}

/// A virtual IP entry, kept as the raw token keepalived printed.
///
/// The token looks like `192.168.1.10/32 dev eth0 scope global`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualIp(String);

impl VirtualIp {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address part, which is always the first field.
    pub fn address(&self) -> &str {
        self.0.split_whitespace().next().unwrap_or("")
    }

    /// The interface named after `dev`, or the third field when the
    /// `dev` marker is missing.
    pub fn interface(&self) -> Option<&str> {
        let fields: Vec<&str> = self.0.split_whitespace().collect();
        fields
            .iter()
            .position(|f| *f == "dev")
            .and_then(|i| fields.get(i + 1))
            .or_else(|| fields.get(2))
            .copied()
    }
}

impl fmt::Display for VirtualIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration and runtime state of one VRRP instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VRRPInstance {
    /// Instance name, the join key between dumps
    #[serde(rename = "iname")]
    pub name: String,

    /// Current state
    pub state: VRRPState,

    /// State the instance is trying to reach
    #[serde(rename = "wantstate")]
    pub want_state: VRRPState,

    /// Bound network interface
    #[serde(rename = "ifp_ifname", default)]
    pub interface: String,

    /// Gratuitous ARP delay in seconds
    #[serde(rename = "garp_delay", default)]
    pub garp_delay: u64,

    /// Virtual router ID
    pub vrid: u64,

    /// Virtual IPs in dump order
    #[serde(rename = "vips", default)]
    pub virtual_ips: Vec<VirtualIp>,
}

/// Cumulative per-instance VRRP counters.
///
/// Values are instantaneous totals as keepalived reports them, not deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VRRPCounters {
    pub advert_rcvd: u64,
    pub advert_sent: u64,
    pub become_master: u64,
    pub release_master: u64,
    pub packet_len_err: u64,
    pub advert_interval_err: u64,
    pub ip_ttl_err: u64,
    pub invalid_type_rcvd: u64,
    pub addr_list_err: u64,
    #[serde(rename = "invalid_authtype")]
    pub invalid_auth_type: u64,
    #[serde(rename = "authtype_mismatch")]
    pub auth_type_mismatch: u64,
    pub auth_failure: u64,
    pub pri_zero_rcvd: u64,
    pub pri_zero_sent: u64,
}

/// Last known result of a tracked script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptStatus {
    Bad = 0,
    Good = 1,
}

impl fmt::Display for ScriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptStatus::Bad => write!(f, "BAD"),
            ScriptStatus::Good => write!(f, "GOOD"),
        }
    }
}

impl FromStr for ScriptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BAD" => Ok(ScriptStatus::Bad),
            "GOOD" => Ok(ScriptStatus::Good),
            other => Err(format!("unknown script status {:?}", other)),
        }
    }
}

/// Run state of a tracked script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptState {
    Idle = 0,
    Running = 1,
    RequestedTermination = 2,
    ForcingTermination = 3,
}

impl fmt::Display for ScriptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptState::Idle => write!(f, "idle"),
            ScriptState::Running => write!(f, "running"),
            ScriptState::RequestedTermination => write!(f, "requested termination"),
            ScriptState::ForcingTermination => write!(f, "forcing termination"),
        }
    }
}

impl FromStr for ScriptState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(ScriptState::Idle),
            "running" => Ok(ScriptState::Running),
            "requested termination" => Ok(ScriptState::RequestedTermination),
            "forcing termination" => Ok(ScriptState::ForcingTermination),
            other => Err(format!("unknown script state {:?}", other)),
        }
    }
}

/// A tracked (`vrrp_script`) health script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VRRPScript {
    pub name: String,
    pub status: ScriptStatus,
    /// Absent on daemons that predate script state reporting
    pub state: Option<ScriptState>,
}

/// One instance joined with its counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VRRP {
    #[serde(rename = "data")]
    pub instance: VRRPInstance,
    #[serde(rename = "stats", default)]
    pub counters: VRRPCounters,
}

/// One consistent read of the daemon's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Instances with their counters, in dump order
    pub vrrps: Vec<VRRP>,
    /// Tracked scripts, in dump order
    pub scripts: Vec<VRRPScript>,
}

impl Snapshot {
    /// Look up an instance by name.
    pub fn vrrp(&self, name: &str) -> Option<&VRRP> {
        self.vrrps.iter().find(|v| v.instance.name == name)
    }
}

/// Locations of the three dump files inside the daemon's dump directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpPaths {
    pub json: PathBuf,
    pub stats: PathBuf,
    pub data: PathBuf,
}

impl DumpPaths {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            json: dir.join(JSON_DUMP_FILE),
            stats: dir.join(STATS_DUMP_FILE),
            data: dir.join(DATA_DUMP_FILE),
        }
    }
}

impl Default for DumpPaths {
    fn default() -> Self {
        Self::new("/tmp")
    }
}
