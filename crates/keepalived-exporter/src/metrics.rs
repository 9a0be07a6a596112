//! Prometheus metrics for one keepalived snapshot.
//!
//! A fresh registry is built for every scrape, so instances and scripts
//! that disappear from the daemon never linger as stale series.

use keepalived::{Capabilities, Snapshot, VRRPCounters, VRRPInstance};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::collections::HashMap;

/// Labels for per-instance metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct InstanceLabels {
    /// Instance name
    pub iname: String,
    /// Interface the instance runs on
    pub intf: String,
    /// Virtual router ID
    pub vrid: String,
    /// Current state (INIT, BACKUP, MASTER, FAULT)
    pub state: String,
}

/// Labels for per-VIP metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct VipLabels {
    pub iname: String,
    /// Interface the address is configured on
    pub intf: String,
    pub vrid: String,
    pub ip_address: String,
}

/// Labels for tracked script metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ScriptLabels {
    pub name: String,
}

/// Per-VIP check script results keyed by address.
pub type VipChecks = HashMap<String, bool>;

type CounterField = fn(&VRRPCounters) -> u64;

const INSTANCE_COUNTERS: [(&str, &str, CounterField); 14] = [
    ("keepalived_advert_rcvd", "Advertisements received", |c| c.advert_rcvd),
    ("keepalived_advert_sent", "Advertisements sent", |c| c.advert_sent),
    ("keepalived_become_master", "Became master", |c| c.become_master),
    ("keepalived_release_master", "Released master", |c| c.release_master),
    ("keepalived_packet_len_err", "Packet length errors", |c| c.packet_len_err),
    ("keepalived_advert_interval_err", "Advertisement interval errors", |c| c.advert_interval_err),
    ("keepalived_ip_ttl_err", "TTL errors", |c| c.ip_ttl_err),
    ("keepalived_invalid_type_rcvd", "Invalid type errors", |c| c.invalid_type_rcvd),
    ("keepalived_addr_list_err", "Address list errors", |c| c.addr_list_err),
    ("keepalived_invalid_authtype", "Authentication invalid", |c| c.invalid_auth_type),
    ("keepalived_authtype_mismatch", "Authentication mismatch", |c| c.auth_type_mismatch),
    ("keepalived_auth_failure", "Authentication failure", |c| c.auth_failure),
    ("keepalived_pri_zero_rcvd", "Priority zero received", |c| c.pri_zero_rcvd),
    ("keepalived_pri_zero_sent", "Priority zero sent", |c| c.pri_zero_sent),
];

fn gauge_value(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Metrics of a single scrape
pub struct ScrapeMetrics {
    /// Prometheus registry
    pub registry: Registry,
}

impl ScrapeMetrics {
    /// Metrics for a failed acquisition: `keepalived_up 0` and nothing else.
    pub fn down() -> Self {
        let mut registry = Registry::default();
        Self::register_up(&mut registry, false);
        Self { registry }
    }

    /// Metrics describing `snapshot`.
    ///
    /// `vip_checks` is present only when a check script is configured.
    pub fn from_snapshot(
        snapshot: &Snapshot,
        capabilities: &Capabilities,
        vip_checks: Option<&VipChecks>,
    ) -> Self {
        let mut registry = Registry::default();
        Self::register_up(&mut registry, true);

        let counters: Vec<Family<InstanceLabels, Counter>> = INSTANCE_COUNTERS
            .iter()
            .map(|(name, help, _)| {
                let family = Family::<InstanceLabels, Counter>::default();
                registry.register(*name, *help, family.clone());
                family
            })
            .collect();

        let garp_delay = Family::<InstanceLabels, Gauge>::default();
        registry.register(
            "keepalived_garp_delay",
            "Gratuitous ARP delay",
            garp_delay.clone(),
        );

        let vrrp_state = Family::<VipLabels, Gauge>::default();
        registry.register("keepalived_vrrp_state", "State of vrrp", vrrp_state.clone());

        let check_script_status = Family::<VipLabels, Gauge>::default();
        if vip_checks.is_some() {
            registry.register(
                "keepalived_exporter_check_script_status",
                "Check Script status for each VIP",
                check_script_status.clone(),
            );
        }

        for vrrp in &snapshot.vrrps {
            let instance = &vrrp.instance;
            let labels = instance_labels(instance);

            for (family, (_, _, field)) in counters.iter().zip(INSTANCE_COUNTERS.iter()) {
                family.get_or_create(&labels).inc_by(field(&vrrp.counters));
            }
            garp_delay
                .get_or_create(&labels)
                .set(gauge_value(instance.garp_delay));

            for vip in &instance.virtual_ips {
                let labels = VipLabels {
                    iname: instance.name.clone(),
                    intf: vip.interface().unwrap_or(&instance.interface).to_string(),
                    vrid: instance.vrid.to_string(),
                    ip_address: vip.address().to_string(),
                };

                vrrp_state
                    .get_or_create(&labels)
                    .set(instance.state.as_i64());

                if let Some(checks) = vip_checks {
                    let ok = checks.get(vip.address()).copied().unwrap_or(false);
                    check_script_status
                        .get_or_create(&labels)
                        .set(i64::from(ok));
                }
            }
        }

        let script_status = Family::<ScriptLabels, Gauge>::default();
        registry.register(
            "keepalived_script_status",
            "Tracker Script Status",
            script_status.clone(),
        );
        let script_state = Family::<ScriptLabels, Gauge>::default();
        if capabilities.script_state {
            registry.register(
                "keepalived_script_state",
                "Tracker Script State",
                script_state.clone(),
            );
        }

        for script in &snapshot.scripts {
            let labels = ScriptLabels {
                name: script.name.clone(),
            };
            script_status
                .get_or_create(&labels)
                .set(script.status as i64);

            if let (true, Some(state)) = (capabilities.script_state, script.state) {
                script_state.get_or_create(&labels).set(state as i64);
            }
        }

        Self { registry }
    }

    fn register_up(registry: &mut Registry, up: bool) {
        let gauge = Gauge::<i64>::default();
        gauge.set(i64::from(up));
        registry.register("keepalived_up", "Status", gauge);
    }

    /// Encode in the Prometheus text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

fn instance_labels(instance: &VRRPInstance) -> InstanceLabels {
    InstanceLabels {
        iname: instance.name.clone(),
        intf: instance.interface.clone(),
        vrid: instance.vrid.to_string(),
        state: instance.state.to_string(),
    }
}
