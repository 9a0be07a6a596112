//! Prometheus exporter for keepalived.
//!
//! Every scrape asks the daemon for a fresh snapshot of its VRRP
//! instances and tracked scripts and renders it as metrics.
//!
//! # Components
//!
//! - **Transports**: reach keepalived on this host, in a docker container,
//!   or through an HTTP agent
//! - **Exporter**: serializes acquisitions and runs the optional per-VIP
//!   check script
//! - **Metrics**: builds a fresh registry from each snapshot
//! - **HTTP server**: serves the metrics endpoint and a landing page

pub mod check_script;
pub mod config;
pub mod exporter;
pub mod http_server;
pub mod metrics;
pub mod transport;

pub use check_script::CheckScript;
pub use config::{Config, ConfigError, TransportKind};
pub use exporter::{Exporter, ExporterError, run};
pub use http_server::MetricsServer;
pub use metrics::{ScrapeMetrics, VipChecks};
