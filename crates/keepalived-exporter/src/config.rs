//! Configuration loading and validation for the keepalived exporter

use keepalived::{AcquirerConfig, DumpMode, DumpPaths, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub keepalived: KeepalivedSettings,

    #[serde(default)]
    pub acquisition: AcquisitionSettings,

    #[serde(default)]
    pub check_script: CheckScriptSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.server.validate()?;
        self.keepalived.validate()?;
        self.acquisition.validate()?;
        self.check_script.validate()?;
        Ok(())
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerSettings {
    #[validate(length(min = 1))]
    pub listen_address: String,

    #[validate(custom = "validate_metrics_path")]
    pub metrics_path: String,
}

/// Where keepalived runs and how its dumps are requested
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_transport"))]
pub struct KeepalivedSettings {
    /// Ask for the JSON dump instead of the two text dumps
    pub json: bool,

    /// Directory the daemon writes its dumps into, as seen by the exporter
    #[validate(custom = "validate_dump_dir")]
    pub dump_dir: PathBuf,

    /// PID file of a daemon running on this host
    pub pid_path: PathBuf,

    /// Docker container running the daemon
    pub container_name: Option<String>,

    /// Base URL of an HTTP agent next to the daemon
    #[validate(custom = "validate_endpoint")]
    pub endpoint: Option<String>,

    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Dump file wait settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_backoff"))]
pub struct AcquisitionSettings {
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_initial_interval")]
    pub initial_interval: Duration,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_max_elapsed")]
    pub max_elapsed: Duration,
}

/// Optional per-VIP check script
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CheckScriptSettings {
    #[validate(length(min = 1))]
    pub path: Option<String>,

    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

/// How the exporter reaches the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    Host { pid_path: PathBuf },
    Container { name: String },
    Endpoint { url: String },
}

// Default implementations

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:9165".to_string(),
            metrics_path: "/metrics".to_string(),
        }
    }
}

impl Default for KeepalivedSettings {
    fn default() -> Self {
        Self {
            json: false,
            dump_dir: PathBuf::from("/tmp"),
            pid_path: PathBuf::from("/var/run/keepalived.pid"),
            container_name: None,
            endpoint: None,
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            initial_interval: policy.initial_interval,
            max_elapsed: policy.max_elapsed,
        }
    }
}

impl Default for CheckScriptSettings {
    fn default() -> Self {
        Self {
            path: None,
            timeout: Duration::from_secs(5),
        }
    }
}

// Custom validators

fn validate_metrics_path(path: &str) -> Result<(), ValidationError> {
    if !path.starts_with('/') {
        return Err(ValidationError::new("metrics_path_not_absolute"));
    }
    Ok(())
}

fn validate_dump_dir(dir: &Path) -> Result<(), ValidationError> {
    if !dir.is_absolute() {
        return Err(ValidationError::new("dump_dir_not_absolute"));
    }
    Ok(())
}

fn validate_endpoint(url: &str) -> Result<(), ValidationError> {
    let trimmed = url.trim();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(ValidationError::new("endpoint_not_http"));
    }
    Ok(())
}

fn validate_transport(settings: &KeepalivedSettings) -> Result<(), ValidationError> {
    if settings.container_name.is_some() && settings.endpoint.is_some() {
        return Err(ValidationError::new("container_and_endpoint_both_set"));
    }
    Ok(())
}

fn validate_initial_interval(interval: &Duration) -> Result<(), ValidationError> {
    let millis = interval.as_millis();
    if !(1..=1_000).contains(&millis) {
        return Err(ValidationError::new("initial_interval_out_of_range"));
    }
    Ok(())
}

fn validate_max_elapsed(elapsed: &Duration) -> Result<(), ValidationError> {
    let millis = elapsed.as_millis();
    if !(10..=60_000).contains(&millis) {
        return Err(ValidationError::new("max_elapsed_out_of_range"));
    }
    Ok(())
}

fn validate_backoff(settings: &AcquisitionSettings) -> Result<(), ValidationError> {
    if settings.max_elapsed < settings.initial_interval {
        return Err(ValidationError::new("max_elapsed_below_initial_interval"));
    }
    Ok(())
}

// Configuration loading implementation

impl Config {
    /// Load configuration from default search paths
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/keepalived-exporter/config.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./keepalived-exporter.yaml"));

        paths.into_iter().find(|p| p.is_file())
    }

    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/keepalived-exporter/config.yaml"))
    }

    /// Selected transport; a container name wins over the local host and
    /// an endpoint wins over both.
    pub fn transport(&self) -> TransportKind {
        let keepalived = &self.keepalived;
        if let Some(url) = &keepalived.endpoint {
            TransportKind::Endpoint {
                url: url.trim().trim_end_matches('/').to_string(),
            }
        } else if let Some(name) = &keepalived.container_name {
            TransportKind::Container { name: name.clone() }
        } else {
            TransportKind::Host {
                pid_path: keepalived.pid_path.clone(),
            }
        }
    }

    /// Settings for the snapshot acquirer.
    pub fn to_acquirer_config(&self) -> AcquirerConfig {
        AcquirerConfig {
            mode: if self.keepalived.json {
                DumpMode::Json
            } else {
                DumpMode::Text
            },
            paths: DumpPaths::new(&self.keepalived.dump_dir),
            retry: RetryPolicy {
                initial_interval: self.acquisition.initial_interval,
                max_elapsed: self.acquisition.max_elapsed,
            },
        }
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or("info")
    }

    pub fn json_logs(&self) -> bool {
        self.logging.format.as_deref() == Some("json")
    }
}
