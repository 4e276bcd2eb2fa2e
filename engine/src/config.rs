//! Configuration
//!
//! YAML configuration for the beacon daemon. Backend choice is a tagged
//! variant so the wiring code never inspects shapes at runtime:
//!
//! ```yaml
//! docker:
//!   socket: unix:///var/run/docker.sock
//!   host-ip: 10.0.0.1
//!   label: service
//! heartbeat:
//!   interval-secs: 30
//!   grace-secs: 30
//! backends:
//!   - filter: color=blue
//!     log: {}
//!   - webhook:
//!       url: http://bus.internal/events
//!   - etcd:
//!       endpoints: ["http://127.0.0.1:2379"]
//!       prefix: /beacon
//! ```

use beacon_core::BeaconError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default path to the config file.
pub const DEFAULT_CONFIG_FILE: &str = "/etc/beacon.yml";

/// Top-level beacon configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Docker runtime configuration.
    #[serde(default)]
    pub docker: DockerConfig,
    /// Heartbeat clock configuration.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    /// The routes to fan events out to, in declaration order.
    pub backends: Vec<RouteConfig>,
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, BeaconError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BeaconError::InvalidArgument(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    /// Parse and validate config text.
    pub fn parse(raw: &str) -> Result<Self, BeaconError> {
        let config: Config = serde_yaml::from_str(raw)
            .map_err(|e| BeaconError::InvalidArgument(format!("bad configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), BeaconError> {
        self.docker.validate()?;
        self.heartbeat.validate()?;
        if self.backends.is_empty() {
            return Err(BeaconError::InvalidArgument(
                "no backends configured".to_string(),
            ));
        }
        for backend in &self.backends {
            backend.validate()?;
        }
        Ok(())
    }
}

/// Docker runtime configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DockerConfig {
    /// Daemon socket to connect to.
    #[serde(default = "default_socket")]
    pub socket: String,
    /// Address reported for ports bound to all host interfaces.
    #[serde(default = "default_host_ip")]
    pub host_ip: String,
    /// Container label holding the service name.
    #[serde(default = "default_label")]
    pub label: String,
}

impl DockerConfig {
    fn validate(&self) -> Result<(), BeaconError> {
        if self.socket.is_empty() {
            return Err(BeaconError::InvalidArgument(
                "docker.socket may not be empty".to_string(),
            ));
        }
        if self.host_ip.is_empty() {
            return Err(BeaconError::InvalidArgument(
                "docker.host-ip may not be empty".to_string(),
            ));
        }
        if self.label.is_empty() {
            return Err(BeaconError::InvalidArgument(
                "docker.label may not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        DockerConfig {
            socket: default_socket(),
            host_ip: default_host_ip(),
            label: default_label(),
        }
    }
}

/// Heartbeat clock configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct HeartbeatConfig {
    /// Seconds between heartbeats.
    #[serde(default = "default_heartbeat_secs")]
    pub interval_secs: u64,
    /// Seconds a service stays visible after a missed heartbeat.
    #[serde(default = "default_heartbeat_secs")]
    pub grace_secs: u64,
}

impl HeartbeatConfig {
    /// The interval between heartbeats.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// How long entries outlive a missed heartbeat.
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }

    fn validate(&self) -> Result<(), BeaconError> {
        if self.interval_secs == 0 {
            return Err(BeaconError::InvalidArgument(
                "heartbeat.interval-secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        HeartbeatConfig {
            interval_secs: default_heartbeat_secs(),
            grace_secs: default_heartbeat_secs(),
        }
    }
}

/// One route: a filter pattern plus exactly one backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RouteConfig {
    /// Label filter pattern. Empty matches every container.
    #[serde(default)]
    pub filter: String,
    /// The backend to deliver matching events to.
    #[serde(flatten)]
    pub backend: BackendConfig,
}

impl RouteConfig {
    fn validate(&self) -> Result<(), BeaconError> {
        match &self.backend {
            BackendConfig::Log(_) => Ok(()),
            BackendConfig::Webhook(webhook) => {
                if webhook.url.is_empty() {
                    return Err(BeaconError::InvalidArgument(
                        "webhook.url may not be empty".to_string(),
                    ));
                }
                Ok(())
            }
            BackendConfig::Etcd(etcd) => {
                if etcd.endpoints.is_empty() {
                    return Err(BeaconError::InvalidArgument(
                        "etcd.endpoints may not be empty".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// The supported backend kinds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendConfig {
    /// Write events to stdout.
    Log(LogConfig),
    /// POST events to an HTTP endpoint.
    Webhook(WebhookConfig),
    /// Announce services into etcd with TTLs.
    Etcd(EtcdConfig),
}

/// Log backend configuration. No options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {}

/// Webhook backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WebhookConfig {
    /// Endpoint to POST events to.
    pub url: String,
}

/// etcd discovery configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct EtcdConfig {
    /// Cluster endpoints.
    pub endpoints: Vec<String>,
    /// Key prefix services are announced under.
    #[serde(default = "default_etcd_prefix")]
    pub prefix: String,
    /// Whether announced values carry the protocol suffix.
    #[serde(default)]
    pub protocol: bool,
    /// Label carrying a legacy `name:port[/proto],...` service list. When
    /// unset, the container's service label and first binding are used.
    #[serde(default)]
    pub services_label: Option<String>,
}

fn default_socket() -> String {
    "unix:///var/run/docker.sock".to_string()
}

fn default_host_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_label() -> String {
    "service".to_string()
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_etcd_prefix() -> String {
    "/beacon".to_string()
}
