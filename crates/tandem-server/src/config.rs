//! Server configuration.
//!
//! Configuration can be loaded from:
//! - A TOML configuration file (`--config`, or one of the default paths)
//! - Environment variables (`TANDEM_*`, `__` between nested keys,
//!   e.g. `TANDEM_LIMITS__MAX_CONNECTIONS=500`)
//!
//! Environment variables override the file.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tandem_core::SwitchboardConfig;

/// Paths searched when no config file is given explicitly.
const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "tandem.toml",
    "/etc/tandem/tandem.toml",
    "~/.config/tandem/tandem.toml",
];

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Transport configuration.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Heartbeat configuration.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Periodic stats logging.
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Path for WebSocket endpoint.
    #[serde(default = "default_ws_path")]
    pub websocket_path: String,
}

/// Resource limits configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Maximum WebSocket message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Maximum number of interest tags in a profile.
    #[serde(default = "default_max_profile_interests")]
    pub max_profile_interests: usize,

    /// Maximum chat message length in bytes.
    #[serde(default = "default_max_chat_length")]
    pub max_chat_length: usize,
}

/// Heartbeat configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Heartbeat interval in milliseconds.
    #[serde(default = "default_heartbeat_interval")]
    pub interval_ms: u64,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_heartbeat_timeout")]
    pub timeout_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Stats logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Interval between stats log lines in milliseconds; 0 disables them.
    #[serde(default = "default_stats_interval")]
    pub interval_ms: u64,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_true() -> bool {
    true
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_max_connections() -> usize {
    10_000
}

fn default_max_message_size() -> usize {
    256 * 1024 // SDP blobs with many candidates get large
}

fn default_max_profile_interests() -> usize {
    64
}

fn default_max_chat_length() -> usize {
    4096
}

fn default_heartbeat_interval() -> u64 {
    25_000 // 25 seconds
}

fn default_heartbeat_timeout() -> u64 {
    60_000 // 60 seconds
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_stats_interval() -> u64 {
    30_000 // 30 seconds
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            transport: TransportConfig::default(),
            limits: LimitsConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            metrics: MetricsConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            websocket_path: default_ws_path(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            max_message_size: default_max_message_size(),
            max_profile_interests: default_max_profile_interests(),
            max_chat_length: default_max_chat_length(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_heartbeat_interval(),
            timeout_ms: default_heartbeat_timeout(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_stats_interval(),
        }
    }
}

impl HeartbeatConfig {
    /// Heartbeat interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Inactivity timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from a file (explicit, or the first default path
    /// that exists) layered under `TANDEM_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, or if any source
    /// cannot be parsed or the result is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => find_default_config(),
        };

        let mut builder = config::Config::builder();
        if let Some(file) = &file {
            tracing::debug!("Loading config file {}", file.display());
            builder = builder.add_source(
                config::File::from(file.as_path())
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix("TANDEM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat.interval_ms == 0 {
            bail!("heartbeat.interval_ms must be greater than 0");
        }
        if self.heartbeat.timeout_ms <= self.heartbeat.interval_ms {
            bail!(
                "heartbeat.timeout_ms ({}) must exceed heartbeat.interval_ms ({})",
                self.heartbeat.timeout_ms,
                self.heartbeat.interval_ms
            );
        }
        if !self.transport.websocket_path.starts_with('/') {
            bail!("transport.websocket_path must start with '/'");
        }
        if self.limits.max_connections == 0 {
            bail!("limits.max_connections must be greater than 0");
        }
        Ok(())
    }

    /// Get the socket address to bind to.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }

    /// Limits handed to the switchboard.
    #[must_use]
    pub fn switchboard_config(&self) -> SwitchboardConfig {
        SwitchboardConfig {
            max_connections: self.limits.max_connections,
            max_profile_interests: self.limits.max_profile_interests,
            max_chat_length: self.limits.max_chat_length,
        }
    }
}

fn find_default_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_PATHS
        .iter()
        .map(|path| PathBuf::from(shellexpand::tilde(path).as_ref()))
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.transport.websocket_path, "/ws");
        assert_eq!(config.stats.interval_ms, 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_bind_addr() {
        let config = Config::default();
        let addr = config.bind_addr().unwrap();
        assert_eq!(addr.port(), 3001);

        let bad = Config {
            host: "not a host".into(),
            ..Config::default()
        };
        assert!(bad.bind_addr().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "0.0.0.0"
            port = 9000

            [limits]
            max_connections = 500
            max_chat_length = 280

            [heartbeat]
            interval_ms = 10000
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.limits.max_connections, 500);
        assert_eq!(config.limits.max_profile_interests, 64);
        assert_eq!(config.heartbeat.interval(), Duration::from_secs(10));
        assert_eq!(config.heartbeat.timeout_ms, 60_000);

        let switchboard = config.switchboard_config();
        assert_eq!(switchboard.max_connections, 500);
        assert_eq!(switchboard.max_chat_length, 280);
    }

    #[test]
    fn test_validate_rejects_short_timeout() {
        let mut config = Config::default();
        config.heartbeat.timeout_ms = config.heartbeat.interval_ms;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transport.websocket_path = "ws".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let path = std::env::temp_dir().join(format!("tandem-test-{}.toml", std::process::id()));
        std::fs::write(&path, "port = 4555\n[stats]\ninterval_ms = 0\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.port, 4555);
        assert_eq!(config.stats.interval_ms, 0);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let path = Path::new("/nonexistent/tandem.toml");
        assert!(Config::load(Some(path)).is_err());
    }
}
