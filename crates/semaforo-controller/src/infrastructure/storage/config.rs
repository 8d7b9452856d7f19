//! TOML configuration for the controller.
//!
//! Default location: `$XDG_CONFIG_HOME/semaforo/config.toml`, falling back to
//! `~/.config/semaforo/config.toml`.  A different file can be chosen with
//! `--config`.  Example with every field at its default:
//!
//! ```toml
//! [broker]
//! bind_address = "0.0.0.0"
//! port = 1883
//! read_timeout_secs = 300
//!
//! [status]
//! bind_address = "0.0.0.0"
//! port = 80
//!
//! [log]
//! max_lines = 100
//! level = "info"
//!
//! [cycle]
//! green_secs = 6
//! yellow_secs = 6
//! red_secs = 15
//!
//! [clock]
//! enabled = true
//! ntp_host = "a.st1.ntp.br"
//! sync_interval_secs = 3600
//!
//! [panel]
//! num_leds = 64
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, so a missing file, a
//! missing section or a missing key all fall back to the values above.  A file
//! that sets only `[broker] port = 1884` is valid.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use semaforo_core::CycleTimes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but is not usable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub panel: PanelConfig,
}

/// Broker listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrokerConfig {
    /// IP address to listen on.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    /// A connection that sends nothing for this long is closed.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

/// `/status` HTTP endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_status_port")]
    pub port: u16,
}

/// Event log and `tracing` settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// Entries kept in the event log; the oldest is dropped beyond this.
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Hold time of each signal phase, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleConfig {
    #[serde(default = "default_green_secs")]
    pub green_secs: u64,
    #[serde(default = "default_yellow_secs")]
    pub yellow_secs: u64,
    #[serde(default = "default_red_secs")]
    pub red_secs: u64,
}

/// SNTP clock sync settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClockConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ntp_host")]
    pub ntp_host: String,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
}

/// LED panel settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PanelConfig {
    #[serde(default = "default_num_leds")]
    pub num_leds: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_broker_port() -> u16 {
    1883
}
fn default_read_timeout_secs() -> u64 {
    300
}
fn default_status_port() -> u16 {
    80
}
fn default_max_lines() -> usize {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_green_secs() -> u64 {
    6
}
fn default_yellow_secs() -> u64 {
    6
}
fn default_red_secs() -> u64 {
    15
}
fn default_true() -> bool {
    true
}
fn default_ntp_host() -> String {
    "a.st1.ntp.br".to_string()
}
fn default_sync_interval_secs() -> u64 {
    3600
}
fn default_num_leds() -> usize {
    64
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_broker_port(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_status_port(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
            level: default_log_level(),
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            green_secs: default_green_secs(),
            yellow_secs: default_yellow_secs(),
            red_secs: default_red_secs(),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            ntp_host: default_ntp_host(),
            sync_interval_secs: default_sync_interval_secs(),
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            num_leds: default_num_leds(),
        }
    }
}

// ── Derived values ────────────────────────────────────────────────────────────

impl AppConfig {
    /// Checks every value that parses but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_ip("broker.bind_address", &self.broker.bind_address)?;
        parse_ip("status.bind_address", &self.status.bind_address)?;

        let positive = [
            ("broker.read_timeout_secs", self.broker.read_timeout_secs),
            ("log.max_lines", self.log.max_lines as u64),
            ("cycle.green_secs", self.cycle.green_secs),
            ("cycle.yellow_secs", self.cycle.yellow_secs),
            ("cycle.red_secs", self.cycle.red_secs),
            ("clock.sync_interval_secs", self.clock.sync_interval_secs),
            ("panel.num_leds", self.panel.num_leds as u64),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be greater than 0")));
        }

        if self.clock.enabled && self.clock.ntp_host.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "clock.ntp_host must be set when clock sync is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Address the broker listener binds to.
    pub fn broker_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = parse_ip("broker.bind_address", &self.broker.bind_address)?;
        Ok(SocketAddr::new(ip, self.broker.port))
    }

    /// Address the status endpoint binds to.
    pub fn status_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = parse_ip("status.bind_address", &self.status.bind_address)?;
        Ok(SocketAddr::new(ip, self.status.port))
    }

    pub fn cycle_times(&self) -> CycleTimes {
        CycleTimes::from_secs(
            self.cycle.green_secs,
            self.cycle.yellow_secs,
            self.cycle.red_secs,
        )
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.broker.read_timeout_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.clock.sync_interval_secs)
    }

    /// Renders the config as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn parse_ip(field: &str, value: &str) -> Result<IpAddr, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{field} is not an IP address: {value:?}")))
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Default config file path, if a home or XDG config directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join("semaforo").join("config.toml"))
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
