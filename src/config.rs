//! Configuration for the three binaries, loaded from an optional TOML file and
//! layered under CLI-flag overrides (see each `src/bin/*.rs`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default heartbeat period, per §4.5.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;
/// Default failure-scan period, per §4.5.
pub const DEFAULT_FAILURE_SCAN_SECS: u64 = 10;
/// Default maximum payload size carried in a [`crate::wire::Frame`], per §4.1.
pub const DEFAULT_MAX_PAYLOAD: usize = 8192;
/// Default LRU cache capacity, per §4.10.
pub const DEFAULT_CACHE_CAPACITY: u64 = 100;
/// Default Name Node client port, per §6.
pub const DEFAULT_NN_PORT: u16 = 5000;
/// Default Storage Node client port, per §6.
pub const DEFAULT_SN_CLIENT_PORT: u16 = 7000;
/// Default Storage Node control port, per §6.
pub const DEFAULT_SN_CONTROL_PORT: u16 = 6000;
/// Client socket read/write timeout, per §5.
pub const CLIENT_IO_TIMEOUT_SECS: u64 = 5;
/// Client NN-connect retry count, per §7.
pub const CLIENT_CONNECT_RETRIES: u32 = 3;
/// Client NN-connect retry delay, per §7.
pub const CLIENT_CONNECT_RETRY_DELAY_SECS: u64 = 2;
/// Heartbeat-session reconnect back-off, per §7.
pub const HEARTBEAT_RECONNECT_BACKOFF_SECS: u64 = 5;

/// Name Node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NnConfig {
    pub bind_addr: String,
    pub port: u16,
    pub heartbeat_failure_secs: u64,
    pub failure_scan_secs: u64,
    pub cache_capacity: u64,
    pub max_payload: usize,
}

impl Default for NnConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_owned(),
            port: DEFAULT_NN_PORT,
            heartbeat_failure_secs: DEFAULT_HEARTBEAT_SECS,
            failure_scan_secs: DEFAULT_FAILURE_SCAN_SECS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Storage Node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnConfig {
    pub bind_addr: String,
    pub client_port: u16,
    pub control_port: u16,
    pub nn_addr: String,
    pub content_dir: PathBuf,
    pub heartbeat_interval_secs: u64,
    pub max_payload: usize,
    pub max_acl_entries: usize,
}

impl Default for SnConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_owned(),
            client_port: DEFAULT_SN_CLIENT_PORT,
            control_port: DEFAULT_SN_CONTROL_PORT,
            nn_addr: format!("127.0.0.1:{DEFAULT_NN_PORT}"),
            content_dir: PathBuf::from("./content"),
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_SECS,
            max_payload: DEFAULT_MAX_PAYLOAD,
            max_acl_entries: 64,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub nn_addr: String,
    pub identity: String,
    pub connect_retries: u32,
    pub connect_retry_delay_secs: u64,
    pub io_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            nn_addr: format!("127.0.0.1:{DEFAULT_NN_PORT}"),
            identity: "guest".to_owned(),
            connect_retries: CLIENT_CONNECT_RETRIES,
            connect_retry_delay_secs: CLIENT_CONNECT_RETRY_DELAY_SECS,
            io_timeout_secs: CLIENT_IO_TIMEOUT_SECS,
        }
    }
}

/// Error loading or parsing a config file.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Toml(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Loads and parses a TOML config file, falling back to `T::default()` when `path` is `None`.
pub fn load<T>(path: Option<&Path>) -> Result<T, ConfigError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    match path {
        None => Ok(T::default()),
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            toml::from_str(&text).map_err(ConfigError::Toml)
        }
    }
}
