//! Station configuration.
//!
//! Settings are layered, later tiers winning:
//! 1. TOML file (`--config`, `FINGERLINK_CONFIG`, or `./fingerlink.toml`)
//! 2. `FINGERLINK_*` environment variables
//! 3. Command-line flags
//!
//! Durations are written in milliseconds. A missing file is not an error;
//! every setting has a default.
//!
//! ```toml
//! log_level = "info"
//!
//! [sensor]
//! port = "/dev/ttyS2"
//! baud_rate = 57600
//!
//! [store]
//! backend = "firebase"
//! base_url = "https://example-rtdb.firebaseio.com"
//!
//! [engine]
//! press_timeout_ms = 20000
//! fallback_position = 1
//! ```

use fingerlink_core::Position;
use fingerlink_engine::{AllocationFallback, EngineConfig};
use fingerlink_hardware::SensorConfig;
use fingerlink_storage::StoreConfig;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "fingerlink.toml";
pub const CONFIG_ENV: &str = "FINGERLINK_CONFIG";

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in {path}: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Firebase,
    /// In-process tree, lost on exit.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SensorSection {
    pub port: String,
    pub baud_rate: u32,
    pub address: u32,
    pub settle_delay_ms: u64,
    pub read_timeout_ms: u64,
    pub verify_checksums: bool,
}

impl Default for SensorSection {
    fn default() -> Self {
        let defaults = SensorConfig::default();
        Self {
            port: defaults.port,
            baud_rate: defaults.baud_rate,
            address: defaults.address,
            settle_delay_ms: defaults.settle_delay.as_millis() as u64,
            read_timeout_ms: defaults.read_timeout.as_millis() as u64,
            verify_checksums: defaults.verify_checksums,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub backend: StoreBackend,
    pub base_url: String,
    pub auth_token: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        let defaults = StoreConfig::default();
        Self {
            backend: StoreBackend::default(),
            base_url: defaults.base_url,
            auth_token: defaults.auth_token,
            request_timeout_ms: defaults.request_timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub press_timeout_ms: u64,
    pub release_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub deletion_pause_ms: u64,
    pub registered_by: String,
    /// Slot to use when occupancy cannot be read. Unset aborts instead.
    pub fallback_position: Option<u8>,
    pub publish_status: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            press_timeout_ms: defaults.press_timeout.as_millis() as u64,
            release_timeout_ms: defaults.release_timeout.as_millis() as u64,
            poll_interval_ms: defaults.poll_interval.as_millis() as u64,
            deletion_pause_ms: defaults.deletion_pause.as_millis() as u64,
            registered_by: defaults.registered_by,
            fallback_position: None,
            publish_status: defaults.publish_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub sensor: SensorSection,
    pub store: StoreSection,
    pub engine: EngineSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            sensor: SensorSection::default(),
            store: StoreSection::default(),
            engine: EngineSection::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str, origin: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn sensor_config(&self) -> SensorConfig {
        SensorConfig::default()
            .with_port(self.sensor.port.clone())
            .with_baud_rate(self.sensor.baud_rate)
            .with_address(self.sensor.address)
            .with_settle_delay(Duration::from_millis(self.sensor.settle_delay_ms))
            .with_read_timeout(Duration::from_millis(self.sensor.read_timeout_ms))
            .with_verify_checksums(self.sensor.verify_checksums)
    }

    pub fn store_config(&self) -> StoreConfig {
        let config = StoreConfig::default()
            .with_base_url(self.store.base_url.clone())
            .with_request_timeout(Duration::from_millis(self.store.request_timeout_ms));
        match &self.store.auth_token {
            Some(token) => config.with_auth_token(token.clone()),
            None => config,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let fallback = match self.engine.fallback_position {
            Some(slot) => AllocationFallback::Fixed(Position::from(slot)),
            None => AllocationFallback::Abort,
        };
        EngineConfig::default()
            .with_press_timeout(Duration::from_millis(self.engine.press_timeout_ms))
            .with_release_timeout(Duration::from_millis(self.engine.release_timeout_ms))
            .with_poll_interval(Duration::from_millis(self.engine.poll_interval_ms))
            .with_deletion_pause(Duration::from_millis(self.engine.deletion_pause_ms))
            .with_registered_by(self.engine.registered_by.clone())
            .with_allocation_fallback(fallback)
            .with_publish_status(self.engine.publish_status)
    }
}

/// Locate the config file.
///
/// An explicit path, then `FINGERLINK_CONFIG`, must exist. Otherwise
/// `./fingerlink.toml` is used if present.
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if an explicitly named file is missing.
pub fn find_config_file(explicit: Option<&Path>) -> ConfigResult<Option<PathBuf>> {
    let named = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

    if let Some(path) = named {
        return if path.exists() {
            Ok(Some(path))
        } else {
            Err(ConfigError::FileNotFound(path.display().to_string()))
        };
    }

    let local = PathBuf::from(CONFIG_FILE);
    Ok(local.exists().then_some(local))
}

/// Read the file (if any) and apply environment overrides.
pub fn load_config(explicit: Option<&Path>) -> ConfigResult<AppConfig> {
    let mut config = match find_config_file(explicit)? {
        Some(path) => {
            let content = fs::read_to_string(&path)?;
            AppConfig::from_toml(&content, &path)?
        }
        None => AppConfig::default(),
    };
    apply_environment_overrides(&mut config);
    Ok(config)
}

/// Apply `FINGERLINK_*` variables from the process environment.
///
/// - `FINGERLINK_PORT` -> `sensor.port`
/// - `FINGERLINK_BAUD_RATE` -> `sensor.baud_rate`
/// - `FINGERLINK_STORE_URL` -> `store.base_url`
/// - `FINGERLINK_STORE_BACKEND` -> `store.backend` (`firebase` or `memory`)
/// - `FINGERLINK_AUTH_TOKEN` -> `store.auth_token`
/// - `FINGERLINK_REGISTERED_BY` -> `engine.registered_by`
/// - `FINGERLINK_LOG_LEVEL` -> `log_level`
pub fn apply_environment_overrides(config: &mut AppConfig) {
    apply_overrides(config, |key| env::var(key).ok());
}

/// Apply overrides from any key lookup. Unparseable values are ignored.
pub fn apply_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(value) = lookup("FINGERLINK_PORT") {
        config.sensor.port = value;
    }
    if let Some(rate) = lookup("FINGERLINK_BAUD_RATE").and_then(|v| v.parse().ok()) {
        config.sensor.baud_rate = rate;
    }
    if let Some(value) = lookup("FINGERLINK_STORE_URL") {
        config.store.base_url = value;
    }
    match lookup("FINGERLINK_STORE_BACKEND").as_deref() {
        Some("memory") => config.store.backend = StoreBackend::Memory,
        Some("firebase") => config.store.backend = StoreBackend::Firebase,
        _ => {}
    }
    if let Some(value) = lookup("FINGERLINK_AUTH_TOKEN") {
        config.store.auth_token = Some(value);
    }
    if let Some(value) = lookup("FINGERLINK_REGISTERED_BY") {
        config.engine.registered_by = value;
    }
    if let Some(value) = lookup("FINGERLINK_LOG_LEVEL") {
        config.log_level = value;
    }
}
