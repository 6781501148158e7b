//! # Configuration Management Module
//!
//! Loads and writes the service configuration. Every section has defaults so a
//! minimal (or empty) `config.toml` is valid.
//!
//! ## Configuration Structure
//!
//! - [`AlertConfig`] - Recurring loop interval and location timeout
//! - [`TriggerConfig`] - Volume-button debounce window and press count
//! - [`StorageConfig`] - Where the contact/message preferences live
//! - [`LocationConfig`] - Which location provider to use
//! - [`SmsConfig`] - How outbound text messages are dispatched
//! - [`PermissionsConfig`] - Capability grants checked before each cycle
//! - [`InputConfig`] - Where the running service reads key events and commands
//! - [`LoggingConfig`] - Logging level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use helpsathi::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Alert interval: {:?}", config.alert.interval());
//!
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [alert]
//! interval_secs = 300
//! location_timeout_secs = 30
//!
//! [trigger]
//! debounce_ms = 500
//! press_count = 3
//!
//! [location]
//! provider = "fixed"
//! latitude = 12.34
//! longitude = 56.78
//!
//! [sms]
//! provider = "command"
//! command = ["mmcli", "-m", "0", "--messaging-create-sms=number='{number}',text='{message}'"]
//!
//! [input]
//! fifo = "/run/helpsathi/input"
//! ```

use anyhow::{anyhow, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

/// Fallback interval between recurring alert cycles.
pub const DEFAULT_INTERVAL_SECS: u64 = 5 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Delay between the end of one cycle and the start of the next.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Upper bound on a single location request. Zero disables the bound.
    #[serde(default = "default_location_timeout_secs")]
    pub location_timeout_secs: u64,
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_location_timeout_secs() -> u64 {
    30
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            location_timeout_secs: default_location_timeout_secs(),
        }
    }
}

impl AlertConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn location_timeout(&self) -> Option<Duration> {
        if self.location_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.location_timeout_secs))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Quiet period after the last press before the count is evaluated.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Exact number of presses that starts the recurring alert.
    #[serde(default = "default_press_count")]
    pub press_count: u32,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_press_count() -> u32 {
    3
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            press_count: default_press_count(),
        }
    }
}

impl TriggerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

/// Location provider selection.
///
/// - `none`: every request reports no fix
/// - `fixed`: always reports `latitude`/`longitude`
/// - `command`: runs `command` and parses `"<lat>,<lon>"` from its stdout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_location_provider")]
    pub provider: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub command: Vec<String>,
}

fn default_location_provider() -> String {
    "none".to_string()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            provider: default_location_provider(),
            latitude: None,
            longitude: None,
            command: Vec::new(),
        }
    }
}

/// SMS dispatch selection.
///
/// - `log`: dry run, messages are only written to the log
/// - `command`: runs `command` once per recipient; `{number}` and `{message}`
///   placeholders in any argument are substituted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default = "default_sms_provider")]
    pub provider: String,
    #[serde(default)]
    pub command: Vec<String>,
}

fn default_sms_provider() -> String {
    "log".to_string()
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            provider: default_sms_provider(),
            command: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default = "default_granted")]
    pub location: bool,
    #[serde(default = "default_granted")]
    pub sms: bool,
}

fn default_granted() -> bool {
    true
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            location: true,
            sms: true,
        }
    }
}

/// Input source for `start`. Without `fifo` the service reads stdin; a
/// daemon has no stdin and needs a named pipe (Linux only).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub fifo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("helpsathi.log".to_string()),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub permissions: PermissionsConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        Self::parse(&content).map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))
    }

    /// Load configuration, using defaults only when the file does not exist.
    /// A file that exists but cannot be read or parsed is an error.
    pub async fn load_or_default(path: &str) -> Result<Self> {
        match fs::try_exists(path).await {
            Ok(false) => {
                warn!("Config file {} not found; using defaults", path);
                Ok(Self::default())
            }
            _ => Self::load(path).await,
        }
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.trigger.press_count == 0 {
            return Err(anyhow!("trigger.press_count must be at least 1"));
        }
        match self.location.provider.as_str() {
            "none" => {}
            "fixed" => {
                if self.location.latitude.is_none() || self.location.longitude.is_none() {
                    return Err(anyhow!(
                        "location.provider = \"fixed\" requires latitude and longitude"
                    ));
                }
            }
            "command" => {
                if self.location.command.is_empty() {
                    return Err(anyhow!("location.provider = \"command\" requires command"));
                }
            }
            other => return Err(anyhow!("Unknown location provider '{}'", other)),
        }
        match self.sms.provider.as_str() {
            "log" => {}
            "command" => {
                if self.sms.command.is_empty() {
                    return Err(anyhow!("sms.provider = \"command\" requires command"));
                }
            }
            other => return Err(anyhow!("Unknown sms provider '{}'", other)),
        }
        Ok(())
    }
}
