//! # Platform Seams
//!
//! The alert loop talks to the outside world only through the traits in this
//! module:
//!
//! - [`LocationProvider`] - one best-effort location fix per request
//! - [`SmsSender`] - one text message to one recipient per call
//! - [`ForegroundPresence`] - the persistent "alert active" indicator
//! - [`PermissionCheck`] - whether location and SMS capabilities are granted
//!
//! [`Platform`] bundles one of each. [`Platform::from_config`] builds the host
//! implementations in [`host`] from the `[location]`, `[sms]` and
//! `[permissions]` config sections.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;

pub mod host;

/// A single latitude/longitude reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Errors raised by a location provider.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location provider failed: {0}")]
    Provider(String),

    #[error("could not parse location from '{0}'")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while dispatching a single text message.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("send rejected: {0}")]
    Rejected(String),

    #[error("sender exited with status {0}")]
    ExitStatus(i32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Request a single fix. `Ok(None)` means the provider answered without a fix.
    async fn current_fix(&self) -> Result<Option<Fix>, LocationError>;
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_text(&self, number: &str, body: &str) -> Result<(), SendError>;
}

pub trait ForegroundPresence: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

pub trait PermissionCheck: Send + Sync {
    fn location_granted(&self) -> bool;
    fn sms_granted(&self) -> bool;

    fn all_granted(&self) -> bool {
        self.location_granted() && self.sms_granted()
    }
}

/// The set of platform collaborators the alert loop runs against.
#[derive(Clone)]
pub struct Platform {
    pub location: Arc<dyn LocationProvider>,
    pub sms: Arc<dyn SmsSender>,
    pub presence: Arc<dyn ForegroundPresence>,
    pub permissions: Arc<dyn PermissionCheck>,
}

impl Platform {
    /// Build host implementations from configuration.
    pub fn from_config(config: &Config) -> Self {
        let location: Arc<dyn LocationProvider> = match config.location.provider.as_str() {
            "fixed" => Arc::new(host::FixedLocation::new(Fix::new(
                config.location.latitude.unwrap_or_default(),
                config.location.longitude.unwrap_or_default(),
            ))),
            "command" => Arc::new(host::CommandLocation::new(config.location.command.clone())),
            _ => Arc::new(host::NoLocation),
        };
        let sms: Arc<dyn SmsSender> = match config.sms.provider.as_str() {
            "command" => Arc::new(host::CommandSms::new(config.sms.command.clone())),
            _ => Arc::new(host::LogSms),
        };
        Self {
            location,
            sms,
            presence: Arc::new(host::LogPresence),
            permissions: Arc::new(host::StaticPermissions {
                location: config.permissions.location,
                sms: config.permissions.sms,
            }),
        }
    }
}
