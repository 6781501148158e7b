//! Host implementations of the platform traits.

use async_trait::async_trait;
use log::{info, warn};
use tokio::process::Command;

use super::{
    Fix, ForegroundPresence, LocationError, LocationProvider, PermissionCheck, SendError,
    SmsSender,
};
use crate::logutil::{escape_log, redact_number};

/// Never produces a fix.
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_fix(&self) -> Result<Option<Fix>, LocationError> {
        Ok(None)
    }
}

/// Always reports the same coordinates.
pub struct FixedLocation {
    fix: Fix,
}

impl FixedLocation {
    pub fn new(fix: Fix) -> Self {
        Self { fix }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_fix(&self) -> Result<Option<Fix>, LocationError> {
        Ok(Some(self.fix))
    }
}

/// Runs an external program and reads `"<lat>,<lon>"` from the first line of
/// its stdout. Empty output means "no fix".
pub struct CommandLocation {
    argv: Vec<String>,
}

impl CommandLocation {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl LocationProvider for CommandLocation {
    async fn current_fix(&self) -> Result<Option<Fix>, LocationError> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| LocationError::Provider("no location command configured".into()))?;
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;
        if !output.status.success() {
            return Err(LocationError::Provider(format!(
                "{} exited with {}",
                program, output.status
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_fix(stdout.lines().next().unwrap_or(""))
    }
}

/// Parse `"<lat>,<lon>"`; blank input is "no fix".
pub fn parse_fix(line: &str) -> Result<Option<Fix>, LocationError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (lat, lon) = line
        .split_once(',')
        .ok_or_else(|| LocationError::Parse(line.to_string()))?;
    let latitude: f64 = lat
        .trim()
        .parse()
        .map_err(|_| LocationError::Parse(line.to_string()))?;
    let longitude: f64 = lon
        .trim()
        .parse()
        .map_err(|_| LocationError::Parse(line.to_string()))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(LocationError::Parse(line.to_string()));
    }
    Ok(Some(Fix::new(latitude, longitude)))
}

/// Dry-run sender: logs the message instead of sending it.
pub struct LogSms;

#[async_trait]
impl SmsSender for LogSms {
    async fn send_text(&self, number: &str, body: &str) -> Result<(), SendError> {
        info!(
            "[dry-run] SMS to {}: {}",
            redact_number(number),
            escape_log(body)
        );
        Ok(())
    }
}

/// Runs an external program once per recipient, substituting `{number}` and
/// `{message}` in its arguments. A non-zero exit is a send failure.
pub struct CommandSms {
    argv: Vec<String>,
}

impl CommandSms {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    pub fn render_args(&self, number: &str, body: &str) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| arg.replace("{number}", number).replace("{message}", body))
            .collect()
    }
}

#[async_trait]
impl SmsSender for CommandSms {
    async fn send_text(&self, number: &str, body: &str) -> Result<(), SendError> {
        let rendered = self.render_args(number, body);
        let (program, args) = rendered
            .split_first()
            .ok_or_else(|| SendError::Rejected("no sms command configured".into()))?;
        let status = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .status()
            .await?;
        if status.success() {
            Ok(())
        } else {
            Err(SendError::ExitStatus(status.code().unwrap_or(-1)))
        }
    }
}

/// Presence indicator that only logs transitions.
pub struct LogPresence;

impl ForegroundPresence for LogPresence {
    fn show(&self) {
        info!("Recurring alert active: sending location updates to contacts");
    }

    fn hide(&self) {
        info!("Recurring alert indicator cleared");
    }
}

/// Permission grants taken from configuration.
pub struct StaticPermissions {
    pub location: bool,
    pub sms: bool,
}

impl PermissionCheck for StaticPermissions {
    fn location_granted(&self) -> bool {
        if !self.location {
            warn!("Location permission not granted");
        }
        self.location
    }

    fn sms_granted(&self) -> bool {
        if !self.sms {
            warn!("SMS permission not granted");
        }
        self.sms
    }
}
