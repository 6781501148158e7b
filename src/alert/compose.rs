//! Location outcome and alert text composition.

use log::{debug, warn};
use std::fmt;
use std::time::Duration;

use crate::platform::{Fix, LocationProvider};

/// Result of one location request.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationOutcome {
    Fix(Fix),
    /// The provider answered but had no fix.
    Unavailable,
    Failed(String),
    TimedOut,
}

impl LocationOutcome {
    pub fn fix(&self) -> Option<Fix> {
        match self {
            LocationOutcome::Fix(fix) => Some(*fix),
            _ => None,
        }
    }
}

impl fmt::Display for LocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationOutcome::Fix(fix) => write!(f, "location {}", fix),
            LocationOutcome::Unavailable => write!(f, "no location fix"),
            LocationOutcome::Failed(reason) => write!(f, "location error: {}", reason),
            LocationOutcome::TimedOut => write!(f, "location request timed out"),
        }
    }
}

pub fn maps_link(fix: &Fix) -> String {
    format!(
        "https://maps.google.com/?q={},{}",
        fix.latitude, fix.longitude
    )
}

/// Build the outbound text: the alert message, plus a maps link when a fix exists.
pub fn compose_message(alert_message: &str, outcome: &LocationOutcome) -> String {
    match outcome.fix() {
        Some(fix) => format!(
            "{}\nMy current location: {}",
            alert_message,
            maps_link(&fix)
        ),
        None => alert_message.to_string(),
    }
}

/// Ask the provider for a single fix, bounded by `limit` when given.
pub async fn request_fix(
    provider: &dyn LocationProvider,
    limit: Option<Duration>,
) -> LocationOutcome {
    let result = match limit {
        Some(limit) => match tokio::time::timeout(limit, provider.current_fix()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Location request timed out after {}s; sending without location",
                    limit.as_secs()
                );
                return LocationOutcome::TimedOut;
            }
        },
        None => provider.current_fix().await,
    };
    match result {
        Ok(Some(fix)) => {
            debug!("Location fetched: {}", fix);
            LocationOutcome::Fix(fix)
        }
        Ok(None) => {
            warn!("Failed to get location (no fix); sending without location");
            LocationOutcome::Unavailable
        }
        Err(e) => {
            warn!("Error getting location: {}; sending without location", e);
            LocationOutcome::Failed(e.to_string())
        }
    }
}
