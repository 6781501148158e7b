//! One fetch-compose-send cycle, shared by the recurring loop and the one-shot sender.

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::time::Duration;

use super::compose::{compose_message, request_fix, LocationOutcome};
use crate::logutil::{escape_log, redact_number};
use crate::platform::{Platform, SmsSender};
use crate::storage::{Contact, ContactStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    Recurring,
    OneShot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Location or SMS capability not granted; nothing attempted.
    PermissionMissing,
    /// No contacts configured; nothing sent.
    NoContacts,
    Dispatched {
        message: String,
        location: LocationOutcome,
        sent: usize,
        failed: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub kind: CycleKind,
    pub finished_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    pub fn sent(&self) -> usize {
        match self.outcome {
            CycleOutcome::Dispatched { sent, .. } => sent,
            _ => 0,
        }
    }

    pub fn failed(&self) -> usize {
        match self.outcome {
            CycleOutcome::Dispatched { failed, .. } => failed,
            _ => 0,
        }
    }

    pub fn skipped(&self) -> bool {
        !matches!(self.outcome, CycleOutcome::Dispatched { .. })
    }

    /// One-line human readable result.
    pub fn summary(&self) -> String {
        match &self.outcome {
            CycleOutcome::PermissionMissing => {
                "Alert not sent: location and SMS permissions are required".to_string()
            }
            CycleOutcome::NoContacts => "Alert not sent: no contacts configured".to_string(),
            CycleOutcome::Dispatched {
                location,
                sent,
                failed,
                ..
            } => {
                let what = match location {
                    LocationOutcome::Fix(_) => "location SMS".to_string(),
                    other => format!("SMS without location ({})", other),
                };
                if *failed == 0 {
                    format!("{} {} sent", sent, what)
                } else {
                    format!("{} {} sent, {} failed", sent, what, failed)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
}

/// Send `message` to every contact. A failure for one recipient is logged
/// and does not affect the others; there is no retry.
pub async fn dispatch_to_all(
    sms: &dyn SmsSender,
    contacts: &[Contact],
    message: &str,
) -> DispatchSummary {
    let mut summary = DispatchSummary::default();
    for contact in contacts {
        match sms.send_text(&contact.number, message).await {
            Ok(()) => {
                summary.sent += 1;
                debug!(
                    "SMS sent to {} ({})",
                    contact.name,
                    redact_number(&contact.number)
                );
            }
            Err(e) => {
                summary.failed += 1;
                error!("Failed to send SMS to {}: {}", contact.name, e);
            }
        }
    }
    summary
}

/// Run one complete cycle. Contacts and message are read from the store each
/// time so edits apply to the next cycle.
pub async fn run_cycle(
    platform: Platform,
    store: ContactStore,
    location_timeout: Option<Duration>,
    kind: CycleKind,
) -> CycleReport {
    let outcome = cycle_outcome(&platform, &store, location_timeout).await;
    CycleReport {
        kind,
        finished_at: Utc::now(),
        outcome,
    }
}

async fn cycle_outcome(
    platform: &Platform,
    store: &ContactStore,
    location_timeout: Option<Duration>,
) -> CycleOutcome {
    if !platform.permissions.all_granted() {
        error!("Required permissions (location/SMS) not granted; cannot send alert");
        return CycleOutcome::PermissionMissing;
    }

    let contacts = store.load_contacts().await;
    if contacts.is_empty() {
        warn!("No contacts to send SMS to; skipping this round");
        return CycleOutcome::NoContacts;
    }
    let alert_message = store.load_message().await;

    debug!("Fetching location...");
    let location = request_fix(platform.location.as_ref(), location_timeout).await;
    let message = compose_message(&alert_message, &location);
    let summary = dispatch_to_all(platform.sms.as_ref(), &contacts, &message).await;
    info!(
        "Alert dispatched to {}/{} contact(s): {}",
        summary.sent,
        contacts.len(),
        escape_log(&message)
    );

    CycleOutcome::Dispatched {
        message,
        location,
        sent: summary.sent,
        failed: summary.failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Fix;

    fn report(outcome: CycleOutcome) -> CycleReport {
        CycleReport {
            kind: CycleKind::OneShot,
            finished_at: Utc::now(),
            outcome,
        }
    }

    fn dispatched(location: LocationOutcome, sent: usize, failed: usize) -> CycleOutcome {
        CycleOutcome::Dispatched {
            message: "Help".into(),
            location,
            sent,
            failed,
        }
    }

    #[test]
    fn summary_names_the_location_outcome() {
        let with_fix = report(dispatched(LocationOutcome::Fix(Fix::new(1.0, 2.0)), 2, 0));
        assert_eq!(with_fix.summary(), "2 location SMS sent");

        let timed_out = report(dispatched(LocationOutcome::TimedOut, 1, 0));
        assert_eq!(
            timed_out.summary(),
            "1 SMS without location (location request timed out) sent"
        );

        let no_fix = report(dispatched(LocationOutcome::Unavailable, 1, 1));
        assert_eq!(
            no_fix.summary(),
            "1 SMS without location (no location fix) sent, 1 failed"
        );
        assert!(!no_fix.summary().contains("location SMS"));
    }

    #[test]
    fn summary_of_skipped_rounds() {
        assert!(report(CycleOutcome::NoContacts).summary().contains("no contacts"));
        assert!(report(CycleOutcome::PermissionMissing)
            .summary()
            .contains("permissions"));
    }
}
