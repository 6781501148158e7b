//! Test utilities & fixtures.
//! Builds a temp-dir contact store and a platform whose SMS sender records
//! every delivered message on a channel.
#![allow(dead_code)] // Each test binary uses a different subset.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use helpsathi::alert::{AlertLoopConfig, AlertLoopHandle, AlertStats};
use helpsathi::platform::host::{FixedLocation, NoLocation, StaticPermissions};
use helpsathi::platform::{
    Fix, ForegroundPresence, LocationError, LocationProvider, Platform, SendError, SmsSender,
};
use helpsathi::storage::{Contact, ContactStore};

/// One delivered text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub number: String,
    pub body: String,
}

/// Records successful sends; numbers in `failing` are rejected.
pub struct RecordingSms {
    tx: mpsc::UnboundedSender<Sent>,
    failing: Vec<String>,
}

#[async_trait]
impl SmsSender for RecordingSms {
    async fn send_text(&self, number: &str, body: &str) -> Result<(), SendError> {
        if self.failing.iter().any(|n| n == number) {
            return Err(SendError::Rejected(format!("{} unreachable", number)));
        }
        let _ = self.tx.send(Sent {
            number: number.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Never answers.
pub struct HangingLocation;

#[async_trait]
impl LocationProvider for HangingLocation {
    async fn current_fix(&self) -> Result<Option<Fix>, LocationError> {
        std::future::pending().await
    }
}

/// Answers with `fix` after `delay`.
pub struct SlowLocation {
    pub delay: Duration,
    pub fix: Fix,
}

#[async_trait]
impl LocationProvider for SlowLocation {
    async fn current_fix(&self) -> Result<Option<Fix>, LocationError> {
        tokio::time::sleep(self.delay).await;
        Ok(Some(self.fix))
    }
}

#[derive(Default)]
pub struct CountingPresence {
    pub shown: AtomicUsize,
    pub hidden: AtomicUsize,
}

impl CountingPresence {
    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    pub fn hidden(&self) -> usize {
        self.hidden.load(Ordering::SeqCst)
    }
}

impl ForegroundPresence for CountingPresence {
    fn show(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hidden.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    // Kept alive for the store's lifetime.
    pub tmp: tempfile::TempDir,
    pub store: ContactStore,
    pub platform: Platform,
    pub presence: Arc<CountingPresence>,
    pub sent: mpsc::UnboundedReceiver<Sent>,
}

pub struct HarnessBuilder {
    location: Arc<dyn LocationProvider>,
    location_granted: bool,
    sms_granted: bool,
    failing: Vec<String>,
}

impl HarnessBuilder {
    pub fn location(mut self, provider: impl LocationProvider + 'static) -> Self {
        self.location = Arc::new(provider);
        self
    }

    pub fn no_location(self) -> Self {
        self.location(NoLocation)
    }

    pub fn sms_denied(mut self) -> Self {
        self.sms_granted = false;
        self
    }

    pub fn location_denied(mut self) -> Self {
        self.location_granted = false;
        self
    }

    pub fn failing(mut self, number: &str) -> Self {
        self.failing.push(number.to_string());
        self
    }

    pub async fn build(self) -> Harness {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = ContactStore::new(tmp.path().to_str().expect("utf8 path"))
            .await
            .expect("store");
        let (tx, sent) = mpsc::unbounded_channel();
        let presence = Arc::new(CountingPresence::default());
        let platform = Platform {
            location: self.location,
            sms: Arc::new(RecordingSms {
                tx,
                failing: self.failing,
            }),
            presence: presence.clone(),
            permissions: Arc::new(StaticPermissions {
                location: self.location_granted,
                sms: self.sms_granted,
            }),
        };
        Harness {
            tmp,
            store,
            platform,
            presence,
            sent,
        }
    }
}

pub const HOME: Fix = Fix {
    latitude: 12.5,
    longitude: 77.25,
};

/// Defaults: fixed location at [`HOME`], all permissions granted, every send succeeds.
pub fn harness() -> HarnessBuilder {
    HarnessBuilder {
        location: Arc::new(FixedLocation::new(HOME)),
        location_granted: true,
        sms_granted: true,
        failing: Vec::new(),
    }
}

pub fn loop_cfg() -> AlertLoopConfig {
    AlertLoopConfig {
        interval: Duration::from_secs(300),
        location_timeout: Some(Duration::from_secs(30)),
    }
}

pub fn asha() -> Contact {
    Contact::new("Asha", "+15550001")
}

pub fn ravi() -> Contact {
    Contact::new("Ravi", "+15550002")
}

/// Next delivered message, or `None` if nothing arrives within `within`.
pub async fn next_sent(rx: &mut mpsc::UnboundedReceiver<Sent>, within: Duration) -> Option<Sent> {
    tokio::time::timeout(within, rx.recv()).await.ok().flatten()
}

/// Poll controller stats until `pred` holds.
pub async fn wait_for_stats<F>(alerts: &AlertLoopHandle, pred: F) -> AlertStats
where
    F: Fn(&AlertStats) -> bool,
{
    for _ in 0..200 {
        let stats = alerts.snapshot().await.expect("controller alive");
        if pred(&stats) {
            return stats;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}
