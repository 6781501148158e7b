//! Volume-button trigger detector.
//!
//! Counts qualifying key-down presses (volume up or volume down). Every press
//! pushes the evaluation deadline out by the debounce window; when the window
//! passes with no further press, the count is checked and reset:
//!
//! ```text
//! press ─► count += 1, deadline = now + debounce
//! deadline passes ─► count == press_count ? start alert : nothing; count = 0
//! ```
//!
//! Only the exact count fires. Two presses, or four or more inside one
//! window, are dropped silently.

use log::{debug, info};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::alert::AlertLoopHandle;
use crate::config::TriggerConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCode {
    VolumeUp,
    VolumeDown,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub action: KeyAction,
}

impl KeyEvent {
    pub fn down(code: KeyCode) -> Self {
        Self {
            code,
            action: KeyAction::Down,
        }
    }

    pub fn up(code: KeyCode) -> Self {
        Self {
            code,
            action: KeyAction::Up,
        }
    }

    /// Volume key-down events count towards the trigger; everything else is ignored.
    pub fn is_qualifying(&self) -> bool {
        self.action == KeyAction::Down
            && matches!(self.code, KeyCode::VolumeUp | KeyCode::VolumeDown)
    }
}

#[derive(Debug)]
pub struct TriggerDetector {
    press_count: u32,
    debounce: Duration,
    count: u32,
    deadline: Option<Instant>,
}

impl TriggerDetector {
    pub fn new(cfg: &TriggerConfig) -> Self {
        Self {
            press_count: cfg.press_count,
            debounce: cfg.debounce(),
            count: 0,
            deadline: None,
        }
    }

    /// Feed one key event observed at `now`. Returns true if it was counted.
    pub fn on_key(&mut self, event: &KeyEvent, now: Instant) -> bool {
        if !event.is_qualifying() {
            return false;
        }
        self.count = self.count.saturating_add(1);
        self.deadline = Some(now + self.debounce);
        debug!("Volume button pressed. Count: {}", self.count);
        true
    }

    /// When the pending evaluation is due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn pending_count(&self) -> u32 {
        self.count
    }

    /// Evaluate and reset the count. Returns true when the alert should start.
    pub fn evaluate(&mut self) -> bool {
        let fired = self.count == self.press_count;
        debug!("Resetting press count (was {})", self.count);
        self.count = 0;
        self.deadline = None;
        fired
    }
}

/// Run the detector against a stream of key events, starting the recurring
/// alert whenever the press pattern matches. Ends when the key stream closes.
pub fn spawn_trigger_detector(
    cfg: &TriggerConfig,
    mut keys: mpsc::UnboundedReceiver<KeyEvent>,
    alerts: AlertLoopHandle,
) -> JoinHandle<()> {
    let mut detector = TriggerDetector::new(cfg);
    tokio::spawn(async move {
        info!("Trigger detector listening for volume button presses");
        loop {
            let deadline = detector.deadline();
            tokio::select! {
                key = keys.recv() => match key {
                    Some(event) => {
                        detector.on_key(&event, Instant::now());
                    }
                    None => break,
                },
                _ = async {
                    match deadline {
                        Some(at) => sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => {
                    if detector.evaluate() {
                        info!("Trigger pattern detected; starting recurring alert");
                        alerts.start();
                    }
                }
            }
        }
        debug!("trigger detector terminated");
    })
}
