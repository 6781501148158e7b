//! Recurring alert loop controller.
//!
//! A single task owns the loop state and processes commands serially, in the
//! same shape as a message scheduler: callers hold a cheap [`AlertLoopHandle`]
//! that forwards [`AlertCommand`]s over an unbounded channel.
//!
//! ```text
//!            start()                      stop() / shutdown()
//!   Idle ───────────────► Running ───────────────────────────► Idle
//!                           │  ▲
//!               tick due    │  │  cycle finished
//!                           ▼  │  (next tick = now + interval)
//!                        cycle in flight
//! ```
//!
//! * At most one cycle is in flight at a time; recurring ticks and one-shot
//!   sends never overlap.
//! * The next tick is scheduled when a cycle finishes, so a slow location
//!   fix delays the following cycle rather than skipping it.
//! * `stop()` drops the pending tick and any recurring cycle in flight. A tick
//!   that comes due while Idle does nothing and is not rescheduled.
//! * State is published through a `watch` channel (current value) and a
//!   `broadcast` channel ([`AlertEvent`] per transition). It is never persisted:
//!   a restarted process comes up Idle.

use log::{debug, info};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};

use super::cycle::{run_cycle, CycleKind, CycleReport};
use crate::config::AlertConfig;
use crate::platform::Platform;
use crate::storage::ContactStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoopState {
    #[default]
    Idle,
    Running,
}

/// State-change notifications for observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertEvent {
    Started,
    Stopped,
}

impl AlertEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AlertEvent::Started => "RECURRING_ALERT_STARTED",
            AlertEvent::Stopped => "RECURRING_ALERT_STOPPED",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OneShotResult {
    Completed(CycleReport),
    /// The recurring loop is running (or another cycle is in flight).
    Suppressed,
}

pub enum AlertCommand {
    Start,
    Stop,
    SendOnce(oneshot::Sender<OneShotResult>),
    Snapshot(oneshot::Sender<AlertStats>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug, Clone)]
pub struct AlertLoopConfig {
    pub interval: Duration,
    pub location_timeout: Option<Duration>,
}

impl From<&AlertConfig> for AlertLoopConfig {
    fn from(cfg: &AlertConfig) -> Self {
        Self {
            interval: cfg.interval(),
            location_timeout: cfg.location_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertStats {
    pub state: LoopState,
    pub tick_pending: bool,
    pub cycle_in_flight: bool,
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub messages_sent: u64,
    pub send_failures: u64,
    pub last_cycle: Option<CycleReport>,
}

#[derive(Clone, Debug)]
pub struct AlertLoopHandle {
    tx: mpsc::UnboundedSender<AlertCommand>,
    events: broadcast::Sender<AlertEvent>,
    state: watch::Receiver<LoopState>,
}

impl AlertLoopHandle {
    /// `START_RECURRING_ALERT`
    pub fn start(&self) {
        let _ = self.tx.send(AlertCommand::Start);
    }

    /// `STOP_RECURRING_ALERT`
    pub fn stop(&self) {
        let _ = self.tx.send(AlertCommand::Stop);
    }

    /// Run a single cycle unless the recurring loop is active.
    /// Returns `None` if the controller has shut down.
    pub async fn send_once(&self) -> Option<OneShotResult> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(AlertCommand::SendOnce(tx)).is_ok() {
            rx.await.ok()
        } else {
            None
        }
    }

    pub async fn snapshot(&self) -> Option<AlertStats> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(AlertCommand::Snapshot(tx)).is_ok() {
            rx.await.ok()
        } else {
            None
        }
    }

    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(AlertCommand::Shutdown(tx));
        let _ = rx.await;
    }

    /// Last published loop state.
    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.events.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<LoopState> {
        self.state.clone()
    }
}

type CycleFuture = Pin<Box<dyn Future<Output = CycleReport> + Send>>;

struct InFlight {
    kind: CycleKind,
    fut: CycleFuture,
    reply: Option<oneshot::Sender<OneShotResult>>,
}

enum Wake {
    Command(Option<AlertCommand>),
    CycleDone(CycleReport),
    TickDue,
}

struct AlertLoop {
    cfg: AlertLoopConfig,
    platform: Platform,
    store: ContactStore,
    state: LoopState,
    next_tick: Option<Instant>,
    in_flight: Option<InFlight>,
    stats: AlertStats,
    events: broadcast::Sender<AlertEvent>,
    state_tx: watch::Sender<LoopState>,
}

/// Spawn the controller task and return its handle.
pub fn start_alert_loop(
    cfg: AlertLoopConfig,
    platform: Platform,
    store: ContactStore,
) -> AlertLoopHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<AlertCommand>();
    let (events, _) = broadcast::channel(16);
    let (state_tx, state_rx) = watch::channel(LoopState::Idle);
    let handle = AlertLoopHandle {
        tx,
        events: events.clone(),
        state: state_rx,
    };

    let mut ctl = AlertLoop {
        cfg,
        platform,
        store,
        state: LoopState::Idle,
        next_tick: None,
        in_flight: None,
        stats: AlertStats::default(),
        events,
        state_tx,
    };

    tokio::spawn(async move {
        loop {
            // A due tick waits until the in-flight cycle has finished.
            let tick_at = if ctl.in_flight.is_none() {
                ctl.next_tick
            } else {
                None
            };
            let wake = tokio::select! {
                cmd = rx.recv() => Wake::Command(cmd),
                report = async {
                    match ctl.in_flight.as_mut() {
                        Some(flight) => flight.fut.as_mut().await,
                        None => std::future::pending().await,
                    }
                } => Wake::CycleDone(report),
                _ = async {
                    match tick_at {
                        Some(at) => sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => Wake::TickDue,
            };
            match wake {
                Wake::Command(Some(cmd)) => {
                    if !ctl.handle_command(cmd) {
                        break;
                    }
                }
                Wake::Command(None) => {
                    ctl.teardown();
                    break;
                }
                Wake::CycleDone(report) => ctl.finish_cycle(report),
                Wake::TickDue => ctl.tick(),
            }
        }
        debug!("alert loop terminated");
    });

    handle
}

impl AlertLoop {
    /// Returns false when the task should exit.
    fn handle_command(&mut self, cmd: AlertCommand) -> bool {
        match cmd {
            AlertCommand::Start => self.start(),
            AlertCommand::Stop => self.stop(),
            AlertCommand::SendOnce(reply) => self.send_once(reply),
            AlertCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            AlertCommand::Shutdown(done) => {
                self.teardown();
                let _ = done.send(());
                return false;
            }
        }
        true
    }

    fn start(&mut self) {
        if self.state == LoopState::Running {
            debug!("Recurring alert already running; start ignored");
            return;
        }
        self.set_state(LoopState::Running);
        self.platform.presence.show();
        self.announce(AlertEvent::Started);
        self.next_tick = Some(Instant::now());
        info!(
            "Recurring alert started (every {}s)",
            self.cfg.interval.as_secs()
        );
    }

    fn stop(&mut self) {
        if self.state == LoopState::Idle {
            debug!("Recurring alert not running; stop ignored");
            return;
        }
        self.set_state(LoopState::Idle);
        self.next_tick = None;
        if matches!(&self.in_flight, Some(flight) if flight.kind == CycleKind::Recurring) {
            debug!("Cancelling recurring cycle in flight");
            self.in_flight = None;
        }
        self.announce(AlertEvent::Stopped);
        self.platform.presence.hide();
        info!("Recurring alert stopped");
    }

    fn tick(&mut self) {
        self.next_tick = None;
        if self.state != LoopState::Running {
            debug!("Tick after stop ignored");
            return;
        }
        debug!("Attempting to send recurring alert");
        self.launch(CycleKind::Recurring, None);
    }

    fn send_once(&mut self, reply: oneshot::Sender<OneShotResult>) {
        if self.state == LoopState::Running || self.in_flight.is_some() {
            info!("Recurring alert already active; one-shot send suppressed");
            let _ = reply.send(OneShotResult::Suppressed);
            return;
        }
        info!("Sending one-shot alert");
        self.launch(CycleKind::OneShot, Some(reply));
    }

    fn launch(&mut self, kind: CycleKind, reply: Option<oneshot::Sender<OneShotResult>>) {
        let fut = run_cycle(
            self.platform.clone(),
            self.store.clone(),
            self.cfg.location_timeout,
            kind,
        );
        self.in_flight = Some(InFlight {
            kind,
            fut: Box::pin(fut),
            reply,
        });
    }

    fn finish_cycle(&mut self, report: CycleReport) {
        let Some(flight) = self.in_flight.take() else {
            return;
        };

        self.stats.cycles_completed += 1;
        if report.skipped() {
            self.stats.cycles_skipped += 1;
        }
        self.stats.messages_sent += report.sent() as u64;
        self.stats.send_failures += report.failed() as u64;
        self.stats.last_cycle = Some(report.clone());

        match flight.kind {
            CycleKind::OneShot => {
                if let Some(reply) = flight.reply {
                    let _ = reply.send(OneShotResult::Completed(report));
                }
            }
            CycleKind::Recurring => {
                if self.state == LoopState::Running {
                    self.next_tick = Some(Instant::now() + self.cfg.interval);
                    debug!(
                        "Next recurring alert in {}s",
                        self.cfg.interval.as_secs()
                    );
                }
            }
        }
    }

    /// Process teardown: cancel everything and tell observers the loop is gone.
    fn teardown(&mut self) {
        self.next_tick = None;
        self.in_flight = None;
        if self.state == LoopState::Running {
            self.set_state(LoopState::Idle);
            self.platform.presence.hide();
        }
        self.announce(AlertEvent::Stopped);
        info!("Alert loop shut down");
    }

    fn snapshot(&self) -> AlertStats {
        AlertStats {
            state: self.state,
            tick_pending: self.next_tick.is_some(),
            cycle_in_flight: self.in_flight.is_some(),
            ..self.stats.clone()
        }
    }

    fn set_state(&mut self, state: LoopState) {
        self.state = state;
        self.state_tx.send_replace(state);
    }

    fn announce(&self, event: AlertEvent) {
        if self.events.send(event).is_err() {
            debug!("{} not delivered: no observers", event.name());
        }
    }
}
