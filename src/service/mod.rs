//! # Alert Service
//!
//! Wires the pieces into one long-running service:
//!
//! ```text
//!   input lines ──► parse ──┬─► key events ──► TriggerDetector ──┐
//!                           │                                    ▼
//!                           └─► commands ─────────────────► AlertLoop ──► events ──► status logger
//! ```
//!
//! Input comes from stdin, or from the named pipe in `[input] fifo` (the
//! only source a daemon has).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use helpsathi::config::Config;
//! use helpsathi::service::AlertService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let mut service = AlertService::new(config).await?;
//!     // Reads stdin until Ctrl-C
//!     service.run().await?;
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use std::future::Future;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
#[cfg(target_os = "linux")]
use tokio::net::unix::pipe;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::alert::observer::spawn_status_logger;
use crate::alert::{start_alert_loop, AlertLoopConfig, AlertLoopHandle, OneShotResult};
use crate::config::Config;
use crate::platform::Platform;
use crate::storage::ContactStore;
use crate::trigger::{spawn_trigger_detector, KeyEvent};

pub mod input;

use input::{parse_line, InputLine, ServiceCommand};

pub struct AlertService {
    config: Config,
    store: ContactStore,
    alerts: AlertLoopHandle,
    keys_tx: Option<mpsc::UnboundedSender<KeyEvent>>,
    tasks: Vec<JoinHandle<()>>,
}

impl AlertService {
    /// Build the service with host platform implementations from `config`.
    pub async fn new(config: Config) -> Result<Self> {
        let platform = Platform::from_config(&config);
        Self::with_platform(config, platform).await
    }

    /// Build the service against a caller-supplied platform.
    pub async fn with_platform(config: Config, platform: Platform) -> Result<Self> {
        let store = ContactStore::new(&config.storage.data_dir).await?;
        let alerts = start_alert_loop(
            AlertLoopConfig::from(&config.alert),
            platform,
            store.clone(),
        );
        let (keys_tx, keys_rx) = mpsc::unbounded_channel();
        let tasks = vec![
            spawn_trigger_detector(&config.trigger, keys_rx, alerts.clone()),
            spawn_status_logger(&alerts),
        ];
        Ok(Self {
            config,
            store,
            alerts,
            keys_tx: Some(keys_tx),
            tasks,
        })
    }

    pub fn alerts(&self) -> &AlertLoopHandle {
        &self.alerts
    }

    pub fn store(&self) -> &ContactStore {
        &self.store
    }

    /// Read commands and key events until Ctrl-C, from the configured FIFO
    /// or else from stdin.
    pub async fn run(&mut self) -> Result<()> {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal");
        };
        match self.config.input.fifo.clone() {
            Some(path) => self.run_fifo_until(Path::new(&path), shutdown).await,
            None => {
                let stdin = BufReader::new(tokio::io::stdin());
                self.run_until(stdin, shutdown).await
            }
        }
    }

    /// Read input lines from the named pipe at `path` until `shutdown`.
    ///
    /// The pipe is opened read-write so the service keeps it open between
    /// writers: each writer may connect, send lines and disconnect without
    /// the service seeing end of input.
    #[cfg(target_os = "linux")]
    pub async fn run_fifo_until<F>(&mut self, path: &Path, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let receiver = pipe::OpenOptions::new()
            .read_write(true)
            .open_receiver(path)
            .map_err(|e| anyhow!("Failed to open input FIFO {}: {}", path.display(), e))?;
        info!("Reading input from FIFO {}", path.display());
        self.run_until(BufReader::new(receiver), shutdown).await
    }

    #[cfg(not(target_os = "linux"))]
    pub async fn run_fifo_until<F>(&mut self, path: &Path, _shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        Err(anyhow!(
            "FIFO input ({}) is only supported on Linux",
            path.display()
        ))
    }

    /// Process `input` until `shutdown` resolves. End of input does not stop
    /// the service; the recurring alert keeps running until shutdown.
    pub async fn run_until<R, F>(&mut self, input: R, shutdown: F) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        info!(
            "Alert service started (interval {}s, trigger {}x within {}ms)",
            self.config.alert.interval().as_secs(),
            self.config.trigger.press_count,
            self.config.trigger.debounce_ms
        );
        let mut lines = input.lines();
        let mut input_open = true;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                line = lines.next_line(), if input_open => match line {
                    Ok(Some(line)) => self.handle_line(&line).await,
                    Ok(None) => {
                        debug!("Input closed; service keeps running until shutdown");
                        input_open = false;
                    }
                    Err(e) => {
                        warn!("Input read error: {}; ignoring further input", e);
                        input_open = false;
                    }
                },
                _ = &mut shutdown => break,
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) {
        match parse_line(line) {
            Some(InputLine::Key(event)) => {
                if let Some(tx) = &self.keys_tx {
                    let _ = tx.send(event);
                }
            }
            Some(InputLine::Command(command)) => self.handle_command(command).await,
            None => {}
        }
    }

    async fn handle_command(&mut self, command: ServiceCommand) {
        match command {
            ServiceCommand::StartRecurring => self.alerts.start(),
            ServiceCommand::StopRecurring => self.alerts.stop(),
            ServiceCommand::SendAlert => {
                // Input keeps flowing while the one-shot fetches a fix.
                self.tasks.retain(|task| !task.is_finished());
                let alerts = self.alerts.clone();
                self.tasks.push(tokio::spawn(async move {
                    match alerts.send_once().await {
                        Some(OneShotResult::Completed(report)) => {
                            info!("One-shot alert finished: {}", report.summary())
                        }
                        Some(OneShotResult::Suppressed) => {
                            info!("Recurring alert is already active; one-shot not sent")
                        }
                        None => debug!("Alert loop stopped before the one-shot finished"),
                    }
                }));
            }
            ServiceCommand::Status => {
                if let Some(stats) = self.alerts.snapshot().await {
                    info!(
                        "status: state={:?} tick_pending={} in_flight={} cycles={} skipped={} sent={} failed={} contacts={}",
                        stats.state,
                        stats.tick_pending,
                        stats.cycle_in_flight,
                        stats.cycles_completed,
                        stats.cycles_skipped,
                        stats.messages_sent,
                        stats.send_failures,
                        self.store.load_contacts().await.len()
                    );
                }
            }
        }
    }

    /// Stop the loop, close the key stream and wait for background tasks.
    pub async fn shutdown(&mut self) {
        info!("Shutting down alert service...");
        self.keys_tx = None;
        self.alerts.shutdown().await;
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        info!("Alert service shutdown complete");
    }
}
