//! # Alert Module
//!
//! The recurring alert loop and everything it needs to compose and send an
//! alert:
//!
//! - [`compose`] - location outcome and message text
//! - [`cycle`] - one fetch-compose-send round, used by the loop and the one-shot sender
//! - [`controller`] - the Idle/Running loop task and its handle
//! - [`observer`] - status views that follow loop transitions
//!
//! ## Usage
//!
//! ```rust,no_run
//! use helpsathi::alert::{start_alert_loop, AlertLoopConfig};
//! use helpsathi::config::Config;
//! use helpsathi::platform::Platform;
//! use helpsathi::storage::ContactStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = ContactStore::new(&config.storage.data_dir).await?;
//!     let alerts = start_alert_loop(
//!         AlertLoopConfig::from(&config.alert),
//!         Platform::from_config(&config),
//!         store,
//!     );
//!     alerts.start();
//!     // ...
//!     alerts.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod compose;
pub mod controller;
pub mod cycle;
pub mod observer;

pub use compose::{compose_message, maps_link, LocationOutcome};
pub use controller::{
    start_alert_loop, AlertEvent, AlertLoopConfig, AlertLoopHandle, AlertStats, LoopState,
    OneShotResult,
};
pub use cycle::{CycleKind, CycleOutcome, CycleReport};
pub use observer::{StatusObserver, StatusView};
