//! # Helpsathi - Personal Safety Alert Service
//!
//! Helpsathi sends your location to trusted contacts when you are in trouble.
//! Pressing a volume button three times in quick succession starts a
//! recurring alert: every five minutes the service takes a location fix and
//! texts the alert message, with a maps link, to every configured contact
//! until the alert is stopped.
//!
//! ## Features
//!
//! - **Volume-Button Trigger**: exactly three presses inside a 500 ms debounce window start the alert.
//! - **Recurring Alert Loop**: one cycle in flight at a time; the next cycle is scheduled when the previous one finishes.
//! - **One-Shot Alert**: the same cycle on demand, suppressed while the recurring alert runs.
//! - **Graceful Degradation**: no fix means the message goes out without a link; a failed recipient never blocks the others.
//! - **Contact Preferences**: ordered contact list and alert text in a locked, atomically replaced preferences file.
//! - **Pluggable Platform**: location, SMS, presence and permissions behind traits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use helpsathi::config::Config;
//! use helpsathi::service::AlertService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let mut service = AlertService::new(config).await?;
//!     service.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`alert`] - Recurring alert controller, cycle, message composition and status observers
//! - [`trigger`] - Volume-button press detector
//! - [`storage`] - Contact and alert message persistence
//! - [`platform`] - Location, SMS, presence and permission seams with host implementations
//! - [`service`] - Long-running service wiring and its line-oriented input
//! - [`config`] - Configuration management
//! - [`validation`] - Contact validation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ Trigger / Input │ ← Volume presses, START/STOP commands
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Alert Loop    │ ← Idle/Running controller, one cycle in flight
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Storage/Platform│ ← Contacts, location fix, SMS dispatch
//! └─────────────────┘
//! ```

pub mod alert;
pub mod config;
pub mod logutil;
pub mod platform;
pub mod service;
pub mod storage;
pub mod trigger;
pub mod validation;
