//! # mbed-watchdog
//!
//! Watchdog services layered over one hardware watchdog peripheral.
//!
//! The peripheral is reached through the [`mbed_watchdog_hal::WatchdogHal`]
//! trait and owned by a single [`HardwareWatchdogManager`]. Two front ends
//! share it:
//!
//! - [`ThreadWatchdog`]: threads register with a timeout and the hardware is
//!   only kicked once every registered thread has kicked. The timeout can
//!   shrink through registration but never grow.
//! - [`VirtualWatchdogRegistry`] / [`VirtualWatchdog`]: software watchdogs
//!   with their own timeouts, aged by a periodic ticker that kicks the
//!   hardware while every client is on time and resets the system when one
//!   is not.
//!
//! ## Architecture
//!
//! - [`manager`] - Exclusive owner of the peripheral
//! - [`thread`] - AND-of-liveness thread registration
//! - [`virtual_watchdog`] - Ticker-driven software watchdogs
//! - [`ticker`] - Hosted ticker implementations
//! - [`reset`] - System reset hook
//! - [`config`] - Serde-backed configuration
//! - [`error`] - Watchdog-specific error types
//!
//! ## Context Notes
//!
//! [`HardwareWatchdogManager::kick`] and [`VirtualWatchdogRegistry::process`]
//! only take a critical section and never block, so they may run from ticker
//! or interrupt context. Registration calls allocate and may block on the
//! registration lock.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mbed_watchdog::prelude::*;
//! use mbed_watchdog_hal::SimulatedWatchdog;
//!
//! let wdt = SimulatedWatchdog::default();
//! let manager = Arc::new(HardwareWatchdogManager::new(wdt.clone()));
//!
//! manager.start(500).expect("valid timeout");
//! assert_eq!(manager.reload_value(), 500);
//!
//! wdt.advance_ms(400);
//! manager.kick();
//! wdt.advance_ms(400);
//! assert!(!wdt.has_expired());
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod manager;
pub mod reset;
pub mod thread;
pub mod ticker;
pub mod virtual_watchdog;

pub mod prelude;

pub use config::{MAX_THREAD_WATCHDOG_SLOTS, WatchdogConfig, WatchdogConfigBuilder};
pub use error::{WatchdogError, WatchdogResult};
pub use manager::{HardwareWatchdogManager, ManagerStats};
pub use reset::{AbortReset, RecordingReset, ResetCause, SystemReset};
pub use thread::ThreadWatchdog;
pub use ticker::{ManualTicker, ThreadTicker};
pub use virtual_watchdog::{ClientKey, ClientSnapshot, VirtualWatchdog, VirtualWatchdogRegistry};
