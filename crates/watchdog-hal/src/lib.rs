//! # mbed-watchdog-hal
//!
//! Capability interfaces for a single physical watchdog peripheral and a
//! periodic low-power ticker, plus a simulated peripheral for hosts without
//! real hardware.
//!
//! This crate provides a `#![no_std]`-compatible HAL boundary with:
//! - [`WatchdogHal`] trait: `init`, `kick`, `stop`, `reload_value`,
//!   `platform_features`
//! - [`Ticker`] trait: `attach_us` periodic callback primitive
//! - [`SimulatedWatchdog`] driven by a virtual millisecond clock
//! - [`PeripheralState`] with deterministic, atomic transitions
//!
//! ## Peripheral State Machine
//!
//! ```text
//! ┌─────────┐   init()    ┌─────────┐
//! │ Stopped │────────────►│ Running │◄──┐ kick()
//! └─────────┘             └─────────┘───┘
//!      ▲                    │      │
//!      │ stop()             │      │ countdown reaches 0
//!      └────────────────────┘      ▼
//!                             ┌─────────┐
//!                             │ Expired │ (MCU reset)
//!                             └─────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use mbed_watchdog_hal::prelude::*;
//!
//! let mut wdt = SimulatedWatchdog::new(PlatformFeatures::default());
//! wdt.init(&HalConfig::new(500)).expect("valid timeout");
//!
//! wdt.advance_ms(400);
//! wdt.kick();
//! wdt.advance_ms(400);
//! assert!(!wdt.has_expired());
//!
//! wdt.advance_ms(200);
//! assert!(wdt.has_expired());
//! ```

#![no_std]
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

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod config;
pub mod error;
pub mod hal;
pub mod prelude;
pub mod simulated;
pub mod state;
pub mod ticker;

pub use config::{HalConfig, PlatformFeatures, PlatformFeaturesBuilder};
pub use error::{HalError, HalResult, HalStatus};
pub use hal::WatchdogHal;
pub use simulated::SimulatedWatchdog;
pub use state::{PeripheralMetrics, PeripheralState, PeripheralStatus};
pub use ticker::{Ticker, TickerCallback};
