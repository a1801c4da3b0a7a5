//! Prelude for mbed-watchdog-hal.
//!
//! This module re-exports the most commonly used types for convenient importing.
//!
//! # Example
//!
//! ```rust
//! use mbed_watchdog_hal::prelude::*;
//!
//! let mut wdt = SimulatedWatchdog::new(PlatformFeatures::default());
//! wdt.init(&HalConfig::new(100)).expect("valid timeout");
//! wdt.kick();
//! assert_eq!(wdt.reload_value(), 100);
//! ```

pub use crate::config::{HalConfig, PlatformFeatures, PlatformFeaturesBuilder};
pub use crate::error::{HalError, HalResult, HalStatus};
pub use crate::hal::WatchdogHal;
pub use crate::simulated::SimulatedWatchdog;
pub use crate::state::{PeripheralMetrics, PeripheralState, PeripheralStatus};
pub use crate::ticker::{Ticker, TickerCallback};
