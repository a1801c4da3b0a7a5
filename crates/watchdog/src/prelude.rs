//! Prelude for mbed-watchdog.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mbed_watchdog::prelude::*;
//! use mbed_watchdog_hal::SimulatedWatchdog;
//!
//! let manager = Arc::new(HardwareWatchdogManager::new(SimulatedWatchdog::default()));
//! let watchdog: ThreadWatchdog<_> = ThreadWatchdog::new(manager, &WatchdogConfig::default()).expect("valid config");
//! watchdog.register_current(1000).expect("slot available");
//! watchdog.kick_current();
//! ```

pub use crate::config::{WatchdogConfig, WatchdogConfigBuilder};
pub use crate::error::{WatchdogError, WatchdogResult};
pub use crate::manager::{HardwareWatchdogManager, ManagerStats};
pub use crate::reset::{AbortReset, RecordingReset, ResetCause, SystemReset};
pub use crate::thread::ThreadWatchdog;
pub use crate::ticker::{ManualTicker, ThreadTicker};
pub use crate::virtual_watchdog::{VirtualWatchdog, VirtualWatchdogRegistry};
