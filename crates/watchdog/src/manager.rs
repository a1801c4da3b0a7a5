//! Single point of control for the physical watchdog peripheral.
//!
//! Every other component (thread registration, virtual watchdogs) goes
//! through [`HardwareWatchdogManager`]; nothing else touches the HAL.

use std::cell::RefCell;

use critical_section::Mutex;
use mbed_watchdog_hal::{HalConfig, PlatformFeatures, WatchdogHal};
use serde::{Deserialize, Serialize};

use crate::error::{WatchdogError, WatchdogResult};

struct ManagerState<H> {
    hal: H,
    running: bool,
    starts: u64,
    stops: u64,
    kicks: u64,
}

/// Snapshot of the manager for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerStats {
    /// Whether the peripheral is running.
    pub running: bool,
    /// Effective timeout reported by the peripheral.
    pub reload_value_ms: u32,
    /// Platform ceiling.
    pub max_timeout_ms: u32,
    /// Successful starts.
    pub starts: u64,
    /// Successful stops.
    pub stops: u64,
    /// Kicks forwarded to the peripheral.
    pub kicks: u64,
}

/// Owner of the one physical watchdog.
///
/// State lives behind a critical section rather than a blocking lock, so
/// `kick()` is safe from ticker and interrupt contexts as well as threads.
///
/// # Example
///
/// ```rust
/// use mbed_watchdog::HardwareWatchdogManager;
/// use mbed_watchdog_hal::{PlatformFeatures, SimulatedWatchdog};
///
/// let wdt = SimulatedWatchdog::new(PlatformFeatures::new(4096));
/// let manager = HardwareWatchdogManager::new(wdt.clone());
///
/// manager.start(500).expect("valid timeout");
/// wdt.advance_ms(400);
/// manager.kick();
/// wdt.advance_ms(400);
/// assert!(!wdt.has_expired());
/// ```
pub struct HardwareWatchdogManager<H> {
    state: Mutex<RefCell<ManagerState<H>>>,
}

impl<H: WatchdogHal> HardwareWatchdogManager<H> {
    /// Take ownership of a peripheral. The watchdog is not started.
    #[must_use]
    pub fn new(hal: H) -> Self {
        Self {
            state: Mutex::new(RefCell::new(ManagerState {
                hal,
                running: false,
                starts: 0,
                stops: 0,
                kicks: 0,
            })),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ManagerState<H>) -> R) -> R {
        critical_section::with(|cs| f(&mut *self.state.borrow_ref_mut(cs)))
    }

    /// Start the watchdog with `timeout_ms`.
    ///
    /// On an already running watchdog this re-initialises the peripheral
    /// with the new timeout, which the platform may refuse.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `timeout_ms` is zero or above [`max_timeout`](Self::max_timeout);
    ///   nothing is changed
    /// - The peripheral refuses the configuration
    pub fn start(&self, timeout_ms: u32) -> WatchdogResult<()> {
        self.arm(timeout_ms, false)
    }

    /// Start the watchdog with the platform's maximum timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the peripheral refuses the configuration.
    pub fn start_default(&self) -> WatchdogResult<()> {
        self.start(self.max_timeout())
    }

    /// Start the watchdog only if nobody has started it yet.
    ///
    /// The running check and the arming happen in one critical section.
    pub(crate) fn start_exclusive(&self, timeout_ms: u32) -> WatchdogResult<()> {
        self.arm(timeout_ms, true)
    }

    fn arm(&self, timeout_ms: u32, exclusive: bool) -> WatchdogResult<()> {
        let result = self.with_state(|s| {
            if exclusive && s.running {
                return Err(WatchdogError::initialization_failed(
                    "hardware watchdog already started by another owner",
                ));
            }
            let max = s.hal.platform_features().max_timeout;
            if timeout_ms == 0 || timeout_ms > max {
                return Err(WatchdogError::invalid_argument(timeout_ms, max));
            }
            s.hal.init(&HalConfig::new(timeout_ms))?;
            s.running = true;
            s.starts += 1;
            Ok(s.hal.reload_value())
        });

        match result {
            Ok(reload_ms) => {
                tracing::info!(
                    requested_ms = timeout_ms,
                    reload_ms,
                    "Hardware watchdog started"
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!(requested_ms = timeout_ms, error = %err, "Hardware watchdog start rejected");
                Err(err)
            }
        }
    }

    /// Stop the watchdog.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The watchdog is not running (`NotRunning`)
    /// - The platform cannot disable a running watchdog (`NotSupported`);
    ///   it keeps running
    pub fn stop(&self) -> WatchdogResult<()> {
        let result = self.with_state(|s| {
            if !s.running {
                return Err(WatchdogError::NotRunning);
            }
            s.hal.stop()?;
            s.running = false;
            s.stops += 1;
            Ok(())
        });

        match &result {
            Ok(()) => tracing::info!("Hardware watchdog stopped"),
            Err(WatchdogError::NotRunning) => {
                tracing::debug!("Stop requested on a stopped hardware watchdog");
            }
            Err(err) => tracing::warn!(error = %err, "Hardware watchdog refused to stop"),
        }
        result
    }

    /// Refresh the countdown. No-op when the watchdog is not running.
    pub fn kick(&self) {
        self.with_state(|s| {
            if s.running {
                s.hal.kick();
                s.kicks += 1;
            }
        });
    }

    /// Whether the watchdog is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.with_state(|s| s.running)
    }

    /// Effective timeout in milliseconds, read from the peripheral.
    #[must_use]
    pub fn reload_value(&self) -> u32 {
        self.with_state(|s| s.hal.reload_value())
    }

    /// Largest timeout the platform accepts, in milliseconds.
    #[must_use]
    pub fn max_timeout(&self) -> u32 {
        self.platform_features().max_timeout
    }

    /// Capabilities of the peripheral.
    #[must_use]
    pub fn platform_features(&self) -> PlatformFeatures {
        self.with_state(|s| s.hal.platform_features())
    }

    /// Diagnostics snapshot.
    #[must_use]
    pub fn stats(&self) -> ManagerStats {
        self.with_state(|s| ManagerStats {
            running: s.running,
            reload_value_ms: s.hal.reload_value(),
            max_timeout_ms: s.hal.platform_features().max_timeout,
            starts: s.starts,
            stops: s.stops,
            kicks: s.kicks,
        })
    }
}

impl<H: WatchdogHal> std::fmt::Debug for HardwareWatchdogManager<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareWatchdogManager")
            .field("stats", &self.stats())
            .finish()
    }
}
