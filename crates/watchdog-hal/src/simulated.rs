//! Simulated watchdog peripheral.
//!
//! This module provides `SimulatedWatchdog`, a software implementation of
//! [`WatchdogHal`] for hosts and tests. Time only moves when the owner calls
//! [`SimulatedWatchdog::advance_ms`], so expiry is fully deterministic.

use alloc::sync::Arc;

use crate::config::{HalConfig, PlatformFeatures};
use crate::error::{HalError, HalResult};
use crate::hal::WatchdogHal;
use crate::state::{PeripheralMetrics, PeripheralState, PeripheralStatus};
use portable_atomic::{AtomicU32, AtomicU64, Ordering};

#[derive(Debug)]
struct SimulatedCore {
    features: PlatformFeatures,
    resolution_ms: u32,
    state: PeripheralState,
    reload_ms: AtomicU32,
    remaining_ms: AtomicU32,
    elapsed_ms: AtomicU64,
}

/// Software watchdog peripheral on a virtual millisecond clock.
///
/// Clones share one peripheral: hand one clone to the watchdog manager and
/// keep another to drive the clock and observe expiries.
///
/// An expiry does not reset anything; it moves the peripheral to
/// [`PeripheralStatus::Expired`] and bumps `expiry_count`.
///
/// # Example
///
/// ```rust
/// use mbed_watchdog_hal::{HalConfig, PlatformFeatures, SimulatedWatchdog, WatchdogHal};
///
/// let wdt = SimulatedWatchdog::new(PlatformFeatures::new(1000));
/// let mut driver = wdt.clone();
///
/// driver.init(&HalConfig::new(100)).expect("valid timeout");
/// wdt.advance_ms(150);
/// assert!(wdt.has_expired());
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedWatchdog {
    core: Arc<SimulatedCore>,
}

impl SimulatedWatchdog {
    /// Create a simulated peripheral with 1 ms resolution.
    #[must_use]
    pub fn new(features: PlatformFeatures) -> Self {
        Self::with_resolution(features, 1)
    }

    /// Create a simulated peripheral that rounds requested timeouts up to a
    /// multiple of `resolution_ms` (capped at `max_timeout`).
    ///
    /// A zero resolution is treated as 1 ms.
    #[must_use]
    pub fn with_resolution(features: PlatformFeatures, resolution_ms: u32) -> Self {
        Self {
            core: Arc::new(SimulatedCore {
                features,
                resolution_ms: resolution_ms.max(1),
                state: PeripheralState::new(),
                reload_ms: AtomicU32::new(0),
                remaining_ms: AtomicU32::new(0),
                elapsed_ms: AtomicU64::new(0),
            }),
        }
    }

    /// Create a simulated peripheral after validating `features`.
    ///
    /// # Errors
    ///
    /// Returns an error if the feature description is invalid.
    pub fn try_new(features: PlatformFeatures) -> HalResult<Self> {
        features.validate()?;
        Ok(Self::new(features))
    }

    /// Advance the virtual clock, expiring the peripheral if its countdown
    /// reaches zero.
    pub fn advance_ms(&self, ms: u32) {
        let core = &self.core;
        core.elapsed_ms.fetch_add(u64::from(ms), Ordering::AcqRel);
        if !core.state.is_running() {
            return;
        }
        let previous = core
            .remaining_ms
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |r| {
                Some(r.saturating_sub(ms))
            })
            .unwrap_or(0);
        if previous <= ms {
            core.state.expire();
        }
    }

    /// Whether the countdown has reached zero since the last `init`.
    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.core.state.status() == PeripheralStatus::Expired
    }

    /// Whether the peripheral is counting down.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.core.state.is_running()
    }

    /// Current peripheral status.
    #[must_use]
    pub fn status(&self) -> PeripheralStatus {
        self.core.state.status()
    }

    /// Milliseconds left before expiry; zero when not running.
    #[must_use]
    pub fn remaining_ms(&self) -> u32 {
        if self.is_running() {
            self.core.remaining_ms.load(Ordering::Acquire)
        } else {
            0
        }
    }

    /// Total virtual time advanced so far.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.core.elapsed_ms.load(Ordering::Acquire)
    }

    /// Counter snapshot.
    #[must_use]
    pub fn metrics(&self) -> PeripheralMetrics {
        self.core.state.metrics()
    }

    /// Timeout the peripheral will actually use for a request.
    fn effective_timeout(&self, requested_ms: u32) -> u32 {
        let resolution = u64::from(self.core.resolution_ms);
        let rounded = u64::from(requested_ms).div_ceil(resolution) * resolution;
        let max = self.core.features.max_timeout;
        u32::try_from(rounded).map_or(max, |r| r.min(max))
    }
}

impl WatchdogHal for SimulatedWatchdog {
    fn init(&mut self, config: &HalConfig) -> HalResult<()> {
        let features = self.core.features;
        if !features.accepts(config.timeout_ms) {
            return Err(HalError::InvalidArgument {
                timeout_ms: config.timeout_ms,
                max_timeout_ms: features.max_timeout,
            });
        }
        if self.core.state.is_running() && !features.update_timeout_supported {
            return Err(HalError::NotSupported("timeout update"));
        }

        let effective = self.effective_timeout(config.timeout_ms);
        self.core.reload_ms.store(effective, Ordering::Release);
        self.core.remaining_ms.store(effective, Ordering::Release);
        self.core.state.start();
        Ok(())
    }

    fn kick(&mut self) {
        if self.core.state.kick() {
            let reload = self.core.reload_ms.load(Ordering::Acquire);
            self.core.remaining_ms.store(reload, Ordering::Release);
        }
    }

    fn stop(&mut self) -> HalResult<()> {
        if !self.core.features.disable_watchdog_supported {
            return Err(HalError::NotSupported("disable"));
        }
        self.core.state.stop();
        Ok(())
    }

    fn reload_value(&self) -> u32 {
        self.core.reload_ms.load(Ordering::Acquire)
    }

    fn platform_features(&self) -> PlatformFeatures {
        self.core.features
    }
}

impl Default for SimulatedWatchdog {
    fn default() -> Self {
        Self::new(PlatformFeatures::default())
    }
}
