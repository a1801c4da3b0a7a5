//! Watchdog peripheral capability trait.
//!
//! This is the only surface through which the watchdog core touches the
//! physical timer. Platform ports implement it on top of their register
//! blocks; hosts use [`SimulatedWatchdog`](crate::SimulatedWatchdog).

use crate::config::{HalConfig, PlatformFeatures};
use crate::error::HalResult;

/// Capability interface of one physical watchdog peripheral.
///
/// If the peripheral is running and `kick()` is not called within the
/// configured timeout, the MCU resets.
///
/// # Real-Time Safety
///
/// Implementations must not block: `kick()` is called from ticker and
/// interrupt contexts.
///
/// # Implementation Requirements
///
/// 1. `init()` MUST reject a zero timeout or one above
///    `platform_features().max_timeout` with `InvalidArgument`
/// 2. `init()` on a running peripheral MUST return `NotSupported` when
///    `update_timeout_supported` is false
/// 3. `stop()` MUST return `NotSupported` when `disable_watchdog_supported`
///    is false
/// 4. `reload_value()` MUST report the effective hardware timeout, after any
///    rounding the peripheral applied
pub trait WatchdogHal: Send {
    /// Configure and start the watchdog with the given timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The timeout is outside `1..=max_timeout`
    /// - The peripheral is running and cannot be re-initialised
    fn init(&mut self, config: &HalConfig) -> HalResult<()>;

    /// Refresh the countdown.
    ///
    /// # Real-Time Safety
    ///
    /// WCET: implementation-defined, typically a single register write.
    fn kick(&mut self);

    /// Disable the watchdog.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot disable a running watchdog.
    fn stop(&mut self) -> HalResult<()>;

    /// Currently configured timeout in milliseconds, read from the peripheral.
    fn reload_value(&self) -> u32;

    /// Capabilities of this peripheral.
    fn platform_features(&self) -> PlatformFeatures;
}
