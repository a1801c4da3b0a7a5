//! Configuration types for the watchdog peripheral.

use crate::error::{HalError, HalResult};

/// Peripheral configuration passed to [`WatchdogHal::init`](crate::WatchdogHal::init).
///
/// # Real-Time Safety
///
/// Plain data; no heap allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct HalConfig {
    /// Requested timeout in milliseconds.
    ///
    /// The peripheral may round this to its own resolution; read the
    /// effective value back with `reload_value()`.
    pub timeout_ms: u32,
}

impl HalConfig {
    /// Create a configuration for the given timeout.
    #[must_use]
    pub const fn new(timeout_ms: u32) -> Self {
        Self { timeout_ms }
    }

    /// Get the timeout in microseconds.
    #[must_use]
    pub fn timeout_us(&self) -> u64 {
        u64::from(self.timeout_ms) * 1000
    }
}

/// Capabilities of the watchdog peripheral on the running platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct PlatformFeatures {
    /// Largest timeout the peripheral can be configured with, in milliseconds.
    pub max_timeout: u32,
    /// Whether a running watchdog can be re-initialised with a new timeout.
    pub update_timeout_supported: bool,
    /// Whether a running watchdog can be disabled.
    pub disable_watchdog_supported: bool,
    /// Typical frequency of the watchdog clock, in Hz.
    pub clock_typical_frequency: u32,
    /// Maximum frequency of the watchdog clock, in Hz.
    pub clock_max_frequency: u32,
}

impl PlatformFeatures {
    /// Create a feature set with the given ceiling and every optional
    /// capability enabled.
    #[must_use]
    pub fn new(max_timeout: u32) -> Self {
        Self {
            max_timeout,
            ..Self::default()
        }
    }

    /// Create a features builder.
    #[must_use]
    pub fn builder() -> PlatformFeaturesBuilder {
        PlatformFeaturesBuilder::default()
    }

    /// Validate the feature description.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_timeout` is zero or the clock frequencies are
    /// inconsistent.
    pub fn validate(&self) -> HalResult<()> {
        if self.max_timeout == 0 {
            return Err(HalError::invalid_features("max_timeout must be non-zero"));
        }
        if self.clock_typical_frequency > self.clock_max_frequency {
            return Err(HalError::invalid_features(
                "clock_typical_frequency must not exceed clock_max_frequency",
            ));
        }
        Ok(())
    }

    /// Whether `timeout_ms` lies in `1..=max_timeout`.
    #[must_use]
    pub fn accepts(&self, timeout_ms: u32) -> bool {
        (1..=self.max_timeout).contains(&timeout_ms)
    }
}

impl Default for PlatformFeatures {
    fn default() -> Self {
        Self {
            max_timeout: 4096,
            update_timeout_supported: true,
            disable_watchdog_supported: true,
            clock_typical_frequency: 32_768,
            clock_max_frequency: 40_000,
        }
    }
}

/// Builder for `PlatformFeatures`.
#[derive(Debug, Default)]
pub struct PlatformFeaturesBuilder {
    features: PlatformFeatures,
}

impl PlatformFeaturesBuilder {
    /// Set the maximum timeout in milliseconds.
    #[must_use]
    pub fn max_timeout(mut self, ms: u32) -> Self {
        self.features.max_timeout = ms;
        self
    }

    /// Allow or forbid re-initialising a running watchdog.
    #[must_use]
    pub fn update_timeout_supported(mut self, supported: bool) -> Self {
        self.features.update_timeout_supported = supported;
        self
    }

    /// Allow or forbid disabling a running watchdog.
    #[must_use]
    pub fn disable_watchdog_supported(mut self, supported: bool) -> Self {
        self.features.disable_watchdog_supported = supported;
        self
    }

    /// Set typical and maximum clock frequencies in Hz.
    #[must_use]
    pub fn clock_frequency(mut self, typical_hz: u32, max_hz: u32) -> Self {
        self.features.clock_typical_frequency = typical_hz;
        self.features.clock_max_frequency = max_hz;
        self
    }

    /// Build the feature set.
    ///
    /// # Errors
    ///
    /// Returns an error if the description is invalid.
    pub fn build(self) -> HalResult<PlatformFeatures> {
        self.features.validate()?;
        Ok(self.features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_features() {
        let features = PlatformFeatures::default();
        assert_eq!(features.max_timeout, 4096);
        assert!(features.update_timeout_supported);
        assert!(features.disable_watchdog_supported);
        assert!(features.validate().is_ok());
    }

    #[test]
    fn test_accepts_bounds() {
        let features = PlatformFeatures::new(1000);
        assert!(!features.accepts(0));
        assert!(features.accepts(1));
        assert!(features.accepts(1000));
        assert!(!features.accepts(1001));
    }

    #[test]
    fn test_builder() {
        let result = PlatformFeatures::builder()
            .max_timeout(2000)
            .disable_watchdog_supported(false)
            .clock_frequency(30_000, 33_000)
            .build();
        assert!(result.is_ok());
        if let Ok(features) = result {
            assert_eq!(features.max_timeout, 2000);
            assert!(!features.disable_watchdog_supported);
            assert!(features.update_timeout_supported);
            assert_eq!(features.clock_typical_frequency, 30_000);
        }
    }

    #[test]
    fn test_builder_rejects_invalid() {
        assert!(PlatformFeatures::builder().max_timeout(0).build().is_err());
        assert!(
            PlatformFeatures::builder()
                .clock_frequency(50_000, 40_000)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_timeout_us() {
        assert_eq!(HalConfig::new(100).timeout_us(), 100_000);
    }
}
