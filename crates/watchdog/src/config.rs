//! Watchdog core configuration.

use serde::{Deserialize, Serialize};

use crate::error::{WatchdogError, WatchdogResult};

/// Width of the registration bitmasks.
pub const MAX_THREAD_WATCHDOG_SLOTS: usize = 32;

/// Configuration for the watchdog core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Hardware timeout used when the virtual registry brings the
    /// peripheral up (milliseconds).
    pub hardware_timeout_ms: u32,
    /// Number of thread-registration slots (`MAX_THREAD_WATCHDOG_SUPPORT`).
    pub max_thread_watchdogs: usize,
    /// Timeout for virtual watchdogs created without one (milliseconds).
    pub default_virtual_timeout_ms: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            hardware_timeout_ms: 800,
            max_thread_watchdogs: 4,
            default_virtual_timeout_ms: 1000,
        }
    }
}

impl WatchdogConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> WatchdogResult<()> {
        if self.hardware_timeout_ms == 0 {
            return Err(WatchdogError::invalid_configuration(
                "hardware_timeout_ms must be greater than 0",
            ));
        }
        if !(1..=MAX_THREAD_WATCHDOG_SLOTS).contains(&self.max_thread_watchdogs) {
            return Err(WatchdogError::invalid_configuration(format!(
                "max_thread_watchdogs must be between 1 and {MAX_THREAD_WATCHDOG_SLOTS}"
            )));
        }
        if self.default_virtual_timeout_ms == 0 {
            return Err(WatchdogError::invalid_configuration(
                "default_virtual_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Period of the virtual-watchdog ticker: half the hardware timeout,
    /// never less than 1 ms.
    #[must_use]
    pub fn tick_period_ms(&self) -> u32 {
        (self.hardware_timeout_ms / 2).max(1)
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> WatchdogConfigBuilder {
        WatchdogConfigBuilder::default()
    }
}

/// Builder for `WatchdogConfig`.
#[derive(Debug, Default)]
pub struct WatchdogConfigBuilder {
    config: WatchdogConfig,
}

impl WatchdogConfigBuilder {
    /// Set the hardware timeout used by the virtual registry.
    #[must_use]
    pub fn hardware_timeout_ms(mut self, ms: u32) -> Self {
        self.config.hardware_timeout_ms = ms;
        self
    }

    /// Set the number of thread-registration slots.
    #[must_use]
    pub fn max_thread_watchdogs(mut self, count: usize) -> Self {
        self.config.max_thread_watchdogs = count;
        self
    }

    /// Set the default virtual watchdog timeout.
    #[must_use]
    pub fn default_virtual_timeout_ms(mut self, ms: u32) -> Self {
        self.config.default_virtual_timeout_ms = ms;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> WatchdogResult<WatchdogConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WatchdogConfig::default();
        assert_eq!(config.hardware_timeout_ms, 800);
        assert_eq!(config.max_thread_watchdogs, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tick_period() {
        let config = WatchdogConfig::default();
        assert_eq!(config.tick_period_ms(), 400);

        let config = WatchdogConfig {
            hardware_timeout_ms: 1,
            ..WatchdogConfig::default()
        };
        assert_eq!(config.tick_period_ms(), 1);
    }

    #[test]
    fn test_validation() {
        assert!(
            WatchdogConfig::builder()
                .hardware_timeout_ms(0)
                .build()
                .is_err()
        );
        assert!(
            WatchdogConfig::builder()
                .max_thread_watchdogs(0)
                .build()
                .is_err()
        );
        assert!(
            WatchdogConfig::builder()
                .max_thread_watchdogs(33)
                .build()
                .is_err()
        );
        assert!(
            WatchdogConfig::builder()
                .max_thread_watchdogs(32)
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_serde_defaults_missing_fields() -> Result<(), serde_json::Error> {
        let config: WatchdogConfig = serde_json::from_str(r#"{"hardware_timeout_ms": 2000}"#)?;
        assert_eq!(config.hardware_timeout_ms, 2000);
        assert_eq!(config.max_thread_watchdogs, 4);
        assert_eq!(config.default_virtual_timeout_ms, 1000);
        Ok(())
    }
}
