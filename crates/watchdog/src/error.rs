//! Error types for the watchdog core.
//!
//! Every recoverable condition is returned to the immediate caller; nothing
//! is retried automatically. A missed deadline is not an error: it goes
//! through [`SystemReset`](crate::SystemReset) instead.

use mbed_watchdog_hal::HalError;
use thiserror::Error;

/// Errors that can occur during watchdog operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchdogError {
    /// Timeout is zero or above the platform maximum.
    #[error("Invalid timeout {timeout_ms}ms (allowed 1..={max_timeout_ms}ms)")]
    InvalidArgument {
        /// Requested timeout.
        timeout_ms: u32,
        /// Platform ceiling.
        max_timeout_ms: u32,
    },

    /// Stop requested while the watchdog is not running.
    #[error("Watchdog is not running")]
    NotRunning,

    /// The platform cannot perform the operation (e.g. disable a running watchdog).
    #[error("Operation not supported by the watchdog peripheral")]
    NotSupported,

    /// The hardware watchdog could not be brought up.
    #[error("Watchdog initialization failed: {0}")]
    InitializationFailed(String),

    /// Every thread-registration slot is taken.
    #[error("Thread watchdog table full ({capacity} slots)")]
    Overflow {
        /// Number of slots in the table.
        capacity: usize,
    },

    /// Operation not allowed in the current state.
    #[error("Operation prohibited: {0}")]
    OperationProhibited(String),

    /// Peripheral reported an unexpected failure.
    #[error("Watchdog peripheral error: {0}")]
    Hal(HalError),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl WatchdogError {
    /// Create an invalid argument error.
    #[must_use]
    pub fn invalid_argument(timeout_ms: u32, max_timeout_ms: u32) -> Self {
        Self::InvalidArgument {
            timeout_ms,
            max_timeout_ms,
        }
    }

    /// Create an initialization failed error.
    #[must_use]
    pub fn initialization_failed(reason: impl Into<String>) -> Self {
        Self::InitializationFailed(reason.into())
    }

    /// Create an operation prohibited error.
    #[must_use]
    pub fn operation_prohibited(reason: impl Into<String>) -> Self {
        Self::OperationProhibited(reason.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }
}

impl From<HalError> for WatchdogError {
    fn from(err: HalError) -> Self {
        match err {
            HalError::InvalidArgument {
                timeout_ms,
                max_timeout_ms,
            } => Self::invalid_argument(timeout_ms, max_timeout_ms),
            HalError::NotSupported(_) => Self::NotSupported,
            other @ HalError::InvalidFeatures(_) => Self::Hal(other),
        }
    }
}

/// A specialized `Result` type for watchdog operations.
pub type WatchdogResult<T> = std::result::Result<T, WatchdogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WatchdogError::invalid_argument(0, 4096);
        assert_eq!(err.to_string(), "Invalid timeout 0ms (allowed 1..=4096ms)");

        let err = WatchdogError::Overflow { capacity: 4 };
        assert!(err.to_string().contains("4 slots"));

        let err = WatchdogError::operation_prohibited("thread not registered");
        assert!(err.to_string().contains("thread not registered"));
    }

    #[test]
    fn test_from_hal_error() {
        let err: WatchdogError = HalError::NotSupported("disable").into();
        assert_eq!(err, WatchdogError::NotSupported);

        let err: WatchdogError = HalError::InvalidArgument {
            timeout_ms: 9000,
            max_timeout_ms: 4096,
        }
        .into();
        assert_eq!(err, WatchdogError::invalid_argument(9000, 4096));

        let err: WatchdogError = HalError::invalid_features("zero").into();
        assert!(matches!(err, WatchdogError::Hal(_)));
    }
}
