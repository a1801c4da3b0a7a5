//! Status codes and error types for watchdog peripheral operations.

use alloc::string::String;

/// Raw status reported by a watchdog peripheral driver.
///
/// Mirrors the enumerated status set a platform HAL returns from
/// `init`/`stop`. Use [`HalStatus::into_result`] to lift it into a
/// [`HalResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum HalStatus {
    /// Operation completed.
    #[default]
    Ok = 0,
    /// A parameter was outside the range the peripheral accepts.
    InvalidArgument = 1,
    /// The platform cannot perform the requested operation.
    NotSupported = 2,
}

impl HalStatus {
    /// Convert from raw u32 value.
    #[must_use]
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::InvalidArgument),
            2 => Some(Self::NotSupported),
            _ => None,
        }
    }

    /// Convert to raw u32 value.
    #[must_use]
    pub fn to_raw(self) -> u32 {
        self as u32
    }

    /// Get the status as a string slice.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::InvalidArgument => "InvalidArgument",
            Self::NotSupported => "NotSupported",
        }
    }

    /// Lift a raw status into a result, attaching `timeout_ms` and
    /// `max_timeout_ms` to invalid-argument failures.
    ///
    /// # Errors
    ///
    /// Returns the matching [`HalError`] for every status except `Ok`.
    pub fn into_result(self, timeout_ms: u32, max_timeout_ms: u32) -> HalResult<()> {
        match self {
            Self::Ok => Ok(()),
            Self::InvalidArgument => Err(HalError::InvalidArgument {
                timeout_ms,
                max_timeout_ms,
            }),
            Self::NotSupported => Err(HalError::NotSupported("operation")),
        }
    }
}

impl core::fmt::Display for HalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during watchdog peripheral operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalError {
    /// Requested timeout is zero or above the platform maximum.
    InvalidArgument {
        /// Requested timeout.
        timeout_ms: u32,
        /// Platform ceiling.
        max_timeout_ms: u32,
    },
    /// The platform does not support the named operation.
    NotSupported(&'static str),
    /// Invalid platform description.
    InvalidFeatures(String),
}

impl HalError {
    /// Create an invalid platform description error.
    #[must_use]
    pub fn invalid_features(msg: impl Into<String>) -> Self {
        Self::InvalidFeatures(msg.into())
    }

    /// The raw status code this error corresponds to.
    #[must_use]
    pub fn status(&self) -> HalStatus {
        match self {
            Self::InvalidArgument { .. } | Self::InvalidFeatures(_) => HalStatus::InvalidArgument,
            Self::NotSupported(_) => HalStatus::NotSupported,
        }
    }
}

impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidArgument {
                timeout_ms,
                max_timeout_ms,
            } => write!(
                f,
                "Invalid watchdog timeout {timeout_ms}ms (allowed 1..={max_timeout_ms}ms)"
            ),
            Self::NotSupported(op) => write!(f, "Watchdog {op} not supported by this platform"),
            Self::InvalidFeatures(msg) => write!(f, "Invalid platform features: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// A specialized `Result` type for watchdog peripheral operations.
pub type HalResult<T> = core::result::Result<T, HalError>;
