//! Peripheral state machine and counters.
//!
//! Atomic, lock-free state tracking for a watchdog peripheral. Used by the
//! simulated peripheral and available to platform ports that want the same
//! bookkeeping.

use portable_atomic::{AtomicU32, Ordering};

/// Operational status of the watchdog peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum PeripheralStatus {
    /// Not counting down.
    #[default]
    Stopped = 0,
    /// Counting down; must be kicked before expiry.
    Running = 1,
    /// Countdown reached zero; on hardware this is an MCU reset.
    Expired = 2,
}

impl PeripheralStatus {
    /// Convert from raw u32 value.
    #[must_use]
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Stopped),
            1 => Some(Self::Running),
            2 => Some(Self::Expired),
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
            Self::Stopped => "Stopped",
            Self::Running => "Running",
            Self::Expired => "Expired",
        }
    }
}

impl core::fmt::Display for PeripheralStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Atomic peripheral state.
///
/// # Real-Time Safety
///
/// All methods are lock-free and allocation-free.
///
/// # State Transition Diagram
///
/// ```text
/// Stopped ──start()──► Running ──kick()──┐
///    ▲  ▲                │  ▲            │
///    │  └────stop()──────┘  └────────────┘
///    │                   │
///  start()/reset()    expire()
///    │                   ▼
///    └────────────── Expired
/// ```
#[derive(Debug)]
#[repr(C)]
pub struct PeripheralState {
    status: AtomicU32,
    init_count: AtomicU32,
    kick_count: AtomicU32,
    stop_count: AtomicU32,
    expiry_count: AtomicU32,
}

impl PeripheralState {
    /// Create a new state in the `Stopped` status.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: AtomicU32::new(PeripheralStatus::Stopped as u32),
            init_count: AtomicU32::new(0),
            kick_count: AtomicU32::new(0),
            stop_count: AtomicU32::new(0),
            expiry_count: AtomicU32::new(0),
        }
    }

    /// Get the current status.
    #[must_use]
    pub fn status(&self) -> PeripheralStatus {
        let raw = self.status.load(Ordering::Acquire);
        PeripheralStatus::from_raw(raw).unwrap_or(PeripheralStatus::Stopped)
    }

    /// Whether the peripheral is counting down.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status() == PeripheralStatus::Running
    }

    /// Enter `Running` from any status. Returns the previous status.
    pub fn start(&self) -> PeripheralStatus {
        let previous = self
            .status
            .swap(PeripheralStatus::Running.to_raw(), Ordering::AcqRel);
        self.init_count.fetch_add(1, Ordering::Relaxed);
        PeripheralStatus::from_raw(previous).unwrap_or(PeripheralStatus::Stopped)
    }

    /// Transition `Running` to `Stopped`. Returns whether it was running.
    pub fn stop(&self) -> bool {
        let stopped = self
            .status
            .compare_exchange(
                PeripheralStatus::Running.to_raw(),
                PeripheralStatus::Stopped.to_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if stopped {
            self.stop_count.fetch_add(1, Ordering::Relaxed);
        }
        stopped
    }

    /// Record a kick. Returns whether the peripheral was running.
    pub fn kick(&self) -> bool {
        if self.is_running() {
            self.kick_count.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Transition `Running` to `Expired`. Returns whether it was running.
    pub fn expire(&self) -> bool {
        let expired = self
            .status
            .compare_exchange(
                PeripheralStatus::Running.to_raw(),
                PeripheralStatus::Expired.to_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if expired {
            self.expiry_count.fetch_add(1, Ordering::Relaxed);
        }
        expired
    }

    /// Return to `Stopped` without touching the counters.
    pub fn reset(&self) {
        self.status
            .store(PeripheralStatus::Stopped.to_raw(), Ordering::Release);
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn metrics(&self) -> PeripheralMetrics {
        PeripheralMetrics {
            init_count: self.init_count.load(Ordering::Acquire),
            kick_count: self.kick_count.load(Ordering::Acquire),
            stop_count: self.stop_count.load(Ordering::Acquire),
            expiry_count: self.expiry_count.load(Ordering::Acquire),
        }
    }
}

impl Default for PeripheralState {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter snapshot for a watchdog peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct PeripheralMetrics {
    /// Successful `init` calls.
    pub init_count: u32,
    /// Kicks that reached a running peripheral.
    pub kick_count: u32,
    /// Successful `stop` calls.
    pub stop_count: u32,
    /// Countdowns that reached zero.
    pub expiry_count: u32,
}
