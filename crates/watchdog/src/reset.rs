//! Fatal failure hook.
//!
//! A virtual watchdog that misses its deadline resets the system. The reset
//! is injected so hosts and tests can observe it instead of dying.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Why the system is being reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetCause {
    /// Name of the virtual watchdog that expired.
    pub client: String,
    /// Its configured timeout in milliseconds.
    pub timeout_ms: u32,
    /// Milliseconds counted since its last kick.
    pub elapsed_ms: u32,
}

impl std::fmt::Display for ResetCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "virtual watchdog '{}' expired ({}ms elapsed, timeout {}ms)",
            self.client, self.elapsed_ms, self.timeout_ms
        )
    }
}

/// Unconditional system reset.
///
/// Called from ticker context; implementations must not block. On target
/// hardware this never returns.
pub trait SystemReset: Send + Sync {
    /// Reset the system.
    fn system_reset(&self, cause: &ResetCause);
}

/// Reset that aborts the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbortReset;

impl SystemReset for AbortReset {
    fn system_reset(&self, cause: &ResetCause) {
        tracing::error!(%cause, "System reset requested, aborting process");
        std::process::abort();
    }
}

/// Reset that records every request and lets execution continue.
#[derive(Debug, Default)]
pub struct RecordingReset {
    causes: Mutex<Vec<ResetCause>>,
}

impl RecordingReset {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resets requested so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.causes.lock().len()
    }

    /// Whether any reset was requested.
    #[must_use]
    pub fn triggered(&self) -> bool {
        self.count() > 0
    }

    /// All recorded causes, oldest first.
    #[must_use]
    pub fn causes(&self) -> Vec<ResetCause> {
        self.causes.lock().clone()
    }

    /// Forget recorded causes.
    pub fn clear(&self) {
        self.causes.lock().clear();
    }
}

impl SystemReset for RecordingReset {
    fn system_reset(&self, cause: &ResetCause) {
        self.causes.lock().push(cause.clone());
    }
}
