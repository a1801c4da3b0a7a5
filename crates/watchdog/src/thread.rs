//! Per-thread watchdog registration.
//!
//! Several threads share the one hardware watchdog. Each registered thread
//! owns a bit in `bitmask`; a thread's `kick` only sets its bit in
//! `kick_bitmask`, and the hardware is kicked once every registered bit is
//! present. A single stalled thread therefore starves the hardware and the
//! system resets.
//!
//! The hardware timeout can only shrink through registration: a thread that
//! asks for less than the timeout last requested stops the watchdog and
//! re-arms it with the smaller value.

use std::sync::Arc;
use std::thread::ThreadId;

use mbed_watchdog_hal::WatchdogHal;
use parking_lot::Mutex;

use crate::config::{MAX_THREAD_WATCHDOG_SLOTS, WatchdogConfig};
use crate::error::{WatchdogError, WatchdogResult};
use crate::manager::HardwareWatchdogManager;

#[derive(Debug, Clone, Copy)]
struct ThreadSlot<T> {
    tid: T,
    bit_idx: u32,
}

#[derive(Debug)]
struct RegistrationState<T> {
    is_initialized: bool,
    armed_timeout: u32,
    reload_timeout: u32,
    bitmask: u32,
    kick_bitmask: u32,
    pending_timeout: Option<u32>,
    slots: Vec<Option<ThreadSlot<T>>>,
}

impl<T: Copy + Eq> RegistrationState<T> {
    fn find(&self, tid: T) -> Option<ThreadSlot<T>> {
        self.slots.iter().flatten().find(|slot| slot.tid == tid).copied()
    }

    fn allocate(&mut self, tid: T) -> Option<ThreadSlot<T>> {
        let (idx, entry) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, entry)| entry.is_none())?;
        let bit_idx = u32::try_from(idx).ok()?;
        let slot = ThreadSlot { tid, bit_idx };
        *entry = Some(slot);
        self.bitmask |= 1 << bit_idx;
        Some(slot)
    }

    fn release(&mut self, slot: ThreadSlot<T>) {
        let bit = 1u32 << slot.bit_idx;
        self.bitmask &= !bit;
        self.kick_bitmask &= !bit;
        if let Some(entry) = usize::try_from(slot.bit_idx)
            .ok()
            .and_then(|idx| self.slots.get_mut(idx))
        {
            *entry = None;
        }
    }
}

/// Thread-registration front end over a [`HardwareWatchdogManager`].
///
/// All bitmask transitions happen under one coarse lock. The lock is only
/// held for the bitmask update and the non-blocking manager call that goes
/// with it.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use mbed_watchdog::{HardwareWatchdogManager, ThreadWatchdog, WatchdogConfig};
/// use mbed_watchdog_hal::SimulatedWatchdog;
///
/// let wdt = SimulatedWatchdog::default();
/// let manager = Arc::new(HardwareWatchdogManager::new(wdt.clone()));
/// let watchdog: ThreadWatchdog<_, u32> =
///     ThreadWatchdog::new(manager, &WatchdogConfig::default()).expect("valid config");
///
/// watchdog.wd_register(1, 1000).expect("slot available");
/// watchdog.wd_register(2, 1000).expect("slot available");
///
/// watchdog.kick(1);
/// assert_eq!(wdt.metrics().kick_count, 0);
/// watchdog.kick(2);
/// assert_eq!(wdt.metrics().kick_count, 1);
/// ```
pub struct ThreadWatchdog<H, T = ThreadId> {
    manager: Arc<HardwareWatchdogManager<H>>,
    state: Mutex<RegistrationState<T>>,
}

impl<H, T> ThreadWatchdog<H, T>
where
    H: WatchdogHal,
    T: Copy + Eq + std::fmt::Debug,
{
    /// Create the registration table over `manager`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        manager: Arc<HardwareWatchdogManager<H>>,
        config: &WatchdogConfig,
    ) -> WatchdogResult<Self> {
        config.validate()?;
        let capacity = config.max_thread_watchdogs.min(MAX_THREAD_WATCHDOG_SLOTS);
        Ok(Self {
            manager,
            state: Mutex::new(RegistrationState {
                is_initialized: false,
                armed_timeout: 0,
                reload_timeout: 0,
                bitmask: 0,
                kick_bitmask: 0,
                pending_timeout: None,
                slots: vec![None; capacity],
            }),
        })
    }

    /// Register `tid` with a timeout.
    ///
    /// The first registration starts the hardware watchdog with
    /// `timeout_ms`. A later registration with a timeout below the one last
    /// requested when arming stops the hardware and re-arms it with the smaller value;
    /// a larger timeout never grows the configured one. A thread that is
    /// already registered keeps its slot.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `timeout_ms` is zero or above the platform maximum
    ///   (`InvalidArgument`); nothing is changed
    /// - Every slot is taken (`Overflow`)
    /// - The hardware could not be armed (`InitializationFailed`); a slot
    ///   allocated by this call is released again and a pending shrink is
    ///   kept for the next attempt
    pub fn wd_register(&self, tid: T, timeout_ms: u32) -> WatchdogResult<()> {
        let max = self.manager.max_timeout();
        if timeout_ms == 0 || timeout_ms > max {
            tracing::warn!(?tid, requested_ms = timeout_ms, max_ms = max, "Watchdog registration rejected");
            return Err(WatchdogError::invalid_argument(timeout_ms, max));
        }

        let mut st = self.state.lock();

        let (slot, newly_allocated) = match st.find(tid) {
            Some(slot) => (slot, false),
            None => {
                let capacity = st.slots.len();
                let slot = st
                    .allocate(tid)
                    .ok_or(WatchdogError::Overflow { capacity })?;
                (slot, true)
            }
        };

        // Compare requests, not the rounded reload value.
        if st.is_initialized && timeout_ms < st.armed_timeout {
            tracing::warn!(
                ?tid,
                requested_ms = timeout_ms,
                current_ms = st.armed_timeout,
                "Shorter watchdog timeout requested, re-initializing hardware"
            );
            match self.manager.stop() {
                Ok(()) | Err(WatchdogError::NotRunning) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "Could not stop hardware before re-initialization");
                }
            }
            st.is_initialized = false;
            st.pending_timeout = Some(st.pending_timeout.map_or(timeout_ms, |p| p.min(timeout_ms)));
        }

        if !st.is_initialized || st.pending_timeout.is_some() {
            let arm_ms = st.pending_timeout.map_or(timeout_ms, |p| p.min(timeout_ms));
            if let Err(err) = self.manager.start(arm_ms) {
                if newly_allocated {
                    st.release(slot);
                }
                return Err(WatchdogError::initialization_failed(err.to_string()));
            }
            st.is_initialized = true;
            st.pending_timeout = None;
            st.armed_timeout = arm_ms;
            st.reload_timeout = self.manager.reload_value();
            st.kick_bitmask = 0;
        }

        tracing::info!(
            ?tid,
            bit_idx = slot.bit_idx,
            timeout_ms,
            reload_ms = st.reload_timeout,
            "Thread registered with watchdog"
        );
        Ok(())
    }

    /// Record that `tid` is alive.
    ///
    /// The hardware is kicked only when every registered thread has checked
    /// in since the previous hardware kick. Kicks from unregistered threads
    /// are ignored.
    pub fn kick(&self, tid: T) {
        let mut st = self.state.lock();
        let Some(slot) = st.find(tid) else {
            tracing::warn!(?tid, "Kick from a thread without a watchdog slot ignored");
            return;
        };

        st.kick_bitmask |= 1 << slot.bit_idx;
        if st.kick_bitmask == st.bitmask {
            self.manager.kick();
            st.kick_bitmask = 0;
            tracing::trace!("All registered threads alive, hardware watchdog kicked");
        }
    }

    /// Remove `tid`. Removing the last thread stops the hardware watchdog.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `tid` has no active slot (`OperationProhibited`)
    /// - The last thread left but the platform cannot disable the watchdog
    ///   (`NotSupported`); the slot is released regardless
    pub fn wd_unregister(&self, tid: T) -> WatchdogResult<()> {
        let mut st = self.state.lock();
        let slot = st.find(tid).ok_or_else(|| {
            WatchdogError::operation_prohibited(format!("thread {tid:?} is not registered"))
        })?;
        st.release(slot);
        tracing::info!(?tid, bit_idx = slot.bit_idx, "Thread unregistered from watchdog");

        if st.bitmask == 0 {
            st.is_initialized = false;
            st.pending_timeout = None;
            st.kick_bitmask = 0;
            match self.manager.stop() {
                Ok(()) | Err(WatchdogError::NotRunning) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Arm the hardware with the configured (or pending, smaller) timeout.
    ///
    /// Does nothing when the hardware is already armed and no shrink is
    /// pending.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No thread is registered (`OperationProhibited`)
    /// - The hardware could not be armed (`InitializationFailed`)
    pub fn start(&self) -> WatchdogResult<()> {
        let mut st = self.state.lock();
        if st.bitmask == 0 {
            return Err(WatchdogError::operation_prohibited(
                "no thread is registered with the watchdog",
            ));
        }
        if st.is_initialized && st.pending_timeout.is_none() {
            return Ok(());
        }
        let arm_ms = st.pending_timeout.unwrap_or(st.armed_timeout);
        self.manager
            .start(arm_ms)
            .map_err(|err| WatchdogError::initialization_failed(err.to_string()))?;
        st.is_initialized = true;
        st.pending_timeout = None;
        st.armed_timeout = arm_ms;
        st.reload_timeout = self.manager.reload_value();
        st.kick_bitmask = 0;
        Ok(())
    }

    /// Unregister every thread and stop the hardware watchdog.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot disable the watchdog.
    pub fn shutdown(&self) -> WatchdogResult<()> {
        let mut st = self.state.lock();
        st.slots.iter_mut().for_each(|entry| *entry = None);
        st.bitmask = 0;
        st.kick_bitmask = 0;
        st.pending_timeout = None;
        st.is_initialized = false;
        tracing::info!("Thread watchdog shut down");
        match self.manager.stop() {
            Ok(()) | Err(WatchdogError::NotRunning) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Number of registered threads.
    #[must_use]
    pub fn registered_count(&self) -> u32 {
        self.state.lock().bitmask.count_ones()
    }

    /// Whether `tid` holds a slot.
    #[must_use]
    pub fn is_registered(&self, tid: T) -> bool {
        self.state.lock().find(tid).is_some()
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// Whether the hardware has been armed by this table.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_initialized
    }

    /// Smaller timeout waiting to be armed, if a shrink is pending.
    #[must_use]
    pub fn pending_timeout(&self) -> Option<u32> {
        self.state.lock().pending_timeout
    }

    /// Timeout last requested when arming the hardware.
    #[must_use]
    pub fn armed_timeout(&self) -> u32 {
        self.state.lock().armed_timeout
    }

    /// Timeout the hardware was last armed with, as reported by the peripheral.
    #[must_use]
    pub fn reload_timeout(&self) -> u32 {
        self.state.lock().reload_timeout
    }

    /// Active slot bits.
    #[must_use]
    pub fn bitmask(&self) -> u32 {
        self.state.lock().bitmask
    }

    /// Slots that have kicked since the last hardware kick.
    #[must_use]
    pub fn kick_bitmask(&self) -> u32 {
        self.state.lock().kick_bitmask
    }

    /// The underlying hardware manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<HardwareWatchdogManager<H>> {
        &self.manager
    }
}

impl<H: WatchdogHal> ThreadWatchdog<H, ThreadId> {
    /// Register the calling thread.
    ///
    /// # Errors
    ///
    /// See [`wd_register`](Self::wd_register).
    pub fn register_current(&self, timeout_ms: u32) -> WatchdogResult<()> {
        self.wd_register(std::thread::current().id(), timeout_ms)
    }

    /// Kick on behalf of the calling thread.
    pub fn kick_current(&self) {
        self.kick(std::thread::current().id());
    }

    /// Unregister the calling thread.
    ///
    /// # Errors
    ///
    /// See [`wd_unregister`](Self::wd_unregister).
    pub fn unregister_current(&self) -> WatchdogResult<()> {
        self.wd_unregister(std::thread::current().id())
    }
}

impl<H: WatchdogHal, T: std::fmt::Debug> std::fmt::Debug for ThreadWatchdog<H, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadWatchdog")
            .field("manager", &self.manager)
            .field("state", &*self.state.lock())
            .finish()
    }
}
