//! Software watchdogs multiplexed over the one hardware watchdog.
//!
//! Any number of [`VirtualWatchdog`] clients register with a shared
//! [`VirtualWatchdogRegistry`]. A periodic ticker drives
//! [`VirtualWatchdogRegistry::process`], which ages every client by one tick
//! and resets the system as soon as one of them has gone unkicked for longer
//! than its timeout. When every client is within its deadline the hardware
//! watchdog is kicked.
//!
//! The first client to start brings the hardware watchdog up at the
//! configured hardware timeout and attaches the ticker at half that period.
//! From then on the hardware watchdog runs for the rest of the program.
//!
//! Clients live in a generational arena guarded by a critical section, the
//! only exclusion primitive shared with the ticker context. A stopped
//! client's key is retired, so stale handles cannot touch a reused slot.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use critical_section::Mutex;
use mbed_watchdog_hal::{Ticker, WatchdogHal};
use serde::{Deserialize, Serialize};

use crate::config::WatchdogConfig;
use crate::error::WatchdogResult;
use crate::manager::HardwareWatchdogManager;
use crate::reset::{ResetCause, SystemReset};

/// Generational handle to a registered client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientKey {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct ClientEntry {
    name: String,
    timeout_ms: u32,
    current_count: u32,
}

#[derive(Debug, Default)]
struct ArenaSlot {
    generation: u32,
    entry: Option<ClientEntry>,
}

#[derive(Debug, Default)]
struct ClientArena {
    slots: Vec<ArenaSlot>,
    free: Vec<u32>,
    len: usize,
}

impl ClientArena {
    fn insert(&mut self, entry: ClientEntry) -> Option<ClientKey> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).ok()?;
                self.slots.push(ArenaSlot::default());
                index
            }
        };
        let slot = self.slots.get_mut(usize::try_from(index).ok()?)?;
        slot.entry = Some(entry);
        self.len += 1;
        Some(ClientKey {
            index,
            generation: slot.generation,
        })
    }

    fn slot_mut(&mut self, key: ClientKey) -> Option<&mut ArenaSlot> {
        let slot = self.slots.get_mut(usize::try_from(key.index).ok()?)?;
        (slot.generation == key.generation && slot.entry.is_some()).then_some(slot)
    }

    fn get_mut(&mut self, key: ClientKey) -> Option<&mut ClientEntry> {
        self.slot_mut(key)?.entry.as_mut()
    }

    fn remove(&mut self, key: ClientKey) -> Option<ClientEntry> {
        let slot = self.slot_mut(key)?;
        let entry = slot.entry.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.len -= 1;
        entry
    }

    fn iter(&self) -> impl Iterator<Item = &ClientEntry> {
        self.slots.iter().filter_map(|slot| slot.entry.as_ref())
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut ClientEntry> {
        self.slots.iter_mut().filter_map(|slot| slot.entry.as_mut())
    }
}

/// Point-in-time view of one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    /// Client name.
    pub name: String,
    /// Soft timeout in milliseconds.
    pub timeout_ms: u32,
    /// Milliseconds counted since the last kick.
    pub elapsed_ms: u32,
}

/// Registry of virtual watchdog clients sharing one hardware watchdog.
pub struct VirtualWatchdogRegistry<H> {
    manager: Arc<HardwareWatchdogManager<H>>,
    clients: Mutex<RefCell<ClientArena>>,
    ticker: parking_lot::Mutex<Box<dyn Ticker>>,
    reset: Arc<dyn SystemReset>,
    hardware_timeout_ms: u32,
    tick_period_ms: u32,
    hardware_running: AtomicBool,
}

impl<H: WatchdogHal + 'static> VirtualWatchdogRegistry<H> {
    /// Create a registry. The hardware watchdog is not touched until the
    /// first client starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        manager: Arc<HardwareWatchdogManager<H>>,
        ticker: impl Ticker + 'static,
        reset: Arc<dyn SystemReset>,
        config: &WatchdogConfig,
    ) -> WatchdogResult<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self {
            manager,
            clients: Mutex::new(RefCell::new(ClientArena::default())),
            ticker: parking_lot::Mutex::new(Box::new(ticker)),
            reset,
            hardware_timeout_ms: config.hardware_timeout_ms,
            tick_period_ms: config.tick_period_ms(),
            hardware_running: AtomicBool::new(false),
        }))
    }

    fn with_clients<R>(&self, f: impl FnOnce(&mut ClientArena) -> R) -> R {
        critical_section::with(|cs| f(&mut *self.clients.borrow_ref_mut(cs)))
    }

    fn ensure_hardware_running(self: &Arc<Self>) -> WatchdogResult<()> {
        if self.hardware_running.load(Ordering::Acquire) {
            return Ok(());
        }
        let mut ticker = self.ticker.lock();
        if self.hardware_running.load(Ordering::Acquire) {
            return Ok(());
        }

        self.manager.start_exclusive(self.hardware_timeout_ms)?;

        let registry: Weak<Self> = Arc::downgrade(self);
        let period_us = u64::from(self.tick_period_ms) * 1000;
        ticker.attach_us(
            period_us,
            Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.process();
                }
            }),
        );
        self.hardware_running.store(true, Ordering::Release);

        tracing::info!(
            hardware_timeout_ms = self.hardware_timeout_ms,
            tick_period_ms = self.tick_period_ms,
            "Virtual watchdog ticker attached"
        );
        Ok(())
    }

    fn register(self: &Arc<Self>, name: &str, timeout_ms: u32) -> WatchdogResult<ClientKey> {
        self.ensure_hardware_running()?;
        let key = self
            .with_clients(|clients| {
                clients.insert(ClientEntry {
                    name: name.to_string(),
                    timeout_ms,
                    current_count: 0,
                })
            })
            .ok_or_else(|| {
                crate::error::WatchdogError::initialization_failed("virtual watchdog table full")
            })?;
        tracing::debug!(name, timeout_ms, "Virtual watchdog started");
        Ok(key)
    }

    fn kick_client(&self, key: ClientKey) -> bool {
        self.with_clients(|clients| {
            clients
                .get_mut(key)
                .map(|entry| entry.current_count = 0)
                .is_some()
        })
    }

    fn unregister(&self, key: ClientKey) -> bool {
        let removed = self.with_clients(|clients| clients.remove(key));
        if let Some(entry) = &removed {
            tracing::debug!(name = %entry.name, "Virtual watchdog stopped");
        }
        removed.is_some()
    }

    fn client_elapsed(&self, key: ClientKey) -> Option<u32> {
        self.with_clients(|clients| clients.get_mut(key).map(|entry| entry.current_count))
    }

    /// Age every client by one tick.
    ///
    /// Runs in ticker context. Each client is first checked, then advanced:
    /// a client whose count already exceeds its timeout triggers the system
    /// reset and processing stops there. Otherwise the hardware watchdog is
    /// kicked.
    pub fn process(&self) {
        let tick = self.tick_period_ms;
        let expired = self.with_clients(|clients| {
            for entry in clients.iter_mut() {
                if entry.current_count > entry.timeout_ms {
                    return Some(ResetCause {
                        client: entry.name.clone(),
                        timeout_ms: entry.timeout_ms,
                        elapsed_ms: entry.current_count,
                    });
                }
                entry.current_count = entry.current_count.saturating_add(tick);
            }
            None
        });

        match expired {
            Some(cause) => {
                tracing::error!(
                    client = %cause.client,
                    timeout_ms = cause.timeout_ms,
                    elapsed_ms = cause.elapsed_ms,
                    "Virtual watchdog deadline missed, resetting system"
                );
                self.reset.system_reset(&cause);
            }
            None => self.manager.kick(),
        }
    }

    /// Number of running clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.with_clients(|clients| clients.len)
    }

    /// Snapshot of every running client.
    #[must_use]
    pub fn clients(&self) -> Vec<ClientSnapshot> {
        self.with_clients(|clients| {
            clients
                .iter()
                .map(|entry| ClientSnapshot {
                    name: entry.name.clone(),
                    timeout_ms: entry.timeout_ms,
                    elapsed_ms: entry.current_count,
                })
                .collect()
        })
    }

    /// Ticker period, which is also the amount each client ages per tick.
    #[must_use]
    pub fn tick_period_ms(&self) -> u32 {
        self.tick_period_ms
    }

    /// Hardware timeout used when bringing the watchdog up.
    #[must_use]
    pub fn hardware_timeout_ms(&self) -> u32 {
        self.hardware_timeout_ms
    }

    /// Whether a client has brought the hardware watchdog up.
    #[must_use]
    pub fn is_hardware_running(&self) -> bool {
        self.hardware_running.load(Ordering::Acquire)
    }

    /// The underlying hardware manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<HardwareWatchdogManager<H>> {
        &self.manager
    }
}

impl<H: WatchdogHal + 'static> std::fmt::Debug for VirtualWatchdogRegistry<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualWatchdogRegistry")
            .field("hardware_timeout_ms", &self.hardware_timeout_ms)
            .field("tick_period_ms", &self.tick_period_ms)
            .field("hardware_running", &self.is_hardware_running())
            .field("clients", &self.clients())
            .finish_non_exhaustive()
    }
}

/// A software watchdog client.
///
/// `start()` registers it with the registry, `kick()` resets its count and
/// `stop()` (or drop) removes it. Calling `kick`/`stop` before `start`, or
/// `start` twice, is a programming error and panics.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use mbed_watchdog::prelude::*;
/// use mbed_watchdog_hal::SimulatedWatchdog;
///
/// let manager = Arc::new(HardwareWatchdogManager::new(SimulatedWatchdog::default()));
/// let ticker = ManualTicker::new();
/// let reset = Arc::new(RecordingReset::new());
/// let registry = VirtualWatchdogRegistry::new(
///     manager,
///     ticker.clone(),
///     reset.clone(),
///     &WatchdogConfig::default(),
/// )
/// .expect("valid config");
///
/// let mut net = VirtualWatchdog::new(&registry, 1000, "net");
/// net.start().expect("hardware available");
/// ticker.advance_ms(400);
/// net.kick();
/// net.stop();
/// assert!(!reset.triggered());
/// ```
pub struct VirtualWatchdog<H: WatchdogHal + 'static> {
    registry: Arc<VirtualWatchdogRegistry<H>>,
    name: String,
    timeout_ms: u32,
    key: Option<ClientKey>,
}

impl<H: WatchdogHal + 'static> VirtualWatchdog<H> {
    /// Create a stopped client.
    #[must_use]
    pub fn new(
        registry: &Arc<VirtualWatchdogRegistry<H>>,
        timeout_ms: u32,
        name: impl Into<String>,
    ) -> Self {
        Self {
            registry: Arc::clone(registry),
            name: name.into(),
            timeout_ms,
            key: None,
        }
    }

    /// Create a stopped client with the configured default timeout.
    #[must_use]
    pub fn with_default_timeout(
        registry: &Arc<VirtualWatchdogRegistry<H>>,
        config: &WatchdogConfig,
        name: impl Into<String>,
    ) -> Self {
        Self::new(registry, config.default_virtual_timeout_ms, name)
    }

    /// Register with the registry, bringing the hardware watchdog up if this
    /// is the first client.
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware watchdog could not be brought up,
    /// including when another owner already started it.
    ///
    /// # Panics
    ///
    /// Panics if the client is already started.
    pub fn start(&mut self) -> WatchdogResult<()> {
        assert!(
            self.key.is_none(),
            "virtual watchdog '{}' started twice",
            self.name
        );
        self.key = Some(self.registry.register(&self.name, self.timeout_ms)?);
        Ok(())
    }

    /// Reset this client's count.
    ///
    /// # Panics
    ///
    /// Panics if the client is not started.
    pub fn kick(&self) {
        assert!(
            self.key.is_some(),
            "virtual watchdog '{}' kicked before start",
            self.name
        );
        if let Some(key) = self.key {
            self.registry.kick_client(key);
        }
    }

    /// Remove this client from the registry. The hardware watchdog keeps
    /// running.
    ///
    /// # Panics
    ///
    /// Panics if the client is not started.
    pub fn stop(&mut self) {
        assert!(
            self.key.is_some(),
            "virtual watchdog '{}' stopped before start",
            self.name
        );
        if let Some(key) = self.key.take() {
            self.registry.unregister(key);
        }
    }

    /// Whether the client is between `start()` and `stop()`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.key.is_some()
    }

    /// Milliseconds counted since the last kick, if running.
    #[must_use]
    pub fn elapsed_ms(&self) -> Option<u32> {
        self.key.and_then(|key| self.registry.client_elapsed(key))
    }

    /// Client name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Soft timeout in milliseconds.
    #[must_use]
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}

impl<H: WatchdogHal + 'static> Drop for VirtualWatchdog<H> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.registry.unregister(key);
        }
    }
}

impl<H: WatchdogHal + 'static> std::fmt::Debug for VirtualWatchdog<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualWatchdog")
            .field("name", &self.name)
            .field("timeout_ms", &self.timeout_ms)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
