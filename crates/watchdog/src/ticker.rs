//! Ticker implementations for hosted environments.
//!
//! - [`ManualTicker`]: fires only when told to; deterministic for tests.
//! - [`ThreadTicker`]: a background thread standing in for the low-power
//!   ticker interrupt.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use mbed_watchdog_hal::{Ticker, TickerCallback};
use parking_lot::Mutex;

#[derive(Default)]
struct ManualTickerInner {
    period_us: Option<u64>,
    callback: Option<TickerCallback>,
    pending_us: u64,
    fired: u64,
}

/// Ticker driven by explicit calls to [`ManualTicker::advance_us`].
///
/// Clones share one ticker: attach through one clone, drive time through
/// another.
#[derive(Clone, Default)]
pub struct ManualTicker {
    inner: Arc<Mutex<ManualTickerInner>>,
}

impl std::fmt::Debug for ManualTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ManualTicker")
            .field("period_us", &inner.period_us)
            .field("attached", &inner.callback.is_some())
            .field("pending_us", &inner.pending_us)
            .field("fired", &inner.fired)
            .finish()
    }
}

impl ManualTicker {
    /// Create a ticker with nothing attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance time, firing the callback once per elapsed period.
    ///
    /// Returns the number of times the callback ran.
    pub fn advance_us(&self, us: u64) -> u64 {
        let due = {
            let mut inner = self.inner.lock();
            let Some(period) = inner.period_us.filter(|p| *p > 0) else {
                return 0;
            };
            inner.pending_us = inner.pending_us.saturating_add(us);
            let due = inner.pending_us / period;
            inner.pending_us %= period;
            due
        };
        let mut ran = 0;
        for _ in 0..due {
            if self.fire() {
                ran += 1;
            }
        }
        ran
    }

    /// Advance time in milliseconds. See [`ManualTicker::advance_us`].
    pub fn advance_ms(&self, ms: u64) -> u64 {
        self.advance_us(ms.saturating_mul(1000))
    }

    /// Run the attached callback once, regardless of elapsed time.
    ///
    /// Returns whether a callback was attached.
    pub fn fire(&self) -> bool {
        // Run outside the lock so the callback may touch the ticker.
        let Some(mut callback) = self.inner.lock().callback.take() else {
            return false;
        };
        callback();
        let mut inner = self.inner.lock();
        inner.fired += 1;
        if inner.callback.is_none() && inner.period_us.is_some() {
            inner.callback = Some(callback);
        }
        true
    }

    /// Number of times the callback has run.
    #[must_use]
    pub fn fire_count(&self) -> u64 {
        self.inner.lock().fired
    }

    /// Whether a callback is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.lock().period_us.is_some()
    }
}

impl Ticker for ManualTicker {
    fn attach_us(&mut self, period_us: u64, callback: TickerCallback) {
        let mut inner = self.inner.lock();
        inner.period_us = Some(period_us);
        inner.callback = Some(callback);
        inner.pending_us = 0;
    }

    fn detach(&mut self) {
        let mut inner = self.inner.lock();
        inner.period_us = None;
        inner.callback = None;
        inner.pending_us = 0;
    }

    fn period_us(&self) -> Option<u64> {
        self.inner.lock().period_us
    }
}

/// Ticker backed by a dedicated thread.
///
/// The callback runs on the ticker thread, which plays the role of the
/// ticker interrupt: it preempts application threads and never blocks on
/// their locks.
#[derive(Debug, Default)]
pub struct ThreadTicker {
    period_us: Option<u64>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadTicker {
    /// Create a ticker with nothing attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            // Dropped from inside its own callback; the loop exits on `stop`.
            if handle.thread().id() == thread::current().id() {
                self.period_us = None;
                return;
            }
            if handle.join().is_err() {
                tracing::error!("Ticker thread panicked");
            }
        }
        self.period_us = None;
    }
}

impl Ticker for ThreadTicker {
    fn attach_us(&mut self, period_us: u64, mut callback: TickerCallback) {
        self.shutdown();

        let stop = Arc::new(AtomicBool::new(false));
        self.stop = Arc::clone(&stop);
        let period = Duration::from_micros(period_us.max(1));

        let spawned = thread::Builder::new()
            .name("watchdog-ticker".to_string())
            .spawn(move || {
                loop {
                    let deadline = std::time::Instant::now() + period;
                    let mut now = std::time::Instant::now();
                    while now < deadline {
                        if stop.load(Ordering::Acquire) {
                            return;
                        }
                        thread::park_timeout(deadline.saturating_duration_since(now));
                        now = std::time::Instant::now();
                    }
                    if stop.load(Ordering::Acquire) {
                        return;
                    }
                    callback();
                }
            });

        match spawned {
            Ok(handle) => {
                tracing::debug!(period_us, "Ticker thread attached");
                self.handle = Some(handle);
                self.period_us = Some(period_us);
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to spawn ticker thread");
            }
        }
    }

    fn detach(&mut self) {
        self.shutdown();
    }

    fn period_us(&self) -> Option<u64> {
        self.period_us
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    fn counting_callback(counter: &Arc<AtomicU64>) -> TickerCallback {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_manual_ticker_fires_per_period() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut ticker = ManualTicker::new();
        ticker.attach_us(1000, counting_callback(&counter));

        assert_eq!(ticker.advance_us(2500), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        assert_eq!(ticker.advance_us(500), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(ticker.fire_count(), 3);
    }

    #[test]
    fn test_manual_ticker_detached_does_nothing() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut ticker = ManualTicker::new();
        assert_eq!(ticker.advance_ms(10), 0);

        ticker.attach_us(1000, counting_callback(&counter));
        ticker.detach();
        assert_eq!(ticker.advance_ms(10), 0);
        assert!(!ticker.fire());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_manual_ticker_clones_share_state() {
        let counter = Arc::new(AtomicU64::new(0));
        let driver = ManualTicker::new();
        let mut owner = driver.clone();
        owner.attach_us(500, counting_callback(&counter));

        assert_eq!(driver.period_us(), Some(500));
        driver.advance_ms(1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_thread_ticker_runs_and_detaches() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut ticker = ThreadTicker::new();
        ticker.attach_us(1000, counting_callback(&counter));
        assert_eq!(ticker.period_us(), Some(1000));

        thread::sleep(Duration::from_millis(50));
        ticker.detach();
        let after_detach = counter.load(Ordering::SeqCst);
        assert!(after_detach > 0);
        assert_eq!(ticker.period_us(), None);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.load(Ordering::SeqCst), after_detach);
    }
}
