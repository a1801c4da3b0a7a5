//! Periodic low-power ticker capability.

use alloc::boxed::Box;

/// Callback invoked on every ticker period.
///
/// Runs in ticker (interrupt) context on real hardware, so it must not block.
pub type TickerCallback = Box<dyn FnMut() + Send + 'static>;

/// A periodic-callback primitive with `attach_us` semantics.
///
/// Attaching replaces any previously attached callback.
pub trait Ticker: Send {
    /// Invoke `callback` every `period_us` microseconds until detached.
    fn attach_us(&mut self, period_us: u64, callback: TickerCallback);

    /// Stop invoking the attached callback.
    fn detach(&mut self);

    /// Period of the attached callback, if any.
    fn period_us(&self) -> Option<u64>;
}
