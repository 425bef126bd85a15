//! Timer Hardware Abstraction Layer.

use super::interrupt::IrqNumber;

/// Hardware timer trait.
///
/// This trait represents a timer peripheral that raises an interrupt
/// after a programmed interval.
pub trait Timer: Send + Sync {
    /// Error type for timer operations.
    type Error: core::fmt::Debug;

    /// Interrupt line the timer raises when it expires.
    fn irq(&self) -> IrqNumber;

    /// Start a one-shot timer with the given interval in microseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the interval is out of range.
    fn start(&self, interval_us: u32) -> Result<(), Self::Error>;

    /// Stop the timer.
    fn stop(&self) -> Result<(), Self::Error>;

    /// Acknowledge a pending expiry.
    fn clear_interrupt(&self) -> Result<(), Self::Error>;

    /// Check if the timer has a pending expiry.
    fn is_pending(&self) -> bool;
}

/// Extension trait for timers that support periodic mode.
pub trait PeriodicTimer: Timer {
    /// Start the timer in periodic mode.
    ///
    /// The timer will automatically reload and fire repeatedly.
    fn start_periodic(&self, interval_us: u32) -> Result<(), Self::Error>;
}
