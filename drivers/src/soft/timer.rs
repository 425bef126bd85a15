use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::SoftIntc;
use crate::hal::interrupt::{IrqError, IrqNumber};
use crate::hal::timer::{PeriodicTimer, Timer};

/// Timer that expires when told to.
///
/// [`expire`](SoftTimer::expire) plays the part of the hardware counter
/// reaching its compare value: it latches the pending flag and raises the
/// timer line on the attached [`SoftIntc`].
pub struct SoftTimer {
    intc: &'static SoftIntc,
    irq: IrqNumber,
    interval_us: AtomicU32,
    running: AtomicBool,
    periodic: AtomicBool,
    pending: AtomicBool,
}

impl SoftTimer {
    pub const fn new(intc: &'static SoftIntc, irq: IrqNumber) -> Self {
        Self {
            intc,
            irq,
            interval_us: AtomicU32::new(0),
            running: AtomicBool::new(false),
            periodic: AtomicBool::new(false),
            pending: AtomicBool::new(false),
        }
    }

    /// Currently programmed interval.
    pub fn interval_us(&self) -> u32 {
        self.interval_us.load(Ordering::Relaxed)
    }

    /// Simulate the counter reaching the programmed interval.
    ///
    /// Returns `false` if the timer is not running.
    pub fn expire(&self) -> bool {
        if !self.running.load(Ordering::Acquire) {
            return false;
        }
        if !self.periodic.load(Ordering::Relaxed) {
            self.running.store(false, Ordering::Release);
        }
        self.pending.store(true, Ordering::Release);
        self.intc.raise(self.irq).is_ok()
    }

    fn arm(&self, interval_us: u32, periodic: bool) -> Result<(), IrqError> {
        if interval_us == 0 {
            return Err(IrqError::Unsupported);
        }
        self.interval_us.store(interval_us, Ordering::Relaxed);
        self.periodic.store(periodic, Ordering::Relaxed);
        self.running.store(true, Ordering::Release);
        Ok(())
    }
}

impl Timer for SoftTimer {
    type Error = IrqError;

    fn irq(&self) -> IrqNumber {
        self.irq
    }

    fn start(&self, interval_us: u32) -> Result<(), Self::Error> {
        self.arm(interval_us, false)
    }

    fn stop(&self) -> Result<(), Self::Error> {
        self.running.store(false, Ordering::Release);
        Ok(())
    }

    fn clear_interrupt(&self) -> Result<(), Self::Error> {
        self.pending.store(false, Ordering::Release);
        Ok(())
    }

    fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl PeriodicTimer for SoftTimer {
    fn start_periodic(&self, interval_us: u32) -> Result<(), Self::Error> {
        self.arm(interval_us, true)
    }
}
