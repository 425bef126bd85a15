use core::sync::atomic::{AtomicU64, Ordering};

use crate::hal::interrupt::{InterruptController, IrqError, IrqNumber};

const LINES: IrqNumber = 64;

/// Interrupt controller backed by two bitmasks (pending and enabled).
///
/// Lower line numbers are reported first by [`next_pending`].
///
/// [`next_pending`]: InterruptController::next_pending
pub struct SoftIntc {
    pending: AtomicU64,
    enabled: AtomicU64,
}

impl SoftIntc {
    pub const fn new() -> Self {
        Self {
            pending: AtomicU64::new(0),
            enabled: AtomicU64::new(0),
        }
    }

    /// Assert an interrupt line.
    pub fn raise(&self, irq: IrqNumber) -> Result<(), IrqError> {
        let bit = Self::bit(irq)?;
        self.pending.fetch_or(bit, Ordering::AcqRel);
        Ok(())
    }

    pub fn is_enabled(&self, irq: IrqNumber) -> bool {
        Self::bit(irq)
            .map(|bit| self.enabled.load(Ordering::Acquire) & bit != 0)
            .unwrap_or(false)
    }

    fn bit(irq: IrqNumber) -> Result<u64, IrqError> {
        if irq < LINES {
            Ok(1 << irq)
        } else {
            Err(IrqError::InvalidIrq(irq))
        }
    }
}

impl Default for SoftIntc {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptController for SoftIntc {
    fn enable(&self, irq: IrqNumber) -> Result<(), IrqError> {
        let bit = Self::bit(irq)?;
        self.enabled.fetch_or(bit, Ordering::AcqRel);
        Ok(())
    }

    fn disable(&self, irq: IrqNumber) -> Result<(), IrqError> {
        let bit = Self::bit(irq)?;
        self.enabled.fetch_and(!bit, Ordering::AcqRel);
        Ok(())
    }

    fn is_pending(&self, irq: IrqNumber) -> Result<bool, IrqError> {
        let bit = Self::bit(irq)?;
        Ok(self.pending.load(Ordering::Acquire) & bit != 0)
    }

    fn next_pending(&self) -> Option<IrqNumber> {
        let ready = self.pending.load(Ordering::Acquire) & self.enabled.load(Ordering::Acquire);
        if ready == 0 {
            None
        } else {
            Some(ready.trailing_zeros())
        }
    }

    fn clear(&self, irq: IrqNumber) -> Result<(), IrqError> {
        let bit = Self::bit(irq)?;
        self.pending.fetch_and(!bit, Ordering::AcqRel);
        Ok(())
    }
}
