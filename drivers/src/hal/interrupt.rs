//! Interrupt Controller Hardware Abstraction Layer.

use core::fmt;

/// Interrupt number type.
pub type IrqNumber = u32;

/// Interrupt controller error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqError {
    /// The line does not exist on this controller.
    InvalidIrq(IrqNumber),
    /// The controller cannot perform the requested operation.
    Unsupported,
}

impl fmt::Display for IrqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrqError::InvalidIrq(irq) => write!(f, "invalid irq line {}", irq),
            IrqError::Unsupported => f.write_str("operation not supported by controller"),
        }
    }
}

/// Interrupt controller trait.
///
/// This trait represents the system's interrupt controller. It is called
/// from the IRQ dispatch path with local interrupts masked.
pub trait InterruptController: Send + Sync {
    /// Enable (unmask) an interrupt line.
    fn enable(&self, irq: IrqNumber) -> Result<(), IrqError>;

    /// Disable (mask) an interrupt line.
    fn disable(&self, irq: IrqNumber) -> Result<(), IrqError>;

    /// Check if an interrupt is currently pending.
    fn is_pending(&self, irq: IrqNumber) -> Result<bool, IrqError>;

    /// Get the next pending, enabled interrupt.
    ///
    /// Returns `None` if no interrupts are pending.
    fn next_pending(&self) -> Option<IrqNumber>;

    /// Clear a pending interrupt.
    ///
    /// Some controllers require explicit acknowledgment.
    fn clear(&self, irq: IrqNumber) -> Result<(), IrqError> {
        let _ = irq;
        Ok(())
    }
}
