use drivers::ticker::TimerTicker;
use drivers::{IrqError, IrqNumber, PeriodicTimer};
use log::{debug, warn};

use crate::arch::{Irq, IrqLock};

/// Number of IRQ lines the handler table covers.
pub const MAX_IRQS: usize = 128;

/// Outcome reported by an IRQ handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    Handled,
    /// The line was not raised by this handler's device.
    NotHandled,
    Error,
}

/// IRQ handler, called with local interrupts masked and the opaque data
/// given at registration.
pub type IrqHandler = fn(IrqNumber, usize) -> IrqReturn;

#[derive(Clone, Copy)]
struct HandlerEntry {
    handler: IrqHandler,
    data: usize,
}

pub struct IrqHandlers {
    table: IrqLock<[Option<HandlerEntry>; MAX_IRQS]>,
}

impl IrqHandlers {
    pub const fn new() -> Self {
        Self {
            table: IrqLock::new([None; MAX_IRQS]),
        }
    }

    pub fn register(&self, irq: IrqNumber, handler: IrqHandler, data: usize) -> Result<(), IrqError> {
        let mut table = self.table.lock();
        let slot = table
            .get_mut(irq as usize)
            .ok_or(IrqError::InvalidIrq(irq))?;
        if slot.is_some() {
            warn!("irq {}: replacing registered handler", irq);
        }
        *slot = Some(HandlerEntry { handler, data });
        debug!("irq {}: handler registered", irq);
        Ok(())
    }

    pub fn unregister(&self, irq: IrqNumber) -> Result<(), IrqError> {
        let mut table = self.table.lock();
        let slot = table
            .get_mut(irq as usize)
            .ok_or(IrqError::InvalidIrq(irq))?;
        *slot = None;
        Ok(())
    }

    pub(crate) fn get(&self, irq: IrqNumber) -> Option<(IrqHandler, usize)> {
        self.table
            .lock()
            .get(irq as usize)
            .copied()
            .flatten()
            .map(|e| (e.handler, e.data))
    }
}

impl Default for IrqHandlers {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler for the line of a [`TimerTicker`]; `data` is the address of a
/// `'static` ticker masking interrupts through [`Irq`].
pub fn timer_ticker_handler<T: PeriodicTimer + 'static>(_irq: IrqNumber, data: usize) -> IrqReturn {
    let ticker = unsafe { &*(data as *const TimerTicker<T, Irq>) };
    match ticker.handle_interrupt() {
        Ok(()) => IrqReturn::Handled,
        Err(_) => IrqReturn::NotHandled,
    }
}
