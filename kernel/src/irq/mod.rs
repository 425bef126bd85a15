//! Interrupt handling
//!
//! - [`handlers`]: the table of registered IRQ handlers
//! - [`dispatch`]: the IRQ entry path and the fault path, called from the
//!   architecture exception vectors

pub mod dispatch;
pub mod handlers;

use core::fmt;

pub use handlers::{IrqHandler, IrqHandlers, IrqReturn, MAX_IRQS, timer_ticker_handler};

/// Synchronous exceptions that end in a kernel panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    UndefinedInstruction,
    PrefetchAbort,
    DataAbort,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FaultKind::UndefinedInstruction => "undefined instruction",
            FaultKind::PrefetchAbort => "prefetch abort",
            FaultKind::DataAbort => "data abort",
        };
        f.write_str(msg)
    }
}
