//! Interrupt Dispatch
//!
//! Called from architecture-specific exception handlers.

use core::fmt;

use common::sync::IrqControl;
use drivers::{InterruptController, IrqError, IrqNumber};
use log::{error, info, warn};

use super::FaultKind;
use super::handlers::{IrqHandler, IrqReturn};
use crate::arch::{Arch, Cpu, Irq};
use crate::kcore::Kernel;

impl Kernel {
    /// Install the interrupt controller. Only the first call has an effect.
    pub fn set_interrupt_controller(&self, intc: &'static dyn InterruptController) -> bool {
        let mut installed = false;
        self.intc.call_once(|| {
            installed = true;
            intc
        });
        if !installed {
            warn!("interrupt controller already set");
        }
        installed
    }

    /// Register `handler` for `irq` and unmask the line.
    pub fn register_irq(&self, irq: IrqNumber, handler: IrqHandler, data: usize) -> Result<(), IrqError> {
        self.irq_handlers.register(irq, handler, data)?;
        match self.intc.get() {
            Some(intc) => intc.enable(irq),
            None => {
                warn!("irq {}: no interrupt controller to unmask it", irq);
                Ok(())
            }
        }
    }

    pub fn unregister_irq(&self, irq: IrqNumber) -> Result<(), IrqError> {
        if let Some(intc) = self.intc.get() {
            intc.disable(irq)?;
        }
        self.irq_handlers.unregister(irq)
    }

    /// IRQ exception entry.
    ///
    /// Serves every pending line, each with the line masked while its
    /// handler runs. A line nobody handles stays masked. Pending reschedule
    /// requests are served on the way out, so a process preempted here
    /// resumes from this call later.
    pub fn irq_entry(&self, trap_frame: usize) {
        let irq_state = Irq::disable();

        if trap_frame != 0 {
            let mut procs = self.procs.lock();
            if let Some(pid) = procs.current(Cpu::cpu_id()) {
                if let Some(p) = procs.get_mut(pid) {
                    p.trap_frame = Some(trap_frame);
                }
            }
        }

        if let Some(intc) = self.intc.get() {
            while let Some(irq) = intc.next_pending() {
                self.dispatch(*intc, irq);
            }
        }

        self.schedule_if_needed();
        Irq::restore(irq_state);
    }

    fn dispatch(&self, intc: &dyn InterruptController, irq: IrqNumber) {
        if let Err(e) = intc.disable(irq) {
            error!("irq {}: cannot mask line: {}", irq, e);
        }

        let ret = match self.irq_handlers.get(irq) {
            Some((handler, data)) => handler(irq, data),
            None => {
                warn!("Unhandled IRQ: {}", irq);
                IrqReturn::NotHandled
            }
        };
        if ret == IrqReturn::Error {
            error!("irq {}: handler failed", irq);
        }

        if let Err(e) = intc.clear(irq) {
            error!("irq {}: cannot acknowledge: {}", irq, e);
        }
        if ret == IrqReturn::Handled {
            if let Err(e) = intc.enable(irq) {
                error!("irq {}: cannot unmask line: {}", irq, e);
            }
        }
    }

    /// Fatal synchronous exception taken on this CPU.
    pub fn fault(&self, kind: FaultKind, trap_frame: usize, regs: fmt::Arguments<'_>) -> ! {
        Irq::disable();
        let cpu = Cpu::cpu_id();
        let pid = match self.procs.try_lock() {
            Some(mut procs) => {
                let pid = procs.current(cpu);
                if let Some(p) = pid.and_then(|pid| procs.get_mut(pid)) {
                    p.trap_frame = Some(trap_frame);
                }
                pid
            }
            None => None,
        };
        error!("{} in process {:?}", kind, pid);
        info!("{}", regs);
        fatal!("unrecoverable {}", kind)
    }
}
