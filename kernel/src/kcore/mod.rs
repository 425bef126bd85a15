//! Kernel context
//!
//! [`Kernel`] owns every piece of scheduler state: the process table, the
//! saved contexts, the per-process exit conditions, the active policy and
//! the interrupt plumbing. Subsystems are `impl Kernel` blocks in their own
//! modules and receive the kernel by reference.

pub mod init;

use alloc::boxed::Box;
use core::sync::atomic::{AtomicBool, Ordering};

use drivers::{InterruptController, Ticker};
use spin::Once;

use crate::arch::{Context, IrqLock};
use crate::config::KernelConfig;
use crate::irq::IrqHandlers;
use crate::process::ProcessTable;
use crate::sched::{Resched, SchedPolicy};
use crate::sync::Condition;

pub struct Kernel {
    pub(crate) config: KernelConfig,
    pub(crate) procs: IrqLock<ProcessTable>,
    /// Saved context of the process in each table slot
    pub(crate) contexts: Box<[Context]>,
    /// Per slot: where a process waits for its children to exit
    pub(crate) exit_conds: Box<[Condition]>,
    pub(crate) resched: Resched,
    pub(crate) policy: Box<dyn SchedPolicy>,
    pub(crate) irq_handlers: IrqHandlers,
    pub(crate) intc: Once<&'static dyn InterruptController>,
    pub(crate) os_ticker: Once<&'static dyn Ticker>,
    started: AtomicBool,
}

impl Kernel {
    pub fn new(config: KernelConfig, policy: Box<dyn SchedPolicy>) -> Self {
        let slots = config.max_procs;
        Self {
            config,
            procs: IrqLock::new(ProcessTable::new(slots)),
            contexts: (0..slots).map(|_| Context::default()).collect(),
            exit_conds: (0..slots).map(|_| Condition::new()).collect(),
            resched: Resched::new(),
            policy,
            irq_handlers: IrqHandlers::new(),
            intc: Once::new(),
            os_ticker: Once::new(),
            started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn resched(&self) -> &Resched {
        &self.resched
    }

    /// Whether [`start`](Kernel::start) has run: the kernel is in process mode.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub(crate) fn mark_started(&self) {
        self.started.store(true, Ordering::Release);
    }
}
