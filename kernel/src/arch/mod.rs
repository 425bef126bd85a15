//! Architecture abstraction
//!
//! The scheduler core only talks to the CPU through [`Arch`] and the
//! [`IrqControl`] implementation selected here. The backend is picked at
//! compile time: the ARM port on bare-metal ARM targets, the hosted
//! simulator everywhere else.

use common::sync::{IrqControl, IrqSpinLock, IrqSpinLockGuard};

use crate::error::ProcessError;
use crate::process::stack::ProcessStack;

/// Where a fresh context starts executing: `func(arg)` on the new stack.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoint {
    pub func: extern "C" fn(usize) -> !,
    pub arg: usize,
}

pub trait Arch {
    /// Saved execution state of one process.
    type Context: Default + Send + Sync + 'static;

    fn cpu_id() -> usize;

    /// Prepare `ctx` so that the first switch into it runs `entry`.
    fn init_context(
        ctx: &'static Self::Context,
        stack: &mut ProcessStack,
        entry: EntryPoint,
    ) -> Result<(), ProcessError>;

    /// Save the running state into `from` and resume `to`. Returns when
    /// something switches back into `from`.
    ///
    /// # Safety
    /// Local interrupts must be disabled, `from` must belong to the running
    /// process and `to` must hold a context prepared by `init_context` or
    /// saved by a previous switch.
    unsafe fn switch_context(from: &Self::Context, to: &Self::Context);

    /// Sanity check a saved context before resuming it.
    fn validate_context(ctx: &Self::Context, stack: Option<&ProcessStack>) -> bool;

    /// Low-power wait until the next interrupt.
    fn wait_for_interrupt();

    fn halt() -> !;
}

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "arm", target_os = "none"))] {
        pub mod arm;

        pub type Cpu = arm::ArmCpu;
        pub type Irq = common::arch::arm::irq::ArmIrq;
    } else {
        pub mod hosted;

        pub type Cpu = hosted::HostedCpu;
        pub type Irq = hosted::HostedIrq;
    }
}

pub type Context = <Cpu as Arch>::Context;

/// IRQ-safe spinlock masking interrupts on the current architecture.
pub type IrqLock<T> = IrqSpinLock<T, Irq>;
pub type IrqLockGuard<'a, T> = IrqSpinLockGuard<'a, T, Irq>;

/// Whether local interrupts are enabled.
pub fn irqs_enabled() -> bool {
    Irq::enabled()
}
