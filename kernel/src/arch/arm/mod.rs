//! ARM Architecture Support
//!
//! Context switching, exception entry glue and CPU helpers for 32-bit ARM
//! (ARMv6/ARMv7-A, ARM state).

pub mod context;
pub mod exception;

use common::arch::arm::irq::ArmIrq;
use common::sync::IrqControl;

use super::{Arch, EntryPoint};
use crate::error::ProcessError;
use crate::process::stack::ProcessStack;

use context::ArmContext;

/// Wait for interrupt (low-power idle)
///
/// Puts the CPU into a low-power state until an interrupt occurs.
#[inline(always)]
pub fn wfi() {
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack, preserves_flags));
    }
}

pub struct ArmCpu;

impl Arch for ArmCpu {
    type Context = ArmContext;

    fn cpu_id() -> usize {
        // Uniprocessor targets only
        0
    }

    fn init_context(
        ctx: &'static ArmContext,
        stack: &mut ProcessStack,
        entry: EntryPoint,
    ) -> Result<(), ProcessError> {
        context::init(ctx, stack, entry)
    }

    unsafe fn switch_context(from: &ArmContext, to: &ArmContext) {
        unsafe { context::switch(from, to) }
    }

    fn validate_context(ctx: &ArmContext, stack: Option<&ProcessStack>) -> bool {
        match stack {
            Some(stack) => stack.contains(ctx.saved_sp()),
            // Init runs on the boot stack
            None => true,
        }
    }

    fn wait_for_interrupt() {
        wfi();
    }

    fn halt() -> ! {
        ArmIrq::disable();
        loop {
            wfi();
        }
    }
}
