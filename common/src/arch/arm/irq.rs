use crate::sync::irq::IrqControl;

const CPSR_I_BIT: u32 = 1 << 7;

/// Local IRQ masking through the CPSR I bit.
///
/// The saved `State` is `true` when IRQs were enabled before `disable()`.
/// FIQs are left untouched; the kernel never takes scheduler locks from FIQ
/// context.
pub struct ArmIrq;

#[inline(always)]
fn read_cpsr() -> u32 {
    let cpsr: u32;
    unsafe {
        core::arch::asm!("mrs {0}, cpsr", out(reg) cpsr, options(nomem, nostack, preserves_flags));
    }
    cpsr
}

impl IrqControl for ArmIrq {
    type State = bool;

    #[inline(always)]
    fn disable() -> bool {
        let cpsr: u32;
        unsafe {
            core::arch::asm!(
                "mrs {0}, cpsr",
                "cpsid i",
                out(reg) cpsr,
                options(nostack)
            );
        }
        cpsr & CPSR_I_BIT == 0
    }

    #[inline(always)]
    fn restore(prev_enabled: bool) {
        if prev_enabled {
            Self::enable();
        }
    }

    #[inline(always)]
    fn enable() {
        unsafe {
            core::arch::asm!("cpsie i", options(nostack));
        }
    }

    #[inline(always)]
    fn enabled() -> bool {
        read_cpsr() & CPSR_I_BIT == 0
    }
}
