use core::fmt;

use crate::irq::FaultKind;
use crate::kcore::init::kernel;

/// Registers saved by the exception vectors before calling into Rust.
#[repr(C)]
#[derive(Debug)]
pub struct TrapFrame {
    pub spsr: u32,
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    pub r12: u32,
    pub lr: u32,
}

fn mode_name(psr: u32) -> &'static str {
    match psr & 0x1f {
        0x10 => "usr",
        0x11 => "fiq",
        0x12 => "irq",
        0x13 => "svc",
        0x17 => "abt",
        0x1b => "und",
        0x1f => "sys",
        _ => "???",
    }
}

impl fmt::Display for TrapFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let regs = [
            self.r0, self.r1, self.r2, self.r3, self.r4, self.r5, self.r6, self.r7, self.r8,
            self.r9, self.r10, self.r11, self.r12,
        ];
        for (i, r) in regs.iter().enumerate() {
            write!(f, "r{}={:#010x} ", i, r)?;
        }
        write!(
            f,
            "lr={:#010x} psr={:#010x} ({})",
            self.lr,
            self.spsr,
            mode_name(self.spsr)
        )
    }
}

fn fault(kind: FaultKind, tf: &mut TrapFrame) -> ! {
    let addr = tf as *mut TrapFrame as usize;
    kernel().fault(kind, addr, format_args!("{}", tf))
}

#[unsafe(no_mangle)]
pub extern "C" fn irq_entry_rust(tf: &mut TrapFrame) {
    kernel().irq_entry(tf as *mut TrapFrame as usize);
}

#[unsafe(no_mangle)]
pub extern "C" fn undef_entry_rust(tf: &mut TrapFrame) {
    fault(FaultKind::UndefinedInstruction, tf)
}

#[unsafe(no_mangle)]
pub extern "C" fn prefetch_abort_entry_rust(tf: &mut TrapFrame) {
    fault(FaultKind::PrefetchAbort, tf)
}

#[unsafe(no_mangle)]
pub extern "C" fn data_abort_entry_rust(tf: &mut TrapFrame) {
    fault(FaultKind::DataAbort, tf)
}
