//! Callee-saved register context switch.
//!
//! A suspended process is fully described by its saved stack pointer: the
//! switch routine pushes r4-r11 and lr on the outgoing stack, records sp,
//! loads the incoming sp and pops the same frame. A fresh process gets a
//! hand-built frame whose lr points at the thread start trampoline.

use core::cell::UnsafeCell;

use crate::arch::EntryPoint;
use crate::error::ProcessError;
use crate::process::stack::ProcessStack;

/// r4-r11 and lr
const FRAME_WORDS: usize = 9;
const FRAME_R4: usize = 0;
const FRAME_R5: usize = 1;
const FRAME_LR: usize = 8;

core::arch::global_asm!(
    ".section .text",
    ".arm",
    ".global __sched_switch",
    "__sched_switch:",
    "push {{r4-r11, lr}}",
    "str sp, [r0]",
    "mov sp, r1",
    "pop {{r4-r11, lr}}",
    "bx lr",
    "",
    ".global __sched_thread_start",
    "__sched_thread_start:",
    "mov r0, r4",
    "blx r5",
    "b .",
);

unsafe extern "C" {
    fn __sched_switch(from_sp: *mut usize, to_sp: usize);
    fn __sched_thread_start();
}

/// Saved stack pointer of a suspended process.
#[derive(Default)]
pub struct ArmContext {
    sp: UnsafeCell<usize>,
}

// Only the core running the owning process writes the slot
unsafe impl Sync for ArmContext {}

impl ArmContext {
    pub fn saved_sp(&self) -> usize {
        unsafe { *self.sp.get() }
    }
}

pub fn init(
    ctx: &ArmContext,
    stack: &mut ProcessStack,
    entry: EntryPoint,
) -> Result<(), ProcessError> {
    let mut frame = [0usize; FRAME_WORDS];
    frame[FRAME_R4] = entry.arg;
    frame[FRAME_R5] = entry.func as usize;
    frame[FRAME_LR] = __sched_thread_start as usize;

    let sp = stack
        .push_initial_frame(&frame)
        .ok_or(ProcessError::OutOfMemory)?;
    unsafe { *ctx.sp.get() = sp };
    Ok(())
}

/// # Safety
/// See [`Arch::switch_context`](crate::arch::Arch::switch_context).
pub unsafe fn switch(from: &ArmContext, to: &ArmContext) {
    unsafe { __sched_switch(from.sp.get(), *to.sp.get()) }
}
