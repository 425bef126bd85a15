//! Hosted port
//!
//! Runs the kernel inside an ordinary process. Every kernel process is an
//! OS thread, and a per-context turn flag makes sure only the thread that
//! the scheduler switched to is executing kernel code: switching hands the
//! turn to the target context and parks the caller on its own context.
//! Interrupt masking is a per-thread flag and interrupts are raised
//! explicitly through a software interrupt controller.

use std::cell::Cell;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use common::sync::IrqControl;

use super::{Arch, EntryPoint};
use crate::error::ProcessError;
use crate::process::stack::ProcessStack;

std::thread_local! {
    static IRQS_ENABLED: Cell<bool> = const { Cell::new(true) };
}

pub struct HostedIrq;

impl IrqControl for HostedIrq {
    type State = bool;

    fn disable() -> bool {
        IRQS_ENABLED.with(|e| e.replace(false))
    }

    fn restore(prev_enabled: bool) {
        if prev_enabled {
            Self::enable();
        }
    }

    fn enable() {
        IRQS_ENABLED.with(|e| e.set(true));
    }

    fn enabled() -> bool {
        IRQS_ENABLED.with(|e| e.get())
    }
}

#[derive(Default)]
struct Turn {
    /// Bumped every time the slot is given to a new process, so threads of
    /// a previous owner never run again.
    generation: u64,
    scheduled: bool,
}

/// Saved "context" of a hosted process: the right to run.
#[derive(Default)]
pub struct HostedContext {
    turn: Mutex<Turn>,
    wake: Condvar,
}

impl HostedContext {
    fn turn(&self) -> MutexGuard<'_, Turn> {
        self.turn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.turn().generation
    }

    fn hand_over(&self) {
        self.turn().scheduled = true;
        self.wake.notify_all();
    }

    fn wait_turn(&self, generation: u64) {
        let mut turn = self.turn();
        loop {
            if turn.generation != generation {
                drop(turn);
                retire();
            }
            if turn.scheduled {
                turn.scheduled = false;
                return;
            }
            turn = self.wake.wait(turn).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Park the calling thread for good. Its process is gone.
fn retire() -> ! {
    loop {
        std::thread::park();
    }
}

fn process_thread(ctx: &'static HostedContext, generation: u64, entry: EntryPoint) {
    ctx.wait_turn(generation);
    (entry.func)(entry.arg)
}

pub struct HostedCpu;

impl Arch for HostedCpu {
    type Context = HostedContext;

    fn cpu_id() -> usize {
        0
    }

    fn init_context(
        ctx: &'static HostedContext,
        _stack: &mut ProcessStack,
        entry: EntryPoint,
    ) -> Result<(), ProcessError> {
        let generation = {
            let mut turn = ctx.turn();
            turn.generation += 1;
            turn.scheduled = false;
            turn.generation
        };
        std::thread::Builder::new()
            .spawn(move || process_thread(ctx, generation, entry))
            .map(|_| ())
            .map_err(|_| ProcessError::OutOfMemory)
    }

    unsafe fn switch_context(from: &HostedContext, to: &HostedContext) {
        let generation = from.generation();
        to.hand_over();
        from.wait_turn(generation);
    }

    fn validate_context(_ctx: &HostedContext, _stack: Option<&ProcessStack>) -> bool {
        true
    }

    fn wait_for_interrupt() {
        std::thread::sleep(Duration::from_millis(1));
    }

    fn halt() -> ! {
        panic!("cpu halted");
    }
}
