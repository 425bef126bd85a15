mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::{Board, STACK_SIZE, TIMER_IRQ, WORKER_PRIORITY, started_kernel};
use drivers::{InterruptController, IrqError, IrqNumber};
use kernel::irq::{FaultKind, IrqReturn, MAX_IRQS};
use kernel::sched::CoopFifo;

const DEVICE_IRQ: IrqNumber = 7;

fn record(irq: IrqNumber, data: usize) -> IrqReturn {
    let seen = unsafe { &*(data as *const AtomicUsize) };
    seen.store(irq as usize + 1, Ordering::SeqCst);
    IrqReturn::Handled
}

fn reject(_irq: IrqNumber, _data: usize) -> IrqReturn {
    IrqReturn::NotHandled
}

#[test]
fn handler_gets_its_registration_data() {
    let kernel = started_kernel(Box::new(CoopFifo), 4);
    let board = Board::new();
    kernel.set_interrupt_controller(board.intc);

    let seen: &'static AtomicUsize = Box::leak(Box::new(AtomicUsize::new(0)));
    kernel
        .register_irq(DEVICE_IRQ, record, seen as *const AtomicUsize as usize)
        .unwrap();

    board.intc.raise(DEVICE_IRQ).unwrap();
    kernel.irq_entry(0);
    assert_eq!(seen.load(Ordering::SeqCst), DEVICE_IRQ as usize + 1);
    assert!(board.intc.is_enabled(DEVICE_IRQ));

    kernel.unregister_irq(DEVICE_IRQ).unwrap();
    assert!(!board.intc.is_enabled(DEVICE_IRQ));
}

#[test]
fn unhandled_lines_stay_masked() {
    let kernel = started_kernel(Box::new(CoopFifo), 4);
    let board = Board::new();
    kernel.set_interrupt_controller(board.intc);

    // Enabled on the controller but nobody registered for it
    board.intc.enable(DEVICE_IRQ).unwrap();
    board.intc.raise(DEVICE_IRQ).unwrap();
    kernel.irq_entry(0);
    assert!(!board.intc.is_enabled(DEVICE_IRQ));
    assert_eq!(board.intc.next_pending(), None);

    // A handler that disowns the interrupt is treated the same
    kernel.register_irq(DEVICE_IRQ, reject, 0).unwrap();
    board.intc.raise(DEVICE_IRQ).unwrap();
    kernel.irq_entry(0);
    assert!(!board.intc.is_enabled(DEVICE_IRQ));
}

#[test]
fn out_of_range_registration_fails() {
    let kernel = started_kernel(Box::new(CoopFifo), 4);
    let irq = MAX_IRQS as IrqNumber;
    assert_eq!(kernel.register_irq(irq, reject, 0), Err(IrqError::InvalidIrq(irq)));
}

#[test]
fn wakeup_from_interrupt_preempts_on_exit() {
    let kernel = started_kernel(Box::new(CoopFifo), 4);
    let board: &'static Board = Box::leak(Box::new(Board::new()));
    board.attach(kernel);
    kernel.attach_os_ticker(board.ticker()).unwrap();
    assert!(board.intc.is_enabled(TIMER_IRQ));

    let runs: &'static AtomicUsize = Box::leak(Box::new(AtomicUsize::new(0)));
    let worker = kernel
        .spawn_kernel_process("worker", WORKER_PRIORITY, STACK_SIZE, move |k| {
            k.sleep_ticks(1);
            runs.fetch_add(1, Ordering::SeqCst);
            0
        })
        .unwrap();
    kernel.schedule_if_needed();
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    board.tick(kernel);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(kernel.wait_pid(worker), Ok(0));
}

#[test]
#[should_panic(expected = "cpu halted")]
fn synchronous_fault_halts() {
    let kernel = started_kernel(Box::new(CoopFifo), 4);
    kernel.fault(FaultKind::UndefinedInstruction, 0, format_args!("pc=0x8000"));
}
