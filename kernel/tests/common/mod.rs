//! Shared fixtures for the kernel integration tests
//!
//! Every test builds its own kernel on a leaked soft board. The test thread
//! becomes init at [`INIT_PRIORITY`], so workers spawned at
//! [`WORKER_PRIORITY`] run as soon as init reschedules.

#![allow(dead_code)]

use std::string::{String, ToString};
use std::sync::Mutex;
use std::vec::Vec;

use drivers::console::{ConsoleSink, set_console};
use drivers::soft::{SoftIntc, SoftTimer};
use drivers::ticker::TimerTicker;
use drivers::{IrqNumber, Ticker};
use kernel::Kernel;
use kernel::arch::Irq;
use kernel::config::KernelConfig;
use kernel::irq::timer_ticker_handler;
use kernel::sched::SchedPolicy;
use log::LevelFilter;

pub const INIT_PRIORITY: u8 = 100;
pub const WORKER_PRIORITY: u8 = 10;
pub const STACK_SIZE: usize = 4096;
pub const TIMER_IRQ: IrqNumber = 1;
pub const TICK_HZ: u32 = 100;

struct StdoutSink;

impl ConsoleSink for StdoutSink {
    fn write_str(&self, s: &str) {
        print!("{}", s);
    }
}

static STDOUT: StdoutSink = StdoutSink;

pub fn init_logging() {
    set_console(&STDOUT);
    let _ = kernel::logger::init(LevelFilter::Debug);
}

// ============================================================================
// Soft Board
// ============================================================================

pub struct Board {
    pub intc: &'static SoftIntc,
    pub timer: &'static SoftTimer,
    pub ticker: &'static TimerTicker<SoftTimer, Irq>,
}

impl Board {
    pub fn new() -> Self {
        let intc: &'static SoftIntc = Box::leak(Box::new(SoftIntc::new()));
        let timer: &'static SoftTimer = Box::leak(Box::new(SoftTimer::new(intc, TIMER_IRQ)));
        let ticker: &'static TimerTicker<SoftTimer, Irq> =
            Box::leak(Box::new(TimerTicker::new(timer, TICK_HZ)));
        Self {
            intc,
            timer,
            ticker,
        }
    }

    pub fn ticker(&self) -> &'static dyn Ticker {
        self.ticker
    }

    /// Hook the board into `kernel` and start the tick.
    pub fn attach(&self, kernel: &'static Kernel) {
        kernel.set_interrupt_controller(self.intc);
        kernel
            .register_irq(
                TIMER_IRQ,
                timer_ticker_handler::<SoftTimer>,
                self.ticker as *const TimerTicker<SoftTimer, Irq> as usize,
            )
            .unwrap();
        self.ticker.start().unwrap();
    }

    /// One timer period elapses and the interrupt is taken right away.
    pub fn tick(&self, kernel: &Kernel) {
        assert!(self.timer.expire());
        kernel.irq_entry(0);
    }
}

/// Started kernel with the calling thread as init.
pub fn started_kernel(policy: Box<dyn SchedPolicy>, max_procs: usize) -> &'static Kernel {
    init_logging();
    let config = KernelConfig::default().with_max_procs(max_procs);
    let kernel: &'static Kernel = Box::leak(Box::new(Kernel::new(config, policy)));
    kernel.start(INIT_PRIORITY).unwrap();
    kernel
}

// ============================================================================
// Journal
// ============================================================================

/// Ordered record of what the processes did.
pub struct Journal(Mutex<Vec<String>>);

impl Journal {
    pub fn leaked() -> &'static Journal {
        Box::leak(Box::new(Journal(Mutex::new(Vec::new()))))
    }

    pub fn push(&self, entry: impl ToString) {
        self.0.lock().unwrap().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}
