//! OS time and timed sleeps
//!
//! OS time is a tick counter in the process table, advanced by the OS
//! ticker once one is attached. Sleeping processes are BLOCKED on the sleep
//! channel until the counter reaches their wake-up tick.

use drivers::{Ticker, TickerError};
use log::{debug, error};

use crate::arch::{Arch, Cpu};
use crate::config::OS_TICK_HZ;
use crate::error::PolicyError;
use crate::kcore::Kernel;

/// Ticks needed to cover `ms` milliseconds, rounded up.
fn ms_to_ticks(ms: u32, ticks_per_sec: u32) -> u64 {
    (u64::from(ms) * u64::from(ticks_per_sec)).div_ceil(1000)
}

fn os_tick(_ticker: &dyn Ticker, data: usize) -> Result<(), TickerError> {
    let kernel = unsafe { &*(data as *const Kernel) };
    kernel.tick();
    Ok(())
}

impl Kernel {
    /// Drive OS time from `ticker`.
    pub fn attach_os_ticker(&'static self, ticker: &'static dyn Ticker) -> Result<(), PolicyError> {
        if self.os_ticker.get().is_some() {
            error!("OS ticker already attached");
            return Err(PolicyError::Ticker(TickerError::Full));
        }
        ticker.add_callback(os_tick, self as *const Kernel as usize)?;
        self.os_ticker.call_once(|| ticker);
        debug!("OS ticker attached at {} Hz", ticker.ticks_per_sec());
        Ok(())
    }

    pub fn ticks_per_sec(&self) -> u32 {
        self.os_ticker
            .get()
            .map_or(OS_TICK_HZ, |t| t.ticks_per_sec())
    }

    /// OS ticks elapsed since the ticker was attached.
    pub fn osticks(&self) -> u64 {
        self.procs.lock().osticks
    }

    /// Number of context switches performed so far.
    pub fn ctx_switches(&self) -> u64 {
        self.procs.lock().ctx_switches
    }

    /// Advance OS time by one tick and wake the sleepers that are due.
    pub fn tick(&self) {
        let preempt = self.procs.lock().tick();
        if preempt {
            self.resched.request(Cpu::cpu_id());
        }
    }

    /// Block the calling process for `ticks` OS ticks. Zero just yields.
    pub fn sleep_ticks(&self, ticks: u64) {
        if ticks == 0 {
            self.yield_now();
            return;
        }
        {
            let mut procs = self.procs.lock();
            let Some(me) = procs.current(Cpu::cpu_id()) else {
                drop(procs);
                fatal!("sleep outside process mode");
            };
            let wake_at = procs.osticks.saturating_add(ticks);
            if let Err(e) = procs.sleep_until(me, wake_at) {
                drop(procs);
                fatal!("process {} cannot sleep: {}", me, e);
            }
        }
        self.schedule();
    }

    pub fn msleep(&self, ms: u32) {
        self.sleep_ticks(ms_to_ticks(ms, self.ticks_per_sec()));
    }

    pub fn sleep(&self, secs: u32) {
        self.sleep_ticks(u64::from(secs) * u64::from(self.ticks_per_sec()));
    }
}
