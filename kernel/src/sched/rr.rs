use drivers::{Ticker, TickerError};
use log::debug;

use super::Resched;
use super::policy::{ReadyQueue, SchedPolicy};
use crate::error::PolicyError;
use crate::process::Pid;

/// Preemptive round-robin
///
/// Same selection as FIFO, plus a ticker subscription that requests a
/// reschedule on every tick. The request is served on the way out of the
/// interrupt, where the running process goes to the tail of its priority
/// band.
pub struct RoundRobin {
    ticker: &'static dyn Ticker,
}

impl RoundRobin {
    pub fn new(ticker: &'static dyn Ticker) -> Self {
        Self { ticker }
    }
}

fn slice_expired(_ticker: &dyn Ticker, data: usize) -> Result<(), TickerError> {
    let resched = unsafe { &*(data as *const Resched) };
    resched.request_all();
    Ok(())
}

impl SchedPolicy for RoundRobin {
    fn name(&self) -> &'static str {
        "preempt-rr"
    }

    fn pick_ready(&self, ready: ReadyQueue<'_>, _current: Pid) -> Option<Pid> {
        ready.front()
    }

    fn attach(&self, resched: &'static Resched) -> Result<(), PolicyError> {
        self.ticker
            .add_callback(slice_expired, resched as *const Resched as usize)?;
        debug!(
            "round-robin: time slice {} ms",
            1000 / self.ticker.ticks_per_sec().max(1)
        );
        Ok(())
    }
}
