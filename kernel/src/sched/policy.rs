use alloc::boxed::Box;

use drivers::Ticker;

use super::Resched;
use crate::error::PolicyError;
use crate::process::{Pid, ProcessTable};

/// Read-only view of one CPU's ready list, in scheduling order.
pub struct ReadyQueue<'a> {
    table: &'a ProcessTable,
    cpu: usize,
}

impl<'a> ReadyQueue<'a> {
    pub(crate) fn new(table: &'a ProcessTable, cpu: usize) -> Self {
        Self { table, cpu }
    }

    pub fn cpu(&self) -> usize {
        self.cpu
    }

    pub fn front(&self) -> Option<Pid> {
        self.table.ready_front(self.cpu)
    }

    pub fn iter(&self) -> impl Iterator<Item = Pid> + 'a {
        self.table.ready(self.cpu)
    }

    pub fn priority(&self, pid: Pid) -> Option<u8> {
        self.table.get(pid).map(|p| p.priority)
    }

    pub fn is_empty(&self) -> bool {
        self.front().is_none()
    }
}

/// Scheduling policy
///
/// Chooses which ready process runs next. Ready lists are kept sorted by
/// priority with FIFO order inside a priority, so a policy only decides
/// *whether* the order is honoured and *when* rescheduling is requested.
pub trait SchedPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Pick the next process for `ready.cpu()`. `current` is the process
    /// whose context currently occupies the CPU.
    fn pick_ready(&self, ready: ReadyQueue<'_>, current: Pid) -> Option<Pid>;

    /// Called once when the scheduler starts.
    fn attach(&self, resched: &'static Resched) -> Result<(), PolicyError> {
        let _ = resched;
        Ok(())
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "sched-rr")] {
        /// Policy selected by the board configuration (`sched-rr`).
        pub fn board_default(ticker: &'static dyn Ticker) -> Box<dyn SchedPolicy> {
            Box::new(super::RoundRobin::new(ticker))
        }
    } else if #[cfg(feature = "sched-fifo")] {
        /// Policy selected by the board configuration (`sched-fifo`).
        pub fn board_default(_ticker: &'static dyn Ticker) -> Box<dyn SchedPolicy> {
            Box::new(super::CoopFifo)
        }
    } else {
        compile_error!("enable one of the `sched-fifo` or `sched-rr` features");
    }
}
