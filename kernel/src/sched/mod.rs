//! Scheduling
//!
//! - [`policy`]: the pluggable policy interface and the board default
//! - [`fifo`] / [`rr`]: cooperative FIFO and preemptive round-robin
//! - [`scheduler`]: the state machine driving context switches
//! - [`sleep`]: OS tick accounting and timed sleeps

pub mod fifo;
pub mod policy;
pub mod rr;
pub mod scheduler;
pub mod sleep;

use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::MAX_CPUS;

pub use fifo::CoopFifo;
pub use policy::{ReadyQueue, SchedPolicy, board_default};
pub use rr::RoundRobin;

/// Per-CPU "reschedule needed" flags.
///
/// Set from interrupt context or by wakeups, consumed by
/// [`Kernel::schedule_if_needed`](crate::Kernel::schedule_if_needed).
pub struct Resched {
    pending: [AtomicBool; MAX_CPUS],
}

impl Resched {
    pub const fn new() -> Self {
        const CLEAR: AtomicBool = AtomicBool::new(false);
        Self {
            pending: [CLEAR; MAX_CPUS],
        }
    }

    pub fn request(&self, cpu: usize) {
        self.pending[cpu].store(true, Ordering::Release);
    }

    pub fn request_all(&self) {
        for flag in &self.pending {
            flag.store(true, Ordering::Release);
        }
    }

    pub fn is_pending(&self, cpu: usize) -> bool {
        self.pending[cpu].load(Ordering::Acquire)
    }

    pub(crate) fn take(&self, cpu: usize) -> bool {
        self.pending[cpu].swap(false, Ordering::AcqRel)
    }

    pub(crate) fn clear(&self, cpu: usize) {
        self.pending[cpu].store(false, Ordering::Release);
    }
}

impl Default for Resched {
    fn default() -> Self {
        Self::new()
    }
}
