use alloc::collections::VecDeque;

use log::trace;

use crate::arch::{Arch, Cpu, IrqLock, IrqLockGuard};
use crate::kcore::Kernel;
use crate::process::pcb::WaitChannel;
use crate::process::{Pid, ProcessStatus, ProcessTable};

/// Condition variable
///
/// A FIFO of blocked processes. Waiting always happens with some lock held
/// (the caller's data lock or the process table lock), which is released
/// only once the waiter is on the queue, so a notification issued under
/// the same lock can never be missed.
///
/// Lock order: caller's lock, then the process table, then the wait queue.
pub struct Condition {
    waiters: IrqLock<VecDeque<Pid>>,
}

impl Condition {
    pub const fn new() -> Self {
        Self {
            waiters: IrqLock::new(VecDeque::new()),
        }
    }

    fn channel(&self) -> WaitChannel {
        WaitChannel::Condition(self as *const Condition as usize)
    }

    /// Number of queued waiters, stale entries included.
    pub fn waiters(&self) -> usize {
        self.waiters.lock().len()
    }

    fn enqueue_current(&self, procs: &mut ProcessTable) {
        let Some(me) = procs.current(Cpu::cpu_id()) else {
            fatal!("condition wait outside process mode");
        };
        procs.block(me, self.channel());
        self.waiters.lock().push_back(me);
        trace!("process {} waiting on condition {:#x}", me, self as *const Self as usize);
    }

    /// Block the caller until notified. `guard` is released while blocked
    /// and held again on return.
    pub fn wait_locked<T>(&self, kernel: &Kernel, guard: &mut IrqLockGuard<'_, T>) {
        self.enqueue_current(&mut kernel.procs.lock());
        IrqLockGuard::unlocked(guard, || kernel.schedule());
    }

    /// Same as [`wait_locked`](Self::wait_locked) when the lock held is the
    /// process table lock itself.
    pub(crate) fn wait_proclocked(
        &self,
        kernel: &Kernel,
        procs: &mut IrqLockGuard<'_, ProcessTable>,
    ) {
        self.enqueue_current(procs);
        IrqLockGuard::unlocked(procs, || kernel.schedule());
    }

    /// Wait until `ready` holds for the data behind `guard`. The predicate
    /// is checked first and re-checked after every wakeup.
    pub fn block_until<T, F>(&self, kernel: &Kernel, guard: &mut IrqLockGuard<'_, T>, mut ready: F)
    where
        F: FnMut(&mut T) -> bool,
    {
        while !ready(&mut **guard) {
            self.wait_locked(kernel, guard);
        }
    }

    /// Wake the first waiter. Returns its PID, or `None` if nobody waits.
    pub fn notify_locked(&self, kernel: &Kernel) -> Option<Pid> {
        self.notify_proclocked(kernel, &mut kernel.procs.lock())
    }

    /// Wake every waiter. Returns whether any process was woken.
    pub fn notify_all_locked(&self, kernel: &Kernel) -> bool {
        self.notify_all_proclocked(kernel, &mut kernel.procs.lock())
    }

    pub(crate) fn notify_proclocked(&self, kernel: &Kernel, procs: &mut ProcessTable) -> Option<Pid> {
        loop {
            let pid = self.waiters.lock().pop_front()?;
            // Killed or already woken by something else
            if procs.blocked_on(pid) != Some(self.channel()) {
                continue;
            }
            if procs.set_status(pid, ProcessStatus::Ready) {
                if let Some(p) = procs.get(pid) {
                    kernel.resched.request(p.cpu);
                }
            }
            trace!("process {} woken from condition {:#x}", pid, self as *const Self as usize);
            return Some(pid);
        }
    }

    pub(crate) fn notify_all_proclocked(&self, kernel: &Kernel, procs: &mut ProcessTable) -> bool {
        let mut woken = false;
        while self.notify_proclocked(kernel, procs).is_some() {
            woken = true;
        }
        woken
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::new()
    }
}
