use log::trace;

use super::Condition;
use crate::arch::IrqLock;
use crate::kcore::Kernel;

/// Counting semaphore
///
/// `acquire` blocks while the count is zero. `release` wakes every waiter
/// and lets the scheduler pick among them; the losers find the count back
/// at zero and wait again.
pub struct Semaphore {
    count: IrqLock<u32>,
    cond: Condition,
}

impl Semaphore {
    pub const fn new(count: u32) -> Self {
        Self {
            count: IrqLock::new(count),
            cond: Condition::new(),
        }
    }

    pub fn count(&self) -> u32 {
        *self.count.lock()
    }

    /// Take one unit, blocking until one is available.
    pub fn acquire(&self, kernel: &Kernel) {
        let mut count = self.count.lock();
        self.cond.block_until(kernel, &mut count, |c| *c > 0);
        *count -= 1;
        trace!("sem {:#x}: acquired, count={}", self as *const Self as usize, *count);
    }

    /// Take one unit if available without blocking.
    pub fn try_acquire(&self) -> bool {
        let mut count = self.count.lock();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// Give back one unit and switch to a woken waiter if it is at least as
    /// urgent as the caller.
    pub fn release(&self, kernel: &Kernel) {
        let mut count = self.count.lock();
        let woken = self.cond.notify_all_locked(kernel);
        *count = count.saturating_add(1);
        trace!("sem {:#x}: released, count={}", self as *const Self as usize, *count);
        drop(count);

        if woken {
            kernel.schedule();
        }
    }

    /// Processes queued on the semaphore.
    pub fn waiters(&self) -> usize {
        self.cond.waiters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kcore::testing::started_kernel;

    #[test]
    fn counts_down_and_up_without_blocking() {
        let k = started_kernel(4);
        let sem = Semaphore::new(2);
        sem.acquire(k);
        sem.acquire(k);
        assert_eq!(sem.count(), 0);
        assert!(!sem.try_acquire());

        sem.release(k);
        assert!(sem.try_acquire());
        sem.release(k);
        sem.release(k);
        assert_eq!(sem.count(), 2);
        assert_eq!(sem.waiters(), 0);
    }

    #[test]
    fn release_at_the_top_of_the_range_saturates() {
        let k = started_kernel(4);
        let sem = Semaphore::new(u32::MAX);
        sem.release(k);
        assert_eq!(sem.count(), u32::MAX);
        assert!(sem.try_acquire());
        assert_eq!(sem.count(), u32::MAX - 1);
    }
}
