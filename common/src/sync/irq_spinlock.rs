use core::{
    cell::UnsafeCell,
    marker::PhantomData,
    sync::atomic::{AtomicU32, Ordering, fence},
};

use super::irq::IrqControl;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// IRQ-safe spinlock word, without protected data.
///
/// - Disables local interrupts and saves the previous mask on acquire
/// - Spins on a compare-and-swap of an aligned 32-bit word from 0 to 1
/// - Restores the saved mask on release
///
/// Only the local core's interrupts are masked: the spin loop gives mutual
/// exclusion between cores, the mask prevents a same-core interrupt handler
/// from deadlocking against the holder.
///
/// Not fair. Not reentrant.
#[repr(C, align(4))]
pub struct RawSpinLock<I: IrqControl> {
    word: AtomicU32,
    _irq: PhantomData<I>,
}

unsafe impl<I: IrqControl> Send for RawSpinLock<I> {}
unsafe impl<I: IrqControl> Sync for RawSpinLock<I> {}

impl<I: IrqControl> RawSpinLock<I> {
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(UNLOCKED),
            _irq: PhantomData,
        }
    }

    /// Acquire the lock and return the interrupt state to hand back to
    /// [`release`](Self::release).
    pub fn acquire(&self) -> I::State {
        let irq_state = I::disable();

        while self
            .word
            .compare_exchange_weak(UNLOCKED, LOCKED, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            while self.word.load(Ordering::Relaxed) == LOCKED {
                core::hint::spin_loop();
            }
        }

        // Nothing after this point may be observed before the lock is held
        fence(Ordering::Acquire);
        irq_state
    }

    /// Single acquisition attempt. Interrupts are left untouched on failure.
    pub fn try_acquire(&self) -> Option<I::State> {
        let irq_state = I::disable();
        if self
            .word
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            fence(Ordering::Acquire);
            Some(irq_state)
        } else {
            I::restore(irq_state);
            None
        }
    }

    /// Release the lock and restore the interrupt state saved by `acquire`.
    ///
    /// # Safety
    /// The caller must hold the lock and pass the state returned by the
    /// matching acquisition.
    pub unsafe fn release(&self, irq_state: I::State) {
        fence(Ordering::Release);
        self.word.store(UNLOCKED, Ordering::Relaxed);
        I::restore(irq_state);
    }

    pub fn is_locked(&self) -> bool {
        self.word.load(Ordering::Relaxed) == LOCKED
    }
}

impl<I: IrqControl> Default for RawSpinLock<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// IRQ-safe spinlock protecting a value.
///
/// Safe to use from:
/// - IRQ context
/// - Normal kernel context
pub struct IrqSpinLock<T, I: IrqControl> {
    raw: RawSpinLock<I>,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send, I: IrqControl> Send for IrqSpinLock<T, I> {}
unsafe impl<T: Send, I: IrqControl> Sync for IrqSpinLock<T, I> {}

impl<T, I: IrqControl> IrqSpinLock<T, I> {
    /// Create a new IRQ-safe spinlock.
    pub const fn new(data: T) -> Self {
        Self {
            raw: RawSpinLock::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquire the lock with local interrupts disabled.
    pub fn lock(&self) -> IrqSpinLockGuard<'_, T, I> {
        let irq_state = self.raw.acquire();
        IrqSpinLockGuard {
            lock: self,
            irq_state,
        }
    }

    pub fn try_lock(&self) -> Option<IrqSpinLockGuard<'_, T, I>> {
        self.raw.try_acquire().map(|irq_state| IrqSpinLockGuard {
            lock: self,
            irq_state,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Exclusive access without locking, for exclusively borrowed locks.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

/// Guard returned by `IrqSpinLock::lock`.
///
/// Restores interrupt state on drop.
pub struct IrqSpinLockGuard<'a, T, I: IrqControl> {
    lock: &'a IrqSpinLock<T, I>,
    irq_state: I::State,
}

impl<'a, T, I: IrqControl> IrqSpinLockGuard<'a, T, I> {
    /// Temporarily release the lock (restoring the saved interrupt state)
    /// while `f` runs, then take it again before returning.
    ///
    /// This is the primitive behind blocking waits: the caller gives up the
    /// lock, yields the CPU inside `f`, and owns the lock again once resumed.
    pub fn unlocked<F, R>(guard: &mut Self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        unsafe { guard.lock.raw.release(guard.irq_state) };
        let ret = f();
        guard.irq_state = guard.lock.raw.acquire();
        ret
    }
}

impl<'a, T, I: IrqControl> core::ops::Deref for IrqSpinLockGuard<'a, T, I> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T, I: IrqControl> core::ops::DerefMut for IrqSpinLockGuard<'a, T, I> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<'a, T, I: IrqControl> Drop for IrqSpinLockGuard<'a, T, I> {
    fn drop(&mut self) {
        unsafe { self.lock.raw.release(self.irq_state) };
    }
}
