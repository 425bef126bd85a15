use log::{error, trace};

use super::Condition;
use crate::arch::IrqLock;
use crate::error::SyncError;
use crate::kcore::Kernel;
use crate::process::Pid;

#[derive(Debug, Default)]
struct MutexState {
    owner: Option<Pid>,
    count: u32,
}

/// Recursive mutex
///
/// The owner may acquire it again; it is released once every acquire has
/// been matched by a release. The final release wakes every waiter and the
/// first one scheduled takes ownership, so a waiter killed before it runs
/// cannot strand the others.
pub struct RecursiveMutex {
    state: IrqLock<MutexState>,
    cond: Condition,
}

impl RecursiveMutex {
    pub const fn new() -> Self {
        Self {
            state: IrqLock::new(MutexState {
                owner: None,
                count: 0,
            }),
            cond: Condition::new(),
        }
    }

    pub fn owner(&self) -> Option<Pid> {
        self.state.lock().owner
    }

    /// How many times the owner currently holds the mutex.
    pub fn lock_count(&self) -> u32 {
        self.state.lock().count
    }

    pub fn acquire(&self, kernel: &Kernel) {
        let Some(me) = kernel.current_pid() else {
            fatal!("mutex acquire outside process mode");
        };
        let mut state = self.state.lock();
        self.cond
            .block_until(kernel, &mut state, |s| s.owner.is_none_or(|o| o == me));
        state.owner = Some(me);
        state.count += 1;
        trace!(
            "rmutex {:#x}: pid {} count={}{}",
            self as *const Self as usize,
            me,
            state.count,
            if state.count == 1 { " -> ACQUIRED" } else { "" }
        );
    }

    /// Undo one acquire. Only the owner may release; anyone else gets
    /// [`SyncError::NotOwner`] and the mutex is left untouched.
    pub fn release(&self, kernel: &Kernel) -> Result<(), SyncError> {
        let me = kernel.current_pid();
        let mut state = self.state.lock();
        if state.owner.is_none() || state.owner != me {
            error!(
                "rmutex {:#x}: release by {:?}, owned by {:?}",
                self as *const Self as usize, me, state.owner
            );
            return Err(SyncError::NotOwner);
        }

        state.count -= 1;
        let mut woken = false;
        if state.count == 0 {
            state.owner = None;
            woken = self.cond.notify_all_locked(kernel);
            trace!("rmutex {:#x}: released", self as *const Self as usize);
        }
        drop(state);

        if woken {
            kernel.schedule();
        }
        Ok(())
    }
}

impl Default for RecursiveMutex {
    fn default() -> Self {
        Self::new()
    }
}
