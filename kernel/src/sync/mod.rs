//! Blocking synchronization primitives
//!
//! All of them park the caller through the scheduler instead of spinning,
//! so they may only be used from process context. Interrupt handlers use
//! the IRQ-safe spinlocks from `common::sync` directly.

mod condition;
mod rmutex;
mod semaphore;

pub use condition::Condition;
pub use rmutex::RecursiveMutex;
pub use semaphore::Semaphore;
