//! Error types returned by kernel operations.
//!
//! Only caller-recoverable conditions are represented here. Broken kernel
//! invariants go through [`fatal!`](crate::fatal) instead.

use core::fmt;

use drivers::TickerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// Every process table slot is in use.
    TableFull,
    NoSuchProcess,
    /// The process is not in a state that allows the operation.
    InvalidState,
    /// The priority is out of range for this kind of process.
    InvalidPriority,
    /// `wait_pid` on a process that is not a direct child of the caller.
    NotAChild,
    /// Stack allocation failed.
    OutOfMemory,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ProcessError::TableFull => "process table full",
            ProcessError::NoSuchProcess => "no such process",
            ProcessError::InvalidState => "invalid process state for operation",
            ProcessError::InvalidPriority => "invalid priority",
            ProcessError::NotAChild => "process is not a child of the caller",
            ProcessError::OutOfMemory => "out of memory",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// Release of a mutex by a process that does not own it.
    NotOwner,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::NotOwner => f.write_str("mutex not owned by caller"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    /// The policy could not subscribe to its ticker.
    Ticker(TickerError),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::Ticker(e) => write!(f, "scheduling policy ticker: {}", e),
        }
    }
}

impl From<TickerError> for PolicyError {
    fn from(e: TickerError) -> Self {
        PolicyError::Ticker(e)
    }
}
