//! Processes
//!
//! - [`pcb`]: the process control block and its identifiers
//! - [`table`]: the slab of PCBs and the scheduling lists over it
//! - [`list`]: index-linked lists used by the table
//! - [`stack`]: process stacks with canaries and high-water marking
//! - [`lifecycle`]: spawn, exit, kill, wait and friends on [`Kernel`](crate::Kernel)

pub mod lifecycle;
pub mod list;
pub mod pcb;
pub mod stack;
pub mod table;

pub use lifecycle::{KILLED_EXIT_STATUS, ProcessInfo, ProcessRef};
pub use pcb::{
    MemLayout, MemRegion, Pid, Process, ProcessFlags, ProcessMain, ProcessStats, ProcessStatus,
};
pub use stack::{ProcessStack, STACK_CANARY, StackError};
pub use table::ProcessTable;
