use super::policy::{ReadyQueue, SchedPolicy};
use crate::process::Pid;

/// Cooperative FIFO
///
/// Runs the head of the ready list and never asks for preemption: a process
/// keeps the CPU until it blocks, yields or exits, or until a strictly more
/// urgent process becomes ready.
pub struct CoopFifo;

impl SchedPolicy for CoopFifo {
    fn name(&self) -> &'static str {
        "coop-fifo"
    }

    fn pick_ready(&self, ready: ReadyQueue<'_>, _current: Pid) -> Option<Pid> {
        ready.front()
    }
}
