use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use bitflags::bitflags;

use super::list::List;
use super::stack::ProcessStack;
use crate::config::{PROCESS_MAX_CMD_LEN, PROCESS_MAX_NAME_LEN, SCHED_PRIORITY_MAX_USER};
use crate::kcore::Kernel;

/// Process states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProcessStatus {
    NotInit = 0, // Allocated, not registered yet
    Ready,       // Ready to run
    Blocked,     // Waiting for an event
    Running,     // Currently executing
    Zombie,      // Terminated but not yet reaped
}

impl ProcessStatus {
    pub const COUNT: usize = 5;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessStatus::NotInit => "NOT_INIT",
            ProcessStatus::Ready => "READY",
            ProcessStatus::Blocked => "BLOCKED",
            ProcessStatus::Running => "RUNNING",
            ProcessStatus::Zombie => "ZOMBIE",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process identifier, derived from the process table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u16);

impl Pid {
    pub fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProcessFlags: u8 {
        /// Runs kernel code only, may use kernel priorities
        const KERNEL = 1 << 0;
        const IDLE = 1 << 1;
        const INIT = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemRegion {
    pub base: usize,
    pub size: usize,
}

/// Memory owned by the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemLayout {
    pub image: MemRegion,
    pub text: MemRegion,
    pub data: MemRegion,
    pub bss: MemRegion,
    pub heap: MemRegion,
    pub stack: MemRegion,
}

/// What a BLOCKED process is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitChannel {
    /// Wait queue of the condition at this address
    Condition(usize),
    Sleep,
}

/// Scheduling list a process is linked on through its scheduling link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedList {
    Ready(usize),
    Blocked,
    Zombie,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessStats {
    /// OS ticks spent in each status, indexed by [`ProcessStatus::index`]
    pub ticks: [u64; ProcessStatus::COUNT],
    /// OS tick of the last status change
    pub last_change: u64,
}

/// Body of a kernel process; its return value is the exit status.
pub type ProcessMain = Box<dyn FnOnce(&'static Kernel) -> i32 + Send>;

/// Process Control Block
pub struct Process {
    pub pid: Pid,
    pub name: String,
    pub cmdline: String,
    pub flags: ProcessFlags,
    pub status: ProcessStatus,
    /// Lower is more urgent
    pub priority: u8,
    /// CPU whose ready list the process belongs to
    pub cpu: usize,
    pub(crate) sched_list: Option<SchedList>,
    pub mem: MemLayout,
    pub(crate) stack: Option<ProcessStack>,
    pub(crate) entry: Option<ProcessMain>,
    pub exit_status: i32,
    pub parent: Option<Pid>,
    pub(crate) children: List,
    pub(crate) refs: u32,
    /// Free the slot once the last reference is dropped
    pub(crate) pending_free: bool,
    pub(crate) blocked_on: Option<WaitChannel>,
    /// Child whose exit this process is waiting for; holds a reference on it
    pub(crate) waiting_for: Option<Pid>,
    /// Trap frame of the last interruption or fault, if any
    pub trap_frame: Option<usize>,
    pub stats: ProcessStats,
}

fn truncated(s: &str, max: usize) -> String {
    let mut end = s.len().min(max);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    String::from(&s[..end])
}

impl Process {
    pub(crate) fn new(pid: Pid, name: &str, osticks: u64) -> Self {
        Self {
            pid,
            name: truncated(name, PROCESS_MAX_NAME_LEN),
            cmdline: String::new(),
            flags: ProcessFlags::empty(),
            status: ProcessStatus::NotInit,
            priority: SCHED_PRIORITY_MAX_USER,
            cpu: 0,
            sched_list: None,
            mem: MemLayout::default(),
            stack: None,
            entry: None,
            exit_status: 0,
            parent: None,
            children: List::new(),
            refs: 0,
            pending_free: false,
            blocked_on: None,
            waiting_for: None,
            trap_frame: None,
            stats: ProcessStats {
                last_change: osticks,
                ..ProcessStats::default()
            },
        }
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = truncated(name, PROCESS_MAX_NAME_LEN);
    }

    pub fn set_cmdline(&mut self, cmdline: &str) {
        self.cmdline = truncated(cmdline, PROCESS_MAX_CMD_LEN);
    }

    pub fn is_kernel(&self) -> bool {
        self.flags.contains(ProcessFlags::KERNEL)
    }

    pub fn stack(&self) -> Option<&ProcessStack> {
        self.stack.as_ref()
    }

    pub(crate) fn attach_stack(&mut self, stack: ProcessStack) {
        self.mem.stack = MemRegion {
            base: stack.bottom(),
            size: stack.size(),
        };
        self.stack = Some(stack);
    }

    /// Release the memory owned by the process.
    pub(crate) fn release_memory(&mut self) {
        self.stack = None;
        self.entry = None;
        self.mem = MemLayout::default();
    }

    /// Account the ticks spent in the current status.
    pub(crate) fn account(&mut self, osticks: u64) {
        let spent = osticks.saturating_sub(self.stats.last_change);
        self.stats.ticks[self.status.index()] += spent;
        self.stats.last_change = osticks;
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("priority", &self.priority)
            .field("parent", &self.parent)
            .field("refs", &self.refs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_truncated_on_char_boundaries() {
        let mut p = Process::new(Pid(1), "a-very-long-process-name", 0);
        assert_eq!(p.name, "a-very-long-proc");
        p.set_name("ééééééééé");
        assert!(p.name.len() <= PROCESS_MAX_NAME_LEN);
        assert!(p.name.chars().all(|c| c == 'é'));
    }

    #[test]
    fn accounting_charges_the_status_being_left() {
        let mut p = Process::new(Pid(1), "p", 10);
        p.status = ProcessStatus::Ready;
        p.account(15);
        p.status = ProcessStatus::Running;
        p.account(22);
        assert_eq!(p.stats.ticks[ProcessStatus::Ready.index()], 5);
        assert_eq!(p.stats.ticks[ProcessStatus::Running.index()], 7);
    }
}
