//! Process table
//!
//! Fixed-capacity slab of process control blocks plus every list the
//! scheduler keeps over them. A PID is the index of its slot. All status
//! changes go through [`ProcessTable::set_status`], which moves the process
//! to the matching scheduling list in the same step, so status and list
//! membership never disagree while the table lock is released.

use alloc::boxed::Box;
use alloc::vec::Vec;

use log::{debug, error, trace};

use super::list::{Link, List};
use super::pcb::{Pid, Process, ProcessStatus, SchedList, WaitChannel};
use crate::config::MAX_CPUS;
use crate::error::ProcessError;

#[derive(Debug, Clone, Copy)]
struct Sleeper {
    pid: Pid,
    wake_at: u64,
}

pub struct ProcessTable {
    slots: Box<[Option<Process>]>,
    all_links: Box<[Link]>,
    sched_links: Box<[Link]>,
    sibling_links: Box<[Link]>,
    all: List,
    ready: [List; MAX_CPUS],
    blocked: List,
    zombie: List,
    /// Process whose context occupies each CPU, whatever its status
    current: [Option<Pid>; MAX_CPUS],
    sleepers: Vec<Sleeper>,
    pub(crate) init: Option<Pid>,
    pub(crate) osticks: u64,
    pub(crate) ctx_switches: u64,
}

impl ProcessTable {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(u16::MAX as usize);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            all_links: alloc::vec![Link::default(); capacity].into_boxed_slice(),
            sched_links: alloc::vec![Link::default(); capacity].into_boxed_slice(),
            sibling_links: alloc::vec![Link::default(); capacity].into_boxed_slice(),
            all: List::new(),
            ready: core::array::from_fn(|_| List::new()),
            blocked: List::new(),
            zombie: List::new(),
            current: [None; MAX_CPUS],
            sleepers: Vec::new(),
            init: None,
            osticks: 0,
            ctx_switches: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of allocated slots.
    pub fn allocated(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Number of registered processes.
    pub fn registered(&self) -> usize {
        self.all.len()
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.slots.get(pid.slot())?.as_ref()
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.slots.get_mut(pid.slot())?.as_mut()
    }

    fn proc(&self, pid: Pid) -> Result<&Process, ProcessError> {
        self.get(pid).ok_or(ProcessError::NoSuchProcess)
    }

    fn proc_mut(&mut self, pid: Pid) -> Result<&mut Process, ProcessError> {
        self.get_mut(pid).ok_or(ProcessError::NoSuchProcess)
    }

    pub fn status(&self, pid: Pid) -> Option<ProcessStatus> {
        self.get(pid).map(|p| p.status)
    }

    pub fn current(&self, cpu: usize) -> Option<Pid> {
        self.current[cpu]
    }

    pub(crate) fn blocked_on(&self, pid: Pid) -> Option<WaitChannel> {
        self.get(pid).and_then(|p| p.blocked_on)
    }

    /// Registered processes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Process> + '_ {
        self.all
            .iter(&self.all_links)
            .filter_map(move |i| self.slots[i].as_ref())
    }

    /// Ready processes of `cpu` in scheduling order.
    pub fn ready(&self, cpu: usize) -> impl Iterator<Item = Pid> + '_ {
        self.ready[cpu].iter(&self.sched_links).map(|i| Pid(i as u16))
    }

    pub fn ready_front(&self, cpu: usize) -> Option<Pid> {
        self.ready[cpu].front().map(|i| Pid(i as u16))
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.len()
    }

    pub fn zombie_count(&self) -> usize {
        self.zombie.len()
    }

    pub fn children(&self, pid: Pid) -> impl Iterator<Item = Pid> + '_ {
        self.get(pid)
            .into_iter()
            .flat_map(move |p| p.children.iter(&self.sibling_links))
            .map(|i| Pid(i as u16))
    }

    pub fn has_zombie_children(&self, pid: Pid) -> bool {
        self.children(pid)
            .any(|c| self.status(c) == Some(ProcessStatus::Zombie))
    }

    // ========================================================================
    // Slab
    // ========================================================================

    /// Take a free slot. The new process is NOT_INIT and its PID is the
    /// slot index.
    pub fn alloc(&mut self, name: &str) -> Result<Pid, ProcessError> {
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(ProcessError::TableFull)?;
        let pid = Pid(slot as u16);
        self.slots[slot] = Some(Process::new(pid, name, self.osticks));
        Ok(pid)
    }

    /// Return a NOT_INIT slot to the slab. With references outstanding the
    /// slot is released when the last one is dropped.
    pub fn free(&mut self, pid: Pid) -> Result<(), ProcessError> {
        let p = self.proc_mut(pid)?;
        if p.status != ProcessStatus::NotInit {
            error!("process {}: cannot free while {}", pid, p.status);
            return Err(ProcessError::InvalidState);
        }
        if p.refs > 0 {
            p.pending_free = true;
        } else {
            self.slots[pid.slot()] = None;
        }
        Ok(())
    }

    pub fn get_ref(&mut self, pid: Pid) -> Result<(), ProcessError> {
        let p = self.proc_mut(pid)?;
        if p.pending_free {
            return Err(ProcessError::NoSuchProcess);
        }
        p.refs += 1;
        Ok(())
    }

    pub fn put_ref(&mut self, pid: Pid) {
        let Some(p) = self.get_mut(pid) else {
            return;
        };
        p.refs = p.refs.saturating_sub(1);
        if p.refs == 0 && p.pending_free {
            debug!("process {}: last reference dropped, slot released", pid);
            self.slots[pid.slot()] = None;
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Make an allocated process schedulable: link it on the process list,
    /// under its parent and on the ready list of `cpu`.
    ///
    /// Returns whether the new process should preempt the one running on `cpu`.
    pub fn register(
        &mut self,
        pid: Pid,
        parent: Option<Pid>,
        cpu: usize,
    ) -> Result<bool, ProcessError> {
        let p = self.proc_mut(pid)?;
        if p.status != ProcessStatus::NotInit {
            error!("process {}: already registered", pid);
            return Err(ProcessError::InvalidState);
        }
        p.cpu = cpu;
        p.parent = parent;
        self.all.push_back(&mut self.all_links, pid.slot());
        if let Some(parent) = parent {
            self.link_child(parent, pid);
        }
        debug!("process {} registered, parent {:?}", pid, parent);
        Ok(self.set_status(pid, ProcessStatus::Ready))
    }

    /// Remove a NOT_INIT or ZOMBIE process from every list and free its slot.
    pub fn unregister(&mut self, pid: Pid) -> Result<(), ProcessError> {
        let p = self.proc(pid)?;
        match p.status {
            ProcessStatus::NotInit | ProcessStatus::Zombie => {}
            status => {
                error!("process {}: cannot unregister while {}", pid, status);
                return Err(ProcessError::InvalidState);
            }
        }
        let parent = p.parent;
        self.set_status(pid, ProcessStatus::NotInit);
        self.all.remove(&mut self.all_links, pid.slot());
        if let Some(parent) = parent {
            self.unlink_child(parent, pid);
        }
        if let Some(p) = self.get_mut(pid) {
            p.parent = None;
            p.release_memory();
        }
        debug!("process {} unregistered", pid);
        self.free(pid)
    }

    fn link_child(&mut self, parent: Pid, child: Pid) {
        if let Some(p) = self.slots.get_mut(parent.slot()).and_then(Option::as_mut) {
            p.children.push_back(&mut self.sibling_links, child.slot());
        }
    }

    fn unlink_child(&mut self, parent: Pid, child: Pid) {
        if let Some(p) = self.slots.get_mut(parent.slot()).and_then(Option::as_mut) {
            p.children.remove(&mut self.sibling_links, child.slot());
        }
    }

    /// Move every child of `pid` under `new_parent`.
    ///
    /// Returns whether any of the moved children is a zombie, so the new
    /// parent can be woken to reap it.
    pub fn reparent_children(&mut self, pid: Pid, new_parent: Option<Pid>) -> bool {
        let mut zombies = false;
        loop {
            let Some(child) = self
                .slots
                .get_mut(pid.slot())
                .and_then(Option::as_mut)
                .and_then(|p| p.children.pop_front(&mut self.sibling_links))
            else {
                break;
            };
            let child = Pid(child as u16);
            if let Some(c) = self.get_mut(child) {
                c.parent = new_parent;
                zombies |= c.status == ProcessStatus::Zombie;
            }
            if let Some(np) = new_parent {
                self.link_child(np, child);
            }
            trace!("process {}: reparented to {:?}", child, new_parent);
        }
        zombies
    }

    // ========================================================================
    // Scheduling state
    // ========================================================================

    /// Change the status of `pid` and move it to the matching list.
    ///
    /// Returns whether the process became READY with a higher priority than
    /// the process running on its CPU.
    pub fn set_status(&mut self, pid: Pid, new: ProcessStatus) -> bool {
        let osticks = self.osticks;
        let idx = pid.slot();
        let Some(p) = self.slots.get_mut(idx).and_then(Option::as_mut) else {
            return false;
        };
        let old = p.status;
        let cpu = p.cpu;
        let priority = p.priority;
        let list = p.sched_list.take();
        p.account(osticks);
        p.status = new;
        if new != ProcessStatus::Blocked {
            p.blocked_on = None;
        }

        match list {
            Some(SchedList::Ready(c)) => self.ready[c].remove(&mut self.sched_links, idx),
            Some(SchedList::Blocked) => self.blocked.remove(&mut self.sched_links, idx),
            Some(SchedList::Zombie) => self.zombie.remove(&mut self.sched_links, idx),
            None => {}
        }
        let list = match new {
            ProcessStatus::Ready => {
                self.insert_ready(idx, cpu, priority);
                Some(SchedList::Ready(cpu))
            }
            ProcessStatus::Blocked => {
                self.blocked.push_back(&mut self.sched_links, idx);
                Some(SchedList::Blocked)
            }
            ProcessStatus::Zombie => {
                self.zombie.push_back(&mut self.sched_links, idx);
                Some(SchedList::Zombie)
            }
            ProcessStatus::Running => {
                self.current[cpu] = Some(pid);
                None
            }
            ProcessStatus::NotInit => None,
        };
        if let Some(p) = self.slots[idx].as_mut() {
            p.sched_list = list;
        }
        trace!("{}: {} -> {}", pid, old, new);

        new == ProcessStatus::Ready && self.preempts_running(cpu, priority)
    }

    /// Ready lists are sorted by priority; a process goes after every ready
    /// process of the same priority.
    fn insert_ready(&mut self, idx: usize, cpu: usize, priority: u8) {
        let at = self.ready[cpu]
            .iter(&self.sched_links)
            .find(|&q| self.slots[q].as_ref().is_some_and(|p| p.priority > priority));
        match at {
            Some(at) => self.ready[cpu].insert_before(&mut self.sched_links, at, idx),
            None => self.ready[cpu].push_back(&mut self.sched_links, idx),
        }
    }

    fn preempts_running(&self, cpu: usize, priority: u8) -> bool {
        self.current[cpu]
            .and_then(|r| self.get(r))
            .is_some_and(|r| r.status == ProcessStatus::Running && priority < r.priority)
    }

    /// RUNNING or READY -> BLOCKED on `chan`.
    pub(crate) fn block(&mut self, pid: Pid, chan: WaitChannel) {
        self.set_status(pid, ProcessStatus::Blocked);
        if let Some(p) = self.get_mut(pid) {
            p.blocked_on = Some(chan);
        }
    }

    /// Change the priority of `pid`, re-sorting it if it is READY.
    ///
    /// Returns whether the change requires the CPU of `pid` to reschedule.
    pub fn set_priority(&mut self, pid: Pid, priority: u8) -> Result<bool, ProcessError> {
        let p = self.proc_mut(pid)?;
        let old = p.priority;
        let cpu = p.cpu;
        let status = p.status;
        p.priority = priority;
        debug!("process {}: priority {} -> {}", pid, old, priority);

        Ok(match status {
            ProcessStatus::Ready => {
                self.ready[cpu].remove(&mut self.sched_links, pid.slot());
                self.insert_ready(pid.slot(), cpu, priority);
                let head = self.ready_front(cpu) == Some(pid);
                head && self.preempts_running(cpu, priority)
            }
            // Giving up priority may let a ready process in
            ProcessStatus::Running => priority > old,
            _ => false,
        })
    }

    // ========================================================================
    // Sleep queue
    // ========================================================================

    /// Block `pid` until the OS tick counter reaches `wake_at`. The sleep
    /// queue holds a reference on the process meanwhile.
    pub(crate) fn sleep_until(&mut self, pid: Pid, wake_at: u64) -> Result<(), ProcessError> {
        self.get_ref(pid)?;
        self.sleepers.push(Sleeper { pid, wake_at });
        self.block(pid, WaitChannel::Sleep);
        Ok(())
    }

    /// Advance the OS tick counter and wake every expired sleeper.
    ///
    /// Returns whether a woken process should preempt.
    pub(crate) fn tick(&mut self) -> bool {
        self.osticks += 1;
        let now = self.osticks;
        let mut preempt = false;
        let mut i = 0;
        while i < self.sleepers.len() {
            if self.sleepers[i].wake_at > now {
                i += 1;
                continue;
            }
            let Sleeper { pid, .. } = self.sleepers.swap_remove(i);
            if self.blocked_on(pid) == Some(WaitChannel::Sleep) {
                preempt |= self.set_status(pid, ProcessStatus::Ready);
            }
            self.put_ref(pid);
        }
        preempt
    }

    /// Drop `pid` from the sleep queue, if it is there.
    pub(crate) fn cancel_sleep(&mut self, pid: Pid) {
        if let Some(i) = self.sleepers.iter().position(|s| s.pid == pid) {
            self.sleepers.swap_remove(i);
            self.put_ref(pid);
        }
    }
}
