//! Process lifecycle
//!
//! NOT_INIT -> READY on spawn, RUNNING -> ZOMBIE on exit or kill, and
//! ZOMBIE -> NOT_INIT when the parent (or init, for orphans) reaps it.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use common::sync::IrqControl;
use log::{debug, error, info, warn};

use super::pcb::{Pid, Process, ProcessFlags, ProcessStatus};
use super::stack::ProcessStack;
use super::table::ProcessTable;
use crate::arch::{Arch, Cpu, EntryPoint, Irq};
use crate::config::{PROCESS_MIN_STACK_SIZE, SCHED_PRIORITY_LOWEST, SCHED_PRIORITY_MAX_USER};
use crate::error::{PolicyError, ProcessError};
use crate::kcore::Kernel;

/// Exit status recorded for killed processes.
pub const KILLED_EXIT_STATUS: i32 = -1;

/// Snapshot of a process, detached from the process table lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: String,
    pub flags: ProcessFlags,
    pub status: ProcessStatus,
    pub priority: u8,
    pub parent: Option<Pid>,
    pub exit_status: i32,
    pub refs: u32,
}

impl From<&Process> for ProcessInfo {
    fn from(p: &Process) -> Self {
        Self {
            pid: p.pid,
            name: p.name.clone(),
            flags: p.flags,
            status: p.status,
            priority: p.priority,
            parent: p.parent,
            exit_status: p.exit_status,
            refs: p.refs,
        }
    }
}

/// Counted reference keeping a PCB slot alive.
///
/// The slot of an unregistered process is only returned to the table once
/// every reference is gone.
pub struct ProcessRef<'k> {
    kernel: &'k Kernel,
    pid: Pid,
}

impl ProcessRef<'_> {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn status(&self) -> Option<ProcessStatus> {
        self.kernel.procs.lock().status(self.pid)
    }
}

impl Drop for ProcessRef<'_> {
    fn drop(&mut self) {
        self.kernel.procs.lock().put_ref(self.pid);
    }
}

extern "C" fn process_entry(kernel: usize) -> ! {
    let kernel: &'static Kernel = unsafe { &*(kernel as *const Kernel) };
    kernel.run_current_entry()
}

impl Kernel {
    /// Enter process mode.
    ///
    /// The calling context becomes the init process (PID 0) running at
    /// `init_priority`, the scheduling policy is attached and the idle
    /// process is spawned.
    pub fn start(&'static self, init_priority: u8) -> Result<Pid, PolicyError> {
        let cpu = Cpu::cpu_id();
        let init = {
            let mut procs = self.procs.lock();
            if procs.init.is_some() {
                drop(procs);
                fatal!("scheduler started twice");
            }
            let pid = match procs.alloc("init") {
                Ok(pid) => pid,
                Err(e) => {
                    drop(procs);
                    fatal!("cannot allocate init process: {}", e)
                }
            };
            if let Some(p) = procs.get_mut(pid) {
                p.flags = ProcessFlags::INIT | ProcessFlags::KERNEL;
                p.priority = init_priority;
            }
            if let Err(e) = procs.register(pid, None, cpu) {
                drop(procs);
                fatal!("cannot register init process: {}", e);
            }
            procs.set_status(pid, ProcessStatus::Running);
            procs.init = Some(pid);
            pid
        };

        self.policy.attach(&self.resched)?;
        self.mark_started();

        let idle_stack = self.config.idle_stack_size;
        match self.spawn_kernel_process("idle", SCHED_PRIORITY_LOWEST, idle_stack, |k| k.idle_loop()) {
            Ok(idle) => {
                if let Some(p) = self.procs.lock().get_mut(idle) {
                    p.flags |= ProcessFlags::IDLE;
                }
            }
            Err(e) => fatal!("cannot create idle process: {}", e),
        }

        info!(
            "scheduler started: policy {}, init pid {} priority {}",
            self.policy.name(),
            init,
            init_priority
        );
        Ok(init)
    }

    /// Create a kernel process running `main` and make it ready.
    ///
    /// The new process is a child of the caller. Its exit status is the
    /// value returned by `main`.
    pub fn spawn_kernel_process<F>(
        &'static self,
        name: &str,
        priority: u8,
        stack_size: usize,
        main: F,
    ) -> Result<Pid, ProcessError>
    where
        F: FnOnce(&'static Kernel) -> i32 + Send + 'static,
    {
        let mut stack = ProcessStack::new(stack_size.max(PROCESS_MIN_STACK_SIZE))
            .map_err(|_| ProcessError::OutOfMemory)?;
        let pid = self.procs.lock().alloc(name)?;

        let entry = EntryPoint {
            func: process_entry,
            arg: self as *const Kernel as usize,
        };
        if let Err(e) = Cpu::init_context(&self.contexts[pid.slot()], &mut stack, entry) {
            let _ = self.procs.lock().free(pid);
            return Err(e);
        }

        let cpu = Cpu::cpu_id();
        let mut procs = self.procs.lock();
        let parent = procs.current(cpu);
        if let Some(p) = procs.get_mut(pid) {
            p.flags = ProcessFlags::KERNEL;
            p.priority = priority;
            p.attach_stack(stack);
            p.entry = Some(Box::new(main));
        }
        if procs.register(pid, parent, cpu)? {
            self.resched.request(cpu);
        }
        debug!("spawned kernel process {} '{}' priority {}", pid, name, priority);
        Ok(pid)
    }

    /// First code run by a fresh process.
    pub(crate) fn run_current_entry(&'static self) -> ! {
        Irq::enable();
        let cpu = Cpu::cpu_id();
        let main = {
            let mut procs = self.procs.lock();
            procs
                .current(cpu)
                .and_then(|pid| procs.get_mut(pid))
                .and_then(|p| p.entry.take())
        };
        let Some(main) = main else {
            fatal!("process started without an entry point");
        };
        let status = main(self);
        self.exit(status)
    }

    /// Terminate the calling process with `status`. Never returns.
    pub fn exit(&self, status: i32) -> ! {
        {
            let mut procs = self.procs.lock();
            let Some(pid) = procs.current(Cpu::cpu_id()) else {
                drop(procs);
                fatal!("exit outside process mode");
            };
            if procs.init == Some(pid) {
                drop(procs);
                fatal!("init exited with status {}", status);
            }
            self.terminate_locked(&mut procs, pid, status);
        }
        self.schedule();
        fatal!("zombie process resumed")
    }

    /// Terminate another process. Killing the caller is the same as `exit`.
    pub fn kill(&self, pid: Pid) -> Result<(), ProcessError> {
        let mut procs = self.procs.lock();
        match procs.status(pid) {
            None => return Err(ProcessError::NoSuchProcess),
            Some(ProcessStatus::NotInit) | Some(ProcessStatus::Zombie) => {
                return Err(ProcessError::InvalidState);
            }
            Some(_) => {}
        }
        let flags = procs.get(pid).map_or(ProcessFlags::empty(), |p| p.flags);
        if flags.intersects(ProcessFlags::INIT | ProcessFlags::IDLE) {
            error!("refusing to kill process {} ({:?})", pid, flags);
            return Err(ProcessError::InvalidState);
        }
        if procs.current(Cpu::cpu_id()) == Some(pid) {
            drop(procs);
            self.exit(KILLED_EXIT_STATUS);
        }
        self.terminate_locked(&mut procs, pid, KILLED_EXIT_STATUS);
        info!("process {} killed", pid);
        Ok(())
    }

    /// Move `pid` to ZOMBIE, hand its children to its own parent (init if
    /// there is none) and wake whoever waits for it.
    pub(crate) fn terminate_locked(&self, procs: &mut ProcessTable, pid: Pid, status: i32) {
        procs.cancel_sleep(pid);
        let Some(p) = procs.get_mut(pid) else {
            return;
        };
        p.exit_status = status;
        let parent = p.parent;
        let cpu = p.cpu;
        let waited = p.waiting_for.take();
        procs.set_status(pid, ProcessStatus::Zombie);
        // A killed waiter never gets back to drop its hold on the child
        if let Some(child) = waited {
            procs.put_ref(child);
        }

        // A process exiting on its own still runs on its stack
        if procs.current(cpu) != Some(pid) {
            if let Some(p) = procs.get_mut(pid) {
                p.release_memory();
            }
        }

        let heir = parent.or(procs.init).filter(|&h| h != pid);
        if procs.reparent_children(pid, heir) {
            if let Some(heir) = heir {
                self.exit_conds[heir.slot()].notify_all_proclocked(self, procs);
            }
        }
        if let Some(parent) = parent {
            self.exit_conds[parent.slot()].notify_all_proclocked(self, procs);
        }
        debug!("process {} exited with status {}", pid, status);
    }

    /// Wait for the direct child `pid` to exit, reap it and return its exit
    /// status.
    ///
    /// The waiter holds a reference on the child, recorded in its PCB so
    /// that killing the waiter gives it back.
    pub fn wait_pid(&self, pid: Pid) -> Result<i32, ProcessError> {
        let mut procs = self.procs.lock();
        let Some(me) = procs.current(Cpu::cpu_id()) else {
            drop(procs);
            fatal!("wait_pid outside process mode");
        };
        procs.get_ref(pid)?;
        if procs.get(pid).and_then(|p| p.parent) != Some(me) {
            procs.put_ref(pid);
            return Err(ProcessError::NotAChild);
        }
        if let Some(p) = procs.get_mut(me) {
            p.waiting_for = Some(pid);
        }
        while procs.status(pid) != Some(ProcessStatus::Zombie) {
            self.exit_conds[me.slot()].wait_proclocked(self, &mut procs);
        }
        if let Some(p) = procs.get_mut(me) {
            p.waiting_for = None;
        }
        let status = procs.get(pid).map(|p| p.exit_status);
        procs.put_ref(pid);
        let status = status.ok_or(ProcessError::NoSuchProcess)?;
        procs.unregister(pid)?;
        Ok(status)
    }

    /// Reap every zombie child of `parent`. Returns how many were reaped.
    pub fn reap_zombie_children(&self, parent: Pid) -> usize {
        let mut procs = self.procs.lock();
        let zombies: Vec<Pid> = procs
            .children(parent)
            .filter(|&c| procs.status(c) == Some(ProcessStatus::Zombie))
            .collect();
        for &z in &zombies {
            if let Err(e) = procs.unregister(z) {
                error!("cannot reap process {}: {}", z, e);
            }
        }
        zombies.len()
    }

    /// Body of the init process once the system is up: reap orphans forever.
    pub fn reap_forever(&self) -> ! {
        loop {
            let mut procs = self.procs.lock();
            let Some(me) = procs.current(Cpu::cpu_id()) else {
                drop(procs);
                fatal!("reaper outside process mode");
            };
            while !procs.has_zombie_children(me) {
                self.exit_conds[me.slot()].wait_proclocked(self, &mut procs);
            }
            drop(procs);
            let reaped = self.reap_zombie_children(me);
            debug!("init reaped {} zombie(s)", reaped);
        }
    }

    fn idle_loop(&self) -> ! {
        loop {
            Cpu::wait_for_interrupt();
            self.schedule_if_needed();
        }
    }

    /// Change the priority of `pid`.
    ///
    /// Non-kernel processes cannot go above [`SCHED_PRIORITY_MAX_USER`].
    pub fn set_priority(&self, pid: Pid, priority: u8) -> Result<(), ProcessError> {
        {
            let mut procs = self.procs.lock();
            let p = procs.get(pid).ok_or(ProcessError::NoSuchProcess)?;
            if !p.is_kernel() && priority < SCHED_PRIORITY_MAX_USER {
                error!(
                    "invalid priority {} for user process {}, max priority = {}",
                    priority, pid, SCHED_PRIORITY_MAX_USER
                );
                return Err(ProcessError::InvalidPriority);
            }
            if p.status == ProcessStatus::Zombie {
                return Err(ProcessError::InvalidState);
            }
            let cpu = p.cpu;
            if procs.set_priority(pid, priority)? {
                self.resched.request(cpu);
            }
        }
        self.schedule_if_needed();
        Ok(())
    }

    pub fn set_name(&self, pid: Pid, name: &str) -> Result<(), ProcessError> {
        let mut procs = self.procs.lock();
        let p = procs.get_mut(pid).ok_or(ProcessError::NoSuchProcess)?;
        p.set_name(name);
        Ok(())
    }

    pub fn set_cmdline(&self, pid: Pid, cmdline: &str) -> Result<(), ProcessError> {
        let mut procs = self.procs.lock();
        let p = procs.get_mut(pid).ok_or(ProcessError::NoSuchProcess)?;
        p.set_cmdline(cmdline);
        Ok(())
    }

    pub fn process_ref(&self, pid: Pid) -> Result<ProcessRef<'_>, ProcessError> {
        self.procs.lock().get_ref(pid)?;
        Ok(ProcessRef { kernel: self, pid })
    }

    pub fn process_info(&self, pid: Pid) -> Option<ProcessInfo> {
        self.procs.lock().get(pid).map(ProcessInfo::from)
    }

    /// Visit every registered process under the process table lock.
    ///
    /// `f` must not call back into the kernel.
    pub fn for_each_process<F: FnMut(&Process)>(&self, mut f: F) {
        let procs = self.procs.lock();
        for p in procs.iter() {
            f(p);
        }
    }

    pub fn dump_processes(&self) {
        info!("pid  parent  prio  status    name");
        self.for_each_process(|p| {
            let parent = p.parent.map(|pp| pp.0 as i32).unwrap_or(-1);
            info!(
                "{:<4} {:<7} {:<5} {:<9} {}",
                p.pid, parent, p.priority, p.status, p.name
            );
        });
        if self.procs.lock().zombie_count() > 0 {
            warn!("zombie processes waiting to be reaped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SCHED_PRIORITY_INIT;
    use crate::kcore::testing::started_kernel;

    #[test]
    fn start_makes_caller_init_and_spawns_idle() {
        let k = started_kernel(4);
        let init = k.current_pid().unwrap();
        assert_eq!(init, Pid(0));

        let info = k.process_info(init).unwrap();
        assert_eq!(info.status, ProcessStatus::Running);
        assert_eq!(info.priority, SCHED_PRIORITY_INIT);
        assert!(info.flags.contains(ProcessFlags::INIT));

        let idle = k.process_info(Pid(1)).unwrap();
        assert_eq!(idle.status, ProcessStatus::Ready);
        assert_eq!(idle.priority, SCHED_PRIORITY_LOWEST);
        assert!(idle.flags.contains(ProcessFlags::IDLE));
        assert_eq!(idle.parent, Some(init));
    }

    #[test]
    fn wait_pid_rejects_non_children() {
        let k = started_kernel(4);
        assert_eq!(k.wait_pid(Pid(0)), Err(ProcessError::NotAChild));
        assert_eq!(k.wait_pid(Pid(3)), Err(ProcessError::NoSuchProcess));
    }

    #[test]
    fn killed_ready_process_is_reaped_with_killed_status() {
        let k = started_kernel(4);
        let pid = k.spawn_kernel_process("victim", 10, 1024, |_| 7).unwrap();
        k.kill(pid).unwrap();
        assert_eq!(k.kill(pid), Err(ProcessError::InvalidState));
        assert_eq!(k.process_info(pid).unwrap().status, ProcessStatus::Zombie);
        assert_eq!(k.wait_pid(pid), Ok(KILLED_EXIT_STATUS));
        assert!(k.process_info(pid).is_none());
    }

    #[test]
    fn init_cannot_be_killed() {
        let k = started_kernel(4);
        assert_eq!(k.kill(Pid(0)), Err(ProcessError::InvalidState));
    }

    #[test]
    fn idle_cannot_be_killed() {
        let k = started_kernel(4);
        let idle = Pid(1);
        assert!(k.process_info(idle).unwrap().flags.contains(ProcessFlags::IDLE));
        assert_eq!(k.kill(idle), Err(ProcessError::InvalidState));
        assert_eq!(k.process_info(idle).unwrap().status, ProcessStatus::Ready);
    }

    #[test]
    fn user_processes_are_capped_at_max_user_priority() {
        let k = started_kernel(4);
        // Less urgent than init, so it never gets to run here
        let pid = k.spawn_kernel_process("p", 250, 1024, |_| 0).unwrap();
        k.procs.lock().get_mut(pid).unwrap().flags = ProcessFlags::empty();

        assert_eq!(
            k.set_priority(pid, SCHED_PRIORITY_MAX_USER - 1),
            Err(ProcessError::InvalidPriority)
        );
        assert_eq!(k.process_info(pid).unwrap().priority, 250);
        k.set_priority(pid, 252).unwrap();
        assert_eq!(k.process_info(pid).unwrap().priority, 252);
        k.kill(pid).unwrap();
        k.wait_pid(pid).unwrap();
    }

    #[test]
    fn process_ref_defers_slot_release() {
        let k = started_kernel(4);
        let pid = k.spawn_kernel_process("p", 100, 1024, |_| 0).unwrap();
        let held = k.process_ref(pid).unwrap();
        k.kill(pid).unwrap();
        assert_eq!(k.wait_pid(pid), Ok(KILLED_EXIT_STATUS));

        assert_eq!(held.status(), Some(ProcessStatus::NotInit));
        assert!(k.process_ref(pid).is_err());
        drop(held);
        assert!(k.process_info(pid).is_none());
    }

    #[test]
    fn names_and_cmdlines_are_bounded() {
        let k = started_kernel(4);
        let init = k.current_pid().unwrap();
        k.set_name(init, "init-with-a-long-name").unwrap();
        k.set_cmdline(init, "init --verbose").unwrap();
        let mut seen = Vec::new();
        k.for_each_process(|p| seen.push((p.pid, p.name.clone(), p.cmdline.clone())));
        assert_eq!(seen[0].1, "init-with-a-long");
        assert_eq!(seen[0].2, "init --verbose");
        assert_eq!(seen.len(), 2);
        k.dump_processes();
    }
}
