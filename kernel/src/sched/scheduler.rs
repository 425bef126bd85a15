//! Scheduler state machine
//!
//! The only place where processes change CPU. Everything else (wakeups,
//! ticks, priority changes) just moves processes between lists and raises
//! the per-CPU reschedule flag.

use common::sync::IrqControl;
use log::error;

use super::policy::ReadyQueue;
use crate::arch::{Arch, Cpu, Irq};
use crate::kcore::Kernel;
use crate::process::{KILLED_EXIT_STATUS, Pid, ProcessStatus, ProcessTable};

impl Kernel {
    /// PID of the process running on the calling CPU.
    pub fn current_pid(&self) -> Option<Pid> {
        self.procs.lock().current(Cpu::cpu_id())
    }

    /// Pick the next process for this CPU and switch to it.
    ///
    /// A RUNNING caller keeps the CPU unless the policy picks a process at
    /// least as urgent. A caller that already left RUNNING (blocked, exited,
    /// yielded) is switched away from whenever something else is ready.
    ///
    /// Interrupts are masked here for the whole decision and switch, and the
    /// caller's mask state is restored once it runs again.
    pub fn schedule(&self) {
        let cpu = Cpu::cpu_id();
        let irq = Irq::disable();
        self.resched.clear(cpu);

        let mut procs = self.procs.lock();
        let Some(cur) = procs.current(cpu) else {
            drop(procs);
            fatal!("schedule() called before the scheduler started");
        };

        let pick = loop {
            let pick = self.policy.pick_ready(ReadyQueue::new(&procs, cpu), cur);
            match pick {
                Some(pid) if pid != cur && !self.context_valid(&procs, pid) => {
                    error!("process {}: stack or context corrupted, killing it", pid);
                    self.terminate_locked(&mut procs, pid, KILLED_EXIT_STATUS);
                }
                _ => break pick,
            }
        };

        let cur_running = procs.status(cur) == Some(ProcessStatus::Running);
        let next = match pick {
            Some(pid) if cur_running && priority(&procs, pid) > priority(&procs, cur) => cur,
            Some(pid) => pid,
            None if cur_running => cur,
            None => {
                drop(procs);
                fatal!("no runnable process on cpu {}", cpu);
            }
        };

        if next == cur {
            procs.set_status(cur, ProcessStatus::Running);
            drop(procs);
            Irq::restore(irq);
            return;
        }

        if cur_running {
            procs.set_status(cur, ProcessStatus::Ready);
        }
        procs.set_status(next, ProcessStatus::Running);
        procs.ctx_switches += 1;
        drop(procs);

        unsafe {
            Cpu::switch_context(&self.contexts[cur.slot()], &self.contexts[next.slot()]);
        }
        // Back on `cur`, possibly much later
        Irq::restore(irq);
    }

    /// Serve a pending reschedule request for this CPU, if any.
    pub fn schedule_if_needed(&self) {
        if self.resched.take(Cpu::cpu_id()) && self.is_started() {
            self.schedule();
        }
    }

    /// Give up the CPU to the next ready process of the same or higher
    /// priority.
    pub fn yield_now(&self) {
        {
            let mut procs = self.procs.lock();
            if let Some(cur) = procs.current(Cpu::cpu_id()) {
                if procs.status(cur) == Some(ProcessStatus::Running) {
                    procs.set_status(cur, ProcessStatus::Ready);
                }
            }
        }
        self.schedule();
    }

    fn context_valid(&self, procs: &ProcessTable, pid: Pid) -> bool {
        let stack = procs.get(pid).and_then(|p| p.stack());
        stack.is_none_or(|s| s.canaries_intact())
            && Cpu::validate_context(&self.contexts[pid.slot()], stack)
    }
}

fn priority(procs: &ProcessTable, pid: Pid) -> u8 {
    procs.get(pid).map_or(u8::MAX, |p| p.priority)
}
