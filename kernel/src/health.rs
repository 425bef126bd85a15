//! Process health monitor
//!
//! Periodic sweep over the process table reporting stack usage and canary
//! state. Problems are logged; acting on them is up to the caller (the
//! scheduler already refuses to resume a process whose canaries are gone).

use alloc::string::String;
use alloc::vec::Vec;

use log::{error, warn};

use crate::kcore::Kernel;
use crate::process::Pid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub pid: Pid,
    pub name: String,
    pub stack_size: usize,
    /// High-water mark, in bytes
    pub stack_used: usize,
    /// Percentage of the stack never touched
    pub stack_available: u8,
    pub canaries_intact: bool,
}

impl HealthReport {
    pub fn stack_low(&self, threshold: u8) -> bool {
        self.stack_available < threshold
    }
}

impl Kernel {
    /// Check every process that owns a stack. Processes running on a stack
    /// the kernel did not allocate (init) are skipped.
    pub fn check_processes(&self) -> Vec<HealthReport> {
        let reports: Vec<HealthReport> = {
            let procs = self.procs.lock();
            procs
                .iter()
                .filter_map(|p| {
                    let stack = p.stack()?;
                    Some(HealthReport {
                        pid: p.pid,
                        name: p.name.clone(),
                        stack_size: stack.size(),
                        stack_used: stack.high_water_mark(),
                        stack_available: stack.available_percent(),
                        canaries_intact: stack.canaries_intact(),
                    })
                })
                .collect()
        };

        let threshold = self.config.stack_warning_threshold;
        for r in &reports {
            if !r.canaries_intact {
                error!("process {} '{}': stack canary corrupted", r.pid, r.name);
            } else if r.stack_low(threshold) {
                warn!(
                    "process {} '{}': only {}% of its {} byte stack left (used {})",
                    r.pid, r.name, r.stack_available, r.stack_size, r.stack_used
                );
            }
        }
        reports
    }
}
