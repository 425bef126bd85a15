//! Kernel configuration
//!
//! Compile-time limits and defaults. [`KernelConfig`] carries the values a
//! board may override when it builds the kernel.

/// Number of CPU cores the scheduler manages.
pub const MAX_CPUS: usize = 1;

/// Default capacity of the process table.
pub const PROCESS_MAX_CONCURRENT_PROCS: usize = 16;

/// Process names longer than this are truncated.
pub const PROCESS_MAX_NAME_LEN: usize = 16;

/// Command lines longer than this are truncated.
pub const PROCESS_MAX_CMD_LEN: usize = 64;

// Lower number means higher priority
pub const SCHED_PRIORITY_HIGHEST: u8 = 0;
pub const SCHED_PRIORITY_MAX_KERNEL: u8 = SCHED_PRIORITY_HIGHEST;
/// Highest priority a non-kernel process may request.
pub const SCHED_PRIORITY_MAX_USER: u8 = 50;
pub const SCHED_PRIORITY_LOWEST: u8 = u8::MAX;
/// Priority of the init process.
pub const SCHED_PRIORITY_INIT: u8 = SCHED_PRIORITY_LOWEST - 10;

/// Stack size for kernel processes spawned without an explicit size.
pub const PROCESS_DEFAULT_STACK_SIZE: usize = 8192;

pub const PROCESS_IDLE_STACK_SIZE: usize = 1024;

/// Smallest stack a process may be given.
pub const PROCESS_MIN_STACK_SIZE: usize = 256;

/// The health monitor warns when a process has less than this percentage of
/// its stack left.
pub const PROCESS_HEALTH_AVAIL_STACK_WARNING_THRESHOLD: u8 = 20;

/// OS tick rate assumed until an OS ticker is attached.
pub const OS_TICK_HZ: u32 = 100;

/// Runtime configuration handed to [`Kernel::new`](crate::Kernel::new).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Process table capacity, including init and idle.
    pub max_procs: usize,
    pub idle_stack_size: usize,
    /// Stack-available percentage under which the health monitor warns.
    pub stack_warning_threshold: u8,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_procs: PROCESS_MAX_CONCURRENT_PROCS,
            idle_stack_size: PROCESS_IDLE_STACK_SIZE,
            stack_warning_threshold: PROCESS_HEALTH_AVAIL_STACK_WARNING_THRESHOLD,
        }
    }
}

impl KernelConfig {
    pub fn with_max_procs(mut self, max_procs: usize) -> Self {
        self.max_procs = max_procs;
        self
    }
}
