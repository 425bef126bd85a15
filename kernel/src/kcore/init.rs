use alloc::boxed::Box;

use log::info;
use spin::Once;

use super::Kernel;
use crate::config::KernelConfig;
use crate::sched::SchedPolicy;

// ============================================================================
// Kernel Singleton
// ============================================================================

static KERNEL: Once<Kernel> = Once::new();

/// Build the global kernel. Later calls return the kernel built first.
pub fn kernel_init(config: KernelConfig, policy: Box<dyn SchedPolicy>) -> &'static Kernel {
    KERNEL.call_once(|| {
        info!(
            "kernel: {} process slots, policy {}",
            config.max_procs,
            policy.name()
        );
        Kernel::new(config, policy)
    })
}

/// The global kernel, for code entered from exception vectors.
pub fn kernel() -> &'static Kernel {
    match KERNEL.get() {
        Some(k) => k,
        None => fatal!("kernel used before kernel_init"),
    }
}

// ============================================================================
// Boot
// ============================================================================

/// Bring up process mode on the boot CPU and turn the boot context into
/// the init process, which reaps orphans from then on.
///
/// Interrupt controller, tickers and the first processes are set up by the
/// board before calling this, or by processes spawned from `start`.
pub fn boot(config: KernelConfig, policy: Box<dyn SchedPolicy>, init_priority: u8) -> ! {
    let kernel = kernel_init(config, policy);
    if let Err(e) = kernel.start(init_priority) {
        fatal!("cannot start scheduler: {}", e);
    }
    kernel.reap_forever()
}
