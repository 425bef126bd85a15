//! Process and scheduler core of a small ARM real-time kernel.
//!
//! # Module Organization
//!
//! - [`arch`]: context switching and interrupt masking per target
//! - [`process`]: process control blocks, the process table and lifecycle
//! - [`sched`]: scheduler state machine, policies and sleeping
//! - [`sync`]: condition variable, semaphore and recursive mutex
//! - [`irq`]: interrupt handler table and dispatch
//! - [`health`]: stack usage and canary monitoring
//! - [`kcore`]: the [`Kernel`] context and the boot-time singleton
//!
//! On `arm-none` targets the crate is `no_std`. Everywhere else it builds
//! against the hosted port, where every process is an OS thread and only
//! one of them runs at a time.

#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_std)]

extern crate alloc;

#[macro_use]
mod macros;

pub mod arch;
pub mod config;
pub mod error;
pub mod health;
pub mod irq;
pub mod kcore;
pub mod logger;
pub mod process;
pub mod sched;
pub mod sync;

pub use error::{PolicyError, ProcessError, SyncError};
pub use kcore::Kernel;
pub use process::{Pid, ProcessStatus};
