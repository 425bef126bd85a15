//! Hardware abstraction consumed by the scheduler core
//!
//! # Module Organization
//!
//! - [`hal`]: Platform-independent trait definitions (interrupt controller, timers)
//! - [`ticker`]: Periodic tick fan-out driving OS time and preemption
//! - [`soft`]: Software interrupt controller and timer used by hosted builds
//! - [`console`]: Console sink and the `kprint!` family of macros
//!
//! Board crates implement the `hal` traits for real hardware and register
//! them with the kernel at boot.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod console;
pub mod hal;
pub mod soft;
pub mod ticker;

// Re-export commonly used types
pub use hal::interrupt::{InterruptController, IrqError, IrqNumber};
pub use hal::timer::{PeriodicTimer, Timer};
pub use ticker::{Ticker, TickerCallback, TickerError};
