//! Shared low-level building blocks for the kernel and its drivers.
//!
//! - [`sync`]: interrupt-masking trait and the IRQ-safe spinlock
//! - [`arch`]: per-architecture implementations of the interrupt mask

#![no_std]

#[cfg(test)]
extern crate std;

pub mod arch;
pub mod sync;
