//! Hardware Abstraction Layer (HAL) - Platform-Independent Traits
//!
//! These traits are implemented by board drivers (or by the software
//! devices in [`crate::soft`]) and consumed by the kernel. Drivers are
//! shared between process and IRQ context, so every method takes `&self`
//! and implementations handle their own register-level exclusion.
//!
//! # Available Interfaces
//!
//! - [`interrupt`]: Interrupt controller management
//! - [`timer`]: Hardware timers

pub mod interrupt;
pub mod timer;
