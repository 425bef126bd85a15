//! Software devices
//!
//! An interrupt controller and a timer with no hardware behind them. The
//! hosted kernel port and the test suites use them to raise interrupts on
//! demand.

mod intc;
mod timer;

pub use intc::SoftIntc;
pub use timer::SoftTimer;
