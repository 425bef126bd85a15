//! Ticker component
//!
//! A ticker turns a periodic timer interrupt into a fan-out of callbacks.
//! The kernel subscribes to it for OS time keeping and the round-robin
//! policy subscribes to it to request time slicing.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use common::sync::{IrqControl, IrqSpinLock};

use crate::hal::timer::PeriodicTimer;

/// Maximum number of callbacks one ticker can fan out to.
pub const TICKER_MAX_CALLBACKS: usize = 8;

/// Callback invoked on every tick with the ticker and the opaque data
/// given at registration.
pub type TickerCallback = fn(&dyn Ticker, usize) -> Result<(), TickerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerError {
    /// No free callback slot.
    Full,
    /// The callback/data pair is not registered.
    NotFound,
    /// The underlying timer refused the request.
    Timer,
    /// A callback reported a failure.
    Callback,
}

impl fmt::Display for TickerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            TickerError::Full => "no free ticker callback slot",
            TickerError::NotFound => "ticker callback not registered",
            TickerError::Timer => "ticker timer error",
            TickerError::Callback => "ticker callback failed",
        };
        f.write_str(msg)
    }
}

pub trait Ticker: Send + Sync {
    fn ticks_per_sec(&self) -> u32;

    /// Number of ticks delivered so far.
    fn ticks(&self) -> u64;

    fn add_callback(&self, cb: TickerCallback, data: usize) -> Result<(), TickerError>;

    fn remove_callback(&self, cb: TickerCallback, data: usize) -> Result<(), TickerError>;
}

#[derive(Clone, Copy)]
struct Subscriber {
    cb: TickerCallback,
    data: usize,
}

/// Ticker whose ticks are delivered by calling [`SoftTicker::tick`],
/// normally from the timer interrupt handler.
pub struct SoftTicker<I: IrqControl> {
    ticks_per_sec: u32,
    ticks: AtomicU64,
    subscribers: IrqSpinLock<[Option<Subscriber>; TICKER_MAX_CALLBACKS], I>,
}

impl<I: IrqControl> SoftTicker<I> {
    pub const fn new(ticks_per_sec: u32) -> Self {
        Self {
            ticks_per_sec,
            ticks: AtomicU64::new(0),
            subscribers: IrqSpinLock::new([None; TICKER_MAX_CALLBACKS]),
        }
    }

    /// Deliver one tick to every subscriber.
    ///
    /// Subscribers are copied out first so callbacks may add or remove
    /// subscriptions without deadlocking.
    pub fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        let subscribers = *self.subscribers.lock();
        for sub in subscribers.iter().flatten() {
            if let Err(e) = (sub.cb)(self, sub.data) {
                log::warn!("ticker callback failed: {}", e);
            }
        }
    }
}

impl<I: IrqControl> Ticker for SoftTicker<I> {
    fn ticks_per_sec(&self) -> u32 {
        self.ticks_per_sec
    }

    fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    fn add_callback(&self, cb: TickerCallback, data: usize) -> Result<(), TickerError> {
        let mut subs = self.subscribers.lock();
        let slot = subs
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or(TickerError::Full)?;
        *slot = Some(Subscriber { cb, data });
        Ok(())
    }

    fn remove_callback(&self, cb: TickerCallback, data: usize) -> Result<(), TickerError> {
        let mut subs = self.subscribers.lock();
        let slot = subs
            .iter_mut()
            .find(|s| matches!(s, Some(sub) if core::ptr::fn_addr_eq(sub.cb, cb) && sub.data == data))
            .ok_or(TickerError::NotFound)?;
        *slot = None;
        Ok(())
    }
}

/// Ticker driven by a periodic hardware timer.
pub struct TimerTicker<T: PeriodicTimer + 'static, I: IrqControl> {
    timer: &'static T,
    ticker: SoftTicker<I>,
}

impl<T: PeriodicTimer + 'static, I: IrqControl> TimerTicker<T, I> {
    pub const fn new(timer: &'static T, ticks_per_sec: u32) -> Self {
        Self {
            timer,
            ticker: SoftTicker::new(ticks_per_sec),
        }
    }

    pub fn timer(&self) -> &'static T {
        self.timer
    }

    /// Program the timer to fire `ticks_per_sec` times per second.
    pub fn start(&self) -> Result<(), TickerError> {
        let tps = self.ticker.ticks_per_sec.max(1);
        self.timer.start_periodic(1_000_000 / tps).map_err(|e| {
            log::error!("ticker: could not start timer: {:?}", e);
            TickerError::Timer
        })
    }

    /// Timer interrupt: acknowledge the expiry and deliver the tick.
    pub fn handle_interrupt(&self) -> Result<(), TickerError> {
        if !self.timer.is_pending() {
            return Err(TickerError::Timer);
        }
        self.timer.clear_interrupt().map_err(|_| TickerError::Timer)?;
        self.ticker.tick();
        Ok(())
    }
}

impl<T: PeriodicTimer + 'static, I: IrqControl> Ticker for TimerTicker<T, I> {
    fn ticks_per_sec(&self) -> u32 {
        self.ticker.ticks_per_sec()
    }

    fn ticks(&self) -> u64 {
        self.ticker.ticks()
    }

    fn add_callback(&self, cb: TickerCallback, data: usize) -> Result<(), TickerError> {
        self.ticker.add_callback(cb, data)
    }

    fn remove_callback(&self, cb: TickerCallback, data: usize) -> Result<(), TickerError> {
        self.ticker.remove_callback(cb, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::timer::Timer;
    use crate::soft::{SoftIntc, SoftTimer};
    use core::sync::atomic::AtomicUsize;
    use std::boxed::Box;

    struct NoIrq;

    impl IrqControl for NoIrq {
        type State = ();
        fn disable() {}
        fn restore(_: ()) {}
        fn enable() {}
        fn enabled() -> bool {
            true
        }
    }

    fn count(_: &dyn Ticker, data: usize) -> Result<(), TickerError> {
        let counter = unsafe { &*(data as *const AtomicUsize) };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn failing(_: &dyn Ticker, _: usize) -> Result<(), TickerError> {
        Err(TickerError::Callback)
    }

    #[test]
    fn tick_reaches_every_subscriber() {
        let ticker: SoftTicker<NoIrq> = SoftTicker::new(100);
        let a = AtomicUsize::new(0);
        let b = AtomicUsize::new(0);
        ticker.add_callback(count, &a as *const _ as usize).unwrap();
        ticker.add_callback(failing, 0).unwrap();
        ticker.add_callback(count, &b as *const _ as usize).unwrap();

        ticker.tick();
        ticker.tick();

        assert_eq!(a.load(Ordering::Relaxed), 2);
        assert_eq!(b.load(Ordering::Relaxed), 2);
        assert_eq!(ticker.ticks(), 2);
    }

    #[test]
    fn remove_matches_callback_and_data() {
        let ticker: SoftTicker<NoIrq> = SoftTicker::new(100);
        let a = AtomicUsize::new(0);
        let data = &a as *const _ as usize;
        ticker.add_callback(count, data).unwrap();

        assert_eq!(ticker.remove_callback(count, data + 1), Err(TickerError::NotFound));
        assert_eq!(ticker.remove_callback(failing, data), Err(TickerError::NotFound));
        ticker.remove_callback(count, data).unwrap();

        ticker.tick();
        assert_eq!(a.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn subscriber_table_is_bounded() {
        let ticker: SoftTicker<NoIrq> = SoftTicker::new(100);
        for i in 0..TICKER_MAX_CALLBACKS {
            ticker.add_callback(failing, i).unwrap();
        }
        assert_eq!(ticker.add_callback(failing, 99), Err(TickerError::Full));
    }

    #[test]
    fn timer_ticker_programs_period_and_acks_expiry() {
        let intc: &'static SoftIntc = Box::leak(Box::new(SoftIntc::new()));
        let timer: &'static SoftTimer = Box::leak(Box::new(SoftTimer::new(intc, 3)));
        let ticker: TimerTicker<SoftTimer, NoIrq> = TimerTicker::new(timer, 250);
        let hits = AtomicUsize::new(0);
        ticker.add_callback(count, &hits as *const _ as usize).unwrap();

        assert_eq!(ticker.handle_interrupt(), Err(TickerError::Timer));

        ticker.start().unwrap();
        assert_eq!(timer.interval_us(), 4_000);

        timer.expire();
        assert!(timer.is_pending());
        ticker.handle_interrupt().unwrap();
        assert!(!timer.is_pending());
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }
}
