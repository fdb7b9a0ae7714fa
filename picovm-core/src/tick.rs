//! Tick counter and timing natives
//!
//! A periodic timer interrupt calls [`TickCounter::on_tick`]; natives read
//! and reset the counter through a [`TickSource`]. The counter is one
//! machine word, so reads never tear.

use portable_atomic::{AtomicU32, Ordering};

/// Free-running tick counter shared with the timer interrupt
pub struct TickCounter {
    ticks: AtomicU32,
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
        }
    }

    /// Advance the counter by one
    ///
    /// A single read-modify-write, so a [`reset`](Self::reset) from another
    /// thread or context is never overwritten by a stale count.
    pub fn on_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Release);
    }

    /// Current tick count
    pub fn get(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Set the counter back to zero
    pub fn reset(&self) {
        self.ticks.store(0, Ordering::Release);
    }

    /// Handle for the timing natives
    pub fn source(&self) -> TickSource<'_> {
        TickSource { counter: self }
    }
}

/// Main-context view of a [`TickCounter`]
#[derive(Clone, Copy)]
pub struct TickSource<'a> {
    counter: &'a TickCounter,
}

impl TickSource<'_> {
    /// Current tick count
    pub fn get(&self) -> u32 {
        self.counter.get()
    }

    /// Reset the counter
    pub fn reset(&self) {
        self.counter.reset();
    }

    /// Reset the counter, then spin until it reaches `ticks`
    ///
    /// There is no timeout. If the tick interrupt is not running this never
    /// returns.
    pub fn wait(&self, ticks: u32) {
        self.counter.reset();
        while self.counter.get() < ticks {
            core::hint::spin_loop();
        }
    }

    /// Timer prescaler hook, accepted and ignored
    pub fn set_prescaler(&self, _prescaler: u32) {}

    /// Timer speed hook, accepted and ignored
    pub fn set_speed(&self, _speed: u32) {}
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use portable_atomic::AtomicBool;
    use std::time::{Duration, Instant};

    #[test]
    fn test_counter_basics() {
        let counter = TickCounter::new();
        assert_eq!(counter.get(), 0);

        counter.on_tick();
        counter.on_tick();
        assert_eq!(counter.source().get(), 2);

        counter.source().reset();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_counter_wraps() {
        let counter = TickCounter::new();
        counter.ticks.store(u32::MAX, Ordering::Relaxed);
        counter.on_tick();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_wait_zero_returns_immediately() {
        let counter = TickCounter::new();
        counter.on_tick();
        counter.source().wait(0);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_wait_tracks_tick_period() {
        static COUNTER: TickCounter = TickCounter::new();
        static RUNNING: AtomicBool = AtomicBool::new(true);
        const PERIOD: Duration = Duration::from_millis(2);

        let ticker = std::thread::spawn(|| {
            while RUNNING.load(Ordering::Relaxed) {
                std::thread::sleep(PERIOD);
                COUNTER.on_tick();
            }
        });

        let start = Instant::now();
        COUNTER.source().wait(5);
        let elapsed = start.elapsed();

        RUNNING.store(false, Ordering::Relaxed);
        ticker.join().unwrap();

        // The first tick after the reset can come early by up to a period
        assert!(elapsed >= PERIOD * 3, "waited only {elapsed:?}");
        assert!(COUNTER.get() >= 5);
    }

    #[test]
    fn test_reset_is_not_lost_under_ticking() {
        static COUNTER: TickCounter = TickCounter::new();
        static RUNNING: AtomicBool = AtomicBool::new(true);
        const ROUNDS: u32 = 2000;
        // Far below what the ticker could add while main runs a round
        const BOUND: u32 = 1 << 24;

        let ticker = std::thread::spawn(|| {
            while RUNNING.load(Ordering::Relaxed) {
                COUNTER.on_tick();
            }
        });

        // Let the count run well past the bound before resetting
        while COUNTER.get() < BOUND * 2 {
            std::thread::yield_now();
        }

        let mut lost = 0;
        for _ in 0..ROUNDS {
            COUNTER.reset();
            if COUNTER.get() >= BOUND {
                lost += 1;
            }
        }

        RUNNING.store(false, Ordering::Relaxed);
        ticker.join().unwrap();

        assert_eq!(lost, 0, "{lost} resets overwritten by a stale count");
    }

    #[test]
    fn test_hooks_do_not_touch_counter() {
        let counter = TickCounter::new();
        counter.on_tick();
        let source = counter.source();
        source.set_prescaler(8);
        source.set_speed(100);
        assert_eq!(source.get(), 1);
    }
}
