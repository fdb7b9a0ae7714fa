//! Emulated tick interrupt
//!
//! A background thread stands in for the periodic timer interrupt and is
//! the only caller of [`TickCounter::on_tick`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use picovm_core::TickCounter;

/// Running tick thread; stopped and joined on drop
pub struct TickThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TickThread {
    /// Start ticking `counter` at `tick_hz`
    pub fn spawn(counter: &'static TickCounter, tick_hz: u32) -> Result<Self> {
        ensure!(tick_hz > 0, "tick rate must be greater than 0");
        let period = Duration::from_secs(1) / tick_hz;

        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("tick".into())
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    thread::sleep(period);
                    counter.on_tick();
                }
            })
            .context("failed to start tick thread")?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for TickThread {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_counter_advances() {
        static TICKS: TickCounter = TickCounter::new();
        let _ticker = TickThread::spawn(&TICKS, 1000).unwrap();

        let start = Instant::now();
        while TICKS.get() < 5 {
            assert!(start.elapsed() < Duration::from_secs(5), "ticker stalled");
            thread::yield_now();
        }
    }

    #[test]
    fn test_wait_takes_nominal_time() {
        static TICKS: TickCounter = TickCounter::new();
        let _ticker = TickThread::spawn(&TICKS, 500).unwrap();

        let start = Instant::now();
        TICKS.source().wait(5);
        // Five 2 ms periods, less up to one period lost to the reset
        assert!(start.elapsed() >= Duration::from_millis(8));
    }

    #[test]
    fn test_drop_stops_ticking() {
        static TICKS: TickCounter = TickCounter::new();
        drop(TickThread::spawn(&TICKS, 1000).unwrap());

        let stopped = TICKS.get();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(TICKS.get(), stopped);
    }

    #[test]
    fn test_zero_rate_is_rejected() {
        static TICKS: TickCounter = TickCounter::new();
        assert!(TickThread::spawn(&TICKS, 0).is_err());
    }
}
