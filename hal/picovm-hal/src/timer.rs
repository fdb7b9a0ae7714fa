//! Periodic tick timer abstraction
//!
//! The tick source increments a shared counter from the timer's update
//! interrupt. Reload arithmetic lives in the chip HAL.

/// Hardware timer that raises a periodic interrupt
pub trait TickTimer {
    /// Configure the timer for `tick_hz` update interrupts and start it
    ///
    /// # Arguments
    /// * `clock_hz` - Timer input clock
    /// * `tick_hz` - Desired interrupt rate
    fn start(&mut self, clock_hz: u32, tick_hz: u32);

    /// Clear the pending update flag
    ///
    /// Called from the interrupt handler on every tick.
    fn acknowledge(&mut self);
}

/// Split a timer clock into (prescaler, reload) for a 16-bit timer
///
/// The prescaler targets a 1 MHz count rate when the input clock allows it,
/// which keeps the reload value exact for common tick rates.
pub const fn prescale_for(clock_hz: u32, tick_hz: u32) -> (u16, u16) {
    if tick_hz == 0 {
        return (0, 0);
    }
    let prescaler = if clock_hz >= 1_000_000 {
        clock_hz / 1_000_000
    } else {
        1
    };
    let count_hz = clock_hz / prescaler;
    let mut reload = count_hz / tick_hz;
    if reload > u16::MAX as u32 + 1 {
        reload = u16::MAX as u32 + 1;
    }
    if reload == 0 {
        reload = 1;
    }
    ((prescaler - 1) as u16, (reload - 1) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_1khz_from_8mhz() {
        // 8 MHz / 8 = 1 MHz count, 1000 counts per tick
        assert_eq!(prescale_for(8_000_000, 1000), (7, 999));
    }

    #[test]
    fn test_1khz_from_72mhz() {
        assert_eq!(prescale_for(72_000_000, 1000), (71, 999));
    }

    #[test]
    fn test_slow_clock() {
        let (psc, arr) = prescale_for(32_768, 1000);
        assert_eq!(psc, 0);
        assert_eq!(arr, 31);
    }

    #[test]
    fn test_reload_saturates() {
        let (_, arr) = prescale_for(8_000_000, 1);
        assert_eq!(arr, u16::MAX);
    }
}
