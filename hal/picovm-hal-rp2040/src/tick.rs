//! SysTick tick source
//!
//! embassy-rp runs without a time driver here, so SysTick is free. The
//! counter reloads from the core clock and `SysTick` fires on every wrap.

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;

use picovm_hal::timer::TickTimer;

/// Largest SysTick reload value (24-bit counter)
const MAX_RELOAD: u32 = 0x00FF_FFFF;

/// SysTick owned as a tick timer
pub struct SysTickTimer {
    syst: SYST,
}

impl SysTickTimer {
    pub fn new(syst: SYST) -> Self {
        Self { syst }
    }
}

impl TickTimer for SysTickTimer {
    fn start(&mut self, clock_hz: u32, tick_hz: u32) {
        let reload = (clock_hz / tick_hz.max(1)).clamp(2, MAX_RELOAD + 1) - 1;

        self.syst.disable_counter();
        self.syst.set_clock_source(SystClkSource::Core);
        self.syst.set_reload(reload);
        self.syst.clear_current();
        self.syst.enable_interrupt();
        self.syst.enable_counter();
    }

    fn acknowledge(&mut self) {
        // Reading CSR clears COUNTFLAG; the exception itself needs no ack
        let _ = self.syst.has_wrapped();
    }
}
