//! TIM1 tick source
//!
//! Runs TIM1 as a plain up-counter and raises `TIM1_UP` on every reload.

use embassy_stm32::pac;
use embassy_stm32::peripherals::TIM1;
use embassy_stm32::{rcc, Peri};

use picovm_hal::timer::{prescale_for, TickTimer};

/// Handle to TIM1
pub struct Tim1 {
    _private: (),
}

impl Tim1 {
    /// Claim TIM1 and enable its clock
    pub fn new(_tim: Peri<'static, TIM1>) -> Self {
        rcc::enable_and_reset::<TIM1>();
        Self { _private: () }
    }
}

impl TickTimer for Tim1 {
    fn start(&mut self, clock_hz: u32, tick_hz: u32) {
        let r = pac::TIM1;
        let (psc, arr) = prescale_for(clock_hz, tick_hz);

        r.cr1().modify(|w| w.set_cen(false));
        r.psc().write_value(psc);
        r.arr().write(|w| w.set_arr(arr));

        // Latch PSC/ARR, then drop the update flag UG just raised
        r.egr().write(|w| w.set_ug(true));
        r.sr().write(|w| w.set_uif(false));

        r.dier().modify(|w| w.set_uie(true));
        r.cr1().modify(|w| w.set_cen(true));
    }

    fn acknowledge(&mut self) {
        pac::TIM1.sr().write(|w| w.set_uif(false));
    }
}
