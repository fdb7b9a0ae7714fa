//! GPIO ports by index
//!
//! Port 0 is GPIOA. Pins are reconfigured on every request; nothing tracks
//! ownership, the bytecode program is trusted with the whole port.

use embassy_stm32::pac;
use embassy_stm32::pac::gpio::vals::{CnfIn, CnfOut, Mode};
use embassy_stm32::pac::gpio::Gpio;

use picovm_hal::gpio::GpioController;

/// Number of addressable ports (A-D)
pub const PORT_COUNT: u8 = 4;

/// GPIO ports A-D
///
/// Port clocks are enabled by `embassy_stm32::init`.
pub struct Ports {
    _private: (),
}

impl Ports {
    /// Take the ports
    ///
    /// Pins already routed to another peripheral (USART1 on PA9/PA10) can
    /// still be reconfigured by a program that asks for them.
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn port(port: u8, bit: u8) -> Option<(Gpio, usize)> {
        if bit >= 16 {
            return None;
        }
        let regs = match port {
            0 => pac::GPIOA,
            1 => pac::GPIOB,
            2 => pac::GPIOC,
            3 => pac::GPIOD,
            _ => return None,
        };
        Some((regs, bit as usize))
    }
}

impl Default for Ports {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioController for Ports {
    fn set_input(&mut self, port: u8, bit: u8) {
        if let Some((r, n)) = Self::port(port, bit) {
            r.cr(n / 8).modify(|w| {
                w.set_mode(n % 8, Mode::INPUT);
                w.set_cnf_in(n % 8, CnfIn::FLOATING);
            });
        }
    }

    fn set_output(&mut self, port: u8, bit: u8) {
        if let Some((r, n)) = Self::port(port, bit) {
            r.cr(n / 8).modify(|w| {
                w.set_mode(n % 8, Mode::OUTPUT2MHZ);
                w.set_cnf_out(n % 8, CnfOut::PUSHPULL);
            });
        }
    }

    fn set_bit(&mut self, port: u8, bit: u8) {
        if let Some((r, n)) = Self::port(port, bit) {
            r.bsrr().write(|w| w.set_bs(n, true));
        }
    }

    fn clear_bit(&mut self, port: u8, bit: u8) {
        if let Some((r, n)) = Self::port(port, bit) {
            r.bsrr().write(|w| w.set_br(n, true));
        }
    }
}
