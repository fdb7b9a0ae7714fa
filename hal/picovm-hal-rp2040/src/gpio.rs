//! GPIO bank 0 through SIO
//!
//! The RP2040 has a single user bank of 30 pins. It is exposed as port 0;
//! every other port number is ignored.

use embassy_rp::pac;

use picovm_hal::gpio::GpioController;

/// Pins in bank 0
pub const BANK0_PINS: u8 = 30;

/// IO_BANK0 function select for SIO
const FUNCSEL_SIO: u8 = 5;

/// GPIO bank 0
pub struct Bank0 {
    _private: (),
}

impl Bank0 {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn mask(port: u8, bit: u8) -> Option<u32> {
        (port == 0 && bit < BANK0_PINS).then(|| 1 << bit)
    }

    /// Hand the pin to SIO with its input buffer enabled
    fn claim(bit: u8) {
        let pin = bit as usize;
        pac::PADS_BANK0.gpio(pin).modify(|w| {
            w.set_ie(true);
            w.set_od(false);
        });
        pac::IO_BANK0
            .gpio(pin)
            .ctrl()
            .write(|w| w.set_funcsel(FUNCSEL_SIO));
    }
}

impl Default for Bank0 {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioController for Bank0 {
    fn set_input(&mut self, port: u8, bit: u8) {
        if let Some(mask) = Self::mask(port, bit) {
            pac::SIO.gpio_oe(0).value_clr().write_value(mask);
            Self::claim(bit);
        }
    }

    fn set_output(&mut self, port: u8, bit: u8) {
        if let Some(mask) = Self::mask(port, bit) {
            pac::SIO.gpio_oe(0).value_set().write_value(mask);
            Self::claim(bit);
        }
    }

    fn set_bit(&mut self, port: u8, bit: u8) {
        if let Some(mask) = Self::mask(port, bit) {
            pac::SIO.gpio_out(0).value_set().write_value(mask);
        }
    }

    fn clear_bit(&mut self, port: u8, bit: u8) {
        if let Some(mask) = Self::mask(port, bit) {
            pac::SIO.gpio_out(0).value_clr().write_value(mask);
        }
    }
}
