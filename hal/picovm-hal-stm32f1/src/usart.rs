//! USART1 register driver
//!
//! Implements [`SerialController`] for USART1 on PA9 (TX) / PA10 (RX).
//! Data and interrupt enables are touched directly so the serial transport
//! can run its ring buffers from the USART1 vector.

use embassy_stm32::pac;
use embassy_stm32::pac::gpio::vals::{CnfIn, CnfOut, Mode};
use embassy_stm32::pac::usart::{regs, vals};
use embassy_stm32::peripherals::{PA10, PA9, USART1};
use embassy_stm32::{rcc, Peri};

use picovm_hal::serial::{
    oversample16_divisor, DataBits, Parity, SerialController, StopBits, UartConfig,
};

const TX_PIN: usize = 9;
const RX_PIN: usize = 10;

/// Handle to USART1
///
/// Zero-sized; clones share the peripheral. The main context only writes
/// the TX interrupt enable, the interrupt handler only the data register,
/// so the two never race on a read-modify-write of the same bits.
#[derive(Clone)]
pub struct Usart1 {
    _private: (),
}

impl Usart1 {
    /// Claim USART1 and its pins
    ///
    /// Clocks the peripheral and routes PA9/PA10 to it. The bit rate is
    /// applied later by [`SerialController::configure`].
    pub fn new(
        _usart: Peri<'static, USART1>,
        _tx: Peri<'static, PA9>,
        _rx: Peri<'static, PA10>,
    ) -> Self {
        rcc::enable_and_reset::<USART1>();

        let gpioa = pac::GPIOA;
        gpioa.cr(TX_PIN / 8).modify(|w| {
            w.set_mode(TX_PIN % 8, Mode::OUTPUT50MHZ);
            w.set_cnf_out(TX_PIN % 8, CnfOut::ALTPUSHPULL);
        });
        gpioa.cr(RX_PIN / 8).modify(|w| {
            w.set_mode(RX_PIN % 8, Mode::INPUT);
            w.set_cnf_in(RX_PIN % 8, CnfIn::FLOATING);
        });

        Self { _private: () }
    }
}

impl SerialController for Usart1 {
    fn configure(&mut self, config: &UartConfig, clock_hz: u32) {
        let r = pac::USART1;
        r.cr1().modify(|w| w.set_ue(false));

        r.brr()
            .write_value(regs::Brr(oversample16_divisor(clock_hz, config.baudrate)));

        r.cr2().write(|w| {
            w.set_stop(match config.stop_bits {
                StopBits::One => vals::Stop::STOP1,
                StopBits::Two => vals::Stop::STOP2,
            })
        });

        // The parity bit takes the MSB of the word
        let data_bits = match config.data_bits {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
            DataBits::Nine => 9,
        };
        let word_bits = data_bits + if config.parity == Parity::None { 0 } else { 1 };

        r.cr1().write(|w| {
            w.set_m(if word_bits > 8 { vals::M::BIT9 } else { vals::M::BIT8 });
            w.set_pce(config.parity != Parity::None);
            w.set_ps(if config.parity == Parity::Odd {
                vals::Ps::ODD
            } else {
                vals::Ps::EVEN
            });
            w.set_te(true);
            w.set_re(true);
            w.set_ue(true);
        });
    }

    fn rx_ready(&self) -> bool {
        pac::USART1.sr().read().rxne()
    }

    fn read_data(&mut self) -> u8 {
        pac::USART1.dr().read().dr() as u8
    }

    fn tx_ready(&self) -> bool {
        pac::USART1.sr().read().txe()
    }

    fn write_data(&mut self, byte: u8) {
        pac::USART1.dr().write(|w| w.set_dr(byte as u16));
    }

    fn set_rx_interrupt(&mut self, enabled: bool) {
        pac::USART1.cr1().modify(|w| w.set_rxneie(enabled));
    }

    fn set_tx_interrupt(&mut self, enabled: bool) {
        pac::USART1.cr1().modify(|w| w.set_txeie(enabled));
    }

    fn tx_interrupt_enabled(&self) -> bool {
        pac::USART1.cr1().read().txeie()
    }
}
