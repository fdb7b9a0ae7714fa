//! PL011 UART0 register driver
//!
//! The FIFOs are disabled so RXIM/TXIM fire per character, which is what
//! the ring-buffer transport expects. TXIM stays asserted while the holding
//! register is empty; the transport clears the enable once its TX buffer
//! drains.

use embassy_rp::pac;
use embassy_rp::peripherals::{PIN_0, PIN_1, UART0};
use embassy_rp::Peri;

use picovm_hal::serial::{
    pl011_divisors, DataBits, Parity, SerialController, StopBits, UartConfig,
};

const TX_PIN: usize = 0;
const RX_PIN: usize = 1;

/// IO_BANK0 function select for UART
const FUNCSEL_UART: u8 = 2;

/// Handle to UART0
///
/// Zero-sized; clones share the peripheral.
#[derive(Clone)]
pub struct Uart0 {
    _private: (),
}

impl Uart0 {
    /// Claim UART0 and route GPIO0/GPIO1 to it
    pub fn new(
        _uart: Peri<'static, UART0>,
        _tx: Peri<'static, PIN_0>,
        _rx: Peri<'static, PIN_1>,
    ) -> Self {
        let resets = pac::RESETS;
        resets.reset().modify(|w| w.set_uart0(true));
        resets.reset().modify(|w| w.set_uart0(false));
        while !resets.reset_done().read().uart0() {}

        for pin in [TX_PIN, RX_PIN] {
            pac::PADS_BANK0.gpio(pin).modify(|w| {
                w.set_ie(pin == RX_PIN);
                w.set_od(false);
            });
            pac::IO_BANK0
                .gpio(pin)
                .ctrl()
                .write(|w| w.set_funcsel(FUNCSEL_UART));
        }

        Self { _private: () }
    }
}

impl SerialController for Uart0 {
    fn configure(&mut self, config: &UartConfig, clock_hz: u32) {
        let r = pac::UART0;
        r.uartcr().write(|w| w.set_uarten(false));

        let (int, frac) = pl011_divisors(clock_hz, config.baudrate);
        r.uartibrd().write(|w| w.set_baud_divint(int));
        r.uartfbrd().write(|w| w.set_baud_divfrac(frac));

        // LCR_H write latches the divisors
        r.uartlcr_h().write(|w| {
            w.set_wlen(match config.data_bits {
                DataBits::Seven => 0b10,
                DataBits::Eight | DataBits::Nine => 0b11,
            });
            w.set_fen(false);
            w.set_stp2(config.stop_bits == StopBits::Two);
            w.set_pen(config.parity != Parity::None);
            w.set_eps(config.parity == Parity::Even);
        });

        r.uartcr().write(|w| {
            w.set_uarten(true);
            w.set_txe(true);
            w.set_rxe(true);
        });
    }

    fn rx_ready(&self) -> bool {
        !pac::UART0.uartfr().read().rxfe()
    }

    fn read_data(&mut self) -> u8 {
        pac::UART0.uartdr().read().data()
    }

    fn tx_ready(&self) -> bool {
        !pac::UART0.uartfr().read().txff()
    }

    fn write_data(&mut self, byte: u8) {
        pac::UART0.uartdr().write(|w| w.set_data(byte));
    }

    fn set_rx_interrupt(&mut self, enabled: bool) {
        pac::UART0.uartimsc().modify(|w| w.set_rxim(enabled));
    }

    fn set_tx_interrupt(&mut self, enabled: bool) {
        pac::UART0.uartimsc().modify(|w| w.set_txim(enabled));
    }

    fn tx_interrupt_enabled(&self) -> bool {
        pac::UART0.uartimsc().read().txim()
    }
}
