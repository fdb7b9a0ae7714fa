//! Raspberry Pi Pico (RP2040)
//!
//! - UART0 on GPIO0/GPIO1, overwrite-oldest RX policy
//! - SysTick as tick
//! - GPIO bank 0 as port 0
//! - Emulated EEPROM in the last 64KB of flash

use cortex_m_rt::exception;
use defmt::*;
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};

use picovm_core::serial::SerialIsr;
use picovm_core::store::VirtualStore;
use picovm_core::{Handoff, InterruptSerial, NativeDispatcher, RingBuffer, TickCounter};
use picovm_hal::{TickTimer, UartConfig};
use picovm_hal_rp2040::flash::{self, Eeprom, EEPROM_RANGE};
use picovm_hal_rp2040::gpio::Bank0;
use picovm_hal_rp2040::tick::SysTickTimer;
use picovm_hal_rp2040::uart::Uart0;

use super::{Board, STORE_MAP};
use crate::config::{
    CLOCK_HZ, RX_BUFFER_SIZE, SERIAL_POLICY, TICK_HZ, TX_BUFFER_SIZE, UART_BITRATE,
};

pub type Serial = InterruptSerial<'static, Uart0, RX_BUFFER_SIZE, TX_BUFFER_SIZE>;
pub type Gpio = Bank0;
pub type Store = VirtualStore<'static, Eeprom>;

static RX_BUFFER: RingBuffer<RX_BUFFER_SIZE> = RingBuffer::new();
static TX_BUFFER: RingBuffer<TX_BUFFER_SIZE> = RingBuffer::new();
static SERIAL_ISR: Handoff<SerialIsr<'static, Uart0, RX_BUFFER_SIZE, TX_BUFFER_SIZE>> =
    Handoff::new();

static TICK_TIMER: Handoff<SysTickTimer> = Handoff::new();
static TICKS: TickCounter = TickCounter::new();

/// Bring up the board; call once before anything else
pub fn board_init() -> Board {
    // Default clocks: 125 MHz system and peripheral clock
    let p = embassy_rp::init(Default::default());
    let core = unwrap!(cortex_m::Peripherals::take());
    info!("Peripherals initialized ({} Hz)", CLOCK_HZ);

    let uart = Uart0::new(p.UART0, p.PIN_0, p.PIN_1);
    let (serial, isr) = unwrap!(InterruptSerial::init(
        uart,
        &UartConfig::with_baudrate(UART_BITRATE),
        CLOCK_HZ,
        &RX_BUFFER,
        &TX_BUFFER,
        SERIAL_POLICY,
    ));
    if SERIAL_ISR.install(isr).is_err() {
        panic!("board_init called twice");
    }
    interrupt::UART0_IRQ.set_priority(Priority::P1);
    interrupt::UART0_IRQ.unpend();
    // SAFETY: the handler's state was installed above
    unsafe { interrupt::UART0_IRQ.enable() };
    info!("UART0 at {} baud", UART_BITRATE);

    // SysTick cannot be masked in the NVIC; ticks before the install
    // below still count, only the acknowledge is skipped
    let mut timer = SysTickTimer::new(core.SYST);
    timer.start(CLOCK_HZ, TICK_HZ);
    if TICK_TIMER.install(timer).is_err() {
        panic!("board_init called twice");
    }
    info!("SysTick at {} Hz", TICK_HZ);

    let eeprom = flash::eeprom(p.FLASH, p.DMA_CH0, EEPROM_RANGE);
    let store = VirtualStore::new(eeprom, STORE_MAP);

    Board {
        natives: NativeDispatcher::new(serial, TICKS.source(), Bank0::new(), CLOCK_HZ),
        store,
    }
}

#[interrupt]
fn UART0_IRQ() {
    // SAFETY: only this handler touches SERIAL_ISR
    unsafe { SERIAL_ISR.with(|isr| isr.on_interrupt()) };
}

#[exception]
fn SysTick() {
    // SAFETY: only this handler touches TICK_TIMER
    unsafe { TICK_TIMER.with(|timer| timer.acknowledge()) };
    TICKS.on_tick();
}
