//! STM32F103RB (Nucleo-F103RB)
//!
//! - USART1 on PA9/PA10, drop-newest RX policy
//! - TIM1 update interrupt as tick
//! - GPIO ports A-D
//! - Emulated EEPROM in the top 32 flash pages

use defmt::*;
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};

use picovm_core::serial::SerialIsr;
use picovm_core::store::VirtualStore;
use picovm_core::{Handoff, InterruptSerial, NativeDispatcher, RingBuffer, TickCounter};
use picovm_hal::{TickTimer, UartConfig};
use picovm_hal_stm32f1::flash::{self, Eeprom, EEPROM_RANGE};
use picovm_hal_stm32f1::gpio::Ports;
use picovm_hal_stm32f1::timer::Tim1;
use picovm_hal_stm32f1::usart::Usart1;

use super::{Board, STORE_MAP};
use crate::config::{
    CLOCK_HZ, RX_BUFFER_SIZE, SERIAL_POLICY, TICK_HZ, TX_BUFFER_SIZE, UART_BITRATE,
};

pub type Serial = InterruptSerial<'static, Usart1, RX_BUFFER_SIZE, TX_BUFFER_SIZE>;
pub type Gpio = Ports;
pub type Store = VirtualStore<'static, Eeprom>;

static RX_BUFFER: RingBuffer<RX_BUFFER_SIZE> = RingBuffer::new();
static TX_BUFFER: RingBuffer<TX_BUFFER_SIZE> = RingBuffer::new();
static SERIAL_ISR: Handoff<SerialIsr<'static, Usart1, RX_BUFFER_SIZE, TX_BUFFER_SIZE>> =
    Handoff::new();

static TICK_TIMER: Handoff<Tim1> = Handoff::new();
static TICKS: TickCounter = TickCounter::new();

/// Bring up the board; call once before anything else
pub fn board_init() -> Board {
    // Reset clock tree: HSI at 8 MHz on SYSCLK, APB1 and APB2
    let p = embassy_stm32::init(Default::default());
    info!("Peripherals initialized ({} Hz)", CLOCK_HZ);

    let usart = Usart1::new(p.USART1, p.PA9, p.PA10);
    let (serial, isr) = unwrap!(InterruptSerial::init(
        usart,
        &UartConfig::with_baudrate(UART_BITRATE),
        CLOCK_HZ,
        &RX_BUFFER,
        &TX_BUFFER,
        SERIAL_POLICY,
    ));
    if SERIAL_ISR.install(isr).is_err() {
        panic!("board_init called twice");
    }
    interrupt::USART1.set_priority(Priority::P1);
    interrupt::USART1.unpend();
    // SAFETY: the handler's state was installed above
    unsafe { interrupt::USART1.enable() };
    info!("USART1 at {} baud", UART_BITRATE);

    let mut timer = Tim1::new(p.TIM1);
    timer.start(CLOCK_HZ, TICK_HZ);
    if TICK_TIMER.install(timer).is_err() {
        panic!("board_init called twice");
    }
    interrupt::TIM1_UP.set_priority(Priority::P2);
    interrupt::TIM1_UP.unpend();
    // SAFETY: as above
    unsafe { interrupt::TIM1_UP.enable() };
    info!("TIM1 tick at {} Hz", TICK_HZ);

    let eeprom = flash::eeprom(p.FLASH, EEPROM_RANGE);
    let store = VirtualStore::new(eeprom, STORE_MAP);

    Board {
        natives: NativeDispatcher::new(serial, TICKS.source(), Ports::new(), CLOCK_HZ),
        store,
    }
}

#[interrupt]
fn USART1() {
    // SAFETY: only this handler touches SERIAL_ISR
    unsafe { SERIAL_ISR.with(|isr| isr.on_interrupt()) };
}

#[interrupt]
fn TIM1_UP() {
    // SAFETY: only this handler touches TICK_TIMER
    unsafe { TICK_TIMER.with(|timer| timer.acknowledge()) };
    TICKS.on_tick();
}
