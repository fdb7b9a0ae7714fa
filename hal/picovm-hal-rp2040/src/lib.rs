//! RP2040-specific HAL for picovm
//!
//! This crate provides RP2040 implementations of the shared `picovm-hal`
//! traits:
//!
//! - [`uart::Uart0`] - PL011 UART0 on GPIO0 (TX) / GPIO1 (RX)
//! - [`tick::SysTickTimer`] - Cortex-M SysTick as tick source
//! - [`gpio::Bank0`] - SIO-driven GPIO bank 0 as port 0
//! - [`flash`] - EEPROM emulation in the last 64KB of flash
//!
//! The UART is serviced from its own interrupt by the serial transport, so
//! it is driven through the PAC rather than embassy's buffered driver.

#![no_std]

pub mod flash;
pub mod gpio;
pub mod tick;
pub mod uart;

// Re-export shared traits from picovm-hal for convenience
pub use picovm_hal::{GpioController, SerialController, TickTimer, UartConfig};
