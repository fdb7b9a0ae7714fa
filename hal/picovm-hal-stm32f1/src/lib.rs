//! STM32F1-specific HAL for picovm
//!
//! Register-level implementations of the `picovm-hal` traits. The serial
//! transport services the UART from its own interrupt handler, so the
//! peripherals are driven through the PAC rather than embassy's drivers;
//! embassy-stm32 still provides clock setup and the flash driver.
//!
//! - [`usart::Usart1`] - USART1 on PA9 (TX) / PA10 (RX)
//! - [`timer::Tim1`] - TIM1 update interrupt as tick source
//! - [`gpio::Ports`] - GPIO ports A-D by index
//! - [`flash`] - EEPROM emulation in the top flash pages
//!
//! # Features
//!
//! - `stm32f103rb` - STM32F103RB (128 KB flash, 20 KB RAM)
//! - `stm32f103c8` - STM32F103C8 (64 KB flash, 20 KB RAM)
//! - `defmt` - Enable debug formatting support

#![no_std]

pub mod flash;
pub mod gpio;
pub mod timer;
pub mod usart;

// Re-export shared types from picovm-hal
pub use picovm_hal::{GpioController, SerialController, TickTimer, UartConfig};
