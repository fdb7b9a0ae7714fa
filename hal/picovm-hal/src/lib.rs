//! picovm Hardware Abstraction Layer
//!
//! This crate defines the peripheral access traits the native bridge is
//! written against. Each microcontroller family implements them once in its
//! own HAL crate; the ring buffer, dispatcher and store logic in
//! `picovm-core` never see a register.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  picovm-core (transport, natives, ...)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  picovm-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  picovm-hal-  │       │  picovm-hal-  │
//! │    stm32f1    │       │    rp2040     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`serial::SerialController`] - Interrupt-capable UART data/control registers
//! - [`timer::TickTimer`] - Periodic tick interrupt source
//! - [`gpio::GpioController`] - Port/bit addressed digital I/O
//! - [`nvm::EepromEmulation`] - Tagged variable storage with wear leveling

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod nvm;
pub mod serial;
pub mod timer;

#[cfg(feature = "sequential-storage")]
pub mod flash;

// Re-export key traits at crate root for convenience
pub use gpio::GpioController;
pub use nvm::{EepromEmulation, NvmError, VirtualTag};
pub use serial::{SerialController, UartConfig};
pub use timer::TickTimer;
