//! EEPROM emulation in QSPI flash
//!
//! Uses the last 64KB of flash. Offsets are relative to the start of
//! flash (XIP base), as embassy-rp's flash driver expects.

use core::ops::Range;

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;

use picovm_hal::flash::FlashEeprom;

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB flash on the Pico
pub const EEPROM_PARTITION_SIZE: usize = 64 * 1024;
pub const EEPROM_PARTITION_START: usize = FLASH_SIZE - EEPROM_PARTITION_SIZE;

/// Flash erase size for RP2040
pub const FLASH_ERASE_SIZE: usize = ERASE_SIZE;

/// Flash range reserved for the emulated EEPROM
pub const EEPROM_RANGE: Range<u32> = (EEPROM_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// Flash-backed EEPROM emulation for this chip
pub type Eeprom = FlashEeprom<Flash<'static, FLASH, Async, FLASH_SIZE>>;

/// Build the EEPROM emulation over `range`
///
/// `range` must lie inside [`EEPROM_RANGE`].
pub fn eeprom(
    flash: Peri<'static, FLASH>,
    dma: Peri<'static, impl Channel>,
    range: Range<u32>,
) -> Eeprom {
    FlashEeprom::new(Flash::new(flash, dma), range)
}
