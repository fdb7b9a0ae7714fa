//! EEPROM emulation in on-chip flash
//!
//! The top of flash is reserved for the persistent store. Offsets are
//! relative to the start of flash, as embassy's flash driver expects.

use core::ops::Range;

use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_stm32::flash::{Blocking, Flash};
use embassy_stm32::peripherals::FLASH;
use embassy_stm32::Peri;

use picovm_hal::flash::FlashEeprom;

/// Flash page size on medium-density parts
pub const FLASH_PAGE_SIZE: u32 = 1024;

#[cfg(feature = "stm32f103c8")]
pub const FLASH_SIZE: u32 = 64 * 1024;
#[cfg(not(feature = "stm32f103c8"))]
pub const FLASH_SIZE: u32 = 128 * 1024;

/// Pages reserved for the emulated EEPROM
pub const EEPROM_PAGES: u32 = 32;

/// Flash range handed to the EEPROM emulation
pub const EEPROM_RANGE: Range<u32> = (FLASH_SIZE - EEPROM_PAGES * FLASH_PAGE_SIZE)..FLASH_SIZE;

/// Flash-backed EEPROM emulation for this chip
pub type Eeprom = FlashEeprom<BlockingAsync<Flash<'static, Blocking>>>;

/// Build the EEPROM emulation over `range`
///
/// `range` must lie inside [`EEPROM_RANGE`] so it never overlaps code.
pub fn eeprom(flash: Peri<'static, FLASH>, range: Range<u32>) -> Eeprom {
    FlashEeprom::new(BlockingAsync::new(Flash::new_blocking(flash)), range)
}
