//! Flash-backed EEPROM emulation
//!
//! Uses sequential-storage for wear-leveled key-value storage in a
//! reserved flash range. Each emulated variable is one map item keyed by
//! its [`VirtualTag`].
//!
//! The native bridge is synchronous, so every operation is driven to
//! completion with `embassy_futures::block_on`.

use core::ops::Range;

use embassy_futures::block_on;
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

use crate::nvm::{EepromEmulation, NvmError, VirtualTag};

/// Scratch buffer for one map item (header + 2-byte key + 2-byte value)
const ITEM_BUFFER_SIZE: usize = 32;

/// EEPROM emulation over any async NOR flash
pub struct FlashEeprom<F> {
    flash: F,
    range: Range<u32>,
}

impl<F: NorFlash> FlashEeprom<F> {
    /// Create an emulation layer over `range` of `flash`
    ///
    /// The range must cover at least two erase pages so sequential-storage
    /// can migrate live items during garbage collection.
    pub fn new(flash: F, range: Range<u32>) -> Self {
        Self { flash, range }
    }

    /// Get the raw flash for low-level access
    pub fn flash(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Erase the whole emulation range
    pub fn erase_all(&mut self) -> Result<(), NvmError> {
        let range = self.range.clone();
        block_on(self.flash.erase(range.start, range.end)).map_err(|_| NvmError::Flash)
    }
}

impl<F: NorFlash> EepromEmulation for FlashEeprom<F> {
    fn read_variable(&mut self, tag: VirtualTag) -> Result<Option<u16>, NvmError> {
        if !tag.is_valid() {
            return Err(NvmError::InvalidTag);
        }
        let mut data_buffer = [0u8; ITEM_BUFFER_SIZE];

        let result = block_on(map::fetch_item::<VirtualTag, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut data_buffer,
            &tag,
        ));

        match result {
            Ok(Some(data)) if data.len() == 2 => Ok(Some(u16::from_le_bytes([data[0], data[1]]))),
            Ok(Some(_)) => Err(NvmError::Storage),
            Ok(None) => Ok(None),
            Err(_) => Err(NvmError::Storage),
        }
    }

    fn write_variable(&mut self, tag: VirtualTag, value: u16) -> Result<(), NvmError> {
        if !tag.is_valid() {
            return Err(NvmError::InvalidTag);
        }
        let mut data_buffer = [0u8; ITEM_BUFFER_SIZE];
        let bytes = value.to_le_bytes();

        block_on(map::store_item(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut data_buffer,
            &tag,
            &&bytes[..],
        ))
        .map_err(|e| match e {
            sequential_storage::Error::FullStorage => NvmError::Full,
            sequential_storage::Error::Storage { .. } => NvmError::Flash,
            _ => NvmError::Storage,
        })
    }
}
