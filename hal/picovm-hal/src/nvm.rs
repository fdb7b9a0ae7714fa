//! Non-volatile variable storage abstractions
//!
//! Targets without byte-addressable EEPROM emulate it in flash. The
//! emulation layer stores 16-bit variables under 16-bit virtual tags and
//! takes care of wear leveling; callers only see tagged reads and writes.

/// Virtual address of an emulated EEPROM variable
///
/// `0xFFFF` is the erased-flash pattern and can never be used as a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VirtualTag(pub u16);

impl VirtualTag {
    /// The reserved erased-flash tag
    pub const RESERVED: VirtualTag = VirtualTag(0xFFFF);

    /// Get the tag as a raw value
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Check whether this tag may be stored
    pub const fn is_valid(self) -> bool {
        self.0 != Self::RESERVED.0
    }
}

/// Errors from the emulation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NvmError {
    /// Flash program/erase operation failed
    Flash,
    /// Storage bookkeeping failed (corrupt page, bad record)
    Storage,
    /// Tag is reserved
    InvalidTag,
    /// No free space left after garbage collection
    Full,
}

/// EEPROM emulation backend
///
/// Provides wear-leveled storage of 16-bit variables identified by
/// [`VirtualTag`]. Implementations decide their own page layout; atomicity
/// is whatever the backend provides.
pub trait EepromEmulation {
    /// Read a variable
    ///
    /// Returns `Ok(None)` if the variable has never been written.
    fn read_variable(&mut self, tag: VirtualTag) -> Result<Option<u16>, NvmError>;

    /// Write a variable
    fn write_variable(&mut self, tag: VirtualTag, value: u16) -> Result<(), NvmError>;
}

// Implement the sequential-storage Key trait when the feature is enabled
#[cfg(feature = "sequential-storage")]
impl sequential_storage::map::Key for VirtualTag {
    fn serialize_into(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, sequential_storage::map::SerializationError> {
        if buffer.len() < 2 {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        buffer[..2].copy_from_slice(&self.0.to_le_bytes());
        Ok(2)
    }

    fn deserialize_from(
        buffer: &[u8],
    ) -> Result<(Self, usize), sequential_storage::map::SerializationError> {
        if buffer.len() < 2 {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        let tag = VirtualTag(u16::from_le_bytes([buffer[0], buffer[1]]));
        if !tag.is_valid() {
            return Err(sequential_storage::map::SerializationError::InvalidFormat);
        }
        Ok((tag, 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_tag() {
        assert!(!VirtualTag(0xFFFF).is_valid());
        assert!(VirtualTag(0x5555).is_valid());
        assert_eq!(VirtualTag(0x6666).as_u16(), 0x6666);
    }
}
