//! Persistent byte storage
//!
//! Program images and VM-visible state live in a non-volatile region with a
//! capacity fixed at build time. Two addressing schemes exist:
//!
//! - [`DirectStore`]: flat, byte-addressable memory (real EEPROM, a file
//!   image on the desktop). Reads and writes are plain copies.
//! - [`VirtualStore`]: targets that emulate EEPROM in flash. Each logical
//!   byte is one emulated variable; its virtual tag comes from a fixed
//!   [`VirtualMap`].
//!
//! The store is an addressing shim only. It adds no atomicity beyond what
//! the underlying memory or emulation layer provides.

use picovm_hal::nvm::{EepromEmulation, NvmError, VirtualTag};

/// Value read back for a variable that was never written (erased flash)
pub const ERASED: u8 = 0xFF;

/// Persistent store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Access reaches past the configured capacity
    OutOfRange,
    /// Error reported by the emulation layer
    Nvm(NvmError),
}

impl From<NvmError> for StoreError {
    fn from(e: NvmError) -> Self {
        StoreError::Nvm(e)
    }
}

/// Non-volatile byte store
pub trait PersistentStore {
    /// Size of the addressable region in bytes
    fn capacity(&self) -> usize;

    /// Fill `dst` from the bytes starting at `addr`
    fn read_block(&mut self, dst: &mut [u8], addr: usize) -> Result<(), StoreError>;

    /// Store `src` starting at `addr`
    fn write_block(&mut self, addr: usize, src: &[u8]) -> Result<(), StoreError>;

    /// Store a single byte
    fn write_byte(&mut self, addr: usize, data: u8) -> Result<(), StoreError> {
        self.write_block(addr, &[data])
    }
}

/// End address of an access, or `OutOfRange` if it leaves the store
fn access_end(capacity: usize, addr: usize, len: usize) -> Result<usize, StoreError> {
    match addr.checked_add(len) {
        Some(end) if end <= capacity => Ok(end),
        _ => Err(StoreError::OutOfRange),
    }
}

/// Store over flat byte-addressable memory
pub struct DirectStore<M> {
    memory: M,
}

impl<M: AsRef<[u8]> + AsMut<[u8]>> DirectStore<M> {
    pub fn new(memory: M) -> Self {
        Self { memory }
    }

    /// Borrow the backing memory
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Give back the backing memory
    pub fn into_inner(self) -> M {
        self.memory
    }
}

impl<M: AsRef<[u8]> + AsMut<[u8]>> PersistentStore for DirectStore<M> {
    fn capacity(&self) -> usize {
        self.memory.as_ref().len()
    }

    fn read_block(&mut self, dst: &mut [u8], addr: usize) -> Result<(), StoreError> {
        let end = access_end(self.capacity(), addr, dst.len())?;
        dst.copy_from_slice(&self.memory.as_ref()[addr..end]);
        Ok(())
    }

    fn write_block(&mut self, addr: usize, src: &[u8]) -> Result<(), StoreError> {
        let end = access_end(self.capacity(), addr, src.len())?;
        self.memory.as_mut()[addr..end].copy_from_slice(src);
        Ok(())
    }
}

/// A run of consecutive virtual tags backing consecutive logical bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VirtualRegion {
    /// Tag of the first byte
    pub base_tag: u16,
    /// Number of bytes (and tags)
    pub len: u16,
}

impl VirtualRegion {
    pub const fn new(base_tag: u16, len: u16) -> Self {
        Self { base_tag, len }
    }

    /// One past the last tag, widened so it cannot overflow
    const fn tag_end(&self) -> u32 {
        self.base_tag as u32 + self.len as u32
    }
}

/// Fixed translation from logical byte addresses to virtual tags
///
/// Regions are laid out back to back in logical address space: region 0
/// starts at address 0, region 1 right after it, and so on.
#[derive(Debug, Clone, Copy)]
pub struct VirtualMap<'a> {
    regions: &'a [VirtualRegion],
}

impl<'a> VirtualMap<'a> {
    pub const fn new(regions: &'a [VirtualRegion]) -> Self {
        Self { regions }
    }

    /// Total number of logical bytes
    pub const fn capacity(&self) -> usize {
        let mut total = 0;
        let mut i = 0;
        while i < self.regions.len() {
            total += self.regions[i].len as usize;
            i += 1;
        }
        total
    }

    /// Check the table for build-time use
    ///
    /// Every region must be non-empty, stay clear of the reserved tag and
    /// share no tag with another region. Meant for a `const` assertion:
    ///
    /// ```
    /// use picovm_core::store::{VirtualMap, VirtualRegion};
    ///
    /// const MAP: VirtualMap<'static> = VirtualMap::new(&[
    ///     VirtualRegion::new(0x5555, 16),
    ///     VirtualRegion::new(0x6666, 16),
    /// ]);
    /// const _: () = assert!(MAP.validate());
    /// ```
    pub const fn validate(&self) -> bool {
        let mut i = 0;
        while i < self.regions.len() {
            let region = self.regions[i];
            if region.len == 0 || region.tag_end() > VirtualTag::RESERVED.as_u16() as u32 {
                return false;
            }
            let mut j = i + 1;
            while j < self.regions.len() {
                let other = self.regions[j];
                if (region.base_tag as u32) < other.tag_end()
                    && (other.base_tag as u32) < region.tag_end()
                {
                    return false;
                }
                j += 1;
            }
            i += 1;
        }
        true
    }

    /// Tag holding the byte at logical address `addr`
    pub fn resolve(&self, addr: usize) -> Option<VirtualTag> {
        let mut start = 0usize;
        for region in self.regions {
            let len = region.len as usize;
            if addr < start + len {
                let offset = (addr - start) as u16;
                return Some(VirtualTag(region.base_tag.wrapping_add(offset)));
            }
            start += len;
        }
        None
    }
}

/// Store over an EEPROM emulation layer
///
/// One emulated variable per logical byte. Bytes never written read as
/// [`ERASED`].
pub struct VirtualStore<'a, E> {
    emulation: E,
    map: VirtualMap<'a>,
}

impl<'a, E: EepromEmulation> VirtualStore<'a, E> {
    pub fn new(emulation: E, map: VirtualMap<'a>) -> Self {
        Self { emulation, map }
    }

    /// Access the emulation layer
    pub fn emulation(&mut self) -> &mut E {
        &mut self.emulation
    }

    fn tag(&self, addr: usize) -> Result<VirtualTag, StoreError> {
        self.map.resolve(addr).ok_or(StoreError::OutOfRange)
    }
}

impl<E: EepromEmulation> PersistentStore for VirtualStore<'_, E> {
    fn capacity(&self) -> usize {
        self.map.capacity()
    }

    fn read_block(&mut self, dst: &mut [u8], addr: usize) -> Result<(), StoreError> {
        access_end(self.capacity(), addr, dst.len())?;
        for (offset, byte) in dst.iter_mut().enumerate() {
            let tag = self.tag(addr + offset)?;
            *byte = match self.emulation.read_variable(tag)? {
                Some(value) => value as u8,
                None => ERASED,
            };
        }
        Ok(())
    }

    fn write_block(&mut self, addr: usize, src: &[u8]) -> Result<(), StoreError> {
        access_end(self.capacity(), addr, src.len())?;
        for (offset, &byte) in src.iter().enumerate() {
            let tag = self.tag(addr + offset)?;
            self.emulation.write_variable(tag, byte as u16)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::LinearMap;
    use proptest::prelude::*;

    /// Emulation layer holding up to 64 variables in RAM
    #[derive(Default)]
    struct MockEeprom {
        variables: LinearMap<u16, u16, 64>,
        writes: usize,
    }

    impl EepromEmulation for MockEeprom {
        fn read_variable(&mut self, tag: VirtualTag) -> Result<Option<u16>, NvmError> {
            if !tag.is_valid() {
                return Err(NvmError::InvalidTag);
            }
            Ok(self.variables.get(&tag.as_u16()).copied())
        }

        fn write_variable(&mut self, tag: VirtualTag, value: u16) -> Result<(), NvmError> {
            if !tag.is_valid() {
                return Err(NvmError::InvalidTag);
            }
            self.writes += 1;
            self.variables
                .insert(tag.as_u16(), value)
                .map(|_| ())
                .map_err(|_| NvmError::Full)
        }
    }

    const MAP: VirtualMap<'static> = VirtualMap::new(&[
        VirtualRegion::new(0x5555, 4),
        VirtualRegion::new(0x6666, 4),
        VirtualRegion::new(0x7777, 4),
    ]);
    const _: () = assert!(MAP.validate());

    #[test]
    fn test_direct_round_trip() {
        let mut store = DirectStore::new([0u8; 32]);
        store.write_block(4, b"hello").unwrap();
        store.write_byte(9, b'!').unwrap();

        let mut buf = [0u8; 6];
        store.read_block(&mut buf, 4).unwrap();
        assert_eq!(&buf, b"hello!");
    }

    #[test]
    fn test_direct_bounds() {
        let mut store = DirectStore::new([0u8; 8]);
        let mut buf = [0u8; 4];

        assert_eq!(store.read_block(&mut buf, 4), Ok(()));
        assert_eq!(store.read_block(&mut buf, 5), Err(StoreError::OutOfRange));
        assert_eq!(store.write_byte(8, 1), Err(StoreError::OutOfRange));
        assert_eq!(store.write_block(usize::MAX, &[1]), Err(StoreError::OutOfRange));
        // Zero-length access at the end is fine
        assert_eq!(store.write_block(8, &[]), Ok(()));
    }

    #[test]
    fn test_map_capacity_and_resolve() {
        assert_eq!(MAP.capacity(), 12);
        assert_eq!(MAP.resolve(0), Some(VirtualTag(0x5555)));
        assert_eq!(MAP.resolve(3), Some(VirtualTag(0x5558)));
        assert_eq!(MAP.resolve(4), Some(VirtualTag(0x6666)));
        assert_eq!(MAP.resolve(11), Some(VirtualTag(0x777A)));
        assert_eq!(MAP.resolve(12), None);
    }

    #[test]
    fn test_map_validation() {
        assert!(!VirtualMap::new(&[VirtualRegion::new(0xFFF0, 16)]).validate());
        assert!(VirtualMap::new(&[VirtualRegion::new(0xFFF0, 15)]).validate());
        assert!(!VirtualMap::new(&[VirtualRegion::new(0x1000, 0)]).validate());
        assert!(!VirtualMap::new(&[
            VirtualRegion::new(0x1000, 0x20),
            VirtualRegion::new(0x101F, 1),
        ])
        .validate());
        assert!(VirtualMap::new(&[
            VirtualRegion::new(0x1000, 0x20),
            VirtualRegion::new(0x1020, 1),
        ])
        .validate());
    }

    #[test]
    fn test_virtual_unwritten_reads_erased() {
        let mut store = VirtualStore::new(MockEeprom::default(), MAP);
        let mut buf = [0u8; 3];
        store.read_block(&mut buf, 0).unwrap();
        assert_eq!(buf, [ERASED; 3]);
    }

    #[test]
    fn test_virtual_round_trip_across_regions() {
        let mut store = VirtualStore::new(MockEeprom::default(), MAP);
        store.write_block(2, &[1, 2, 3, 4, 5, 6]).unwrap();

        let mut buf = [0u8; 6];
        store.read_block(&mut buf, 2).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6]);

        // Bytes 4..8 landed in the second tag run
        let eeprom = store.emulation();
        assert_eq!(eeprom.variables.get(&0x6666), Some(&3));
        assert_eq!(eeprom.variables.get(&0x6669), Some(&6));
    }

    #[test]
    fn test_virtual_out_of_range_writes_nothing() {
        let mut store = VirtualStore::new(MockEeprom::default(), MAP);
        assert_eq!(store.write_block(10, &[1, 2, 3]), Err(StoreError::OutOfRange));
        assert_eq!(store.emulation().writes, 0);
    }

    #[test]
    fn test_virtual_passes_nvm_errors() {
        struct Broken;
        impl EepromEmulation for Broken {
            fn read_variable(&mut self, _: VirtualTag) -> Result<Option<u16>, NvmError> {
                Err(NvmError::Flash)
            }
            fn write_variable(&mut self, _: VirtualTag, _: u16) -> Result<(), NvmError> {
                Err(NvmError::Full)
            }
        }

        let mut store = VirtualStore::new(Broken, MAP);
        let mut buf = [0u8; 1];
        assert_eq!(
            store.read_block(&mut buf, 0),
            Err(StoreError::Nvm(NvmError::Flash))
        );
        assert_eq!(store.write_byte(0, 1), Err(StoreError::Nvm(NvmError::Full)));
    }

    proptest! {
        #[test]
        fn prop_direct_round_trip(
            addr in 0usize..64,
            data in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let mut store = DirectStore::new([0xFFu8; 128]);
            store.write_block(addr, &data).unwrap();

            let mut buf = [0u8; 64];
            store.read_block(&mut buf[..data.len()], addr).unwrap();
            prop_assert_eq!(&buf[..data.len()], data.as_slice());
        }

        #[test]
        fn prop_virtual_round_trip(
            addr in 0usize..12,
            data in proptest::collection::vec(any::<u8>(), 0..12),
        ) {
            prop_assume!(addr + data.len() <= MAP.capacity());
            let mut store = VirtualStore::new(MockEeprom::default(), MAP);
            store.write_block(addr, &data).unwrap();

            let mut buf = [0u8; 12];
            store.read_block(&mut buf[..data.len()], addr).unwrap();
            prop_assert_eq!(&buf[..data.len()], data.as_slice());
        }
    }
}
