//! File-backed EEPROM image
//!
//! The desktop target addresses its persistent store directly: a byte
//! vector loaded from a file at start and written back on exit.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use picovm_core::store::ERASED;
use picovm_core::{DirectStore, PersistentStore, StoreError};

/// EEPROM image kept in memory and mirrored to a file
pub struct FileImage {
    path: PathBuf,
    store: DirectStore<Vec<u8>>,
    dirty: bool,
}

impl FileImage {
    /// Load `size` bytes from `path`
    ///
    /// A missing file gives an erased image. A shorter file is padded with
    /// erased bytes, a longer one is truncated.
    pub fn load(path: &Path, size: usize) -> Result<Self> {
        let mut bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("{} not found, starting erased", path.display());
                Vec::new()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("unable to read {}", path.display()))
            }
        };
        if bytes.len() > size {
            warn!(
                "{} holds {} bytes, keeping the first {}",
                path.display(),
                bytes.len(),
                size
            );
        }
        bytes.resize(size, ERASED);

        Ok(Self {
            path: path.to_path_buf(),
            store: DirectStore::new(bytes),
            dirty: false,
        })
    }

    /// Write the image back if anything changed
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        fs::write(&self.path, self.store.memory())
            .with_context(|| format!("unable to write {}", self.path.display()))?;
        self.dirty = false;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistentStore for FileImage {
    fn capacity(&self) -> usize {
        self.store.capacity()
    }

    fn read_block(&mut self, dst: &mut [u8], addr: usize) -> Result<(), StoreError> {
        self.store.read_block(dst, addr)
    }

    fn write_block(&mut self, addr: usize, src: &[u8]) -> Result<(), StoreError> {
        self.store.write_block(addr, src)?;
        self.dirty = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_erased() {
        let dir = tempdir().unwrap();
        let mut image = FileImage::load(&dir.path().join("eeprom.bin"), 16).unwrap();

        let mut data = [0u8; 16];
        image.read_block(&mut data, 0).unwrap();
        assert_eq!(data, [ERASED; 16]);
        assert_eq!(image.capacity(), 16);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("eeprom.bin");

        let mut image = FileImage::load(&path, 32).unwrap();
        image.write_block(4, b"nvm").unwrap();
        image.write_byte(31, 0x42).unwrap();
        image.save().unwrap();

        let mut reloaded = FileImage::load(&path, 32).unwrap();
        let mut data = [0u8; 3];
        reloaded.read_block(&mut data, 4).unwrap();
        assert_eq!(&data, b"nvm");

        let mut last = [0u8; 1];
        reloaded.read_block(&mut last, 31).unwrap();
        assert_eq!(last, [0x42]);
    }

    #[test]
    fn test_short_file_is_padded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("eeprom.bin");
        fs::write(&path, [1, 2]).unwrap();

        let mut image = FileImage::load(&path, 4).unwrap();
        let mut data = [0u8; 4];
        image.read_block(&mut data, 0).unwrap();
        assert_eq!(data, [1, 2, ERASED, ERASED]);
    }

    #[test]
    fn test_clean_image_is_not_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("eeprom.bin");

        let mut image = FileImage::load(&path, 8).unwrap();
        image.save().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_out_of_range_write() {
        let dir = tempdir().unwrap();
        let mut image = FileImage::load(&dir.path().join("eeprom.bin"), 8).unwrap();
        assert_eq!(image.write_block(6, b"abc"), Err(StoreError::OutOfRange));
    }
}
