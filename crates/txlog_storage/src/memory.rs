//! In-memory file system for testing.

use crate::channel::StoreChannel;
use crate::error::{StorageError, StorageResult};
use crate::fs::FileSystem;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A channel over an in-memory file.
///
/// Every channel opened on the same path shares one buffer, so bytes
/// appended through a writer are immediately visible to open readers.
/// Deleting the file from the [`InMemoryFileSystem`] does not invalidate
/// channels that are already open.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChannel {
    data: Arc<RwLock<Vec<u8>>>,
}

impl InMemoryChannel {
    /// Creates a new empty in-memory channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory channel with pre-existing data.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Returns a copy of all data in the channel.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl StoreChannel for InMemoryChannel {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<usize> {
        let data = self.data.read();
        let size = data.len() as u64;
        if offset >= size {
            return Ok(0);
        }

        let start = offset as usize;
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }
}

/// An in-memory file system.
///
/// Files live in a flat map keyed by path; directories are implicit.
/// Suitable for:
/// - Unit tests
/// - Integration tests that lay out multi-segment logs
///
/// # Thread Safety
///
/// This file system is thread-safe and can be shared across threads.
#[derive(Debug, Default)]
pub struct InMemoryFileSystem {
    files: RwLock<BTreeMap<PathBuf, InMemoryChannel>>,
}

impl InMemoryFileSystem {
    /// Creates a new empty in-memory file system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces the file at `path` with `data`.
    pub fn write_file(&self, path: &Path, data: Vec<u8>) {
        self.files
            .write()
            .insert(path.to_path_buf(), InMemoryChannel::with_data(data));
    }

    /// Returns a copy of the bytes stored at `path`, if any.
    #[must_use]
    pub fn file_data(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().get(path).map(InMemoryChannel::data)
    }
}

impl FileSystem for InMemoryFileSystem {
    fn open(&self, path: &Path) -> StorageResult<Box<dyn StoreChannel>> {
        match self.files.read().get(path) {
            Some(channel) => Ok(Box::new(channel.clone())),
            None => Err(StorageError::not_found(path)),
        }
    }

    fn create(&self, path: &Path) -> StorageResult<Box<dyn StoreChannel>> {
        let mut files = self.files.write();
        let channel = files.entry(path.to_path_buf()).or_default();
        Ok(Box::new(channel.clone()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    fn size(&self, path: &Path) -> StorageResult<u64> {
        match self.files.read().get(path) {
            Some(channel) => channel.size(),
            None => Err(StorageError::not_found(path)),
        }
    }

    fn delete(&self, path: &Path) -> StorageResult<bool> {
        Ok(self.files.write().remove(path).is_some())
    }

    fn list(&self, dir: &Path) -> StorageResult<Vec<PathBuf>> {
        Ok(self
            .files
            .read()
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect())
    }
}
