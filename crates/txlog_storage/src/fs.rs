//! File system trait and the OS implementation.

use crate::channel::StoreChannel;
use crate::error::{StorageError, StorageResult};
use crate::file::FileChannel;
use std::io;
use std::path::{Path, PathBuf};

/// Path-level file operations consumed by the transaction log.
///
/// The log never touches `std::fs` directly; everything goes through this
/// trait so tests can run against [`super::InMemoryFileSystem`].
pub trait FileSystem: Send + Sync {
    /// Opens an existing file for reading.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file does not exist.
    fn open(&self, path: &Path) -> StorageResult<Box<dyn StoreChannel>>;

    /// Opens a file for appending, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    fn create(&self, path: &Path) -> StorageResult<Box<dyn StoreChannel>>;

    /// Returns `true` if a file exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Returns the size of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file does not exist.
    fn size(&self, path: &Path) -> StorageResult<u64>;

    /// Deletes the file at `path`.
    ///
    /// Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    fn delete(&self, path: &Path) -> StorageResult<bool>;

    /// Lists the files directly inside `dir`.
    ///
    /// A missing directory lists as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    fn list(&self, dir: &Path) -> StorageResult<Vec<PathBuf>>;
}

/// File system backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl OsFileSystem {
    /// Creates a new OS file system handle.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for OsFileSystem {
    fn open(&self, path: &Path) -> StorageResult<Box<dyn StoreChannel>> {
        match FileChannel::open(path) {
            Ok(channel) => Ok(Box::new(channel)),
            Err(e) if e.is_not_found() => Err(StorageError::not_found(path)),
            Err(e) => Err(e),
        }
    }

    fn create(&self, path: &Path) -> StorageResult<Box<dyn StoreChannel>> {
        Ok(Box::new(FileChannel::create(path)?))
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn size(&self, path: &Path) -> StorageResult<u64> {
        match std::fs::metadata(path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::not_found(path)),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, path: &Path) -> StorageResult<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, dir: &Path) -> StorageResult<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn os_fs_create_open_and_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transaction.log.3");
        let fs = OsFileSystem::new();

        let mut writer = fs.create(&path).unwrap();
        writer.append(b"12345").unwrap();
        writer.flush().unwrap();

        assert!(fs.exists(&path));
        assert_eq!(fs.size(&path).unwrap(), 5);

        let reader = fs.open(&path).unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(reader.read_at(0, &mut buf).unwrap(), 5);
    }

    #[test]
    fn os_fs_missing_file_reports_not_found() {
        let dir = tempdir().unwrap();
        let fs = OsFileSystem::new();
        let path = dir.path().join("nope");

        assert!(!fs.exists(&path));
        assert!(matches!(fs.open(&path), Err(StorageError::NotFound { .. })));
        assert!(matches!(fs.size(&path), Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn os_fs_delete_missing_is_noop() {
        let dir = tempdir().unwrap();
        let fs = OsFileSystem::new();
        let path = dir.path().join("transaction.log.0");
        fs.create(&path).unwrap();

        assert!(fs.delete(&path).unwrap());
        assert!(!fs.delete(&path).unwrap());
    }

    #[test]
    fn os_fs_list_skips_directories() {
        let dir = tempdir().unwrap();
        let fs = OsFileSystem::new();
        fs.create(&dir.path().join("a.0")).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let listed = fs.list(dir.path()).unwrap();
        assert_eq!(listed, vec![dir.path().join("a.0")]);
        assert!(fs.list(&dir.path().join("missing")).unwrap().is_empty());
    }
}
