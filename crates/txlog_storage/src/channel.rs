//! Store channel trait definition.

use crate::error::StorageResult;

/// A positional byte store backing one log file.
///
/// Channels are **opaque byte stores**. They provide simple operations
/// for reading at an offset, appending, and flushing. txlog_core owns all
/// format interpretation - channels do not understand headers or entries.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` never reads past the current size; a read that starts at or
///   beyond the end returns `0`
/// - a short read only happens at the end of the data
/// - Channels must be `Send + Sync` so they can move between threads
///
/// # Implementors
///
/// - [`super::InMemoryChannel`] - For testing
/// - [`super::FileChannel`] - For persistent storage
pub trait StoreChannel: Send + Sync {
    /// Reads up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes read, which is smaller than `buf.len()`
    /// only when the end of the data is reached.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<usize>;

    /// Appends data to the end of the channel.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Flushes all pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size of the channel in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;
}
