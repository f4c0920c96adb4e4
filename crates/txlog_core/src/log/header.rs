//! Segment headers and the header cache.
//!
//! ## Header Format
//!
//! Every segment starts with a fixed 64-byte little-endian header:
//!
//! ```text
//! | format (1) + log version (7) | last append index (8) | store id (24) |
//! | segment block size (4) | previous checksum (4) | kernel version (1) | zero padding (15) |
//! ```
//!
//! The format version shares the first word with the log version: the top
//! byte holds the format, the low 56 bits hold the version. A header whose
//! format byte is zero has not been written yet.

use crate::error::{CoreError, CoreResult};
use crate::log::position::LogPosition;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use txlog_storage::StoreChannel;

/// Size of a segment header in bytes.
pub const LOG_HEADER_SIZE: usize = 64;

/// Header format written by this crate.
pub const CURRENT_FORMAT_VERSION: u8 = 1;

const VERSION_MASK: u64 = 0x00FF_FFFF_FFFF_FFFF;

/// Identity of the store that owns the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StoreId {
    /// Store creation time in milliseconds.
    pub creation_time: u64,
    /// Random discriminator chosen at creation.
    pub random: u64,
    /// Store format version.
    pub store_version: u64,
}

/// Per-segment metadata, written once when the segment is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    /// Header format version.
    pub format_version: u8,
    /// Version of the segment this header belongs to.
    pub log_version: u64,
    /// Last append index written to the previous segment.
    pub last_append_index: u64,
    /// Owning store.
    pub store_id: StoreId,
    /// Upper bound for the segment size.
    pub segment_block_size: u32,
    /// Checksum of the last entry in the previous segment.
    pub previous_checksum: u32,
    /// Kernel (schema) version active when the segment was created.
    pub kernel_version: u8,
}

impl LogHeader {
    /// Creates a header in the current format.
    #[must_use]
    pub fn new(
        log_version: u64,
        last_append_index: u64,
        store_id: StoreId,
        segment_block_size: u32,
        previous_checksum: u32,
        kernel_version: u8,
    ) -> Self {
        Self {
            format_version: CURRENT_FORMAT_VERSION,
            log_version,
            last_append_index,
            store_id,
            segment_block_size,
            previous_checksum,
            kernel_version,
        }
    }

    /// Position of the first entry in this segment.
    #[must_use]
    pub fn start_position(&self) -> LogPosition {
        LogPosition::new(self.log_version, LOG_HEADER_SIZE as u64)
    }

    /// Serializes the header.
    ///
    /// Only the low 56 bits of `log_version` are stored.
    #[must_use]
    pub fn encode(&self) -> [u8; LOG_HEADER_SIZE] {
        let mut buf = [0u8; LOG_HEADER_SIZE];
        let packed = (u64::from(self.format_version) << 56) | (self.log_version & VERSION_MASK);
        buf[0..8].copy_from_slice(&packed.to_le_bytes());
        buf[8..16].copy_from_slice(&self.last_append_index.to_le_bytes());
        buf[16..24].copy_from_slice(&self.store_id.creation_time.to_le_bytes());
        buf[24..32].copy_from_slice(&self.store_id.random.to_le_bytes());
        buf[32..40].copy_from_slice(&self.store_id.store_version.to_le_bytes());
        buf[40..44].copy_from_slice(&self.segment_block_size.to_le_bytes());
        buf[44..48].copy_from_slice(&self.previous_checksum.to_le_bytes());
        buf[48] = self.kernel_version;
        buf
    }

    /// Parses a header.
    ///
    /// Returns `Ok(None)` if the format byte is zero (header not written
    /// yet).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidHeader`] for an unknown format or a
    /// version that does not match `expected_version`.
    pub fn decode(bytes: &[u8; LOG_HEADER_SIZE], expected_version: u64) -> CoreResult<Option<Self>> {
        let word = |at: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[at..at + 8]);
            u64::from_le_bytes(raw)
        };
        let half = |at: usize| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&bytes[at..at + 4]);
            u32::from_le_bytes(raw)
        };

        let packed = word(0);
        let format_version = (packed >> 56) as u8;
        if format_version == 0 {
            return Ok(None);
        }
        if format_version > CURRENT_FORMAT_VERSION {
            return Err(CoreError::invalid_header(
                expected_version,
                format!("unsupported header format {format_version}"),
            ));
        }

        let log_version = packed & VERSION_MASK;
        if log_version != expected_version & VERSION_MASK {
            return Err(CoreError::invalid_header(
                expected_version,
                format!("header carries version {log_version}"),
            ));
        }

        Ok(Some(Self {
            format_version,
            log_version: expected_version,
            last_append_index: word(8),
            store_id: StoreId {
                creation_time: word(16),
                random: word(24),
                store_version: word(32),
            },
            segment_block_size: half(40),
            previous_checksum: half(44),
            kernel_version: bytes[48],
        }))
    }
}

/// Reads the header at the start of `channel`.
///
/// A short read means the appender has not finished writing the header and
/// yields `Ok(None)`, as does an all-zero header.
///
/// # Errors
///
/// Returns an error on I/O failure or an invalid header.
pub fn read_log_header(
    channel: &dyn StoreChannel,
    expected_version: u64,
) -> CoreResult<Option<LogHeader>> {
    let mut buf = [0u8; LOG_HEADER_SIZE];
    let read = channel.read_at(0, &mut buf)?;
    if read < LOG_HEADER_SIZE {
        return Ok(None);
    }
    LogHeader::decode(&buf, expected_version)
}

/// Writes `header` to an empty channel.
///
/// # Errors
///
/// Returns an error if the channel already holds data or the write fails.
pub fn write_log_header(channel: &mut dyn StoreChannel, header: &LogHeader) -> CoreResult<()> {
    if channel.size()? != 0 {
        return Err(CoreError::invalid_argument(format!(
            "header for version {} must be written to an empty file",
            header.log_version
        )));
    }
    channel.append(&header.encode())?;
    Ok(())
}

/// Bounded LRU cache of parsed headers, keyed by version.
pub struct LogHeaderCache {
    headers: Mutex<LruCache<u64, LogHeader>>,
}

impl LogHeaderCache {
    /// Creates a cache holding at most `capacity` headers (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            headers: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Caches the header of `version`.
    pub fn put(&self, version: u64, header: LogHeader) {
        self.headers.lock().put(version, header);
    }

    /// Returns the cached header of `version`.
    #[must_use]
    pub fn get(&self, version: u64) -> Option<LogHeader> {
        self.headers.lock().get(&version).copied()
    }

    /// Drops the cached header of `version`.
    pub fn remove(&self, version: u64) {
        self.headers.lock().pop(&version);
    }

    /// Empties the cache.
    pub fn clear(&self) {
        self.headers.lock().clear();
    }

    /// Returns the number of cached headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.lock().len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for LogHeaderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers = self.headers.lock();
        f.debug_struct("LogHeaderCache")
            .field("len", &headers.len())
            .field("capacity", &headers.cap())
            .finish()
    }
}
