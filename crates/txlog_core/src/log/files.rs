//! Version-numbered segment files.

use crate::config::LogConfig;
use crate::error::{CoreError, CoreResult};
use crate::log::bridge::{LogVersionBridge, NoMoreChannels, ReaderLogVersionBridge};
use crate::log::channel::{PhysicalLogChannel, ReadAheadLogChannel};
use crate::log::header::{read_log_header, LogHeader, LogHeaderCache, LOG_HEADER_SIZE};
use crate::log::metadata::{LogVersionLocator, TransactionMetadataCache};
use crate::log::position::LogPosition;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use txlog_storage::FileSystem;

/// The set of segment files sharing one base name in one directory.
///
/// Version `N` lives in `<directory>/<base_name>.N`. Cloning is cheap; all
/// clones share the file system and the header cache.
#[derive(Clone)]
pub struct LogFiles {
    fs: Arc<dyn FileSystem>,
    directory: PathBuf,
    base_name: String,
    header_cache: Arc<LogHeaderCache>,
    read_ahead_size: usize,
}

impl LogFiles {
    /// Creates a view over `<directory>/<base_name>.*`.
    #[must_use]
    pub fn new(
        fs: Arc<dyn FileSystem>,
        directory: impl Into<PathBuf>,
        base_name: impl Into<String>,
        header_cache: Arc<LogHeaderCache>,
        read_ahead_size: usize,
    ) -> Self {
        Self {
            fs,
            directory: directory.into(),
            base_name: base_name.into(),
            header_cache,
            read_ahead_size,
        }
    }

    /// Creates the transaction log view described by `config`.
    #[must_use]
    pub fn from_config(fs: Arc<dyn FileSystem>, directory: impl Into<PathBuf>, config: &LogConfig) -> Self {
        Self::new(
            fs,
            directory,
            config.base_name.clone(),
            Arc::new(LogHeaderCache::new(config.header_cache_capacity)),
            config.read_ahead_size,
        )
    }

    /// Returns the file system.
    #[must_use]
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Returns the log directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the base name.
    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Returns the shared header cache.
    #[must_use]
    pub fn header_cache(&self) -> &Arc<LogHeaderCache> {
        &self.header_cache
    }

    /// Path of the file holding `version`.
    #[must_use]
    pub fn log_file_for_version(&self, version: u64) -> PathBuf {
        self.directory.join(format!("{}.{version}", self.base_name))
    }

    /// Extracts the version from a file name, if it belongs to this log.
    #[must_use]
    pub fn version_of(&self, path: &Path) -> Option<u64> {
        let name = path.file_name()?.to_str()?;
        let suffix = name.strip_prefix(self.base_name.as_str())?.strip_prefix('.')?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        suffix.parse().ok()
    }

    /// Returns all existing versions in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn versions(&self) -> CoreResult<Vec<u64>> {
        let mut versions: Vec<u64> = self
            .fs
            .list(&self.directory)?
            .iter()
            .filter_map(|p| self.version_of(p))
            .collect();
        versions.sort_unstable();
        Ok(versions)
    }

    /// Returns the lowest existing version, or `None` if the log is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn lowest_log_version(&self) -> CoreResult<Option<u64>> {
        Ok(self.versions()?.first().copied())
    }

    /// Returns the highest existing version, or `None` if the log is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn highest_log_version(&self) -> CoreResult<Option<u64>> {
        Ok(self.versions()?.last().copied())
    }

    /// Returns `true` if a file exists for `version`.
    #[must_use]
    pub fn version_exists(&self, version: u64) -> bool {
        self.fs.exists(&self.log_file_for_version(version))
    }

    /// Returns the header of `version`, consulting the cache first.
    ///
    /// Returns `Ok(None)` if the file is missing or its header is not
    /// completely written.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or an invalid header.
    pub fn extract_header(&self, version: u64) -> CoreResult<Option<LogHeader>> {
        if let Some(header) = self.header_cache.get(version) {
            return Ok(Some(header));
        }

        let channel = match self.fs.open(&self.log_file_for_version(version)) {
            Ok(channel) => channel,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let header = read_log_header(channel.as_ref(), version)?;
        if let Some(header) = header {
            self.header_cache.put(version, header);
        }
        Ok(header)
    }

    /// Returns `true` if `version` holds at least one entry.
    ///
    /// Any failure answers `false`.
    #[must_use]
    pub fn has_any_entries(&self, version: u64) -> bool {
        let path = self.log_file_for_version(version);
        match self.fs.size(&path) {
            Ok(size) if size > LOG_HEADER_SIZE as u64 => {}
            _ => return false,
        }
        let Ok(channel) = self.fs.open(&path) else {
            return false;
        };
        let mut first = [0u8; 1];
        matches!(channel.read_at(LOG_HEADER_SIZE as u64, &mut first), Ok(1) if first[0] != 0)
    }

    /// Opens `version`, positioned right after its header.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or its header is incomplete
    /// or invalid.
    pub fn open_for_version(&self, version: u64) -> CoreResult<PhysicalLogChannel> {
        self.try_open_for_version(version)?.ok_or_else(|| {
            CoreError::invalid_header(version, "missing file or incomplete header")
        })
    }

    /// Opens `version` if it exists and its header is completely written.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or an invalid header.
    pub fn try_open_for_version(&self, version: u64) -> CoreResult<Option<PhysicalLogChannel>> {
        let path = self.log_file_for_version(version);
        if !self.fs.exists(&path) {
            return Ok(None);
        }
        let channel = match self.fs.open(&path) {
            Ok(channel) => channel,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let header = match self.header_cache.get(version) {
            Some(header) => header,
            None => match read_log_header(channel.as_ref(), version)? {
                Some(header) => {
                    self.header_cache.put(version, header);
                    header
                }
                None => return Ok(None),
            },
        };
        Ok(Some(PhysicalLogChannel::new(channel, header)))
    }

    /// Opens a reader at `position` that bridges into later versions.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment cannot be opened or `position`
    /// points into its header.
    pub fn reader(&self, position: LogPosition) -> CoreResult<ReadAheadLogChannel> {
        self.reader_with_bridge(position, Box::new(ReaderLogVersionBridge::new(self.clone())), false)
    }

    /// Opens a reader at `position` that stops at the end of its segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment cannot be opened or `position`
    /// points into its header.
    pub fn raw_reader(&self, position: LogPosition) -> CoreResult<ReadAheadLogChannel> {
        self.reader_with_bridge(position, Box::new(NoMoreChannels), true)
    }

    /// Opens a reader at `position` using a caller-supplied bridge.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment cannot be opened or `position`
    /// points into its header.
    pub fn reader_with_bridge(
        &self,
        position: LogPosition,
        bridge: Box<dyn LogVersionBridge>,
        raw: bool,
    ) -> CoreResult<ReadAheadLogChannel> {
        let mut channel = self.open_for_version(position.version())?;
        channel.set_position(position.offset())?;
        Ok(ReadAheadLogChannel::new(channel, bridge, self.read_ahead_size, raw))
    }

    /// Walks segment headers from the highest version down.
    ///
    /// For each segment the visitor receives the header, the position of
    /// its first entry, and the inclusive range of append indexes it holds.
    /// `last_append_index` bounds the newest segment. The walk stops when
    /// the visitor returns `false` or a version is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or a header cannot be read.
    pub fn visit_headers_newest_first<F>(&self, last_append_index: u64, mut visitor: F) -> CoreResult<()>
    where
        F: FnMut(&LogHeader, LogPosition, u64, u64) -> bool,
    {
        let Some(mut version) = self.highest_log_version()? else {
            return Ok(());
        };
        let mut high = last_append_index;
        while self.version_exists(version) {
            if let Some(header) = self.extract_header(version)? {
                let low = header.last_append_index + 1;
                if !visitor(&header, header.start_position(), low, high) {
                    break;
                }
                high = header.last_append_index;
            }
            if version == 0 {
                break;
            }
            version -= 1;
        }
        Ok(())
    }

    /// Finds the start of the segment holding transaction `tx_id`.
    ///
    /// The metadata cache is consulted first; on a miss the segment headers
    /// are scanned with a [`LogVersionLocator`]. The position is the first
    /// entry of the segment, from where a reader scans forward.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoSuchTransaction`] if no segment holds it.
    pub fn locate_transaction(
        &self,
        tx_id: u64,
        last_append_index: u64,
        metadata_cache: &TransactionMetadataCache,
    ) -> CoreResult<LogPosition> {
        if let Some(metadata) = metadata_cache.get_transaction_metadata(tx_id) {
            return Ok(metadata.start_position);
        }

        let mut locator = LogVersionLocator::new(tx_id);
        self.visit_headers_newest_first(last_append_index, |_, position, first, last| {
            locator.visit(first, last, position)
        })?;
        locator.log_position()
    }
}

impl std::fmt::Debug for LogFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFiles")
            .field("directory", &self.directory)
            .field("base_name", &self.base_name)
            .finish()
    }
}
