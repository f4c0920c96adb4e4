//! Test fixtures and log layout helpers.
//!
//! Provides a [`LogFixture`] that writes segments, raw bytes and checkpoint
//! files through a [`FileSystem`], plus builders for transaction entries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use txlog_core::log::{
    write_log_header, ChunkEndEntry, ChunkStartEntry, CommitEntry, LogEntry, LogEntryWriter,
    LogHeader, StartEntry, StoreId, KERNEL_VERSION,
};
use txlog_core::{LogConfig, LogFiles, LogPosition};
use txlog_storage::{FileSystem, InMemoryFileSystem, OsFileSystem};

/// A log directory with automatic cleanup.
pub struct LogFixture {
    fs: Arc<dyn FileSystem>,
    directory: PathBuf,
    config: LogConfig,
    log_files: LogFiles,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl LogFixture {
    /// Creates a fixture over an in-memory file system.
    pub fn memory() -> Self {
        Self::new(Arc::new(InMemoryFileSystem::new()), PathBuf::from("logs"), None)
    }

    /// Creates a fixture in a fresh temporary directory.
    pub fn on_disk() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let directory = temp_dir.path().join("logs");
        Self::new(Arc::new(OsFileSystem::new()), directory, Some(temp_dir))
    }

    fn new(fs: Arc<dyn FileSystem>, directory: PathBuf, temp_dir: Option<TempDir>) -> Self {
        let config = LogConfig::default();
        let log_files = LogFiles::from_config(fs.clone(), &directory, &config);
        Self {
            fs,
            directory,
            config,
            log_files,
            _temp_dir: temp_dir,
        }
    }

    /// Replaces the configuration. Files already written keep their names.
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.log_files = LogFiles::from_config(self.fs.clone(), &self.directory, &config);
        self.config = config;
        self
    }

    /// Returns the file system.
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Returns the log directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the configuration.
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Returns the transaction log files. All calls share one header cache.
    pub fn log_files(&self) -> LogFiles {
        self.log_files.clone()
    }

    /// Writes segment `version` holding `entries`, replacing any existing
    /// file. Returns the position right after the last entry.
    pub fn write_segment(&self, version: u64, last_append_index: u64, entries: &[LogEntry]) -> LogPosition {
        let path = self.log_files.log_file_for_version(version);
        self.fs.delete(&path).expect("Failed to replace segment");
        self.log_files.header_cache().remove(version);

        let mut channel = self.fs.create(&path).expect("Failed to create segment");
        let header = LogHeader::new(
            version,
            last_append_index,
            StoreId::default(),
            1024 * 1024,
            0,
            KERNEL_VERSION,
        );
        write_log_header(channel.as_mut(), &header).expect("Failed to write header");

        let mut writer = LogEntryWriter::new(channel.as_mut());
        for entry in entries {
            writer.write(entry).expect("Failed to write entry");
        }
        let size = channel.size().expect("Failed to read segment size");
        LogPosition::new(version, size)
    }

    /// Appends entries to an existing segment.
    pub fn append_entries(&self, version: u64, entries: &[LogEntry]) {
        let path = self.log_files.log_file_for_version(version);
        let mut channel = self.fs.create(&path).expect("Failed to open segment");
        let mut writer = LogEntryWriter::new(channel.as_mut());
        for entry in entries {
            writer.write(entry).expect("Failed to write entry");
        }
    }

    /// Appends raw bytes to the file of `version`, creating it if missing.
    pub fn append_raw(&self, version: u64, bytes: &[u8]) {
        let path = self.log_files.log_file_for_version(version);
        let mut channel = self.fs.create(&path).expect("Failed to open segment");
        channel.append(bytes).expect("Failed to append");
    }

    /// Lays out a log from version 0, one segment per outer element and
    /// one transaction per inner element.
    ///
    /// Each header carries the number of transactions written before it.
    /// Returns the last append index.
    pub fn write_log(&self, segments: &[Vec<Vec<LogEntry>>]) -> u64 {
        let mut last_append_index = 0;
        for (version, transactions) in segments.iter().enumerate() {
            let entries: Vec<LogEntry> = transactions.iter().flatten().cloned().collect();
            self.write_segment(version as u64, last_append_index, &entries);
            last_append_index += transactions.len() as u64;
        }
        last_append_index
    }

    /// Writes checkpoint file `version`.
    pub fn write_checkpoint(&self, version: u64) {
        let path = self
            .directory
            .join(format!("{}.{version}", self.config.checkpoint_base_name));
        let mut channel = self.fs.create(&path).expect("Failed to create checkpoint");
        channel.append(&version.to_le_bytes()).expect("Failed to write checkpoint");
    }

    /// Returns the existing checkpoint versions in ascending order.
    pub fn checkpoint_versions(&self) -> Vec<u64> {
        let prefix = format!("{}.", self.config.checkpoint_base_name);
        let mut versions: Vec<u64> = self
            .fs
            .list(&self.directory)
            .expect("Failed to list directory")
            .iter()
            .filter_map(|path| path.file_name()?.to_str()?.strip_prefix(prefix.as_str())?.parse().ok())
            .collect();
        versions.sort_unstable();
        versions
    }
}

/// Entries of a plain transaction.
pub fn transaction(tx_id: u64, time_written: u64, commands: Vec<Vec<u8>>) -> Vec<LogEntry> {
    let mut entries = Vec::with_capacity(commands.len() + 2);
    entries.push(LogEntry::Start(StartEntry {
        time_written,
        last_committed_tx: tx_id.saturating_sub(1),
        append_index: tx_id,
        additional_header: Vec::new(),
    }));
    entries.extend(commands.into_iter().map(LogEntry::command));
    entries.push(LogEntry::Commit(CommitEntry {
        tx_id,
        time_written,
        checksum: checksum(tx_id),
    }));
    entries
}

/// Entries of a transaction split into `chunks`.
///
/// Chunks after the first open with a chunk start; every chunk but the
/// last closes with a chunk end and the last one with a commit.
pub fn chunked_transaction(tx_id: u64, time_written: u64, chunks: Vec<Vec<Vec<u8>>>) -> Vec<LogEntry> {
    let count = chunks.len() as u64;
    let mut entries = Vec::new();
    for (index, commands) in chunks.into_iter().enumerate() {
        let chunk_id = index as u64 + 1;
        if chunk_id == 1 {
            entries.push(LogEntry::Start(StartEntry {
                time_written,
                last_committed_tx: tx_id.saturating_sub(1),
                append_index: tx_id,
                additional_header: Vec::new(),
            }));
        } else {
            entries.push(LogEntry::ChunkStart(ChunkStartEntry {
                time_written,
                chunk_id,
                append_index: tx_id,
            }));
        }
        entries.extend(commands.into_iter().map(LogEntry::command));
        if chunk_id < count {
            entries.push(LogEntry::ChunkEnd(ChunkEndEntry {
                tx_id,
                chunk_id,
                checksum: checksum(tx_id),
            }));
        }
    }
    entries.push(LogEntry::Commit(CommitEntry {
        tx_id,
        time_written,
        checksum: checksum(tx_id),
    }));
    entries
}

fn checksum(tx_id: u64) -> u32 {
    (tx_id as u32).wrapping_mul(0x9E37_79B9)
}
