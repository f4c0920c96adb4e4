//! Log layout helpers shared by unit tests.

use crate::log::entry::{
    ChunkEndEntry, ChunkStartEntry, CommitEntry, LogEntry, LogEntryWriter, StartEntry,
    KERNEL_VERSION,
};
use crate::log::files::LogFiles;
use crate::log::header::{LogHeader, LogHeaderCache, StoreId};
use std::path::Path;
use std::sync::Arc;
use txlog_storage::{FileSystem, InMemoryFileSystem};

pub const DIR: &str = "logs";
pub const BASE: &str = "transaction.log";

/// Writes segments into an in-memory file system.
pub struct LogBuilder {
    pub fs: Arc<InMemoryFileSystem>,
    files: LogFiles,
}

impl LogBuilder {
    pub fn new() -> Self {
        let fs = Arc::new(InMemoryFileSystem::new());
        let files = LogFiles::new(
            fs.clone(),
            DIR,
            BASE,
            Arc::new(LogHeaderCache::new(16)),
            // small buffer so tests cross refill boundaries
            32,
        );
        Self { fs, files }
    }

    pub fn log_files(&self) -> LogFiles {
        self.files.clone()
    }

    /// Writes segment `version` with a header and `entries`.
    pub fn segment(&self, version: u64, last_append_index: u64, entries: &[LogEntry]) {
        let path = self.files.log_file_for_version(version);
        self.fs.write_file(&path, header_only(version, last_append_index));
        let mut channel = self.fs.create(&path).unwrap();
        let mut writer = LogEntryWriter::new(channel.as_mut());
        for entry in entries {
            writer.write(entry).unwrap();
        }
    }

    /// Appends raw bytes to segment `version`.
    pub fn append_raw(&self, version: u64, bytes: &[u8]) {
        let path = self.files.log_file_for_version(version);
        self.fs.create(&path).unwrap().append(bytes).unwrap();
    }

    /// Writes an arbitrary file next to the segments.
    pub fn write_file(&self, name: &str, data: Vec<u8>) {
        self.fs.write_file(&Path::new(DIR).join(name), data);
    }
}

/// Encoded header of `version` with nothing after it.
pub fn header_only(version: u64, last_append_index: u64) -> Vec<u8> {
    LogHeader::new(version, last_append_index, StoreId::default(), 0, 0, KERNEL_VERSION)
        .encode()
        .to_vec()
}

pub fn start(append_index: u64, time_written: u64) -> LogEntry {
    LogEntry::Start(StartEntry {
        time_written,
        last_committed_tx: append_index.saturating_sub(1),
        append_index,
        additional_header: Vec::new(),
    })
}

pub fn commit(tx_id: u64, time_written: u64) -> LogEntry {
    LogEntry::Commit(CommitEntry {
        tx_id,
        time_written,
        checksum: 0,
    })
}

pub fn chunk_start(chunk_id: u64, time_written: u64) -> LogEntry {
    LogEntry::ChunkStart(ChunkStartEntry {
        time_written,
        chunk_id,
        append_index: chunk_id,
    })
}

pub fn chunk_end(tx_id: u64, chunk_id: u64) -> LogEntry {
    LogEntry::ChunkEnd(ChunkEndEntry {
        tx_id,
        chunk_id,
        checksum: 0,
    })
}
