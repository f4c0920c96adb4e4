//! Per-segment facts consumed by retention thresholds.

use crate::error::CoreResult;
use crate::log::entry::{LogEntry, LogEntryReader, VersionAwareLogEntryReader};
use crate::log::files::LogFiles;
use std::sync::Arc;

/// Answers questions about segment contents without exposing the format.
///
/// `Ok(None)` means the segment or the requested record does not exist.
pub trait LogFileInformation: Send + Sync {
    /// First append index stored in `version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be read.
    fn first_entry_append_index(&self, version: u64) -> CoreResult<Option<u64>>;

    /// Last append index written to the log as a whole.
    fn last_entry_append_index(&self) -> u64;

    /// Time written of the first transaction or chunk start in `version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment cannot be read or decoded.
    fn first_start_record_timestamp(&self, version: u64) -> CoreResult<Option<u64>>;
}

/// Source of the last append index, owned by the appender.
pub type AppendIndexSource = Arc<dyn Fn() -> u64 + Send + Sync>;

/// [`LogFileInformation`] backed by segment headers and entries.
#[derive(Clone)]
pub struct TransactionLogFileInformation {
    log_files: LogFiles,
    last_append_index: AppendIndexSource,
}

impl TransactionLogFileInformation {
    /// Creates an information source over `log_files`.
    #[must_use]
    pub fn new(log_files: LogFiles, last_append_index: AppendIndexSource) -> Self {
        Self {
            log_files,
            last_append_index,
        }
    }

    /// Creates an information source with a fixed last append index.
    #[must_use]
    pub fn with_fixed_last_append_index(log_files: LogFiles, last_append_index: u64) -> Self {
        Self::new(log_files, Arc::new(move || last_append_index))
    }
}

impl LogFileInformation for TransactionLogFileInformation {
    fn first_entry_append_index(&self, version: u64) -> CoreResult<Option<u64>> {
        Ok(self
            .log_files
            .extract_header(version)?
            .map(|header| header.last_append_index + 1))
    }

    fn last_entry_append_index(&self) -> u64 {
        (self.last_append_index)()
    }

    fn first_start_record_timestamp(&self, version: u64) -> CoreResult<Option<u64>> {
        let Some(header) = self.log_files.extract_header(version)? else {
            return Ok(None);
        };

        let mut channel = self.log_files.raw_reader(header.start_position())?;
        let mut reader = VersionAwareLogEntryReader::new();
        while let Some((_, entry)) = reader.read_log_entry(&mut channel)? {
            match entry {
                LogEntry::Start(start) => return Ok(Some(start.time_written)),
                LogEntry::ChunkStart(chunk) => return Ok(Some(chunk.time_written)),
                _ => {}
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for TransactionLogFileInformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLogFileInformation")
            .field("log_files", &self.log_files)
            .field("last_append_index", &(self.last_append_index)())
            .finish()
    }
}
