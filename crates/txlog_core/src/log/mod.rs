//! Transaction log reading pipeline.
//!
//! The log is a sequence of monotonically numbered segments ("versions").
//! Each segment is a flat file holding a fixed-size [`LogHeader`] followed
//! by a stream of entries:
//!
//! ```text
//! | header (64) | version (1) | type (1) | body | version (1) | type (1) | body | ... | 0 0 0 ...
//! ```
//!
//! A zero version byte marks the end of written entries.
//!
//! ## Read Path
//!
//! - [`LogFiles`] resolves versions to paths and parses headers through the
//!   [`LogHeaderCache`]
//! - [`ReadAheadLogChannel`] buffers reads and uses a [`LogVersionBridge`] to
//!   move from version `N` to `N + 1` without the caller noticing
//! - [`VersionAwareLogEntryReader`] decodes one [`LogEntry`] per call
//! - [`CommittedCommandBatchCursor`] groups entries into whole transactions
//!   or transaction chunks
//!
//! ## Invariants
//!
//! - Positions reported by a channel are relative to its current segment
//! - The tip segment is never closed by the bridge while it may still grow
//! - A half-written header on the next segment is treated as "not there yet"

mod bridge;
mod channel;
mod cursor;
mod entry;
mod files;
mod header;
mod info;
mod metadata;
mod position;
#[cfg(test)]
pub(crate) mod test_support;

pub use bridge::{LogVersionBridge, NoMoreChannels, ReaderLogVersionBridge};
pub use channel::{PhysicalLogChannel, ReadAheadLogChannel};
pub use cursor::{
    ChunkBoundary, ChunkOpener, CommittedChunkRepresentation, CommittedCommandBatch,
    CommittedCommandBatchCursor, CommittedTransactionRepresentation,
};
pub use entry::{
    ChunkEndEntry, ChunkStartEntry, CommandEntry, CommitEntry, LogEntry, LogEntryReader,
    LogEntryType, LogEntryWriter, StartEntry, VersionAwareLogEntryReader, KERNEL_VERSION,
};
pub use files::LogFiles;
pub use header::{
    read_log_header, write_log_header, LogHeader, LogHeaderCache, StoreId,
    CURRENT_FORMAT_VERSION, LOG_HEADER_SIZE,
};
pub use info::{AppendIndexSource, LogFileInformation, TransactionLogFileInformation};
pub use metadata::{LogVersionLocator, TransactionMetadata, TransactionMetadataCache};
pub use position::{LogPosition, LogPositionMarker};
