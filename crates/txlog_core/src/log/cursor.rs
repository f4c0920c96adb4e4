//! Grouping of decoded entries into committed batches.

use crate::error::{CoreError, CoreResult};
use crate::log::channel::ReadAheadLogChannel;
use crate::log::entry::{
    ChunkEndEntry, ChunkStartEntry, CommandEntry, CommitEntry, LogEntry, LogEntryReader,
    StartEntry, VersionAwareLogEntryReader,
};
use crate::log::position::LogPosition;

/// A whole transaction that was never chunked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedTransactionRepresentation {
    /// Opening entry.
    pub start: StartEntry,
    /// Commands in log order.
    pub commands: Vec<CommandEntry>,
    /// Closing entry.
    pub commit: CommitEntry,
    /// Where the start entry was read.
    pub start_position: LogPosition,
}

/// What opened a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOpener {
    /// First chunk of the transaction.
    Start(StartEntry),
    /// Explicit follow-up chunk start.
    ChunkStart(ChunkStartEntry),
    /// The chunk directly follows the end of the previous one.
    PrecedingBoundary(ChunkEndEntry),
}

/// What closed a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkBoundary {
    /// More chunks follow.
    ChunkEnd(ChunkEndEntry),
    /// Last chunk of the transaction.
    Commit(CommitEntry),
}

/// One chunk of a chunked transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedChunkRepresentation {
    /// Opening entry of the chunk.
    pub opener: ChunkOpener,
    /// Commands in log order.
    pub commands: Vec<CommandEntry>,
    /// Closing entry of the chunk.
    pub boundary: ChunkBoundary,
    /// Where the chunk's first entry was read.
    pub start_position: LogPosition,
}

/// A unit of replay produced by [`CommittedCommandBatchCursor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommittedCommandBatch {
    /// Complete transaction.
    Transaction(CommittedTransactionRepresentation),
    /// One chunk of a chunked transaction.
    Chunk(CommittedChunkRepresentation),
}

impl CommittedCommandBatch {
    /// Returns the commands of the batch.
    #[must_use]
    pub fn commands(&self) -> &[CommandEntry] {
        match self {
            Self::Transaction(tx) => &tx.commands,
            Self::Chunk(chunk) => &chunk.commands,
        }
    }

    /// Returns the transaction the batch belongs to.
    #[must_use]
    pub fn tx_id(&self) -> u64 {
        match self {
            Self::Transaction(tx) => tx.commit.tx_id,
            Self::Chunk(chunk) => match chunk.boundary {
                ChunkBoundary::ChunkEnd(end) => end.tx_id,
                ChunkBoundary::Commit(commit) => commit.tx_id,
            },
        }
    }

    /// Returns the position of the batch's first entry.
    #[must_use]
    pub fn start_position(&self) -> LogPosition {
        match self {
            Self::Transaction(tx) => tx.start_position,
            Self::Chunk(chunk) => chunk.start_position,
        }
    }

    /// Returns `true` for a chunk.
    #[must_use]
    pub fn is_chunk(&self) -> bool {
        matches!(self, Self::Chunk(_))
    }

    /// Returns `true` if the batch completes its transaction.
    #[must_use]
    pub fn is_last(&self) -> bool {
        match self {
            Self::Transaction(_) => true,
            Self::Chunk(chunk) => matches!(chunk.boundary, ChunkBoundary::Commit(_)),
        }
    }
}

/// Accumulation of the batch being read.
#[derive(Debug, Default)]
struct Accumulation {
    opener: Option<ChunkOpener>,
    commands: Vec<CommandEntry>,
    chunked: bool,
    start_position: Option<LogPosition>,
}

impl Accumulation {
    fn open(&mut self, opener: ChunkOpener, position: LogPosition) {
        self.opener = Some(opener);
        self.commands.clear();
        self.start_position = Some(position);
    }

    fn take(&mut self) -> Option<(ChunkOpener, Vec<CommandEntry>, LogPosition)> {
        let opener = self.opener.take()?;
        let position = self.start_position.take().unwrap_or(LogPosition::UNSPECIFIED);
        Some((opener, std::mem::take(&mut self.commands), position))
    }
}

fn outside_transaction(what: &str, position: LogPosition) -> CoreError {
    CoreError::log_corruption(format!("{what} at {position} outside of any transaction"))
}

/// Reads committed transactions and chunks from the log.
///
/// Entries are accumulated until a boundary arrives:
/// - `Start` opens a transaction, dropping any accumulation without one
/// - `Command` is appended to the open accumulation
/// - `ChunkEnd` closes a chunk and opens the next chunk of the same
///   transaction
/// - `ChunkStart` marks the transaction as chunked; it becomes the opener
///   of a chunk following a `ChunkEnd` without dropping its commands
/// - `Commit` closes a plain transaction, or the last chunk once the
///   transaction has seen any chunk boundary
///
/// Reaching the end of the stream with an open accumulation is normal
/// termination: no batch is produced. The accumulation is kept, so a
/// cursor tailing a growing log completes the batch once its boundary
/// entry is written.
///
/// # Thread Safety
///
/// A cursor owns its channel and must not be shared between threads.
pub struct CommittedCommandBatchCursor<R: LogEntryReader = VersionAwareLogEntryReader> {
    channel: ReadAheadLogChannel,
    reader: R,
    current: Option<CommittedCommandBatch>,
    accumulation: Accumulation,
}

impl CommittedCommandBatchCursor<VersionAwareLogEntryReader> {
    /// Creates a cursor with the default entry reader.
    #[must_use]
    pub fn new(channel: ReadAheadLogChannel) -> Self {
        Self::with_reader(channel, VersionAwareLogEntryReader::new())
    }
}

impl<R: LogEntryReader> CommittedCommandBatchCursor<R> {
    /// Creates a cursor decoding entries with `reader`.
    #[must_use]
    pub fn with_reader(channel: ReadAheadLogChannel, reader: R) -> Self {
        Self {
            channel,
            reader,
            current: None,
            accumulation: Accumulation::default(),
        }
    }

    /// Advances to the next batch.
    ///
    /// Returns `false` at the end of the stream, after which [`Self::get`]
    /// returns `None`. Iterating the cursor calls this and takes each batch.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, undecodable entries, or entries
    /// that arrive outside any transaction.
    pub fn advance(&mut self) -> CoreResult<bool> {
        self.current = None;
        loop {
            let Some((position, entry)) = self.reader.read_log_entry(&mut self.channel)? else {
                return Ok(false);
            };

            if let Some(batch) = self.accept(position, entry)? {
                self.current = Some(batch);
                return Ok(true);
            }
        }
    }

    /// Returns the batch produced by the last successful [`Self::advance`].
    #[must_use]
    pub fn get(&self) -> Option<&CommittedCommandBatch> {
        self.current.as_ref()
    }

    /// Takes ownership of the current batch.
    pub fn take(&mut self) -> Option<CommittedCommandBatch> {
        self.current.take()
    }

    /// Position right after the last consumed entry.
    #[must_use]
    pub fn position(&self) -> LogPosition {
        self.channel.current_log_position()
    }

    fn accept(
        &mut self,
        position: LogPosition,
        entry: LogEntry,
    ) -> CoreResult<Option<CommittedCommandBatch>> {
        let acc = &mut self.accumulation;
        match entry {
            LogEntry::Start(start) => {
                acc.chunked = false;
                acc.open(ChunkOpener::Start(start), position);
                Ok(None)
            }
            LogEntry::ChunkStart(chunk_start) => {
                acc.chunked = true;
                match acc.opener {
                    Some(ChunkOpener::PrecedingBoundary(_)) if !acc.commands.is_empty() => {
                        // commands after the boundary already belong to this chunk
                        acc.opener = Some(ChunkOpener::ChunkStart(chunk_start));
                    }
                    None | Some(ChunkOpener::PrecedingBoundary(_)) => {
                        acc.open(ChunkOpener::ChunkStart(chunk_start), position);
                    }
                    Some(_) => {}
                }
                Ok(None)
            }
            LogEntry::Command(command) => {
                if acc.opener.is_none() {
                    return Err(outside_transaction("command", position));
                }
                acc.commands.push(command);
                Ok(None)
            }
            LogEntry::ChunkEnd(chunk_end) => {
                let Some((opener, commands, start_position)) = acc.take() else {
                    return Err(outside_transaction("chunk end", position));
                };
                acc.chunked = true;
                let batch = CommittedChunkRepresentation {
                    opener,
                    commands,
                    boundary: ChunkBoundary::ChunkEnd(chunk_end),
                    start_position,
                };
                acc.open(ChunkOpener::PrecedingBoundary(chunk_end), position);
                Ok(Some(CommittedCommandBatch::Chunk(batch)))
            }
            LogEntry::Commit(commit) => {
                let Some((opener, commands, start_position)) = acc.take() else {
                    return Err(outside_transaction("commit", position));
                };
                let chunked = std::mem::take(&mut acc.chunked);
                let batch = match opener {
                    ChunkOpener::Start(start) if !chunked => {
                        CommittedCommandBatch::Transaction(CommittedTransactionRepresentation {
                            start,
                            commands,
                            commit,
                            start_position,
                        })
                    }
                    opener => CommittedCommandBatch::Chunk(CommittedChunkRepresentation {
                        opener,
                        commands,
                        boundary: ChunkBoundary::Commit(commit),
                        start_position,
                    }),
                };
                Ok(Some(batch))
            }
        }
    }
}

impl<R: LogEntryReader> Iterator for CommittedCommandBatchCursor<R> {
    type Item = CoreResult<CommittedCommandBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(true) => self.take().map(Ok),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
