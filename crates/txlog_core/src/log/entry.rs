//! Log entries and their binary codec.
//!
//! ## Entry Format
//!
//! ```text
//! | kernel version (1) | type (1) | body (N) |
//! ```
//!
//! | Type | Body |
//! |---|---|
//! | Start (1) | time written (8), last committed tx (8), append index (8), header len (4), header (N) |
//! | Command (2) | len (4), payload (N) |
//! | Commit (3) | tx id (8), time written (8), checksum (4) |
//! | ChunkStart (4) | time written (8), chunk id (8), append index (8) |
//! | ChunkEnd (5) | tx id (8), chunk id (8), checksum (4) |
//!
//! A kernel version byte of zero marks the end of written entries. Command
//! payloads are opaque here; the storage engine owns their encoding.

use crate::error::{CoreError, CoreResult};
use crate::log::channel::ReadAheadLogChannel;
use crate::log::position::{LogPosition, LogPositionMarker};
use txlog_storage::StoreChannel;

/// Kernel version written by [`LogEntryWriter`] by default.
pub const KERNEL_VERSION: u8 = 1;

/// Upper bound for a single variable-length field.
const MAX_FIELD_SIZE: u32 = 256 * 1024 * 1024;

/// Type tag of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogEntryType {
    /// Start of a transaction.
    Start = 1,
    /// A storage command.
    Command = 2,
    /// Commit of a transaction (or of its last chunk).
    Commit = 3,
    /// Start of a follow-up chunk.
    ChunkStart = 4,
    /// End of a chunk that is not the last one.
    ChunkEnd = 5,
}

impl LogEntryType {
    /// Converts a byte to an entry type.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Start),
            2 => Some(Self::Command),
            3 => Some(Self::Commit),
            4 => Some(Self::ChunkStart),
            5 => Some(Self::ChunkEnd),
            _ => None,
        }
    }

    /// Converts the entry type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Opens a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartEntry {
    /// Wall-clock time the transaction was written, in milliseconds.
    pub time_written: u64,
    /// Last committed transaction when this one started.
    pub last_committed_tx: u64,
    /// Append index of this batch.
    pub append_index: u64,
    /// Opaque header bytes supplied by the appender.
    pub additional_header: Vec<u8>,
}

/// One storage command, opaque to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    /// Serialized command.
    pub payload: Vec<u8>,
}

/// Closes a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitEntry {
    /// Committed transaction id.
    pub tx_id: u64,
    /// Wall-clock time of the commit, in milliseconds.
    pub time_written: u64,
    /// Checksum over the transaction.
    pub checksum: u32,
}

/// Opens a follow-up chunk of a chunked transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkStartEntry {
    /// Wall-clock time the chunk was written, in milliseconds.
    pub time_written: u64,
    /// Sequence number of the chunk inside its transaction.
    pub chunk_id: u64,
    /// Append index of this chunk.
    pub append_index: u64,
}

/// Closes a chunk that is followed by more chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkEndEntry {
    /// Transaction the chunk belongs to.
    pub tx_id: u64,
    /// Sequence number of the chunk.
    pub chunk_id: u64,
    /// Checksum over the chunk.
    pub checksum: u32,
}

/// A decoded log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// Transaction start.
    Start(StartEntry),
    /// Storage command.
    Command(CommandEntry),
    /// Transaction commit.
    Commit(CommitEntry),
    /// Follow-up chunk start.
    ChunkStart(ChunkStartEntry),
    /// Non-final chunk end.
    ChunkEnd(ChunkEndEntry),
}

impl LogEntry {
    /// Shorthand for a command entry.
    #[must_use]
    pub fn command(payload: Vec<u8>) -> Self {
        Self::Command(CommandEntry { payload })
    }

    /// Returns the entry type.
    #[must_use]
    pub fn entry_type(&self) -> LogEntryType {
        match self {
            Self::Start(_) => LogEntryType::Start,
            Self::Command(_) => LogEntryType::Command,
            Self::Commit(_) => LogEntryType::Commit,
            Self::ChunkStart(_) => LogEntryType::ChunkStart,
            Self::ChunkEnd(_) => LogEntryType::ChunkEnd,
        }
    }

    /// Appends the encoded entry to `buf`.
    ///
    /// # Errors
    ///
    /// Returns an error if `kernel_version` is zero or a variable-length
    /// field is too large.
    pub fn encode(&self, kernel_version: u8, buf: &mut Vec<u8>) -> CoreResult<()> {
        if kernel_version == 0 {
            return Err(CoreError::invalid_argument(
                "kernel version 0 is reserved for the end of the log",
            ));
        }
        buf.push(kernel_version);
        buf.push(self.entry_type().as_byte());

        match self {
            Self::Start(start) => {
                buf.extend_from_slice(&start.time_written.to_le_bytes());
                buf.extend_from_slice(&start.last_committed_tx.to_le_bytes());
                buf.extend_from_slice(&start.append_index.to_le_bytes());
                put_bytes(buf, &start.additional_header)?;
            }
            Self::Command(command) => {
                put_bytes(buf, &command.payload)?;
            }
            Self::Commit(commit) => {
                buf.extend_from_slice(&commit.tx_id.to_le_bytes());
                buf.extend_from_slice(&commit.time_written.to_le_bytes());
                buf.extend_from_slice(&commit.checksum.to_le_bytes());
            }
            Self::ChunkStart(chunk) => {
                buf.extend_from_slice(&chunk.time_written.to_le_bytes());
                buf.extend_from_slice(&chunk.chunk_id.to_le_bytes());
                buf.extend_from_slice(&chunk.append_index.to_le_bytes());
            }
            Self::ChunkEnd(chunk) => {
                buf.extend_from_slice(&chunk.tx_id.to_le_bytes());
                buf.extend_from_slice(&chunk.chunk_id.to_le_bytes());
                buf.extend_from_slice(&chunk.checksum.to_le_bytes());
            }
        }
        Ok(())
    }
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> CoreResult<()> {
    let len = u32::try_from(bytes.len())
        .ok()
        .filter(|len| *len <= MAX_FIELD_SIZE)
        .ok_or_else(|| {
            CoreError::invalid_argument(format!("entry field of {} bytes is too large", bytes.len()))
        })?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Decodes one entry per call from a [`ReadAheadLogChannel`].
pub trait LogEntryReader: Send {
    /// Reads the next entry together with the position it starts at.
    ///
    /// Returns `Ok(None)` at the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or undecodable bytes.
    fn read_log_entry(
        &mut self,
        channel: &mut ReadAheadLogChannel,
    ) -> CoreResult<Option<(LogPosition, LogEntry)>>;
}

/// Default entry decoder.
///
/// End of stream is reported for:
/// - an exhausted stream before the version byte
/// - a zero version byte (unwritten, zero-filled tail)
/// - an entry cut short by the end of the stream; the reader is rewound to
///   the start of that entry so a later call can retry once more bytes land
#[derive(Debug, Default)]
pub struct VersionAwareLogEntryReader {
    marker: LogPositionMarker,
}

impl VersionAwareLogEntryReader {
    /// Creates a new reader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn rewind(&self, channel: &mut ReadAheadLogChannel) -> CoreResult<()> {
        let position = self.marker.new_position();
        if self.marker.is_marker_in_log(channel.log_version()) {
            channel.set_log_position(position)?;
        }
        Ok(())
    }

    fn read_body(channel: &mut ReadAheadLogChannel, at: LogPosition) -> CoreResult<LogEntry> {
        let type_byte = channel.get_u8()?;
        let entry_type = LogEntryType::from_byte(type_byte).ok_or_else(|| {
            CoreError::log_corruption(format!("unknown entry type {type_byte} at {at}"))
        })?;

        let entry = match entry_type {
            LogEntryType::Start => LogEntry::Start(StartEntry {
                time_written: channel.get_u64()?,
                last_committed_tx: channel.get_u64()?,
                append_index: channel.get_u64()?,
                additional_header: read_bytes(channel, at)?,
            }),
            LogEntryType::Command => LogEntry::Command(CommandEntry {
                payload: read_bytes(channel, at)?,
            }),
            LogEntryType::Commit => LogEntry::Commit(CommitEntry {
                tx_id: channel.get_u64()?,
                time_written: channel.get_u64()?,
                checksum: channel.get_u32()?,
            }),
            LogEntryType::ChunkStart => LogEntry::ChunkStart(ChunkStartEntry {
                time_written: channel.get_u64()?,
                chunk_id: channel.get_u64()?,
                append_index: channel.get_u64()?,
            }),
            LogEntryType::ChunkEnd => LogEntry::ChunkEnd(ChunkEndEntry {
                tx_id: channel.get_u64()?,
                chunk_id: channel.get_u64()?,
                checksum: channel.get_u32()?,
            }),
        };
        Ok(entry)
    }
}

fn read_bytes(channel: &mut ReadAheadLogChannel, at: LogPosition) -> CoreResult<Vec<u8>> {
    let len = channel.get_u32()?;
    if len > MAX_FIELD_SIZE {
        return Err(CoreError::log_corruption(format!(
            "entry field length {len} at {at} exceeds maximum"
        )));
    }
    let mut bytes = vec![0u8; len as usize];
    channel.get_bytes(&mut bytes)?;
    Ok(bytes)
}

impl LogEntryReader for VersionAwareLogEntryReader {
    fn read_log_entry(
        &mut self,
        channel: &mut ReadAheadLogChannel,
    ) -> CoreResult<Option<(LogPosition, LogEntry)>> {
        let version = match channel.mark_and_get_version(&mut self.marker) {
            Ok(version) => version,
            Err(e) if e.is_read_past_end() => return Ok(None),
            Err(e) => return Err(e),
        };

        if version == 0 {
            self.rewind(channel)?;
            return Ok(None);
        }

        let position = self.marker.new_position();
        match Self::read_body(channel, position) {
            Ok(entry) => Ok(Some((position, entry))),
            Err(e) if e.is_read_past_end() => {
                self.rewind(channel)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Appends encoded entries to a segment.
///
/// The appender itself lives outside this crate; this writer is used by
/// tooling and tests that lay out logs.
pub struct LogEntryWriter<'a> {
    channel: &'a mut dyn StoreChannel,
    kernel_version: u8,
    buf: Vec<u8>,
}

impl<'a> LogEntryWriter<'a> {
    /// Creates a writer appending to `channel`.
    #[must_use]
    pub fn new(channel: &'a mut dyn StoreChannel) -> Self {
        Self::with_kernel_version(channel, KERNEL_VERSION)
    }

    /// Creates a writer stamping entries with `kernel_version`.
    #[must_use]
    pub fn with_kernel_version(channel: &'a mut dyn StoreChannel, kernel_version: u8) -> Self {
        Self {
            channel,
            kernel_version,
            buf: Vec::new(),
        }
    }

    /// Appends `entry` and returns the offset it was written at.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the append fails.
    pub fn write(&mut self, entry: &LogEntry) -> CoreResult<u64> {
        self.buf.clear();
        entry.encode(self.kernel_version, &mut self.buf)?;
        Ok(self.channel.append(&self.buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::test_support::{commit, start, LogBuilder};

    #[test]
    fn entry_type_from_byte() {
        assert_eq!(LogEntryType::from_byte(1), Some(LogEntryType::Start));
        assert_eq!(LogEntryType::from_byte(5), Some(LogEntryType::ChunkEnd));
        assert_eq!(LogEntryType::from_byte(0), None);
        assert_eq!(LogEntryType::from_byte(9), None);
    }

    #[test]
    fn zero_kernel_version_rejected() {
        let mut buf = Vec::new();
        assert!(LogEntry::command(vec![1]).encode(0, &mut buf).is_err());
    }

    #[test]
    fn reads_entries_with_positions() {
        let builder = LogBuilder::new();
        let entries = vec![start(1, 100), LogEntry::command(vec![1, 2, 3]), commit(1, 101)];
        builder.segment(0, 0, &entries);

        let mut channel = builder.log_files().reader(LogPosition::new(0, 64)).unwrap();
        let mut reader = VersionAwareLogEntryReader::new();

        let (pos, entry) = reader.read_log_entry(&mut channel).unwrap().unwrap();
        assert_eq!(pos, LogPosition::new(0, 64));
        assert_eq!(entry, entries[0]);

        // start: 2 + 8 + 8 + 8 + 4
        let (pos, entry) = reader.read_log_entry(&mut channel).unwrap().unwrap();
        assert_eq!(pos, LogPosition::new(0, 64 + 30));
        assert_eq!(entry, entries[1]);

        let (_, entry) = reader.read_log_entry(&mut channel).unwrap().unwrap();
        assert_eq!(entry, entries[2]);
        assert!(reader.read_log_entry(&mut channel).unwrap().is_none());
    }

    #[test]
    fn zero_version_byte_ends_stream() {
        let builder = LogBuilder::new();
        builder.segment(0, 0, &[LogEntry::command(vec![7])]);
        builder.append_raw(0, &[0u8; 16]);

        let mut channel = builder.log_files().reader(LogPosition::new(0, 64)).unwrap();
        let mut reader = VersionAwareLogEntryReader::new();
        assert!(reader.read_log_entry(&mut channel).unwrap().is_some());
        let end = channel.current_log_position();
        assert!(reader.read_log_entry(&mut channel).unwrap().is_none());
        assert_eq!(channel.current_log_position(), end);
    }

    #[test]
    fn truncated_entry_rewinds_to_its_start() {
        let builder = LogBuilder::new();
        builder.segment(0, 0, &[LogEntry::command(vec![7])]);
        let mut partial = Vec::new();
        commit(3, 5).encode(KERNEL_VERSION, &mut partial).unwrap();
        builder.append_raw(0, &partial[..6]);

        let mut channel = builder.log_files().reader(LogPosition::new(0, 64)).unwrap();
        let mut reader = VersionAwareLogEntryReader::new();
        reader.read_log_entry(&mut channel).unwrap().unwrap();
        let before = channel.current_log_position();

        assert!(reader.read_log_entry(&mut channel).unwrap().is_none());
        assert_eq!(channel.current_log_position(), before);

        builder.append_raw(0, &partial[6..]);
        let (_, entry) = reader.read_log_entry(&mut channel).unwrap().unwrap();
        assert_eq!(entry, commit(3, 5));
    }

    #[test]
    fn unknown_entry_type_is_corruption() {
        let builder = LogBuilder::new();
        builder.segment(0, 0, &[]);
        builder.append_raw(0, &[KERNEL_VERSION, 42, 0, 0]);

        let mut channel = builder.log_files().reader(LogPosition::new(0, 64)).unwrap();
        let mut reader = VersionAwareLogEntryReader::new();
        let err = reader.read_log_entry(&mut channel).unwrap_err();
        assert!(matches!(err, CoreError::LogCorruption { .. }));
    }

    #[test]
    fn writer_appends_encoded_entries() {
        let mut channel = txlog_storage::InMemoryChannel::new();
        let mut writer = LogEntryWriter::new(&mut channel);
        assert_eq!(writer.write(&LogEntry::command(vec![1, 2])).unwrap(), 0);
        assert_eq!(writer.write(&LogEntry::command(vec![3])).unwrap(), 8);
        assert_eq!(channel.size().unwrap(), 15);
    }
}
