//! Physical segment channels and the buffered cross-segment reader.

use crate::error::{CoreError, CoreResult};
use crate::log::bridge::LogVersionBridge;
use crate::log::header::{LogHeader, LOG_HEADER_SIZE};
use crate::log::position::{LogPosition, LogPositionMarker};
use txlog_storage::StoreChannel;

/// An open segment file with a read cursor.
///
/// Dropping the channel closes the underlying file handle.
pub struct PhysicalLogChannel {
    inner: Box<dyn StoreChannel>,
    header: LogHeader,
    position: u64,
}

impl PhysicalLogChannel {
    /// Wraps an opened segment, positioned right after its header.
    #[must_use]
    pub fn new(inner: Box<dyn StoreChannel>, header: LogHeader) -> Self {
        Self {
            inner,
            header,
            position: LOG_HEADER_SIZE as u64,
        }
    }

    /// Returns the segment version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.header.log_version
    }

    /// Returns the parsed header.
    #[must_use]
    pub fn header(&self) -> &LogHeader {
        &self.header
    }

    /// Returns the current read offset.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Moves the read offset.
    ///
    /// # Errors
    ///
    /// Returns an error if `offset` points into the header.
    pub fn set_position(&mut self, offset: u64) -> CoreResult<()> {
        if offset < LOG_HEADER_SIZE as u64 {
            return Err(CoreError::invalid_argument(format!(
                "offset {offset} lies inside the header of version {}",
                self.version()
            )));
        }
        self.position = offset;
        Ok(())
    }

    /// Returns the current file size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be read.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.inner.size()?)
    }

    /// Reads into `buf` at the current offset and advances it.
    ///
    /// Returns `0` once the segment is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn read(&mut self, buf: &mut [u8]) -> CoreResult<usize> {
        let read = self.inner.read_at(self.position, buf)?;
        self.position += read as u64;
        Ok(read)
    }
}

impl std::fmt::Debug for PhysicalLogChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalLogChannel")
            .field("version", &self.version())
            .field("position", &self.position)
            .finish()
    }
}

/// Buffered reader over the logical byte stream spanning several segments.
///
/// Reads are served from an internal buffer that is refilled from the
/// current segment. When the segment is exhausted the [`LogVersionBridge`]
/// decides whether reading continues in the next version. If it cannot
/// advance, reads fail with [`CoreError::ReadPastEnd`] rather than block.
///
/// All multi-byte values are little-endian.
///
/// # Thread Safety
///
/// A channel is owned by a single reader. It is `Send` but not shared.
pub struct ReadAheadLogChannel {
    channel: PhysicalLogChannel,
    bridge: Box<dyn LogVersionBridge>,
    buffer: Vec<u8>,
    buffer_pos: usize,
    buffer_len: usize,
    raw: bool,
}

impl ReadAheadLogChannel {
    /// Creates a reader starting at the channel's current offset.
    ///
    /// With `raw` set the bridge is asked not to advance, so the reader
    /// observes the end of its segment directly.
    #[must_use]
    pub fn new(
        channel: PhysicalLogChannel,
        bridge: Box<dyn LogVersionBridge>,
        read_ahead_size: usize,
        raw: bool,
    ) -> Self {
        Self {
            channel,
            bridge,
            buffer: vec![0u8; read_ahead_size.max(16)],
            buffer_pos: 0,
            buffer_len: 0,
            raw,
        }
    }

    /// Returns the version of the segment currently being read.
    #[must_use]
    pub fn log_version(&self) -> u64 {
        self.channel.version()
    }

    /// Returns the header of the segment currently being read.
    #[must_use]
    pub fn header(&self) -> &LogHeader {
        self.channel.header()
    }

    /// Returns `true` if this reader never crosses segment boundaries.
    #[must_use]
    pub fn is_raw(&self) -> bool {
        self.raw
    }

    /// Position of the next unread byte, relative to the current segment.
    #[must_use]
    pub fn current_log_position(&self) -> LogPosition {
        let buffered = (self.buffer_len - self.buffer_pos) as u64;
        LogPosition::new(
            self.channel.version(),
            self.channel.position().saturating_sub(buffered),
        )
    }

    /// Records the current position in `marker`.
    pub fn current_log_position_into(&self, marker: &mut LogPositionMarker) {
        let position = self.current_log_position();
        marker.mark(position.version(), position.offset());
    }

    /// Repositions the reader inside the current segment.
    ///
    /// # Errors
    ///
    /// Returns an error if `position` belongs to another version.
    pub fn set_log_position(&mut self, position: LogPosition) -> CoreResult<()> {
        if position.version() != self.channel.version() {
            return Err(CoreError::invalid_argument(format!(
                "cannot move to {position} while reading version {}",
                self.channel.version()
            )));
        }
        self.channel.set_position(position.offset())?;
        self.buffer_pos = 0;
        self.buffer_len = 0;
        Ok(())
    }

    /// Marks the start of the next entry and returns its version byte.
    ///
    /// When the reader sits at the end of a segment, the bridge is consulted
    /// first so the marker records the position inside the new segment.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadPastEnd`] if no byte is available.
    pub fn mark_and_get_version(&mut self, marker: &mut LogPositionMarker) -> CoreResult<u8> {
        self.ensure(1)?;
        self.current_log_position_into(marker);
        self.get_u8()
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadPastEnd`] when the stream is exhausted.
    pub fn get_u8(&mut self) -> CoreResult<u8> {
        Ok(self.take::<1>()?[0])
    }

    /// Reads a 16-bit signed integer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadPastEnd`] when the stream is exhausted.
    pub fn get_i16(&mut self) -> CoreResult<i16> {
        Ok(i16::from_le_bytes(self.take()?))
    }

    /// Reads a 32-bit signed integer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadPastEnd`] when the stream is exhausted.
    pub fn get_i32(&mut self) -> CoreResult<i32> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    /// Reads a 32-bit unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadPastEnd`] when the stream is exhausted.
    pub fn get_u32(&mut self) -> CoreResult<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    /// Reads a 64-bit signed integer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadPastEnd`] when the stream is exhausted.
    pub fn get_i64(&mut self) -> CoreResult<i64> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    /// Reads a 64-bit unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadPastEnd`] when the stream is exhausted.
    pub fn get_u64(&mut self) -> CoreResult<u64> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    /// Reads a 32-bit float.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadPastEnd`] when the stream is exhausted.
    pub fn get_f32(&mut self) -> CoreResult<f32> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    /// Reads a 64-bit float.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadPastEnd`] when the stream is exhausted.
    pub fn get_f64(&mut self) -> CoreResult<f64> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    /// Fills `out` completely.
    ///
    /// Large reads are served in buffer-sized pieces, so the buffer never
    /// grows past its configured size.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadPastEnd`] when the stream is exhausted.
    pub fn get_bytes(&mut self, out: &mut [u8]) -> CoreResult<()> {
        let mut filled = 0;
        while filled < out.len() {
            self.ensure(1)?;
            let available = self.buffer_len - self.buffer_pos;
            let n = available.min(out.len() - filled);
            out[filled..filled + n]
                .copy_from_slice(&self.buffer[self.buffer_pos..self.buffer_pos + n]);
            self.buffer_pos += n;
            filled += n;
        }
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> CoreResult<[u8; N]> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buffer[self.buffer_pos..self.buffer_pos + N]);
        self.buffer_pos += N;
        Ok(out)
    }

    /// Makes at least `min_bytes` available in the buffer, crossing into
    /// the next segment when the current one is exhausted.
    fn ensure(&mut self, min_bytes: usize) -> CoreResult<()> {
        loop {
            let available = self.buffer_len - self.buffer_pos;
            if available >= min_bytes {
                return Ok(());
            }

            if self.buffer_pos > 0 {
                self.buffer.copy_within(self.buffer_pos..self.buffer_len, 0);
                self.buffer_len = available;
                self.buffer_pos = 0;
            }

            let read = self.channel.read(&mut self.buffer[self.buffer_len..])?;
            if read > 0 {
                self.buffer_len += read;
                continue;
            }

            if !self.bridge.next(&mut self.channel, self.raw)? {
                return Err(CoreError::ReadPastEnd {
                    position: self.current_log_position(),
                });
            }
        }
    }
}

impl std::fmt::Debug for ReadAheadLogChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadAheadLogChannel")
            .field("position", &self.current_log_position())
            .field("raw", &self.raw)
            .finish()
    }
}
