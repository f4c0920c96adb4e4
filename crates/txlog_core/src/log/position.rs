//! Log coordinates.

use std::fmt;

/// A `(version, byte offset)` coordinate inside the transaction log.
///
/// The offset is relative to the start of the segment file, header
/// included. [`LogPosition::UNSPECIFIED`] is a sentinel that never equals a
/// real position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogPosition {
    version: u64,
    offset: u64,
}

impl LogPosition {
    /// Sentinel for "no position".
    pub const UNSPECIFIED: Self = Self {
        version: u64::MAX,
        offset: u64::MAX,
    };

    /// Creates a new position.
    #[must_use]
    pub const fn new(version: u64, offset: u64) -> Self {
        Self { version, offset }
    }

    /// Returns the segment version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the byte offset inside the segment.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns `true` for the sentinel, or any position carrying a sentinel
    /// component.
    #[must_use]
    pub const fn is_unspecified(&self) -> bool {
        self.version == u64::MAX || self.offset == u64::MAX
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unspecified() {
            write!(f, "LogPosition{{UNSPECIFIED}}")
        } else {
            write!(f, "LogPosition{{version={}, offset={}}}", self.version, self.offset)
        }
    }
}

/// Mutable cell producing [`LogPosition`] snapshots.
///
/// Readers mark the start of every entry so a truncated tail can be
/// rewound to the last complete entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogPositionMarker {
    version: u64,
    offset: u64,
    specified: bool,
}

impl Default for LogPositionMarker {
    fn default() -> Self {
        Self::new()
    }
}

impl LogPositionMarker {
    /// Creates an unspecified marker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            version: 0,
            offset: 0,
            specified: false,
        }
    }

    /// Records `(version, offset)`.
    pub fn mark(&mut self, version: u64, offset: u64) {
        self.version = version;
        self.offset = offset;
        self.specified = true;
    }

    /// Resets the marker to the unspecified state.
    pub fn unspecified(&mut self) {
        self.specified = false;
    }

    /// Returns a snapshot, or [`LogPosition::UNSPECIFIED`].
    #[must_use]
    pub fn new_position(&self) -> LogPosition {
        if self.specified {
            LogPosition::new(self.version, self.offset)
        } else {
            LogPosition::UNSPECIFIED
        }
    }

    /// Returns `true` if the marker points into segment `version`.
    #[must_use]
    pub fn is_marker_in_log(&self, version: u64) -> bool {
        self.specified && self.version == version
    }

    /// Returns the marked version.
    #[must_use]
    pub fn log_version(&self) -> u64 {
        self.version
    }

    /// Returns the marked byte offset.
    #[must_use]
    pub fn byte_offset(&self) -> u64 {
        self.offset
    }
}
