//! Retention predicates evaluated per segment.

use crate::clock::Clock;
use crate::log::LogFileInformation;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use txlog_storage::FileSystem;

/// Scan-scoped retention predicate.
///
/// [`Threshold::init`] is called once before a scan, then
/// [`Threshold::reached`] once per version with strictly decreasing
/// versions. The first version for which it answers `true` is kept, along
/// with everything newer; older versions are pruned.
pub trait Threshold: Send {
    /// Resets scan state.
    fn init(&mut self);

    /// Returns `true` once enough history has been seen at `version`.
    fn reached(&mut self, file: &Path, version: u64, info: &dyn LogFileInformation) -> bool;

    /// Human-readable description, for logging.
    fn describe(&self) -> String;
}

/// Keeps the newest `max_entries` append indexes.
#[derive(Debug, Clone)]
pub struct EntryCountThreshold {
    max_entries: u64,
}

impl EntryCountThreshold {
    /// Creates a threshold keeping `max_entries` entries.
    #[must_use]
    pub fn new(max_entries: u64) -> Self {
        Self { max_entries }
    }
}

impl Threshold for EntryCountThreshold {
    fn init(&mut self) {}

    fn reached(&mut self, _file: &Path, version: u64, info: &dyn LogFileInformation) -> bool {
        let first = match info.first_entry_append_index(version) {
            Ok(Some(first)) => first,
            Ok(None) => {
                warn!(version, "first append index not found, keeping log");
                return false;
            }
            Err(e) => {
                warn!(version, error = %e, "failed to read first append index, keeping log");
                return false;
            }
        };
        let last = info.last_entry_append_index();
        let count = last.saturating_add(1).saturating_sub(first);
        count > self.max_entries
    }

    fn describe(&self) -> String {
        format!("{} entries", self.max_entries)
    }
}

/// Keeps segments whose successor started after `now - keep`.
///
/// An optional [`FileSizeThreshold`] acts as a hard cap: once the scanned
/// segments exceed it, the threshold is reached regardless of age.
pub struct EntryTimespanThreshold {
    clock: Arc<dyn Clock>,
    keep: Duration,
    lower_limit: u64,
    size_cap: Option<FileSizeThreshold>,
}

impl EntryTimespanThreshold {
    /// Creates a threshold keeping `keep` worth of history.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, keep: Duration) -> Self {
        Self {
            clock,
            keep,
            lower_limit: 0,
            size_cap: None,
        }
    }

    /// Adds a total size cap.
    #[must_use]
    pub fn with_size_cap(mut self, size_cap: FileSizeThreshold) -> Self {
        self.size_cap = Some(size_cap);
        self
    }

    fn time_reached(&self, version: u64, info: &dyn LogFileInformation) -> bool {
        let Some(next) = version.checked_add(1) else {
            return false;
        };
        match info.first_start_record_timestamp(next) {
            Ok(Some(timestamp)) => timestamp < self.lower_limit,
            Ok(None) => {
                warn!(version = next, "no start record found, keeping log");
                false
            }
            Err(e) => {
                warn!(version = next, error = %e, "failed to read start record, keeping log");
                false
            }
        }
    }
}

impl Threshold for EntryTimespanThreshold {
    fn init(&mut self) {
        let keep = u64::try_from(self.keep.as_millis()).unwrap_or(u64::MAX);
        self.lower_limit = self.clock.now_millis().saturating_sub(keep);
        if let Some(size_cap) = &mut self.size_cap {
            size_cap.init();
        }
    }

    fn reached(&mut self, file: &Path, version: u64, info: &dyn LogFileInformation) -> bool {
        let time = self.time_reached(version, info);
        // the size cap accumulates on every call
        let size = match &mut self.size_cap {
            Some(size_cap) => size_cap.reached(file, version, info),
            None => false,
        };
        time || size
    }

    fn describe(&self) -> String {
        let base = format!("{}ms timespan", self.keep.as_millis());
        match &self.size_cap {
            Some(size_cap) => format!("{base} or {}", size_cap.describe()),
            None => base,
        }
    }
}

impl std::fmt::Debug for EntryTimespanThreshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryTimespanThreshold")
            .field("keep", &self.keep)
            .field("lower_limit", &self.lower_limit)
            .field("size_cap", &self.size_cap)
            .finish()
    }
}

/// Keeps the newest `max_files` segments.
#[derive(Debug, Clone)]
pub struct FileCountThreshold {
    max_files: u64,
    seen: u64,
}

impl FileCountThreshold {
    /// Creates a threshold keeping `max_files` files.
    #[must_use]
    pub fn new(max_files: u64) -> Self {
        Self { max_files, seen: 0 }
    }
}

impl Threshold for FileCountThreshold {
    fn init(&mut self) {
        self.seen = 0;
    }

    fn reached(&mut self, _file: &Path, _version: u64, _info: &dyn LogFileInformation) -> bool {
        self.seen += 1;
        self.seen >= self.max_files
    }

    fn describe(&self) -> String {
        format!("{} files", self.max_files)
    }
}

/// Keeps the newest segments up to `max_bytes` in total.
pub struct FileSizeThreshold {
    fs: Arc<dyn FileSystem>,
    max_bytes: u64,
    total: u64,
}

impl FileSizeThreshold {
    /// Creates a threshold keeping `max_bytes` of segments.
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>, max_bytes: u64) -> Self {
        Self {
            fs,
            max_bytes,
            total: 0,
        }
    }
}

impl Threshold for FileSizeThreshold {
    fn init(&mut self) {
        self.total = 0;
    }

    fn reached(&mut self, file: &Path, version: u64, _info: &dyn LogFileInformation) -> bool {
        match self.fs.size(file) {
            Ok(size) => self.total = self.total.saturating_add(size),
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                warn!(version, error = %e, "failed to read log file size");
            }
        }
        self.total >= self.max_bytes
    }

    fn describe(&self) -> String {
        format!("{} bytes", self.max_bytes)
    }
}

impl std::fmt::Debug for FileSizeThreshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSizeThreshold")
            .field("max_bytes", &self.max_bytes)
            .field("total", &self.total)
            .finish()
    }
}
