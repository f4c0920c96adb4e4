//! # txlog Core
//!
//! Durable write-ahead log engine for a transactional graph database.
//!
//! This crate provides:
//! - Log positions, segment headers and a bounded header cache
//! - Cross-segment reading through a version bridge and read-ahead channel
//! - Decoding of the entry stream into committed command batches
//! - Transaction metadata caching and segment location
//! - Retention thresholds, prune strategies and the pruning orchestrator
//!
//! ## Log layout
//!
//! ```text
//! <log dir>/
//! ├─ transaction.log.0     # header (64 bytes) + entries
//! ├─ transaction.log.1
//! ├─ ...
//! └─ checkpoint.log.N      # checkpoint files, retained by count
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod error;
pub mod log;
pub mod pruning;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::LogConfig;
pub use error::{CoreError, CoreResult};
pub use log::{
    CommittedChunkRepresentation, CommittedCommandBatch, CommittedCommandBatchCursor,
    CommittedTransactionRepresentation, LogEntry, LogEntryReader, LogFileInformation, LogFiles,
    LogHeader, LogHeaderCache, LogPosition, LogPositionMarker, LogVersionBridge,
    LogVersionLocator, ReadAheadLogChannel, TransactionLogFileInformation,
    TransactionMetadataCache, VersionAwareLogEntryReader,
};
pub use pruning::{LogPruneStrategy, LogPruning, PruneReport, Threshold, ThresholdConfig, VersionRange};

/// Crate version, reported by tooling.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
