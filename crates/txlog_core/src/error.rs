//! Error types for txlog core.

use crate::log::LogPosition;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in txlog core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage (file system) error.
    #[error("storage error: {0}")]
    Storage(#[from] txlog_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The logical stream is exhausted and the bridge could not advance.
    #[error("read past end of log at {position}")]
    ReadPastEnd {
        /// Position where the read was attempted.
        position: LogPosition,
    },

    /// The log contains bytes that cannot be decoded.
    #[error("log corruption: {message}")]
    LogCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// A segment header is invalid.
    #[error("invalid header for log version {version}: {message}")]
    InvalidHeader {
        /// The version whose header was rejected.
        version: u64,
        /// Description of the problem.
        message: String,
    },

    /// Attempted to cache a transaction at an unusable position.
    #[error("cannot cache transaction {tx_id} at position {position}")]
    InvalidLogPosition {
        /// Transaction (append) identifier.
        tx_id: u64,
        /// The rejected position.
        position: LogPosition,
    },

    /// No log segment contains the requested transaction.
    #[error("no such transaction: {tx_id}")]
    NoSuchTransaction {
        /// Transaction (append) identifier that was searched for.
        tx_id: u64,
    },

    /// The retention policy string could not be parsed.
    #[error("invalid retention policy '{policy}': {message}")]
    InvalidRetentionPolicy {
        /// The offending policy string.
        policy: String,
        /// Why it was rejected.
        message: String,
    },

    /// An argument was outside its valid domain.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a log corruption error.
    pub fn log_corruption(message: impl Into<String>) -> Self {
        Self::LogCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid header error.
    pub fn invalid_header(version: u64, message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            version,
            message: message.into(),
        }
    }

    /// Creates an invalid retention policy error.
    pub fn invalid_retention_policy(policy: &str, message: impl Into<String>) -> Self {
        Self::InvalidRetentionPolicy {
            policy: policy.to_string(),
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns `true` if this error signals an exhausted stream.
    #[must_use]
    pub fn is_read_past_end(&self) -> bool {
        matches!(self, Self::ReadPastEnd { .. })
    }

    /// Returns `true` if this error reports a missing file.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_not_found(),
            Self::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
