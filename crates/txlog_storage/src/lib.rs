//! # txlog Storage
//!
//! File system collaborator for the txlog transaction log.
//!
//! This crate provides the lowest-level storage abstraction: a
//! [`FileSystem`] that resolves paths to [`StoreChannel`]s. Channels are
//! **opaque byte stores** - they do not interpret the data they hold.
//!
//! ## Design Principles
//!
//! - Channels are positional byte stores (read at, append, flush)
//! - No knowledge of log headers, entries, or versions
//! - Must be `Send + Sync` so readers and the pruner can share a file system
//! - txlog_core owns all file format interpretation
//!
//! ## Available File Systems
//!
//! - [`InMemoryFileSystem`] - For testing and ephemeral logs
//! - [`OsFileSystem`] - For persistent logs using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use std::path::Path;
//! use txlog_storage::{FileSystem, InMemoryFileSystem};
//!
//! let fs = InMemoryFileSystem::new();
//! let mut channel = fs.create(Path::new("logs/transaction.log.0")).unwrap();
//! channel.append(b"hello world").unwrap();
//!
//! let mut buf = [0u8; 5];
//! let read = channel.read_at(6, &mut buf).unwrap();
//! assert_eq!(&buf[..read], b"world");
//! assert_eq!(fs.size(Path::new("logs/transaction.log.0")).unwrap(), 11);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod error;
mod file;
mod fs;
mod memory;

pub use channel::StoreChannel;
pub use error::{StorageError, StorageResult};
pub use file::FileChannel;
pub use fs::{FileSystem, OsFileSystem};
pub use memory::{InMemoryChannel, InMemoryFileSystem};
