//! # txlog Testkit
//!
//! Test utilities for txlog.
//!
//! This crate provides:
//! - [`LogFixture`] for laying out multi-segment logs in memory or on disk
//! - Entry builders for plain and chunked transactions
//! - Property-based test generators using proptest
//!
//! Cross-crate integration tests live under `tests/`.
//!
//! ## Usage
//!
//! ```rust
//! use txlog_testkit::prelude::*;
//!
//! let fixture = LogFixture::memory();
//! fixture.write_log(&[
//!     vec![transaction(1, 1_000, vec![b"a".to_vec()])],
//!     vec![transaction(2, 2_000, vec![b"b".to_vec()])],
//! ]);
//! assert_eq!(fixture.log_files().versions().unwrap(), vec![0, 1]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
