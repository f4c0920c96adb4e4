//! Log retention.
//!
//! A [`LogPruneStrategy`] picks a [`VersionRange`] of deletable versions;
//! [`LogPruning`] deletes them and trims checkpoint files.
//!
//! Threshold based strategies scan from `up_to_version - 1` downward and
//! stop at the first version whose [`Threshold`] is reached:
//!
//! ```text
//!  lowest                    boundary          up_to
//!    |  deleted  ...  deleted  |  kept  ...  kept |
//! ```
//!
//! Every uncertain answer (missing file, I/O failure) counts as "not
//! reached", so doubt always keeps data.

mod config;
mod pruner;
mod strategy;
mod threshold;

pub use config::ThresholdConfig;
pub use pruner::{LogPruning, PruneReport};
pub use strategy::{
    strategy_from_config, LogPruneStrategy, NoPruning, PruneAll, ThresholdBasedPruneStrategy,
    VersionRange,
};
pub use threshold::{
    EntryCountThreshold, EntryTimespanThreshold, FileCountThreshold, FileSizeThreshold, Threshold,
};
