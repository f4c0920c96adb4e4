//! Pruning orchestration.

use crate::clock::Clock;
use crate::config::LogConfig;
use crate::error::CoreResult;
use crate::log::{LogFileInformation, LogFiles, LogHeaderCache};
use crate::pruning::config::ThresholdConfig;
use crate::pruning::strategy::{strategy_from_config, LogPruneStrategy, VersionRange};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of one pruning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneReport {
    /// Versions selected by the strategy.
    pub range: VersionRange,
    /// Log versions whose files were deleted.
    pub deleted_log_versions: Vec<u64>,
    /// Checkpoint versions whose files were deleted.
    pub deleted_checkpoint_versions: Vec<u64>,
}

impl PruneReport {
    /// Returns `true` if nothing was deleted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deleted_log_versions.is_empty() && self.deleted_checkpoint_versions.is_empty()
    }
}

struct PruneState {
    strategy: Box<dyn LogPruneStrategy>,
}

/// Deletes log and checkpoint files no longer needed.
///
/// Passes are serialized: a range computed under the lock stays valid
/// until its files are deleted. The appender is not blocked; it only ever
/// writes the tip segment, which no strategy selects.
///
/// A failed deletion aborts the rest of its pass. Files already deleted
/// stay deleted and the next pass picks up where it stopped.
pub struct LogPruning {
    log_files: LogFiles,
    checkpoint_files: LogFiles,
    checkpoint_keep_count: usize,
    info: Arc<dyn LogFileInformation>,
    clock: Arc<dyn Clock>,
    state: Mutex<PruneState>,
}

impl LogPruning {
    /// Creates a pruner using `strategy`.
    ///
    /// At least one checkpoint file is always kept.
    #[must_use]
    pub fn new(
        log_files: LogFiles,
        checkpoint_files: LogFiles,
        checkpoint_keep_count: usize,
        info: Arc<dyn LogFileInformation>,
        clock: Arc<dyn Clock>,
        strategy: Box<dyn LogPruneStrategy>,
    ) -> Self {
        Self {
            log_files,
            checkpoint_files,
            checkpoint_keep_count: checkpoint_keep_count.max(1),
            info,
            clock,
            state: Mutex::new(PruneState { strategy }),
        }
    }

    /// Creates a pruner for the retention policy in `config`.
    ///
    /// Checkpoint files share the log directory and are named after
    /// `config.checkpoint_base_name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidRetentionPolicy`] if the policy
    /// cannot be parsed.
    pub fn from_config(
        log_files: LogFiles,
        info: Arc<dyn LogFileInformation>,
        clock: Arc<dyn Clock>,
        config: &LogConfig,
    ) -> CoreResult<Self> {
        let threshold = ThresholdConfig::parse(&config.retention_policy)?;
        let strategy = strategy_from_config(threshold, log_files.clone(), info.clone(), clock.clone());
        let checkpoint_files = LogFiles::new(
            log_files.file_system().clone(),
            log_files.directory(),
            config.checkpoint_base_name.clone(),
            Arc::new(LogHeaderCache::new(1)),
            config.read_ahead_size,
        );
        Ok(Self::new(
            log_files,
            checkpoint_files,
            config.checkpoint_keep_count,
            info,
            clock,
            strategy,
        ))
    }

    /// Deletes log versions below `up_to_version` selected by the strategy,
    /// then trims checkpoint files to the configured count.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or a deletion
    /// fails.
    pub fn prune_logs(&self, up_to_version: u64) -> CoreResult<PruneReport> {
        let mut state = self.state.lock();
        let range = state.strategy.find_log_versions_to_delete(up_to_version)?;
        debug!(%range, up_to_version, "pruning log versions");

        let mut deleted_log_versions = Vec::new();
        for version in range.iter() {
            let path = self.log_files.log_file_for_version(version);
            if self.log_files.file_system().delete(&path)? {
                deleted_log_versions.push(version);
            }
            self.log_files.header_cache().remove(version);
        }
        if let Some(last) = deleted_log_versions.last() {
            info!(
                "Pruned {} log files. Lowest preserved version: {}",
                deleted_log_versions.len(),
                last + 1
            );
        }

        let deleted_checkpoint_versions = self.prune_checkpoints()?;

        Ok(PruneReport {
            range,
            deleted_log_versions,
            deleted_checkpoint_versions,
        })
    }

    fn prune_checkpoints(&self) -> CoreResult<Vec<u64>> {
        let versions = self.checkpoint_files.versions()?;
        if versions.len() <= self.checkpoint_keep_count {
            return Ok(Vec::new());
        }

        let (prunable, kept) = versions.split_at(versions.len() - self.checkpoint_keep_count);
        let mut deleted = Vec::with_capacity(prunable.len());
        for &version in prunable {
            let path = self.checkpoint_files.log_file_for_version(version);
            if self.checkpoint_files.file_system().delete(&path)? {
                deleted.push(version);
            }
        }
        if let Some(lowest) = kept.first() {
            info!(
                "Pruned {} checkpoint log files. Lowest preserved version: {}",
                deleted.len(),
                lowest
            );
        }
        Ok(deleted)
    }

    /// Returns `true` if a pass up to `highest_version` would select any
    /// log version. Nothing is deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be inspected.
    pub fn might_have_logs_to_prune(&self, highest_version: u64) -> CoreResult<bool> {
        let mut state = self.state.lock();
        Ok(!state
            .strategy
            .find_log_versions_to_delete(highest_version)?
            .is_empty())
    }

    /// Computes the range a pass up to `up_to_version` would delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be inspected.
    pub fn versions_to_prune(&self, up_to_version: u64) -> CoreResult<VersionRange> {
        self.state
            .lock()
            .strategy
            .find_log_versions_to_delete(up_to_version)
    }

    /// Describes the active retention policy.
    #[must_use]
    pub fn describe_current_strategy(&self) -> String {
        self.state.lock().strategy.describe()
    }

    /// Replaces the active retention policy.
    ///
    /// The current strategy is kept if `policy` does not parse.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidRetentionPolicy`] for a malformed
    /// policy.
    pub fn update_retention_policy(&self, policy: &str) -> CoreResult<()> {
        let threshold = ThresholdConfig::parse(policy)?;
        let strategy = strategy_from_config(
            threshold,
            self.log_files.clone(),
            self.info.clone(),
            self.clock.clone(),
        );
        let mut state = self.state.lock();
        info!(
            from = %state.strategy.describe(),
            to = %strategy.describe(),
            "retention policy changed"
        );
        state.strategy = strategy;
        Ok(())
    }
}

impl std::fmt::Debug for LogPruning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogPruning")
            .field("log_files", &self.log_files)
            .field("checkpoint_files", &self.checkpoint_files)
            .field("checkpoint_keep_count", &self.checkpoint_keep_count)
            .finish_non_exhaustive()
    }
}
