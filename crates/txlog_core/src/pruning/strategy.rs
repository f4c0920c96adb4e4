//! Selection of log versions to delete.

use crate::clock::Clock;
use crate::error::CoreResult;
use crate::log::{LogFileInformation, LogFiles};
use crate::pruning::config::ThresholdConfig;
use crate::pruning::threshold::{
    EntryCountThreshold, EntryTimespanThreshold, FileCountThreshold, FileSizeThreshold, Threshold,
};
use std::sync::Arc;

/// Half-open range `[from_inclusive, to_exclusive)` of log versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionRange {
    /// First version in the range.
    pub from_inclusive: u64,
    /// First version past the range.
    pub to_exclusive: u64,
}

impl VersionRange {
    /// The range holding no versions.
    pub const EMPTY_RANGE: Self = Self {
        from_inclusive: 0,
        to_exclusive: 0,
    };

    /// Creates a range; an inverted range is normalized to empty.
    #[must_use]
    pub fn new(from_inclusive: u64, to_exclusive: u64) -> Self {
        if from_inclusive >= to_exclusive {
            return Self::EMPTY_RANGE;
        }
        Self {
            from_inclusive,
            to_exclusive,
        }
    }

    /// Returns `true` if no version is in the range.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.from_inclusive >= self.to_exclusive
    }

    /// Number of versions in the range.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.to_exclusive.saturating_sub(self.from_inclusive)
    }

    /// Returns `true` if `version` is in the range.
    #[must_use]
    pub fn contains(&self, version: u64) -> bool {
        (self.from_inclusive..self.to_exclusive).contains(&version)
    }

    /// Iterates the versions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u64> {
        self.from_inclusive..self.to_exclusive
    }
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.from_inclusive, self.to_exclusive)
    }
}

/// Chooses which log versions may be deleted.
pub trait LogPruneStrategy: Send {
    /// Returns the versions below `up_to_version` that may be deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the log directory cannot be inspected.
    fn find_log_versions_to_delete(&mut self, up_to_version: u64) -> CoreResult<VersionRange>;

    /// Human-readable description, for logging.
    fn describe(&self) -> String;
}

/// Never deletes anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPruning;

impl LogPruneStrategy for NoPruning {
    fn find_log_versions_to_delete(&mut self, _up_to_version: u64) -> CoreResult<VersionRange> {
        Ok(VersionRange::EMPTY_RANGE)
    }

    fn describe(&self) -> String {
        "keep_all".to_owned()
    }
}

/// Deletes every version below the requested one.
#[derive(Debug, Clone)]
pub struct PruneAll {
    log_files: LogFiles,
}

impl PruneAll {
    /// Creates a strategy over `log_files`.
    #[must_use]
    pub fn new(log_files: LogFiles) -> Self {
        Self { log_files }
    }
}

impl LogPruneStrategy for PruneAll {
    fn find_log_versions_to_delete(&mut self, up_to_version: u64) -> CoreResult<VersionRange> {
        match self.log_files.lowest_log_version()? {
            Some(lowest) => Ok(VersionRange::new(lowest, up_to_version)),
            None => Ok(VersionRange::EMPTY_RANGE),
        }
    }

    fn describe(&self) -> String {
        "keep_none".to_owned()
    }
}

/// Deletes everything older than the newest version reaching a threshold.
pub struct ThresholdBasedPruneStrategy {
    log_files: LogFiles,
    info: Arc<dyn LogFileInformation>,
    threshold: Box<dyn Threshold>,
}

impl ThresholdBasedPruneStrategy {
    /// Creates a strategy evaluating `threshold` over `log_files`.
    #[must_use]
    pub fn new(
        log_files: LogFiles,
        info: Arc<dyn LogFileInformation>,
        threshold: Box<dyn Threshold>,
    ) -> Self {
        Self {
            log_files,
            info,
            threshold,
        }
    }
}

impl LogPruneStrategy for ThresholdBasedPruneStrategy {
    fn find_log_versions_to_delete(&mut self, up_to_version: u64) -> CoreResult<VersionRange> {
        let Some(lowest) = self.log_files.lowest_log_version()? else {
            return Ok(VersionRange::EMPTY_RANGE);
        };
        if lowest >= up_to_version {
            return Ok(VersionRange::EMPTY_RANGE);
        }

        self.threshold.init();
        let mut version = up_to_version - 1;
        loop {
            let file = self.log_files.log_file_for_version(version);
            if self.threshold.reached(&file, version, self.info.as_ref()) {
                return Ok(VersionRange::new(lowest, version));
            }
            if version == lowest {
                return Ok(VersionRange::EMPTY_RANGE);
            }
            version -= 1;
        }
    }

    fn describe(&self) -> String {
        self.threshold.describe()
    }
}

impl std::fmt::Debug for ThresholdBasedPruneStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThresholdBasedPruneStrategy")
            .field("log_files", &self.log_files)
            .field("threshold", &self.threshold.describe())
            .finish()
    }
}

/// Builds the strategy for a parsed retention policy.
#[must_use]
pub fn strategy_from_config(
    config: ThresholdConfig,
    log_files: LogFiles,
    info: Arc<dyn LogFileInformation>,
    clock: Arc<dyn Clock>,
) -> Box<dyn LogPruneStrategy> {
    let fs = log_files.file_system().clone();
    let threshold: Box<dyn Threshold> = match config {
        ThresholdConfig::KeepAll => return Box::new(NoPruning),
        ThresholdConfig::KeepNone => return Box::new(PruneAll::new(log_files)),
        ThresholdConfig::Files(max) => Box::new(FileCountThreshold::new(max)),
        ThresholdConfig::Size(max) => Box::new(FileSizeThreshold::new(fs, max)),
        ThresholdConfig::Entries(max) => Box::new(EntryCountThreshold::new(max)),
        ThresholdConfig::Timespan { keep, size_cap } => {
            let threshold = EntryTimespanThreshold::new(clock, keep);
            match size_cap {
                Some(cap) => Box::new(threshold.with_size_cap(FileSizeThreshold::new(fs, cap))),
                None => Box::new(threshold),
            }
        }
    };
    Box::new(ThresholdBasedPruneStrategy::new(log_files, info, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::log::test_support::LogBuilder;
    use crate::pruning::threshold::tests::StubInfo;
    use std::path::Path;

    /// Reached only at the listed versions, recording every call.
    struct ScriptedThreshold {
        reached_at: Vec<u64>,
        calls: Arc<parking_lot::Mutex<Vec<u64>>>,
    }

    impl Threshold for ScriptedThreshold {
        fn init(&mut self) {
            self.calls.lock().clear();
        }

        fn reached(&mut self, _file: &Path, version: u64, _info: &dyn LogFileInformation) -> bool {
            self.calls.lock().push(version);
            self.reached_at.contains(&version)
        }

        fn describe(&self) -> String {
            "scripted".to_owned()
        }
    }

    fn scripted(
        builder: &LogBuilder,
        reached_at: Vec<u64>,
    ) -> (ThresholdBasedPruneStrategy, Arc<parking_lot::Mutex<Vec<u64>>>) {
        let calls = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let threshold = ScriptedThreshold {
            reached_at,
            calls: calls.clone(),
        };
        let strategy = ThresholdBasedPruneStrategy::new(
            builder.log_files(),
            Arc::new(StubInfo::default()),
            Box::new(threshold),
        );
        (strategy, calls)
    }

    #[test]
    fn boundary_version_is_excluded() {
        let builder = LogBuilder::new();
        for version in 1..=6 {
            builder.segment(version, 0, &[]);
        }
        let (mut strategy, calls) = scripted(&builder, vec![3]);

        let range = strategy.find_log_versions_to_delete(7).unwrap();
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![1, 2]);
        assert!(!range.contains(3));
        assert_eq!(*calls.lock(), vec![6, 5, 4, 3]);
    }

    #[test]
    fn empty_when_lowest_is_above_ceiling() {
        let builder = LogBuilder::new();
        builder.segment(10, 0, &[]);
        let (mut strategy, calls) = scripted(&builder, vec![10]);

        assert!(strategy.find_log_versions_to_delete(5).unwrap().is_empty());
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn empty_when_threshold_never_reached() {
        let builder = LogBuilder::new();
        for version in 0..4 {
            builder.segment(version, 0, &[]);
        }
        let (mut strategy, calls) = scripted(&builder, vec![]);

        assert_eq!(strategy.find_log_versions_to_delete(4).unwrap(), VersionRange::EMPTY_RANGE);
        assert_eq!(*calls.lock(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn missing_files_inside_range_are_still_evaluated() {
        let builder = LogBuilder::new();
        builder.segment(1, 0, &[]);
        builder.segment(4, 0, &[]);
        let (mut strategy, calls) = scripted(&builder, vec![3]);

        let range = strategy.find_log_versions_to_delete(5).unwrap();
        assert_eq!(range, VersionRange::new(1, 3));
        assert_eq!(*calls.lock(), vec![4, 3]);
    }

    #[test]
    fn empty_log_has_nothing_to_prune() {
        let builder = LogBuilder::new();
        let (mut strategy, _) = scripted(&builder, vec![0]);
        assert!(strategy.find_log_versions_to_delete(10).unwrap().is_empty());
    }

    #[test]
    fn file_count_strategy_keeps_newest_files() {
        let builder = LogBuilder::new();
        for version in 0..6 {
            builder.segment(version, 0, &[]);
        }
        let mut strategy = strategy_from_config(
            ThresholdConfig::Files(2),
            builder.log_files(),
            Arc::new(StubInfo::default()),
            Arc::new(FakeClock::new(0)),
        );

        // versions 5 and 4 are counted, 4 is the boundary
        assert_eq!(strategy.find_log_versions_to_delete(6).unwrap(), VersionRange::new(0, 4));
        assert_eq!(strategy.describe(), "2 files");
    }

    #[test]
    fn keep_all_and_keep_none() {
        let builder = LogBuilder::new();
        for version in 2..5 {
            builder.segment(version, 0, &[]);
        }
        let info: Arc<dyn LogFileInformation> = Arc::new(StubInfo::default());
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));

        let mut keep_all =
            strategy_from_config(ThresholdConfig::KeepAll, builder.log_files(), info.clone(), clock.clone());
        assert!(keep_all.find_log_versions_to_delete(5).unwrap().is_empty());
        assert_eq!(keep_all.describe(), "keep_all");

        let mut keep_none =
            strategy_from_config(ThresholdConfig::KeepNone, builder.log_files(), info, clock);
        assert_eq!(keep_none.find_log_versions_to_delete(4).unwrap(), VersionRange::new(2, 4));
        assert!(keep_none.find_log_versions_to_delete(2).unwrap().is_empty());
    }

    #[test]
    fn version_range_basics() {
        assert!(VersionRange::EMPTY_RANGE.is_empty());
        assert_eq!(VersionRange::new(5, 3), VersionRange::EMPTY_RANGE);
        let range = VersionRange::new(2, 5);
        assert_eq!(range.len(), 3);
        assert_eq!(range.to_string(), "[2, 5)");
    }
}
