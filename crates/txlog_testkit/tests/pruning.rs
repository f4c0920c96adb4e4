//! End-to-end retention over laid out logs.

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use txlog_core::log::TransactionLogFileInformation;
use txlog_core::pruning::strategy_from_config;
use txlog_core::{
    Clock, CoreError, FakeClock, LogConfig, LogPosition, LogPruning, ThresholdConfig,
    VersionRange,
};
use txlog_storage::FileSystem;
use txlog_testkit::prelude::*;

const HOUR: u64 = 60 * 60 * 1000;

/// Five segments, one transaction each, written an hour apart.
fn hourly_log(fixture: &LogFixture) -> u64 {
    let segments: Vec<Vec<_>> = (1..=5u64)
        .map(|tx| vec![transaction(tx, tx * HOUR, vec![vec![tx as u8; 32]])])
        .collect();
    fixture.write_log(&segments)
}

fn pruning(fixture: &LogFixture, last_append_index: u64, clock: Arc<dyn Clock>) -> LogPruning {
    let info = Arc::new(TransactionLogFileInformation::with_fixed_last_append_index(
        fixture.log_files(),
        last_append_index,
    ));
    LogPruning::from_config(fixture.log_files(), info, clock, fixture.config()).unwrap()
}

#[test]
fn timespan_policy_keeps_recent_history() {
    let fixture = LogFixture::on_disk().with_config(LogConfig::default().retention_policy("2 hours"));
    let last = hourly_log(&fixture);
    let clock = Arc::new(FakeClock::new(5 * HOUR + HOUR / 2));
    let pruning = pruning(&fixture, last, clock);

    // lower limit 3.5h: segment 2 starts at 3h, so segment 1 is the boundary
    let report = pruning.prune_logs(5).unwrap();
    assert_eq!(report.range, VersionRange::new(0, 1));
    assert_eq!(fixture.log_files().versions().unwrap(), vec![1, 2, 3, 4]);

    let channel = fixture.log_files().reader(LogPosition::new(1, 64)).unwrap();
    let remaining: Vec<u64> = txlog_core::CommittedCommandBatchCursor::new(channel)
        .map(|batch| batch.unwrap().tx_id())
        .collect();
    assert_eq!(remaining, vec![2, 3, 4, 5]);
}

#[test]
fn timespan_size_cap_overrides_age() {
    let fixture = LogFixture::memory();
    let last = hourly_log(&fixture);
    let segment_size = fixture
        .file_system()
        .size(&fixture.log_files().log_file_for_version(0))
        .unwrap();
    let info = Arc::new(TransactionLogFileInformation::with_fixed_last_append_index(
        fixture.log_files(),
        last,
    ));
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(5 * HOUR));
    let config = ThresholdConfig::Timespan {
        keep: Duration::from_millis(100 * HOUR),
        size_cap: Some(2 * segment_size),
    };
    let mut strategy = strategy_from_config(config, fixture.log_files(), info, clock);

    assert_eq!(strategy.find_log_versions_to_delete(5).unwrap(), VersionRange::new(0, 3));
}

#[test]
fn entry_policy_prunes_by_append_index() {
    let fixture = LogFixture::memory().with_config(LogConfig::default().retention_policy("2 txs"));
    let last = hourly_log(&fixture);
    let pruning = pruning(&fixture, last, Arc::new(FakeClock::new(0)));

    // segment 2 starts at tx 3, leaving 3 entries from there on
    assert!(pruning.might_have_logs_to_prune(4).unwrap());
    let report = pruning.prune_logs(4).unwrap();
    assert_eq!(report.deleted_log_versions, vec![0, 1]);
    assert_eq!(fixture.log_files().lowest_log_version().unwrap(), Some(2));
}

#[test]
fn pruning_is_idempotent_and_trims_checkpoints() {
    let fixture = LogFixture::on_disk().with_config(
        LogConfig::default()
            .retention_policy("2 files")
            .checkpoint_keep_count(2),
    );
    let last = hourly_log(&fixture);
    for version in 0..4 {
        fixture.write_checkpoint(version);
    }
    let pruning = pruning(&fixture, last, Arc::new(FakeClock::new(0)));

    let first = pruning.prune_logs(5).unwrap();
    assert_eq!(first.deleted_log_versions, vec![0, 1, 2]);
    assert_eq!(first.deleted_checkpoint_versions, vec![0, 1]);
    assert_eq!(fixture.checkpoint_versions(), vec![2, 3]);

    let second = pruning.prune_logs(5).unwrap();
    assert!(second.is_empty());
    assert_eq!(fixture.log_files().versions().unwrap(), vec![3, 4]);
}

#[test]
fn keep_all_never_deletes() {
    let fixture = LogFixture::memory().with_config(LogConfig::default().retention_policy("keep_all"));
    let last = hourly_log(&fixture);
    let pruning = pruning(&fixture, last, Arc::new(FakeClock::new(u64::MAX)));

    assert!(!pruning.might_have_logs_to_prune(5).unwrap());
    assert!(pruning.prune_logs(5).unwrap().is_empty());
    assert_eq!(pruning.describe_current_strategy(), "keep_all");
}

#[test]
fn malformed_policy_is_reported() {
    let fixture = LogFixture::memory().with_config(LogConfig::default().retention_policy("lots"));
    let info = Arc::new(TransactionLogFileInformation::with_fixed_last_append_index(
        fixture.log_files(),
        0,
    ));
    let result = LogPruning::from_config(
        fixture.log_files(),
        info,
        Arc::new(FakeClock::new(0)),
        fixture.config(),
    );
    assert!(matches!(result, Err(CoreError::InvalidRetentionPolicy { .. })));
}

proptest! {
    #[test]
    fn generated_policies_parse(policy in retention_policy_strategy()) {
        prop_assert!(ThresholdConfig::parse(&policy).is_ok());
    }

    #[test]
    fn pruned_range_never_reaches_the_ceiling(files in 1u64..6, up_to in 0u64..8) {
        let fixture = LogFixture::memory();
        hourly_log(&fixture);
        let info = Arc::new(TransactionLogFileInformation::with_fixed_last_append_index(
            fixture.log_files(),
            5,
        ));
        let mut strategy = strategy_from_config(
            ThresholdConfig::Files(files),
            fixture.log_files(),
            info,
            Arc::new(FakeClock::new(0)),
        );

        let range = strategy.find_log_versions_to_delete(up_to).unwrap();
        prop_assert!(range.is_empty() || range.to_exclusive < up_to);
        prop_assert!(range.len() <= up_to.saturating_sub(files));
    }
}
