//! Prune command implementation.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use txlog_core::{
    CommittedCommandBatchCursor, LogConfig, LogFiles, LogPruning, SystemClock,
    TransactionLogFileInformation,
};

/// Pruning outcome for output.
#[derive(Debug, Serialize)]
pub struct PruneResult {
    /// Active retention policy.
    pub policy: String,
    /// Exclusive upper version bound of the pass.
    pub up_to_version: u64,
    /// Last append index used by entry based policies.
    pub last_append_index: u64,
    /// Selected versions, `[from, to)`.
    pub range: [u64; 2],
    /// Deleted log versions (empty on a dry run).
    pub deleted_log_versions: Vec<u64>,
    /// Deleted checkpoint versions (empty on a dry run).
    pub deleted_checkpoint_versions: Vec<u64>,
    /// Whether files were left in place.
    pub dry_run: bool,
}

/// Options of a prune pass.
#[derive(Debug, Clone, Copy)]
pub struct PruneOptions {
    /// Exclusive upper bound; defaults to the highest (tip) version.
    pub up_to: Option<u64>,
    /// Only report what would be deleted.
    pub dry_run: bool,
}

/// Runs the prune command.
pub fn run(
    path: &Path,
    config: &LogConfig,
    options: PruneOptions,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = super::open_log_files(path, config)?;
    let result = prune(&files, config, options)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Prunes `files` following the retention policy in `config`.
pub fn prune(
    files: &LogFiles,
    config: &LogConfig,
    options: PruneOptions,
) -> Result<PruneResult, Box<dyn std::error::Error>> {
    let Some(highest) = files.highest_log_version()? else {
        return Err(format!("No log files found in {:?}", files.directory()).into());
    };
    let up_to_version = options.up_to.unwrap_or(highest).min(highest);
    let last_append_index = last_append_index(files, highest)?;

    let info = Arc::new(TransactionLogFileInformation::with_fixed_last_append_index(
        files.clone(),
        last_append_index,
    ));
    let pruning = LogPruning::from_config(files.clone(), info, Arc::new(SystemClock), config)?;

    let mut result = PruneResult {
        policy: pruning.describe_current_strategy(),
        up_to_version,
        last_append_index,
        range: [0, 0],
        deleted_log_versions: Vec::new(),
        deleted_checkpoint_versions: Vec::new(),
        dry_run: options.dry_run,
    };

    let range = if options.dry_run {
        if !pruning.might_have_logs_to_prune(up_to_version)? {
            return Ok(result);
        }
        pruning.versions_to_prune(up_to_version)?
    } else {
        let report = pruning.prune_logs(up_to_version)?;
        result.deleted_log_versions = report.deleted_log_versions;
        result.deleted_checkpoint_versions = report.deleted_checkpoint_versions;
        report.range
    };
    result.range = [range.from_inclusive, range.to_exclusive];

    Ok(result)
}

/// Last append index of the log: the tip header's index plus every
/// transaction completed in the tip segment.
fn last_append_index(files: &LogFiles, tip: u64) -> Result<u64, Box<dyn std::error::Error>> {
    let Some(header) = files.extract_header(tip)? else {
        return Ok(0);
    };
    let channel = files.raw_reader(header.start_position())?;
    let mut cursor = CommittedCommandBatchCursor::new(channel);
    let mut completed = 0;
    while cursor.advance()? {
        if cursor.get().is_some_and(|batch| batch.is_last()) {
            completed += 1;
        }
    }
    Ok(header.last_append_index + completed)
}

fn print_text_output(result: &PruneResult) {
    println!("Pruning below version {} (policy: {})", result.up_to_version, result.policy);
    if result.dry_run {
        println!("(dry run - no changes will be made)");
    }
    println!();

    if result.range[0] == result.range[1] {
        println!("Nothing to prune");
    } else {
        println!("Selected versions: [{}, {})", result.range[0], result.range[1]);
    }

    if !result.dry_run {
        println!("Deleted log files:        {:?}", result.deleted_log_versions);
        println!("Deleted checkpoint files: {:?}", result.deleted_checkpoint_versions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txlog_testkit::{transaction, LogFixture};

    fn fixture(policy: &str) -> LogFixture {
        let fixture = LogFixture::on_disk().with_config(
            LogConfig::default()
                .retention_policy(policy)
                .checkpoint_keep_count(1),
        );
        fixture.write_log(&[
            vec![transaction(1, 10, vec![])],
            vec![transaction(2, 20, vec![])],
            vec![transaction(3, 30, vec![])],
            vec![transaction(4, 40, vec![]), transaction(5, 50, vec![])],
        ]);
        fixture
    }

    #[test]
    fn dry_run_leaves_files_in_place() {
        let fixture = fixture("1 files");
        let options = PruneOptions {
            up_to: None,
            dry_run: true,
        };

        let result = prune(&fixture.log_files(), fixture.config(), options).unwrap();
        assert_eq!(result.up_to_version, 3);
        assert_eq!(result.range, [0, 2]);
        assert!(result.deleted_log_versions.is_empty());
        assert_eq!(fixture.log_files().versions().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn prune_deletes_and_reports() {
        let fixture = fixture("keep_none");
        fixture.write_checkpoint(0);
        fixture.write_checkpoint(1);
        let options = PruneOptions {
            up_to: Some(2),
            dry_run: false,
        };

        let result = prune(&fixture.log_files(), fixture.config(), options).unwrap();
        assert_eq!(result.policy, "keep_none");
        assert_eq!(result.deleted_log_versions, vec![0, 1]);
        assert_eq!(result.deleted_checkpoint_versions, vec![0]);
        assert_eq!(fixture.log_files().versions().unwrap(), vec![2, 3]);
    }

    #[test]
    fn tip_is_never_pruned() {
        let fixture = fixture("keep_none");
        let options = PruneOptions {
            up_to: Some(100),
            dry_run: false,
        };

        let result = prune(&fixture.log_files(), fixture.config(), options).unwrap();
        assert_eq!(result.up_to_version, 3);
        assert_eq!(fixture.log_files().versions().unwrap(), vec![3]);
    }

    #[test]
    fn last_append_index_counts_tip_transactions() {
        let fixture = fixture("keep_all");
        assert_eq!(last_append_index(&fixture.log_files(), 3).unwrap(), 5);
    }
}
