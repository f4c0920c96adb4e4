//! Dump command implementation.

use serde::Serialize;
use std::path::Path;
use txlog_core::log::ChunkOpener;
use txlog_core::{CommittedCommandBatch, CommittedCommandBatchCursor, LogConfig, LogFiles};

/// Committed batch representation for output.
#[derive(Debug, Serialize)]
pub struct BatchInfo {
    /// Segment the batch starts in.
    pub version: u64,
    /// Offset of the batch's first entry.
    pub offset: u64,
    /// `transaction` or `chunk`.
    pub kind: String,
    /// Transaction the batch belongs to.
    pub tx_id: u64,
    /// Number of commands.
    pub commands: usize,
    /// Total command payload size in bytes.
    pub payload_size: usize,
    /// Whether the batch completes its transaction.
    pub last: bool,
    /// Time the batch was written, when its opener records it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_written: Option<u64>,
}

impl From<&CommittedCommandBatch> for BatchInfo {
    fn from(batch: &CommittedCommandBatch) -> Self {
        let position = batch.start_position();
        let time_written = match batch {
            CommittedCommandBatch::Transaction(tx) => Some(tx.start.time_written),
            CommittedCommandBatch::Chunk(chunk) => match &chunk.opener {
                ChunkOpener::Start(start) => Some(start.time_written),
                ChunkOpener::ChunkStart(chunk_start) => Some(chunk_start.time_written),
                ChunkOpener::PrecedingBoundary(_) => None,
            },
        };
        Self {
            version: position.version(),
            offset: position.offset(),
            kind: if batch.is_chunk() { "chunk" } else { "transaction" }.to_string(),
            tx_id: batch.tx_id(),
            commands: batch.commands().len(),
            payload_size: batch.commands().iter().map(|c| c.payload.len()).sum(),
            last: batch.is_last(),
            time_written,
        }
    }
}

/// Runs the dump command.
pub fn run(
    path: &Path,
    config: &LogConfig,
    from_version: Option<u64>,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = super::open_log_files(path, config)?;
    let batches = read_batches(&files, from_version, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&batches)?);
        }
        _ => {
            print_text_output(&batches);
        }
    }

    Ok(())
}

/// Reads up to `limit` batches starting at `from_version`, or at the
/// lowest version when none is given.
pub fn read_batches(
    files: &LogFiles,
    from_version: Option<u64>,
    limit: Option<usize>,
) -> Result<Vec<BatchInfo>, Box<dyn std::error::Error>> {
    let version = match from_version {
        Some(version) => version,
        None => match files.lowest_log_version()? {
            Some(version) => version,
            None => return Ok(Vec::new()),
        },
    };
    let header = files
        .extract_header(version)?
        .ok_or_else(|| format!("Log version {} has no complete header", version))?;

    let channel = files.reader(header.start_position())?;
    let mut cursor = CommittedCommandBatchCursor::new(channel);
    let max_batches = limit.unwrap_or(usize::MAX);
    let mut batches = Vec::new();

    while batches.len() < max_batches && cursor.advance()? {
        if let Some(batch) = cursor.get() {
            batches.push(BatchInfo::from(batch));
        }
    }

    Ok(batches)
}

fn print_text_output(batches: &[BatchInfo]) {
    println!("Committed batches ({} total)", batches.len());
    println!("=========================");
    println!();

    for batch in batches {
        print!(
            "[{}:{:08}] {:11} tx={} commands={} payload={} bytes",
            batch.version, batch.offset, batch.kind, batch.tx_id, batch.commands, batch.payload_size
        );
        if let Some(time) = batch.time_written {
            print!(" time={}", time);
        }
        if batch.kind == "chunk" && batch.last {
            print!(" (last)");
        }
        println!();
    }
}
