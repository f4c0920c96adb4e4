//! Info command implementation.

use serde::Serialize;
use std::path::Path;
use txlog_core::{LogConfig, LogFiles};

/// Log directory summary.
#[derive(Debug, Serialize)]
pub struct InfoResult {
    /// Log directory.
    pub path: String,
    /// Base name of the segment files.
    pub base_name: String,
    /// Per-segment details, lowest version first.
    pub segments: Vec<SegmentInfo>,
    /// Total size of all segments in bytes.
    pub total_size: u64,
    /// Existing checkpoint versions.
    pub checkpoints: Vec<u64>,
}

/// Details of one segment.
#[derive(Debug, Serialize)]
pub struct SegmentInfo {
    /// Segment version.
    pub version: u64,
    /// File size in bytes.
    pub size: u64,
    /// Whether the segment holds any entry.
    pub has_entries: bool,
    /// Parsed header, absent while it is incomplete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderInfo>,
}

/// Header fields of a segment.
#[derive(Debug, Serialize)]
pub struct HeaderInfo {
    /// Header format version.
    pub format_version: u8,
    /// Last append index of the previous segment.
    pub last_append_index: u64,
    /// Kernel version at creation.
    pub kernel_version: u8,
    /// Segment size bound.
    pub segment_block_size: u32,
    /// Checksum carried from the previous segment.
    pub previous_checksum: u32,
    /// Store identity as `creation_time/random/store_version`.
    pub store_id: String,
}

/// Runs the info command.
pub fn run(path: &Path, config: &LogConfig, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let files = super::open_log_files(path, config)?;
    let result = collect(&files, config)?;

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

/// Gathers the summary of `files`.
pub fn collect(files: &LogFiles, config: &LogConfig) -> Result<InfoResult, Box<dyn std::error::Error>> {
    let fs = files.file_system();
    let mut segments = Vec::new();
    let mut total_size = 0;

    for version in files.versions()? {
        let size = fs.size(&files.log_file_for_version(version))?;
        total_size += size;
        let header = files.extract_header(version)?.map(|header| HeaderInfo {
            format_version: header.format_version,
            last_append_index: header.last_append_index,
            kernel_version: header.kernel_version,
            segment_block_size: header.segment_block_size,
            previous_checksum: header.previous_checksum,
            store_id: format!(
                "{}/{}/{}",
                header.store_id.creation_time, header.store_id.random, header.store_id.store_version
            ),
        });
        segments.push(SegmentInfo {
            version,
            size,
            has_entries: files.has_any_entries(version),
            header,
        });
    }

    let prefix = format!("{}.", config.checkpoint_base_name);
    let mut checkpoints: Vec<u64> = fs
        .list(files.directory())?
        .iter()
        .filter_map(|p| p.file_name()?.to_str()?.strip_prefix(prefix.as_str())?.parse().ok())
        .collect();
    checkpoints.sort_unstable();

    Ok(InfoResult {
        path: files.directory().display().to_string(),
        base_name: files.base_name().to_string(),
        segments,
        total_size,
        checkpoints,
    })
}

fn print_text_output(result: &InfoResult) {
    println!("Transaction Log");
    println!("===============");
    println!();
    println!("Path:      {}", result.path);
    println!("Base name: {}", result.base_name);
    println!("Size:      {}", format_size(result.total_size));
    println!();
    println!("Segments ({}):", result.segments.len());
    for segment in &result.segments {
        print!("  [{}] {:>10}", segment.version, format_size(segment.size));
        match &segment.header {
            Some(header) => print!(
                " format={} last_append_index={} kernel={}",
                header.format_version, header.last_append_index, header.kernel_version
            ),
            None => print!(" (incomplete header)"),
        }
        if !segment.has_entries {
            print!(" empty");
        }
        println!();
    }

    if !result.checkpoints.is_empty() {
        println!();
        println!("Checkpoints: {:?}", result.checkpoints);
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txlog_testkit::{transaction, LogFixture};

    #[test]
    fn collects_segments_and_checkpoints() {
        let fixture = LogFixture::on_disk();
        fixture.write_log(&[vec![transaction(1, 10, vec![vec![1]])], vec![]]);
        fixture.write_checkpoint(7);

        let result = collect(&fixture.log_files(), fixture.config()).unwrap();
        assert_eq!(result.segments.len(), 2);
        assert!(result.segments[0].has_entries);
        assert!(!result.segments[1].has_entries);
        assert_eq!(result.segments[1].header.as_ref().unwrap().last_append_index, 1);
        assert_eq!(result.checkpoints, vec![7]);
        assert_eq!(
            result.total_size,
            result.segments.iter().map(|s| s.size).sum::<u64>()
        );
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
