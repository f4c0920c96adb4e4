//! CLI command implementations.

pub mod dump;
pub mod info;
pub mod prune;

use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use txlog_core::{LogConfig, LogFiles};
use txlog_storage::OsFileSystem;

/// Opens the transaction log under `path`.
pub fn open_log_files(path: &Path, config: &LogConfig) -> Result<LogFiles, Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("No log directory found at {:?}", path).into());
    }
    debug!(path = %path.display(), base_name = %config.base_name, "opening transaction log");
    Ok(LogFiles::from_config(Arc::new(OsFileSystem::new()), path, config))
}
