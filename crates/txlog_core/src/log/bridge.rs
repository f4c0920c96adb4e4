//! Strategies for moving a reader from one segment to the next.

use crate::error::CoreResult;
use crate::log::channel::PhysicalLogChannel;
use crate::log::files::LogFiles;
use tracing::debug;

/// Decides what happens when a reader exhausts segment `N`.
///
/// `next` either replaces `channel` with an open channel for version
/// `N + 1` (dropping, and thereby closing, the old one) and returns `true`,
/// or leaves `channel` untouched and returns `false`.
pub trait LogVersionBridge: Send {
    /// Attempts to advance `channel` to the next version.
    ///
    /// # Errors
    ///
    /// Returns an error if the next segment exists but cannot be opened or
    /// carries an invalid header.
    fn next(&mut self, channel: &mut PhysicalLogChannel, raw: bool) -> CoreResult<bool>;
}

/// Bridge that never advances.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMoreChannels;

impl LogVersionBridge for NoMoreChannels {
    fn next(&mut self, _channel: &mut PhysicalLogChannel, _raw: bool) -> CoreResult<bool> {
        Ok(false)
    }
}

/// Bridge that opens the next version through [`LogFiles`].
///
/// The current channel is kept when:
/// - no file exists for `N + 1` (the tip segment is still being written)
/// - the next file exists but its header is not fully written yet
/// - `raw` is set, so the caller observes the segment end itself
#[derive(Debug, Clone)]
pub struct ReaderLogVersionBridge {
    log_files: LogFiles,
}

impl ReaderLogVersionBridge {
    /// Creates a bridge over `log_files`.
    #[must_use]
    pub fn new(log_files: LogFiles) -> Self {
        Self { log_files }
    }
}

impl LogVersionBridge for ReaderLogVersionBridge {
    fn next(&mut self, channel: &mut PhysicalLogChannel, raw: bool) -> CoreResult<bool> {
        if raw {
            return Ok(false);
        }

        let next_version = channel.version() + 1;
        match self.log_files.try_open_for_version(next_version)? {
            Some(next) => {
                debug!(
                    from = channel.version(),
                    to = next_version,
                    "crossing log segment boundary"
                );
                *channel = next;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
