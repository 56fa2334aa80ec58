//! Run-scoped logging.
//!
//! Every pipeline event is appended to a per-run log file and mirrored to
//! the console, so a partially-failed run still leaves a readable trail.
//! The log file is the durable failure report of last resort: operators must
//! be able to determine the final run outcome from it alone, without relying
//! on email delivery.

use chrono::Local;
use log::{info, warn};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// `RunLogger` appends timestamped lines to the run's log file.
///
/// Each call opens the file in append mode and closes it again, so a crash
/// mid-run never loses already-recorded lines. A failed append is reported
/// through the console logger and otherwise tolerated: the pipeline outcome
/// never depends on the trail being writable.
pub struct RunLogger {
    log_path: PathBuf,
}

impl RunLogger {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Appends one `[timestamp] message` line and mirrors it to the console.
    pub fn record(&self, message: &str) {
        let line = format!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message);
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
        {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{}", line) {
                    warn!("Could not append to {}: {}", self.log_path.display(), e);
                }
            }
            Err(e) => warn!("Could not open log file {}: {}", self.log_path.display(), e),
        }
        info!("{}", message);
    }
}
