//! Run-state persistence
//!
//! Stores the timestamp of the last successful sync so incremental runs
//! can restrict themselves to seats created since then. The timestamp
//! is a single RFC 3339 line; an unreadable or missing file simply
//! means "no previous run" and incremental mode degrades to a full
//! pass.

use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use costsync_domain::{CostsyncError, Result, StateConfig};
use tracing::{debug, warn};

/// Reads and records the last successful run timestamp.
pub struct RunState {
    path: PathBuf,
}

impl RunState {
    pub fn new(config: &StateConfig) -> Self {
        Self { path: config.last_run_path.clone() }
    }

    /// Timestamp of the last recorded run, if any.
    ///
    /// A missing file is the normal first-run case. A corrupt file is
    /// logged and treated the same way rather than failing the run.
    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no previous run recorded");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read run state");
                return None;
            }
        };

        match contents.trim().parse::<DateTime<Utc>>() {
            Ok(timestamp) => Some(timestamp),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable run timestamp");
                None
            }
        }
    }

    /// Record `now` as the last successful run.
    ///
    /// The write goes through a temporary file and rename so a crash
    /// mid-write never leaves a half-written timestamp.
    pub fn record_run(&self, now: DateTime<Utc>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CostsyncError::Internal(format!("failed to create state directory: {}", e))
                })?;
            }
        }

        let tmp_path = self.tmp_path();
        std::fs::write(&tmp_path, now.to_rfc3339())
            .map_err(|e| CostsyncError::Internal(format!("failed to write run state: {}", e)))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| CostsyncError::Internal(format!("failed to persist run state: {}", e)))?;

        debug!(path = %self.path.display(), timestamp = %now, "recorded run state");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}
