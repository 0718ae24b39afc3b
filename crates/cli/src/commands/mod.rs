//! CLI command implementations

pub mod cache;
pub mod config;
pub mod provision;
pub mod sync;
pub mod users;

use std::io::{self, Write};

use costsync_domain::{CostsyncError, Result};

/// Write a block of output to stdout.
///
/// A broken pipe is success so `costsync users | head` exits cleanly.
pub(crate) fn emit(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(CostsyncError::Internal(format!("failed to write output: {}", e))),
    }
}
