use crate::codec;
use crate::engine::{self, IntegrityReport};
use crate::error::{Result, VaultError};
use crate::io;
use std::path::Path;

/// Integrity-check a snapshot without touching the live database.
///
/// Compressed snapshots are expanded into a scratch file under the system
/// temp directory, removed on return.
pub fn verify_snapshot(path: &Path) -> Result<IntegrityReport> {
    if !path.is_file() {
        return Err(VaultError::MissingBackup(path.to_path_buf()));
    }
    if !codec::is_gzip(path)? {
        return engine::integrity_check(path);
    }

    let mut scratch = io::temp_in(&std::env::temp_dir(), ".dbvault-verify-", ".db")?;
    codec::expand_into(path, scratch.as_file_mut())?;
    let report = engine::integrity_check(scratch.path())?;
    tracing::debug!(snapshot = %path.display(), ok = report.ok, "verified snapshot");
    Ok(report)
}
