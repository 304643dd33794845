//! SQLite primitives: online backup and integrity check.

use crate::error::{Result, VaultError};
use rusqlite::backup::Backup;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Pages copied per backup step before yielding the source lock.
const PAGES_PER_STEP: i32 = 256;
const STEP_PAUSE: Duration = Duration::from_millis(10);

/// Copy the live database at `src` into `dest` with SQLite's online backup API.
///
/// The source is opened without `SQLITE_OPEN_CREATE`, so a missing file is an
/// error rather than a fresh empty database. Writers on `src` are only blocked
/// for the duration of a single step.
pub fn hot_backup(src: &Path, dest: &Path) -> Result<()> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let source = Connection::open_with_flags(src, flags)
        .map_err(|e| VaultError::EngineBackup(format!("open {}: {e}", src.display())))?;
    let mut target = Connection::open(dest)
        .map_err(|e| VaultError::EngineBackup(format!("open {}: {e}", dest.display())))?;

    let backup = Backup::new(&source, &mut target)
        .map_err(|e| VaultError::EngineBackup(format!("init: {e}")))?;
    backup
        .run_to_completion(PAGES_PER_STEP, STEP_PAUSE, None)
        .map_err(|e| VaultError::EngineBackup(format!("run: {e}")))?;

    tracing::debug!(src = %src.display(), dest = %dest.display(), "online backup complete");
    Ok(())
}

/// Outcome of `PRAGMA integrity_check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub ok: bool,
    pub messages: Vec<String>,
}

impl IntegrityReport {
    fn failed(message: String) -> Self {
        Self {
            ok: false,
            messages: vec![message],
        }
    }

    /// One-line summary for operator output.
    pub fn summary(&self) -> String {
        if self.ok {
            "ok".to_string()
        } else if self.messages.len() == 1 {
            format!("FAILED: {}", self.messages[0])
        } else {
            format!(
                "FAILED: {} ({} problems)",
                self.messages.first().map(String::as_str).unwrap_or("unknown"),
                self.messages.len()
            )
        }
    }
}

/// Run `PRAGMA integrity_check` against the database at `path`.
///
/// A file SQLite refuses to read yields a failed report carrying the engine
/// message. Only a missing file is an error.
pub fn integrity_check(path: &Path) -> Result<IntegrityReport> {
    if !path.exists() {
        return Err(VaultError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = match Connection::open_with_flags(path, flags) {
        Ok(c) => c,
        Err(e) => return Ok(IntegrityReport::failed(e.to_string())),
    };

    match collect_integrity_rows(&conn) {
        Ok(messages) => {
            let ok = messages.len() == 1 && messages[0] == "ok";
            Ok(IntegrityReport { ok, messages })
        }
        Err(e) => Ok(IntegrityReport::failed(e.to_string())),
    }
}

fn collect_integrity_rows(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("PRAGMA integrity_check")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect()
}
