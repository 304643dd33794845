//! Snapshot producer: hot backup, compression, retention sweep.

use crate::codec;
use crate::config::Settings;
use crate::engine;
use crate::error::{Result, VaultError};
use crate::io;
use crate::paths;
use chrono::{DateTime, Duration, Local, NaiveDateTime};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

const RAW_TEMP_PREFIX: &str = ".dbvault-raw-";
const GZ_TEMP_PREFIX: &str = ".dbvault-gz-";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Local>,
    /// Timestamp encoded in the file name.
    pub taken_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub snapshot: PathBuf,
    pub size_bytes: u64,
    /// Uncompressed size of the engine copy.
    pub raw_bytes: u64,
    pub pruned: Vec<PathBuf>,
    pub recent: Vec<SnapshotInfo>,
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

pub struct Producer<'a> {
    settings: &'a Settings,
}

impl<'a> Producer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn run(&self) -> Result<BackupReport> {
        self.run_at(Local::now())
    }

    /// Take one snapshot named after `now`, then prune and list.
    ///
    /// Nothing is written under a snapshot name unless both the engine copy
    /// and compression completed.
    pub fn run_at(&self, now: DateTime<Local>) -> Result<BackupReport> {
        let s = self.settings;
        if !s.db_path.exists() {
            return Err(VaultError::MissingSource(s.db_path.clone()));
        }
        io::ensure_dir(&s.backup_dir)?;

        let target = paths::snapshot_path(&s.backup_dir, &s.prefix, &now);
        tracing::info!(db = %s.db_path.display(), snapshot = %target.display(), "starting backup");

        let raw = io::temp_in(&s.backup_dir, RAW_TEMP_PREFIX, ".db")?;
        engine::hot_backup(&s.db_path, raw.path())?;

        let mut gz = io::temp_in(&s.backup_dir, GZ_TEMP_PREFIX, paths::SNAPSHOT_EXT)?;
        let raw_bytes = codec::compress(File::open(raw.path())?, gz.as_file_mut())?;
        io::persist_temp(gz, &target)?;
        drop(raw);

        let size_bytes = std::fs::metadata(&target)?.len();
        tracing::info!(snapshot = %target.display(), size_bytes, raw_bytes, "snapshot written");

        let pruned = prune_expired(&s.backup_dir, &s.prefix, s.retention_days, now)?;

        let recent = if s.list_limit == 0 {
            Vec::new()
        } else {
            let mut all = list_snapshots(&s.backup_dir, &s.prefix)?;
            all.truncate(s.list_limit);
            all
        };

        Ok(BackupReport {
            snapshot: target,
            size_bytes,
            raw_bytes,
            pruned,
            recent,
        })
    }
}

// ---------------------------------------------------------------------------
// Retention and listing
// ---------------------------------------------------------------------------

/// Delete snapshots whose mtime is more than `retention_days` days before `now`.
///
/// Only files whose names match the snapshot pattern for `prefix` are
/// considered. A file that cannot be removed is logged and skipped.
pub fn prune_expired(
    dir: &Path,
    prefix: &str,
    retention_days: u32,
    now: DateTime<Local>,
) -> Result<Vec<PathBuf>> {
    let cutoff = now - Duration::days(i64::from(retention_days));
    let mut pruned = Vec::new();

    for info in list_snapshots(dir, prefix)? {
        if info.modified >= cutoff {
            continue;
        }
        match std::fs::remove_file(&info.path) {
            Ok(()) => {
                tracing::info!(snapshot = %info.path.display(), "pruned expired snapshot");
                pruned.push(info.path);
            }
            Err(e) => {
                tracing::warn!(snapshot = %info.path.display(), error = %e, "could not prune snapshot");
            }
        }
    }

    pruned.sort();
    Ok(pruned)
}

/// Snapshots in `dir` for `prefix`, newest first. A missing directory is empty.
pub fn list_snapshots(dir: &Path, prefix: &str) -> Result<Vec<SnapshotInfo>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(taken_at) = paths::parse_snapshot_name(prefix, &name) else {
            continue;
        };
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        out.push(SnapshotInfo {
            name,
            path: entry.path(),
            size_bytes: meta.len(),
            modified: DateTime::<Local>::from(meta.modified()?),
            taken_at,
        });
    }

    out.sort_by(|a, b| {
        b.taken_at
            .cmp(&a.taken_at)
            .then_with(|| b.modified.cmp(&a.modified))
    });
    Ok(out)
}
