use chrono::{DateTime, NaiveDateTime, TimeZone};
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_DB_PATH: &str = "/app/data/subscription.db";
pub const DEFAULT_BACKUP_DIR: &str = "/app/data/backups";
pub const DEFAULT_PREFIX: &str = "subscription";
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_LIST_LIMIT: usize = 5;

pub const SNAPSHOT_EXT: &str = ".db.gz";
pub const SAFETY_COPY_MARKER: &str = ".before_restore_";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

pub fn format_timestamp<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// `{prefix}_{YYYYMMDD_HHMMSS}.db.gz`
pub fn snapshot_file_name<Tz: TimeZone>(prefix: &str, ts: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{prefix}_{}{SNAPSHOT_EXT}", format_timestamp(ts))
}

pub fn snapshot_path<Tz: TimeZone>(backup_dir: &Path, prefix: &str, ts: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    backup_dir.join(snapshot_file_name(prefix, ts))
}

/// `{live_path}.before_restore_{YYYYMMDD_HHMMSS}`, next to the live database.
pub fn safety_copy_path<Tz: TimeZone>(live: &Path, ts: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    let mut name = live.as_os_str().to_os_string();
    name.push(SAFETY_COPY_MARKER);
    name.push(format_timestamp(ts));
    PathBuf::from(name)
}

/// SQLite sidecar file for `db`, e.g. `-wal` or `-shm`.
pub fn sidecar_path(db: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = db.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

static STAMP_RE: OnceLock<Regex> = OnceLock::new();

fn stamp_re() -> &'static Regex {
    STAMP_RE.get_or_init(|| Regex::new(r"^_(\d{8}_\d{6})\.db\.gz$").unwrap())
}

/// Returns the embedded timestamp when `name` is a snapshot file for `prefix`.
pub fn parse_snapshot_name(prefix: &str, name: &str) -> Option<NaiveDateTime> {
    let rest = name.strip_prefix(prefix)?;
    let caps = stamp_re().captures(rest)?;
    NaiveDateTime::parse_from_str(&caps[1], TIMESTAMP_FORMAT).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
