//! Snapshot restorer.
//!
//! `AwaitingConfirmation → Cancelled`
//! `AwaitingConfirmation → Confirmed → SafetyCopyTaken → Restoring → Restored`
//!
//! The live database is only touched after the safety copy is on disk. A
//! failed integrity check is reported, never rolled back.

use crate::codec;
use crate::config::Settings;
use crate::engine::{self, IntegrityReport};
use crate::error::{Result, VaultError};
use crate::io;
use crate::paths;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::io::{BufRead, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// The only input that lets a restore proceed.
pub const CONFIRM_TOKEN: &str = "yes";

const RESTORE_TEMP_PREFIX: &str = ".dbvault-restore-";
const SIDECARS: [&str; 2] = ["-wal", "-shm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreState {
    AwaitingConfirmation,
    Confirmed,
    Cancelled,
    SafetyCopyTaken,
    Restoring,
    Restored,
}

impl fmt::Display for RestoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RestoreState::AwaitingConfirmation => "awaiting_confirmation",
            RestoreState::Confirmed => "confirmed",
            RestoreState::Cancelled => "cancelled",
            RestoreState::SafetyCopyTaken => "safety_copy_taken",
            RestoreState::Restoring => "restoring",
            RestoreState::Restored => "restored",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub snapshot: PathBuf,
    pub restored_to: PathBuf,
    /// `None` when there was no live database to preserve.
    pub safety_copy: Option<PathBuf>,
    pub bytes_written: u64,
    pub integrity: IntegrityReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RestoreOutcome {
    Cancelled,
    Restored(RestoreReport),
}

pub struct Restorer<'a> {
    settings: &'a Settings,
    snapshot: PathBuf,
    state: RestoreState,
}

impl<'a> Restorer<'a> {
    /// Fails with `MissingBackup` before any prompt when `snapshot` is absent.
    pub fn new(settings: &'a Settings, snapshot: impl Into<PathBuf>) -> Result<Self> {
        let snapshot = snapshot.into();
        if !snapshot.is_file() {
            return Err(VaultError::MissingBackup(snapshot));
        }
        Ok(Self {
            settings,
            snapshot,
            state: RestoreState::AwaitingConfirmation,
        })
    }

    pub fn state(&self) -> RestoreState {
        self.state
    }

    pub fn snapshot(&self) -> &Path {
        &self.snapshot
    }

    /// Prompt on `output` and read one line from `input`.
    ///
    /// Only the exact token `yes` (line ending stripped) confirms. Anything
    /// else, including end of input, cancels.
    pub fn confirm<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> Result<bool> {
        self.require_state(RestoreState::AwaitingConfirmation, RestoreState::Confirmed)?;

        writeln!(
            output,
            "WARNING: this will overwrite {} with the contents of {}",
            self.settings.db_path.display(),
            self.snapshot.display()
        )?;
        writeln!(output, "Stop the service using this database before continuing.")?;
        write!(output, "Type '{CONFIRM_TOKEN}' to continue: ")?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        let answer = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(&line);

        if answer == CONFIRM_TOKEN {
            self.state = RestoreState::Confirmed;
            Ok(true)
        } else {
            tracing::info!(snapshot = %self.snapshot.display(), "restore cancelled");
            self.state = RestoreState::Cancelled;
            Ok(false)
        }
    }

    pub fn restore(&mut self) -> Result<RestoreReport> {
        self.restore_at(Local::now())
    }

    /// Save the live database, then replace it with the snapshot contents.
    pub fn restore_at(&mut self, now: DateTime<Local>) -> Result<RestoreReport> {
        self.require_state(RestoreState::Confirmed, RestoreState::SafetyCopyTaken)?;
        let live = self.settings.db_path.clone();

        let safety_copy = if live.exists() {
            let copy = take_safety_copy(&live, &now)?;
            for suffix in SIDECARS {
                let side = paths::sidecar_path(&live, suffix);
                if side.exists() {
                    io::copy_new(&side, &paths::sidecar_path(&copy, suffix))?;
                }
            }
            tracing::info!(safety_copy = %copy.display(), "saved pre-restore copy");
            Some(copy)
        } else {
            None
        };
        self.state = RestoreState::SafetyCopyTaken;
        tracing::debug!(state = %self.state, "restore progress");

        self.state = RestoreState::Restoring;
        let dir = io::parent_or_cwd(&live);
        io::ensure_dir(dir)?;
        let mut tmp = io::temp_in(dir, RESTORE_TEMP_PREFIX, "")?;
        let bytes_written = codec::expand_into(&self.snapshot, tmp.as_file_mut())?;

        for suffix in SIDECARS {
            let side = paths::sidecar_path(&live, suffix);
            if side.exists() {
                std::fs::remove_file(&side)?;
            }
        }
        io::persist_temp(tmp, &live)?;
        tracing::info!(db = %live.display(), bytes_written, "database file replaced");

        let integrity = engine::integrity_check(&live)?;
        if !integrity.ok {
            tracing::warn!(db = %live.display(), problems = ?integrity.messages, "integrity check failed after restore");
        }
        self.state = RestoreState::Restored;

        Ok(RestoreReport {
            snapshot: self.snapshot.clone(),
            restored_to: live,
            safety_copy,
            bytes_written,
            integrity,
        })
    }

    /// Confirm, then restore if confirmed.
    pub fn run<R: BufRead, W: Write>(mut self, input: &mut R, output: &mut W) -> Result<RestoreOutcome> {
        if !self.confirm(input, output)? {
            return Ok(RestoreOutcome::Cancelled);
        }
        self.restore().map(RestoreOutcome::Restored)
    }

    fn require_state(&self, required: RestoreState, next: RestoreState) -> Result<()> {
        if self.state != required {
            return Err(VaultError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        Ok(())
    }
}

/// Copy `live` to its safety-copy name, adding `.1`, `.2`, ... when an
/// earlier restore in the same second already claimed the name.
fn take_safety_copy(live: &Path, now: &DateTime<Local>) -> Result<PathBuf> {
    let base = paths::safety_copy_path(live, now);
    let mut candidate = base.clone();
    let mut n = 0u32;
    loop {
        match io::copy_new(live, &candidate) {
            Ok(_) => return Ok(candidate),
            Err(VaultError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => {
                n += 1;
                let mut name = OsString::from(base.as_os_str());
                name.push(format!(".{n}"));
                candidate = PathBuf::from(name);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Producer;
    use rusqlite::Connection;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn seed_db(path: &Path, names: &[&str]) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch("CREATE TABLE IF NOT EXISTS plans (id INTEGER PRIMARY KEY, name TEXT);")
            .unwrap();
        for n in names {
            conn.execute("INSERT INTO plans (name) VALUES (?1)", [n]).unwrap();
        }
    }

    fn plan_names(path: &Path) -> Vec<String> {
        let conn = Connection::open(path).unwrap();
        let mut stmt = conn.prepare("SELECT name FROM plans ORDER BY id").unwrap();
        let rows = stmt.query_map([], |r| r.get::<_, String>(0)).unwrap();
        rows.map(|r| r.unwrap()).collect()
    }

    fn settings_in(dir: &TempDir) -> Settings {
        Settings {
            db_path: dir.path().join("data/subscription.db"),
            backup_dir: dir.path().join("backups"),
            ..Settings::default()
        }
    }

    fn snapshot_of(s: &Settings) -> PathBuf {
        Producer::new(s).run().unwrap().snapshot
    }

    #[test]
    fn missing_snapshot_fails_before_prompting() {
        let dir = TempDir::new().unwrap();
        let s = settings_in(&dir);
        let err = Restorer::new(&s, dir.path().join("absent.db.gz")).err().unwrap();
        assert!(matches!(err, VaultError::MissingBackup(_)));
    }

    #[test]
    fn only_exact_token_confirms() {
        let dir = TempDir::new().unwrap();
        let s = settings_in(&dir);
        let snap = dir.path().join("snap.db.gz");
        std::fs::write(&snap, b"x").unwrap();

        for answer in ["yes\n", "yes\r\n", "yes"] {
            let mut r = Restorer::new(&s, &snap).unwrap();
            let mut out = Vec::new();
            assert!(r.confirm(&mut Cursor::new(answer), &mut out).unwrap(), "{answer:?}");
            assert_eq!(r.state(), RestoreState::Confirmed);
        }
        for answer in ["YES\n", "y\n", " yes\n", "yes \n", "yes please\n", "\n", ""] {
            let mut r = Restorer::new(&s, &snap).unwrap();
            let mut out = Vec::new();
            assert!(!r.confirm(&mut Cursor::new(answer), &mut out).unwrap(), "{answer:?}");
            assert_eq!(r.state(), RestoreState::Cancelled);
        }
    }

    #[test]
    fn cancelled_restore_leaves_live_db_untouched() {
        let dir = TempDir::new().unwrap();
        let s = settings_in(&dir);
        std::fs::create_dir_all(s.db_path.parent().unwrap()).unwrap();
        seed_db(&s.db_path, &["basic"]);
        let snap = snapshot_of(&s);
        seed_db(&s.db_path, &["pro"]);
        let before = std::fs::read(&s.db_path).unwrap();

        let outcome = Restorer::new(&s, &snap)
            .unwrap()
            .run(&mut Cursor::new("no\n"), &mut Vec::new())
            .unwrap();
        assert!(matches!(outcome, RestoreOutcome::Cancelled));
        assert_eq!(std::fs::read(&s.db_path).unwrap(), before);

        let siblings = std::fs::read_dir(s.db_path.parent().unwrap()).unwrap().count();
        assert_eq!(siblings, 1, "no safety copy on cancel");
    }

    #[test]
    fn restore_requires_confirmation_first() {
        let dir = TempDir::new().unwrap();
        let s = settings_in(&dir);
        let snap = dir.path().join("snap.db.gz");
        std::fs::write(&snap, b"x").unwrap();
        let mut r = Restorer::new(&s, &snap).unwrap();
        let err = r.restore().unwrap_err();
        assert!(matches!(err, VaultError::InvalidTransition { .. }));
    }

    #[test]
    fn round_trip_restores_rows_and_keeps_safety_copy() {
        let dir = TempDir::new().unwrap();
        let s = settings_in(&dir);
        std::fs::create_dir_all(s.db_path.parent().unwrap()).unwrap();
        seed_db(&s.db_path, &["basic", "pro"]);
        let snap = snapshot_of(&s);

        seed_db(&s.db_path, &["enterprise"]);
        let diverged = std::fs::read(&s.db_path).unwrap();

        let mut r = Restorer::new(&s, &snap).unwrap();
        assert!(r.confirm(&mut Cursor::new("yes\n"), &mut Vec::new()).unwrap());
        let report = r.restore().unwrap();
        assert_eq!(r.state(), RestoreState::Restored);

        assert!(report.integrity.ok, "{:?}", report.integrity.messages);
        assert_eq!(plan_names(&s.db_path), vec!["basic", "pro"]);

        let safety = report.safety_copy.expect("live db existed");
        assert!(safety
            .to_string_lossy()
            .contains("subscription.db.before_restore_"));
        assert_eq!(std::fs::read(&safety).unwrap(), diverged);
        assert!(snap.exists(), "snapshot is never deleted");
    }

    #[test]
    fn restore_into_fresh_location_skips_safety_copy() {
        let dir = TempDir::new().unwrap();
        let s = settings_in(&dir);
        std::fs::create_dir_all(s.db_path.parent().unwrap()).unwrap();
        seed_db(&s.db_path, &["basic"]);
        let snap = snapshot_of(&s);

        let fresh = Settings {
            db_path: dir.path().join("elsewhere/restored.db"),
            ..s.clone()
        };
        let outcome = Restorer::new(&fresh, &snap)
            .unwrap()
            .run(&mut Cursor::new("yes\n"), &mut Vec::new())
            .unwrap();
        let RestoreOutcome::Restored(report) = outcome else {
            panic!("expected restore");
        };
        assert!(report.safety_copy.is_none());
        assert!(report.integrity.ok);
        assert_eq!(plan_names(&fresh.db_path), vec!["basic"]);
    }

    #[test]
    fn uncompressed_snapshot_is_copied() {
        let dir = TempDir::new().unwrap();
        let s = settings_in(&dir);
        let plain = dir.path().join("plain.db");
        seed_db(&plain, &["legacy"]);

        let outcome = Restorer::new(&s, &plain)
            .unwrap()
            .run(&mut Cursor::new("yes\n"), &mut Vec::new())
            .unwrap();
        assert!(matches!(outcome, RestoreOutcome::Restored(_)));
        assert_eq!(plan_names(&s.db_path), vec!["legacy"]);
    }

    #[test]
    fn corrupt_snapshot_restores_but_reports_failure() {
        let dir = TempDir::new().unwrap();
        let s = settings_in(&dir);
        let junk = dir.path().join("junk.db.gz");
        codec::compress(&vec![0x42u8; 16 * 1024][..], std::fs::File::create(&junk).unwrap())
            .unwrap();

        let outcome = Restorer::new(&s, &junk)
            .unwrap()
            .run(&mut Cursor::new("yes\n"), &mut Vec::new())
            .unwrap();
        let RestoreOutcome::Restored(report) = outcome else {
            panic!("expected restore");
        };
        assert!(!report.integrity.ok);
        assert!(s.db_path.exists());
    }

    #[test]
    fn wal_sidecars_follow_the_safety_copy() {
        let dir = TempDir::new().unwrap();
        let s = settings_in(&dir);
        std::fs::create_dir_all(s.db_path.parent().unwrap()).unwrap();
        seed_db(&s.db_path, &["basic"]);
        let snap = snapshot_of(&s);
        let wal = paths::sidecar_path(&s.db_path, "-wal");
        std::fs::write(&wal, b"stale wal").unwrap();

        let outcome = Restorer::new(&s, &snap)
            .unwrap()
            .run(&mut Cursor::new("yes\n"), &mut Vec::new())
            .unwrap();
        let RestoreOutcome::Restored(report) = outcome else {
            panic!("expected restore");
        };
        let safety = report.safety_copy.unwrap();
        assert_eq!(
            std::fs::read(paths::sidecar_path(&safety, "-wal")).unwrap(),
            b"stale wal"
        );
        assert!(!wal.exists());
    }

    #[test]
    fn same_second_restores_keep_every_safety_copy() {
        let dir = TempDir::new().unwrap();
        let s = settings_in(&dir);
        std::fs::create_dir_all(s.db_path.parent().unwrap()).unwrap();
        seed_db(&s.db_path, &["basic"]);
        let snap = snapshot_of(&s);
        seed_db(&s.db_path, &["original"]);
        let original = std::fs::read(&s.db_path).unwrap();
        let now = Local::now();

        let mut first = Restorer::new(&s, &snap).unwrap();
        assert!(first.confirm(&mut Cursor::new("yes\n"), &mut Vec::new()).unwrap());
        let first_copy = first.restore_at(now).unwrap().safety_copy.unwrap();

        let mut second = Restorer::new(&s, &snap).unwrap();
        assert!(second.confirm(&mut Cursor::new("yes\n"), &mut Vec::new()).unwrap());
        let second_copy = second.restore_at(now).unwrap().safety_copy.unwrap();

        assert_ne!(first_copy, second_copy);
        assert!(second_copy.to_string_lossy().ends_with(".1"));
        assert_eq!(std::fs::read(&first_copy).unwrap(), original);
        assert_eq!(plan_names(&first_copy), vec!["basic", "original"]);
        assert_eq!(plan_names(&second_copy), vec!["basic"]);
    }
}
