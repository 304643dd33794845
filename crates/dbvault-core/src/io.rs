use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// A hidden tempfile in `dir`. Dropped without [`persist_temp`] it is removed.
pub fn temp_in(dir: &Path, prefix: &str, suffix: &str) -> Result<NamedTempFile> {
    let tmp = Builder::new().prefix(prefix).suffix(suffix).tempfile_in(dir)?;
    Ok(tmp)
}

/// Flush `tmp` to disk and rename it over `path`.
pub fn persist_temp(tmp: NamedTempFile, path: &Path) -> Result<()> {
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Copy `src` into a newly created `dst` and fsync it before returning.
///
/// Fails with `AlreadyExists` instead of truncating an existing `dst`.
pub fn copy_new(src: &Path, dst: &Path) -> Result<u64> {
    let mut from = File::open(src)?;
    let mut to = OpenOptions::new().write(true).create_new(true).open(dst)?;
    let bytes = std::io::copy(&mut from, &mut to)?;
    to.sync_all()?;
    Ok(bytes)
}

pub fn parent_or_cwd(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn ensure_dir_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c");
        ensure_dir(&path).unwrap();
        ensure_dir(&path).unwrap();
        assert!(path.is_dir());
    }

    #[test]
    fn dropped_temp_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let tmp = temp_in(dir.path(), ".raw-", ".db").unwrap();
        assert!(tmp.path().exists());
        drop(tmp);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn persist_temp_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("live.db");
        std::fs::write(&target, b"old").unwrap();
        let mut tmp = temp_in(dir.path(), ".restore-", "").unwrap();
        tmp.write_all(b"new").unwrap();
        persist_temp(tmp, &target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn copy_new_copies_bytes() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::write(&src, b"payload").unwrap();
        assert_eq!(copy_new(&src, &dst).unwrap(), 7);
        assert_eq!(std::fs::read(&dst).unwrap(), b"payload");
    }

    #[test]
    fn copy_new_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::write(&src, b"newer").unwrap();
        std::fs::write(&dst, b"keep me").unwrap();

        let err = copy_new(&src, &dst).unwrap_err();
        assert!(
            matches!(&err, crate::error::VaultError::Io(e) if e.kind() == std::io::ErrorKind::AlreadyExists),
            "got {err:?}"
        );
        assert_eq!(std::fs::read(&dst).unwrap(), b"keep me");
    }

    #[test]
    fn parent_of_bare_name_is_cwd() {
        assert_eq!(parent_or_cwd(Path::new("x.db")), Path::new("."));
        assert_eq!(parent_or_cwd(Path::new("/a/x.db")), Path::new("/a"));
    }
}
