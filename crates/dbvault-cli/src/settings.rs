use anyhow::Context;
use dbvault_core::config::Settings;
use std::path::{Path, PathBuf};

/// Resolve the effective settings.
///
/// Priority:
/// 1. `--db-path` / `DB_PATH` and `--retention-days` / `RETENTION_DAYS`
/// 2. The YAML file named by `--config` / `DBVAULT_CONFIG`
/// 3. Built-in defaults
///
/// The backup directory positional is applied per command on top of this.
pub fn resolve_settings(
    config: Option<&Path>,
    db_path: Option<PathBuf>,
    retention_days: Option<u32>,
) -> anyhow::Result<Settings> {
    let mut settings = match config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Settings::default(),
    };

    if let Some(p) = db_path {
        settings.db_path = p;
    }
    if let Some(days) = retention_days {
        settings.retention_days = days;
    }

    Ok(settings)
}

/// Apply an optional directory positional, then refuse settings with errors.
pub fn with_backup_dir(mut settings: Settings, dir: Option<PathBuf>) -> anyhow::Result<Settings> {
    if let Some(d) = dir {
        settings.backup_dir = d;
    }
    settings.ensure_valid()?;
    Ok(settings)
}
