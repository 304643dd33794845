use crate::error::{Result, VaultError};
use crate::paths;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Live database owned by the running service.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    /// Snapshots whose mtime is more than this many days old are pruned.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Recent snapshots reported after a backup run. 0 disables the report.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(paths::DEFAULT_DB_PATH)
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_BACKUP_DIR)
}

fn default_retention_days() -> u32 {
    paths::DEFAULT_RETENTION_DAYS
}

fn default_prefix() -> String {
    paths::DEFAULT_PREFIX.to_string()
}

fn default_list_limit() -> usize {
    paths::DEFAULT_LIST_LIMIT
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            backup_dir: default_backup_dir(),
            retention_days: default_retention_days(),
            prefix: default_prefix(),
            list_limit: default_list_limit(),
        }
    }
}

static PREFIX_RE: OnceLock<Regex> = OnceLock::new();

fn prefix_re() -> &'static Regex {
    PREFIX_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap())
}

impl Settings {
    /// Load settings from a YAML file. Keys left out fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VaultError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(&data)?;
        Ok(settings)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.prefix.is_empty() || !prefix_re().is_match(&self.prefix) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "prefix '{}' must be non-empty and use only letters, digits, '_' or '-'",
                    self.prefix
                ),
            });
        }

        if self.retention_days == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "retention_days is 0: every earlier snapshot is pruned on each run".to_string(),
            });
        }

        if self.db_path.parent() == Some(self.backup_dir.as_path()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "backup_dir {} is the live database directory; snapshots share its disk and lifecycle",
                    self.backup_dir.display()
                ),
            });
        }

        warnings
    }

    /// Fail on the first `Error`-level warning.
    pub fn ensure_valid(&self) -> Result<()> {
        match self
            .validate()
            .into_iter()
            .find(|w| w.level == WarnLevel::Error)
        {
            Some(w) => Err(VaultError::Config(w.message)),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
