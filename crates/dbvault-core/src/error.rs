use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("{0}")]
    Usage(String),

    #[error("database file not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("backup file not found: {}", .0.display())]
    MissingBackup(PathBuf),

    #[error("engine backup failed: {0}")]
    EngineBackup(String),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("invalid restore transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, VaultError>;
