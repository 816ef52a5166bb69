//! Error types for rdx-storage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rule not found: {0}")]
    RuleNotFound(i64),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
