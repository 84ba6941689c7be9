// ==========================================
// School Import - repository error types
// ==========================================
// Repository layer does data access only; no business rules.
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(String),

    #[error("database connection lock poisoned")]
    LockPoisoned,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("batch not found: {0}")]
    BatchNotFound(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
