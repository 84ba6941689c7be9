// ==========================================
// School Import - import pipeline error types
// ==========================================
// File-scoped conditions abort the file (and are retried by the job
// scheduler); row-scoped conditions are captured on the record instead.
// ==========================================

use crate::domain::types::FailureOrigin;
use crate::repository::error::RepositoryError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    // ===== file-scoped: extraction =====
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported format: no reader registered for MIME type {0}")]
    UnsupportedFormat(String),

    #[error("corrupt input: {0}")]
    CorruptInput(String),

    // ===== file-scoped: classification =====
    #[error("unclassifiable document")]
    Unclassifiable,

    // ===== row-scoped: mapping =====
    // Converted by the orchestrator into a row-level validation error;
    // never aborts the file.
    #[error("type coercion failed (row {row}, field {field}): {message}")]
    TypeCoercion {
        row: usize,
        field: String,
        message: String,
    },

    // ===== file-scoped: persistence / scheduling =====
    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("processing timed out after {0:?}")]
    Timeout(Duration),

    #[error("batch not found: {0}")]
    BatchNotFound(String),

    #[error("file not registered: {0}")]
    UnknownFile(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("invalid state transition: {entity} {from} -> {to}")]
    InvalidStateTransition {
        entity: String,
        from: String,
        to: String,
    },

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// Whether the condition is scoped to a single row (captured on the
    /// record) rather than to the whole file.
    pub fn is_row_scoped(&self) -> bool {
        matches!(self, ImportError::TypeCoercion { .. })
    }

    /// Pipeline stage the failure is attributed to in the file's captured
    /// error detail.
    pub fn origin(&self) -> FailureOrigin {
        match self {
            ImportError::FileNotFound(_)
            | ImportError::UnsupportedFormat(_)
            | ImportError::CorruptInput(_) => FailureOrigin::Extraction,
            ImportError::Unclassifiable => FailureOrigin::Classification,
            ImportError::TypeCoercion { .. } => FailureOrigin::Mapping,
            ImportError::Persistence(_) | ImportError::BatchNotFound(_)
            | ImportError::UnknownFile(_) | ImportError::RecordNotFound(_) => {
                FailureOrigin::Persistence
            }
            ImportError::Timeout(_) => FailureOrigin::Timeout,
            ImportError::InvalidStateTransition { .. }
            | ImportError::Internal(_)
            | ImportError::Other(_) => FailureOrigin::Validation,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ImportError::FileNotFound(err.to_string()),
            _ => ImportError::CorruptInput(err.to_string()),
        }
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CorruptInput(format!("CSV parse failed: {err}"))
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::CorruptInput(format!("spreadsheet parse failed: {err}"))
    }
}

impl From<lopdf::Error> for ImportError {
    fn from(err: lopdf::Error) -> Self {
        ImportError::CorruptInput(format!("PDF parse failed: {err}"))
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::Persistence(format!("serialization failed: {err}"))
    }
}

impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::BatchNotFound(id) => ImportError::BatchNotFound(id),
            RepositoryError::FileNotFound(id) => ImportError::UnknownFile(id),
            RepositoryError::RecordNotFound(id) => ImportError::RecordNotFound(id),
            other => ImportError::Persistence(other.to_string()),
        }
    }
}

/// Result alias for the import pipeline.
pub type ImportPipelineResult<T> = Result<T, ImportError>;
