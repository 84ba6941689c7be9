// ==========================================
// School Import - API layer error types
// ==========================================
// Converts pipeline and repository errors into user-facing messages.
// Every variant carries an explicit reason.
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state transition: {entity} {from} -> {to}")]
    InvalidStateTransition {
        entity: String,
        from: String,
        to: String,
    },

    #[error("import failed: {0}")]
    ImportFailed(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::BatchNotFound(id) => ApiError::NotFound(format!("batch {id}")),
            ImportError::UnknownFile(id) => ApiError::NotFound(format!("file {id}")),
            ImportError::RecordNotFound(id) => ApiError::NotFound(format!("record {id}")),
            ImportError::InvalidStateTransition { entity, from, to } => {
                ApiError::InvalidStateTransition { entity, from, to }
            }
            ImportError::Persistence(msg) => ApiError::DatabaseError(msg),
            ImportError::Internal(msg) => ApiError::InternalError(msg),
            ImportError::Other(err) => ApiError::Other(err),
            other => ApiError::ImportFailed(other.to_string()),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::BatchNotFound(id) => ApiError::NotFound(format!("batch {id}")),
            RepositoryError::FileNotFound(id) => ApiError::NotFound(format!("file {id}")),
            RepositoryError::RecordNotFound(id) => ApiError::NotFound(format!("record {id}")),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

/// Result alias for the API layer.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_error_conversion() {
        let api_err: ApiError = ImportError::BatchNotFound("b1".into()).into();
        assert!(matches!(api_err, ApiError::NotFound(ref msg) if msg.contains("b1")));

        let api_err: ApiError = ImportError::Unclassifiable.into();
        assert!(matches!(api_err, ApiError::ImportFailed(_)));
    }

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::RecordNotFound("r1".into()).into();
        assert!(matches!(api_err, ApiError::NotFound(ref msg) if msg.contains("r1")));
    }
}
