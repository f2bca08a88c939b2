use thiserror::Error;

use crate::database::manager::DatabaseError;

/// Errors returned by the progress and certificate services
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Internal(String),
}

impl ProgressError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ProgressError::NotFound(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ProgressError::Invalid(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ProgressError::Forbidden(message.into())
    }
}

impl From<DatabaseError> for ProgressError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ProgressError::NotFound(msg),
            DatabaseError::Conflict(msg) => ProgressError::Conflict(msg),
            DatabaseError::CheckViolation(msg) => {
                tracing::warn!(error = %msg, "Progress counter out of range");
                ProgressError::Invalid(msg)
            }
            other => {
                // Never leak driver details to callers
                tracing::error!(error = %other, "Database error in progress service");
                ProgressError::Internal("Database error occurred".to_string())
            }
        }
    }
}
