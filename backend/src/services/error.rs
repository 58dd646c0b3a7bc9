//! Error type shared by the service layer.

use crate::clients::ClientError;
use crate::db::repository::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Input rejected before touching storage.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The request collides with stored state (slug taken, slot full, ...).
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),

    #[error("Payment error: {0}")]
    Payment(ClientError),

    #[error("Storage error: {0}")]
    Storage(ClientError),

    #[error("Translation error: {0}")]
    Translation(ClientError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { message, .. } => ServiceError::NotFound(message),
            RepositoryError::ConflictError { message, .. } => ServiceError::Conflict(message),
            RepositoryError::ValidationError { message, .. } => ServiceError::Validation(message),
            other => ServiceError::Repository(other),
        }
    }
}
