use crate::validation::FieldError;
use itinera_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("itinerary not found")]
    NotFound,
    #[error("access denied")]
    AccessDenied,
    #[error("validation failed: {} invalid field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("share store unavailable")]
    ShareUnavailable,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<Vec<FieldError>> for ServiceError {
    fn from(errors: Vec<FieldError>) -> Self {
        ServiceError::Validation(errors)
    }
}
