//! Domain-specific error types and error handling.

mod types;

pub use types::{AuthError, DomainErrorResponse as ErrorResponse, TokenError, ValidationError};

use jobswipe_shared::errors::{error_codes, IntoErrorResponse};
use thiserror::Error;

/// Core domain errors (general purpose)
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl IntoErrorResponse for DomainError {
    fn to_error_response(&self) -> ErrorResponse {
        match self {
            // Internal details stay in the logs
            DomainError::Internal { .. } => {
                ErrorResponse::new(error_codes::INTERNAL_ERROR, "Internal server error")
            }
            DomainError::Auth(err) => err.clone().into(),
            DomainError::Token(err) => err.clone().into(),
            DomainError::Validation(err) => err.clone().into(),
        }
    }
}
