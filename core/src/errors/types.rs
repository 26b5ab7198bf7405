//! Domain-specific error types for token, credential and validation failures

use jobswipe_shared::errors::{error_codes, ErrorResponse};
use thiserror::Error;

pub use jobswipe_shared::errors::ErrorResponse as DomainErrorResponse;

/// Token-related errors
///
/// The display strings of the verification variants are the messages
/// reported in `VerificationResult::error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token format")]
    InvalidTokenFormat,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Unknown key ID")]
    UnknownKeyId,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid audience or issuer")]
    InvalidAudienceOrIssuer,

    #[error("Token verification failed")]
    VerificationFailed,

    #[error("Token generation failed")]
    TokenGenerationFailed,

    #[error("No current signing key")]
    NoSigningKey,

    #[error("Signing key generation failed: {message}")]
    KeyGenerationFailed { message: String },

    #[error("Invalid token exchange: {reason}")]
    InvalidExchange { reason: String },

    #[error("Device does not match the exchange request")]
    DeviceMismatch,
}

impl TokenError {
    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::InvalidTokenFormat | TokenError::VerificationFailed => {
                error_codes::TOKEN_INVALID
            }
            TokenError::TokenRevoked => error_codes::TOKEN_REVOKED,
            TokenError::UnknownKeyId => error_codes::UNKNOWN_KEY,
            TokenError::InvalidSignature => error_codes::INVALID_SIGNATURE,
            TokenError::TokenExpired => error_codes::TOKEN_EXPIRED,
            TokenError::InvalidAudienceOrIssuer => error_codes::INVALID_AUDIENCE,
            TokenError::TokenGenerationFailed
            | TokenError::NoSigningKey
            | TokenError::KeyGenerationFailed { .. } => error_codes::TOKEN_GENERATION_FAILED,
            TokenError::InvalidExchange { .. } => error_codes::INVALID_EXCHANGE,
            TokenError::DeviceMismatch => error_codes::DEVICE_MISMATCH,
        }
    }
}

/// Credential errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// Input validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field required: {field}")]
    RequiredField { field: String },

    #[error("Invalid value for field {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid length for field {field} (min: {min}, max: {max}, actual: {actual})")]
    InvalidLength {
        field: String,
        min: usize,
        max: usize,
        actual: usize,
    },
}

impl From<TokenError> for ErrorResponse {
    fn from(err: TokenError) -> Self {
        ErrorResponse::new(err.code(), err.to_string())
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        let code = match &err {
            AuthError::InvalidCredentials => error_codes::INVALID_CREDENTIALS,
        };
        ErrorResponse::new(code, err.to_string())
    }
}

impl From<ValidationError> for ErrorResponse {
    fn from(err: ValidationError) -> Self {
        let field = match &err {
            ValidationError::RequiredField { field }
            | ValidationError::InvalidValue { field, .. }
            | ValidationError::InvalidLength { field, .. } => field.clone(),
        };
        ErrorResponse::new(error_codes::VALIDATION_ERROR, err.to_string()).add_detail("field", field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_messages() {
        assert_eq!(TokenError::InvalidTokenFormat.to_string(), "Invalid token format");
        assert_eq!(TokenError::TokenRevoked.to_string(), "Token has been revoked");
        assert_eq!(TokenError::UnknownKeyId.to_string(), "Unknown key ID");
        assert_eq!(TokenError::InvalidSignature.to_string(), "Invalid signature");
        assert_eq!(TokenError::TokenExpired.to_string(), "Token has expired");
        assert_eq!(
            TokenError::InvalidAudienceOrIssuer.to_string(),
            "Invalid audience or issuer"
        );
        assert_eq!(TokenError::VerificationFailed.to_string(), "Token verification failed");
    }

    #[test]
    fn test_token_error_conversion() {
        let response: ErrorResponse = TokenError::TokenExpired.into();
        assert_eq!(response.error, "TOKEN_EXPIRED");
        assert_eq!(response.message, "Token has expired");
    }

    #[test]
    fn test_validation_error_with_fields() {
        let error = ValidationError::InvalidLength {
            field: "password".to_string(),
            min: 8,
            max: 72,
            actual: 3,
        };
        let response: ErrorResponse = error.into();
        assert_eq!(response.error, "VALIDATION_ERROR");
        assert!(response.message.contains("password"));
        assert_eq!(
            response.details.unwrap()["field"],
            serde_json::Value::from("password")
        );
    }
}
