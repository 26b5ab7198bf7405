//! Outcome of token verification

use serde::Serialize;

use crate::domain::entities::Claims;
use crate::errors::TokenError;

/// Why a token failed verification, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationFailure {
    /// Not three dot-separated segments
    InvalidFormat,
    /// Header or payload could not be decoded
    Malformed,
    /// jti is revoked or the subject's session epoch moved on
    Revoked,
    /// kid missing or not in the key ring
    UnknownKey,
    InvalidSignature,
    Expired,
    AudienceMismatch,
    /// Store or other internal failure
    Internal,
}

/// What a client should do after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureDisposition {
    /// Obtain a new token with the refresh token
    Refresh,
    /// Sign in again
    Reauthenticate,
    /// Reject without recovery
    Unauthorized,
}

impl VerificationFailure {
    pub fn to_token_error(self) -> TokenError {
        match self {
            VerificationFailure::InvalidFormat => TokenError::InvalidTokenFormat,
            VerificationFailure::Revoked => TokenError::TokenRevoked,
            VerificationFailure::UnknownKey => TokenError::UnknownKeyId,
            VerificationFailure::InvalidSignature => TokenError::InvalidSignature,
            VerificationFailure::Expired => TokenError::TokenExpired,
            VerificationFailure::AudienceMismatch => TokenError::InvalidAudienceOrIssuer,
            VerificationFailure::Malformed | VerificationFailure::Internal => {
                TokenError::VerificationFailed
            }
        }
    }

    pub fn message(self) -> String {
        self.to_token_error().to_string()
    }

    /// Failures counted in the error metric
    pub fn is_error(self) -> bool {
        matches!(
            self,
            VerificationFailure::Malformed | VerificationFailure::Internal
        )
    }

    pub fn disposition(self) -> FailureDisposition {
        match self {
            VerificationFailure::Expired => FailureDisposition::Refresh,
            VerificationFailure::Revoked
            | VerificationFailure::InvalidSignature
            | VerificationFailure::UnknownKey => FailureDisposition::Reauthenticate,
            _ => FailureDisposition::Unauthorized,
        }
    }
}

/// Lifecycle state of a token as observed by one verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    Fresh,
    NeedsRefresh,
    Expired,
    Revoked,
    SignatureInvalid,
    KeyUnknown,
    /// Malformed, wrong audience or internal failure
    Rejected,
}

impl TokenState {
    pub fn is_usable(self) -> bool {
        matches!(self, TokenState::Fresh | TokenState::NeedsRefresh)
    }
}

/// Result of `verify_token`; failures are reported here, never raised
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Claims>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub expired: bool,

    pub needs_refresh: bool,

    #[serde(skip)]
    pub failure: Option<VerificationFailure>,
}

impl VerificationResult {
    pub fn success(claims: Claims, needs_refresh: bool) -> Self {
        Self {
            valid: true,
            payload: Some(claims),
            error: None,
            expired: false,
            needs_refresh,
            failure: None,
        }
    }

    pub fn failed(failure: VerificationFailure) -> Self {
        Self {
            valid: false,
            payload: None,
            error: Some(failure.message()),
            expired: failure == VerificationFailure::Expired,
            needs_refresh: false,
            failure: Some(failure),
        }
    }

    pub fn state(&self) -> TokenState {
        match self.failure {
            None if self.needs_refresh => TokenState::NeedsRefresh,
            None => TokenState::Fresh,
            Some(VerificationFailure::Expired) => TokenState::Expired,
            Some(VerificationFailure::Revoked) => TokenState::Revoked,
            Some(VerificationFailure::InvalidSignature) => TokenState::SignatureInvalid,
            Some(VerificationFailure::UnknownKey) => TokenState::KeyUnknown,
            Some(_) => TokenState::Rejected,
        }
    }

    /// Claims of a valid token, or the matching `TokenError`
    pub fn into_claims(self) -> Result<Claims, TokenError> {
        match (self.payload, self.failure) {
            (Some(claims), None) => Ok(claims),
            (_, Some(failure)) => Err(failure.to_token_error()),
            (None, None) => Err(TokenError::VerificationFailed),
        }
    }
}
