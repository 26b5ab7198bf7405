//! Configuration for the token service

use std::time::Duration;

use jobswipe_shared::config::JwtConfig;

use crate::domain::entities::{TokenRequest, TokenType};

/// Configuration for the token service
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// Expected and issued `iss` claim
    pub issuer: String,
    /// Expected and issued `aud` claim
    pub audience: String,
    /// Access token lifetime in seconds
    pub access_token_expiry: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_expiry: i64,
    /// Desktop long-lived token lifetime in seconds
    pub desktop_token_expiry: i64,
    /// Verification token lifetime in seconds
    pub verification_token_expiry: i64,
    /// Period of the key rotation loop
    pub key_rotation_interval: Duration,
    /// How long a generated key pair stays available
    pub key_lifetime: chrono::Duration,
    /// Period of the revocation cleanup loop
    pub cleanup_interval: Duration,
    /// Tokens closer than this to expiry are flagged for refresh, in seconds
    pub refresh_threshold: i64,
    /// Retention of a revocation whose token expiry is unknown, in seconds
    pub revocation_retention: i64,
    /// Revoked-set size above which cleanup warns
    pub revoked_soft_limit: usize,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self::from(&JwtConfig::default())
    }
}

impl From<&JwtConfig> for TokenServiceConfig {
    fn from(jwt: &JwtConfig) -> Self {
        Self {
            issuer: jwt.issuer.clone(),
            audience: jwt.audience.clone(),
            access_token_expiry: jwt.access_token_expiry,
            refresh_token_expiry: jwt.refresh_token_expiry,
            desktop_token_expiry: jwt.desktop_token_expiry,
            verification_token_expiry: jwt.verification_token_expiry,
            key_rotation_interval: Duration::from_secs(jwt.key_rotation_interval),
            key_lifetime: chrono::Duration::try_seconds(jwt.key_lifetime)
                .unwrap_or(chrono::Duration::MAX),
            cleanup_interval: Duration::from_secs(jwt.cleanup_interval),
            refresh_threshold: jwt.refresh_threshold,
            revocation_retention: jwt.max_token_lifetime(),
            revoked_soft_limit: jwt.revoked_soft_limit,
        }
    }
}

impl TokenServiceConfig {
    /// Configured lifetime for a token type, in seconds
    pub fn expiry_for(&self, token_type: TokenType) -> i64 {
        match token_type {
            TokenType::Access => self.access_token_expiry,
            TokenType::Refresh => self.refresh_token_expiry,
            TokenType::DesktopLongLived => self.desktop_token_expiry,
            TokenType::Verification => self.verification_token_expiry,
        }
    }
}

impl TokenRequest {
    /// Request for a token of `token_type` with its configured lifetime
    pub fn for_type(
        subject: impl Into<String>,
        token_type: TokenType,
        config: &TokenServiceConfig,
    ) -> Self {
        Self::new(subject, token_type, config.expiry_for(token_type))
    }

    pub fn access(subject: impl Into<String>, config: &TokenServiceConfig) -> Self {
        Self::for_type(subject, TokenType::Access, config)
    }

    pub fn refresh(subject: impl Into<String>, config: &TokenServiceConfig) -> Self {
        Self::for_type(subject, TokenType::Refresh, config)
    }

    pub fn desktop(subject: impl Into<String>, config: &TokenServiceConfig) -> Self {
        Self::for_type(subject, TokenType::DesktopLongLived, config)
    }

    pub fn verification(subject: impl Into<String>, config: &TokenServiceConfig) -> Self {
        Self::for_type(subject, TokenType::Verification, config)
    }
}
