//! # JobSwipe Core
//!
//! Core domain layer for the JobSwipe token services: signed token
//! issuance and verification with rotating Ed25519 keys, revocation,
//! web-to-desktop token exchange and password hashing.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::entities::{
    AuthSource, Claims, Jwk, Jwks, PublicKeyInfo, TokenMetadata, TokenRequest, TokenType,
};
pub use domain::value_objects::{
    FailureDisposition, TokenState, VerificationFailure, VerificationResult,
};
pub use errors::{AuthError, DomainError, DomainResult, TokenError, ValidationError};
pub use repositories::{InMemoryRevocationStore, RevocationStore};
pub use services::{
    CleanupResult, DesktopTokenGrant, ExchangeTicket, HealthState, HealthStatus, IssuedToken,
    MaintenanceHandle, MetricsSnapshot, PasswordHasher, TokenExchangeService, TokenService,
    TokenServiceConfig,
};
