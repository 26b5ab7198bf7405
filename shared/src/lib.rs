//! Shared configuration and common types for the JobSwipe token services
//!
//! This crate provides functionality used across all server modules:
//! - Configuration types and layered loading
//! - Error response structures
//! - Tracing subscriber initialisation

pub mod config;
pub mod errors;
pub mod telemetry;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, CacheConfig, ConfigLoadError, Environment, JwtConfig, LogFormat,
    LoggingConfig, PasswordConfig,
};
pub use errors::{error_codes, ErrorResponse, IntoErrorResponse};
pub use telemetry::init_tracing;
