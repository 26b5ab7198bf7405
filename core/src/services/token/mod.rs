//! Token service module for signed token management
//!
//! This module handles all token-related operations including:
//! - Token issuance and step-by-step verification
//! - Signing key rotation with a grace window for older keys
//! - Revocation by token ID or by user session epoch
//! - Background key rotation and revocation cleanup
//! - Counters and health reporting

mod cleanup;
mod config;
mod key_manager;
mod metrics;
mod service;

#[cfg(test)]
mod tests;

pub use cleanup::{spawn_maintenance, CleanupResult, MaintenanceHandle};
pub use config::TokenServiceConfig;
pub use key_manager::{KeyManager, RotationOutcome};
pub use metrics::{
    HealthDetails, HealthState, HealthStatus, MetricsSnapshot, TokenMetrics,
    DEGRADED_ERROR_RATE, MIN_HEALTHY_KEYS,
};
pub use service::{IssuedToken, TokenService};
