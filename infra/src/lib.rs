//! # Infrastructure Layer
//!
//! Redis-backed implementations for the JobSwipe token services, so that
//! several service instances can share one view of revoked tokens and
//! user session epochs.
//!
//! ## Architecture
//!
//! - **Cache**: Redis client with connection retry and exponential backoff
//! - **Revocation**: `RevocationStore` implementation on top of the client

use std::sync::Arc;

use jobswipe_core::DomainError;
use jobswipe_shared::config::cache::CacheConfig;

/// Cache module - Redis client and operations
pub mod cache;

/// Revocation module - shared revocation store
pub mod revocation;

pub use cache::RedisClient;
pub use revocation::RedisRevocationStore;

/// Connect the shared revocation store
///
/// Loads `.env` if present and reads the Redis settings from the
/// environment (`REDIS_URL`, `REDIS_KEY_PREFIX`, `REDIS_MAX_RETRIES`).
pub async fn initialize() -> Result<RedisRevocationStore, InfrastructureError> {
    tracing::info!("Initializing infrastructure services...");

    dotenvy::dotenv().ok();
    let config = CacheConfig::from_env();
    let store = connect(config).await?;

    tracing::info!("Infrastructure services initialized successfully");
    Ok(store)
}

/// Connect a revocation store with explicit settings
pub async fn connect(config: CacheConfig) -> Result<RedisRevocationStore, InfrastructureError> {
    let client = RedisClient::new(config).await?;
    Ok(RedisRevocationStore::new(Arc::new(client)))
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<InfrastructureError> for DomainError {
    fn from(err: InfrastructureError) -> Self {
        DomainError::Internal {
            message: err.to_string(),
        }
    }
}
