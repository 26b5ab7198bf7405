mod service_tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::DomainError;
use crate::repositories::{InMemoryRevocationStore, RevocationStore};
use crate::services::token::{TokenService, TokenServiceConfig};

pub(super) fn test_service() -> TokenService<InMemoryRevocationStore> {
    service_with(TokenServiceConfig::default())
}

pub(super) fn service_with(config: TokenServiceConfig) -> TokenService<InMemoryRevocationStore> {
    TokenService::new(config, InMemoryRevocationStore::new()).unwrap()
}

/// Store whose every call fails, as an unreachable backend would
pub(super) struct FailingStore;

fn unavailable() -> DomainError {
    DomainError::Internal {
        message: "store unavailable".to_string(),
    }
}

#[async_trait]
impl RevocationStore for FailingStore {
    async fn revoke(&self, _jti: &str, _expires_at: DateTime<Utc>) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn try_revoke(&self, _jti: &str, _expires_at: DateTime<Utc>) -> Result<bool, DomainError> {
        Err(unavailable())
    }

    async fn is_revoked(&self, _jti: &str) -> Result<bool, DomainError> {
        Err(unavailable())
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize, DomainError> {
        Err(unavailable())
    }

    async fn len(&self) -> Result<usize, DomainError> {
        Err(unavailable())
    }

    async fn bump_user_epoch(&self, _user_id: &str) -> Result<u64, DomainError> {
        Err(unavailable())
    }

    async fn user_epoch(&self, _user_id: &str) -> Result<u64, DomainError> {
        Err(unavailable())
    }
}
