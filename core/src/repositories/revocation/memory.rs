//! In-process revocation store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::RevokedToken;
use crate::errors::DomainError;

use super::r#trait::RevocationStore;

/// Revocation store held in memory, suitable for a single instance
///
/// Clones share the same underlying maps.
#[derive(Clone, Default)]
pub struct InMemoryRevocationStore {
    revoked: Arc<RwLock<HashMap<String, RevokedToken>>>,
    epochs: Arc<RwLock<HashMap<String, u64>>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), DomainError> {
        let mut revoked = self.revoked.write().await;
        revoked
            .entry(jti.to_string())
            .and_modify(|entry| {
                if expires_at > entry.expires_at {
                    entry.expires_at = expires_at;
                }
            })
            .or_insert_with(|| RevokedToken::new(jti, expires_at));
        Ok(())
    }

    async fn try_revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool, DomainError> {
        let mut revoked = self.revoked.write().await;
        if revoked.contains_key(jti) {
            return Ok(false);
        }
        revoked.insert(jti.to_string(), RevokedToken::new(jti, expires_at));
        Ok(true)
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, DomainError> {
        Ok(self.revoked.read().await.contains_key(jti))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut revoked = self.revoked.write().await;
        let before = revoked.len();
        revoked.retain(|_, entry| !entry.is_expired_at(now));
        Ok(before - revoked.len())
    }

    async fn len(&self) -> Result<usize, DomainError> {
        Ok(self.revoked.read().await.len())
    }

    async fn bump_user_epoch(&self, user_id: &str) -> Result<u64, DomainError> {
        let mut epochs = self.epochs.write().await;
        let epoch = epochs.entry(user_id.to_string()).or_insert(0);
        *epoch += 1;
        Ok(*epoch)
    }

    async fn user_epoch(&self, user_id: &str) -> Result<u64, DomainError> {
        Ok(self.epochs.read().await.get(user_id).copied().unwrap_or(0))
    }
}
