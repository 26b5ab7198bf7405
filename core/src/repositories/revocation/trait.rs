//! Revocation store trait defining the interface for revoked token IDs
//! and per-user session epochs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::DomainError;

/// Store of revoked token IDs and user session epochs
///
/// Every revoked `jti` carries its own expiry and is dropped by
/// `purge_expired` once that passes. Session epochs only ever grow.
///
/// # Consistency
/// - `revoke` and `try_revoke` must be visible to `is_revoked` on the
///   same store as soon as they return
/// - `try_revoke` must be atomic: of two concurrent calls for the same
///   `jti`, exactly one returns `true`
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Revoke a token ID until `expires_at`
    ///
    /// Revoking an already revoked ID keeps the later of the two expiries.
    ///
    /// # Arguments
    /// * `jti` - The token ID to revoke
    /// * `expires_at` - When the entry may be purged
    ///
    /// # Example
    /// ```no_run
    /// # use chrono::{Duration, Utc};
    /// # use jobswipe_core::repositories::RevocationStore;
    /// # async fn example(store: &impl RevocationStore) -> Result<(), Box<dyn std::error::Error>> {
    /// store.revoke("9b2c6c1e-jti", Utc::now() + Duration::hours(1)).await?;
    /// assert!(store.is_revoked("9b2c6c1e-jti").await?);
    /// # Ok(())
    /// # }
    /// ```
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), DomainError>;

    /// Revoke a token ID only if it is not revoked yet
    ///
    /// # Returns
    /// * `Ok(true)` - This call revoked the ID
    /// * `Ok(false)` - The ID was already revoked
    async fn try_revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool, DomainError>;

    /// Check whether a token ID is revoked
    async fn is_revoked(&self, jti: &str) -> Result<bool, DomainError>;

    /// Remove entries whose expiry is at or before `now`
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of entries removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Number of revoked entries currently held
    async fn len(&self) -> Result<usize, DomainError>;

    async fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len().await? == 0)
    }

    /// Advance a user's session epoch, revoking every token issued before
    ///
    /// # Returns
    /// * `Ok(u64)` - The new epoch
    async fn bump_user_epoch(&self, user_id: &str) -> Result<u64, DomainError>;

    /// Current session epoch of a user (zero if never bumped)
    async fn user_epoch(&self, user_id: &str) -> Result<u64, DomainError>;
}
