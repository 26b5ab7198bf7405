//! Revocation entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A revoked token ID, kept until `expires_at` passes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokedToken {
    pub jti: String,
    pub revoked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RevokedToken {
    pub fn new(jti: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            jti: jti.into(),
            revoked_at: Utc::now(),
            expires_at,
        }
    }

    /// Whether the entry can be dropped at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Remaining retention in whole seconds, never below one
    pub fn ttl_seconds(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(1) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_revoked_token_expiry() {
        let now = Utc::now();
        let entry = RevokedToken::new("jti-1", now + Duration::seconds(30));

        assert!(!entry.is_expired_at(now));
        assert!(entry.is_expired_at(now + Duration::seconds(30)));
        assert_eq!(entry.ttl_seconds(now), 30);
        assert_eq!(entry.ttl_seconds(now + Duration::hours(1)), 1);
    }
}
