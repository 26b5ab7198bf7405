//! Signing key ring: the current key plus every key still valid for verification

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};

use crate::domain::entities::{Jwks, PublicKeyInfo, SigningKeyPair};
use crate::errors::TokenError;

#[derive(Default)]
struct KeyRing {
    current_kid: Option<String>,
    keys: HashMap<String, Arc<SigningKeyPair>>,
}

/// Outcome of a key rotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    /// Key ID of the new current key
    pub key_id: String,
    /// Previous current key, if any
    pub previous_key_id: Option<String>,
    /// Number of expired keys removed
    pub pruned: usize,
}

/// Manager for the rotating set of signing keys
///
/// The current key ID and the key map sit behind one lock, so readers
/// never see a current key that is missing from the map.
pub struct KeyManager {
    ring: RwLock<KeyRing>,
    key_lifetime: Duration,
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ring = self.read();
        f.debug_struct("KeyManager")
            .field("current_kid", &ring.current_kid)
            .field("keys", &ring.keys.len())
            .field("key_lifetime", &self.key_lifetime)
            .finish()
    }
}

impl KeyManager {
    /// Creates a key manager holding one freshly generated key
    ///
    /// # Arguments
    ///
    /// * `key_lifetime` - How long each generated key stays available
    ///
    /// # Returns
    ///
    /// * `Ok(KeyManager)` - With a current key
    /// * `Err(TokenError::KeyGenerationFailed)` - The first key could not be generated
    pub fn new(key_lifetime: Duration) -> Result<Self, TokenError> {
        let manager = Self {
            ring: RwLock::new(KeyRing::default()),
            key_lifetime,
        };
        manager.rotate(Utc::now())?;
        Ok(manager)
    }

    // Every mutation is a single insert/retain, so a poisoned ring is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, KeyRing> {
        self.ring.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, KeyRing> {
        self.ring.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generate a new key, make it current and prune expired keys
    ///
    /// On failure the ring is left untouched.
    pub fn rotate(&self, now: DateTime<Utc>) -> Result<RotationOutcome, TokenError> {
        let key = SigningKeyPair::generate(now, self.key_lifetime)?;
        let key_id = key.key_id.clone();

        let mut ring = self.write();
        ring.keys.insert(key_id.clone(), Arc::new(key));
        let previous_key_id = ring.current_kid.replace(key_id.clone());

        let before = ring.keys.len();
        ring.keys
            .retain(|kid, key| *kid == key_id || !key.is_expired_at(now));
        let pruned = before - ring.keys.len();

        Ok(RotationOutcome {
            key_id,
            previous_key_id,
            pruned,
        })
    }

    /// The key new tokens are signed with
    pub fn current(&self) -> Option<Arc<SigningKeyPair>> {
        let ring = self.read();
        ring.current_kid
            .as_ref()
            .and_then(|kid| ring.keys.get(kid))
            .cloned()
    }

    pub fn current_key_id(&self) -> Option<String> {
        self.read().current_kid.clone()
    }

    /// Look up a key for verification; expired keys count as absent
    pub fn get(&self, kid: &str, now: DateTime<Utc>) -> Option<Arc<SigningKeyPair>> {
        self.read()
            .keys
            .get(kid)
            .filter(|key| !key.is_expired_at(now))
            .cloned()
    }

    /// Number of keys available for verification
    pub fn key_count(&self, now: DateTime<Utc>) -> usize {
        self.read()
            .keys
            .values()
            .filter(|key| !key.is_expired_at(now))
            .count()
    }

    /// Public halves of all available keys, newest first
    pub fn public_keys(&self, now: DateTime<Utc>) -> Vec<PublicKeyInfo> {
        let mut keys: Vec<PublicKeyInfo> = self
            .read()
            .keys
            .values()
            .filter(|key| !key.is_expired_at(now))
            .map(|key| key.public_info())
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        keys
    }

    pub fn jwks(&self, now: DateTime<Utc>) -> Jwks {
        let ring = self.read();
        let mut keys: Vec<&Arc<SigningKeyPair>> = ring
            .keys
            .values()
            .filter(|key| !key.is_expired_at(now))
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Jwks {
            keys: keys.into_iter().map(|key| key.to_jwk()).collect(),
        }
    }
}
