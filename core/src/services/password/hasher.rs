//! bcrypt password hashing with length checks and cost-upgrade detection

use bcrypt::HashParts;
use jobswipe_shared::config::PasswordConfig;
use tracing::{error, warn};

use crate::errors::{AuthError, DomainError, DomainResult, ValidationError};

/// bcrypt only reads the first 72 bytes of its input
pub const BCRYPT_MAX_PASSWORD_BYTES: usize = 72;

/// Hashes and checks passwords
///
/// bcrypt is deliberately slow; call from `spawn_blocking` on hot async paths.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    min_length: usize,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(&PasswordConfig::default())
    }
}

impl PasswordHasher {
    pub fn new(config: &PasswordConfig) -> Self {
        Self {
            cost: config.bcrypt_cost,
            min_length: config.min_length,
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Check a candidate password against the length rules
    pub fn validate(&self, password: &str) -> Result<(), ValidationError> {
        if password.is_empty() {
            return Err(ValidationError::RequiredField {
                field: "password".to_string(),
            });
        }
        let actual = password.len();
        if actual < self.min_length || actual > BCRYPT_MAX_PASSWORD_BYTES {
            return Err(ValidationError::InvalidLength {
                field: "password".to_string(),
                min: self.min_length,
                max: BCRYPT_MAX_PASSWORD_BYTES,
                actual,
            });
        }
        Ok(())
    }

    /// Hash a password with the configured cost
    pub fn hash(&self, password: &str) -> DomainResult<String> {
        self.validate(password)?;
        bcrypt::hash(password, self.cost).map_err(|e| {
            error!(error = %e, "Password hashing failed");
            DomainError::Internal {
                message: format!("Password hashing failed: {}", e),
            }
        })
    }

    /// Check a password against a stored hash
    ///
    /// # Returns
    ///
    /// * `Ok(bool)` - Whether the password matches
    /// * `Err(DomainError::Internal)` - The stored hash is malformed
    pub fn verify(&self, password: &str, hash: &str) -> DomainResult<bool> {
        if password.is_empty() || password.len() > BCRYPT_MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        bcrypt::verify(password, hash).map_err(|e| {
            warn!(error = %e, "Stored password hash is unreadable");
            DomainError::Internal {
                message: format!("Invalid password hash: {}", e),
            }
        })
    }

    /// Like [`verify`](Self::verify) but a mismatch is `AuthError::InvalidCredentials`
    pub fn verify_or_reject(&self, password: &str, hash: &str) -> DomainResult<()> {
        if self.verify(password, hash)? {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials.into())
        }
    }

    /// Whether a stored hash was made with a lower cost than configured
    ///
    /// Unparseable hashes always need rehashing.
    pub fn needs_rehash(&self, hash: &str) -> bool {
        match hash.parse::<HashParts>() {
            Ok(parts) => parts.get_cost() < self.cost,
            Err(_) => true,
        }
    }
}
