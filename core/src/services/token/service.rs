//! Main token service implementation

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{crypto, decode_header, encode, Header};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::entities::{Claims, Jwks, PublicKeyInfo, TokenRequest};
use crate::domain::value_objects::{VerificationFailure, VerificationResult};
use crate::errors::{DomainError, DomainResult, TokenError, ValidationError};
use crate::repositories::RevocationStore;

use super::cleanup::CleanupResult;
use super::config::TokenServiceConfig;
use super::key_manager::{KeyManager, RotationOutcome};
use super::metrics::{HealthStatus, MetricsSnapshot, TokenMetrics};

/// A freshly signed token together with the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub key_id: String,
}

/// A token split into its segments with header and payload decoded
struct ParsedToken<'a> {
    header: Header,
    claims: Claims,
    signing_input: &'a str,
    signature: &'a str,
}

/// Service for issuing, verifying and revoking signed tokens
pub struct TokenService<S: RevocationStore> {
    store: S,
    config: TokenServiceConfig,
    keys: KeyManager,
    metrics: TokenMetrics,
}

impl<S: RevocationStore> TokenService<S> {
    /// Creates a new token service instance
    ///
    /// The first signing key is generated here; if that fails no service
    /// is created. Background rotation and cleanup are not started, see
    /// [`TokenService::start`].
    ///
    /// # Arguments
    ///
    /// * `config` - Token service configuration
    /// * `store` - Revocation store for revoked IDs and session epochs
    pub fn new(config: TokenServiceConfig, store: S) -> DomainResult<Self> {
        let keys = KeyManager::new(config.key_lifetime).map_err(|e| {
            error!(error = %e, "Failed to generate initial signing key");
            DomainError::Token(e)
        })?;

        let key_id = keys.current_key_id().unwrap_or_default();
        info!(
            key_id = %key_id,
            issuer = %config.issuer,
            audience = %config.audience,
            "Token service initialised"
        );

        Ok(Self {
            store,
            config,
            keys,
            metrics: TokenMetrics::new(),
        })
    }

    pub fn config(&self) -> &TokenServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Signs a token for the request with the current key
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Compact JWS `header.payload.signature`
    /// * `Err(DomainError)` - Invalid request, no signing key or signing failure
    pub async fn create_token(&self, request: TokenRequest) -> DomainResult<String> {
        self.issue(request).await.map(|issued| issued.token)
    }

    /// Like [`create_token`](Self::create_token) but also returns the claims
    pub async fn issue(&self, request: TokenRequest) -> DomainResult<IssuedToken> {
        request.validate()?;

        let key = self.keys.current().ok_or_else(|| {
            self.metrics.record_error();
            error!("No current signing key");
            TokenError::NoSigningKey
        })?;

        let epoch = self
            .store
            .user_epoch(&request.subject)
            .await
            .map_err(|e| self.store_failure(e, "Failed to read user session epoch"))?;

        let TokenRequest {
            subject,
            expires_in,
            audience,
            issuer,
            token_type,
            source,
            session_id,
            permissions,
            features,
            mut metadata,
        } = request;

        let stripped = metadata.strip_reserved();
        if !stripped.is_empty() {
            warn!(keys = ?stripped, "Dropped metadata keys that shadow registered claims");
        }

        let iat = Utc::now().timestamp();
        let exp = iat
            .checked_add(expires_in)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "expires_in".to_string(),
                reason: "lifetime overflows the expiry timestamp".to_string(),
            })?;

        let claims = Claims {
            sub: subject,
            iat,
            exp,
            aud: audience.unwrap_or_else(|| self.config.audience.clone()),
            iss: issuer.unwrap_or_else(|| self.config.issuer.clone()),
            jti: Uuid::new_v4().to_string(),
            token_type,
            source,
            session_id,
            permissions,
            features,
            epoch,
            metadata,
        };

        let mut header = Header::new(key.algorithm);
        header.kid = Some(key.key_id.clone());

        let token = encode(&header, &claims, key.encoding_key()).map_err(|e| {
            self.metrics.record_error();
            error!(error = %e, kid = %key.key_id, "Token signing failed");
            TokenError::TokenGenerationFailed
        })?;

        self.metrics.record_issued();
        debug!(
            jti = %claims.jti,
            sub = %claims.sub,
            token_type = %claims.token_type,
            kid = %key.key_id,
            "Token issued"
        );

        Ok(IssuedToken {
            token,
            claims,
            key_id: key.key_id.clone(),
        })
    }

    /// Verifies a token
    ///
    /// Never fails: every problem is reported in the returned result.
    pub async fn verify_token(&self, token: &str) -> VerificationResult {
        match self.check(token).await {
            Ok((claims, needs_refresh)) => {
                self.metrics.record_verified();
                debug!(jti = %claims.jti, sub = %claims.sub, needs_refresh, "Token verified");
                VerificationResult::success(claims, needs_refresh)
            }
            Err(failure) => {
                if failure.is_error() {
                    self.metrics.record_error();
                }
                debug!(reason = %failure.message(), "Token rejected");
                VerificationResult::failed(failure)
            }
        }
    }

    async fn check(&self, token: &str) -> Result<(Claims, bool), VerificationFailure> {
        let parsed = parse(token)?;
        self.check_revocation(&parsed.claims).await?;
        self.check_signature(&parsed)?;

        let claims = parsed.claims;
        let now = Utc::now().timestamp();
        if claims.is_expired_at(now) {
            return Err(VerificationFailure::Expired);
        }
        let needs_refresh = claims.remaining_secs(now) < self.config.refresh_threshold;

        if claims.aud != self.config.audience || claims.iss != self.config.issuer {
            return Err(VerificationFailure::AudienceMismatch);
        }

        Ok((claims, needs_refresh))
    }

    async fn check_revocation(&self, claims: &Claims) -> Result<(), VerificationFailure> {
        let revoked = self.store.is_revoked(&claims.jti).await.map_err(|e| {
            error!(error = %e, "Revocation lookup failed");
            VerificationFailure::Internal
        })?;
        if revoked {
            return Err(VerificationFailure::Revoked);
        }

        let current_epoch = self.store.user_epoch(&claims.sub).await.map_err(|e| {
            error!(error = %e, "Session epoch lookup failed");
            VerificationFailure::Internal
        })?;
        if claims.epoch < current_epoch {
            return Err(VerificationFailure::Revoked);
        }

        Ok(())
    }

    fn check_signature(&self, parsed: &ParsedToken<'_>) -> Result<(), VerificationFailure> {
        let kid = parsed
            .header
            .kid
            .as_deref()
            .ok_or(VerificationFailure::UnknownKey)?;
        let key = self
            .keys
            .get(kid, Utc::now())
            .ok_or(VerificationFailure::UnknownKey)?;

        if parsed.header.alg != key.algorithm {
            return Err(VerificationFailure::InvalidSignature);
        }

        match crypto::verify(
            parsed.signature,
            parsed.signing_input.as_bytes(),
            key.decoding_key(),
            key.algorithm,
        ) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(VerificationFailure::InvalidSignature),
        }
    }

    /// Generates a new current key and prunes expired ones
    ///
    /// On failure the previous key stays current.
    pub fn rotate_keys(&self) -> DomainResult<RotationOutcome> {
        let now = Utc::now();
        match self.keys.rotate(now) {
            Ok(outcome) => {
                self.metrics.record_rotation(now);
                info!(
                    key_id = %outcome.key_id,
                    previous_key_id = ?outcome.previous_key_id,
                    pruned = outcome.pruned,
                    "Signing keys rotated"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.metrics.record_error();
                error!(error = %e, "Key rotation failed");
                Err(e.into())
            }
        }
    }

    /// Revokes a token ID for the configured retention period
    pub async fn revoke_token(&self, jti: &str) -> DomainResult<()> {
        let expires_at = Duration::try_seconds(self.config.revocation_retention)
            .and_then(|retention| Utc::now().checked_add_signed(retention))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.revoke_token_until(jti, expires_at).await
    }

    /// Revokes a token ID until `expires_at`
    pub async fn revoke_token_until(&self, jti: &str, expires_at: DateTime<Utc>) -> DomainResult<()> {
        require_non_empty("jti", jti)?;

        self.store
            .revoke(jti, expires_at)
            .await
            .map_err(|e| self.store_failure(e, "Failed to revoke token"))?;

        self.metrics.record_revoked();
        info!(jti, %expires_at, "Token revoked");
        Ok(())
    }

    /// Revokes an issued token until its own expiry
    ///
    /// The signature must check out; expiry and audience are not checked.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The revoked `jti`
    pub async fn revoke(&self, token: &str) -> DomainResult<String> {
        let parsed = parse(token)
            .and_then(|parsed| self.check_signature(&parsed).map(|_| parsed))
            .map_err(|failure| DomainError::Token(failure.to_token_error()))?;

        let expires_at = parsed.claims.expires_at();
        self.revoke_token_until(&parsed.claims.jti, expires_at).await?;
        Ok(parsed.claims.jti)
    }

    /// Revokes a token ID unless it is already revoked
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - This call revoked it
    /// * `Ok(false)` - It was revoked before
    pub async fn revoke_once(&self, jti: &str, expires_at: DateTime<Utc>) -> DomainResult<bool> {
        require_non_empty("jti", jti)?;

        let revoked = self
            .store
            .try_revoke(jti, expires_at)
            .await
            .map_err(|e| self.store_failure(e, "Failed to revoke token"))?;

        if revoked {
            self.metrics.record_revoked();
            info!(jti, %expires_at, "Token revoked");
        }
        Ok(revoked)
    }

    /// Revokes every token issued to a user so far
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - The user's new session epoch
    pub async fn revoke_user_tokens(&self, user_id: &str) -> DomainResult<u64> {
        require_non_empty("user_id", user_id)?;

        let epoch = self
            .store
            .bump_user_epoch(user_id)
            .await
            .map_err(|e| self.store_failure(e, "Failed to bump user session epoch"))?;

        self.metrics.record_revoked();
        info!(user_id, epoch, "All tokens of user revoked");
        Ok(epoch)
    }

    /// Drops revocations whose expiry has passed
    pub async fn cleanup_revoked_tokens(&self) -> DomainResult<CleanupResult> {
        let removed = self
            .store
            .purge_expired(Utc::now())
            .await
            .map_err(|e| self.store_failure(e, "Failed to purge expired revocations"))?;

        let remaining = self
            .store
            .len()
            .await
            .map_err(|e| self.store_failure(e, "Failed to count revocations"))?;

        let over_soft_limit = remaining > self.config.revoked_soft_limit;
        if over_soft_limit {
            warn!(
                remaining,
                soft_limit = self.config.revoked_soft_limit,
                "Revoked token set exceeds soft limit"
            );
        }

        info!(removed, remaining, "Revoked token cleanup completed");

        Ok(CleanupResult {
            expired_entries_removed: removed,
            remaining_entries: remaining,
            over_soft_limit,
        })
    }

    pub fn current_key_id(&self) -> Option<String> {
        self.keys.current_key_id()
    }

    /// Public halves of all keys that can still verify tokens
    pub fn public_keys(&self) -> Vec<PublicKeyInfo> {
        self.keys.public_keys(Utc::now())
    }

    pub fn jwks(&self) -> Jwks {
        self.keys.jwks(Utc::now())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn health_status(&self) -> HealthStatus {
        let revoked_tokens = match self.store.len().await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(error = %e, "Revocation store unavailable for health check");
                None
            }
        };

        HealthStatus::evaluate(
            self.metrics.snapshot(),
            self.keys.current_key_id(),
            self.keys.key_count(Utc::now()),
            revoked_tokens,
        )
    }

    fn store_failure(&self, err: DomainError, context: &'static str) -> DomainError {
        self.metrics.record_error();
        error!(error = %err, "{}", context);
        err
    }
}

/// Split a compact JWS and decode its header and payload
fn parse(token: &str) -> Result<ParsedToken<'_>, VerificationFailure> {
    let parts: Vec<&str> = token.split('.').collect();
    let &[header_b64, payload_b64, signature] = parts.as_slice() else {
        return Err(VerificationFailure::InvalidFormat);
    };

    let header = decode_header(token).map_err(|_| VerificationFailure::Malformed)?;
    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| VerificationFailure::Malformed)?;
    let claims: Claims =
        serde_json::from_slice(&payload).map_err(|_| VerificationFailure::Malformed)?;

    Ok(ParsedToken {
        header,
        claims,
        signing_input: &token[..header_b64.len() + 1 + payload_b64.len()],
        signature,
    })
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::RequiredField {
            field: field.to_string(),
        });
    }
    Ok(())
}
