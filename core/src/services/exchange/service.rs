//! Exchange a web access token for a desktop long-lived token
//!
//! The flow has two legs. `initiate` checks the web token and hands out a
//! short-lived verification token bound to a device. `complete` consumes
//! that token once, from the same device, and issues the desktop token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::entities::{AuthSource, Claims, TokenMetadata, TokenRequest, TokenType};
use crate::errors::{DomainError, DomainResult, TokenError, ValidationError};
use crate::repositories::RevocationStore;
use crate::services::token::TokenService;

/// `purpose` metadata value marking an exchange token
pub const EXCHANGE_PURPOSE: &str = "token_exchange";

const PURPOSE_KEY: &str = "purpose";

/// First leg result: the token the desktop client presents to complete
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeTicket {
    pub exchange_token: String,
    pub exchange_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Second leg result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesktopTokenGrant {
    pub access_token: String,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Service for exchanging web sessions into desktop tokens
pub struct TokenExchangeService<S: RevocationStore> {
    tokens: Arc<TokenService<S>>,
}

impl<S: RevocationStore> TokenExchangeService<S> {
    pub fn new(tokens: Arc<TokenService<S>>) -> Self {
        Self { tokens }
    }

    /// Start an exchange for `device_id` from a valid web access token
    pub async fn initiate(
        &self,
        web_token: &str,
        device_id: &str,
        device_name: Option<&str>,
    ) -> DomainResult<ExchangeTicket> {
        require("device_id", device_id)?;

        let claims = self.tokens.verify_token(web_token).await.into_claims()?;
        if claims.token_type != TokenType::Access {
            warn!(sub = %claims.sub, token_type = %claims.token_type, "Exchange attempted with non-access token");
            return Err(invalid("only access tokens can be exchanged"));
        }

        let mut metadata = identity_of(&claims);
        metadata.device_id = Some(device_id.to_string());
        metadata.device_name = device_name.map(str::to_string);
        metadata
            .extra
            .insert(PURPOSE_KEY.to_string(), Value::from(EXCHANGE_PURPOSE));

        let mut request = TokenRequest::verification(claims.sub.clone(), self.tokens.config())
            .with_source(claims.source)
            .with_permissions(claims.permissions.clone())
            .with_features(claims.features.clone())
            .with_metadata(metadata);
        request.session_id = claims.session_id.clone();

        let issued = self.tokens.issue(request).await?;

        info!(sub = %claims.sub, device_id, exchange_id = %issued.claims.jti, "Token exchange initiated");

        Ok(ExchangeTicket {
            exchange_token: issued.token,
            exchange_id: issued.claims.jti.clone(),
            expires_at: issued.claims.expires_at(),
        })
    }

    /// Finish an exchange and issue the desktop token
    ///
    /// The exchange token is consumed: a second call with it fails.
    pub async fn complete(
        &self,
        exchange_token: &str,
        device_id: &str,
    ) -> DomainResult<DesktopTokenGrant> {
        require("device_id", device_id)?;

        let claims = self.tokens.verify_token(exchange_token).await.into_claims()?;
        if claims.token_type != TokenType::Verification
            || claims.metadata.extra_str(PURPOSE_KEY) != Some(EXCHANGE_PURPOSE)
        {
            return Err(invalid("not an exchange token"));
        }
        if claims.metadata.device_id.as_deref() != Some(device_id) {
            warn!(sub = %claims.sub, device_id, "Exchange completed from a different device");
            return Err(TokenError::DeviceMismatch.into());
        }

        if !self.tokens.revoke_once(&claims.jti, claims.expires_at()).await? {
            warn!(sub = %claims.sub, exchange_id = %claims.jti, "Exchange token replayed");
            return Err(TokenError::TokenRevoked.into());
        }

        let mut metadata = identity_of(&claims);
        metadata.device_id = claims.metadata.device_id.clone();
        metadata.device_name = claims.metadata.device_name.clone();

        let mut request = TokenRequest::desktop(claims.sub.clone(), self.tokens.config())
            .with_source(AuthSource::Desktop)
            .with_permissions(claims.permissions.clone())
            .with_features(claims.features.clone())
            .with_metadata(metadata);
        request.session_id = claims.session_id.clone();

        let issued = self.tokens.issue(request).await?;

        info!(sub = %claims.sub, device_id, token_id = %issued.claims.jti, "Token exchange completed");

        Ok(DesktopTokenGrant {
            access_token: issued.token,
            token_id: issued.claims.jti.clone(),
            expires_at: issued.claims.expires_at(),
            expires_in: issued.claims.exp - issued.claims.iat,
        })
    }
}

/// Identity metadata carried from one token to the next
fn identity_of(claims: &Claims) -> TokenMetadata {
    TokenMetadata {
        email: claims.metadata.email.clone(),
        name: claims.metadata.name.clone(),
        role: claims.metadata.role.clone(),
        ..Default::default()
    }
}

fn invalid(reason: &str) -> DomainError {
    TokenError::InvalidExchange {
        reason: reason.to_string(),
    }
    .into()
}

fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::RequiredField {
            field: field.to_string(),
        });
    }
    Ok(())
}
