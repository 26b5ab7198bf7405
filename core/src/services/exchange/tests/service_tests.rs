//! Tests for the two-leg token exchange

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{AuthSource, TokenMetadata, TokenRequest, TokenType};
use crate::errors::{DomainError, TokenError, ValidationError};
use crate::repositories::{InMemoryRevocationStore, RevocationStore};
use crate::services::exchange::{TokenExchangeService, EXCHANGE_PURPOSE};
use crate::services::token::{TokenService, TokenServiceConfig};

type Tokens = Arc<TokenService<InMemoryRevocationStore>>;

fn setup() -> (Tokens, TokenExchangeService<InMemoryRevocationStore>) {
    let tokens = Arc::new(
        TokenService::new(TokenServiceConfig::default(), InMemoryRevocationStore::new()).unwrap(),
    );
    let exchange = TokenExchangeService::new(Arc::clone(&tokens));
    (tokens, exchange)
}

/// In-memory store that yields after every lookup, so concurrent callers
/// interleave between the revocation check and the revocation itself
#[derive(Default)]
struct YieldingStore(InMemoryRevocationStore);

#[async_trait]
impl RevocationStore for YieldingStore {
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), DomainError> {
        self.0.revoke(jti, expires_at).await
    }

    async fn try_revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool, DomainError> {
        tokio::task::yield_now().await;
        self.0.try_revoke(jti, expires_at).await
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, DomainError> {
        let revoked = self.0.is_revoked(jti).await;
        tokio::task::yield_now().await;
        revoked
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        self.0.purge_expired(now).await
    }

    async fn len(&self) -> Result<usize, DomainError> {
        self.0.len().await
    }

    async fn bump_user_epoch(&self, user_id: &str) -> Result<u64, DomainError> {
        self.0.bump_user_epoch(user_id).await
    }

    async fn user_epoch(&self, user_id: &str) -> Result<u64, DomainError> {
        self.0.user_epoch(user_id).await
    }
}

async fn web_token<S: RevocationStore>(tokens: &TokenService<S>) -> String {
    let metadata = TokenMetadata {
        email: Some("ada@example.com".to_string()),
        name: Some("Ada".to_string()),
        role: Some("candidate".to_string()),
        ..Default::default()
    };
    tokens
        .create_token(
            TokenRequest::access("user-1", tokens.config())
                .with_session("sess-1")
                .with_permissions(["jobs:apply"])
                .with_features(["auto_apply"])
                .with_metadata(metadata),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_full_exchange() {
    let (tokens, exchange) = setup();
    let web = web_token(&tokens).await;

    let ticket = exchange
        .initiate(&web, "device-1", Some("Ada's laptop"))
        .await
        .unwrap();

    let exchange_claims = tokens.verify_token(&ticket.exchange_token).await.payload.unwrap();
    assert_eq!(exchange_claims.token_type, TokenType::Verification);
    assert_eq!(exchange_claims.metadata.extra_str("purpose"), Some(EXCHANGE_PURPOSE));
    assert_eq!(exchange_claims.exp - exchange_claims.iat, 300);
    assert_eq!(exchange_claims.jti, ticket.exchange_id);

    let grant = exchange
        .complete(&ticket.exchange_token, "device-1")
        .await
        .unwrap();

    assert_eq!(grant.expires_in, 90 * 86_400);
    let result = tokens.verify_token(&grant.access_token).await;
    assert!(result.valid);
    let claims = result.payload.unwrap();
    assert_eq!(claims.jti, grant.token_id);
    assert_eq!(claims.sub, "user-1");
    assert_eq!(claims.token_type, TokenType::DesktopLongLived);
    assert_eq!(claims.source, AuthSource::Desktop);
    assert_eq!(claims.session_id.as_deref(), Some("sess-1"));
    assert_eq!(claims.permissions, vec!["jobs:apply"]);
    assert_eq!(claims.features, vec!["auto_apply"]);
    assert_eq!(claims.metadata.email.as_deref(), Some("ada@example.com"));
    assert_eq!(claims.metadata.device_id.as_deref(), Some("device-1"));
    assert_eq!(claims.metadata.device_name.as_deref(), Some("Ada's laptop"));
    assert_eq!(claims.metadata.extra_str("purpose"), None);
}

#[tokio::test]
async fn test_exchange_token_is_single_use() {
    let (tokens, exchange) = setup();
    let web = web_token(&tokens).await;
    let ticket = exchange.initiate(&web, "device-1", None).await.unwrap();

    exchange
        .complete(&ticket.exchange_token, "device-1")
        .await
        .unwrap();
    let replay = exchange.complete(&ticket.exchange_token, "device-1").await;

    // the consumed exchange token is revoked before anything else is checked
    assert!(matches!(
        replay,
        Err(DomainError::Token(TokenError::TokenRevoked))
    ));
}

#[tokio::test]
async fn test_concurrent_completion_has_one_winner() {
    let tokens = Arc::new(
        TokenService::new(TokenServiceConfig::default(), YieldingStore::default()).unwrap(),
    );
    let exchange = TokenExchangeService::new(Arc::clone(&tokens));
    let web = web_token(&tokens).await;
    let ticket = exchange.initiate(&web, "device-1", None).await.unwrap();

    let (a, b) = tokio::join!(
        exchange.complete(&ticket.exchange_token, "device-1"),
        exchange.complete(&ticket.exchange_token, "device-1"),
    );

    let (winner, loser) = if a.is_ok() { (a, b) } else { (b, a) };
    assert!(winner.is_ok());
    let loser = loser.unwrap_err();
    assert!(matches!(loser, DomainError::Token(TokenError::TokenRevoked)));
    assert_eq!(loser.to_string(), "Token has been revoked");
}

#[tokio::test]
async fn test_device_mismatch() {
    let (tokens, exchange) = setup();
    let web = web_token(&tokens).await;
    let ticket = exchange.initiate(&web, "device-1", None).await.unwrap();

    let result = exchange.complete(&ticket.exchange_token, "device-2").await;
    assert!(matches!(
        result,
        Err(DomainError::Token(TokenError::DeviceMismatch))
    ));

    // a mismatch does not burn the ticket
    assert!(exchange
        .complete(&ticket.exchange_token, "device-1")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_initiate_requires_access_token() {
    let (tokens, exchange) = setup();
    let refresh = tokens
        .create_token(TokenRequest::refresh("user-1", tokens.config()))
        .await
        .unwrap();

    let result = exchange.initiate(&refresh, "device-1", None).await;
    assert!(matches!(
        result,
        Err(DomainError::Token(TokenError::InvalidExchange { .. }))
    ));
}

#[tokio::test]
async fn test_initiate_rejects_revoked_web_token() {
    let (tokens, exchange) = setup();
    let web = web_token(&tokens).await;
    tokens.revoke(&web).await.unwrap();

    let result = exchange.initiate(&web, "device-1", None).await;
    assert!(matches!(
        result,
        Err(DomainError::Token(TokenError::TokenRevoked))
    ));
}

#[tokio::test]
async fn test_initiate_requires_device_id() {
    let (tokens, exchange) = setup();
    let web = web_token(&tokens).await;

    let result = exchange.initiate(&web, " ", None).await;
    assert!(matches!(
        result,
        Err(DomainError::Validation(ValidationError::RequiredField { .. }))
    ));
}

#[tokio::test]
async fn test_plain_verification_token_cannot_complete() {
    let (tokens, exchange) = setup();
    let email_check = tokens
        .create_token(TokenRequest::verification("user-1", tokens.config()))
        .await
        .unwrap();

    let result = exchange.complete(&email_check, "device-1").await;
    assert!(matches!(
        result,
        Err(DomainError::Token(TokenError::InvalidExchange { .. }))
    ));
}
