//! Unit tests for token issuance, rotation and key publication

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{json, Value};

use super::{service_with, test_service, FailingStore};
use crate::domain::entities::{AuthSource, TokenMetadata, TokenRequest, TokenType};
use crate::errors::{DomainError, ValidationError};
use crate::services::token::{HealthState, TokenService, TokenServiceConfig};

#[tokio::test]
async fn test_create_and_verify_round_trip() {
    let service = test_service();
    let metadata = TokenMetadata {
        email: Some("ada@example.com".to_string()),
        role: Some("candidate".to_string()),
        ..Default::default()
    };
    let request = TokenRequest::access("user-42", service.config())
        .with_source(AuthSource::Web)
        .with_session("sess-9")
        .with_permissions(["jobs:read", "jobs:apply"])
        .with_features(["auto_apply"])
        .with_metadata(metadata);

    let token = service.create_token(request).await.unwrap();
    let result = service.verify_token(&token).await;

    assert!(result.valid, "unexpected failure: {:?}", result.error);
    assert!(!result.needs_refresh);
    let claims = result.payload.unwrap();
    assert_eq!(claims.sub, "user-42");
    assert_eq!(claims.token_type, TokenType::Access);
    assert_eq!(claims.session_id.as_deref(), Some("sess-9"));
    assert_eq!(claims.permissions, vec!["jobs:read", "jobs:apply"]);
    assert_eq!(claims.metadata.email.as_deref(), Some("ada@example.com"));
    assert_eq!(claims.aud, "jobswipe-api");
    assert_eq!(claims.iss, "jobswipe");
    assert_eq!(claims.exp - claims.iat, 900);
    assert_eq!(claims.epoch, 0);
}

#[tokio::test]
async fn test_header_carries_kid_and_algorithm() {
    let service = test_service();
    let token = service
        .create_token(TokenRequest::access("user-1", service.config()))
        .await
        .unwrap();

    let header = decode_header(&token).unwrap();
    assert_eq!(header.alg, Algorithm::EdDSA);
    assert_eq!(header.typ.as_deref(), Some("JWT"));
    assert_eq!(header.kid, service.current_key_id());
    assert_eq!(token.split('.').count(), 3);
    assert!(!token.contains('='));
}

#[tokio::test]
async fn test_each_token_gets_unique_jti() {
    let service = test_service();
    let a = service
        .issue(TokenRequest::access("user-1", service.config()))
        .await
        .unwrap();
    let b = service
        .issue(TokenRequest::access("user-1", service.config()))
        .await
        .unwrap();

    assert_ne!(a.claims.jti, b.claims.jti);
    assert_eq!(a.key_id, b.key_id);
}

#[tokio::test]
async fn test_create_rejects_invalid_requests() {
    let service = test_service();

    let empty_subject = service
        .create_token(TokenRequest::new("", TokenType::Access, 60))
        .await;
    assert!(matches!(
        empty_subject,
        Err(DomainError::Validation(ValidationError::RequiredField { .. }))
    ));

    let zero_lifetime = service
        .create_token(TokenRequest::new("user-1", TokenType::Access, 0))
        .await;
    assert!(matches!(
        zero_lifetime,
        Err(DomainError::Validation(ValidationError::InvalidValue { .. }))
    ));

    let overflowing = service
        .create_token(TokenRequest::new("user-1", TokenType::Access, i64::MAX))
        .await;
    assert!(overflowing.is_err());

    assert_eq!(service.metrics().tokens_issued, 0);
}

#[tokio::test]
async fn test_metadata_cannot_shadow_registered_claims() {
    let service = test_service();
    let mut metadata = TokenMetadata::default();
    metadata.extra.insert("sub".to_string(), json!("admin"));
    metadata.extra.insert("plan".to_string(), json!("pro"));

    let token = service
        .create_token(TokenRequest::access("user-1", service.config()).with_metadata(metadata))
        .await
        .unwrap();

    let payload: Value = serde_json::from_slice(
        &URL_SAFE_NO_PAD
            .decode(token.split('.').nth(1).unwrap())
            .unwrap(),
    )
    .unwrap();
    assert_eq!(payload["sub"], "user-1");
    assert_eq!(payload["plan"], "pro");
    assert_eq!(payload["type"], "access");
}

#[tokio::test]
async fn test_request_overrides_audience() {
    let service = test_service();
    let token = service
        .create_token(
            TokenRequest::access("user-1", service.config()).with_audience("partner-api"),
        )
        .await
        .unwrap();

    let result = service.verify_token(&token).await;
    assert!(!result.valid);
    assert_eq!(result.error.as_deref(), Some("Invalid audience or issuer"));
}

#[tokio::test]
async fn test_rotation_keeps_old_tokens_verifiable() {
    let service = test_service();
    let old_token = service
        .create_token(TokenRequest::access("user-1", service.config()))
        .await
        .unwrap();
    let old_kid = service.current_key_id().unwrap();

    let outcome = service.rotate_keys().unwrap();
    assert_ne!(outcome.key_id, old_kid);
    assert_eq!(service.current_key_id(), Some(outcome.key_id.clone()));

    let new_token = service
        .create_token(TokenRequest::access("user-1", service.config()))
        .await
        .unwrap();
    assert_eq!(decode_header(&new_token).unwrap().kid, Some(outcome.key_id));

    assert!(service.verify_token(&old_token).await.valid);
    assert!(service.verify_token(&new_token).await.valid);

    let metrics = service.metrics();
    assert_eq!(metrics.key_rotations, 1);
    assert!(metrics.last_key_rotation.is_some());
}

#[tokio::test]
async fn test_public_keys_and_jwks() {
    let service = test_service();
    service.rotate_keys().unwrap();

    let keys = service.public_keys();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().all(|k| k.algorithm == "EdDSA"));
    assert_eq!(keys[0].key_id, service.current_key_id().unwrap());

    let jwks = service.jwks();
    assert_eq!(jwks.keys.len(), 2);
    assert!(jwks.keys.iter().all(|k| k.kty == "OKP" && k.crv == "Ed25519"));
}

#[tokio::test]
async fn test_jwks_verifies_with_stock_decoder() {
    let service = test_service();
    let token = service
        .create_token(TokenRequest::access("user-7", service.config()))
        .await
        .unwrap();

    let set: JwkSet = serde_json::from_value(serde_json::to_value(service.jwks()).unwrap()).unwrap();
    let kid = decode_header(&token).unwrap().kid.unwrap();
    let jwk = set.find(&kid).unwrap();
    let key = DecodingKey::from_jwk(jwk).unwrap();

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_audience(&["jobswipe-api"]);
    validation.set_issuer(&["jobswipe"]);

    let decoded = decode::<Value>(&token, &key, &validation).unwrap();
    assert_eq!(decoded.claims["sub"], "user-7");
}

#[tokio::test]
async fn test_health_reflects_key_count() {
    let service = test_service();

    let initial = service.health_status().await;
    assert_eq!(initial.status, HealthState::Degraded);
    assert_eq!(initial.details.active_keys, 1);
    assert_eq!(initial.details.revoked_tokens, Some(0));

    service.rotate_keys().unwrap();
    let rotated = service.health_status().await;
    assert_eq!(rotated.status, HealthState::Healthy);
    assert_eq!(rotated.details.active_keys, 2);
}

#[tokio::test]
async fn test_store_failure_fails_creation_and_counts_error() {
    let service = TokenService::new(TokenServiceConfig::default(), FailingStore).unwrap();

    let result = service
        .create_token(TokenRequest::access("user-1", service.config()))
        .await;

    assert!(matches!(result, Err(DomainError::Internal { .. })));
    assert_eq!(service.metrics().errors, 1);
    assert_eq!(service.metrics().tokens_issued, 0);

    let health = service.health_status().await;
    assert_eq!(health.details.revoked_tokens, None);
    // one key and a 100% error rate
    assert_eq!(health.status, HealthState::Degraded);
}

#[tokio::test]
async fn test_custom_lifetimes_from_config() {
    let config = TokenServiceConfig {
        desktop_token_expiry: 3_600,
        ..Default::default()
    };
    let service = service_with(config);

    let issued = service
        .issue(TokenRequest::desktop("user-1", service.config()).with_source(AuthSource::Desktop))
        .await
        .unwrap();

    assert_eq!(issued.claims.exp - issued.claims.iat, 3_600);
    assert_eq!(issued.claims.token_type, TokenType::DesktopLongLived);
    assert_eq!(issued.claims.source, AuthSource::Desktop);
}

#[test]
fn test_out_of_range_key_lifetime_fails_construction() {
    let config = TokenServiceConfig {
        key_lifetime: chrono::Duration::MAX,
        ..Default::default()
    };

    let result = TokenService::new(config, crate::repositories::InMemoryRevocationStore::new());
    assert!(matches!(result, Err(DomainError::Token(_))));
}
