//! Token entities: claims carried in the JWT payload and issuance requests.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ValidationError;

/// Claim names that extra metadata keys may not shadow
pub const RESERVED_CLAIMS: &[&str] = &[
    "sub",
    "iat",
    "exp",
    "nbf",
    "aud",
    "iss",
    "jti",
    "type",
    "source",
    "sessionId",
    "permissions",
    "features",
    "epoch",
    "email",
    "name",
    "role",
    "deviceId",
    "deviceName",
];

/// Kind of token, which decides its default lifetime and what it may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived API access token
    Access,
    /// Token used to obtain new access tokens
    Refresh,
    /// Long-lived token held by the desktop client
    DesktopLongLived,
    /// Single-purpose token (token exchange, email verification)
    Verification,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
            TokenType::DesktopLongLived => "desktop_long_lived",
            TokenType::Verification => "verification",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the authentication that produced the token originated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthSource {
    #[default]
    Web,
    Desktop,
    Mobile,
    Api,
}

/// Caller-supplied metadata, flattened into the token payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    /// Any other keys, carried through verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenMetadata {
    /// Look up an extra metadata value as a string
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Drop extra keys that would collide with registered claims,
    /// returning the names that were removed
    pub fn strip_reserved(&mut self) -> Vec<String> {
        let reserved: Vec<String> = self
            .extra
            .keys()
            .filter(|key| RESERVED_CLAIMS.contains(&key.as_str()))
            .cloned()
            .collect();
        for key in &reserved {
            self.extra.remove(key);
        }
        reserved
    }
}

/// Claims structure for the JWT payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Issued at timestamp (seconds)
    pub iat: i64,

    /// Expiration timestamp (seconds)
    pub exp: i64,

    /// Audience
    pub aud: String,

    /// Issuer
    pub iss: String,

    /// JWT ID, the revocation key
    pub jti: String,

    #[serde(rename = "type")]
    pub token_type: TokenType,

    pub source: AuthSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,

    /// Subject's session epoch at issuance; bumping the epoch revokes the token
    #[serde(default)]
    pub epoch: u64,

    #[serde(flatten)]
    pub metadata: TokenMetadata,
}

impl Claims {
    /// Checks if the claims have expired at `now` (seconds)
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp < now
    }

    /// Seconds until expiry, negative once expired
    pub fn remaining_secs(&self, now: i64) -> i64 {
        self.exp - now
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// Input to token issuance
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRequest {
    /// Subject (user ID), required
    pub subject: String,
    /// Lifetime in seconds, must be positive
    pub expires_in: i64,
    /// Overrides the configured audience
    pub audience: Option<String>,
    /// Overrides the configured issuer
    pub issuer: Option<String>,
    pub token_type: TokenType,
    pub source: AuthSource,
    pub session_id: Option<String>,
    pub permissions: Vec<String>,
    pub features: Vec<String>,
    pub metadata: TokenMetadata,
}

impl TokenRequest {
    pub fn new(subject: impl Into<String>, token_type: TokenType, expires_in: i64) -> Self {
        Self {
            subject: subject.into(),
            expires_in,
            audience: None,
            issuer: None,
            token_type,
            source: AuthSource::default(),
            session_id: None,
            permissions: Vec::new(),
            features: Vec::new(),
            metadata: TokenMetadata::default(),
        }
    }

    pub fn with_source(mut self, source: AuthSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_features<I, F>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, metadata: TokenMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Check required fields before issuance
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.subject.trim().is_empty() {
            return Err(ValidationError::RequiredField {
                field: "subject".to_string(),
            });
        }
        if self.expires_in <= 0 {
            return Err(ValidationError::InvalidValue {
                field: "expires_in".to_string(),
                reason: "must be a positive number of seconds".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_claims() -> Claims {
        let mut metadata = TokenMetadata {
            email: Some("ada@example.com".to_string()),
            device_id: Some("dev-1".to_string()),
            ..Default::default()
        };
        metadata.extra.insert("plan".to_string(), json!("pro"));

        Claims {
            sub: "user-1".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_000_900,
            aud: "jobswipe-api".to_string(),
            iss: "jobswipe".to_string(),
            jti: "jti-1".to_string(),
            token_type: TokenType::DesktopLongLived,
            source: AuthSource::Desktop,
            session_id: Some("sess-1".to_string()),
            permissions: vec!["jobs:apply".to_string()],
            features: vec![],
            epoch: 2,
            metadata,
        }
    }

    #[test]
    fn test_claims_wire_shape() {
        let value = serde_json::to_value(sample_claims()).unwrap();

        assert_eq!(value["type"], "desktop_long_lived");
        assert_eq!(value["source"], "desktop");
        assert_eq!(value["sessionId"], "sess-1");
        assert_eq!(value["deviceId"], "dev-1");
        assert_eq!(value["email"], "ada@example.com");
        assert_eq!(value["plan"], "pro");
        assert!(value.get("features").is_none());
        assert!(value.get("name").is_none());
    }

    #[test]
    fn test_claims_parse_with_unknown_keys() {
        let payload = json!({
            "sub": "user-1",
            "iat": 10,
            "exp": 20,
            "aud": "jobswipe-api",
            "iss": "jobswipe",
            "jti": "abc",
            "type": "access",
            "source": "web",
            "role": "admin",
            "tenant": "acme"
        });

        let claims: Claims = serde_json::from_value(payload).unwrap();
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.epoch, 0);
        assert_eq!(claims.metadata.role.as_deref(), Some("admin"));
        assert_eq!(claims.metadata.extra_str("tenant"), Some("acme"));
        assert!(claims.permissions.is_empty());
    }

    #[test]
    fn test_claims_expiry_helpers() {
        let claims = sample_claims();
        assert!(!claims.is_expired_at(claims.exp));
        assert!(claims.is_expired_at(claims.exp + 1));
        assert_eq!(claims.remaining_secs(claims.exp - 100), 100);
        assert_eq!(claims.expires_at().timestamp(), claims.exp);
        assert!(claims.has_permission("jobs:apply"));
        assert!(!claims.has_feature("beta"));
    }

    #[test]
    fn test_strip_reserved_metadata() {
        let mut metadata = TokenMetadata::default();
        metadata.extra.insert("sub".to_string(), json!("someone-else"));
        metadata.extra.insert("exp".to_string(), json!(0));
        metadata.extra.insert("plan".to_string(), json!("pro"));

        let mut removed = metadata.strip_reserved();
        removed.sort();

        assert_eq!(removed, vec!["exp".to_string(), "sub".to_string()]);
        assert_eq!(metadata.extra.len(), 1);
    }

    #[test]
    fn test_request_validation() {
        assert!(TokenRequest::new("user-1", TokenType::Access, 60).validate().is_ok());
        assert!(matches!(
            TokenRequest::new("  ", TokenType::Access, 60).validate(),
            Err(ValidationError::RequiredField { .. })
        ));
        assert!(matches!(
            TokenRequest::new("user-1", TokenType::Access, 0).validate(),
            Err(ValidationError::InvalidValue { .. })
        ));
    }
}
