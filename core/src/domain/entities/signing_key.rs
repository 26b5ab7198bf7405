//! Signing key pairs and their public representations

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::pkcs8::EncodePrivateKey;
use ed25519_dalek::SigningKey;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::TokenError;

/// Algorithm used for every key the service generates
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::EdDSA;

/// An asymmetric key pair identified by its key ID (`kid`)
///
/// The private half lives only inside the `EncodingKey`; the PKCS#8
/// document it was built from is zeroized on drop.
pub struct SigningKeyPair {
    pub key_id: String,
    pub algorithm: Algorithm,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public_key: [u8; 32],
}

impl SigningKeyPair {
    /// Generate a fresh Ed25519 key pair valid for `lifetime` from `now`
    pub fn generate(now: DateTime<Utc>, lifetime: Duration) -> Result<Self, TokenError> {
        let expires_at = now.checked_add_signed(lifetime).ok_or_else(|| {
            TokenError::KeyGenerationFailed {
                message: format!("key lifetime of {}s is out of range", lifetime.num_seconds()),
            }
        })?;

        let signing_key = SigningKey::generate(&mut OsRng);

        let pkcs8 = signing_key
            .to_pkcs8_der()
            .map_err(|e| TokenError::KeyGenerationFailed {
                message: e.to_string(),
            })?;
        let encoding_key = EncodingKey::from_ed_der(pkcs8.as_bytes());

        let public_key = signing_key.verifying_key().to_bytes();
        let decoding_key = DecodingKey::from_ed_components(&URL_SAFE_NO_PAD.encode(public_key))
            .map_err(|e| TokenError::KeyGenerationFailed {
                message: e.to_string(),
            })?;

        Ok(Self {
            key_id: Uuid::new_v4().to_string(),
            algorithm: SIGNING_ALGORITHM,
            created_at: now,
            expires_at,
            encoding_key,
            decoding_key,
            public_key,
        })
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Raw public key, base64url without padding (the JWK `x` member)
    pub fn public_key_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.public_key)
    }

    pub fn public_info(&self) -> PublicKeyInfo {
        PublicKeyInfo {
            key_id: self.key_id.clone(),
            public_key: self.public_key_base64(),
            algorithm: algorithm_name(self.algorithm).to_string(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }

    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: "OKP".to_string(),
            crv: "Ed25519".to_string(),
            x: self.public_key_base64(),
            kid: self.key_id.clone(),
            alg: algorithm_name(self.algorithm).to_string(),
            key_use: "sig".to_string(),
        }
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

fn algorithm_name(algorithm: Algorithm) -> &'static str {
    match algorithm {
        Algorithm::EdDSA => "EdDSA",
        Algorithm::RS256 => "RS256",
        Algorithm::ES256 => "ES256",
        _ => "unsupported",
    }
}

/// Public view of a signing key, safe to publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyInfo {
    pub key_id: String,
    pub public_key: String,
    pub algorithm: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// JSON Web Key (RFC 8037 OKP form)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub kid: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub key_use: String,
}

/// JSON Web Key Set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}
