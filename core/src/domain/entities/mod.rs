//! Domain entities representing tokens, signing keys and revocations.

pub mod revocation;
pub mod signing_key;
pub mod token;

// Re-export commonly used types
pub use revocation::RevokedToken;
pub use signing_key::{Jwk, Jwks, PublicKeyInfo, SigningKeyPair, SIGNING_ALGORITHM};
pub use token::{AuthSource, Claims, TokenMetadata, TokenRequest, TokenType, RESERVED_CLAIMS};
