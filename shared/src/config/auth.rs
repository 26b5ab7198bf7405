//! Authentication configuration: token lifetimes, key rotation and password hashing

use serde::{Deserialize, Serialize};

/// Longest lifetime accepted for a token or a signing key, in seconds (100 years)
pub const MAX_LIFETIME: i64 = 100 * 365 * 86_400;

/// JWT issuance and key management configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// JWT issuer claim
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// JWT audience claim
    #[serde(default = "default_audience")]
    pub audience: String,

    /// Access token expiry time in seconds
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,

    /// Refresh token expiry time in seconds
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64,

    /// Desktop long-lived token expiry time in seconds
    #[serde(default = "default_desktop_token_expiry")]
    pub desktop_token_expiry: i64,

    /// Verification (exchange, email) token expiry time in seconds
    #[serde(default = "default_verification_token_expiry")]
    pub verification_token_expiry: i64,

    /// How often a new signing key pair is generated, in seconds
    #[serde(default = "default_key_rotation_interval")]
    pub key_rotation_interval: u64,

    /// How long a signing key pair stays available for verification, in seconds
    #[serde(default = "default_key_lifetime")]
    pub key_lifetime: i64,

    /// How often expired revocation entries are purged, in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,

    /// Remaining lifetime below which a valid token is flagged for refresh, in seconds
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold: i64,

    /// Revoked-set size above which cleanup logs a warning
    #[serde(default = "default_revoked_soft_limit")]
    pub revoked_soft_limit: usize,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            audience: default_audience(),
            access_token_expiry: default_access_token_expiry(),
            refresh_token_expiry: default_refresh_token_expiry(),
            desktop_token_expiry: default_desktop_token_expiry(),
            verification_token_expiry: default_verification_token_expiry(),
            key_rotation_interval: default_key_rotation_interval(),
            key_lifetime: default_key_lifetime(),
            cleanup_interval: default_cleanup_interval(),
            refresh_threshold: default_refresh_threshold(),
            revoked_soft_limit: default_revoked_soft_limit(),
        }
    }
}

impl JwtConfig {
    /// Create from `JWT_*` environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or(defaults.audience),
            access_token_expiry: env_or("JWT_ACCESS_TOKEN_EXPIRY", defaults.access_token_expiry),
            refresh_token_expiry: env_or("JWT_REFRESH_TOKEN_EXPIRY", defaults.refresh_token_expiry),
            desktop_token_expiry: env_or("JWT_DESKTOP_TOKEN_EXPIRY", defaults.desktop_token_expiry),
            verification_token_expiry: env_or(
                "JWT_VERIFICATION_TOKEN_EXPIRY",
                defaults.verification_token_expiry,
            ),
            key_rotation_interval: env_or("JWT_KEY_ROTATION_INTERVAL", defaults.key_rotation_interval),
            key_lifetime: env_or("JWT_KEY_LIFETIME", defaults.key_lifetime),
            cleanup_interval: env_or("JWT_CLEANUP_INTERVAL", defaults.cleanup_interval),
            refresh_threshold: env_or("JWT_REFRESH_THRESHOLD", defaults.refresh_threshold),
            revoked_soft_limit: env_or("JWT_REVOKED_SOFT_LIMIT", defaults.revoked_soft_limit),
        }
    }

    /// Set access token expiry in minutes
    pub fn with_access_expiry_minutes(mut self, minutes: i64) -> Self {
        self.access_token_expiry = minutes * 60;
        self
    }

    /// Set desktop token expiry in days
    pub fn with_desktop_expiry_days(mut self, days: i64) -> Self {
        self.desktop_token_expiry = days * 86400;
        self
    }

    /// Longest lifetime any issued token can have, in seconds
    pub fn max_token_lifetime(&self) -> i64 {
        [
            self.access_token_expiry,
            self.refresh_token_expiry,
            self.desktop_token_expiry,
            self.verification_token_expiry,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Check the ordering constraints between intervals and lifetimes
    pub fn validate(&self) -> Result<(), String> {
        if self.issuer.trim().is_empty() || self.audience.trim().is_empty() {
            return Err("issuer and audience must not be empty".to_string());
        }
        if self.access_token_expiry <= 0
            || self.refresh_token_expiry <= 0
            || self.desktop_token_expiry <= 0
            || self.verification_token_expiry <= 0
        {
            return Err("token expiry values must be positive".to_string());
        }
        if self.max_token_lifetime() > MAX_LIFETIME || self.key_lifetime > MAX_LIFETIME {
            return Err(format!(
                "token and key lifetimes must not exceed {}s",
                MAX_LIFETIME
            ));
        }
        if self.key_rotation_interval == 0 || self.cleanup_interval == 0 {
            return Err("rotation and cleanup intervals must be positive".to_string());
        }
        // a key signs for up to one rotation interval, and the last token
        // it signs must stay verifiable until that token expires
        let required = self
            .max_token_lifetime()
            .saturating_add(i64::try_from(self.key_rotation_interval).unwrap_or(i64::MAX));
        if self.key_lifetime < required {
            return Err(format!(
                "key lifetime ({}s) is shorter than the longest token lifetime plus the rotation interval ({}s)",
                self.key_lifetime, required
            ));
        }
        Ok(())
    }
}

/// Password hashing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PasswordConfig {
    /// bcrypt cost factor (4-31)
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Minimum accepted password length
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: default_bcrypt_cost(),
            min_length: default_min_length(),
        }
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT configuration
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Password hashing configuration
    #[serde(default)]
    pub password: PasswordConfig,
}

impl AuthConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let password = PasswordConfig {
            bcrypt_cost: env_or("PASSWORD_BCRYPT_COST", default_bcrypt_cost()),
            min_length: env_or("PASSWORD_MIN_LENGTH", default_min_length()),
        };

        Self {
            jwt: JwtConfig::from_env(),
            password,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn default_issuer() -> String {
    String::from("jobswipe")
}

fn default_audience() -> String {
    String::from("jobswipe-api")
}

fn default_access_token_expiry() -> i64 {
    900 // 15 minutes
}

fn default_refresh_token_expiry() -> i64 {
    2_592_000 // 30 days
}

fn default_desktop_token_expiry() -> i64 {
    7_776_000 // 90 days
}

fn default_verification_token_expiry() -> i64 {
    300
}

fn default_key_rotation_interval() -> u64 {
    86_400
}

fn default_key_lifetime() -> i64 {
    7_862_400 // 91 days
}

fn default_cleanup_interval() -> u64 {
    3_600
}

fn default_refresh_threshold() -> i64 {
    300
}

fn default_revoked_soft_limit() -> usize {
    10_000
}

fn default_bcrypt_cost() -> u32 {
    12
}

fn default_min_length() -> usize {
    8
}
