//! Configuration module with business-specific sub-modules
//!
//! - `auth` - Token lifetimes, signing key rotation and password hashing
//! - `cache` - Redis configuration for the shared revocation store
//! - `environment` - Environment detection and logging configuration

pub mod auth;
pub mod cache;
pub mod environment;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::{AuthConfig, JwtConfig, PasswordConfig};
pub use cache::CacheConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};

/// Prefix for environment variable overrides (`JOBSWIPE__AUTH__JWT__ISSUER=...`)
pub const ENV_PREFIX: &str = "JOBSWIPE";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Failed to read configuration: {0}")]
    Source(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Redis configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Build configuration purely from plain environment variables
    /// (`JWT_*`, `REDIS_*`, `ENVIRONMENT`)
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        Self {
            environment,
            auth: AuthConfig::from_env(),
            cache: CacheConfig::from_env(),
            logging: LoggingConfig::for_environment(environment),
        }
    }

    /// Load layered configuration
    ///
    /// Sources, later ones overriding earlier ones:
    /// 1. `.env` file (if present) exported into the process environment
    /// 2. `config/default.toml` (optional)
    /// 3. `config/{environment}.toml` (optional)
    /// 4. `JOBSWIPE__*` environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        dotenvy::dotenv().ok();
        let environment = Environment::from_env();

        let settings = ::config::Config::builder()
            .set_default("environment", environment.to_string())?
            .add_source(::config::File::with_name("config/default").required(false))
            .add_source(::config::File::with_name(&environment.config_name()).required(false))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        tracing::debug!(environment = %config.environment, "Configuration loaded");
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        self.auth.jwt.validate().map_err(ConfigLoadError::Invalid)?;
        if !(4..=31).contains(&self.auth.password.bcrypt_cost) {
            return Err(ConfigLoadError::Invalid(format!(
                "bcrypt cost {} is outside 4..=31",
                self.auth.password.bcrypt_cost
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_invalid_bcrypt_cost_is_rejected() {
        let mut config = AppConfig::default();
        config.auth.password.bcrypt_cost = 2;
        assert!(matches!(config.validate(), Err(ConfigLoadError::Invalid(_))));
    }

    #[test]
    fn test_deserialize_partial_toml_uses_defaults() {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(
                r#"
                environment = "production"

                [auth.jwt]
                issuer = "jobswipe-test"
                access_token_expiry = 600
                "#,
                ::config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: AppConfig = settings.try_deserialize().unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.auth.jwt.issuer, "jobswipe-test");
        assert_eq!(config.auth.jwt.access_token_expiry, 600);
        assert_eq!(config.auth.jwt.audience, "jobswipe-api");
        assert_eq!(config.cache.url, "redis://localhost:6379");
    }
}
