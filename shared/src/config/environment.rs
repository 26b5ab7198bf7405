//! Deployment environment and the log output settings derived from it

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Variables consulted, in order, to pick the environment
const ENVIRONMENT_VARS: [&str; 2] = ["JOBSWIPE_ENV", "ENVIRONMENT"];

/// Where the service is running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Read the environment from `JOBSWIPE_ENV` or `ENVIRONMENT`
    ///
    /// Unset or unrecognised values fall back to development.
    pub fn from_env() -> Self {
        ENVIRONMENT_VARS
            .iter()
            .find_map(|name| std::env::var(name).ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// Path of the environment-specific config file, without extension
    pub fn config_name(&self) -> String {
        format!("config/{}", self.as_str())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let env = match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Environment::Development,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            other => return Err(format!("unknown environment '{}'", other)),
        };
        Ok(env)
    }
}

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
    Compact,
}

/// Tracing subscriber settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level or full `EnvFilter` directive, e.g. `info,jobswipe_core=debug`
    pub level: String,
    pub format: LogFormat,
    /// ANSI colours, only useful on a terminal
    pub colored: bool,
    /// Include file and line of each event
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl LoggingConfig {
    /// Verbose, human-readable output in development; JSON elsewhere
    pub fn for_environment(env: Environment) -> Self {
        let local = env == Environment::Development;
        let level = match env {
            Environment::Development => "debug,jobswipe_core=trace",
            Environment::Staging => "info",
            Environment::Production => "warn,jobswipe_core=info,jobswipe_infra=info",
        };

        Self {
            level: level.to_string(),
            format: if local { LogFormat::Pretty } else { LogFormat::Json },
            colored: local,
            source_location: local,
        }
    }
}
