//! Business services containing domain logic and use cases.

pub mod exchange;
pub mod password;
pub mod token;

// Re-export commonly used types
pub use exchange::{DesktopTokenGrant, ExchangeTicket, TokenExchangeService};
pub use password::PasswordHasher;
pub use token::{
    CleanupResult, HealthState, HealthStatus, IssuedToken, MaintenanceHandle, MetricsSnapshot,
    TokenService, TokenServiceConfig,
};
