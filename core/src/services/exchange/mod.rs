//! Web-to-desktop token exchange

mod service;

#[cfg(test)]
mod tests;

pub use service::{DesktopTokenGrant, ExchangeTicket, TokenExchangeService, EXCHANGE_PURPOSE};
