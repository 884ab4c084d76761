use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Discord API error: {0}")]
    #[diagnostic(code(sokeribotti::discord_api))]
    DiscordApi(#[from] serenity::Error),

    #[error("Poise framework error: {0}")]
    #[diagnostic(code(sokeribotti::poise))]
    Poise(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Environment error: {0}")]
    #[diagnostic(code(sokeribotti::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(sokeribotti::config))]
    Config(String),

    /// Network failure or a non-2xx response unrelated to authorization.
    /// Fatal for the current refresh cycle.
    #[error("Upstream unavailable: {0}")]
    #[diagnostic(code(sokeribotti::upstream_unavailable))]
    UpstreamUnavailable(String),

    /// No nonce could be scraped from the calendar page.
    #[error("No session nonce found in calendar page")]
    #[diagnostic(code(sokeribotti::token_not_found))]
    TokenNotFound,

    /// The upstream rejected our nonce even after a fresh one was fetched.
    #[error("Authorization expired: {0}")]
    #[diagnostic(code(sokeribotti::authorization_expired))]
    AuthorizationExpired(String),

    /// The response envelope failed structural validation. Without a valid
    /// envelope there is no grid body to extract events from, so this aborts
    /// the whole calendar fetch.
    #[error("Invalid upstream format: {0}")]
    #[diagnostic(code(sokeribotti::invalid_upstream_format))]
    InvalidUpstreamFormat(String),

    #[error("Store error: {0}")]
    #[diagnostic(code(sokeribotti::store))]
    Store(String),

    #[error("Render error: {0}")]
    #[diagnostic(code(sokeribotti::render))]
    Render(String),

    #[error(transparent)]
    #[diagnostic(code(sokeribotti::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(sokeribotti::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(sokeribotti::other))]
    Other(String),
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type BotResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
#[allow(dead_code)]
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create upstream errors
pub fn upstream_error(message: &str) -> Error {
    Error::UpstreamUnavailable(message.to_string())
}

/// Helper to create store errors
pub fn store_error(message: &str) -> Error {
    Error::Store(message.to_string())
}

/// Helper to create render errors
pub fn render_error(message: &str) -> Error {
    Error::Render(message.to_string())
}
