use reqwest::StatusCode;
use thiserror::Error;

/// Error type shared by the core components.
///
/// Transport and provider failures are delivered to whoever awaited the
/// fetch and go no further; the only variant that ends the process is
/// [`Error::NoApiKey`], checked once at startup.
#[derive(Debug, Error)]
pub enum Error {
    /// No API key configured. Fatal; nothing in the app works without one.
    #[error("no weather API key configured; run `weathervane configure` to set one")]
    NoApiKey,

    /// The request never produced a response (connection refused, timeout, DNS).
    #[error("weather provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("weather provider returned status {status}: {body}")]
    Provider { status: StatusCode, body: String },

    /// The response arrived but is missing fields the app requires.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// Writing the location store failed.
    #[error("failed to persist location store: {0}")]
    Store(#[from] std::io::Error),

    /// The location store could not be serialized.
    #[error("failed to encode location store: {0}")]
    StoreFormat(String),

    /// The config file exists but could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
