//! Error types for the HAL client.
//!
//! # Design
//! Failures are grouped by where they arise so callers can branch without
//! re-parsing: argument and link errors are raised before any request is
//! sent, `Api` carries a rejected response verbatim, `Serialization` means
//! the server answered with an unexpected shape, and `Transport` holds the
//! underlying stack's error untouched (downcast it to `reqwest::Error` when
//! using the default transport).

use thiserror::Error;

use crate::http::Headers;

/// Boxed error produced by transports and handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by `HalClient`, `HttpConnection` and `LinkResolver`.
#[derive(Debug, Error)]
pub enum Error {
    /// A required argument or configuration value is missing.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The link could not be expanded into an absolute URL.
    #[error("invalid link '{href}': {reason}")]
    InvalidLink { href: String, reason: String },

    /// The server answered with a 4xx or 5xx status.
    #[error("HTTP {status}: {}", String::from_utf8_lossy(.body))]
    Api {
        status: u16,
        headers: Headers,
        body: Vec<u8>,
    },

    /// A request body could not be encoded, or a response body could not be
    /// decoded into the requested type.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Configuration read from the environment is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    pub(crate) fn invalid_link(href: &str, reason: impl Into<String>) -> Self {
        Error::InvalidLink {
            href: href.to_string(),
            reason: reason.into(),
        }
    }

    /// HTTP status of an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Raw response body of an `Api` error, decoded lossily as UTF-8.
    pub fn body_text(&self) -> Option<String> {
        match self {
            Error::Api { body, .. } => Some(String::from_utf8_lossy(body).into_owned()),
            _ => None,
        }
    }
}
