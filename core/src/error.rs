//! Error taxonomy for the API client.
//!
//! # Design
//! Every failure the client can produce is exactly one `ApiError` variant.
//! Transport exceptions are folded into `Network`, local problems caught
//! before dispatch (bad path args, unserializable bodies, bad configuration)
//! are `Validation`, and anything the status table does not name lands in
//! the generic `Api` variant. Whenever a response existed, its status code
//! and body text travel with the error.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by every client operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 401, or no API key could be resolved at construction time.
    #[error("authentication failed: {message}")]
    Authentication {
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },

    /// 400/422, or a request rejected locally before any network call.
    #[error("validation failed: {message}")]
    Validation {
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },

    /// 404.
    #[error("not found: {message}")]
    NotFound {
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },

    /// 429. `retry_after` is the server's `Retry-After` hint, if any.
    #[error("rate limited: {message}")]
    RateLimit {
        status: Option<u16>,
        message: String,
        body: Option<String>,
        retry_after: Option<Duration>,
    },

    /// 500-599.
    #[error("server error ({}): {message}", display_status(.status))]
    Server {
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },

    /// DNS, connect, TLS, timeout or I/O failure; no status was received.
    #[error("network error: {message}")]
    Network { message: String },

    /// Any other non-success status, or a success body that could not be
    /// decoded.
    #[error("HTTP {}: {message}", display_status(.status))]
    Api {
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },
}

fn display_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "-".to_string(), |s| s.to_string())
}

impl ApiError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Generic error for a success status whose body could not be decoded.
    pub fn decode(status: u16, message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Api {
            status: Some(status),
            message: message.into(),
            body: Some(body.into()),
        }
    }

    /// True for the transient variants: `RateLimit`, `Server` and `Network`.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit { .. } | Self::Server { .. } | Self::Network { .. }
        )
    }

    /// The HTTP status of the response that caused this error, if one was
    /// received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. }
            | Self::Validation { status, .. }
            | Self::NotFound { status, .. }
            | Self::RateLimit { status, .. }
            | Self::Server { status, .. }
            | Self::Api { status, .. } => *status,
            Self::Network { .. } => None,
        }
    }

    /// The raw response body text, if a response was received.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Authentication { body, .. }
            | Self::Validation { body, .. }
            | Self::NotFound { body, .. }
            | Self::RateLimit { body, .. }
            | Self::Server { body, .. }
            | Self::Api { body, .. } => body.as_deref(),
            Self::Network { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Authentication { message, .. }
            | Self::Validation { message, .. }
            | Self::NotFound { message, .. }
            | Self::RateLimit { message, .. }
            | Self::Server { message, .. }
            | Self::Network { message }
            | Self::Api { message, .. } => message,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;
