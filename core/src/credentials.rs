//! API key and base URL resolution.
//!
//! An explicit argument always wins over the environment. A missing key is
//! fatal at construction time and reported as `ApiError::Authentication`.

use std::fmt;

use crate::error::ApiError;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "REZEN_API_KEY";

/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "REZEN_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "https://yenta.therealbrokerage.com";

/// Immutable bearer token plus the base URL requests are sent to.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    base_url: String,
}

impl Credentials {
    /// Resolve credentials from explicit values, falling back to the process
    /// environment.
    pub fn resolve(
        explicit_key: Option<&str>,
        explicit_base_url: Option<&str>,
    ) -> Result<Self, ApiError> {
        Self::resolve_with(explicit_key, explicit_base_url, |name| {
            std::env::var(name).ok()
        })
    }

    /// Like `resolve`, with the environment lookup supplied by the caller.
    pub fn resolve_with<F>(
        explicit_key: Option<&str>,
        explicit_base_url: Option<&str>,
        lookup: F,
    ) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = explicit_key
            .map(str::to_string)
            .or_else(|| lookup(API_KEY_ENV))
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ApiError::authentication(format!(
                    "no API key provided and {API_KEY_ENV} is not set"
                ))
            })?;

        let base_url = explicit_base_url
            .map(str::to_string)
            .or_else(|| lookup(BASE_URL_ENV))
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}
