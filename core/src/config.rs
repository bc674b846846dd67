//! Client configuration and construction.
//!
//! A client is the unit of configuration: timeouts, retry bounds, base URL
//! and credentials are fixed when `ClientBuilder::build` runs and shared by
//! every call made through that client.

use std::sync::Arc;
use std::time::Duration;

use crate::client::ApiClient;
use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::retry::{
    RetryPolicy, Sleeper, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
};
use crate::transport::{Transport, TransportConfig, UreqTransport};

pub const TIMEOUT_ENV: &str = "REZEN_TIMEOUT_SECS";
pub const MAX_ATTEMPTS_ENV: &str = "REZEN_MAX_ATTEMPTS";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Total time allowed for one attempt.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Cap on a single backoff sleep.
    pub max_delay: Duration,
    pub honor_retry_after: bool,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            honor_retry_after: true,
            user_agent: concat!("rezen-core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Apply `REZEN_TIMEOUT_SECS` / `REZEN_MAX_ATTEMPTS` overrides read
    /// through `lookup`.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ApiError::validation(format!(
                    "{TIMEOUT_ENV} must be a whole number of seconds, got `{raw}`"
                ))
            })?;
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(MAX_ATTEMPTS_ENV) {
            self.max_attempts = raw.trim().parse().map_err(|_| {
                ApiError::validation(format!(
                    "{MAX_ATTEMPTS_ENV} must be a positive integer, got `{raw}`"
                ))
            })?;
        }
        Ok(self)
    }

    /// Reject settings that would make every attempt fail.
    fn validate(&self) -> Result<(), ApiError> {
        if self.timeout.is_zero() {
            return Err(ApiError::validation("timeout must be greater than zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ApiError::validation("connect_timeout must be greater than zero"));
        }
        Ok(())
    }

    fn retry_policy(&self) -> Result<RetryPolicy, ApiError> {
        Ok(RetryPolicy::new(self.max_attempts, self.base_delay, self.max_delay)?
            .with_honor_retry_after(self.honor_retry_after))
    }

    fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Builder for `ApiClient`.
#[derive(Default)]
pub struct ClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    config: ClientConfig,
    transport: Option<Box<dyn Transport>>,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the environment's timeout and retry overrides.
    pub fn from_env() -> Result<Self, ApiError> {
        let config = ClientConfig::default().apply_env_with(|name| std::env::var(name).ok())?;
        Ok(Self::new().config(config))
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    pub fn honor_retry_after(mut self, honor: bool) -> Self {
        self.config.honor_retry_after = honor;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Replace the ureq transport, e.g. with a scripted one in tests.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Resolve credentials from the arguments given and the process
    /// environment, then build. Fails with `Authentication` when no API key
    /// is available.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        self.build_with_env(|name| std::env::var(name).ok())
    }

    /// Like `build`, reading environment variables through `lookup`.
    pub fn build_with_env<F>(self, lookup: F) -> Result<ApiClient, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::resolve_with(
            self.api_key.as_deref(),
            self.base_url.as_deref(),
            lookup,
        )?;
        self.build_with(credentials)
    }

    /// Build with already-resolved credentials.
    pub fn build_with(self, credentials: Credentials) -> Result<ApiClient, ApiError> {
        self.config.validate()?;
        let mut retry = self.config.retry_policy()?;
        if let Some(sleeper) = self.sleeper {
            retry = retry.with_sleeper(sleeper);
        }
        let transport = match self.transport {
            Some(transport) => transport,
            None => Box::new(UreqTransport::new(&self.config.transport_config())),
        };
        Ok(ApiClient::from_parts(credentials, self.config, transport, retry))
    }
}
