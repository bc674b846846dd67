//! Retry with exponential backoff and jitter.
//!
//! # Design
//! One `RetryPolicy::execute` call drives a single logical request. Each
//! attempt's result is classified on its own; the first success is returned
//! as is, and non-transient errors (`Authentication`, `Validation`,
//! `NotFound`, generic `Api`) return immediately. Transient errors
//! (`RateLimit`, `Server`, `Network`) sleep and try again until
//! `max_attempts` is spent, then the last error is returned.
//!
//! The delay after attempt `n` (zero-based) is
//! `min(base_delay * 2^n + jitter, max_delay)` with jitter drawn from
//! `[0, base_delay)`. The jitter never exceeds the gap to the next step, so
//! delays never decrease from one attempt to the next. A `Retry-After` hint
//! raises the delay to at least the hinted value.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::ApiError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Caps the exponent so the multiplication cannot overflow.
const MAX_BACKOFF_EXPONENT: u32 = 20;

/// Blocks the calling thread between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    honor_retry_after: bool,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("honor_retry_after", &self.honor_retry_after)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            honor_retry_after: true,
            sleeper: Arc::new(ThreadSleeper),
        }
    }
}

impl RetryPolicy {
    /// Create a policy, validating its bounds.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Result<Self, ApiError> {
        if max_attempts == 0 {
            return Err(ApiError::validation("max_attempts must be at least 1"));
        }
        if base_delay > max_delay {
            return Err(ApiError::validation(format!(
                "base_delay ({base_delay:?}) cannot be greater than max_delay ({max_delay:?})"
            )));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            max_delay,
            ..Self::default()
        })
    }

    pub fn with_honor_retry_after(mut self, honor: bool) -> Self {
        self.honor_retry_after = honor;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff before the attempt following attempt `attempt` (zero-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_millis = self.base_delay.as_millis() as u64;
        let multiplier = 2_u64.saturating_pow(attempt.min(MAX_BACKOFF_EXPONENT));
        let exponential = base_millis.saturating_mul(multiplier);
        let jitter = if base_millis == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..base_millis)
        };
        let capped = exponential
            .saturating_add(jitter)
            .min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }

    /// Delay to wait after `error` ended attempt `attempt`.
    fn delay_for(&self, attempt: u32, error: &ApiError) -> Duration {
        let backoff = self.backoff_delay(attempt);
        match error.retry_after() {
            Some(hint) if self.honor_retry_after => backoff.max(hint),
            _ => backoff,
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run
    /// out. The closure receives the zero-based attempt number.
    pub fn execute<T, F>(&self, mut operation: F) -> Result<T, ApiError>
    where
        F: FnMut(u32) -> Result<T, ApiError>,
    {
        let mut attempt = 0;
        loop {
            debug!(attempt = attempt + 1, max_attempts = self.max_attempts, "attempt");
            let err = match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                debug!(attempt = attempt + 1, error = %err, "non-retryable error");
                return Err(err);
            }
            if attempt + 1 >= self.max_attempts {
                debug!(attempts = attempt + 1, error = %err, "retries exhausted");
                return Err(err);
            }

            let delay = self.delay_for(attempt, &err);
            warn!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient failure, retrying"
            );
            self.sleeper.sleep(delay);
            attempt += 1;
        }
    }
}
