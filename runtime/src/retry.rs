//! Retries with exponential backoff for transient failures.
//!
//! [`RetryBehavior`] re-runs the inner chain while it fails with retryable
//! error kinds (by default only `Internal`). Business failures such as
//! validation or not-found are returned immediately.
//!
//! # Example
//!
//! ```rust
//! use courier_runtime::retry::{RetryBehavior, RetryPolicy};
//! use courier_core::outcome::ErrorKind;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::builder()
//!     .max_retries(5)
//!     .initial_delay(Duration::from_millis(100))
//!     .max_delay(Duration::from_secs(10))
//!     .multiplier(2.0)
//!     .build();
//!
//! let retry = RetryBehavior::new(policy).retry_on([ErrorKind::Internal, ErrorKind::Conflict]);
//! assert!(retry.is_retryable(ErrorKind::Conflict));
//! ```

use courier_core::outcome::{Error, ErrorKind, Failure, Outcome};
use courier_core::pipeline::{AnyResponse, ErasedNext, PipelineBehavior, RequestInfo};
use futures::future::BoxFuture;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 100ms
/// - `max_delay`: 30 seconds
/// - `multiplier`: 2.0 (delay doubles each retry)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: usize,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries (cap for exponential backoff)
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }

    /// Calculate delay for a given attempt number.
    ///
    /// Uses exponential backoff: `initial_delay * multiplier ^ attempt`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_retries: usize,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
}

impl RetryPolicyBuilder {
    /// Set maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set initial delay before first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay (cap for exponential backoff).
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set multiplier for exponential backoff.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub const fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.multiplier,
        }
    }
}

/// Re-runs the inner chain on retryable failures.
#[derive(Debug, Clone)]
pub struct RetryBehavior {
    policy: RetryPolicy,
    retryable: Vec<ErrorKind>,
}

impl RetryBehavior {
    /// Retry `Internal` failures according to `policy`
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            retryable: vec![ErrorKind::Internal],
        }
    }

    /// Replace the set of retryable error kinds
    #[must_use]
    pub fn retry_on(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.retryable = kinds.into_iter().collect();
        self
    }

    /// The backoff policy
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns `true` if failures of `kind` are retried
    #[must_use]
    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        self.retryable.contains(&kind)
    }

    fn should_retry(&self, failure: &Failure) -> bool {
        failure.errors().iter().all(|error| self.is_retryable(error.kind()))
    }
}

impl Default for RetryBehavior {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl PipelineBehavior for RetryBehavior {
    fn handle<'a>(
        &'a self,
        request: RequestInfo<'a>,
        cancel: &'a CancellationToken,
        next: ErasedNext<'a>,
    ) -> BoxFuture<'a, Outcome<AnyResponse>> {
        Box::pin(async move {
            let name = request.short_name();
            let mut attempt = 0;

            loop {
                let outcome = next.run().await;

                let Outcome::Failure(failure) = &outcome else {
                    if attempt > 0 {
                        tracing::info!(request = name, attempt, "Request succeeded after retry");
                    }
                    return outcome;
                };

                if !self.should_retry(failure) {
                    return outcome;
                }

                let codes: Vec<&str> = failure.errors().iter().map(Error::code).collect();
                if attempt >= self.policy.max_retries {
                    tracing::error!(
                        request = name,
                        attempt,
                        errors = ?codes,
                        "Request failed after max retries"
                    );
                    return outcome;
                }

                let delay = self.policy.delay_for_attempt(attempt);
                tracing::warn!(
                    request = name,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    errors = ?codes,
                    "Request failed, retrying"
                );
                drop(codes);

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        tracing::debug!(request = name, attempt, "Retry abandoned after cancellation");
                        return outcome;
                    }
                    () = sleep(delay) => {}
                }
                attempt += 1;
            }
        })
    }
}
