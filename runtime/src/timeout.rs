//! Deadlines for the inner chain.
//!
//! The mediator has no built-in timeout; [`TimeoutBehavior`] races everything
//! nested inside it against a deadline and reports an `Internal` failure with
//! code [`REQUEST_TIMEOUT`] when the deadline wins. The inner future is
//! dropped, which cancels any work it was awaiting.

use courier_core::outcome::{Error, Outcome};
use courier_core::pipeline::{AnyResponse, ErasedNext, PipelineBehavior, RequestInfo};
use futures::future::BoxFuture;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Error code for a request that exceeded its deadline
pub const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";

/// Fails requests that take longer than a fixed duration.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutBehavior {
    limit: Duration,
}

impl TimeoutBehavior {
    /// Fail requests that run longer than `limit`
    #[must_use]
    pub const fn new(limit: Duration) -> Self {
        Self { limit }
    }

    /// The deadline applied to each request
    #[must_use]
    pub const fn limit(&self) -> Duration {
        self.limit
    }
}

impl PipelineBehavior for TimeoutBehavior {
    fn handle<'a>(
        &'a self,
        request: RequestInfo<'a>,
        _cancel: &'a CancellationToken,
        next: ErasedNext<'a>,
    ) -> BoxFuture<'a, Outcome<AnyResponse>> {
        Box::pin(async move {
            match tokio::time::timeout(self.limit, next.run()).await {
                Ok(outcome) => outcome,
                Err(_elapsed) => {
                    let limit_ms = u64::try_from(self.limit.as_millis()).unwrap_or(u64::MAX);
                    tracing::warn!(request = request.short_name(), limit_ms, "Request timed out");
                    Error::internal(
                        REQUEST_TIMEOUT,
                        format!("{} did not complete within {limit_ms}ms", request.short_name()),
                    )
                    .into()
                }
            }
        })
    }
}
