//! Request logging and panic translation.
//!
//! [`LoggingBehavior`] is the conventional outermost layer. Besides logging
//! every request it is the catch-all for unexpected panics: a panic escaping
//! any inner layer or the handler becomes an `Internal` failure with code
//! [`UNHANDLED_PANIC`] instead of unwinding through the caller.

use crate::config::LoggingConfig;
use courier_core::outcome::{Error, Outcome};
use courier_core::pipeline::{AnyResponse, ErasedNext, PipelineBehavior, RequestInfo};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Error code for a panic converted into a failure
pub const UNHANDLED_PANIC: &str = "UNHANDLED_PANIC";

/// Logs each request and converts panics into `Internal` failures.
#[derive(Debug, Clone, Default)]
pub struct LoggingBehavior {
    config: LoggingConfig,
}

impl LoggingBehavior {
    /// Create a logging behavior
    #[must_use]
    pub const fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    fn report(&self, request: RequestInfo<'_>, outcome: &Outcome<AnyResponse>, elapsed: Duration) {
        let name = request.short_name();
        let kind = request.kind();
        let elapsed_ms = millis(elapsed);

        match outcome {
            Outcome::Success(response) if self.config.log_payloads => {
                tracing::info!(request = name, %kind, elapsed_ms, ?response, "Request handled");
            }
            Outcome::Success(_) => {
                tracing::info!(request = name, %kind, elapsed_ms, "Request handled");
            }
            Outcome::Failure(failure) => {
                let codes: Vec<&str> = failure.errors().iter().map(Error::code).collect();
                tracing::warn!(
                    request = name,
                    %kind,
                    elapsed_ms,
                    errors = ?codes,
                    "Request failed"
                );
            }
        }

        if elapsed > self.config.slow_request_threshold {
            tracing::warn!(
                request = name,
                %kind,
                elapsed_ms,
                threshold_ms = millis(self.config.slow_request_threshold),
                "Slow request"
            );
        }
    }
}

impl PipelineBehavior for LoggingBehavior {
    fn handle<'a>(
        &'a self,
        request: RequestInfo<'a>,
        _cancel: &'a CancellationToken,
        next: ErasedNext<'a>,
    ) -> BoxFuture<'a, Outcome<AnyResponse>> {
        Box::pin(async move {
            let name = request.short_name();
            if self.config.log_payloads {
                tracing::info!(request = name, kind = %request.kind(), payload = ?request.request(), "Handling request");
            } else {
                tracing::info!(request = name, kind = %request.kind(), "Handling request");
            }

            let started = Instant::now();
            // `next.run()` may panic before returning a future, so it runs inside the guarded block.
            let guarded = AssertUnwindSafe(async move { next.run().await }).catch_unwind();
            let outcome = match guarded.await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(request = name, kind = %request.kind(), panic = %message, "Unhandled panic");
                    return Error::internal(
                        UNHANDLED_PANIC,
                        format!("unhandled panic while handling {name}: {message}"),
                    )
                    .into();
                }
            };

            self.report(request, &outcome, started.elapsed());
            outcome
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
