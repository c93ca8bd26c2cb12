//! Request metrics for observability and monitoring.
//!
//! [`MetricsBehavior`] records, per request type and kind:
//!
//! - `courier_requests_total{request,kind,outcome}`: dispatched requests
//! - `courier_request_duration_seconds{request,kind}`: time spent in the inner chain
//!
//! Metrics go through the `metrics` facade, so any recorder works.
//! [`install_prometheus`] installs the Prometheus exporter and returns a handle
//! for rendering the scrape text.
//!
//! # Example
//!
//! ```rust,no_run
//! use courier_runtime::metrics::{MetricsBehavior, install_prometheus};
//! use courier_runtime::Mediator;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_prometheus()?;
//! let mediator = Mediator::builder().behavior(MetricsBehavior).build()?;
//!
//! if let Some(handle) = handle {
//!     println!("{}", handle.render());
//! }
//! # Ok(())
//! # }
//! ```

use courier_core::outcome::Outcome;
use courier_core::pipeline::{AnyResponse, ErasedNext, PipelineBehavior, RequestInfo};
use courier_core::request::RequestKind;
use futures::future::BoxFuture;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Counter of dispatched requests
pub const REQUESTS_TOTAL: &str = "courier_requests_total";
/// Histogram of request durations
pub const REQUEST_DURATION_SECONDS: &str = "courier_request_duration_seconds";

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus exporter builder with latency buckets for every
/// `*_duration_seconds` histogram.
///
/// # Errors
///
/// Returns error if the bucket configuration is rejected.
pub fn prometheus_builder() -> Result<PrometheusBuilder, MetricsError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))
}

/// Install the Prometheus recorder.
///
/// Returns `Ok(None)` if a recorder is already installed (common in tests);
/// metrics keep flowing to the existing recorder.
///
/// # Errors
///
/// Returns error if the exporter cannot be built or installed.
pub fn install_prometheus() -> Result<Option<PrometheusHandle>, MetricsError> {
    register_metrics();

    let builder = prometheus_builder()?;

    match builder.install_recorder() {
        Ok(handle) => {
            tracing::info!("Prometheus recorder installed");
            Ok(Some(handle))
        }
        Err(e) => {
            let message = e.to_string();
            if message.contains("already") {
                tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                Ok(None)
            } else {
                Err(MetricsError::Install(message))
            }
        }
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of requests dispatched through the mediator");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time taken to run the behavior chain and handler"
    );
}

/// Request metrics recorder.
pub struct RequestMetrics;

impl RequestMetrics {
    /// Record one finished request.
    pub fn record(request: &'static str, kind: RequestKind, success: bool, duration: Duration) {
        let outcome = if success { "success" } else { "failure" };
        counter!(REQUESTS_TOTAL, "request" => request, "kind" => kind.as_str(), "outcome" => outcome)
            .increment(1);
        histogram!(REQUEST_DURATION_SECONDS, "request" => request, "kind" => kind.as_str())
            .record(duration.as_secs_f64());
    }
}

/// Records a counter and a latency histogram for every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsBehavior;

impl PipelineBehavior for MetricsBehavior {
    fn handle<'a>(
        &'a self,
        request: RequestInfo<'a>,
        _cancel: &'a CancellationToken,
        next: ErasedNext<'a>,
    ) -> BoxFuture<'a, Outcome<AnyResponse>> {
        Box::pin(async move {
            let started = Instant::now();
            let outcome = next.run().await;
            RequestMetrics::record(
                request.short_name(),
                request.kind(),
                outcome.is_success(),
                started.elapsed(),
            );
            outcome
        })
    }
}
