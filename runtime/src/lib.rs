//! # Courier Runtime
//!
//! The [`Mediator`] facade and everything needed to assemble one.
//!
//! ## Core Components
//!
//! - **`MediatorBuilder`**: collects handlers and behaviors at startup, then
//!   finalizes them into an immutable [`Mediator`]
//! - **`HandlerModule`**: an explicit manifest registering a group of handlers
//! - **`Mediator`**: resolves the handler for a request, runs the behavior
//!   chain around it, and returns the [`Outcome`]
//! - **Built-in behaviors**: logging, validation, retry, timeout, metrics
//!
//! ## Example
//!
//! ```
//! use courier_core::outcome::Outcome;
//! use courier_core::request::{Read, Request};
//! use courier_core::handler::FnHandler;
//! use courier_runtime::Mediator;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! struct Ping;
//!
//! impl Request for Ping {
//!     type Response = &'static str;
//!     type Flavor = Read;
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mediator = Mediator::builder()
//!     .logging()
//!     .handler::<Ping>(FnHandler::new(|_: &Ping| Outcome::success("pong")))
//!     .build()?;
//!
//! let outcome = mediator.query(&Ping, &CancellationToken::new()).await?;
//! assert_eq!(outcome, Outcome::success("pong"));
//! # Ok(())
//! # }
//! ```

use courier_core::handler::{CommandHandler, QueryHandler, RequestHandler};
use courier_core::outcome::Outcome;
use courier_core::pipeline::{Behavior, Pipeline, PipelineBehavior, Scope};
use courier_core::registry::HandlerRegistry;
use courier_core::request::{Command, Query, Request, RequestKind, request_kind, request_name, short_type_name};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Mediator configuration
pub mod config;

/// Logging and panic translation
pub mod logging;

/// Request metrics
pub mod metrics;

/// Retries with exponential backoff
pub mod retry;

/// Deadlines for the inner chain
pub mod timeout;

/// Field-level request validation
pub mod validation;

pub use config::{DuplicatePolicy, LoggingConfig, MediatorConfig};
pub use error::{BuildError, DispatchError};
pub use logging::LoggingBehavior;
pub use metrics::MetricsBehavior;
pub use retry::{RetryBehavior, RetryPolicy};
pub use timeout::TimeoutBehavior;
pub use validation::{ValidationBehavior, Validator};

/// Error types for assembling and using a mediator
pub mod error {
    use crate::config::ConfigError;
    use courier_core::request::RequestKind;
    use thiserror::Error;

    pub use courier_core::error::DispatchError;

    /// Errors raised by [`MediatorBuilder::build`](crate::MediatorBuilder::build)
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum BuildError {
        /// Two handlers were registered for one request type under
        /// [`DuplicatePolicy::Reject`](crate::config::DuplicatePolicy::Reject)
        #[error(
            "duplicate handler for request type `{request_type}` (already registered as a {existing} handler)"
        )]
        DuplicateHandler {
            /// Fully qualified name of the request type
            request_type: &'static str,
            /// Bucket of the registration that was replaced
            existing: RequestKind,
        },

        /// The configuration failed validation
        #[error("invalid mediator configuration: {0}")]
        InvalidConfig(#[from] ConfigError),
    }
}

/// An explicit manifest of handlers (and optionally behaviors).
///
/// Feature modules implement this to register everything they own in one
/// place, instead of relying on runtime discovery.
///
/// # Example
///
/// ```
/// use courier_core::handler::FnHandler;
/// use courier_core::outcome::Outcome;
/// use courier_core::request::{Request, Write};
/// use courier_runtime::{HandlerModule, Mediator, MediatorBuilder};
///
/// #[derive(Debug)]
/// struct ClearTasks;
///
/// impl Request for ClearTasks {
///     type Response = ();
///     type Flavor = Write;
/// }
///
/// struct AdminModule;
///
/// impl HandlerModule for AdminModule {
///     fn register(self, builder: MediatorBuilder) -> MediatorBuilder {
///         builder.handler::<ClearTasks>(FnHandler::new(|_: &ClearTasks| Outcome::completed()))
///     }
/// }
///
/// let mediator = Mediator::builder().module(AdminModule).build().unwrap();
/// assert_eq!(mediator.handled_request_types().len(), 1);
/// ```
pub trait HandlerModule {
    /// Add this module's registrations to `builder`
    fn register(self, builder: MediatorBuilder) -> MediatorBuilder;
}

/// Startup configuration object, finalized into a [`Mediator`] by [`build`](Self::build).
///
/// Handlers and behaviors can only be added here, so nothing is ever
/// registered after dispatch begins.
#[derive(Default)]
pub struct MediatorBuilder {
    registry: HandlerRegistry,
    pipeline: Pipeline,
    config: MediatorConfig,
    duplicates: Vec<(&'static str, RequestKind)>,
}

impl MediatorBuilder {
    /// Create an empty builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: MediatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration
    #[must_use]
    pub const fn config(&self) -> &MediatorConfig {
        &self.config
    }

    /// Register a query handler
    #[must_use]
    pub fn query_handler<H: QueryHandler>(mut self, handler: H) -> Self {
        let replaced = self.registry.register_query(handler);
        self.note_registration::<H::Query>(replaced);
        self
    }

    /// Register a command handler
    #[must_use]
    pub fn command_handler<H: CommandHandler>(mut self, handler: H) -> Self {
        let replaced = self.registry.register_command(handler);
        self.note_registration::<H::Command>(replaced);
        self
    }

    /// Register any [`RequestHandler`] for `R`, in the bucket given by `R`'s flavor
    #[must_use]
    pub fn handler<R: Request>(mut self, handler: impl RequestHandler<R> + 'static) -> Self {
        let replaced = self.registry.register::<R>(handler);
        self.note_registration::<R>(replaced);
        self
    }

    /// Apply a [`HandlerModule`]
    #[must_use]
    pub fn module<M: HandlerModule>(self, module: M) -> Self {
        module.register(self)
    }

    /// Append an open behavior applying to every request
    #[must_use]
    pub fn behavior<B: PipelineBehavior>(self, behavior: B) -> Self {
        self.scoped_behavior(behavior, Scope::All)
    }

    /// Append an open behavior applying to every query
    #[must_use]
    pub fn query_behavior<B: PipelineBehavior>(self, behavior: B) -> Self {
        self.scoped_behavior(behavior, Scope::Queries)
    }

    /// Append an open behavior applying to every command
    #[must_use]
    pub fn command_behavior<B: PipelineBehavior>(self, behavior: B) -> Self {
        self.scoped_behavior(behavior, Scope::Commands)
    }

    /// Append an open behavior with an explicit scope
    #[must_use]
    pub fn scoped_behavior<B: PipelineBehavior>(mut self, behavior: B, scope: Scope) -> Self {
        tracing::debug!(
            behavior = short_type_name(std::any::type_name::<B>()),
            ?scope,
            "Registered behavior"
        );
        self.pipeline.push_open(behavior, scope);
        self
    }

    /// Append a behavior bound to request type `R`
    #[must_use]
    pub fn behavior_for<R: Request, B: Behavior<R>>(mut self, behavior: B) -> Self {
        tracing::debug!(
            behavior = short_type_name(std::any::type_name::<B>()),
            request = short_type_name(request_name::<R>()),
            "Registered behavior"
        );
        self.pipeline.push_exact::<R, B>(behavior);
        self
    }

    /// Append a [`LoggingBehavior`] for every request, using the current
    /// logging configuration.
    ///
    /// Register it first so it is the outermost layer and catches panics from
    /// every other layer.
    #[must_use]
    pub fn logging(self) -> Self {
        let behavior = LoggingBehavior::new(self.config.logging.clone());
        self.behavior(behavior)
    }

    fn note_registration<R: Request>(&mut self, replaced: Option<RequestKind>) {
        let name = request_name::<R>();
        tracing::debug!(request = short_type_name(name), kind = %request_kind::<R>(), "Registered handler");
        if let Some(existing) = replaced {
            self.duplicates.push((name, existing));
        }
    }

    /// Finalize into an immutable [`Mediator`]
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidConfig`] if the configuration is invalid,
    /// or [`BuildError::DuplicateHandler`] for the first request type
    /// registered twice when the policy is [`DuplicatePolicy::Reject`].
    pub fn build(self) -> Result<Mediator, BuildError> {
        self.config.validate()?;

        for &(request_type, existing) in &self.duplicates {
            match self.config.duplicate_handlers {
                DuplicatePolicy::Reject => {
                    return Err(BuildError::DuplicateHandler {
                        request_type,
                        existing,
                    });
                }
                DuplicatePolicy::Replace => tracing::warn!(
                    request = request_type,
                    "Handler registered more than once; keeping the last registration"
                ),
            }
        }

        tracing::info!(
            handlers = self.registry.len(),
            behaviors = self.pipeline.len(),
            "Mediator configured"
        );

        Ok(Mediator {
            inner: Arc::new(Inner {
                registry: self.registry,
                pipeline: self.pipeline,
                config: self.config,
            }),
        })
    }
}

struct Inner {
    registry: HandlerRegistry,
    pipeline: Pipeline,
    config: MediatorConfig,
}

/// The dispatch entry point.
///
/// Cheap to clone; every clone shares the same immutable registry and
/// behavior list, so concurrent dispatches need no synchronization.
///
/// Each call returns `Result<Outcome<_>, DispatchError>`: the outer `Err` is
/// a wiring mistake (no handler), the inner [`Outcome`] is the business result.
#[derive(Clone)]
pub struct Mediator {
    inner: Arc<Inner>,
}

impl Mediator {
    /// Start configuring a mediator
    #[must_use]
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    /// Dispatch a query
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HandlerNotFound`] if no handler is registered
    /// for `Q`. No behavior or handler runs in that case.
    pub async fn query<Q: Query>(
        &self,
        query: &Q,
        cancel: &CancellationToken,
    ) -> Result<Outcome<Q::Response>, DispatchError> {
        self.dispatch(query, cancel).await
    }

    /// Dispatch a command. Commands without a response yield `Outcome<()>`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HandlerNotFound`] if no handler is registered
    /// for `C`. No behavior or handler runs in that case.
    pub async fn command<C: Command>(
        &self,
        command: &C,
        cancel: &CancellationToken,
    ) -> Result<Outcome<C::Response>, DispatchError> {
        self.dispatch(command, cancel).await
    }

    /// Dispatch any request, query or command
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HandlerNotFound`] if no handler is registered
    /// for `R`. No behavior or handler runs in that case.
    pub async fn send<R: Request>(
        &self,
        request: &R,
        cancel: &CancellationToken,
    ) -> Result<Outcome<R::Response>, DispatchError> {
        self.dispatch(request, cancel).await
    }

    async fn dispatch<R: Request>(
        &self,
        request: &R,
        cancel: &CancellationToken,
    ) -> Result<Outcome<R::Response>, DispatchError> {
        let span = tracing::debug_span!(
            "dispatch",
            request = short_type_name(request_name::<R>()),
            kind = %request_kind::<R>()
        );

        async move {
            let resolved = self
                .inner
                .registry
                .resolve::<R>()
                .inspect_err(|error| tracing::error!(%error, "Dispatch failed"))?;

            Ok(self
                .inner
                .pipeline
                .execute(resolved.handler, request, cancel)
                .await)
        }
        .instrument(span)
        .await
    }

    /// Registered request types with their bucket, sorted by name
    #[must_use]
    pub fn handled_request_types(&self) -> Vec<(&'static str, RequestKind)> {
        self.inner.registry.handled_request_types()
    }

    /// Returns `true` if `R` has a handler
    #[must_use]
    pub fn handles<R: Request>(&self) -> bool {
        self.inner.registry.contains::<R>()
    }

    /// Behavior type names, outermost first
    #[must_use]
    pub fn behavior_names(&self) -> Vec<&'static str> {
        self.inner.pipeline.layer_names()
    }

    /// Configuration this mediator was built with
    #[must_use]
    pub fn config(&self) -> &MediatorConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("handlers", &self.inner.registry.len())
            .field("behaviors", &self.inner.pipeline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use courier_core::handler::FnHandler;
    use courier_core::request::{Read, Write};

    #[derive(Debug)]
    struct Count;

    impl Request for Count {
        type Response = usize;
        type Flavor = Read;
    }

    #[derive(Debug)]
    struct Reset;

    impl Request for Reset {
        type Response = ();
        type Flavor = Write;
    }

    fn count_handler(n: usize) -> impl RequestHandler<Count> + use<> {
        FnHandler::new(move |_: &Count| Outcome::success(n))
    }

    #[tokio::test]
    async fn duplicate_handlers_last_wins_by_default() {
        let mediator = Mediator::builder()
            .handler::<Count>(count_handler(1))
            .handler::<Count>(count_handler(2))
            .build()
            .unwrap();

        let outcome = mediator.query(&Count, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, Outcome::success(2));
    }

    #[test]
    fn duplicate_handlers_rejected_when_configured() {
        let config = MediatorConfig::default().with_duplicate_handlers(DuplicatePolicy::Reject);
        let err = Mediator::builder()
            .with_config(config)
            .handler::<Count>(count_handler(1))
            .handler::<Count>(count_handler(2))
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            BuildError::DuplicateHandler { existing: RequestKind::Query, .. }
        ));
        assert!(err.to_string().contains("Count"));
    }

    #[test]
    fn invalid_config_fails_build() {
        let logging = LoggingConfig {
            slow_request_threshold: std::time::Duration::ZERO,
            ..LoggingConfig::default()
        };
        let err = Mediator::builder()
            .with_config(MediatorConfig::default().with_logging(logging))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidConfig(_)));
    }

    #[test]
    fn introspection_reports_registrations() {
        let mediator = Mediator::builder()
            .logging()
            .handler::<Count>(count_handler(0))
            .handler::<Reset>(FnHandler::new(|_: &Reset| Outcome::completed()))
            .build()
            .unwrap();

        assert!(mediator.handles::<Count>());
        let kinds: Vec<_> = mediator.handled_request_types().into_iter().map(|(_, kind)| kind).collect();
        assert_eq!(kinds, [RequestKind::Query, RequestKind::Command]);
        assert_eq!(mediator.behavior_names().len(), 1);
        assert!(format!("{mediator:?}").contains("LoggingBehavior"));
    }

    #[tokio::test]
    async fn typed_and_untyped_entry_points_agree() {
        let mediator = Mediator::builder()
            .handler::<Count>(count_handler(4))
            .handler::<Reset>(FnHandler::new(|_: &Reset| Outcome::completed()))
            .build()
            .unwrap();
        let cancel = CancellationToken::new();

        assert_eq!(mediator.query(&Count, &cancel).await.unwrap(), Outcome::success(4));
        assert_eq!(mediator.send(&Count, &cancel).await.unwrap(), Outcome::success(4));
        assert_eq!(mediator.command(&Reset, &cancel).await.unwrap(), Outcome::completed());
        assert_eq!(mediator.send(&Reset, &cancel).await.unwrap(), Outcome::completed());
        assert_eq!(mediator.inner.registry.resolve::<Count>().unwrap().kind, request_kind::<Count>());
        assert_eq!(mediator.inner.registry.resolve::<Reset>().unwrap().kind, request_kind::<Reset>());
    }

    #[tokio::test]
    async fn clones_share_registrations() {
        let mediator = Mediator::builder().handler::<Count>(count_handler(5)).build().unwrap();
        let clone = mediator.clone();
        let handle = tokio::spawn(async move { clone.send(&Count, &CancellationToken::new()).await });
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome, Outcome::success(5));
    }
}
