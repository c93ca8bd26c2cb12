//! Behavior chain composition.
//!
//! Behaviors are middleware wrapped around a handler invocation. A
//! [`Pipeline`] keeps every registered behavior in registration order. When a
//! request of type `R` is dispatched, the pipeline selects the layers that
//! apply to `R` and runs them as an onion around the handler:
//!
//! ```text
//!   B1.before → B2.before → handler → B2.after → B1.after
//! ```
//!
//! The first-registered behavior is the outermost. This is the same nesting
//! obtained by starting from the handler and wrapping it with each behavior in
//! reverse registration order; [`Next`] realizes it lazily as a cursor over the
//! remaining layers, so nothing is allocated when no behavior applies.
//!
//! # Two kinds of behaviors
//!
//! - [`Behavior<R>`]: bound to one concrete request type, fully typed.
//! - [`PipelineBehavior`]: open, applies to every request in a [`Scope`]
//!   (all requests, all queries, or all commands). It sees the request through
//!   [`RequestInfo`] and the response as an opaque [`AnyResponse`].
//!
//! Both kinds share a single ordering.
//!
//! # Short-circuiting
//!
//! A behavior that returns without running `next` prevents every deeper layer,
//! including the handler, from running. Its outcome becomes the final outcome.

use crate::handler::RequestHandler;
use crate::outcome::{Error, Outcome};
use crate::request::{Request, RequestKind, request_kind, request_name, short_type_name};
use futures::future::BoxFuture;
use smallvec::SmallVec;
use std::any::{Any, TypeId};
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Error code when an open behavior hands back a response of the wrong type
pub const RESPONSE_TYPE_MISMATCH: &str = "RESPONSE_TYPE_MISMATCH";

/// Middleware bound to requests of type `R`.
///
/// # Example
///
/// ```
/// use courier_core::outcome::Outcome;
/// use courier_core::pipeline::{Behavior, Next};
/// use courier_core::request::Request;
/// use futures::future::BoxFuture;
/// use tokio_util::sync::CancellationToken;
///
/// /// Rejects every request once the token is cancelled.
/// struct StopWhenCancelled;
///
/// impl<R: Request> Behavior<R> for StopWhenCancelled {
///     fn handle<'a>(
///         &'a self,
///         _request: &'a R,
///         cancel: &'a CancellationToken,
///         next: Next<'a, R>,
///     ) -> BoxFuture<'a, Outcome<R::Response>> {
///         if cancel.is_cancelled() {
///             return Box::pin(async {
///                 Outcome::failure("CANCELLED", "request cancelled", Default::default())
///             });
///         }
///         next.run()
///     }
/// }
/// ```
pub trait Behavior<R: Request>: Send + Sync + 'static {
    /// Run this layer. Call `next.run()` to continue the chain.
    fn handle<'a>(
        &'a self,
        request: &'a R,
        cancel: &'a CancellationToken,
        next: Next<'a, R>,
    ) -> BoxFuture<'a, Outcome<R::Response>>;
}

/// Middleware applicable to any request in a [`Scope`].
///
/// Open behaviors are object safe: they observe the request through
/// [`RequestInfo`] and forward the [`AnyResponse`] produced by `next`. They
/// cannot fabricate a success, but can return any failure.
pub trait PipelineBehavior: Send + Sync + 'static {
    /// Run this layer. Call `next.run()` to continue the chain.
    fn handle<'a>(
        &'a self,
        request: RequestInfo<'a>,
        cancel: &'a CancellationToken,
        next: ErasedNext<'a>,
    ) -> BoxFuture<'a, Outcome<AnyResponse>>;
}

/// Which requests an open behavior applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Every request
    #[default]
    All,
    /// Queries only
    Queries,
    /// Commands only
    Commands,
}

impl Scope {
    /// Returns `true` if requests of `kind` fall in this scope
    #[must_use]
    pub const fn includes(self, kind: RequestKind) -> bool {
        matches!(
            (self, kind),
            (Self::All, _) | (Self::Queries, RequestKind::Query) | (Self::Commands, RequestKind::Command)
        )
    }
}

/// Type-erased view of the request being dispatched.
#[derive(Clone, Copy)]
pub struct RequestInfo<'a> {
    name: &'static str,
    kind: RequestKind,
    request: &'a (dyn fmt::Debug + Sync),
}

impl<'a> RequestInfo<'a> {
    /// View of `request`
    pub fn of<R: Request>(request: &'a R) -> Self {
        Self {
            name: request_name::<R>(),
            kind: request_kind::<R>(),
            request,
        }
    }

    /// Fully qualified request type name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Request type name without its module path
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }

    /// Query or command
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.kind
    }

    /// The request itself, for logging
    #[must_use]
    pub const fn request(&self) -> &'a (dyn fmt::Debug + Sync) {
        self.request
    }
}

impl fmt::Debug for RequestInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("request", &self.request)
            .finish()
    }
}

trait Payload: Any + fmt::Debug + Send {
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Any + fmt::Debug + Send> Payload for T {
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// A response value seen by an open behavior.
///
/// Only the composer can create one, from the value the handler produced.
pub struct AnyResponse {
    type_name: &'static str,
    value: Box<dyn Payload>,
}

impl AnyResponse {
    fn new<T: fmt::Debug + Send + 'static>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            value: Box::new(value),
        }
    }

    /// Type name of the wrapped value
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn downcast<T: 'static>(self) -> Option<T> {
        self.value.into_any().downcast::<T>().ok().map(|value| *value)
    }
}

impl fmt::Debug for AnyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

/// A selected layer for one dispatch of `R`.
pub enum Link<'a, R: Request> {
    /// A behavior bound to `R`
    Typed(&'a dyn Behavior<R>),
    /// An open behavior whose scope includes `R`
    Open(&'a dyn PipelineBehavior),
}

impl<R: Request> Clone for Link<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Request> Copy for Link<'_, R> {}

/// The rest of the chain, from the point of view of one layer.
///
/// `Next` is `Copy`: a layer may run it once (the usual case), several times
/// (retries) or not at all (short-circuit).
pub struct Next<'a, R: Request> {
    request: &'a R,
    cancel: &'a CancellationToken,
    links: &'a [Link<'a, R>],
    handler: &'a dyn RequestHandler<R>,
}

impl<R: Request> Clone for Next<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Request> Copy for Next<'_, R> {}

impl<'a, R: Request> Next<'a, R> {
    /// Chain of `links` (outermost first) ending in `handler`
    pub const fn new(
        request: &'a R,
        cancel: &'a CancellationToken,
        links: &'a [Link<'a, R>],
        handler: &'a dyn RequestHandler<R>,
    ) -> Self {
        Self {
            request,
            cancel,
            links,
            handler,
        }
    }

    /// Number of layers still ahead of the handler
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.links.len()
    }

    /// Run the rest of the chain
    pub fn run(self) -> BoxFuture<'a, Outcome<R::Response>> {
        let Some((link, rest)) = self.links.split_first() else {
            return self.handler.invoke(self.request, self.cancel);
        };
        let inner = Self { links: rest, ..self };

        match *link {
            Link::Typed(behavior) => behavior.handle(self.request, self.cancel, inner),
            Link::Open(behavior) => {
                let pending =
                    behavior.handle(RequestInfo::of(self.request), self.cancel, ErasedNext::new(inner));
                Box::pin(async move { pending.await.and_then(restore_response::<R>) })
            }
        }
    }
}

fn restore_response<R: Request>(response: AnyResponse) -> Outcome<R::Response> {
    let found = response.type_name();
    match response.downcast::<R::Response>() {
        Some(value) => Outcome::success(value),
        None => Error::internal(
            RESPONSE_TYPE_MISMATCH,
            format!(
                "behavior returned a `{found}` response for request `{}`",
                request_name::<R>()
            ),
        )
        .into(),
    }
}

trait Chain<'a>: Send + Sync {
    fn run_erased(&self) -> BoxFuture<'a, Outcome<AnyResponse>>;
}

impl<'a, R: Request> Chain<'a> for Next<'a, R> {
    fn run_erased(&self) -> BoxFuture<'a, Outcome<AnyResponse>> {
        let pending = Next::run(*self);
        Box::pin(async move { pending.await.map(AnyResponse::new) })
    }
}

/// The rest of the chain, as seen by an open behavior.
pub struct ErasedNext<'a> {
    chain: Box<dyn Chain<'a> + 'a>,
}

impl<'a> ErasedNext<'a> {
    fn new<R: Request>(next: Next<'a, R>) -> Self {
        Self {
            chain: Box::new(next),
        }
    }

    /// Run the rest of the chain. May be called more than once.
    pub fn run(&self) -> BoxFuture<'a, Outcome<AnyResponse>> {
        self.chain.run_erased()
    }
}

enum Layer {
    Open {
        name: &'static str,
        scope: Scope,
        behavior: Box<dyn PipelineBehavior>,
    },
    Exact {
        name: &'static str,
        request: TypeId,
        // Holds a `Box<dyn Behavior<R>>` for the request type `request`.
        behavior: Box<dyn Any + Send + Sync>,
    },
}

impl Layer {
    const fn name(&self) -> &'static str {
        match self {
            Self::Open { name, .. } | Self::Exact { name, .. } => name,
        }
    }
}

/// Ordered list of behaviors, shared by every dispatch.
///
/// # Example
///
/// ```
/// use courier_core::handler::FnHandler;
/// use courier_core::outcome::Outcome;
/// use courier_core::pipeline::Pipeline;
/// use courier_core::request::{Read, Request};
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Debug)]
/// struct Ping;
///
/// impl Request for Ping {
///     type Response = &'static str;
///     type Flavor = Read;
/// }
///
/// let pipeline = Pipeline::new();
/// let handler = FnHandler::new(|_: &Ping| Outcome::success("pong"));
/// let cancel = CancellationToken::new();
///
/// let outcome = futures::executor::block_on(pipeline.execute(&handler, &Ping, &cancel));
/// assert_eq!(outcome, Outcome::success("pong"));
/// ```
#[derive(Default)]
pub struct Pipeline {
    layers: Vec<Layer>,
}

impl Pipeline {
    /// Create an empty pipeline
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an open behavior applying to every request in `scope`
    pub fn push_open<B: PipelineBehavior>(&mut self, behavior: B, scope: Scope) {
        self.layers.push(Layer::Open {
            name: std::any::type_name::<B>(),
            scope,
            behavior: Box::new(behavior),
        });
    }

    /// Append a behavior bound to request type `R`
    pub fn push_exact<R: Request, B: Behavior<R>>(&mut self, behavior: B) {
        let behavior: Box<dyn Behavior<R>> = Box::new(behavior);
        self.layers.push(Layer::Exact {
            name: std::any::type_name::<B>(),
            request: TypeId::of::<R>(),
            behavior: Box::new(behavior),
        });
    }

    /// Number of registered layers, across all request types
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if no behavior is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Behavior type names, in registration order
    #[must_use]
    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(Layer::name).collect()
    }

    /// The layers that apply to `R`, outermost first
    #[must_use]
    pub fn select<R: Request>(&self) -> SmallVec<[Link<'_, R>; 4]> {
        let kind = request_kind::<R>();
        let target = TypeId::of::<R>();

        self.layers
            .iter()
            .filter_map(|layer| match layer {
                Layer::Open {
                    scope, behavior, ..
                } => scope.includes(kind).then(|| Link::Open(&**behavior)),
                Layer::Exact {
                    request, behavior, ..
                } if *request == target => behavior
                    .downcast_ref::<Box<dyn Behavior<R>>>()
                    .map(|behavior| Link::Typed(&**behavior)),
                Layer::Exact { .. } => None,
            })
            .collect()
    }

    /// Run `request` through every applicable layer and then `handler`.
    ///
    /// With no applicable layer the handler is invoked directly.
    pub async fn execute<R: Request>(
        &self,
        handler: &dyn RequestHandler<R>,
        request: &R,
        cancel: &CancellationToken,
    ) -> Outcome<R::Response> {
        let links = self.select::<R>();
        if links.is_empty() {
            return handler.invoke(request, cancel).await;
        }
        Next::new(request, cancel, &links, handler).run().await
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.layer_names()).finish()
    }
}
