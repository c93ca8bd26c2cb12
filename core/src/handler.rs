//! Handler capability traits.
//!
//! A handler is the single piece of logic bound to one concrete request type.
//! Application code implements [`QueryHandler`] for queries and
//! [`CommandHandler`] for commands; the registry adapts both into the uniform
//! [`RequestHandler`] the composer invokes.
//!
//! # Dyn Compatibility
//!
//! Handlers return `BoxFuture` instead of using `async fn` so they can be stored
//! as trait objects in the registry.

use crate::outcome::Outcome;
use crate::request::{Command, Query, Request};
use futures::future::BoxFuture;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

/// Handles exactly one query type.
///
/// # Example
///
/// ```
/// use courier_core::handler::QueryHandler;
/// use courier_core::outcome::Outcome;
/// use courier_core::request::{Read, Request};
/// use futures::future::BoxFuture;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Debug)]
/// struct CountTasks;
///
/// impl Request for CountTasks {
///     type Response = usize;
///     type Flavor = Read;
/// }
///
/// struct CountTasksHandler;
///
/// impl QueryHandler for CountTasksHandler {
///     type Query = CountTasks;
///
///     fn handle<'a>(
///         &'a self,
///         _query: &'a CountTasks,
///         _cancel: &'a CancellationToken,
///     ) -> BoxFuture<'a, Outcome<usize>> {
///         Box::pin(async { Outcome::success(0) })
///     }
/// }
/// ```
pub trait QueryHandler: Send + Sync + 'static {
    /// The query this handler answers
    type Query: Query;

    /// Answer the query
    fn handle<'a>(
        &'a self,
        query: &'a Self::Query,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Outcome<<Self::Query as Request>::Response>>;
}

/// Handles exactly one command type.
pub trait CommandHandler: Send + Sync + 'static {
    /// The command this handler executes
    type Command: Command;

    /// Execute the command
    fn handle<'a>(
        &'a self,
        command: &'a Self::Command,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Outcome<<Self::Command as Request>::Response>>;
}

/// Flavor-agnostic handler invocation for request type `R`.
///
/// This is the base case of every behavior chain.
pub trait RequestHandler<R: Request>: Send + Sync {
    /// Invoke the handler
    fn invoke<'a>(
        &'a self,
        request: &'a R,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Outcome<R::Response>>;
}

/// Adapts a [`QueryHandler`] into a [`RequestHandler`].
pub struct QueryInvoker<H> {
    handler: H,
}

impl<H: QueryHandler> QueryInvoker<H> {
    /// Wrap a query handler
    pub const fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<H: QueryHandler> RequestHandler<H::Query> for QueryInvoker<H> {
    fn invoke<'a>(
        &'a self,
        request: &'a H::Query,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Outcome<<H::Query as Request>::Response>> {
        self.handler.handle(request, cancel)
    }
}

/// Adapts a [`CommandHandler`] into a [`RequestHandler`].
pub struct CommandInvoker<H> {
    handler: H,
}

impl<H: CommandHandler> CommandInvoker<H> {
    /// Wrap a command handler
    pub const fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<H: CommandHandler> RequestHandler<H::Command> for CommandInvoker<H> {
    fn invoke<'a>(
        &'a self,
        request: &'a H::Command,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Outcome<<H::Command as Request>::Response>> {
        self.handler.handle(request, cancel)
    }
}

/// A [`RequestHandler`] backed by a synchronous closure.
///
/// Handy for tests and for trivial handlers that never await.
pub struct FnHandler<R, F> {
    f: F,
    _request: PhantomData<fn(&R)>,
}

impl<R, F> FnHandler<R, F>
where
    R: Request,
    F: Fn(&R) -> Outcome<R::Response> + Send + Sync,
{
    /// Wrap a closure
    pub const fn new(f: F) -> Self {
        Self {
            f,
            _request: PhantomData,
        }
    }
}

impl<R, F> RequestHandler<R> for FnHandler<R, F>
where
    R: Request,
    F: Fn(&R) -> Outcome<R::Response> + Send + Sync,
{
    fn invoke<'a>(
        &'a self,
        request: &'a R,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Outcome<R::Response>> {
        let outcome = (self.f)(request);
        Box::pin(async move { outcome })
    }
}
