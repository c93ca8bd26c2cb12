//! Handler registry: request type → the one handler for it.
//!
//! Entries are keyed by the request's [`TypeId`] and stored as a tagged
//! variant, [`RegisteredHandler::Query`] or [`RegisteredHandler::Command`].
//! The registry is populated once at startup (usually through the runtime's
//! `MediatorBuilder`) and only read afterwards, so lookups need no locking.

use crate::error::DispatchError;
use crate::handler::{CommandHandler, CommandInvoker, QueryHandler, QueryInvoker, RequestHandler};
use crate::request::{Request, RequestKind, request_kind, request_name};
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// A type-erased handler for one request type.
///
/// Holds a `Box<dyn RequestHandler<R>>` for the `R` it was registered with.
pub struct ErasedHandler {
    inner: Box<dyn Any + Send + Sync>,
}

impl ErasedHandler {
    fn new<R: Request>(handler: Box<dyn RequestHandler<R>>) -> Self {
        Self {
            inner: Box::new(handler),
        }
    }

    /// Recover the typed handler; `None` if `R` is not the registered type
    #[must_use]
    pub fn downcast<R: Request>(&self) -> Option<&dyn RequestHandler<R>> {
        self.inner
            .downcast_ref::<Box<dyn RequestHandler<R>>>()
            .map(|handler| &**handler)
    }
}

impl std::fmt::Debug for ErasedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ErasedHandler(<handler>)")
    }
}

/// A registry entry, tagged with its dispatch bucket.
#[derive(Debug)]
pub enum RegisteredHandler {
    /// Registered through a query handler
    Query(ErasedHandler),
    /// Registered through a command handler
    Command(ErasedHandler),
}

impl RegisteredHandler {
    /// Which bucket this entry belongs to
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::Query(_) => RequestKind::Query,
            Self::Command(_) => RequestKind::Command,
        }
    }

    fn erased(&self) -> &ErasedHandler {
        match self {
            Self::Query(handler) | Self::Command(handler) => handler,
        }
    }
}

/// A resolved handler, ready to be invoked.
pub struct Resolved<'a, R: Request> {
    /// Bucket the handler was registered in
    pub kind: RequestKind,
    /// The handler itself
    pub handler: &'a dyn RequestHandler<R>,
}

#[derive(Debug)]
struct Registration {
    name: &'static str,
    handler: RegisteredHandler,
}

/// Mapping from request type to its handler.
///
/// # Example
///
/// ```
/// use courier_core::handler::FnHandler;
/// use courier_core::outcome::Outcome;
/// use courier_core::registry::HandlerRegistry;
/// use courier_core::request::{Read, Request, RequestKind};
///
/// #[derive(Debug)]
/// struct Ping;
///
/// impl Request for Ping {
///     type Response = &'static str;
///     type Flavor = Read;
/// }
///
/// let mut registry = HandlerRegistry::new();
/// registry.register::<Ping>(FnHandler::new(|_: &Ping| Outcome::success("pong")));
///
/// let resolved = registry.resolve::<Ping>().unwrap();
/// assert_eq!(resolved.kind, RequestKind::Query);
/// ```
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TypeId, Registration>,
}

impl HandlerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a query handler.
    ///
    /// Returns the bucket of the registration it replaced, if any.
    pub fn register_query<H: QueryHandler>(&mut self, handler: H) -> Option<RequestKind> {
        let erased = ErasedHandler::new::<H::Query>(Box::new(QueryInvoker::new(handler)));
        self.insert::<H::Query>(RegisteredHandler::Query(erased))
    }

    /// Register a command handler.
    ///
    /// Returns the bucket of the registration it replaced, if any.
    pub fn register_command<H: CommandHandler>(&mut self, handler: H) -> Option<RequestKind> {
        let erased = ErasedHandler::new::<H::Command>(Box::new(CommandInvoker::new(handler)));
        self.insert::<H::Command>(RegisteredHandler::Command(erased))
    }

    /// Register any [`RequestHandler`] for `R`, in the bucket given by `R`'s flavor.
    ///
    /// Returns the bucket of the registration it replaced, if any.
    pub fn register<R: Request>(
        &mut self,
        handler: impl RequestHandler<R> + 'static,
    ) -> Option<RequestKind> {
        let erased = ErasedHandler::new::<R>(Box::new(handler));
        let entry = match request_kind::<R>() {
            RequestKind::Query => RegisteredHandler::Query(erased),
            RequestKind::Command => RegisteredHandler::Command(erased),
        };
        self.insert::<R>(entry)
    }

    fn insert<R: Request>(&mut self, handler: RegisteredHandler) -> Option<RequestKind> {
        let registration = Registration {
            name: request_name::<R>(),
            handler,
        };
        self.handlers
            .insert(TypeId::of::<R>(), registration)
            .map(|previous| previous.handler.kind())
    }

    /// The raw entry for `R`, if registered
    #[must_use]
    pub fn lookup<R: Request>(&self) -> Option<&RegisteredHandler> {
        self.handlers
            .get(&TypeId::of::<R>())
            .map(|registration| &registration.handler)
    }

    /// Resolve the handler for `R`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HandlerNotFound`] naming `R` if nothing was
    /// registered for it.
    pub fn resolve<R: Request>(&self) -> Result<Resolved<'_, R>, DispatchError> {
        let not_found = || DispatchError::HandlerNotFound {
            request_type: request_name::<R>(),
        };
        let entry = self.lookup::<R>().ok_or_else(not_found)?;
        let handler = entry.erased().downcast::<R>().ok_or_else(not_found)?;
        Ok(Resolved {
            kind: entry.kind(),
            handler,
        })
    }

    /// Returns `true` if `R` has a handler
    #[must_use]
    pub fn contains<R: Request>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }

    /// Number of registered request types
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered request types with their bucket, sorted by name
    #[must_use]
    pub fn handled_request_types(&self) -> Vec<(&'static str, RequestKind)> {
        let mut types: Vec<_> = self
            .handlers
            .values()
            .map(|registration| (registration.name, registration.handler.kind()))
            .collect();
        types.sort_unstable_by_key(|(name, _)| *name);
        types
    }
}
