//! # Courier Core
//!
//! Core traits and types for the Courier request mediator.
//!
//! Callers hand a request to a mediator, which finds the one handler registered
//! for that request's concrete type, runs it inside a chain of cross-cutting
//! behaviors, and returns an [`Outcome`](outcome::Outcome). This crate holds the
//! pieces that do not depend on an async runtime; `courier-runtime` assembles
//! them into the `Mediator` facade.
//!
//! ## Core Concepts
//!
//! - **Request**: a value whose concrete type is its dispatch key. Either a
//!   **query** (reads, returns a value) or a **command** (may mutate state).
//! - **Handler**: the single piece of logic bound to one request type.
//! - **Outcome**: success with a value, or a failure carrying structured errors.
//! - **Behavior**: middleware wrapped around the handler, in registration order.
//! - **Registry**: request type → handler, populated once at startup.
//!
//! ## Example
//!
//! ```
//! use courier_core::handler::FnHandler;
//! use courier_core::outcome::{ErrorKind, Outcome};
//! use courier_core::pipeline::Pipeline;
//! use courier_core::registry::HandlerRegistry;
//! use courier_core::request::{Request, Write};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! struct RenameTask {
//!     title: String,
//! }
//!
//! impl Request for RenameTask {
//!     type Response = ();
//!     type Flavor = Write;
//! }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register::<RenameTask>(FnHandler::new(|cmd: &RenameTask| {
//!     if cmd.title.is_empty() {
//!         return Outcome::failure("RENAME_001", "Title is required.", ErrorKind::Validation);
//!     }
//!     Outcome::completed()
//! }));
//!
//! let pipeline = Pipeline::new();
//! let resolved = registry.resolve::<RenameTask>().unwrap();
//! let outcome = futures::executor::block_on(pipeline.execute(
//!     resolved.handler,
//!     &RenameTask { title: String::new() },
//!     &CancellationToken::new(),
//! ));
//!
//! assert_eq!(outcome.errors()[0].kind(), ErrorKind::Validation);
//! ```

pub mod error;
pub mod handler;
pub mod outcome;
pub mod pipeline;
pub mod registry;
pub mod request;

pub use error::DispatchError;
pub use handler::{CommandHandler, FnHandler, QueryHandler, RequestHandler};
pub use outcome::{Error, ErrorDetail, ErrorKind, Failure, Outcome};
pub use pipeline::{AnyResponse, Behavior, ErasedNext, Next, Pipeline, PipelineBehavior, RequestInfo, Scope};
pub use registry::HandlerRegistry;
pub use request::{Command, Query, Read, Request, RequestKind, Write};

// Re-exported so downstream crates name the same types as handler signatures.
pub use futures::future::BoxFuture;
pub use tokio_util::sync::CancellationToken;
