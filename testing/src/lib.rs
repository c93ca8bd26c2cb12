//! # Courier Testing
//!
//! Testing utilities and helpers for Courier mediators.
//!
//! This crate provides:
//! - Behavior doubles that record or reject ([`RecordingBehavior`], [`RejectingBehavior`])
//! - Stub handlers with call counters ([`StubQueryHandler`], [`StubCommandHandler`])
//! - A shared [`Journal`] for asserting execution order
//! - A fluent Given-When-Then helper ([`DispatchTest`])
//! - Tracing setup for tests ([`init_test_tracing`])
//!
//! ## Example
//!
//! ```ignore
//! use courier_testing::{Journal, RecordingBehavior, StubQueryHandler};
//! use courier_runtime::Mediator;
//!
//! #[tokio::test]
//! async fn behaviors_wrap_the_handler() {
//!     let journal = Journal::new();
//!     let mediator = Mediator::builder()
//!         .behavior(RecordingBehavior::new("log", &journal))
//!         .query_handler(StubQueryHandler::new(|_: &GetAllTasks| Outcome::success(vec![])).with_journal(&journal))
//!         .build()?;
//!
//!     mediator.query(&GetAllTasks, &CancellationToken::new()).await?;
//!     assert_eq!(journal.entries(), ["log:before", "handler", "log:after"]);
//! }
//! ```


/// Handler and behavior doubles
pub mod mocks;

pub use dispatch_test::{DispatchTest, assertions};
pub use mocks::{
    CallCounter, HANDLER_ENTRY, Journal, RecordingBehavior, RejectingBehavior, StubCommandHandler,
    StubQueryHandler,
};

use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG`, defaulting to `warn`. Safe to call from every test; only
/// the first call installs anything.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
