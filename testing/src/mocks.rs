//! Test doubles for handlers and behaviors.
//!
//! Every double can write into a shared [`Journal`], so a test can assert the
//! exact interleaving of behaviors and handlers:
//!
//! ```
//! use courier_testing::mocks::{Journal, RecordingBehavior};
//!
//! let journal = Journal::new();
//! let outer = RecordingBehavior::new("B1", &journal);
//! let inner = RecordingBehavior::new("B2", &journal);
//! # let _ = (outer, inner);
//! // ... register both, dispatch, then:
//! // assert_eq!(journal.entries(), ["B1:before", "B2:before", "handler", "B2:after", "B1:after"]);
//! ```

use courier_core::handler::{CommandHandler, QueryHandler};
use courier_core::outcome::{Error, Outcome};
use courier_core::pipeline::{AnyResponse, Behavior, ErasedNext, Next, PipelineBehavior, RequestInfo};
use courier_core::request::{Command, Query, Request};
use futures::future::BoxFuture;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// Journal entry written by stub handlers
pub const HANDLER_ENTRY: &str = "handler";

/// Ordered, shareable log of what ran.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    /// Create an empty journal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry
    pub fn record(&self, entry: impl Into<String>) {
        self.lock().push(entry.into());
    }

    /// Snapshot of every entry, oldest first
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns `true` if `entry` was recorded at least once
    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.lock().iter().any(|recorded| recorded == entry)
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Shared invocation counter handed out by the doubles.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    /// Number of recorded calls
    #[must_use]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Writes `<label>:before` and `<label>:after` around the rest of the chain.
///
/// Works both as an open behavior and as a behavior bound to one request type.
#[derive(Debug, Clone)]
pub struct RecordingBehavior {
    label: String,
    journal: Journal,
}

impl RecordingBehavior {
    /// Record into `journal` under `label`
    #[must_use]
    pub fn new(label: impl Into<String>, journal: &Journal) -> Self {
        Self {
            label: label.into(),
            journal: journal.clone(),
        }
    }
}

impl<R: Request> Behavior<R> for RecordingBehavior {
    fn handle<'a>(
        &'a self,
        _request: &'a R,
        _cancel: &'a CancellationToken,
        next: Next<'a, R>,
    ) -> BoxFuture<'a, Outcome<R::Response>> {
        Box::pin(async move {
            self.journal.record(format!("{}:before", self.label));
            let outcome = next.run().await;
            self.journal.record(format!("{}:after", self.label));
            outcome
        })
    }
}

impl PipelineBehavior for RecordingBehavior {
    fn handle<'a>(
        &'a self,
        _request: RequestInfo<'a>,
        _cancel: &'a CancellationToken,
        next: ErasedNext<'a>,
    ) -> BoxFuture<'a, Outcome<AnyResponse>> {
        Box::pin(async move {
            self.journal.record(format!("{}:before", self.label));
            let outcome = next.run().await;
            self.journal.record(format!("{}:after", self.label));
            outcome
        })
    }
}

/// Returns a fixed failure without running the rest of the chain.
#[derive(Debug, Clone)]
pub struct RejectingBehavior {
    error: Error,
    calls: CallCounter,
}

impl RejectingBehavior {
    /// Reject every request with `error`
    #[must_use]
    pub fn new(error: Error) -> Self {
        Self {
            error,
            calls: CallCounter::default(),
        }
    }

    /// Counter of rejected requests
    #[must_use]
    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl<R: Request> Behavior<R> for RejectingBehavior {
    fn handle<'a>(
        &'a self,
        _request: &'a R,
        _cancel: &'a CancellationToken,
        _next: Next<'a, R>,
    ) -> BoxFuture<'a, Outcome<R::Response>> {
        self.calls.increment();
        let error = self.error.clone();
        Box::pin(async move { error.into() })
    }
}

impl PipelineBehavior for RejectingBehavior {
    fn handle<'a>(
        &'a self,
        _request: RequestInfo<'a>,
        _cancel: &'a CancellationToken,
        _next: ErasedNext<'a>,
    ) -> BoxFuture<'a, Outcome<AnyResponse>> {
        self.calls.increment();
        let error = self.error.clone();
        Box::pin(async move { error.into() })
    }
}

/// A [`QueryHandler`] answering from a closure, counting its calls.
pub struct StubQueryHandler<Q, F> {
    respond: F,
    calls: CallCounter,
    journal: Option<Journal>,
    _query: PhantomData<fn(&Q)>,
}

impl<Q, F> StubQueryHandler<Q, F>
where
    Q: Query,
    F: Fn(&Q) -> Outcome<Q::Response> + Send + Sync + 'static,
{
    /// Answer every query with `respond`
    #[must_use]
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            calls: CallCounter::default(),
            journal: None,
            _query: PhantomData,
        }
    }

    /// Also write [`HANDLER_ENTRY`] into `journal` on every call
    #[must_use]
    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    /// Counter of handled queries
    #[must_use]
    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl<Q, F> QueryHandler for StubQueryHandler<Q, F>
where
    Q: Query,
    F: Fn(&Q) -> Outcome<Q::Response> + Send + Sync + 'static,
{
    type Query = Q;

    fn handle<'a>(&'a self, query: &'a Q, _cancel: &'a CancellationToken) -> BoxFuture<'a, Outcome<Q::Response>> {
        Box::pin(async move {
            self.calls.increment();
            if let Some(journal) = &self.journal {
                journal.record(HANDLER_ENTRY);
            }
            (self.respond)(query)
        })
    }
}

/// A [`CommandHandler`] executing a closure, counting its calls.
pub struct StubCommandHandler<C, F> {
    execute: F,
    calls: CallCounter,
    journal: Option<Journal>,
    _command: PhantomData<fn(&C)>,
}

impl<C, F> StubCommandHandler<C, F>
where
    C: Command,
    F: Fn(&C) -> Outcome<C::Response> + Send + Sync + 'static,
{
    /// Execute every command with `execute`
    #[must_use]
    pub fn new(execute: F) -> Self {
        Self {
            execute,
            calls: CallCounter::default(),
            journal: None,
            _command: PhantomData,
        }
    }

    /// Also write [`HANDLER_ENTRY`] into `journal` on every call
    #[must_use]
    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    /// Counter of handled commands
    #[must_use]
    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl<C, F> CommandHandler for StubCommandHandler<C, F>
where
    C: Command,
    F: Fn(&C) -> Outcome<C::Response> + Send + Sync + 'static,
{
    type Command = C;

    fn handle<'a>(&'a self, command: &'a C, _cancel: &'a CancellationToken) -> BoxFuture<'a, Outcome<C::Response>> {
        Box::pin(async move {
            self.calls.increment();
            if let Some(journal) = &self.journal {
                journal.record(HANDLER_ENTRY);
            }
            (self.execute)(command)
        })
    }
}
