//! Integration tests for mediator dispatch
//!
//! Covers resolution, behavior ordering, short-circuiting, scoping, and the
//! fatal vs. business error channels through the public builder API.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use courier_core::handler::FnHandler;
use courier_core::outcome::{Error, ErrorDetail, ErrorKind, Outcome};
use courier_core::pipeline::{Behavior, Next};
use courier_core::request::{Read, Request, RequestKind, Write};
use courier_runtime::{DispatchError, Mediator, TimeoutBehavior, ValidationBehavior};
use courier_testing::{
    HANDLER_ENTRY, Journal, RecordingBehavior, RejectingBehavior, StubCommandHandler,
    StubQueryHandler, assertions, init_test_tracing,
};
use futures::future::BoxFuture;
use proptest::prelude::*;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone)]
struct GetBalance {
    account: u32,
}

impl Request for GetBalance {
    type Response = i64;
    type Flavor = Read;
}

#[derive(Debug, Clone)]
struct Deposit {
    amount: i64,
}

impl Request for Deposit {
    type Response = ();
    type Flavor = Write;
}

#[derive(Debug, Clone)]
struct OpenAccount {
    owner: String,
}

impl Request for OpenAccount {
    type Response = u32;
    type Flavor = Write;
}

#[derive(Debug)]
struct NeverRegistered;

impl Request for NeverRegistered {
    type Response = ();
    type Flavor = Write;
}

fn balance_handler(journal: &Journal) -> StubQueryHandler<GetBalance, impl Fn(&GetBalance) -> Outcome<i64> + Send + Sync + 'static + use<>> {
    StubQueryHandler::new(|q: &GetBalance| Outcome::success(i64::from(q.account) * 100)).with_journal(journal)
}

fn cancel() -> CancellationToken {
    CancellationToken::new()
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_registered_handler_runs_exactly_once_per_call() {
    init_test_tracing();
    let journal = Journal::new();
    let handler = balance_handler(&journal);
    let calls = handler.counter();
    let mediator = Mediator::builder().query_handler(handler).build().unwrap();

    for expected in 1..=3 {
        let outcome = mediator.query(&GetBalance { account: 2 }, &cancel()).await.unwrap();
        assert_eq!(outcome, Outcome::success(200));
        assert_eq!(calls.get(), expected);
    }
}

#[tokio::test]
async fn test_missing_handler_is_fatal_and_nothing_runs() {
    let journal = Journal::new();
    let mediator = Mediator::builder()
        .behavior(RecordingBehavior::new("log", &journal))
        .query_handler(balance_handler(&journal))
        .build()
        .unwrap();

    let err = mediator.command(&NeverRegistered, &cancel()).await.unwrap_err();

    assert!(matches!(err, DispatchError::HandlerNotFound { .. }));
    assert!(err.to_string().contains("NeverRegistered"));
    assert!(journal.is_empty());
}

#[tokio::test]
async fn test_unconfigured_mediator_always_fails_resolution() {
    let mediator = Mediator::builder().build().unwrap();
    assert!(mediator.send(&GetBalance { account: 1 }, &cancel()).await.is_err());
    assert!(mediator.handled_request_types().is_empty());
}

#[tokio::test]
async fn test_commands_with_and_without_response() {
    let mediator = Mediator::builder()
        .command_handler(StubCommandHandler::new(|_: &Deposit| Outcome::completed()))
        .command_handler(StubCommandHandler::new(|c: &OpenAccount| {
            Outcome::success(u32::try_from(c.owner.len()).unwrap())
        }))
        .build()
        .unwrap();

    let deposited: Outcome = mediator.command(&Deposit { amount: 5 }, &cancel()).await.unwrap();
    assert_eq!(deposited, Outcome::completed());

    let opened = mediator.command(&OpenAccount { owner: "ada".into() }, &cancel()).await.unwrap();
    assert_eq!(opened, Outcome::success(3));

    assert_eq!(
        mediator
            .handled_request_types()
            .into_iter()
            .map(|(_, kind)| kind)
            .collect::<Vec<_>>(),
        [RequestKind::Command, RequestKind::Command]
    );
}

// ============================================================================
// Behavior Ordering
// ============================================================================

#[tokio::test]
async fn test_first_registered_behavior_is_outermost() {
    let journal = Journal::new();
    let mediator = Mediator::builder()
        .behavior_for::<GetBalance, _>(RecordingBehavior::new("B1", &journal))
        .behavior_for::<GetBalance, _>(RecordingBehavior::new("B2", &journal))
        .query_handler(balance_handler(&journal))
        .build()
        .unwrap();

    mediator.query(&GetBalance { account: 1 }, &cancel()).await.unwrap();

    assert_eq!(
        journal.entries(),
        ["B1:before", "B2:before", HANDLER_ENTRY, "B2:after", "B1:after"]
    );
}

#[tokio::test]
async fn test_open_behaviors_respect_scope_and_order() {
    let journal = Journal::new();
    let mediator = Mediator::builder()
        .behavior(RecordingBehavior::new("all", &journal))
        .command_behavior(RecordingBehavior::new("commands", &journal))
        .query_behavior(RecordingBehavior::new("queries", &journal))
        .behavior_for::<GetBalance, _>(RecordingBehavior::new("exact", &journal))
        .query_handler(balance_handler(&journal))
        .command_handler(StubCommandHandler::new(|_: &Deposit| Outcome::completed()).with_journal(&journal))
        .build()
        .unwrap();

    mediator.query(&GetBalance { account: 1 }, &cancel()).await.unwrap();
    assert_eq!(
        journal.entries(),
        [
            "all:before",
            "queries:before",
            "exact:before",
            HANDLER_ENTRY,
            "exact:after",
            "queries:after",
            "all:after",
        ]
    );

    journal.clear();
    mediator.command(&Deposit { amount: 1 }, &cancel()).await.unwrap();
    assert_eq!(
        journal.entries(),
        ["all:before", "commands:before", HANDLER_ENTRY, "commands:after", "all:after"]
    );
}

// ============================================================================
// Short-Circuiting
// ============================================================================

#[tokio::test]
async fn test_short_circuit_prevents_handler_and_deeper_behaviors() {
    let journal = Journal::new();
    let rejecting = RejectingBehavior::new(Error::forbidden("DEPOSIT_403", "Deposits are frozen"));
    let rejections = rejecting.counter();
    let handler = StubCommandHandler::new(|_: &Deposit| Outcome::completed()).with_journal(&journal);
    let calls = handler.counter();

    let mediator = Mediator::builder()
        .behavior(RecordingBehavior::new("outer", &journal))
        .behavior_for::<Deposit, _>(rejecting)
        .behavior(RecordingBehavior::new("inner", &journal))
        .command_handler(handler)
        .build()
        .unwrap();

    let outcome = mediator.command(&Deposit { amount: 10 }, &cancel()).await.unwrap();

    assertions::assert_failure_kind(&outcome, ErrorKind::Forbidden);
    assert_eq!(journal.entries(), ["outer:before", "outer:after"]);
    assert_eq!(rejections.get(), 1);
    assert_eq!(calls.get(), 0);
}

#[tokio::test]
async fn test_validation_rejects_before_the_handler() {
    let handler = StubCommandHandler::new(|_: &OpenAccount| Outcome::success(1));
    let calls = handler.counter();
    let mediator = Mediator::builder()
        .behavior_for::<OpenAccount, _>(ValidationBehavior::new().with_validator(|c: &OpenAccount| {
            if c.owner.is_empty() {
                vec![ErrorDetail::new("owner", "Owner is required.")]
            } else {
                vec![]
            }
        }))
        .command_handler(handler)
        .build()
        .unwrap();

    let rejected = mediator.command(&OpenAccount { owner: String::new() }, &cancel()).await.unwrap();
    assert_eq!(assertions::assert_detail(&rejected, "owner"), "Owner is required.");
    assert_eq!(rejected.errors().len(), 1);
    assert_eq!(calls.get(), 0);

    let accepted = mediator.command(&OpenAccount { owner: "ada".into() }, &cancel()).await.unwrap();
    assert_eq!(accepted, Outcome::success(1));
    assert_eq!(calls.get(), 1);
}

// ============================================================================
// Typed Behaviors Can Transform Responses
// ============================================================================

struct DoubleBalance;

impl Behavior<GetBalance> for DoubleBalance {
    fn handle<'a>(
        &'a self,
        _request: &'a GetBalance,
        _cancel: &'a CancellationToken,
        next: Next<'a, GetBalance>,
    ) -> BoxFuture<'a, Outcome<i64>> {
        Box::pin(async move { next.run().await.map(|balance| balance * 2) })
    }
}

#[tokio::test]
async fn test_typed_behavior_transforms_response_through_open_layers() {
    let journal = Journal::new();
    let mediator = Mediator::builder()
        .behavior(RecordingBehavior::new("log", &journal))
        .behavior_for::<GetBalance, _>(DoubleBalance)
        .query_handler(balance_handler(&journal))
        .build()
        .unwrap();

    let outcome = mediator.query(&GetBalance { account: 3 }, &cancel()).await.unwrap();
    assert_eq!(outcome, Outcome::success(600));
}

// ============================================================================
// Cancellation & Concurrency
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_timeout_behavior_races_the_chain() {
    struct Stall;

    impl Behavior<GetBalance> for Stall {
        fn handle<'a>(
            &'a self,
            _request: &'a GetBalance,
            cancel: &'a CancellationToken,
            next: Next<'a, GetBalance>,
        ) -> BoxFuture<'a, Outcome<i64>> {
            Box::pin(async move {
                cancel.cancelled().await;
                next.run().await
            })
        }
    }

    let journal = Journal::new();
    let mediator = Mediator::builder()
        .behavior(TimeoutBehavior::new(Duration::from_secs(1)))
        .behavior_for::<GetBalance, _>(Stall)
        .query_handler(balance_handler(&journal))
        .build()
        .unwrap();

    let outcome = mediator.query(&GetBalance { account: 1 }, &cancel()).await.unwrap();
    assertions::assert_failure_kind(&outcome, ErrorKind::Internal);
    assert!(journal.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatches_are_independent() {
    let journal = Journal::new();
    let handler = balance_handler(&journal);
    let calls = handler.counter();
    let mediator = Mediator::builder().query_handler(handler).build().unwrap();

    let tasks: Vec<_> = (0..32_u32)
        .map(|account| {
            let mediator = mediator.clone();
            tokio::spawn(async move {
                mediator
                    .query(&GetBalance { account }, &CancellationToken::new())
                    .await
                    .unwrap()
            })
        })
        .collect();

    for (account, task) in tasks.into_iter().enumerate() {
        let expected = i64::try_from(account).unwrap() * 100;
        assert_eq!(task.await.unwrap(), Outcome::success(expected));
    }
    assert_eq!(calls.get(), 32);
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_no_behaviors_matches_direct_handler_call(account in any::<u32>(), limit in any::<i64>()) {
        let respond = move |q: &GetBalance| {
            if i64::from(q.account) > limit {
                Outcome::failure("LIMIT", "over limit", ErrorKind::Conflict)
            } else {
                Outcome::success(i64::from(q.account))
            }
        };
        let direct = respond(&GetBalance { account });

        let mediator = Mediator::builder()
            .handler::<GetBalance>(FnHandler::new(respond))
            .build()
            .unwrap();
        let dispatched = tokio_test::block_on(mediator.query(&GetBalance { account }, &CancellationToken::new())).unwrap();

        prop_assert_eq!(direct, dispatched);
    }
}
