//! Tests for #[derive(Query)] and #[derive(Command)]

use courier_core::request::{Command, Query, Read, Request, RequestKind, Write, request_kind};
use courier_macros::{Command, Query};
use std::any::TypeId;

#[derive(Query, Debug)]
#[query(response = Vec<String>)]
struct ListTitles;

#[derive(Query, Debug)]
#[query(response = Option<u32>)]
struct FindAge {
    name: String,
}

#[derive(Command, Debug)]
struct ClearAll;

#[derive(Command, Debug)]
#[command(response = u64)]
struct Enqueue {
    payload: Vec<u8>,
}

#[derive(Query, Debug)]
#[query(response = T)]
struct Echo<T: std::fmt::Debug + Send + Sync + 'static> {
    value: T,
}

fn response_of<R: Request>() -> TypeId
where
    R::Response: 'static,
{
    TypeId::of::<R::Response>()
}

fn assert_query<Q: Query>() {}
fn assert_command<C: Command>() {}

#[test]
fn test_query_flavor_and_response() {
    assert_query::<ListTitles>();
    assert_query::<FindAge>();
    assert_eq!(request_kind::<ListTitles>(), RequestKind::Query);
    assert_eq!(response_of::<ListTitles>(), TypeId::of::<Vec<String>>());
    assert_eq!(response_of::<FindAge>(), TypeId::of::<Option<u32>>());
    assert_eq!(TypeId::of::<<FindAge as Request>::Flavor>(), TypeId::of::<Read>());
}

#[test]
fn test_command_defaults_to_unit_response() {
    assert_command::<ClearAll>();
    assert_eq!(request_kind::<ClearAll>(), RequestKind::Command);
    assert_eq!(response_of::<ClearAll>(), TypeId::of::<()>());
    assert_eq!(TypeId::of::<<ClearAll as Request>::Flavor>(), TypeId::of::<Write>());
}

#[test]
fn test_command_with_response() {
    assert_command::<Enqueue>();
    assert_eq!(response_of::<Enqueue>(), TypeId::of::<u64>());
    let cmd = Enqueue { payload: vec![1, 2] };
    assert_eq!(cmd.payload.len(), 2);
}

#[test]
fn test_generic_query() {
    assert_query::<Echo<i32>>();
    assert_eq!(response_of::<Echo<String>>(), TypeId::of::<String>());
    let echo = Echo { value: 3 };
    assert_eq!(echo.value, 3);
    let find = FindAge { name: "ada".into() };
    assert_eq!(find.name, "ada");
}
