//! Request taxonomy: queries and commands.
//!
//! A request's concrete type is its dispatch key. Every request declares its
//! response type and its flavor:
//!
//! - [`Read`] requests are **queries**: they return a value and do not mutate state.
//! - [`Write`] requests are **commands**: they may mutate state and may return a
//!   value (`Response = ()` for commands that return nothing).
//!
//! [`Query`] and [`Command`] are implemented automatically from the flavor, so a
//! type can never be both.
//!
//! # Example
//!
//! ```
//! use courier_core::request::{Query, Request, Read, Write, RequestKind, request_kind};
//!
//! #[derive(Debug)]
//! struct GetAllTasks;
//!
//! impl Request for GetAllTasks {
//!     type Response = Vec<String>;
//!     type Flavor = Read;
//! }
//!
//! #[derive(Debug)]
//! struct ArchiveTasks;
//!
//! impl Request for ArchiveTasks {
//!     type Response = ();
//!     type Flavor = Write;
//! }
//!
//! fn takes_query<Q: Query>(_: &Q) {}
//! takes_query(&GetAllTasks);
//!
//! assert_eq!(request_kind::<GetAllTasks>(), RequestKind::Query);
//! assert_eq!(request_kind::<ArchiveTasks>(), RequestKind::Command);
//! ```

use std::fmt;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Read {}
    impl Sealed for super::Write {}
}

/// Runtime tag for a request flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// A read-only request returning a value
    Query,
    /// A request that may mutate state
    Command,
}

impl RequestKind {
    /// Lowercase name (`"query"` / `"command"`)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flavor marker for queries. Uninhabited; used only at the type level.
#[derive(Debug)]
pub enum Read {}

/// Flavor marker for commands. Uninhabited; used only at the type level.
#[derive(Debug)]
pub enum Write {}

/// Implemented by the two flavor markers only.
pub trait Flavor: sealed::Sealed + Send + Sync + 'static {
    /// The runtime tag of this flavor
    const KIND: RequestKind;
}

impl Flavor for Read {
    const KIND: RequestKind = RequestKind::Query;
}

impl Flavor for Write {
    const KIND: RequestKind = RequestKind::Command;
}

/// A value that can be dispatched through the mediator.
///
/// Usually derived with `#[derive(Query)]` or `#[derive(Command)]` from
/// `courier-macros`.
pub trait Request: fmt::Debug + Send + Sync + 'static {
    /// Value produced on success
    type Response: fmt::Debug + Send + 'static;

    /// [`Read`] for queries, [`Write`] for commands
    type Flavor: Flavor;
}

/// A read-only request. Implemented for every `Request<Flavor = Read>`.
pub trait Query: Request<Flavor = Read> {}

impl<T> Query for T where T: Request<Flavor = Read> {}

/// A state-changing request. Implemented for every `Request<Flavor = Write>`.
pub trait Command: Request<Flavor = Write> {}

impl<T> Command for T where T: Request<Flavor = Write> {}

/// The kind of request `R`
#[must_use]
pub const fn request_kind<R: Request>() -> RequestKind {
    <R::Flavor as Flavor>::KIND
}

/// Fully qualified type name of `R`, used in diagnostics
#[must_use]
pub fn request_name<R: Request>() -> &'static str {
    std::any::type_name::<R>()
}

/// `name` without its module path or generic arguments
#[must_use]
pub fn short_type_name(name: &'static str) -> &'static str {
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Ping;

    impl Request for Ping {
        type Response = &'static str;
        type Flavor = Read;
    }

    #[derive(Debug)]
    struct Reset;

    impl Request for Reset {
        type Response = ();
        type Flavor = Write;
    }

    fn is_query<Q: Query>() -> bool {
        true
    }

    fn is_command<C: Command>() -> bool {
        true
    }

    #[test]
    fn flavor_decides_the_bucket() {
        assert!(is_query::<Ping>());
        assert!(is_command::<Reset>());
        assert_eq!(request_kind::<Ping>(), RequestKind::Query);
        assert_eq!(request_kind::<Reset>(), RequestKind::Command);
    }

    #[test]
    fn request_name_contains_the_type() {
        assert!(request_name::<Ping>().ends_with("Ping"));
        assert_eq!(RequestKind::Command.to_string(), "command");
    }

    #[test]
    fn short_names_drop_paths_and_generics() {
        assert_eq!(short_type_name(request_name::<Ping>()), "Ping");
        assert_eq!(short_type_name("a::b::Wrapper<c::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
