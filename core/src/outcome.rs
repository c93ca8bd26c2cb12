//! Outcome values reported by handlers and behaviors.
//!
//! Every dispatch produces an [`Outcome`]: either a success carrying the
//! response value, or a [`Failure`] carrying one or more structured [`Error`]s.
//! Expected failure modes (validation, not-found, conflict, ...) always travel
//! through this channel. Only wiring mistakes use the fatal
//! [`DispatchError`](crate::error::DispatchError) channel.
//!
//! # Example
//!
//! ```
//! use courier_core::outcome::{Error, ErrorKind, Outcome};
//!
//! let ok: Outcome<u32> = Outcome::success(7);
//! assert!(ok.errors().is_empty());
//!
//! let rejected: Outcome<u32> = Outcome::failure("TASK_404", "Task not found", ErrorKind::NotFound);
//! assert_eq!(rejected.errors().len(), 1);
//! assert_eq!(rejected.errors()[0].kind(), ErrorKind::NotFound);
//!
//! let invalid: Outcome = Error::validation("CREATE_001", "Invalid fields upon creation")
//!     .with_detail("title", "Title is required.")
//!     .into();
//! assert!(invalid.is_failure());
//! ```

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;

/// Category of an [`Error`].
///
/// Adapters use the kind to pick a transport-level signal (an HTTP status,
/// an exit code, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The request was malformed or violated an input rule
    Validation,
    /// A referenced resource does not exist
    NotFound,
    /// The request conflicts with the current state
    Conflict,
    /// The caller is not authenticated
    Unauthorized,
    /// The caller is authenticated but not allowed
    Forbidden,
    /// An unexpected failure, typically a panic converted by a behavior
    Internal,
    /// Unclassified failure
    #[default]
    Unknown,
}

impl ErrorKind {
    /// Stable name of the kind, as used in serialized errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "Validation",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::Internal => "Internal",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field-level problem attached to an [`Error`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Name of the offending field (e.g. `title`)
    pub field: String,
    /// Human-readable explanation
    pub message: String,
}

impl ErrorDetail {
    /// Create a new detail
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A structured business error.
///
/// `code`, `description` and `kind` are fixed at construction. Details may be
/// accumulated while the error is being built, via [`Error::with_detail`] or
/// [`Error::add_detail`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{code}] {description}")]
pub struct Error {
    code: String,
    description: String,
    #[serde(rename = "type")]
    kind: ErrorKind,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

impl Error {
    /// Create an error with no details
    #[must_use]
    pub fn new(code: impl Into<String>, description: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            kind,
            details: Vec::new(),
        }
    }

    /// Create a [`ErrorKind::Validation`] error
    #[must_use]
    pub fn validation(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(code, description, ErrorKind::Validation)
    }

    /// Create a [`ErrorKind::NotFound`] error
    #[must_use]
    pub fn not_found(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(code, description, ErrorKind::NotFound)
    }

    /// Create a [`ErrorKind::Conflict`] error
    #[must_use]
    pub fn conflict(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(code, description, ErrorKind::Conflict)
    }

    /// Create a [`ErrorKind::Unauthorized`] error
    #[must_use]
    pub fn unauthorized(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(code, description, ErrorKind::Unauthorized)
    }

    /// Create a [`ErrorKind::Forbidden`] error
    #[must_use]
    pub fn forbidden(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(code, description, ErrorKind::Forbidden)
    }

    /// Create a [`ErrorKind::Internal`] error
    #[must_use]
    pub fn internal(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(code, description, ErrorKind::Internal)
    }

    /// Placeholder used when a failure is built from an empty error list
    fn unspecified() -> Self {
        Self::new(
            "UNKNOWN_FAILURE",
            "Failure reported without any error",
            ErrorKind::Unknown,
        )
    }

    /// Append a detail, builder style
    #[must_use]
    pub fn with_detail(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.add_detail(field, message);
        self
    }

    /// Append a detail in place
    pub fn add_detail(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.details.push(ErrorDetail::new(field, message));
    }

    /// Append several details at once
    pub fn extend_details(&mut self, details: impl IntoIterator<Item = ErrorDetail>) {
        self.details.extend(details);
    }

    /// Machine-readable code
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Category of the error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Field-level details, in insertion order
    #[must_use]
    pub fn details(&self) -> &[ErrorDetail] {
        &self.details
    }

    /// Returns the first detail recorded for `field`
    #[must_use]
    pub fn detail_for(&self, field: &str) -> Option<&ErrorDetail> {
        self.details.iter().find(|detail| detail.field == field)
    }
}

/// The failing side of an [`Outcome`]: a non-empty, ordered list of errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    // Never empty: every constructor inserts at least one error.
    errors: SmallVec<[Error; 1]>,
}

impl Failure {
    /// Failure carrying a single error
    #[must_use]
    pub fn new(error: Error) -> Self {
        let mut errors = SmallVec::new();
        errors.push(error);
        Self { errors }
    }

    /// Failure carrying every error of `errors`.
    ///
    /// An empty input still produces a failure with one `UNKNOWN_FAILURE`
    /// error of kind [`ErrorKind::Unknown`].
    #[must_use]
    pub fn from_errors(errors: impl IntoIterator<Item = Error>) -> Self {
        let mut errors: SmallVec<[Error; 1]> = errors.into_iter().collect();
        if errors.is_empty() {
            errors.push(Error::unspecified());
        }
        Self { errors }
    }

    /// All errors, in order
    #[must_use]
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// The first error
    #[must_use]
    pub fn primary(&self) -> &Error {
        &self.errors[0]
    }

    /// Number of errors (always at least one)
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always `false`; present for API symmetry with collections
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` if any error has the given kind
    #[must_use]
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|error| error.kind == kind)
    }

    /// Append an error
    pub fn push(&mut self, error: Error) {
        self.errors.push(error);
    }

    /// Append every error of `other`, keeping order
    pub fn merge(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    /// Consume into a plain vector
    #[must_use]
    pub fn into_errors(self) -> Vec<Error> {
        self.errors.into_vec()
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {}

impl Serialize for Failure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Failure", 1)?;
        state.serialize_field("errors", self.errors())?;
        state.end()
    }
}

/// Success-or-failure envelope returned by every dispatch.
///
/// `Outcome<()>` (the default) is the valueless form used by commands that
/// return nothing.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    /// The request succeeded with a value
    Success(T),
    /// The request failed with at least one error
    Failure(Failure),
}

impl<T> Outcome<T> {
    /// Successful outcome carrying `value`
    pub const fn success(value: T) -> Self {
        Self::Success(value)
    }

    /// Failed outcome with a single error
    pub fn failure(code: impl Into<String>, description: impl Into<String>, kind: ErrorKind) -> Self {
        Self::Failure(Failure::new(Error::new(code, description, kind)))
    }

    /// Failed outcome carrying every error of `errors`
    ///
    /// See [`Failure::from_errors`] for the empty-input case.
    pub fn failures(errors: impl IntoIterator<Item = Error>) -> Self {
        Self::Failure(Failure::from_errors(errors))
    }

    /// Returns `true` on success
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` on failure
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The success value, if any
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// Consume into the success value, if any
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// Errors of the outcome; empty on success
    #[must_use]
    pub fn errors(&self) -> &[Error] {
        match self {
            Self::Success(_) => &[],
            Self::Failure(failure) => failure.errors(),
        }
    }

    /// The failure, if any
    #[must_use]
    pub const fn failure_ref(&self) -> Option<&Failure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    /// Map the success value
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Failure(failure) => Outcome::Failure(failure),
        }
    }

    /// Chain another fallible step on success
    pub fn and_then<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> Outcome<U>,
    {
        match self {
            Self::Success(value) => f(value),
            Self::Failure(failure) => Outcome::Failure(failure),
        }
    }

    /// Transform the failure, leaving a success untouched
    pub fn map_failure<F>(self, f: F) -> Self
    where
        F: FnOnce(Failure) -> Failure,
    {
        match self {
            Self::Success(value) => Self::Success(value),
            Self::Failure(failure) => Self::Failure(f(failure)),
        }
    }

    /// Convert into a standard `Result`
    ///
    /// # Errors
    ///
    /// Returns the [`Failure`] if the outcome is not a success.
    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(failure) => Err(failure),
        }
    }
}

impl Outcome<()> {
    /// Valueless success
    pub const fn completed() -> Self {
        Self::Success(())
    }
}

impl<T> From<Error> for Outcome<T> {
    fn from(error: Error) -> Self {
        Self::Failure(Failure::new(error))
    }
}

impl<T> From<Failure> for Outcome<T> {
    fn from(failure: Failure) -> Self {
        Self::Failure(failure)
    }
}

impl<T> From<Result<T, Failure>> for Outcome<T> {
    fn from(result: Result<T, Failure>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(failure) => Self::Failure(failure),
        }
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success(value) => {
                let mut state = serializer.serialize_struct("Outcome", 3)?;
                state.serialize_field("isSuccess", &true)?;
                state.serialize_field("value", value)?;
                state.serialize_field("errors", &[] as &[Error])?;
                state.end()
            }
            Self::Failure(failure) => {
                let mut state = serializer.serialize_struct("Outcome", 2)?;
                state.serialize_field("isSuccess", &false)?;
                state.serialize_field("errors", failure.errors())?;
                state.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use proptest::prelude::*;

    fn kind_strategy() -> impl Strategy<Value = ErrorKind> {
        prop_oneof![
            Just(ErrorKind::Validation),
            Just(ErrorKind::NotFound),
            Just(ErrorKind::Conflict),
            Just(ErrorKind::Unauthorized),
            Just(ErrorKind::Forbidden),
            Just(ErrorKind::Internal),
            Just(ErrorKind::Unknown),
        ]
    }

    fn error_strategy() -> impl Strategy<Value = Error> {
        ("[A-Z_]{1,12}", ".{0,40}", kind_strategy())
            .prop_map(|(code, description, kind)| Error::new(code, description, kind))
    }

    proptest! {
        #[test]
        fn success_never_carries_errors(value in any::<i64>()) {
            let outcome = Outcome::success(value);
            prop_assert!(outcome.is_success());
            prop_assert!(outcome.errors().is_empty());
            prop_assert_eq!(outcome.value(), Some(&value));
        }

        #[test]
        fn failure_always_carries_an_error(errors in proptest::collection::vec(error_strategy(), 0..6)) {
            let expected = errors.len().max(1);
            let outcome: Outcome<i64> = Outcome::failures(errors);
            prop_assert!(outcome.is_failure());
            prop_assert_eq!(outcome.errors().len(), expected);
            prop_assert!(outcome.value().is_none());
        }

        #[test]
        fn single_failure_keeps_its_fields(error in error_strategy()) {
            let outcome: Outcome = Outcome::failure(error.code(), error.description(), error.kind());
            prop_assert_eq!(outcome.errors(), std::slice::from_ref(&error));
        }
    }

    #[test]
    fn valueless_success_has_no_errors() {
        let outcome = Outcome::completed();
        assert!(outcome.is_success());
        assert!(!outcome.is_failure());
        assert!(outcome.errors().is_empty());
    }

    #[test]
    fn empty_error_list_becomes_unknown_failure() {
        let outcome: Outcome<String> = Outcome::failures(Vec::new());
        let errors = outcome.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "UNKNOWN_FAILURE");
        assert_eq!(errors[0].kind(), ErrorKind::Unknown);
    }

    #[test]
    fn failures_keep_order() {
        let outcome: Outcome<String> = Outcome::failures(vec![
            Error::validation("Error1", "Error 1"),
            Error::validation("Error2", "Error 2"),
        ]);
        let codes: Vec<_> = outcome.errors().iter().map(Error::code).collect();
        assert_eq!(codes, ["Error1", "Error2"]);
    }

    #[test]
    fn details_accumulate_during_construction() {
        let mut error = Error::validation("CREATE_001", "Invalid fields upon creation")
            .with_detail("title", "Title is required.");
        error.add_detail("dueDate", "Due date cannot be in the past.");

        assert_eq!(error.details().len(), 2);
        assert_eq!(
            error.detail_for("title").map(|d| d.message.as_str()),
            Some("Title is required.")
        );
        assert!(error.detail_for("description").is_none());
    }

    #[test]
    fn equality_is_by_value() {
        let a: Outcome<u8> = Outcome::failure("X", "x", ErrorKind::Conflict);
        let b: Outcome<u8> = Outcome::failure("X", "x", ErrorKind::Conflict);
        assert_eq!(a, b);
        assert_ne!(a, Outcome::success(1));
    }

    #[test]
    fn map_and_and_then_skip_failures() {
        let failed: Outcome<u32> = Error::not_found("N", "missing").into();
        let mapped = failed.clone().map(|v| v * 2);
        assert_eq!(mapped.errors(), failed.errors());

        let chained = Outcome::success(2_u32).and_then(|v| Outcome::success(v + 1));
        assert_eq!(chained, Outcome::success(3));
    }

    #[test]
    fn into_result_round_trips_through_question_mark() {
        fn double(outcome: Outcome<u32>) -> Result<u32, Failure> {
            Ok(outcome.into_result()? * 2)
        }

        assert_eq!(double(Outcome::success(4)).unwrap(), 8);
        let failure = double(Outcome::failure("C", "conflict", ErrorKind::Conflict)).unwrap_err();
        assert!(failure.has_kind(ErrorKind::Conflict));
        assert_eq!(failure.to_string(), "[C] conflict");
    }

    #[test]
    fn failure_merge_appends() {
        let mut failure = Failure::new(Error::conflict("A", "a"));
        failure.merge(Failure::new(Error::forbidden("B", "b")));
        failure.push(Error::internal("C", "c"));
        assert_eq!(failure.len(), 3);
        assert_eq!(failure.primary().code(), "A");
        assert_eq!(failure.to_string(), "[A] a; [B] b; [C] c");
    }

    #[test]
    fn serializes_with_type_field() {
        let error = Error::validation("CREATE_001", "Invalid").with_detail("title", "Title is required.");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["type"], "Validation");
        assert_eq!(json["details"][0]["field"], "title");

        let back: Error = serde_json::from_value(json).unwrap();
        assert_eq!(back, error);
    }

    #[test]
    fn outcome_serializes_success_and_failure() {
        let ok = serde_json::to_value(Outcome::success(vec![1, 2])).unwrap();
        assert_eq!(ok["isSuccess"], true);
        assert_eq!(ok["value"], serde_json::json!([1, 2]));
        assert_eq!(ok["errors"], serde_json::json!([]));

        let failed: Outcome<Vec<u8>> = Outcome::failure("N", "missing", ErrorKind::NotFound);
        let json = serde_json::to_value(failed).unwrap();
        assert_eq!(json["isSuccess"], false);
        assert!(json.get("value").is_none());
        assert_eq!(json["errors"][0]["type"], "NotFound");
    }
}
