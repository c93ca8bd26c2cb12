//! Field-level request validation.
//!
//! A [`ValidationBehavior<R>`] runs every [`Validator<R>`] registered with it
//! and gathers all problems into a single `Validation` error with one detail
//! per problem. If any problem is found the chain stops there and the handler
//! never runs.
//!
//! # Example
//!
//! ```
//! use courier_core::outcome::ErrorDetail;
//! use courier_core::request::{Request, Write};
//! use courier_runtime::ValidationBehavior;
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
//! let validation = ValidationBehavior::<RenameTask>::new()
//!     .with_code("RENAME_001", "Invalid fields upon rename")
//!     .with_validator(|cmd: &RenameTask| {
//!         if cmd.title.trim().is_empty() {
//!             vec![ErrorDetail::new("title", "Title is required.")]
//!         } else {
//!             vec![]
//!         }
//!     });
//! assert_eq!(validation.validator_count(), 1);
//! ```

use courier_core::outcome::{Error, ErrorDetail, Outcome};
use courier_core::pipeline::{Behavior, Next};
use courier_core::request::{Request, request_name, short_type_name};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// Default error code for a rejected request
pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";

/// Checks one request type and reports every problem found.
pub trait Validator<R>: Send + Sync + 'static {
    /// Problems with `request`; empty when valid
    fn validate(&self, request: &R) -> Vec<ErrorDetail>;
}

impl<R, F> Validator<R> for F
where
    F: Fn(&R) -> Vec<ErrorDetail> + Send + Sync + 'static,
{
    fn validate(&self, request: &R) -> Vec<ErrorDetail> {
        self(request)
    }
}

/// Rejects requests of type `R` that fail any registered validator.
pub struct ValidationBehavior<R: Request> {
    code: String,
    description: Option<String>,
    validators: Vec<Box<dyn Validator<R>>>,
}

impl<R: Request> ValidationBehavior<R> {
    /// Create a behavior with no validators
    #[must_use]
    pub fn new() -> Self {
        Self {
            code: VALIDATION_FAILED.to_string(),
            description: None,
            validators: Vec::new(),
        }
    }

    /// Override the error code and description reported on rejection
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>, description: impl Into<String>) -> Self {
        self.code = code.into();
        self.description = Some(description.into());
        self
    }

    /// Add a validator
    #[must_use]
    pub fn with_validator(mut self, validator: impl Validator<R>) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Number of registered validators
    #[must_use]
    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Run every validator; `Some` with the combined error if any complained
    #[must_use]
    pub fn check(&self, request: &R) -> Option<Error> {
        let details: Vec<ErrorDetail> = self
            .validators
            .iter()
            .flat_map(|validator| validator.validate(request))
            .collect();

        if details.is_empty() {
            return None;
        }

        let description = self.description.clone().unwrap_or_else(|| {
            format!("{} failed validation", short_type_name(request_name::<R>()))
        });
        let mut error = Error::validation(self.code.clone(), description);
        error.extend_details(details);
        Some(error)
    }
}

impl<R: Request> Default for ValidationBehavior<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Request> Behavior<R> for ValidationBehavior<R> {
    fn handle<'a>(
        &'a self,
        request: &'a R,
        _cancel: &'a CancellationToken,
        next: Next<'a, R>,
    ) -> BoxFuture<'a, Outcome<R::Response>> {
        match self.check(request) {
            Some(error) => {
                tracing::debug!(
                    request = short_type_name(request_name::<R>()),
                    problems = error.details().len(),
                    "Request rejected by validation"
                );
                Box::pin(async move { error.into() })
            }
            None => next.run(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use courier_core::outcome::ErrorKind;
    use courier_core::request::Write;

    #[derive(Debug)]
    struct Signup {
        name: String,
        age: u8,
    }

    impl Request for Signup {
        type Response = ();
        type Flavor = Write;
    }

    fn behavior() -> ValidationBehavior<Signup> {
        ValidationBehavior::new()
            .with_validator(|s: &Signup| {
                if s.name.is_empty() {
                    vec![ErrorDetail::new("name", "Name is required.")]
                } else {
                    vec![]
                }
            })
            .with_validator(|s: &Signup| {
                if s.age < 18 {
                    vec![ErrorDetail::new("age", "Must be an adult.")]
                } else {
                    vec![]
                }
            })
    }

    #[test]
    fn all_problems_land_in_one_error() {
        let error = behavior()
            .check(&Signup {
                name: String::new(),
                age: 3,
            })
            .unwrap();

        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.code(), VALIDATION_FAILED);
        assert!(error.description().contains("Signup"));
        assert_eq!(error.details().len(), 2);
        assert_eq!(error.detail_for("age").unwrap().message, "Must be an adult.");
    }

    #[test]
    fn valid_requests_pass() {
        let ok = Signup {
            name: "Ada".into(),
            age: 36,
        };
        assert!(behavior().check(&ok).is_none());
        assert!(ValidationBehavior::<Signup>::default().check(&ok).is_none());
    }

    #[test]
    fn custom_code_and_description() {
        let error = behavior()
            .with_code("SIGNUP_001", "Invalid signup")
            .check(&Signup {
                name: String::new(),
                age: 40,
            })
            .unwrap();
        assert_eq!(error.code(), "SIGNUP_001");
        assert_eq!(error.description(), "Invalid signup");
    }
}
