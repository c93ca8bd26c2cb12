//! Fatal dispatch errors.
//!
//! These are configuration or programming mistakes, not business outcomes, so
//! they never travel inside an [`Outcome`](crate::outcome::Outcome).

use thiserror::Error;

/// Errors that abort a dispatch before any behavior or handler runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No handler was registered for the request type
    #[error("no handler registered for request type `{request_type}`")]
    HandlerNotFound {
        /// Fully qualified name of the request type
        request_type: &'static str,
    },
}

impl DispatchError {
    /// Name of the request type that failed to dispatch
    #[must_use]
    pub const fn request_type(&self) -> &'static str {
        match self {
            Self::HandlerNotFound { request_type } => request_type,
        }
    }
}
