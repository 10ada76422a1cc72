//! Error Types
//!
//! Every fallible operation in the crate returns [`Result`]. The error enum
//! covers three families:
//!
//! - Contract failures that Rust lets us report instead of trapping on
//!   (`NoValue`, `NotReady`).
//! - Validation failures produced while parsing user input or formatting
//!   text. These are meant to be caught close to where they happen, usually
//!   by [`try_catch`](crate::flow::try_catch).
//! - Traversal control (`TraversalAborted`), which never escapes a dispatch.
//!
//! Errors are `Clone` because content caching and try/catch blocks store the
//! last error produced at a call site and replay it on later passes.

use std::sync::Arc;

use thiserror::Error;

/// A malformed value supplied by the user (typically through a text field).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The crate-wide error type.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A signal was read while it had no value.
    #[error("signal has no value")]
    NoValue,

    /// An action was performed (or a signal written) while not ready.
    #[error("not ready")]
    NotReady,

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("format error: {0}")]
    PrintfFormat(String),

    /// Raised by `abort_traversal`; caught at the dispatch boundary.
    #[error("traversal aborted")]
    TraversalAborted,

    #[error("asynchronous operation failed: {0}")]
    AsyncFailure(String),

    #[error("invalid configuration: {0}")]
    Config(Arc<serde_json::Error>),

    /// Any other error raised by application code.
    #[error("{0}")]
    Application(Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an application error.
    pub fn application<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Application(Arc::new(error))
    }

    /// Shorthand for a [`ValidationError`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(ValidationError::new(message))
    }

    /// Whether this error is traversal control rather than a real failure.
    pub fn is_traversal_control(&self) -> bool {
        matches!(self, Error::TraversalAborted)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
