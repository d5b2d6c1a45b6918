//! Error taxonomy (`spec.md` §7).

use std::fmt;

use derive_more::Display;

use crate::ast::Location;
use crate::path::{GraphQlError, Path};
use crate::value::Value;

/// Kind 1/2 errors (`spec.md` §7): failures that prevent execution from
/// producing any `data` at all. Surfaced as a response with no `data` key.
#[derive(Debug, Clone, Display, PartialEq)]
pub enum RequestError {
    #[display("Must provide an operation.")]
    NoOperationProvided,
    #[display("Must provide operation name if query contains multiple operations.")]
    AmbiguousOperationName,
    #[display("Unknown operation named \"{_0}\".")]
    UnknownOperationName(String),
    #[display("Schema is not configured for subscriptions.")]
    NoSubscriptionType,
    #[display("Cannot execute a subscription operation with `execute`; use `subscribe` instead.")]
    SubscriptionViaExecute,
    #[display("Schema is not configured for mutations.")]
    NoMutationType,
    #[display(
        "Executing this GraphQL operation would unexpectedly produce multiple payloads \
         (due to @defer or @stream directive)"
    )]
    WouldProduceMultiplePayloads,
    #[display("GraphQL execution failed to complete synchronously.")]
    DidNotCompleteSynchronously,
    #[display("Subscription field must return Async Iterable. Received: {_0}")]
    SubscribeDidNotReturnAsyncIterable(String),
    #[display("{_0}")]
    VariableCoercion(String),
}

impl std::error::Error for RequestError {}

/// Error type for errors that occur while resolving a single field
/// (`spec.md` §7 kinds 3-6). Any [`std::fmt::Display`] type converts into
/// one via `?`, mirroring the teacher's `FieldError`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    message: String,
    extensions: Option<Value>,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), extensions: None }
    }

    pub fn with_extensions(mut self, extensions: Value) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn extensions(&self) -> Option<&Value> {
        self.extensions.as_ref()
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

// Mirrors the teacher's `impl<T: Display, S> From<T> for FieldError<S>`
// (itself the same pattern `anyhow::Error` uses): any displayable error type
// can be turned into a `FieldError` with `?`, without conflicting with the
// stdlib reflexive `impl<T> From<T> for T` because `FieldError` itself does
// not implement `Display` via this same blanket (it has its own inherent
// impl above).
pub trait IntoFieldError {
    fn into_field_error(self) -> FieldError;
}

impl<T: fmt::Display> IntoFieldError for T {
    fn into_field_error(self) -> FieldError {
        FieldError::new(self.to_string())
    }
}

pub type FieldResult<T> = Result<T, FieldError>;

/// A [`FieldError`] annotated with the location and path it occurred at
/// (`spec.md` §2 "Path & Error Model").
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionError {
    pub locations: Vec<Location>,
    pub path: std::sync::Arc<Path>,
    pub error: FieldError,
}

impl ExecutionError {
    pub fn new(error: FieldError, locations: Vec<Location>, path: std::sync::Arc<Path>) -> Self {
        Self { locations, path, error }
    }

    pub fn to_graphql_error(&self) -> GraphQlError {
        let mut out = GraphQlError::new(self.error.message().to_string())
            .with_locations(self.locations.clone())
            .with_path(self.path.as_ref());
        if let Some(ext) = self.error.extensions() {
            out = out.with_extensions(ext.clone());
        }
        out
    }
}
