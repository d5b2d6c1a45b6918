//! Execution core for a GraphQL runtime.
//!
//! Given an already-built [`schema::Schema`] and an already-parsed,
//! already-validated [`ast::Document`], this crate performs variable and
//! argument coercion, selection collection (`@skip`/`@include`/`@defer`/
//! `@stream`), field resolution, value completion across every output type
//! shape, the incremental-delivery scheduler, and the subscription driver.
//! Parsing, validation, schema construction and transport are all out of
//! scope: callers own those and hand this crate their result.
//!
//! The entry points are [`execute::execute_sync`], [`execute::execute`],
//! [`execute::execute_incrementally`], and [`subscription::subscribe`].

pub mod abort;
pub mod arguments;
pub mod ast;
pub mod coercion;
pub mod collect;
pub mod complete;
pub mod error;
pub mod execute;
pub mod executor;
pub mod incremental;
mod macros;
pub mod path;
pub mod resolve;
pub mod schema;
pub mod subscription;
pub mod value;

#[cfg(test)]
mod testing;

pub use abort::{AbortReason, AbortSignal};
pub use error::{ExecutionError, FieldError, FieldResult, RequestError};
pub use execute::{execute, execute_incrementally, execute_sync, ExecuteInput, ExecuteResult, IncrementalExecuteResult, InitialPayload};
pub use path::GraphQlError;
pub use schema::{Schema, TypeRef};
pub use subscription::subscribe;
pub use value::{Object, Scalar, Value};
