//! Execution context (`spec.md` §3 "Execution context").
//!
//! Bundles everything a field's resolution needs that doesn't change across
//! the whole operation: the schema, the document's fragments, the coerced
//! variables, the user context, the abort signal and the incremental
//! scheduler. Threaded by shared reference through the Field Executor and
//! Value Completer the way the teacher threads `&Executor<'_, CtxT, S>`.

use indexmap::IndexMap;

use crate::abort::AbortSignal;
use crate::ast::{ErrorBehavior, FragmentDefinition, OperationDefinition, Variables};
use crate::incremental::IncrementalScheduler;
use crate::schema::{Schema, TypeRef};
use crate::value::Value;

/// `Err(())` means "this position must become null and that nullness
/// propagates to whichever enclosing field/list-item slot decides whether to
/// absorb it", mirroring the exception-propagation shape of the algorithm
/// this is grounded on (`spec.md` §4.5). There is no payload on the error
/// variant because the error itself was already pushed to the relevant sink
/// at the point it was raised.
pub type CompleteResult = Result<Value, ()>;

pub struct ExecutionContext<'a, Ctx> {
    pub schema: &'a Schema<Ctx>,
    pub fragments: &'a IndexMap<String, FragmentDefinition>,
    pub variables: &'a Variables,
    pub context: &'a Ctx,
    pub operation: &'a OperationDefinition,
    pub root_value: &'a Value,
    pub abort: AbortSignal,
    pub scheduler: IncrementalScheduler,
    pub error_behavior: ErrorBehavior,
}

impl<'a, Ctx> ExecutionContext<'a, Ctx> {
    /// Whatever a violation at `type_ref`'s own top layer would normally do
    /// (propagate to the parent) is instead absorbed into a standing `null`
    /// when the operation requested `@onError(action: NULL)` (`spec.md`
    /// §4.5 "Error propagation switch").
    pub fn propagate(&self, type_ref: &TypeRef) -> CompleteResult {
        if type_ref.is_non_null() && self.error_behavior == ErrorBehavior::Propagate {
            Err(())
        } else {
            Ok(Value::Null)
        }
    }
}
