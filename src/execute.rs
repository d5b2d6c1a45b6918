//! Public Execute API (`spec.md` §4.8).
//!
//! Three entry points share one internal pipeline (`run`): operation
//! selection, variable coercion, then a single pass of the Value Completer
//! over the root selection set. `execute_sync`/`execute` differ only in how
//! they poll that pipeline's future; `execute_incrementally` is the only one
//! allowed to see `@defer`/`@stream` records survive past the initial
//! payload.

use std::pin::Pin;

use futures::future::FutureExt;
use futures::stream::Stream;

use crate::abort::AbortSignal;
use crate::ast::{Document, OperationDefinition, OperationKind};
use crate::coercion::coerce_variable_values;
use crate::complete::complete_object;
use crate::error::{ExecutionError, RequestError};
use crate::executor::ExecutionContext;
use crate::incremental::{IncrementalReceiver, IncrementalScheduler, PendingDescriptor, SubsequentPayload};
use crate::path::{GraphQlError, Path};
use crate::schema::Schema;
use crate::value::Value;

/// Per-call configuration accepted by every entry point (`spec.md` §6
/// "Execute input", extended with the `max_variable_errors` cap this core
/// adds per `spec.md` §4.1).
pub struct ExecuteInput<'a, Ctx> {
    pub schema: &'a Schema<Ctx>,
    pub document: &'a Document,
    pub root_value: &'a Value,
    pub context_value: &'a Ctx,
    pub variable_values: &'a serde_json::Value,
    pub operation_name: Option<&'a str>,
    pub abort_signal: AbortSignal,
    pub max_variable_errors: Option<usize>,
}

/// Non-incremental execute output (`spec.md` §6). `data` is `None` exactly
/// when a request or variable-coercion error prevented execution from
/// starting, or when a violation propagated all the way to the root.
#[derive(Debug, Clone, Default)]
pub struct ExecuteResult {
    pub data: Option<Value>,
    pub errors: Vec<GraphQlError>,
}

impl ExecuteResult {
    pub(crate) fn request_error(error: RequestError) -> Self {
        Self { data: None, errors: vec![GraphQlError::new(error.to_string())] }
    }

    fn coercion_errors(errors: Vec<crate::coercion::CoercionError>) -> Self {
        Self { data: None, errors: errors.into_iter().map(|e| GraphQlError::new(e.message)).collect() }
    }
}

/// Incremental execute output (`spec.md` §6 "Incremental output").
pub struct InitialPayload {
    pub data: Option<Value>,
    pub errors: Vec<GraphQlError>,
    pub pending: Vec<PendingDescriptor>,
    pub has_next: bool,
}

pub struct IncrementalExecuteResult {
    pub initial: InitialPayload,
    pub subsequent_results: Pin<Box<dyn Stream<Item = SubsequentPayload> + Send>>,
}

fn select_operation<'a>(document: &'a Document, operation_name: Option<&str>) -> Result<&'a OperationDefinition, RequestError> {
    match operation_name {
        Some(name) => document
            .operations
            .iter()
            .find(|op| op.name.as_deref() == Some(name))
            .ok_or_else(|| RequestError::UnknownOperationName(name.to_owned())),
        None => match document.operations.len() {
            0 => Err(RequestError::NoOperationProvided),
            1 => Ok(&document.operations[0]),
            _ => Err(RequestError::AmbiguousOperationName),
        },
    }
}

fn root_type_name<'a, Ctx>(schema: &'a Schema<Ctx>, operation: &OperationDefinition) -> Result<&'a str, RequestError> {
    match operation.kind {
        OperationKind::Query => Ok(&schema.query_type),
        OperationKind::Mutation => schema.mutation_type.as_deref().ok_or(RequestError::NoMutationType),
        OperationKind::Subscription => Err(RequestError::SubscriptionViaExecute),
    }
}

/// What one pass of the pipeline produced, before the three public entry
/// points each decide how to shape it for their own return type.
enum RunOutcome {
    Done(ExecuteResult),
    Incremental { initial: InitialPayload, receiver: IncrementalReceiver },
}

/// Drives operation selection, variable coercion and one completion pass
/// over the root selection set. Owns the coerced variables for the whole of
/// its body so nothing needs to outlive this call by reference.
async fn run<Ctx>(input: ExecuteInput<'_, Ctx>) -> RunOutcome
where
    Ctx: Sync,
{
    let operation = match select_operation(input.document, input.operation_name) {
        Ok(op) => op,
        Err(e) => return RunOutcome::Done(ExecuteResult::request_error(e)),
    };
    let root_type = match root_type_name(input.schema, operation) {
        Ok(t) => t,
        Err(e) => return RunOutcome::Done(ExecuteResult::request_error(e)),
    };
    let variables = match coerce_variable_values(
        input.schema,
        &operation.variable_definitions,
        input.variable_values,
        input.max_variable_errors,
    ) {
        Ok(v) => v,
        Err(errors) => return RunOutcome::Done(ExecuteResult::coercion_errors(errors)),
    };

    let (scheduler, receiver) = IncrementalScheduler::new();
    let ctx = ExecutionContext {
        schema: input.schema,
        fragments: &input.document.fragments,
        variables: &variables,
        context: input.context_value,
        operation,
        root_value: input.root_value,
        abort: input.abort_signal.clone(),
        scheduler,
        error_behavior: operation.error_behavior(),
    };

    let mut errors = Vec::new();
    let result = complete_object(&ctx, root_type, &operation.selection_set, ctx.root_value, Path::root(), None, &mut errors).await;

    let graphql_errors: Vec<GraphQlError> = errors.iter().map(ExecutionError::to_graphql_error).collect();
    let data = result.ok();

    if ctx.scheduler.had_incremental_work() {
        // Snapshot `pending` before any record is allowed to drain, so it
        // lists every record that was still unemitted when the initial
        // payload was built, not whatever happens to be left afterwards.
        let pending = ctx.scheduler.pending_descriptors();
        ctx.scheduler.mark_root_ready();
        ctx.scheduler.finish_if_idle();
        RunOutcome::Incremental {
            initial: InitialPayload { data, errors: graphql_errors, pending, has_next: true },
            receiver,
        }
    } else {
        ctx.scheduler.finish_if_idle();
        RunOutcome::Done(ExecuteResult { data, errors: graphql_errors })
    }
}

/// Runs the pipeline; raises [`RequestError::DidNotCompleteSynchronously`]
/// if completing it required awaiting any future (`spec.md` §4.8, §8 "Sync
/// purity").
pub fn execute_sync<Ctx>(input: ExecuteInput<'_, Ctx>) -> ExecuteResult
where
    Ctx: Sync,
{
    match run(input).now_or_never() {
        Some(RunOutcome::Done(result)) => result,
        Some(RunOutcome::Incremental { .. }) => ExecuteResult::request_error(RequestError::WouldProduceMultiplePayloads),
        None => ExecuteResult::request_error(RequestError::DidNotCompleteSynchronously),
    }
}

/// Runs the pipeline, awaiting suspension points as needed. Rejects
/// operations that used `@defer`/`@stream` at all, since this entry point
/// promises exactly one result (`spec.md` §4.8).
pub async fn execute<Ctx>(input: ExecuteInput<'_, Ctx>) -> ExecuteResult
where
    Ctx: Sync,
{
    match run(input).await {
        RunOutcome::Done(result) => result,
        RunOutcome::Incremental { .. } => ExecuteResult::request_error(RequestError::WouldProduceMultiplePayloads),
    }
}

/// Runs the pipeline; if the operation used `@defer`/`@stream`, returns an
/// initial payload plus the stream of subsequent payloads instead of a
/// single result (`spec.md` §4.8, §4.6).
pub async fn execute_incrementally<Ctx>(input: ExecuteInput<'_, Ctx>) -> IncrementalExecuteResult
where
    Ctx: Sync,
{
    match run(input).await {
        RunOutcome::Done(result) => IncrementalExecuteResult {
            initial: InitialPayload { data: result.data, errors: result.errors, pending: Vec::new(), has_next: false },
            subsequent_results: Box::pin(futures::stream::empty()),
        },
        RunOutcome::Incremental { initial, receiver } => IncrementalExecuteResult {
            initial,
            subsequent_results: Box::pin(receiver),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ErrorBehavior, OperationDefinition, OperationKind};

    fn empty_operation(kind: OperationKind) -> OperationDefinition {
        OperationDefinition {
            name: None,
            kind,
            variable_definitions: Vec::new(),
            directives: Vec::new(),
            selection_set: Vec::new(),
        }
    }

    #[test]
    fn no_operations_is_a_request_error() {
        let document = Document::default();
        let result = select_operation(&document, None);
        assert_eq!(result.unwrap_err(), RequestError::NoOperationProvided);
    }

    #[test]
    fn ambiguous_without_a_name() {
        let mut document = Document::default();
        document.operations.push(empty_operation(OperationKind::Query));
        document.operations.push(empty_operation(OperationKind::Query));
        let result = select_operation(&document, None);
        assert_eq!(result.unwrap_err(), RequestError::AmbiguousOperationName);
    }

    #[test]
    fn unknown_operation_name() {
        let mut document = Document::default();
        document.operations.push(empty_operation(OperationKind::Query));
        let result = select_operation(&document, Some("DoesNotExist"));
        assert_eq!(result.unwrap_err(), RequestError::UnknownOperationName("DoesNotExist".into()));
    }

    #[test]
    fn subscription_operation_rejected_by_root_type_name() {
        let schema: Schema<()> = Schema::new("Query");
        let op = empty_operation(OperationKind::Subscription);
        let result = root_type_name(&schema, &op);
        assert_eq!(result.unwrap_err(), RequestError::SubscriptionViaExecute);
    }

    #[test]
    fn mutation_without_mutation_type_is_rejected() {
        let schema: Schema<()> = Schema::new("Query");
        let op = empty_operation(OperationKind::Mutation);
        let result = root_type_name(&schema, &op);
        assert_eq!(result.unwrap_err(), RequestError::NoMutationType);
    }

    #[test]
    fn default_error_behavior_is_propagate() {
        let op = empty_operation(OperationKind::Query);
        assert_eq!(op.error_behavior(), ErrorBehavior::Propagate);
    }
}
