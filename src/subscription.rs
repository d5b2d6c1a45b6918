//! Subscription Driver (`spec.md` §4.7).

use futures::stream::{Stream, StreamExt};

use crate::abort::AbortSignal;
use crate::ast::{OperationDefinition, Variables};
use crate::collect::collect_fields;
use crate::complete::{collect_root_arguments, complete_root_field};
use crate::error::{ExecutionError, RequestError};
use crate::execute::ExecuteResult;
use crate::executor::ExecutionContext;
use crate::incremental::IncrementalScheduler;
use crate::path::Path;
use crate::resolve::{ResolveInfo, SubscribeOutcome};
use crate::schema::meta::TypeDef;
use crate::schema::Schema;
use crate::value::Value;

fn one_shot(result: ExecuteResult) -> std::pin::Pin<Box<dyn Stream<Item = ExecuteResult> + Send>> {
    Box::pin(futures::stream::once(async move { result }))
}

/// Starts a subscription and returns the stream of per-event execution
/// results (`spec.md` §4.7). Setup failures (missing subscription type,
/// `subscribe()` not returning an async iterable) surface as a one-item
/// stream carrying the error, keeping the return shape uniform for callers.
pub async fn subscribe<'a, Ctx>(
    schema: &'a Schema<Ctx>,
    fragments: &'a indexmap::IndexMap<String, crate::ast::FragmentDefinition>,
    variables: &'a Variables,
    context: &'a Ctx,
    operation: &'a OperationDefinition,
    root_value: &'a Value,
    abort: AbortSignal,
) -> std::pin::Pin<Box<dyn Stream<Item = ExecuteResult> + Send + 'a>>
where
    Ctx: Sync + 'a,
{
    let Some(TypeDef::Object(subscription_def)) = schema.subscription() else {
        return one_shot(ExecuteResult::request_error(RequestError::NoSubscriptionType));
    };
    let subscription_type_name = subscription_def.name.clone();

    let collected = collect_fields(schema, fragments, variables, &subscription_type_name, &operation.selection_set);
    let Some((_, group)) = collected.fields.first() else {
        return one_shot(ExecuteResult::request_error(RequestError::NoOperationProvided));
    };
    let field_node = group.nodes[0];
    let Some(field_def) = subscription_def.fields.get(&field_node.name) else {
        return one_shot(ExecuteResult::request_error(RequestError::UnknownOperationName(field_node.name.clone())));
    };

    let args = match collect_root_arguments(field_def, field_node, variables, schema) {
        Ok(a) => a,
        Err(e) => {
            return one_shot(ExecuteResult { data: None, errors: vec![crate::path::GraphQlError::new(e.message().to_owned())] });
        }
    };

    let root_path = Path::root();
    let field_nodes_for_info = [field_node];
    let info = ResolveInfo {
        field_nodes: &field_nodes_for_info,
        parent_type: &subscription_type_name,
        return_type: &field_def.return_type,
        path: root_path.clone(),
        schema,
        fragments,
        variables,
        root_value,
        operation,
        abort: &abort,
    };

    let Some(subscribe_fn) = &field_def.subscribe else {
        return one_shot(ExecuteResult::request_error(RequestError::SubscribeDidNotReturnAsyncIterable(
            "no subscribe resolver configured".into(),
        )));
    };

    let source = match subscribe_fn.subscribe(root_value, &args, context, &info) {
        SubscribeOutcome::Stream(s) => s,
        SubscribeOutcome::Err(e) => {
            return one_shot(ExecuteResult {
                data: None,
                errors: vec![crate::path::GraphQlError::new(format!(
                    "Subscription field must return Async Iterable. Received: {e}"
                ))],
            });
        }
        SubscribeOutcome::Future(fut) => match abort.race(fut).await {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                return one_shot(ExecuteResult {
                    data: None,
                    errors: vec![crate::path::GraphQlError::new(format!(
                        "Subscription field must return Async Iterable. Received: {e}"
                    ))],
                });
            }
            Err(reason) => {
                return one_shot(ExecuteResult {
                    data: None,
                    errors: vec![crate::path::GraphQlError::new(format!("Execution aborted: {reason}"))],
                });
            }
        },
    };

    Box::pin(source.then(move |event| {
        let field_node = field_node;
        let field_def = field_def;
        let subscription_type_name = subscription_type_name.clone();
        async move {
            run_one_event(schema, fragments, variables, context, operation, &subscription_type_name, field_def, field_node, event).await
        }
    }))
}

#[allow(clippy::too_many_arguments)]
async fn run_one_event<'a, Ctx>(
    schema: &'a Schema<Ctx>,
    fragments: &'a indexmap::IndexMap<String, crate::ast::FragmentDefinition>,
    variables: &'a Variables,
    context: &'a Ctx,
    operation: &'a OperationDefinition,
    subscription_type_name: &'a str,
    field_def: &'a crate::schema::meta::FieldDef<Ctx>,
    field_node: &'a crate::ast::Field,
    event: Value,
) -> ExecuteResult
where
    Ctx: Sync,
{
    let (scheduler, _receiver) = IncrementalScheduler::new();
    let exec_ctx = ExecutionContext {
        schema,
        fragments,
        variables,
        context,
        operation,
        root_value: &event,
        abort: AbortSignal::new(),
        scheduler,
        error_behavior: operation.error_behavior(),
    };
    let mut errors = Vec::new();
    let field_nodes: Vec<&crate::ast::Field> = vec![field_node];
    let result = complete_root_field(
        &exec_ctx,
        field_def,
        &field_nodes,
        subscription_type_name,
        &event,
        Path::root().push_field(field_node.response_name().to_owned()),
        &mut errors,
    )
    .await;

    let mut object = crate::value::Object::new();
    let data = match result {
        Ok(v) => {
            object.add_field(field_node.response_name().to_owned(), v);
            Some(Value::Object(object))
        }
        Err(()) => None,
    };
    let graphql_errors: Vec<crate::path::GraphQlError> = errors.iter().map(ExecutionError::to_graphql_error).collect();
    ExecuteResult { data, errors: graphql_errors }
}
