//! Value Completer and Field Executor (`spec.md` §4.4, §4.5).
//!
//! The two are implemented together because the absorb-or-propagate decision
//! described in §4.5 only ever happens at a field slot or a list-item slot —
//! nowhere else — so `complete_field` and `complete_list_item` are the only
//! two functions in this module allowed to turn a `Err(())` back into a
//! standing `Ok(Value::Null)`. Every other function here is transparent to
//! propagation: it calls downward with `?`/`match` and passes whatever it
//! gets straight back up.

use std::sync::Arc;

use futures::stream::StreamExt;

use crate::arguments::collect_arguments;
use crate::ast::{Field, Selection};
use crate::collect::{collect_fields, StreamConfig};
use crate::error::{ExecutionError, FieldError};
use crate::executor::{CompleteResult, ExecutionContext};
use crate::incremental::RecordKind;
use crate::path::Path;
use crate::resolve::{
    Arguments, FieldOutcome, IsTypeOfOutcome, ResolveInfo, TypeNameOutcome,
};
use crate::schema::meta::{FieldDef, ObjectDef, TypeDef};
use crate::schema::TypeRef;
use crate::value::{Object, Value};

fn field_label(parent_type: &str, field_name: &str) -> String {
    format!("{parent_type}.{field_name}")
}

fn push_error(errors: &mut Vec<ExecutionError>, field_nodes: &[&Field], path: &Arc<Path>, error: FieldError) {
    let locations = field_nodes.iter().map(|f| f.location).collect();
    errors.push(ExecutionError::new(error, locations, path.clone()));
}

/// Runs the sub-selection of an object value against `object_type_name`,
/// producing its completed fields and registering any `@defer`d fragments
/// discovered along the way (`spec.md` §4.2, §4.5 "Object").
///
/// `errors` collects every field error raised while completing this object's
/// own (non-deferred) selections; each deferred fragment gets its own fresh
/// sink so that its errors scope to its own incremental payload rather than
/// the enclosing one (`spec.md` §7 kind 7).
pub fn complete_object<'a, Ctx>(
    ctx: &'a ExecutionContext<'a, Ctx>,
    object_type_name: &'a str,
    selection_set: &'a [Selection],
    source: &'a Value,
    path: Arc<Path>,
    parent_record: Option<crate::incremental::RecordId>,
    errors: &'a mut Vec<ExecutionError>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = CompleteResult> + Send + 'a>>
where
    Ctx: Sync,
{
    Box::pin(async move {
        let object_def: &ObjectDef<Ctx> = match ctx.schema.type_by_name(object_type_name) {
            Some(TypeDef::Object(o)) => o,
            _ => {
                errors.push(ExecutionError::new(
                    FieldError::new(format!("Unknown object type \"{object_type_name}\".")),
                    Vec::new(),
                    path.clone(),
                ));
                return Err(());
            }
        };

        let collected = collect_fields(ctx.schema, ctx.fragments, ctx.variables, object_type_name, selection_set);
        let mut obj = Object::with_capacity(collected.fields.len());
        let mut propagated = false;

        for (response_name, group) in &collected.fields {
            if group.nodes[0].name == "__typename" {
                obj.add_field(response_name.clone(), Value::string(object_type_name));
                continue;
            }
            let Some(field_def) = object_def.fields.get(&group.nodes[0].name) else {
                continue; // unknown field; validation (external) would have rejected the document
            };
            let field_path = path.push_field(response_name.clone());
            let result = complete_field(
                ctx,
                field_def,
                &group.nodes,
                object_type_name,
                source,
                field_path,
                group.stream.as_ref(),
                errors,
            )
            .await;
            match result {
                Ok(v) => {
                    obj.add_field(response_name.clone(), v);
                }
                Err(()) => propagated = true,
            }
        }

        for defer in collected.defers {
            let record_id = ctx.scheduler.register(parent_record, path.clone(), defer.label.clone(), RecordKind::DeferFragment);
            let mut defer_errors = Vec::new();
            let result = complete_object(
                ctx,
                &defer.object_type,
                defer.selection_set,
                source,
                path.clone(),
                Some(record_id),
                &mut defer_errors,
            )
            .await;
            let graphql_errors = defer_errors.iter().map(ExecutionError::to_graphql_error).collect();
            match result {
                Ok(v) => ctx.scheduler.complete(record_id, v, graphql_errors),
                Err(()) => ctx.scheduler.fail(record_id, graphql_errors),
            }
        }

        if propagated {
            Err(())
        } else {
            Ok(Value::Object(obj))
        }
    })
}

/// Resolves one field group to its completed value, deciding at the end
/// whether a deeper violation propagates past this field or is absorbed here
/// (`spec.md` §4.4, §4.5).
#[allow(clippy::too_many_arguments)]
async fn complete_field<'a, Ctx>(
    ctx: &'a ExecutionContext<'a, Ctx>,
    field_def: &'a FieldDef<Ctx>,
    field_nodes: &'a [&'a Field],
    parent_type_name: &'a str,
    source: &'a Value,
    path: Arc<Path>,
    stream: Option<&'a StreamConfig>,
    errors: &mut Vec<ExecutionError>,
) -> CompleteResult
where
    Ctx: Sync,
{
    let args = match collect_arguments(field_def, field_nodes[0], ctx.variables, ctx.schema) {
        Ok(a) => a,
        Err(e) => {
            push_error(errors, field_nodes, &path, e);
            return ctx.propagate(&field_def.return_type);
        }
    };

    let info = ResolveInfo {
        field_nodes,
        parent_type: parent_type_name,
        return_type: &field_def.return_type,
        path: path.clone(),
        schema: ctx.schema,
        fragments: ctx.fragments,
        variables: ctx.variables,
        root_value: ctx.root_value,
        operation: ctx.operation,
        abort: &ctx.abort,
    };

    let outcome = match &field_def.resolve {
        Some(resolver) => resolver.resolve(source, &args, ctx.context, &info),
        None => FieldOutcome::Value(default_resolve(source, &field_nodes[0].name)),
    };

    let resolved = match resolve_outcome(outcome, &ctx.abort).await {
        Ok(v) => v,
        Err(e) => {
            push_error(errors, field_nodes, &path, e);
            return ctx.propagate(&field_def.return_type);
        }
    };

    let label = field_label(parent_type_name, &field_nodes[0].name);
    match complete_value(ctx, &field_def.return_type, resolved, &label, path, field_nodes, stream, errors).await {
        Ok(v) => Ok(v),
        Err(()) => ctx.propagate(&field_def.return_type),
    }
}

fn default_resolve(source: &Value, name: &str) -> Value {
    source.as_object().and_then(|o| o.get_field(name)).cloned().unwrap_or(Value::Null)
}

async fn resolve_outcome(outcome: FieldOutcome, abort: &crate::abort::AbortSignal) -> Result<Value, FieldError> {
    match outcome {
        FieldOutcome::Value(v) => Ok(v),
        FieldOutcome::Err(e) => Err(e),
        FieldOutcome::Future(fut) => match abort.race(fut).await {
            Ok(result) => result,
            Err(reason) => Err(FieldError::new(format!("Execution aborted: {reason}"))),
        },
        FieldOutcome::Iter(items) => Ok(Value::List(items)),
        FieldOutcome::AsyncIter(mut stream) => {
            let mut items = Vec::new();
            loop {
                match abort.race(stream.next()).await {
                    Ok(Some(Ok(v))) => items.push(v),
                    Ok(Some(Err(e))) => return Err(e),
                    Ok(None) => break,
                    Err(reason) => return Err(FieldError::new(format!("Execution aborted: {reason}"))),
                }
            }
            Ok(Value::List(items))
        }
    }
}

/// Recursive completion by type shape (`spec.md` §4.5). Never itself decides
/// to absorb a propagating violation — only `complete_field` and
/// `complete_list_item` do that.
#[allow(clippy::too_many_arguments)]
fn complete_value<'a, Ctx>(
    ctx: &'a ExecutionContext<'a, Ctx>,
    type_ref: &'a TypeRef,
    resolved: Value,
    label: &'a str,
    path: Arc<Path>,
    field_nodes: &'a [&'a Field],
    stream: Option<&'a StreamConfig>,
    errors: &'a mut Vec<ExecutionError>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = CompleteResult> + Send + 'a>>
where
    Ctx: Sync,
{
    Box::pin(async move {
        match type_ref {
            TypeRef::NonNull(inner) => {
                let v = complete_value(ctx, inner, resolved, label, path.clone(), field_nodes, stream, errors).await?;
                if v.is_null() {
                    push_error(errors, field_nodes, &path, FieldError::new(format!("Cannot return null for non-nullable field {label}.")));
                    Err(())
                } else {
                    Ok(v)
                }
            }
            TypeRef::SemanticNonNull(inner) => {
                match complete_value(ctx, inner, resolved, label, path.clone(), field_nodes, stream, errors).await {
                    Err(()) => Ok(Value::Null),
                    Ok(Value::Null) => {
                        push_error(
                            errors,
                            field_nodes,
                            &path,
                            FieldError::new(format!("Cannot return null for semantic-non-nullable field {label}.")),
                        );
                        Ok(Value::Null)
                    }
                    Ok(v) => Ok(v),
                }
            }
            TypeRef::List(item_type) => complete_list(ctx, item_type, resolved, label, path, field_nodes, stream, errors).await,
            TypeRef::Named(name) => complete_named(ctx, name, resolved, label, path, field_nodes, errors).await,
        }
    })
}

#[allow(clippy::too_many_arguments)]
async fn complete_list<'a, Ctx>(
    ctx: &'a ExecutionContext<'a, Ctx>,
    item_type: &'a TypeRef,
    resolved: Value,
    label: &'a str,
    path: Arc<Path>,
    field_nodes: &'a [&'a Field],
    stream: Option<&'a StreamConfig>,
    errors: &mut Vec<ExecutionError>,
) -> CompleteResult
where
    Ctx: Sync,
{
    let items = match resolved {
        Value::List(items) => items,
        Value::Null => return Ok(Value::Null),
        _ => {
            push_error(errors, field_nodes, &path, FieldError::new(format!("Expected Iterable, but did not find one for field {label}.")));
            return Err(());
        }
    };

    let initial_count = stream.map(|s| s.initial_count.max(0) as usize).unwrap_or(items.len());
    let mut out = Vec::with_capacity(items.len());

    for (index, item) in items.iter().cloned().enumerate().take(initial_count) {
        match complete_list_item(ctx, item_type, item, label, path.push_index(index), field_nodes, errors).await {
            Ok(v) => out.push(v),
            Err(()) => return Err(()),
        }
    }

    if let (Some(cfg), true) = (stream, items.len() > initial_count) {
        for (index, item) in items.into_iter().enumerate().skip(initial_count) {
            let item_path = path.push_index(index);
            let record_id = ctx.scheduler.register(None, item_path.clone(), cfg.label.clone(), RecordKind::StreamItem);
            let mut item_errors = Vec::new();
            let completed = complete_list_item(ctx, item_type, item, label, item_path, field_nodes, &mut item_errors).await;
            let graphql_errors = item_errors.iter().map(ExecutionError::to_graphql_error).collect();
            match completed {
                Ok(v) => ctx.scheduler.complete(record_id, v, graphql_errors),
                Err(()) => ctx.scheduler.fail(record_id, graphql_errors),
            }
        }
    }

    Ok(Value::List(out))
}

async fn complete_list_item<'a, Ctx>(
    ctx: &'a ExecutionContext<'a, Ctx>,
    item_type: &'a TypeRef,
    item: Value,
    label: &'a str,
    path: Arc<Path>,
    field_nodes: &'a [&'a Field],
    errors: &mut Vec<ExecutionError>,
) -> CompleteResult
where
    Ctx: Sync,
{
    match complete_value(ctx, item_type, item, label, path, field_nodes, None, errors).await {
        Ok(v) => Ok(v),
        Err(()) => ctx.propagate(item_type),
    }
}

async fn complete_named<'a, Ctx>(
    ctx: &'a ExecutionContext<'a, Ctx>,
    name: &'a str,
    resolved: Value,
    label: &'a str,
    path: Arc<Path>,
    field_nodes: &'a [&'a Field],
    errors: &'a mut Vec<ExecutionError>,
) -> CompleteResult
where
    Ctx: Sync,
{
    if resolved.is_null() {
        return Ok(Value::Null);
    }

    let Some(type_def) = ctx.schema.type_by_name(name) else {
        push_error(errors, field_nodes, &path, FieldError::new(format!("Unknown type \"{name}\" for field {label}.")));
        return Err(());
    };

    match type_def {
        TypeDef::Scalar(scalar_def) => match (scalar_def.serialize)(&resolved) {
            Ok(v) => Ok(v),
            Err(message) => {
                push_error(errors, field_nodes, &path, FieldError::new(message));
                Err(())
            }
        },
        TypeDef::Enum(enum_def) => match resolved.as_str() {
            Some(s) if enum_def.values.iter().any(|v| v.name == s) => Ok(Value::string(s)),
            _ => {
                push_error(errors, field_nodes, &path, FieldError::new(format!("Enum \"{name}\" cannot represent value: {resolved}")));
                Err(())
            }
        },
        TypeDef::Object(object_def) => {
            let selection_set = selection_set_of(field_nodes);
            complete_object(ctx, &object_def.name, selection_set, &resolved, path, None, errors).await
        }
        TypeDef::Interface(interface_def) => {
            let runtime_name = resolve_abstract_type(
                ctx,
                name,
                &resolved,
                label,
                &path,
                field_nodes,
                interface_def.resolve_type.as_deref(),
                &field_def_return_type(name),
                errors,
            )
            .await?;
            let selection_set = selection_set_of(field_nodes);
            complete_object(ctx, &runtime_name, selection_set, &resolved, path, None, errors).await
        }
        TypeDef::Union(union_def) => {
            let runtime_name = resolve_abstract_type(
                ctx,
                name,
                &resolved,
                label,
                &path,
                field_nodes,
                union_def.resolve_type.as_deref(),
                &field_def_return_type(name),
                errors,
            )
            .await?;
            let selection_set = selection_set_of(field_nodes);
            complete_object(ctx, &runtime_name, selection_set, &resolved, path, None, errors).await
        }
        TypeDef::InputObject(_) => {
            push_error(errors, field_nodes, &path, FieldError::new(format!("Input type \"{name}\" cannot be used as an output type for field {label}.")));
            Err(())
        }
    }
}

fn field_def_return_type(name: &str) -> TypeRef {
    TypeRef::named(name)
}

fn selection_set_of<'a>(field_nodes: &'a [&'a Field]) -> &'a [Selection] {
    &field_nodes[0].selection_set
}

/// Abstract-type runtime resolution (`spec.md` §4.5 "Interface/Union").
#[allow(clippy::too_many_arguments)]
async fn resolve_abstract_type<'a, Ctx>(
    ctx: &'a ExecutionContext<'a, Ctx>,
    abstract_name: &str,
    value: &Value,
    label: &str,
    path: &Arc<Path>,
    field_nodes: &'a [&'a Field],
    resolve_type: Option<&'a dyn crate::resolve::TypeResolver<Ctx>>,
    return_type: &'a TypeRef,
    errors: &mut Vec<ExecutionError>,
) -> Result<String, ()>
where
    Ctx: Sync,
{
    if let Some(explicit) = value.as_object().and_then(|o| o.get_field("__typename")).and_then(Value::as_str) {
        return validate_runtime_type(ctx, abstract_name, explicit, label, path, field_nodes, errors);
    }

    let info = ResolveInfo {
        field_nodes,
        parent_type: abstract_name,
        return_type,
        path: path.clone(),
        schema: ctx.schema,
        fragments: ctx.fragments,
        variables: ctx.variables,
        root_value: ctx.root_value,
        operation: ctx.operation,
        abort: &ctx.abort,
    };

    let mut runtime_name = None;
    if let Some(resolver) = resolve_type {
        let outcome = resolver.resolve_type(value, ctx.context, &info);
        runtime_name = match outcome {
            TypeNameOutcome::Name(n) => n,
            TypeNameOutcome::Future(fut) => match ctx.abort.race(fut).await {
                Ok(n) => n,
                Err(reason) => {
                    push_error(errors, field_nodes, path, FieldError::new(format!("Execution aborted: {reason}")));
                    return Err(());
                }
            },
        };
    }

    if runtime_name.is_none() {
        if let Some(possible_types) = ctx.schema.type_by_name(abstract_name).and_then(TypeDef::possible_types) {
            for candidate in possible_types {
                if let Some(TypeDef::Object(object_def)) = ctx.schema.type_by_name(candidate) {
                    if let Some(is_type_of) = &object_def.is_type_of {
                        let truthy = match is_type_of.is_type_of(value, ctx.context, &info) {
                            IsTypeOfOutcome::Bool(b) => b,
                            IsTypeOfOutcome::Future(fut) => match ctx.abort.race(fut).await {
                                Ok(b) => b,
                                Err(reason) => {
                                    push_error(errors, field_nodes, path, FieldError::new(format!("Execution aborted: {reason}")));
                                    return Err(());
                                }
                            },
                        };
                        if truthy {
                            runtime_name = Some(candidate.clone());
                            break;
                        }
                    }
                }
            }
        }
    }

    match runtime_name {
        Some(n) => validate_runtime_type(ctx, abstract_name, &n, label, path, field_nodes, errors),
        None => {
            push_error(
                errors,
                field_nodes,
                path,
                FieldError::new(format!(
                    "Abstract type \"{abstract_name}\" must resolve to an Object type at runtime for field \"{label}\". \
                     Either the \"{abstract_name}\" type should provide a \"resolve_type\" function or each possible \
                     type should provide an \"is_type_of\" function."
                )),
            );
            Err(())
        }
    }
}

fn validate_runtime_type<Ctx>(
    ctx: &ExecutionContext<'_, Ctx>,
    abstract_name: &str,
    runtime_name: &str,
    label: &str,
    path: &Arc<Path>,
    field_nodes: &[&Field],
    errors: &mut Vec<ExecutionError>,
) -> Result<String, ()> {
    match ctx.schema.type_by_name(runtime_name) {
        None => {
            push_error(
                errors,
                field_nodes,
                path,
                FieldError::new(format!("Abstract type \"{abstract_name}\" was resolved to a type \"{runtime_name}\" that does not exist inside the schema.")),
            );
            Err(())
        }
        Some(TypeDef::Object(_)) => {
            if ctx.schema.is_possible_type(abstract_name, runtime_name) {
                Ok(runtime_name.to_owned())
            } else {
                push_error(
                    errors,
                    field_nodes,
                    path,
                    FieldError::new(format!("Runtime Object type \"{runtime_name}\" is not a possible type for \"{abstract_name}\".")),
                );
                let _ = label;
                Err(())
            }
        }
        Some(_) => {
            push_error(
                errors,
                field_nodes,
                path,
                FieldError::new(format!("Abstract type \"{abstract_name}\" was resolved to a non-object type \"{runtime_name}\".")),
            );
            Err(())
        }
    }
}

/// Convenience re-export used by the Subscription Driver and Public Execute
/// API to invoke field resolution for a single root field without going
/// through the full object machinery (`spec.md` §4.7 step 3).
pub async fn complete_root_field<'a, Ctx>(
    ctx: &'a ExecutionContext<'a, Ctx>,
    field_def: &'a FieldDef<Ctx>,
    field_nodes: &'a [&'a Field],
    parent_type_name: &'a str,
    source: &'a Value,
    path: Arc<Path>,
    errors: &mut Vec<ExecutionError>,
) -> CompleteResult
where
    Ctx: Sync,
{
    complete_field(ctx, field_def, field_nodes, parent_type_name, source, path, None, errors).await
}

/// Exposed for the Subscription Driver: runs argument collection and
/// `subscribe()` for the single root field used to build a source stream
/// (`spec.md` §4.7 step 3).
pub fn collect_root_arguments<Ctx>(
    field_def: &FieldDef<Ctx>,
    field_node: &Field,
    variables: &crate::ast::Variables,
    schema: &crate::schema::Schema<Ctx>,
) -> Result<Arguments, FieldError> {
    collect_arguments(field_def, field_node, variables, schema)
}
