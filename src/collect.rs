//! Selection Collector (`spec.md` §4.2).

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::ast::{Directive, Field, FragmentDefinition, InputValue, Selection, Variables};
use crate::schema::Schema;
use crate::value::Value;

/// `@stream(initialCount:, label:)` recorded against a list-typed field.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub initial_count: i64,
    pub label: Option<String>,
}

/// The field nodes collected under one response name, plus any `@stream`
/// configuration found on them (`spec.md` §3 "Grouped field set").
pub struct FieldGroup<'a> {
    pub nodes: Vec<&'a Field>,
    pub stream: Option<StreamConfig>,
}

/// A fragment (spread or inline) deferred via `@defer`, recorded instead of
/// being inlined into the enclosing group (`spec.md` §4.2 step 5).
pub struct DeferredSelection<'a> {
    pub label: Option<String>,
    pub object_type: String,
    pub selection_set: &'a [Selection],
}

pub struct CollectOutput<'a> {
    pub fields: IndexMap<String, FieldGroup<'a>>,
    pub defers: Vec<DeferredSelection<'a>>,
}

fn directive<'a>(directives: &'a [Directive], name: &str) -> Option<&'a Directive> {
    directives.iter().find(|d| d.name == name)
}

fn bool_arg(value: Option<&InputValue>, variables: &Variables, default: bool) -> bool {
    match value {
        None => default,
        Some(InputValue::Boolean(b)) => *b,
        Some(InputValue::Variable(name)) => match variables.get(name) {
            Some(Value::Scalar(crate::value::Scalar::Boolean(b))) => *b,
            _ => default,
        },
        _ => default,
    }
}

/// `@defer(if:)`/`@stream(if:)`: an explicit `null` (literal or via
/// variable) does NOT disable the directive — only an explicit `false` does
/// (`spec.md` §4.2 step 5).
fn if_enabled(value: Option<&InputValue>, variables: &Variables) -> bool {
    match value {
        None => true,
        Some(InputValue::Boolean(b)) => *b,
        Some(InputValue::Null) => true,
        Some(InputValue::Variable(name)) => match variables.get(name) {
            Some(Value::Scalar(crate::value::Scalar::Boolean(b))) => *b,
            Some(Value::Null) | None => true,
            _ => true,
        },
        _ => true,
    }
}

fn should_skip(directives: &[Directive], variables: &Variables) -> bool {
    let skip = directive(directives, "skip")
        .is_some_and(|d| bool_arg(d.argument("if"), variables, false));
    let included = directive(directives, "include")
        .map(|d| bool_arg(d.argument("if"), variables, true))
        .unwrap_or(true);
    skip || !included
}

fn defer_directive<'a>(directives: &'a [Directive], variables: &Variables) -> Option<(&'a Directive, bool)> {
    directive(directives, "defer").map(|d| {
        let enabled = if_enabled(d.argument("if"), variables);
        (d, enabled)
    })
}

fn defer_label(d: &Directive, variables: &Variables) -> Option<String> {
    match d.argument("label") {
        Some(InputValue::String(s)) => Some(s.clone()),
        Some(InputValue::Variable(name)) => match variables.get(name) {
            Some(Value::Scalar(crate::value::Scalar::String(s))) => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}

#[allow(clippy::too_many_arguments)]
fn collect_into<'a, Ctx>(
    schema: &Schema<Ctx>,
    fragments: &'a IndexMap<String, FragmentDefinition>,
    variables: &Variables,
    object_type_name: &str,
    selection_set: &'a [Selection],
    visited: &mut HashSet<String>,
    out_fields: &mut IndexMap<String, FieldGroup<'a>>,
    out_defers: &mut Vec<DeferredSelection<'a>>,
) {
    for selection in selection_set {
        match selection {
            Selection::Field(field) => {
                if should_skip(&field.directives, variables) {
                    continue;
                }
                let entry = out_fields
                    .entry(field.response_name().to_owned())
                    .or_insert_with(|| FieldGroup { nodes: Vec::new(), stream: None });
                entry.nodes.push(field);
                if let Some(d) = directive(&field.directives, "stream") {
                    let enabled = if_enabled(d.argument("if"), variables);
                    if enabled {
                        let initial_count = match d.argument("initialCount") {
                            Some(InputValue::Int(i)) => *i,
                            Some(InputValue::Variable(name)) => {
                                variables.get(name).and_then(|v| match v {
                                    Value::Scalar(crate::value::Scalar::Int(i)) => Some(*i),
                                    _ => None,
                                }).unwrap_or(0)
                            }
                            _ => 0,
                        };
                        entry.stream = Some(StreamConfig {
                            initial_count,
                            label: defer_label(d, variables),
                        });
                    }
                }
            }
            Selection::InlineFragment(inline) => {
                if should_skip(&inline.directives, variables) {
                    continue;
                }
                if let Some(cond) = &inline.type_condition {
                    if !schema.satisfies_type_condition(object_type_name, cond) {
                        continue;
                    }
                }
                if let Some((d, enabled)) = defer_directive(&inline.directives, variables) {
                    if enabled {
                        out_defers.push(DeferredSelection {
                            label: defer_label(d, variables),
                            object_type: object_type_name.to_owned(),
                            selection_set: &inline.selection_set,
                        });
                        continue;
                    }
                }
                collect_into(
                    schema,
                    fragments,
                    variables,
                    object_type_name,
                    &inline.selection_set,
                    visited,
                    out_fields,
                    out_defers,
                );
            }
            Selection::FragmentSpread(spread) => {
                if should_skip(&spread.directives, variables) {
                    continue;
                }
                let Some(fragment) = fragments.get(&spread.fragment_name) else {
                    continue; // validation (external) catches unknown fragments
                };
                if !schema.satisfies_type_condition(object_type_name, &fragment.type_condition) {
                    continue;
                }
                if let Some((d, enabled)) = defer_directive(&spread.directives, variables) {
                    if enabled {
                        out_defers.push(DeferredSelection {
                            label: defer_label(d, variables),
                            object_type: object_type_name.to_owned(),
                            selection_set: &fragment.selection_set,
                        });
                        continue;
                    }
                }
                if !visited.insert(spread.fragment_name.clone()) {
                    continue;
                }
                collect_into(
                    schema,
                    fragments,
                    variables,
                    object_type_name,
                    &fragment.selection_set,
                    visited,
                    out_fields,
                    out_defers,
                );
            }
        }
    }
}

/// Walks `selection_set` against `object_type_name`, producing the grouped
/// field set plus any `@defer`d sub-selections discovered along the way
/// (`spec.md` §4.2).
pub fn collect_fields<'a, Ctx>(
    schema: &Schema<Ctx>,
    fragments: &'a IndexMap<String, FragmentDefinition>,
    variables: &Variables,
    object_type_name: &str,
    selection_set: &'a [Selection],
) -> CollectOutput<'a> {
    let mut out_fields = IndexMap::new();
    let mut out_defers = Vec::new();
    let mut visited = HashSet::new();
    collect_into(
        schema,
        fragments,
        variables,
        object_type_name,
        selection_set,
        &mut visited,
        &mut out_fields,
        &mut out_defers,
    );
    CollectOutput { fields: out_fields, defers: out_defers }
}
