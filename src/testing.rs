//! A minimal hand-built schema and AST-construction helpers used to drive
//! `execute_sync`/`execute`/`execute_incrementally`/`subscribe` in tests
//! without a real parser (`spec.md` §1 puts parsing out of scope for this
//! crate; tests build the AST directly).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::{Directive, Field, InputValue, Location, OperationDefinition, OperationKind, Selection};
use crate::resolve::{Arguments, FieldOutcome};
use crate::schema::meta::{ArgumentDef, FieldDef, InterfaceDef, ObjectDef, TypeDef};
use crate::schema::{Schema, TypeRef};
use crate::value::{Object, Value};

/// The user context threaded through every resolver in these fixtures. Both
/// `set`/`setP` mutation resolvers write through the same counter so tests
/// can observe whether sibling mutation fields ran serially.
pub struct TestContext {
    pub counter: Arc<AtomicI64>,
    pub log: Arc<std::sync::Mutex<Vec<&'static str>>>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self { counter: Arc::new(AtomicI64::new(0)), log: Arc::new(std::sync::Mutex::new(Vec::new())) }
    }
}

fn sync_field(name: &str, return_type: TypeRef, f: impl Fn(&Value, &Arguments) -> Value + Send + Sync + 'static) -> FieldDef<TestContext> {
    FieldDef::new(name, return_type).with_resolve(
        move |source: &Value, args: &Arguments, _ctx: &TestContext, _info: &crate::resolve::ResolveInfo<'_, TestContext>| {
            FieldOutcome::Value(f(source, args))
        },
    )
}

/// Builds the fixture schema: a trivial `{ a b }` query, a `Character`
/// interface with one implementor resolved via an explicit `__typename`
/// field, a `pets: [Pet]` field whose `Pet` interface has neither
/// `resolve_type` nor `is_type_of` (for the abstract-type error case), and a
/// `Mutation` with a synchronous and an asynchronous counter-incrementing
/// field for serialization tests.
pub fn schema() -> Schema<TestContext> {
    let mut schema = Schema::new("Query").with_mutation_type("Mutation");

    let mut query = ObjectDef { name: "Query".into(), fields: IndexMap::new(), is_type_of: None };
    query.fields.insert("a".into(), sync_field("a", TypeRef::named("String"), |_, _| Value::string("a")));
    query.fields.insert("b".into(), sync_field("b", TypeRef::named("String"), |_, _| Value::string("b")));
    query.fields.insert(
        "hero".into(),
        sync_field("hero", TypeRef::named("Character"), |_, _| {
            let mut obj = Object::new();
            obj.add_field("__typename", Value::string("Human"));
            obj.add_field("id", Value::string("1"));
            obj.add_field("name", Value::string("Luke"));
            Value::object(obj)
        }),
    );
    query.fields.insert(
        "pets".into(),
        sync_field("pets", TypeRef::named("Pet").list(), |_, _| {
            Value::list(vec![Value::object(Object::new())])
        }),
    );
    schema.add_type(TypeDef::Object(query));

    let mut character_fields = IndexMap::new();
    character_fields.insert("id".into(), FieldDef::new("id", TypeRef::named("String").non_null()));
    character_fields.insert("name".into(), FieldDef::new("name", TypeRef::named("String")));
    schema.add_type(TypeDef::Interface(InterfaceDef {
        name: "Character".into(),
        fields: character_fields,
        possible_types: vec!["Human".into()],
        resolve_type: None,
    }));

    let mut human_fields = IndexMap::new();
    human_fields.insert("id".into(), FieldDef::new("id", TypeRef::named("String").non_null()));
    human_fields.insert("name".into(), FieldDef::new("name", TypeRef::named("String")));
    schema.add_type(TypeDef::Object(ObjectDef { name: "Human".into(), fields: human_fields, is_type_of: None }));

    schema.add_type(TypeDef::Interface(InterfaceDef {
        name: "Pet".into(),
        fields: IndexMap::from([("name".to_owned(), FieldDef::new("name", TypeRef::named("String")))]),
        possible_types: vec!["Dog".into()],
        resolve_type: None,
    }));
    schema.add_type(TypeDef::Object(ObjectDef {
        name: "Dog".into(),
        fields: IndexMap::from([("name".to_owned(), FieldDef::new("name", TypeRef::named("String")))]),
        is_type_of: None,
    }));

    let mut counter_fields = IndexMap::new();
    counter_fields.insert("v".into(), FieldDef::new("v", TypeRef::named("Int").non_null()));
    schema.add_type(TypeDef::Object(ObjectDef { name: "Counter".into(), fields: counter_fields, is_type_of: None }));

    let mut mutation = ObjectDef { name: "Mutation".into(), fields: IndexMap::new(), is_type_of: None };
    mutation.fields.insert(
        "set".into(),
        FieldDef::new("set", TypeRef::named("Counter").non_null())
            .with_argument(ArgumentDef { name: "n".into(), arg_type: TypeRef::named("Int").non_null(), default_value: None })
            .with_resolve(|_source: &Value, _args: &Arguments, ctx: &TestContext, _info: &crate::resolve::ResolveInfo<'_, TestContext>| {
                ctx.log.lock().unwrap().push("set");
                ctx.counter.fetch_add(1, Ordering::SeqCst);
                let mut obj = Object::new();
                obj.add_field("v", Value::int(ctx.counter.load(Ordering::SeqCst)));
                FieldOutcome::Value(Value::object(obj))
            }),
    );
    mutation.fields.insert(
        "setP".into(),
        FieldDef::new("setP", TypeRef::named("Counter").non_null())
            .with_argument(ArgumentDef { name: "n".into(), arg_type: TypeRef::named("Int").non_null(), default_value: None })
            .with_resolve(|_source: &Value, _args: &Arguments, ctx: &TestContext, _info: &crate::resolve::ResolveInfo<'_, TestContext>| {
                // Clone the handles out of `ctx` so the returned future owns
                // what it touches instead of borrowing a resolve-call-scoped
                // reference; `FieldFuture` has to be `'static`.
                let counter = ctx.counter.clone();
                let log = ctx.log.clone();
                FieldOutcome::Future(Box::pin(async move {
                    log.lock().unwrap().push("setP");
                    counter.fetch_add(1, Ordering::SeqCst);
                    let mut obj = Object::new();
                    obj.add_field("v", Value::int(counter.load(Ordering::SeqCst)));
                    Ok(Value::object(obj))
                }))
            }),
    );
    schema.add_type(TypeDef::Object(mutation));

    schema
}

fn loc() -> Location {
    Location { line: 1, column: 1 }
}

/// Builds a leaf field selection with no arguments or sub-selections.
pub fn leaf(name: &str) -> Selection {
    Selection::Field(Field {
        alias: None,
        name: name.into(),
        arguments: IndexMap::new(),
        directives: Vec::new(),
        selection_set: Vec::new(),
        location: loc(),
    })
}

/// Builds a field selection with a sub-selection set.
pub fn field_with(name: &str, selection_set: Vec<Selection>) -> Selection {
    Selection::Field(Field {
        alias: None,
        name: name.into(),
        arguments: IndexMap::new(),
        directives: Vec::new(),
        selection_set,
        location: loc(),
    })
}

pub fn field_with_args(name: &str, arguments: IndexMap<String, InputValue>, selection_set: Vec<Selection>) -> Selection {
    Selection::Field(Field { alias: None, name: name.into(), arguments, directives: Vec::new(), selection_set, location: loc() })
}

pub fn query(selection_set: Vec<Selection>) -> OperationDefinition {
    OperationDefinition {
        name: None,
        kind: OperationKind::Query,
        variable_definitions: Vec::new(),
        directives: Vec::new(),
        selection_set,
    }
}

pub fn mutation(selection_set: Vec<Selection>) -> OperationDefinition {
    OperationDefinition {
        name: None,
        kind: OperationKind::Mutation,
        variable_definitions: Vec::new(),
        directives: Vec::new(),
        selection_set,
    }
}

pub fn defer_inline(selection_set: Vec<Selection>, type_condition: Option<&str>) -> Selection {
    Selection::InlineFragment(crate::ast::InlineFragment {
        type_condition: type_condition.map(str::to_owned),
        directives: vec![Directive { name: "defer".into(), arguments: IndexMap::new(), location: loc() }],
        selection_set,
        location: loc(),
    })
}

pub fn int_arg(n: i64) -> InputValue {
    InputValue::Int(n)
}

pub fn document(operations: Vec<OperationDefinition>) -> crate::ast::Document {
    crate::ast::Document { operations, fragments: IndexMap::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execute::{execute, execute_incrementally, execute_sync, ExecuteInput};
    use crate::AbortSignal;

    fn input<'a>(doc: &'a crate::ast::Document, root: &'a Value, ctx: &'a TestContext, vars: &'a serde_json::Value) -> ExecuteInput<'a, TestContext> {
        let schema: &'a Schema<TestContext> = Box::leak(Box::new(schema()));
        ExecuteInput {
            schema,
            document: doc,
            root_value: root,
            context_value: ctx,
            variable_values: vars,
            operation_name: None,
            abort_signal: AbortSignal::new(),
            max_variable_errors: None,
        }
    }

    #[test]
    fn sync_query_completes_synchronously() {
        let doc = document(vec![query(vec![leaf("a"), leaf("b")])]);
        let root = Value::Null;
        let ctx = TestContext::default();
        let vars = serde_json::Value::Null;
        let result = execute_sync(input(&doc, &root, &ctx, &vars));
        assert!(result.errors.is_empty());
        let data = result.data.unwrap();
        assert_eq!(data.as_object().unwrap().get_field("a").unwrap().as_str(), Some("a"));
        assert_eq!(data.as_object().unwrap().get_field("b").unwrap().as_str(), Some("b"));
    }

    #[test]
    fn mutation_siblings_run_serially() {
        let doc = document(vec![mutation(vec![
            field_with_args("set", IndexMap::from([("n".to_owned(), int_arg(1))]), vec![leaf("v")]),
            field_with_args("setP", IndexMap::from([("n".to_owned(), int_arg(2))]), vec![leaf("v")]),
            field_with_args("set", IndexMap::from([("n".to_owned(), int_arg(3))]), vec![leaf("v")]),
        ])]);
        let root = Value::Null;
        let ctx = TestContext::default();
        let vars = serde_json::Value::Null;
        let result = futures::executor::block_on(execute(input(&doc, &root, &ctx, &vars)));
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(ctx.log.lock().unwrap().as_slice(), &["set", "setP", "set"]);
    }

    #[test]
    fn abstract_type_without_resolver_errors() {
        let doc = document(vec![query(vec![field_with("pets", vec![leaf("name")])])]);
        let root = Value::Null;
        let ctx = TestContext::default();
        let vars = serde_json::Value::Null;
        let result = execute_sync(input(&doc, &root, &ctx, &vars));
        assert!(result.errors.iter().any(|e| e.message.contains("must resolve to an Object type at runtime")));
    }

    #[test]
    fn defer_produces_incremental_payload() {
        let doc = document(vec![query(vec![field_with(
            "hero",
            vec![leaf("id"), defer_inline(vec![leaf("name")], Some("Human"))],
        )])]);
        let root = Value::Null;
        let ctx = TestContext::default();
        let vars = serde_json::Value::Null;
        let incremental = futures::executor::block_on(execute_incrementally(input(&doc, &root, &ctx, &vars)));
        assert!(incremental.initial.has_next);
        let hero = incremental.initial.data.unwrap().as_object().unwrap().get_field("hero").unwrap().clone();
        assert_eq!(hero.as_object().unwrap().get_field("id").unwrap().as_str(), Some("1"));
        assert!(hero.as_object().unwrap().get_field("name").is_none());

        let payloads: Vec<_> = futures::executor::block_on(futures::stream::StreamExt::collect::<Vec<_>>(incremental.subsequent_results));
        assert!(!payloads.is_empty());
        assert!(!payloads.last().unwrap().has_next);
    }
}
