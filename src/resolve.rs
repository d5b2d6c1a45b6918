//! Dynamic dispatch across resolver return shapes (`spec.md` §9).
//!
//! Resolvers may return a plain value, null, an error, a future of any of
//! those, a synchronous iterable, or an asynchronous iterable — and any of
//! those may themselves recursively produce the same set. This module models
//! that as a flat tagged sum (`FieldOutcome`) rather than a type hierarchy,
//! per the spec's own design note.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::Stream;
use indexmap::IndexMap;

use crate::abort::AbortSignal;
use crate::ast::{Field, OperationDefinition, Variables};
use crate::error::FieldError;
use crate::path::Path;
use crate::schema::Schema;
use crate::value::Value;

/// Coerced argument map handed to a resolver, produced by the Argument
/// Collector (`spec.md` §4.3).
pub type Arguments = IndexMap<String, Value>;

/// A boxed future resolving to a field's eventual value or error.
pub type FieldFuture = Pin<Box<dyn Future<Output = Result<Value, FieldError>> + Send>>;

/// A boxed asynchronous sequence of field values, used both for `@stream`
/// tails and (with a different item shape) subscription source streams.
pub type ValueStream = Pin<Box<dyn Stream<Item = Result<Value, FieldError>> + Send>>;

/// The "info" bundle passed to every resolver (`spec.md` §4.4 step 3).
pub struct ResolveInfo<'a, Ctx> {
    pub field_nodes: &'a [&'a Field],
    pub parent_type: &'a str,
    pub return_type: &'a crate::schema::TypeRef,
    pub path: Arc<Path>,
    pub schema: &'a Schema<Ctx>,
    pub fragments: &'a indexmap::IndexMap<String, crate::ast::FragmentDefinition>,
    pub variables: &'a Variables,
    pub root_value: &'a Value,
    pub operation: &'a OperationDefinition,
    pub abort: &'a AbortSignal,
}

/// The flat sum over every shape a resolver's return value can take.
pub enum FieldOutcome {
    Value(Value),
    Err(FieldError),
    Future(FieldFuture),
    Iter(Vec<Value>),
    AsyncIter(ValueStream),
}

impl FieldOutcome {
    pub fn from_result(result: Result<Value, FieldError>) -> Self {
        match result {
            Ok(v) => Self::Value(v),
            Err(e) => Self::Err(e),
        }
    }
}

/// A field's resolver function (`spec.md` §3 "optional `resolve(source,
/// args, context, info)`").
pub trait FieldResolver<Ctx>: Send + Sync {
    fn resolve(
        &self,
        source: &Value,
        args: &Arguments,
        context: &Ctx,
        info: &ResolveInfo<'_, Ctx>,
    ) -> FieldOutcome;
}

impl<Ctx, F> FieldResolver<Ctx> for F
where
    F: Fn(&Value, &Arguments, &Ctx, &ResolveInfo<'_, Ctx>) -> FieldOutcome + Send + Sync,
{
    fn resolve(
        &self,
        source: &Value,
        args: &Arguments,
        context: &Ctx,
        info: &ResolveInfo<'_, Ctx>,
    ) -> FieldOutcome {
        (self)(source, args, context, info)
    }
}

/// Outcome of resolving an abstract type's runtime type name (`spec.md`
/// §4.5 "Interface/Union (abstract)").
pub enum TypeNameOutcome {
    Name(Option<String>),
    Future(Pin<Box<dyn Future<Output = Option<String>> + Send>>),
}

pub trait TypeResolver<Ctx>: Send + Sync {
    fn resolve_type(&self, value: &Value, context: &Ctx, info: &ResolveInfo<'_, Ctx>) -> TypeNameOutcome;
}

impl<Ctx, F> TypeResolver<Ctx> for F
where
    F: Fn(&Value, &Ctx, &ResolveInfo<'_, Ctx>) -> TypeNameOutcome + Send + Sync,
{
    fn resolve_type(&self, value: &Value, context: &Ctx, info: &ResolveInfo<'_, Ctx>) -> TypeNameOutcome {
        (self)(value, context, info)
    }
}

/// Outcome of an object type's `is_type_of` predicate.
pub enum IsTypeOfOutcome {
    Bool(bool),
    Future(Pin<Box<dyn Future<Output = bool> + Send>>),
}

pub trait IsTypeOf<Ctx>: Send + Sync {
    fn is_type_of(&self, value: &Value, context: &Ctx, info: &ResolveInfo<'_, Ctx>) -> IsTypeOfOutcome;
}

impl<Ctx, F> IsTypeOf<Ctx> for F
where
    F: Fn(&Value, &Ctx, &ResolveInfo<'_, Ctx>) -> IsTypeOfOutcome + Send + Sync,
{
    fn is_type_of(&self, value: &Value, context: &Ctx, info: &ResolveInfo<'_, Ctx>) -> IsTypeOfOutcome {
        (self)(value, context, info)
    }
}

/// A subscription root field's source-event stream (`spec.md` §4.7).
pub type SourceStream = Pin<Box<dyn Stream<Item = Value> + Send>>;

pub enum SubscribeOutcome {
    Stream(SourceStream),
    Err(FieldError),
    Future(Pin<Box<dyn Future<Output = Result<SourceStream, FieldError>> + Send>>),
}

pub trait SubscribeResolver<Ctx>: Send + Sync {
    fn subscribe(
        &self,
        source: &Value,
        args: &Arguments,
        context: &Ctx,
        info: &ResolveInfo<'_, Ctx>,
    ) -> SubscribeOutcome;
}

impl<Ctx, F> SubscribeResolver<Ctx> for F
where
    F: Fn(&Value, &Arguments, &Ctx, &ResolveInfo<'_, Ctx>) -> SubscribeOutcome + Send + Sync,
{
    fn subscribe(
        &self,
        source: &Value,
        args: &Arguments,
        context: &Ctx,
        info: &ResolveInfo<'_, Ctx>,
    ) -> SubscribeOutcome {
        (self)(source, args, context, info)
    }
}
