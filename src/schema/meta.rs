//! Meta-type definitions: the shape of the schema the executor reads.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::InputValue;
use crate::resolve::{FieldResolver, IsTypeOf, SubscribeResolver, TypeResolver};
use crate::value::Value;

/// A type reference: a named type possibly wrapped in `List`, `NonNull`, or
/// `SemanticNonNull` (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
    SemanticNonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn non_null(self) -> Self {
        Self::NonNull(Box::new(self))
    }

    pub fn semantic_non_null(self) -> Self {
        Self::SemanticNonNull(Box::new(self))
    }

    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Named(n) => n,
            Self::List(inner) | Self::NonNull(inner) | Self::SemanticNonNull(inner) => inner.name(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    pub fn is_semantic_non_null(&self) -> bool {
        matches!(self, Self::SemanticNonNull(_))
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(n) => write!(f, "{n}"),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
            Self::SemanticNonNull(inner) => write!(f, "{inner}*"),
        }
    }
}

pub struct ArgumentDef {
    pub name: String,
    pub arg_type: TypeRef,
    pub default_value: Option<InputValue>,
}

pub struct FieldDef<Ctx> {
    pub name: String,
    pub arguments: IndexMap<String, ArgumentDef>,
    pub return_type: TypeRef,
    pub resolve: Option<Arc<dyn FieldResolver<Ctx>>>,
    pub subscribe: Option<Arc<dyn SubscribeResolver<Ctx>>>,
}

impl<Ctx> FieldDef<Ctx> {
    pub fn new(name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            arguments: IndexMap::new(),
            return_type,
            resolve: None,
            subscribe: None,
        }
    }

    pub fn with_resolve(mut self, resolver: impl FieldResolver<Ctx> + 'static) -> Self {
        self.resolve = Some(Arc::new(resolver));
        self
    }

    pub fn with_subscribe(mut self, resolver: impl SubscribeResolver<Ctx> + 'static) -> Self {
        self.subscribe = Some(Arc::new(resolver));
        self
    }

    pub fn with_argument(mut self, arg: ArgumentDef) -> Self {
        self.arguments.insert(arg.name.clone(), arg);
        self
    }
}

pub struct InputFieldDef {
    pub name: String,
    pub field_type: TypeRef,
    pub default_value: Option<InputValue>,
}

/// Marks an input object as `@oneOf` (`spec.md` §4.1 "OneOf input object").
pub struct InputObjectDef {
    pub name: String,
    pub fields: IndexMap<String, InputFieldDef>,
    pub is_one_of: bool,
}

pub struct ObjectDef<Ctx> {
    pub name: String,
    pub fields: IndexMap<String, FieldDef<Ctx>>,
    pub is_type_of: Option<Arc<dyn IsTypeOf<Ctx>>>,
}

pub struct InterfaceDef<Ctx> {
    pub name: String,
    pub fields: IndexMap<String, FieldDef<Ctx>>,
    pub possible_types: Vec<String>,
    pub resolve_type: Option<Arc<dyn TypeResolver<Ctx>>>,
}

pub struct UnionDef<Ctx> {
    pub name: String,
    pub possible_types: Vec<String>,
    pub resolve_type: Option<Arc<dyn TypeResolver<Ctx>>>,
}

/// A scalar's literal/variable parsing and output serialization
/// (`spec.md` §4.1, §4.5).
pub struct ScalarDef {
    pub name: String,
    pub parse_value: Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>,
    pub parse_literal: Arc<dyn Fn(&crate::ast::InputValue) -> Result<Value, String> + Send + Sync>,
    pub serialize: Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>,
}

pub struct EnumValueDef {
    pub name: String,
}

pub struct EnumDef {
    pub name: String,
    pub values: Vec<EnumValueDef>,
}

pub enum TypeDef<Ctx> {
    Scalar(ScalarDef),
    Enum(EnumDef),
    InputObject(InputObjectDef),
    Object(ObjectDef<Ctx>),
    Interface(InterfaceDef<Ctx>),
    Union(UnionDef<Ctx>),
}

impl<Ctx> TypeDef<Ctx> {
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(d) => &d.name,
            Self::Enum(d) => &d.name,
            Self::InputObject(d) => &d.name,
            Self::Object(d) => &d.name,
            Self::Interface(d) => &d.name,
            Self::Union(d) => &d.name,
        }
    }

    pub fn fields(&self) -> Option<&IndexMap<String, FieldDef<Ctx>>> {
        match self {
            Self::Object(d) => Some(&d.fields),
            Self::Interface(d) => Some(&d.fields),
            _ => None,
        }
    }

    pub fn possible_types(&self) -> Option<&[String]> {
        match self {
            Self::Interface(d) => Some(&d.possible_types),
            Self::Union(d) => Some(&d.possible_types),
            _ => None,
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Interface(_) | Self::Union(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }
}
