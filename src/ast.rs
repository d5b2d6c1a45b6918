//! AST contract types.
//!
//! Lexing and parsing are out of scope for this crate (`spec.md` §1): these
//! types describe the *shape* of the already-parsed, already-validated
//! document the core is handed. A real deployment plugs in its own parser's
//! output here, or converts it into these types at the transport boundary.

use indexmap::IndexMap;

use crate::value::Value;

/// A source location, carried through to error `locations` (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// Type reference literal as it appears in a variable definition or schema
/// position. Carries no semantic information and may name a type that
/// doesn't exist (validation, which catches that, is external).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Named(String),
    List(Box<Type>),
    NonNull(Box<Type>),
    /// Semantic-non-null wrapper (`spec.md` §3, §4.5): behaves like
    /// `NonNull` only when the wrapped field returned a null *without* an
    /// accompanying error.
    SemanticNonNull(Box<Type>),
}

impl Type {
    pub fn named_name(&self) -> &str {
        match self {
            Type::Named(n) => n,
            Type::List(inner) | Type::NonNull(inner) | Type::SemanticNonNull(inner) => {
                inner.named_name()
            }
        }
    }
}

/// A literal or variable-referencing input value from the AST, as produced
/// by parsing argument/default-value positions.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Null,
    Variable(String),
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum(String),
    List(Vec<InputValue>),
    Object(IndexMap<String, InputValue>),
}

impl InputValue {
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: IndexMap<String, InputValue>,
    pub location: Location,
}

impl Directive {
    pub fn argument(&self, name: &str) -> Option<&InputValue> {
        self.arguments.get(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: IndexMap<String, InputValue>,
    pub directives: Vec<Directive>,
    pub selection_set: Vec<Selection>,
    pub location: Location,
}

impl Field {
    /// The alias if present, otherwise the field name (`spec.md` GLOSSARY
    /// "Response name").
    pub fn response_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineFragment {
    pub type_condition: Option<String>,
    pub directives: Vec<Directive>,
    pub selection_set: Vec<Selection>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSpread {
    pub fragment_name: String,
    pub directives: Vec<Directive>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(Field),
    InlineFragment(InlineFragment),
    FragmentSpread(FragmentSpread),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentDefinition {
    pub name: String,
    pub type_condition: String,
    pub directives: Vec<Directive>,
    pub selection_set: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    pub var_type: Type,
    pub default_value: Option<InputValue>,
}

/// `@onError(action: PROPAGATE | NULL)` (`spec.md` §4.5, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorBehavior {
    #[default]
    Propagate,
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationDefinition {
    pub name: Option<String>,
    pub kind: OperationKind,
    pub variable_definitions: Vec<VariableDefinition>,
    pub directives: Vec<Directive>,
    pub selection_set: Vec<Selection>,
}

impl OperationDefinition {
    /// Resolves the `@onError` directive, if present, falling back to the
    /// operation-wide default of `PROPAGATE` (`spec.md` §4.5).
    pub fn error_behavior(&self) -> ErrorBehavior {
        for d in &self.directives {
            if d.name == "onError" {
                if let Some(InputValue::Enum(action)) = d.argument("action") {
                    return match action.as_str() {
                        "NULL" => ErrorBehavior::Null,
                        _ => ErrorBehavior::Propagate,
                    };
                }
            }
        }
        ErrorBehavior::Propagate
    }
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    pub operations: Vec<OperationDefinition>,
    pub fragments: IndexMap<String, FragmentDefinition>,
}

/// The coerced variable map (`spec.md` §3): a missing key is the "undefined"
/// sentinel, distinct from a present `Value::Null`.
pub type Variables = std::collections::HashMap<String, Value>;
