//! Value Coercer (`spec.md` §4.1): turns external JSON-like variable values
//! and AST literals into internal [`Value`]s by walking the expected type.

use indexmap::IndexMap;

use crate::ast::{InputValue, Type as AstType, Variables, VariableDefinition};
use crate::schema::meta::TypeDef;
use crate::schema::{Schema, TypeRef};
use crate::value::{Object, Scalar, Value};

/// A single coercion failure, reported with enough context to build the
/// `"Variable \"$x\" got invalid value ...; <reason>"` message shape used
/// throughout `spec.md` §4.1.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionError {
    pub message: String,
}

impl CoercionError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Normalized intermediate form that both JSON variable input and AST
/// literal input (after variable substitution) are converted into, so the
/// type-directed walk below only has to be written once.
enum Norm {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Norm>),
    Object(IndexMap<String, Norm>),
}

fn norm_from_json(v: &serde_json::Value) -> Norm {
    match v {
        serde_json::Value::Null => Norm::Null,
        serde_json::Value::Bool(b) => Norm::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Norm::Int(i)
            } else {
                Norm::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Norm::Str(s.clone()),
        serde_json::Value::Array(items) => Norm::List(items.iter().map(norm_from_json).collect()),
        serde_json::Value::Object(fields) => {
            Norm::Object(fields.iter().map(|(k, v)| (k.clone(), norm_from_json(v))).collect())
        }
    }
}

fn norm_from_value(v: &Value) -> Norm {
    match v {
        Value::Null => Norm::Null,
        Value::Scalar(Scalar::Boolean(b)) => Norm::Bool(*b),
        Value::Scalar(Scalar::Int(i)) => Norm::Int(*i),
        Value::Scalar(Scalar::Float(f)) => Norm::Float(*f),
        Value::Scalar(Scalar::String(s)) => Norm::Str(s.clone()),
        Value::List(items) => Norm::List(items.iter().map(norm_from_value).collect()),
        Value::Object(o) => Norm::Object(o.iter().map(|(k, v)| (k.clone(), norm_from_value(v))).collect()),
    }
}

fn norm_from_ast(iv: &InputValue, variables: &Variables) -> Norm {
    match iv {
        InputValue::Null => Norm::Null,
        InputValue::Variable(name) => match variables.get(name) {
            Some(v) => norm_from_value(v),
            None => Norm::Undefined,
        },
        InputValue::Boolean(b) => Norm::Bool(*b),
        InputValue::Int(i) => Norm::Int(*i),
        InputValue::Float(f) => Norm::Float(*f),
        InputValue::String(s) | InputValue::Enum(s) => Norm::Str(s.clone()),
        InputValue::List(items) => Norm::List(items.iter().map(|i| norm_from_ast(i, variables)).collect()),
        InputValue::Object(fields) => {
            Norm::Object(fields.iter().map(|(k, v)| (k.clone(), norm_from_ast(v, variables))).collect())
        }
    }
}

fn norm_to_value(norm: &Norm) -> Value {
    match norm {
        Norm::Undefined | Norm::Null => Value::Null,
        Norm::Bool(b) => Value::boolean(*b),
        Norm::Int(i) => Value::int(*i),
        Norm::Float(f) => Value::float(*f),
        Norm::Str(s) => Value::string(s.clone()),
        Norm::List(items) => Value::list(items.iter().map(norm_to_value).collect()),
        Norm::Object(fields) => {
            let mut o = Object::new();
            for (k, v) in fields {
                o.add_field(k.clone(), norm_to_value(v));
            }
            Value::object(o)
        }
    }
}

/// Converts a parsed `ast::Type` literal into a schema `TypeRef`, trusting
/// that validation (external to this crate) already confirmed the named
/// type exists.
pub fn ast_type_to_type_ref(ty: &AstType) -> TypeRef {
    match ty {
        AstType::Named(n) => TypeRef::Named(n.clone()),
        AstType::List(inner) => TypeRef::List(Box::new(ast_type_to_type_ref(inner))),
        AstType::NonNull(inner) => TypeRef::NonNull(Box::new(ast_type_to_type_ref(inner))),
        AstType::SemanticNonNull(inner) => TypeRef::SemanticNonNull(Box::new(ast_type_to_type_ref(inner))),
    }
}

fn coerce_norm<Ctx>(type_ref: &TypeRef, norm: &Norm, schema: &Schema<Ctx>, path: &[String]) -> Result<Value, String> {
    match type_ref {
        TypeRef::NonNull(inner) => match norm {
            Norm::Null | Norm::Undefined => Err(format!(
                "Expected value of non-null type \"{}\" not to be null.",
                type_ref
            )),
            _ => coerce_norm(inner, norm, schema, path),
        },
        // Semantic-non-null affects completion-side null bubbling only
        // (`spec.md` §4.5); on input it coerces exactly like its wrapped type.
        TypeRef::SemanticNonNull(inner) => coerce_norm(inner, norm, schema, path),
        TypeRef::List(inner) => match norm {
            Norm::Null | Norm::Undefined => Ok(Value::Null),
            Norm::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let mut item_path = path.to_vec();
                    item_path.push(i.to_string());
                    out.push(coerce_norm(inner, item, schema, &item_path)?);
                }
                Ok(Value::list(out))
            }
            // Single-value-to-list rule (`spec.md` §4.1).
            single => Ok(Value::list(vec![coerce_norm(inner, single, schema, path)?])),
        },
        TypeRef::Named(name) => coerce_named(name, norm, schema, path),
    }
}

fn coerce_named<Ctx>(name: &str, norm: &Norm, schema: &Schema<Ctx>, path: &[String]) -> Result<Value, String> {
    if matches!(norm, Norm::Null | Norm::Undefined) {
        return Ok(Value::Null);
    }
    let type_def = schema
        .type_by_name(name)
        .ok_or_else(|| format!("Unknown type \"{name}\"."))?;
    match type_def {
        TypeDef::Scalar(scalar) => (scalar.parse_value)(&norm_to_value(norm))
            .map_err(|e| format!("Expected type \"{name}\". {e}")),
        TypeDef::Enum(def) => match norm {
            Norm::Str(s) if def.values.iter().any(|v| &v.name == s) => Ok(Value::string(s.clone())),
            other => Err(format!(
                "Expected type \"{name}\", found {}.",
                describe(other)
            )),
        },
        TypeDef::InputObject(def) => {
            let Norm::Object(fields) = norm else {
                return Err(format!("Expected type \"{name}\" to be an object."));
            };
            for key in fields.keys() {
                if !def.fields.contains_key(key) {
                    return Err(format!("Field \"{key}\" is not defined by type \"{name}\"."));
                }
            }
            let mut out = Object::new();
            let mut present_non_null = Vec::new();
            let mut present_keys = Vec::new();
            for (field_name, field_def) in &def.fields {
                let mut field_path = path.to_vec();
                field_path.push(field_name.clone());
                match fields.get(field_name) {
                    Some(value_norm) => {
                        present_keys.push(field_name.clone());
                        if !matches!(value_norm, Norm::Null) {
                            present_non_null.push(field_name.clone());
                        }
                        let coerced = coerce_norm(&field_def.field_type, value_norm, schema, &field_path)?;
                        out.add_field(field_name.clone(), coerced);
                    }
                    None => {
                        if let Some(default) = &field_def.default_value {
                            let default_norm = norm_from_ast(default, &Variables::new());
                            let coerced = coerce_norm(&field_def.field_type, &default_norm, schema, &field_path)?;
                            out.add_field(field_name.clone(), coerced);
                        } else if field_def.field_type.is_non_null() {
                            return Err(format!(
                                "Field \"{field_name}\" of required type \"{}\" was not provided.",
                                field_def.field_type
                            ));
                        }
                    }
                }
            }
            if def.is_one_of {
                if present_keys.len() > 1 {
                    return Err(format!("Exactly one key must be specified for OneOf type \"{name}\"."));
                }
                if present_keys.len() == 1 && present_non_null.is_empty() {
                    return Err(format!(
                        "Field \"{}\" of OneOf type \"{name}\" must be non-null.",
                        present_keys[0]
                    ));
                }
                if present_keys.is_empty() {
                    return Err(format!("Exactly one key must be specified for OneOf type \"{name}\"."));
                }
            }
            Ok(Value::object(out))
        }
        _ => Err(format!("Type \"{name}\" is not a valid input type.")),
    }
}

fn describe(norm: &Norm) -> String {
    match norm {
        Norm::Undefined | Norm::Null => "null".to_owned(),
        Norm::Bool(b) => b.to_string(),
        Norm::Int(i) => i.to_string(),
        Norm::Float(f) => f.to_string(),
        Norm::Str(s) => format!("\"{s}\""),
        Norm::List(_) => "a list".to_owned(),
        Norm::Object(_) => "an object".to_owned(),
    }
}

/// Coerces the raw JSON variable map against the operation's variable
/// definitions, producing the internal [`Variables`] map (`spec.md` §4.1).
///
/// Errors accumulate up to `max_errors` (default unlimited); once the cap is
/// reached a final sentinel error is appended and coercion stops early.
pub fn coerce_variable_values<Ctx>(
    schema: &Schema<Ctx>,
    variable_defs: &[VariableDefinition],
    raw_variables: &serde_json::Value,
    max_errors: Option<usize>,
) -> Result<Variables, Vec<CoercionError>> {
    let empty = serde_json::Map::new();
    let raw_object = raw_variables.as_object().unwrap_or(&empty);

    let mut variables = Variables::new();
    let mut errors = Vec::new();

    for def in variable_defs {
        if let Some(max) = max_errors {
            if errors.len() >= max {
                errors.push(CoercionError::new(
                    "Too many errors processing variables, error limit reached. Execution aborted.",
                ));
                break;
            }
        }

        let type_ref = ast_type_to_type_ref(&def.var_type);
        match raw_object.get(&def.name) {
            None => {
                if let Some(default) = &def.default_value {
                    let norm = norm_from_ast(default, &Variables::new());
                    match coerce_norm(&type_ref, &norm, schema, &[]) {
                        Ok(v) => {
                            variables.insert(def.name.clone(), v);
                        }
                        Err(e) => errors.push(CoercionError::new(format!(
                            "Variable \"${}\" got invalid default value; {e}",
                            def.name
                        ))),
                    }
                } else if type_ref.is_non_null() {
                    errors.push(CoercionError::new(format!(
                        "Variable \"${}\" of required type \"{type_ref}\" was not provided.",
                        def.name
                    )));
                }
                // Nullable, no default, not provided: stays absent (undefined).
            }
            Some(raw) => {
                if raw.is_null() && type_ref.is_non_null() {
                    errors.push(CoercionError::new(format!(
                        "Variable \"${}\" of non-null type \"{type_ref}\" must not be null.",
                        def.name
                    )));
                    continue;
                }
                let norm = norm_from_json(raw);
                match coerce_norm(&type_ref, &norm, schema, &[]) {
                    Ok(v) => {
                        variables.insert(def.name.clone(), v);
                    }
                    Err(e) => errors.push(CoercionError::new(format!(
                        "Variable \"${}\" got invalid value; {e}",
                        def.name
                    ))),
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(variables)
    } else {
        Err(errors)
    }
}

/// Coerces a single AST literal (e.g. an argument value) against `type_ref`,
/// substituting any variable references from `variables` (`spec.md` §4.3
/// step 2).
pub fn coerce_ast_value<Ctx>(
    type_ref: &TypeRef,
    literal: &InputValue,
    variables: &Variables,
    schema: &Schema<Ctx>,
) -> Result<Value, String> {
    let norm = norm_from_ast(literal, variables);
    coerce_norm(type_ref, &norm, schema, &[])
}
