//! Argument Collector (`spec.md` §4.3).

use crate::ast::{Field, InputValue, Variables};
use crate::coercion::coerce_ast_value;
use crate::error::FieldError;
use crate::resolve::Arguments;
use crate::schema::meta::FieldDef;
use crate::schema::Schema;

/// Builds the argument map for a field's resolver from its AST node and the
/// operation's coerced variables, applying default values and the OneOf
/// rules (via [`crate::coercion`]).
///
/// On a coercion failure the field does not invoke its resolver at all; the
/// caller is expected to record the returned [`FieldError`] and complete the
/// field as `null` instead (`spec.md` §4.3 step 3, §4.4 step 2).
pub fn collect_arguments<Ctx>(
    field_def: &FieldDef<Ctx>,
    field_node: &Field,
    variables: &Variables,
    schema: &Schema<Ctx>,
) -> Result<Arguments, FieldError> {
    let mut out = Arguments::new();

    for (arg_name, arg_def) in &field_def.arguments {
        let provided = field_node.arguments.get(arg_name);

        if let Some(InputValue::Variable(var_name)) = provided {
            if !variables.contains_key(var_name) {
                if let Some(default) = &arg_def.default_value {
                    match coerce_ast_value(&arg_def.arg_type, default, variables, schema) {
                        Ok(v) => {
                            out.insert(arg_name.clone(), v);
                        }
                        Err(e) => return Err(FieldError::new(e)),
                    }
                    continue;
                }
                if arg_def.arg_type.is_non_null() {
                    return Err(FieldError::new(format!(
                        "Argument \"{arg_name}\" of required type \"{}\" was provided the \
                         variable \"${var_name}\" which was not provided a runtime value.",
                        arg_def.arg_type
                    )));
                }
                // Nullable, variable undefined, no default: argument is absent.
                continue;
            }
        }

        match provided {
            Some(literal) => match coerce_ast_value(&arg_def.arg_type, literal, variables, schema) {
                Ok(v) => {
                    if v.is_null() && arg_def.arg_type.is_non_null() {
                        return Err(FieldError::new(format!(
                            "Argument \"{arg_name}\" of non-null type \"{}\" must not be null.",
                            arg_def.arg_type
                        )));
                    }
                    out.insert(arg_name.clone(), v);
                }
                Err(e) => {
                    return Err(FieldError::new(format!(
                        "Argument \"{arg_name}\" has invalid value; {e}"
                    )))
                }
            },
            None => {
                if let Some(default) = &arg_def.default_value {
                    match coerce_ast_value(&arg_def.arg_type, default, variables, schema) {
                        Ok(v) => {
                            out.insert(arg_name.clone(), v);
                        }
                        Err(e) => return Err(FieldError::new(e)),
                    }
                } else if arg_def.arg_type.is_non_null() {
                    return Err(FieldError::new(format!(
                        "Argument \"{arg_name}\" of required type \"{}\" was not provided.",
                        arg_def.arg_type
                    )));
                }
            }
        }
    }

    Ok(out)
}
