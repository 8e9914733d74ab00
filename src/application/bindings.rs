//! Validation of `NAME=VALUE` assignments supplied on the command line.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{EvaluationContext, Value};

use super::error::AppError;
use super::placeholder::is_placeholder_key;

static VARIABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("variable name pattern is valid"));

const RESERVED_NAMES: [&str; 2] = ["true", "false"];

/// Bind each assignment into `context`, inferring the value type.
///
/// Names must be plain identifiers the engine can reference.
pub fn bind_variables<I>(context: &mut EvaluationContext, assignments: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (name, raw) in assignments {
        if !VARIABLE_NAME.is_match(&name) || RESERVED_NAMES.contains(&name.as_str()) {
            return Err(AppError::validation(format!(
                "`{name}` is not a valid variable name"
            )));
        }
        context.insert(name, Value::infer(&raw));
    }
    Ok(())
}

/// Collect placeholder values keyed by the token name used inside `%...%`.
pub fn collect_placeholders<I>(assignments: I) -> Result<HashMap<String, String>, AppError>
where
    I: IntoIterator<Item = (String, String)>,
{
    assignments
        .into_iter()
        .map(|(key, value)| {
            if is_placeholder_key(&key) {
                Ok((key, value))
            } else {
                Err(AppError::validation(format!(
                    "`{key}` cannot appear inside a %placeholder% token"
                )))
            }
        })
        .collect()
}
