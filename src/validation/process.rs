// Coercion steps shared by validator chains. Query-string values always
// arrive as strings, body values as whatever JSON type the client sent;
// steps normalize both into one shape before lookups run.

use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::validation::errors;

/// Coerce a JSON number or numeric string into an i64 value.
pub fn int(value: Value) -> Result<Value, ApiError> {
    match &value {
        Value::Number(number) => {
            if let Some(n) = number.as_i64() {
                return Ok(json!(n));
            }
        }
        Value::String(text) => {
            if let Ok(n) = text.trim().parse::<i64>() {
                return Ok(json!(n));
            }
        }
        _ => {}
    }
    Err(errors::NOT_AN_INT.with(&[("value", &plain(&value))]))
}

/// Require a JSON string, passing it through unchanged.
pub fn string(value: Value) -> Result<Value, ApiError> {
    match value {
        Value::String(_) => Ok(value),
        other => Err(errors::NOT_A_STRING.with(&[("value", &plain(&other))])),
    }
}

/// String content without JSON quoting, for error messages.
fn plain(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
