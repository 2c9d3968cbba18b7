//! Presence checks for incoming JSON bodies.
//!
//! Bodies arrive as untyped JSON so that missing or mistyped fields become
//! validation errors with our own messages, instead of deserializer errors.

use serde_json::{Map, Value};

use crate::error::{PocketError, PocketResult};

/// Unwrap a request body that must be a JSON object.
pub(crate) fn object(body: Value, message: &str) -> PocketResult<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(PocketError::Validation(message.to_string())),
    }
}

/// A field that must be a non-empty string.
pub(crate) fn required_str(
    fields: &mut Map<String, Value>,
    name: &str,
    message: &str,
) -> PocketResult<String> {
    match fields.remove(name) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        _ => Err(PocketError::Validation(format!("{message} ({name})"))),
    }
}

/// A field that may be absent or null, and is otherwise a string.
pub(crate) fn optional_str(
    fields: &mut Map<String, Value>,
    name: &str,
) -> PocketResult<Option<String>> {
    match fields.remove(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(PocketError::Validation(format!("{name} must be a string"))),
    }
}

/// A finite number, given either as a JSON number or as a numeric string.
pub(crate) fn required_number(
    fields: &mut Map<String, Value>,
    name: &str,
    message: &str,
) -> PocketResult<f64> {
    let parsed = match fields.remove(name) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| PocketError::Validation(format!("{message} ({name} must be a number)")))
}
