//! Argument validation against a tool's declared input schema
//!
//! Covers the subset of JSON Schema the tool definitions use: `type`,
//! `properties`, `required`, `enum` and array `items`. Unknown keywords are
//! ignored.

use serde_json::{Map, Value};

/// Validate `value` against `schema`
///
/// Returns a human-readable description of the first violation found.
pub fn validate(schema: &Value, value: &Value) -> Result<(), String> {
    validate_at(schema, value, "arguments")
}

fn validate_at(schema: &Value, value: &Value, path: &str) -> Result<(), String> {
    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !matches_type(expected, value) {
            return Err(format!(
                "{path}: expected {expected}, got {}",
                type_name(value)
            ));
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            return Err(format!("{path}: {value} is not one of {}", Value::from(allowed.clone())));
        }
    }

    match value {
        Value::Object(fields) => validate_object(schema, fields, path),
        Value::Array(items) => match schema.get("items") {
            Some(item_schema) => items.iter().enumerate().try_for_each(|(i, item)| {
                validate_at(item_schema, item, &format!("{path}[{i}]"))
            }),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

fn validate_object(schema: &Value, fields: &Map<String, Value>, path: &str) -> Result<(), String> {
    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    for key in required {
        if !fields.contains_key(key) {
            return Err(format!("{path}: missing required field '{key}'"));
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (key, field_schema) in properties {
        match fields.get(key) {
            // Optional fields may be sent as explicit nulls
            None | Some(Value::Null) => {}
            Some(field) => validate_at(field_schema, field, &format!("{path}.{key}"))?,
        }
    }
    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
