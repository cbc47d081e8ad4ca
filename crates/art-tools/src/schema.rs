//! A minimal JSON-Schema-subset validator.
//!
//! The core does not parse schemas generated by the design-time IDL
//! compiler (that's out of scope, spec §1) — but it does need to gate
//! already-decoded tool payloads against the subset of JSON Schema that
//! covers spec §8 testable property 5: missing required fields, wrong
//! types, and min/max/enum/length/pattern constraint violations.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate `value` against `schema` (a JSON-Schema-shaped object),
/// returning every violation found (not just the first).
pub fn validate(schema: &Value, value: &Value) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    validate_at("$", schema, value, &mut errors);
    errors
}

fn validate_at(path: &str, schema: &Value, value: &Value, errors: &mut Vec<ValidationError>) {
    let Some(schema_obj) = schema.as_object() else {
        return;
    };

    if let Some(ty) = schema_obj.get("type").and_then(Value::as_str) {
        if !type_matches(ty, value) {
            errors.push(ValidationError {
                path: path.to_string(),
                message: format!("expected type {ty}, got {}", type_name(value)),
            });
            return;
        }
    }

    if let Some(allowed) = schema_obj.get("enum").and_then(Value::as_array) {
        if !allowed.iter().any(|v| v == value) {
            errors.push(ValidationError {
                path: path.to_string(),
                message: format!("value not in enum {allowed:?}"),
            });
        }
    }

    match value {
        Value::Object(obj) => {
            if let Some(required) = schema_obj.get("required").and_then(Value::as_array) {
                for req in required {
                    if let Some(name) = req.as_str() {
                        if !obj.contains_key(name) {
                            errors.push(ValidationError {
                                path: format!("{path}.{name}"),
                                message: "missing required field".into(),
                            });
                        }
                    }
                }
            }
            if let Some(props) = schema_obj.get("properties").and_then(Value::as_object) {
                for (name, sub_schema) in props {
                    if let Some(v) = obj.get(name) {
                        validate_at(&format!("{path}.{name}"), sub_schema, v, errors);
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema_obj.get("items") {
                for (i, item) in items.iter().enumerate() {
                    validate_at(&format!("{path}[{i}]"), item_schema, item, errors);
                }
            }
            if let Some(min) = schema_obj.get("minItems").and_then(Value::as_u64) {
                if (items.len() as u64) < min {
                    errors.push(ValidationError {
                        path: path.to_string(),
                        message: format!("expected at least {min} items"),
                    });
                }
            }
        }
        Value::String(s) => {
            if let Some(min) = schema_obj.get("minLength").and_then(Value::as_u64) {
                if (s.chars().count() as u64) < min {
                    errors.push(ValidationError {
                        path: path.to_string(),
                        message: format!("shorter than minLength {min}"),
                    });
                }
            }
            if let Some(max) = schema_obj.get("maxLength").and_then(Value::as_u64) {
                if (s.chars().count() as u64) > max {
                    errors.push(ValidationError {
                        path: path.to_string(),
                        message: format!("longer than maxLength {max}"),
                    });
                }
            }
            if let Some(pattern) = schema_obj.get("pattern").and_then(Value::as_str) {
                match regex::Regex::new(pattern) {
                    Ok(re) if !re.is_match(s) => errors.push(ValidationError {
                        path: path.to_string(),
                        message: format!("does not match pattern {pattern}"),
                    }),
                    Err(e) => errors.push(ValidationError {
                        path: path.to_string(),
                        message: format!("invalid pattern {pattern}: {e}"),
                    }),
                    _ => {}
                }
            }
        }
        Value::Number(n) => {
            if let Some(min) = schema_obj.get("minimum").and_then(Value::as_f64) {
                if n.as_f64().unwrap_or(f64::NAN) < min {
                    errors.push(ValidationError {
                        path: path.to_string(),
                        message: format!("below minimum {min}"),
                    });
                }
            }
            if let Some(max) = schema_obj.get("maximum").and_then(Value::as_f64) {
                if n.as_f64().unwrap_or(f64::NAN) > max {
                    errors.push(ValidationError {
                        path: path.to_string(),
                        message: format!("above maximum {max}"),
                    });
                }
            }
        }
        _ => {}
    }
}

fn type_matches(ty: &str, value: &Value) -> bool {
    match ty {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
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
