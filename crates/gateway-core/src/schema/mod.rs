//! Response Model Registry (spec §4.2): resolves a `response_model_ref` to
//! a `Schema` and validates a candidate LLM output against it.
//!
//! Schemas are a typed tree of field descriptors rather than a Rust sum
//! type: the engine is generic over topic outputs (spec §9, "Dynamic
//! dispatch over a registry of schemas" — second alternative), so callers
//! that need a concrete type parse the validated `serde_json::Value`
//! themselves.

pub mod catalog;

use crate::error::{GatewayError, Result};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub enum Schema {
    String { min_len: Option<usize>, max_len: Option<usize> },
    Integer { min: Option<i64>, max: Option<i64> },
    Number { min: Option<f64>, max: Option<f64> },
    Boolean,
    Timestamp,
    Array { items: Box<Schema>, min_len: Option<usize>, max_len: Option<usize> },
    Map { value: Box<Schema> },
    Object { fields: Vec<(String, Schema, bool)> },
    /// Tagged enumeration: one of a fixed set of string tags.
    Enum { variants: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub path: String,
    pub kind: String,
    pub expected: String,
    pub actual: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, kind: &str, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: kind.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<ValidationError> for GatewayError {
    fn from(e: ValidationError) -> Self {
        GatewayError::LLMOutputInvalid {
            path: e.path,
            expected: e.expected,
            actual: e.actual,
        }
    }
}

#[derive(Default)]
pub struct ResponseModelRegistry {
    schemas: HashMap<String, Schema>,
}

impl ResponseModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, schema: Schema) {
        self.schemas.insert(name.into(), schema);
    }

    pub fn get_schema(&self, name: &str) -> Result<&Schema> {
        self.schemas
            .get(name)
            .ok_or_else(|| GatewayError::ResponseModelNotFound(name.to_string()))
    }

    /// Strict validation: unknown object fields are rejected, nullable
    /// fields must be explicitly declared (an `Object` field marked
    /// optional may be `Value::Null` or absent), bounds on strings/numbers
    /// are enforced.
    pub fn validate(&self, schema: &Schema, value: &Value) -> std::result::Result<Value, ValidationError> {
        validate_at("$", schema, value)
    }
}

fn validate_at(path: &str, schema: &Schema, value: &Value) -> std::result::Result<Value, ValidationError> {
    match schema {
        Schema::String { min_len, max_len } => {
            let s = value
                .as_str()
                .ok_or_else(|| ValidationError::new(path, "type", "string", type_name(value)))?;
            if let Some(min) = min_len {
                if s.len() < *min {
                    return Err(ValidationError::new(path, "min_length", min.to_string(), s.len().to_string()));
                }
            }
            if let Some(max) = max_len {
                if s.len() > *max {
                    return Err(ValidationError::new(path, "max_length", max.to_string(), s.len().to_string()));
                }
            }
            Ok(value.clone())
        }
        Schema::Integer { min, max } => {
            let n = value
                .as_i64()
                .ok_or_else(|| ValidationError::new(path, "type", "integer", type_name(value)))?;
            if let Some(min) = min {
                if n < *min {
                    return Err(ValidationError::new(path, "min", min.to_string(), n.to_string()));
                }
            }
            if let Some(max) = max {
                if n > *max {
                    return Err(ValidationError::new(path, "max", max.to_string(), n.to_string()));
                }
            }
            Ok(value.clone())
        }
        Schema::Number { min, max } => {
            let n = value
                .as_f64()
                .ok_or_else(|| ValidationError::new(path, "type", "number", type_name(value)))?;
            if let Some(min) = min {
                if n < *min {
                    return Err(ValidationError::new(path, "min", min.to_string(), n.to_string()));
                }
            }
            if let Some(max) = max {
                if n > *max {
                    return Err(ValidationError::new(path, "max", max.to_string(), n.to_string()));
                }
            }
            Ok(value.clone())
        }
        Schema::Boolean => {
            if value.is_boolean() {
                Ok(value.clone())
            } else {
                Err(ValidationError::new(path, "type", "boolean", type_name(value)))
            }
        }
        Schema::Timestamp => {
            let s = value
                .as_str()
                .ok_or_else(|| ValidationError::new(path, "type", "ISO-8601 timestamp", type_name(value)))?;
            chrono::DateTime::parse_from_rfc3339(s)
                .map(|_| value.clone())
                .map_err(|_| ValidationError::new(path, "format", "ISO-8601 timestamp", s.to_string()))
        }
        Schema::Array { items, min_len, max_len } => {
            let arr = value
                .as_array()
                .ok_or_else(|| ValidationError::new(path, "type", "array", type_name(value)))?;
            if let Some(min) = min_len {
                if arr.len() < *min {
                    return Err(ValidationError::new(path, "min_items", min.to_string(), arr.len().to_string()));
                }
            }
            if let Some(max) = max_len {
                if arr.len() > *max {
                    return Err(ValidationError::new(path, "max_items", max.to_string(), arr.len().to_string()));
                }
            }
            let mut out = Vec::with_capacity(arr.len());
            for (i, item) in arr.iter().enumerate() {
                out.push(validate_at(&format!("{path}[{i}]"), items, item)?);
            }
            Ok(Value::Array(out))
        }
        Schema::Map { value: value_schema } => {
            let obj = value
                .as_object()
                .ok_or_else(|| ValidationError::new(path, "type", "map", type_name(value)))?;
            let mut out = serde_json::Map::with_capacity(obj.len());
            for (k, v) in obj {
                out.insert(k.clone(), validate_at(&format!("{path}.{k}"), value_schema, v)?);
            }
            Ok(Value::Object(out))
        }
        Schema::Object { fields } => {
            let obj = value
                .as_object()
                .ok_or_else(|| ValidationError::new(path, "type", "object", type_name(value)))?;
            let known: std::collections::HashSet<&str> = fields.iter().map(|(n, _, _)| n.as_str()).collect();
            for key in obj.keys() {
                if !known.contains(key.as_str()) {
                    return Err(ValidationError::new(format!("{path}.{key}"), "unknown_field", "<absent>", "present"));
                }
            }
            let mut out = serde_json::Map::with_capacity(fields.len());
            for (name, field_schema, nullable) in fields {
                let field_path = format!("{path}.{name}");
                match obj.get(name) {
                    None if *nullable => {
                        out.insert(name.clone(), Value::Null);
                    }
                    None => {
                        return Err(ValidationError::new(field_path, "required", "present", "absent"));
                    }
                    Some(Value::Null) if *nullable => {
                        out.insert(name.clone(), Value::Null);
                    }
                    Some(Value::Null) => {
                        return Err(ValidationError::new(field_path, "non_nullable", "non-null", "null"));
                    }
                    Some(v) => {
                        out.insert(name.clone(), validate_at(&field_path, field_schema, v)?);
                    }
                }
            }
            Ok(Value::Object(out))
        }
        Schema::Enum { variants } => {
            let s = value
                .as_str()
                .ok_or_else(|| ValidationError::new(path, "type", "enum tag", type_name(value)))?;
            if variants.iter().any(|v| v == s) {
                Ok(value.clone())
            } else {
                Err(ValidationError::new(path, "enum", variants.join("|"), s.to_string()))
            }
        }
    }
}

/// Renders a `Schema` as a JSON Schema object, for providers that support
/// constrained/structured output (Anthropic tool-use, OpenAI
/// `response_format: json_schema`). Bounds that JSON Schema can express
/// (`minLength`/`maxLength`/`minimum`/`maximum`/`minItems`/`maxItems`) are
/// carried over; `additionalProperties: false` mirrors the strict
/// unknown-field rejection in `validate_at`.
pub fn to_json_schema(schema: &Schema) -> Value {
    match schema {
        Schema::String { min_len, max_len } => {
            let mut obj = serde_json::json!({ "type": "string" });
            if let Some(min) = min_len {
                obj["minLength"] = serde_json::json!(min);
            }
            if let Some(max) = max_len {
                obj["maxLength"] = serde_json::json!(max);
            }
            obj
        }
        Schema::Integer { min, max } => {
            let mut obj = serde_json::json!({ "type": "integer" });
            if let Some(min) = min {
                obj["minimum"] = serde_json::json!(min);
            }
            if let Some(max) = max {
                obj["maximum"] = serde_json::json!(max);
            }
            obj
        }
        Schema::Number { min, max } => {
            let mut obj = serde_json::json!({ "type": "number" });
            if let Some(min) = min {
                obj["minimum"] = serde_json::json!(min);
            }
            if let Some(max) = max {
                obj["maximum"] = serde_json::json!(max);
            }
            obj
        }
        Schema::Boolean => serde_json::json!({ "type": "boolean" }),
        Schema::Timestamp => serde_json::json!({ "type": "string", "format": "date-time" }),
        Schema::Array { items, min_len, max_len } => {
            let mut obj = serde_json::json!({ "type": "array", "items": to_json_schema(items) });
            if let Some(min) = min_len {
                obj["minItems"] = serde_json::json!(min);
            }
            if let Some(max) = max_len {
                obj["maxItems"] = serde_json::json!(max);
            }
            obj
        }
        Schema::Map { value } => serde_json::json!({
            "type": "object",
            "additionalProperties": to_json_schema(value),
        }),
        Schema::Object { fields } => {
            let mut properties = serde_json::Map::new();
            let mut required = Vec::new();
            for (name, field_schema, nullable) in fields {
                properties.insert(name.clone(), to_json_schema(field_schema));
                if !nullable {
                    required.push(Value::String(name.clone()));
                }
            }
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            })
        }
        Schema::Enum { variants } => serde_json::json!({ "type": "string", "enum": variants }),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn niche_review_schema() -> Schema {
        Schema::Object {
            fields: vec![(
                "suggestions".to_string(),
                Schema::Array {
                    items: Box::new(Schema::Object {
                        fields: vec![
                            ("text".to_string(), Schema::String { min_len: Some(1), max_len: None }, false),
                            ("reasoning".to_string(), Schema::String { min_len: Some(1), max_len: None }, false),
                        ],
                    }),
                    min_len: Some(3),
                    max_len: Some(3),
                },
                false,
            )],
        }
    }

    #[test]
    fn validates_niche_review_shape() {
        let registry = {
            let mut r = ResponseModelRegistry::new();
            r.register("NicheReviewResult", niche_review_schema());
            r
        };
        let schema = registry.get_schema("NicheReviewResult").unwrap();
        let value = serde_json::json!({
            "suggestions": [
                {"text": "a", "reasoning": "x"},
                {"text": "b", "reasoning": "y"},
                {"text": "c", "reasoning": "z"},
            ]
        });
        assert!(registry.validate(schema, &value).is_ok());
    }

    #[test]
    fn rejects_unknown_fields() {
        let mut registry = ResponseModelRegistry::new();
        registry.register(
            "Simple",
            Schema::Object {
                fields: vec![("a".to_string(), Schema::String { min_len: None, max_len: None }, false)],
            },
        );
        let schema = registry.get_schema("Simple").unwrap();
        let value = serde_json::json!({"a": "ok", "b": "surprise"});
        let err = registry.validate(schema, &value).unwrap_err();
        assert_eq!(err.kind, "unknown_field");
    }

    #[test]
    fn rejects_wrong_count() {
        let mut registry = ResponseModelRegistry::new();
        registry.register("NicheReviewResult", niche_review_schema());
        let schema = registry.get_schema("NicheReviewResult").unwrap();
        let value = serde_json::json!({"suggestions": [{"text": "a", "reasoning": "x"}]});
        assert!(registry.validate(schema, &value).is_err());
    }
}
