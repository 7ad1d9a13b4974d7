//! Named transforms (spec §3.2, §4.3 step 7) and COMPUTED parameter
//! evaluation (spec §4.3 step 8).

use crate::error::{GatewayError, Result};
use serde_json::Value;
use std::collections::HashMap;

pub fn apply(name: &str, value: &Value) -> Result<Value> {
    match name {
        "summarize_measures" => Ok(summarize_measures(value)),
        "join_values" => Ok(join_values(value)),
        other => Err(GatewayError::ParameterMalformed {
            name: other.to_string(),
            reason: "unknown transform".to_string(),
        }),
    }
}

fn summarize_measures(value: &Value) -> Value {
    match value.as_array() {
        Some(measures) => {
            let names: Vec<String> = measures
                .iter()
                .filter_map(|m| m.get("name").and_then(Value::as_str).map(str::to_string))
                .collect();
            Value::String(format!("{} measures tracked: {}", names.len(), names.join(", ")))
        }
        None => value.clone(),
    }
}

fn join_values(value: &Value) -> Value {
    match value.as_array() {
        Some(items) => {
            let joined = items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join(", ");
            Value::String(joined)
        }
        None => value.clone(),
    }
}

/// COMPUTED parameters may only reference parameters already present in
/// `context` (spec §4.3 step 8). The only computed parameter this gateway
/// ships today is `param_count`, used by diagnostics topics; unknown
/// computed names fail closed rather than silently returning null.
pub fn compute(name: &str, context: &HashMap<String, Value>) -> Result<Value> {
    match name {
        "param_count" => Ok(Value::from(context.len())),
        other => Err(GatewayError::ParameterMalformed {
            name: other.to_string(),
            reason: "unknown computed parameter".to_string(),
        }),
    }
}
