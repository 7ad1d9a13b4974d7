//! Parameter Enrichment Pipeline (spec §4.3).
//!
//! Takes `(topic, request_parameters, caller)` and produces a
//! `rendered_context` map keyed by parameter name, following the
//! algorithm in spec §4.3 step by step:
//!
//! 1. collect parameter definitions from the topic
//! 2. partition by source
//! 3. fail early on missing required REQUEST parameters
//! 4. one fetch per non-REQUEST source group
//! 5. fetches run concurrently, each with its own timeout
//! 6. apply extraction paths, defaults, required-ness
//! 7. apply transforms in registration order
//! 8. compute COMPUTED parameters last, in declared order
//! 9. return the merged context

use crate::error::{GatewayError, Result};
use crate::topic::{ParameterDef, ParameterSource, Topic};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub mod sources;
pub mod transform;

pub use sources::{CallerContext, EnrichmentSources, SourceFetcher, SourcePayload};

const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Traverses a dotted path (`a.b.c`) over nested maps/arrays. A missing
/// intermediate mapping or an out-of-range array index both produce
/// `Value::Null` rather than erroring (spec §4.3, tie-breaks).
pub fn extract_path(value: &Value, path: &str) -> Value {
    let mut current = value;
    for segment in path.split('.') {
        match current {
            Value::Object(map) => match map.get(segment) {
                Some(v) => current = v,
                None => return Value::Null,
            },
            Value::Array(arr) => match segment.parse::<usize>().ok().and_then(|i| arr.get(i)) {
                Some(v) => current = v,
                None => return Value::Null,
            },
            _ => return Value::Null,
        }
    }
    current.clone()
}

pub struct EnrichmentPipeline<'a> {
    pub sources: &'a EnrichmentSources,
}

impl<'a> EnrichmentPipeline<'a> {
    pub fn new(sources: &'a EnrichmentSources) -> Self {
        Self { sources }
    }

    pub async fn run(
        &self,
        topic: &Topic,
        request_parameters: &HashMap<String, Value>,
        caller: &CallerContext,
        conversation_context: Option<&Value>,
    ) -> Result<HashMap<String, Value>> {
        // Step 1-3: REQUEST parameters are read directly; fail fast.
        let mut context: HashMap<String, Value> = HashMap::new();
        for param in &topic.parameter_refs {
            if param.source == ParameterSource::Request {
                match request_parameters.get(&param.name) {
                    Some(v) => {
                        context.insert(param.name.clone(), v.clone());
                    }
                    None if param.required => {
                        return Err(GatewayError::MissingParameter {
                            name: param.name.clone(),
                            source: None,
                        });
                    }
                    None => {
                        context.insert(
                            param.name.clone(),
                            param.default.clone().unwrap_or(Value::Null),
                        );
                    }
                }
            }
        }

        // Step 2: partition the remaining (fetched) parameters by source.
        let mut groups: HashMap<ParameterSource, Vec<&ParameterDef>> = HashMap::new();
        for param in &topic.parameter_refs {
            if param.source.is_fetched() {
                groups.entry(param.source).or_default().push(param);
            }
        }

        // Step 4-5: exactly one fetch per source group, concurrently.
        // CONVERSATION never goes over the wire: it resolves from the
        // session's own accumulated messages (spec §4.3, last bullet).
        let selector = selector_from_request(request_parameters);
        let network_sources: Vec<ParameterSource> = groups
            .keys()
            .copied()
            .filter(|s| *s != ParameterSource::Conversation)
            .collect();
        let fetch_futures = network_sources.iter().copied().map(|source| {
            let selector = selector.clone();
            async move {
                let result = tokio::time::timeout(
                    DEFAULT_SOURCE_TIMEOUT,
                    self.sources.fetch(source, caller, selector.as_deref()),
                )
                .await;
                (source, result)
            }
        });
        let fetched = futures::future::join_all(fetch_futures).await;

        let mut payloads: HashMap<ParameterSource, SourcePayload> = HashMap::new();
        for (source, result) in fetched {
            match result {
                Err(_) => return Err(GatewayError::SourceTimeout(source_name(source))),
                Ok(Err(cause)) => {
                    return Err(GatewayError::SourceUnavailable {
                        source: source_name(source),
                        cause,
                    })
                }
                Ok(Ok(payload)) => {
                    payloads.insert(source, payload);
                }
            }
        }
        if groups.contains_key(&ParameterSource::Conversation) {
            let value = conversation_context.cloned().unwrap_or(Value::Null);
            let payload = if value.is_null() {
                SourcePayload::empty()
            } else {
                SourcePayload::present(value)
            };
            payloads.insert(ParameterSource::Conversation, payload);
        }

        // Step 6: extraction, defaults, required-ness, per source group.
        for (source, params) in &groups {
            let payload = payloads.get(source).expect("fetched above");
            let is_empty = payload.is_empty();
            for param in params {
                let extracted = param
                    .extraction_path
                    .as_deref()
                    .map(|path| extract_path(&payload.value, path))
                    .unwrap_or_else(|| payload.value.clone());

                if is_empty || extracted.is_null() {
                    if param.required {
                        if is_empty {
                            return Err(GatewayError::SourceEmpty(source_name(*source)));
                        }
                        return Err(GatewayError::MissingParameter {
                            name: param.name.clone(),
                            source: Some(source_name(*source)),
                        });
                    }
                    context.insert(
                        param.name.clone(),
                        param.default.clone().unwrap_or(Value::Null),
                    );
                } else {
                    context.insert(param.name.clone(), extracted);
                }
            }
        }

        // Step 7: transforms, in the order parameters were declared.
        for param in &topic.parameter_refs {
            if let Some(transform_name) = &param.transform {
                if let Some(current) = context.get(&param.name).cloned() {
                    let transformed = transform::apply(transform_name, &current)?;
                    context.insert(param.name.clone(), transformed);
                }
            }
        }

        // Step 8: COMPUTED parameters, in declared order, may only
        // reference earlier parameters (already in `context`).
        for param in &topic.parameter_refs {
            if param.source == ParameterSource::Computed {
                let computed = transform::compute(&param.name, &context)?;
                context.insert(param.name.clone(), computed);
            }
        }

        Ok(context)
    }
}

fn selector_from_request(request_parameters: &HashMap<String, Value>) -> Option<String> {
    for key in ["goal_id", "measure_id", "action_id", "issue_id", "url"] {
        if let Some(Value::String(s)) = request_parameters.get(key) {
            return Some(s.clone());
        }
    }
    None
}

pub fn source_name(source: ParameterSource) -> String {
    format!("{source:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_path_traverses_nested_object() {
        let value = serde_json::json!({"a": {"b": {"c": 42}}});
        assert_eq!(extract_path(&value, "a.b.c"), serde_json::json!(42));
    }

    #[test]
    fn extract_path_missing_intermediate_is_null() {
        let value = serde_json::json!({"a": {}});
        assert_eq!(extract_path(&value, "a.b.c"), Value::Null);
    }

    #[test]
    fn extract_path_array_out_of_range_is_null() {
        let value = serde_json::json!({"a": [1, 2]});
        assert_eq!(extract_path(&value, "a.5"), Value::Null);
    }
}
