//! Prompt Storage & Rendering (spec §4.4).
//!
//! Templates are content-addressed by `(topic_id, role, version)` in an
//! object store; the engine always reads the active version pointed to by
//! the runtime config, cached for 5 minutes — the same read-mostly TTL
//! cache posture as the topic registry's runtime-config overrides.

use crate::error::{GatewayError, Result};
use crate::topic::PromptRole;
use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_active_template(
        &self,
        topic_id: &str,
        role: PromptRole,
    ) -> std::result::Result<Option<String>, String>;
}

const TEMPLATE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

pub struct PromptRenderer {
    store: Box<dyn TemplateStore>,
    cache: Cache<(String, &'static str), std::sync::Arc<String>>,
}

fn role_key(role: PromptRole) -> &'static str {
    match role {
        PromptRole::System => "SYSTEM",
        PromptRole::User => "USER",
        PromptRole::Resume => "RESUME",
        PromptRole::Initiation => "INITIATION",
    }
}

impl PromptRenderer {
    pub fn new(store: Box<dyn TemplateStore>) -> Self {
        Self {
            store,
            cache: Cache::builder().time_to_live(TEMPLATE_CACHE_TTL).build(),
        }
    }

    pub async fn get_template(&self, topic_id: &str, role: PromptRole) -> Result<String> {
        let cache_key = (topic_id.to_string(), role_key(role));
        if let Some(cached) = self.cache.get(&cache_key).await {
            return Ok((*cached).clone());
        }

        let template = self
            .store
            .get_active_template(topic_id, role)
            .await
            .map_err(|cause| GatewayError::SourceUnavailable {
                source: "template_store".to_string(),
                cause,
            })?
            .ok_or_else(|| GatewayError::TemplateNotFound {
                topic_id: topic_id.to_string(),
                role: role_key(role).to_string(),
            })?;

        self.cache
            .insert(cache_key, std::sync::Arc::new(template.clone()))
            .await;
        Ok(template)
    }

    /// Variable substitution using `{name}` placeholders. A placeholder
    /// with no matching context entry fails with `TemplateUnresolved`.
    pub fn render(&self, template: &str, context: &HashMap<String, Value>) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after_open = &rest[open + 1..];
            match after_open.find('}') {
                Some(close) if is_identifier(&after_open[..close]) => {
                    let name = &after_open[..close];
                    match context.get(name) {
                        Some(v) => out.push_str(&value_to_text(v)),
                        None => return Err(GatewayError::TemplateUnresolved(name.to_string())),
                    }
                    rest = &after_open[close + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after_open;
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_placeholders() {
        let mut ctx = HashMap::new();
        ctx.insert("name".to_string(), Value::String("Ada".to_string()));
        let renderer = test_renderer();
        let out = renderer.render("Hello {name}!", &ctx).unwrap();
        assert_eq!(out, "Hello Ada!");
    }

    #[test]
    fn fails_on_unresolved_placeholder() {
        let ctx = HashMap::new();
        let renderer = test_renderer();
        let err = renderer.render("Hello {missing}!", &ctx).unwrap_err();
        matches!(err, GatewayError::TemplateUnresolved(_));
    }

    struct NoopStore;
    #[async_trait]
    impl TemplateStore for NoopStore {
        async fn get_active_template(
            &self,
            _topic_id: &str,
            _role: PromptRole,
        ) -> std::result::Result<Option<String>, String> {
            Ok(None)
        }
    }

    fn test_renderer() -> PromptRenderer {
        PromptRenderer::new(Box::new(NoopStore))
    }
}
