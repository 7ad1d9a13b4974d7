use super::types::{RuntimeConfig, Topic, TopicFilter, TopicType};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Key/value store for per-`topic_id` runtime config overrides. Seeded and
/// updated by out-of-scope administrative flows (spec §3.1); the registry
/// only reads it.
#[async_trait]
pub trait RuntimeConfigStore: Send + Sync {
    async fn get_override(&self, topic_id: &str) -> std::result::Result<Option<RuntimeConfig>, String>;
}

/// A store with no overrides; every topic runs on its static config.
pub struct NoopRuntimeConfigStore;

#[async_trait]
impl RuntimeConfigStore for NoopRuntimeConfigStore {
    async fn get_override(&self, _topic_id: &str) -> std::result::Result<Option<RuntimeConfig>, String> {
        Ok(None)
    }
}

/// Static catalogue loaded at process initialization (spec §3.1, §4.1).
/// Immutable at runtime: readers need no locks (spec §5).
pub struct TopicRegistry {
    topics: HashMap<String, Topic>,
    order: Vec<String>,
    override_store: Arc<dyn RuntimeConfigStore>,
    override_cache: Cache<String, Arc<RuntimeConfig>>,
}

const RUNTIME_CONFIG_TTL: Duration = Duration::from_secs(5 * 60);

impl TopicRegistry {
    pub fn new(topics: Vec<Topic>, override_store: Arc<dyn RuntimeConfigStore>) -> Result<Self> {
        let mut map = HashMap::with_capacity(topics.len());
        let mut order = Vec::with_capacity(topics.len());
        for topic in topics {
            topic.validate().map_err(GatewayError::Internal)?;
            if map.insert(topic.topic_id.clone(), topic.clone()).is_some() {
                return Err(GatewayError::Internal(format!(
                    "duplicate topic_id in registry: {}",
                    topic.topic_id
                )));
            }
            order.push(topic.topic_id);
        }
        Ok(Self {
            topics: map,
            order,
            override_store,
            override_cache: Cache::builder().time_to_live(RUNTIME_CONFIG_TTL).build(),
        })
    }

    pub fn get(&self, topic_id: &str) -> Result<&Topic> {
        let topic = self
            .topics
            .get(topic_id)
            .ok_or_else(|| GatewayError::TopicNotFound(topic_id.to_string()))?;
        if !topic.is_active {
            return Err(GatewayError::TopicInactive(topic_id.to_string()));
        }
        Ok(topic)
    }

    /// Looks a topic up without the active-gate, for admin-style listing.
    pub fn get_raw(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.get(topic_id)
    }

    /// Listing is `/ai/topics`-only discoverable when `is_active`, per the
    /// open question resolved in spec §9.
    pub fn list(&self, filter: &TopicFilter) -> Vec<&Topic> {
        self.order
            .iter()
            .filter_map(|id| self.topics.get(id))
            .filter(|t| !filter.active_only || t.is_active)
            .filter(|t| filter.topic_type.map(|ty| ty == t.topic_type).unwrap_or(true))
            .filter(|t| filter.category.map(|c| c == t.category).unwrap_or(true))
            .collect()
    }

    /// Combines the static definition with a cached key/value-store
    /// override (5-minute TTL). On store failure, falls back to the static
    /// definition with a logged warning — runtime-config failures are
    /// non-fatal (spec §4.1).
    pub async fn merge_runtime_config(&self, topic_id: &str) -> Result<RuntimeConfig> {
        let topic = self.get(topic_id)?;
        if let Some(cached) = self.override_cache.get(topic_id).await {
            return Ok((*cached).clone());
        }

        let effective = match self.override_store.get_override(topic_id).await {
            Ok(Some(over)) => over,
            Ok(None) => topic.runtime_config.clone(),
            Err(cause) => {
                tracing::warn!(topic_id, error = %cause, "runtime config store unavailable, using static definition");
                topic.runtime_config.clone()
            }
        };

        self.override_cache
            .insert(topic_id.to_string(), Arc::new(effective.clone()))
            .await;
        Ok(effective)
    }

    pub fn assert_single_shot(&self, topic: &Topic) -> Result<()> {
        if topic.topic_type != TopicType::SingleShot {
            return Err(GatewayError::WrongTopicType(format!(
                "{} is not a single-shot topic",
                topic.topic_id
            )));
        }
        Ok(())
    }

    pub fn assert_conversation(&self, topic: &Topic) -> Result<()> {
        if topic.topic_type != TopicType::ConversationCoaching {
            return Err(GatewayError::WrongTopicType(format!(
                "{} is not a conversation topic",
                topic.topic_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::types::TopicCategory;

    fn topic(topic_id: &str, topic_type: TopicType, is_active: bool) -> Topic {
        Topic {
            topic_id: topic_id.to_string(),
            topic_type,
            category: TopicCategory::Analysis,
            description: "test topic".to_string(),
            response_model_ref: "niche_review".to_string(),
            parameter_refs: vec![],
            is_active,
            runtime_config: RuntimeConfig {
                model_code: "local:echo".to_string(),
                temperature: 0.7,
                max_tokens: 256,
                timeout: None,
                idle_timeout: None,
                max_turns: if topic_type == TopicType::ConversationCoaching {
                    Some(5)
                } else {
                    None
                },
            },
        }
    }

    struct FixedOverrideStore(std::result::Result<Option<RuntimeConfig>, String>);

    #[async_trait]
    impl RuntimeConfigStore for FixedOverrideStore {
        async fn get_override(&self, _topic_id: &str) -> std::result::Result<Option<RuntimeConfig>, String> {
            self.0.clone()
        }
    }

    #[test]
    fn rejects_duplicate_topic_id() {
        let topics = vec![
            topic("niche_review", TopicType::SingleShot, true),
            topic("niche_review", TopicType::SingleShot, true),
        ];
        let err = TopicRegistry::new(topics, Arc::new(NoopRuntimeConfigStore)).unwrap_err();
        assert!(matches!(err, GatewayError::Internal(_)));
    }

    #[test]
    fn rejects_conversation_topic_without_max_turns() {
        let mut bad = topic("purpose", TopicType::ConversationCoaching, true);
        bad.runtime_config.max_turns = None;
        let err = TopicRegistry::new(vec![bad], Arc::new(NoopRuntimeConfigStore)).unwrap_err();
        assert!(matches!(err, GatewayError::Internal(_)));
    }

    #[test]
    fn get_hides_inactive_topic_but_get_raw_finds_it() {
        let topics = vec![topic("niche_review", TopicType::SingleShot, false)];
        let registry = TopicRegistry::new(topics, Arc::new(NoopRuntimeConfigStore)).unwrap();

        assert!(matches!(
            registry.get("niche_review"),
            Err(GatewayError::TopicInactive(_))
        ));
        assert!(registry.get_raw("niche_review").is_some());
        assert!(matches!(
            registry.get("missing"),
            Err(GatewayError::TopicNotFound(_))
        ));
    }

    #[test]
    fn list_filters_by_type_category_and_active_only() {
        let topics = vec![
            topic("niche_review", TopicType::SingleShot, true),
            topic("purpose", TopicType::ConversationCoaching, true),
            topic("vision", TopicType::ConversationCoaching, false),
        ];
        let registry = TopicRegistry::new(topics, Arc::new(NoopRuntimeConfigStore)).unwrap();

        let all = registry.list(&TopicFilter::default());
        assert_eq!(all.len(), 3);

        let active_only = registry.list(&TopicFilter {
            active_only: true,
            ..Default::default()
        });
        assert_eq!(active_only.len(), 2);

        let conversations = registry.list(&TopicFilter {
            topic_type: Some(TopicType::ConversationCoaching),
            ..Default::default()
        });
        assert_eq!(conversations.len(), 2);
    }

    #[test]
    fn assert_single_shot_and_conversation_reject_the_wrong_type() {
        let topics = vec![
            topic("niche_review", TopicType::SingleShot, true),
            topic("purpose", TopicType::ConversationCoaching, true),
        ];
        let registry = TopicRegistry::new(topics, Arc::new(NoopRuntimeConfigStore)).unwrap();
        let single = registry.get("niche_review").unwrap();
        let conversation = registry.get("purpose").unwrap();

        assert!(registry.assert_single_shot(single).is_ok());
        assert!(matches!(
            registry.assert_single_shot(conversation),
            Err(GatewayError::WrongTopicType(_))
        ));
        assert!(registry.assert_conversation(conversation).is_ok());
        assert!(matches!(
            registry.assert_conversation(single),
            Err(GatewayError::WrongTopicType(_))
        ));
    }

    #[tokio::test]
    async fn merge_runtime_config_prefers_store_override() {
        let topics = vec![topic("niche_review", TopicType::SingleShot, true)];
        let mut overridden = topics[0].runtime_config.clone();
        overridden.model_code = "anthropic:claude-override".to_string();
        let store: Arc<dyn RuntimeConfigStore> = Arc::new(FixedOverrideStore(Ok(Some(overridden))));
        let registry = TopicRegistry::new(topics, store).unwrap();

        let effective = registry.merge_runtime_config("niche_review").await.unwrap();
        assert_eq!(effective.model_code, "anthropic:claude-override");
    }

    #[tokio::test]
    async fn merge_runtime_config_falls_back_to_static_on_store_error() {
        let topics = vec![topic("niche_review", TopicType::SingleShot, true)];
        let static_model = topics[0].runtime_config.model_code.clone();
        let store: Arc<dyn RuntimeConfigStore> = Arc::new(FixedOverrideStore(Err("unavailable".to_string())));
        let registry = TopicRegistry::new(topics, store).unwrap();

        let effective = registry.merge_runtime_config("niche_review").await.unwrap();
        assert_eq!(effective.model_code, static_model);
    }

    #[tokio::test]
    async fn merge_runtime_config_falls_back_to_static_when_no_override() {
        let topics = vec![topic("niche_review", TopicType::SingleShot, true)];
        let static_model = topics[0].runtime_config.model_code.clone();
        let registry = TopicRegistry::new(topics, Arc::new(NoopRuntimeConfigStore)).unwrap();

        let effective = registry.merge_runtime_config("niche_review").await.unwrap();
        assert_eq!(effective.model_code, static_model);
    }
}
