//! Seed data for the static topic catalogue (spec §12, supplementing the
//! registry shape spec.md §3.1/§4.1 describes but does not itself seed).

use super::types::{
    ParameterDef, ParameterSource, RuntimeConfig, Topic, TopicCategory, TopicType,
};
use std::time::Duration;

fn param(
    name: &str,
    source: ParameterSource,
    extraction_path: Option<&str>,
    required: bool,
    default: Option<serde_json::Value>,
) -> ParameterDef {
    ParameterDef {
        name: name.to_string(),
        source,
        extraction_path: extraction_path.map(str::to_string),
        required,
        default,
        transform: None,
    }
}

/// The full sample catalogue served by the gateway. Lives here (rather
/// than only in `gateway-service`) so tests in this crate can exercise the
/// registry against realistic topics without depending on the binary.
pub fn sample_topics() -> Vec<Topic> {
    vec![
        Topic {
            topic_id: "niche_review".to_string(),
            topic_type: TopicType::SingleShot,
            category: TopicCategory::Analysis,
            description: "Suggests niche positioning refinements from a current value statement."
                .to_string(),
            response_model_ref: "NicheReviewResult".to_string(),
            parameter_refs: vec![param(
                "current_value",
                ParameterSource::Request,
                None,
                true,
                None,
            )],
            is_active: true,
            runtime_config: RuntimeConfig {
                model_code: "local:default-chat".to_string(),
                temperature: 0.7,
                max_tokens: 1024,
                timeout: Some(Duration::from_secs(30)),
                idle_timeout: None,
                max_turns: None,
            },
        },
        Topic {
            topic_id: "alignment_check".to_string(),
            topic_type: TopicType::SingleShot,
            category: TopicCategory::StrategicPlanning,
            description: "Checks whether a goal is aligned with the business' stated purpose."
                .to_string(),
            response_model_ref: "AlignmentCheckResult".to_string(),
            parameter_refs: vec![
                param(
                    "goal_id",
                    ParameterSource::Request,
                    None,
                    true,
                    None,
                ),
                param(
                    "goal_title",
                    ParameterSource::Goal,
                    Some("title"),
                    true,
                    None,
                ),
                param(
                    "purpose",
                    ParameterSource::Onboarding,
                    Some("purpose"),
                    false,
                    Some(serde_json::Value::String(String::new())),
                ),
            ],
            is_active: true,
            runtime_config: RuntimeConfig {
                model_code: "local:default-chat".to_string(),
                temperature: 0.3,
                max_tokens: 512,
                timeout: Some(Duration::from_secs(30)),
                idle_timeout: None,
                max_turns: None,
            },
        },
        Topic {
            topic_id: "core_values".to_string(),
            topic_type: TopicType::ConversationCoaching,
            category: TopicCategory::Coaching,
            description: "Multi-turn coaching session that surfaces the business' core values."
                .to_string(),
            response_model_ref: "CoreValuesResult".to_string(),
            parameter_refs: vec![param(
                "industry",
                ParameterSource::Onboarding,
                Some("industry"),
                false,
                Some(serde_json::Value::String("general".to_string())),
            )],
            is_active: true,
            runtime_config: RuntimeConfig {
                model_code: "local:default-chat".to_string(),
                temperature: 0.8,
                max_tokens: 1024,
                timeout: Some(Duration::from_secs(60)),
                idle_timeout: Some(Duration::from_secs(30 * 60)),
                max_turns: Some(8),
            },
        },
        Topic {
            topic_id: "purpose".to_string(),
            topic_type: TopicType::ConversationCoaching,
            category: TopicCategory::Coaching,
            description: "Multi-turn coaching session that drafts a purpose statement."
                .to_string(),
            response_model_ref: "PurposeResult".to_string(),
            parameter_refs: vec![],
            is_active: true,
            runtime_config: RuntimeConfig {
                model_code: "local:default-chat".to_string(),
                temperature: 0.8,
                max_tokens: 1024,
                timeout: Some(Duration::from_secs(60)),
                idle_timeout: Some(Duration::from_secs(30 * 60)),
                max_turns: Some(8),
            },
        },
        Topic {
            topic_id: "vision".to_string(),
            topic_type: TopicType::ConversationCoaching,
            category: TopicCategory::Coaching,
            description: "Multi-turn coaching session that drafts a long-range vision statement."
                .to_string(),
            response_model_ref: "VisionResult".to_string(),
            parameter_refs: vec![],
            is_active: true,
            runtime_config: RuntimeConfig {
                model_code: "local:default-chat".to_string(),
                temperature: 0.8,
                max_tokens: 1024,
                timeout: Some(Duration::from_secs(60)),
                idle_timeout: Some(Duration::from_secs(30 * 60)),
                max_turns: Some(10),
            },
        },
    ]
}
