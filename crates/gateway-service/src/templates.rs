//! Static in-process `TemplateStore` seeding the sample topic catalogue
//! (SPEC_FULL §12). A real deployment points `PromptRenderer` at an object
//! store addressed by `(topic_id, role, version)` (spec §6.4); this stands
//! in for that store the same way `InMemorySessionStore` stands in for a
//! persistent session table.

use async_trait::async_trait;
use gateway_core::prompt::TemplateStore;
use gateway_core::topic::PromptRole;
use std::collections::HashMap;

pub struct StaticTemplateStore {
    templates: HashMap<(String, &'static str), String>,
}

fn role_key(role: PromptRole) -> &'static str {
    match role {
        PromptRole::System => "SYSTEM",
        PromptRole::User => "USER",
        PromptRole::Resume => "RESUME",
        PromptRole::Initiation => "INITIATION",
    }
}

impl StaticTemplateStore {
    pub fn new() -> Self {
        let mut templates = HashMap::new();
        let mut insert = |topic_id: &str, role: PromptRole, text: &str| {
            templates.insert((topic_id.to_string(), role_key(role)), text.to_string());
        };

        insert(
            "niche_review",
            PromptRole::System,
            "You are a business-niche positioning reviewer. Respond only with the requested JSON.",
        );
        insert(
            "niche_review",
            PromptRole::User,
            "Current positioning statement: {current_value}\n\nSuggest exactly three refinements.",
        );

        insert(
            "alignment_check",
            PromptRole::System,
            "You check whether a business goal is aligned with its stated purpose. Respond only with the requested JSON.",
        );
        insert(
            "alignment_check",
            PromptRole::User,
            "Business purpose: {purpose}\nGoal: {goal_title}\n\nIs this goal aligned with the purpose?",
        );

        for (topic_id, noun) in [("core_values", "core values"), ("purpose", "purpose statement"), ("vision", "vision statement")] {
            insert(
                topic_id,
                PromptRole::System,
                &format!("You are a business coach guiding the owner toward a clear {noun}. Ask one focused question per turn."),
            );
            insert(
                topic_id,
                PromptRole::Initiation,
                "Open the session with a warm greeting and your first coaching question.",
            );
            insert(
                topic_id,
                PromptRole::Resume,
                "The owner is returning to this session. Conversation so far:\n{summary}\n\nWelcome them back and restate where you left off.",
            );
        }

        Self { templates }
    }
}

impl Default for StaticTemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemplateStore for StaticTemplateStore {
    async fn get_active_template(
        &self,
        topic_id: &str,
        role: PromptRole,
    ) -> Result<Option<String>, String> {
        Ok(self.templates.get(&(topic_id.to_string(), role_key(role))).cloned())
    }
}
