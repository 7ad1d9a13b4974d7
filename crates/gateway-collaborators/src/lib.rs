//! Collaborator contracts consumed (spec §6.3): downstream Business
//! Foundation, Goals, Strategies, Measures, Actions, Issues, and Website
//! retrieval. Only the data contracts the enrichers depend on are modeled
//! here; the downstream services themselves are out of scope.

pub mod clients;
pub mod error;
pub mod fakes;
pub mod http;
pub mod sources;

pub use clients::{
    ActionsClient, BusinessFoundationClient, GoalsClient, IssuesClient, MeasuresClient,
    StrategiesClient, WebsiteClient,
};
pub use error::CollaboratorError;
pub use fakes::{FakeBusinessFoundationClient, FakeKeyedClient, FakeListClient, FakeWebsiteClient};
pub use http::{
    HttpActionsClient, HttpBusinessFoundationClient, HttpGoalsClient, HttpIssuesClient,
    HttpMeasuresClient, HttpStrategiesClient, HttpWebsiteClient,
};
pub use sources::{
    ActionSource, BusinessFoundationSource, GoalsSource, IssueSource, MeasuresSource,
    StrategiesSource, WebsiteSource,
};

#[cfg(test)]
mod tests {
    use super::*;
    use fakes::{FakeBusinessFoundationClient, FakeKeyedClient, FakeListClient, FakeWebsiteClient};
    use gateway_core::enrichment::{CallerContext, SourceFetcher};
    use sources::{ActionSource, BusinessFoundationSource, WebsiteSource};
    use std::sync::Arc;

    fn caller() -> CallerContext {
        CallerContext { tenant_id: "tenant-1".to_string(), user_id: "user-1".to_string() }
    }

    #[tokio::test]
    async fn business_foundation_source_maps_missing_tenant_to_empty_payload() {
        let fake = Arc::new(FakeBusinessFoundationClient::new());
        let source = BusinessFoundationSource(fake);
        let payload = source.fetch(&caller(), None).await.unwrap();
        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn business_foundation_source_returns_seeded_value() {
        let fake = Arc::new(FakeBusinessFoundationClient::new());
        fake.seed("tenant-1", serde_json::json!({"vision": "grow"}));
        let source = BusinessFoundationSource(fake);
        let payload = source.fetch(&caller(), None).await.unwrap();
        assert!(!payload.is_empty());
        assert_eq!(payload.value["vision"], "grow");
    }

    #[tokio::test]
    async fn action_source_requires_selector() {
        let fake = Arc::new(FakeKeyedClient::new());
        let source = ActionSource(fake);
        assert!(source.fetch(&caller(), None).await.is_err());
    }

    #[tokio::test]
    async fn action_source_resolves_by_selector() {
        let fake = Arc::new(FakeKeyedClient::new());
        fake.seed("tenant-1", "action-9", serde_json::json!({"title": "ship it"}));
        let source = ActionSource(fake);
        let payload = source.fetch(&caller(), Some("action-9")).await.unwrap();
        assert_eq!(payload.value["title"], "ship it");
    }

    #[tokio::test]
    async fn goals_source_without_selector_lists_all() {
        let fake = Arc::new(FakeListClient::new("goal_id"));
        fake.seed(
            "tenant-1",
            vec![serde_json::json!({"goal_id": "g1"}), serde_json::json!({"goal_id": "g2"})],
        );
        let source = sources::GoalsSource(fake);
        let payload = source.fetch(&caller(), None).await.unwrap();
        assert_eq!(payload.value.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn website_source_surfaces_fetch_failed_as_error() {
        let fake = Arc::new(FakeWebsiteClient::new());
        let source = WebsiteSource(fake);
        let result = source.fetch(&caller(), Some("https://example.com")).await;
        assert!(result.is_err());
    }
}
