//! HTTP implementations of the collaborator client traits, one global
//! `reqwest::Client` per process, mirroring the teacher's
//! `outbound::CLIENT` pattern.

use crate::clients::{
    ActionsClient, BusinessFoundationClient, GoalsClient, IssuesClient, MeasuresClient,
    StrategiesClient, WebsiteClient,
};
use crate::error::CollaboratorError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build collaborator http client")
});

async fn get_json(url: &str, query: &[(&str, &str)]) -> Result<Value, CollaboratorError> {
    let response = CLIENT.get(url).query(query).send().await?;
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(Value::Null);
    }
    let body = response.text().await?;
    if !status.is_success() {
        return Err(CollaboratorError::Http { status: status.as_u16(), body });
    }
    serde_json::from_str(&body).map_err(|e| CollaboratorError::Malformed(e.to_string()))
}

pub struct HttpBusinessFoundationClient {
    pub base_url: String,
}

#[async_trait]
impl BusinessFoundationClient for HttpBusinessFoundationClient {
    async fn fetch(&self, tenant_id: &str) -> Result<Option<Value>, CollaboratorError> {
        let url = format!("{}/tenants/{tenant_id}/business-foundation", self.base_url);
        let value = get_json(&url, &[]).await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }
}

pub struct HttpGoalsClient {
    pub base_url: String,
}

#[async_trait]
impl GoalsClient for HttpGoalsClient {
    async fn fetch(&self, tenant_id: &str, goal_id: Option<&str>) -> Result<Value, CollaboratorError> {
        match goal_id {
            Some(id) => get_json(&format!("{}/tenants/{tenant_id}/goals/{id}", self.base_url), &[]).await,
            None => get_json(&format!("{}/tenants/{tenant_id}/goals", self.base_url), &[]).await,
        }
    }
}

pub struct HttpStrategiesClient {
    pub base_url: String,
}

#[async_trait]
impl StrategiesClient for HttpStrategiesClient {
    async fn fetch(&self, tenant_id: &str, goal_id: Option<&str>) -> Result<Value, CollaboratorError> {
        let url = format!("{}/tenants/{tenant_id}/strategies", self.base_url);
        match goal_id {
            Some(id) => get_json(&url, &[("goal_id", id)]).await,
            None => get_json(&url, &[]).await,
        }
    }
}

pub struct HttpMeasuresClient {
    pub base_url: String,
}

#[async_trait]
impl MeasuresClient for HttpMeasuresClient {
    async fn fetch(&self, tenant_id: &str, measure_id: Option<&str>) -> Result<Value, CollaboratorError> {
        match measure_id {
            Some(id) => get_json(&format!("{}/tenants/{tenant_id}/measures/{id}", self.base_url), &[]).await,
            None => get_json(&format!("{}/tenants/{tenant_id}/measures", self.base_url), &[]).await,
        }
    }
}

pub struct HttpActionsClient {
    pub base_url: String,
}

#[async_trait]
impl ActionsClient for HttpActionsClient {
    async fn fetch(&self, tenant_id: &str, action_id: &str) -> Result<Value, CollaboratorError> {
        get_json(&format!("{}/tenants/{tenant_id}/actions/{action_id}", self.base_url), &[]).await
    }
}

pub struct HttpIssuesClient {
    pub base_url: String,
}

#[async_trait]
impl IssuesClient for HttpIssuesClient {
    async fn fetch(&self, tenant_id: &str, issue_id: &str) -> Result<Value, CollaboratorError> {
        get_json(&format!("{}/tenants/{tenant_id}/issues/{issue_id}", self.base_url), &[]).await
    }
}

pub struct HttpWebsiteClient;

#[async_trait]
impl WebsiteClient for HttpWebsiteClient {
    async fn fetch(&self, url: &str) -> Result<Value, CollaboratorError> {
        let response = CLIENT.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CollaboratorError::Http { status: status.as_u16(), body });
        }
        Ok(serde_json::json!({
            "content": body,
            "title": Value::Null,
            "meta_description": Value::Null,
        }))
    }
}
