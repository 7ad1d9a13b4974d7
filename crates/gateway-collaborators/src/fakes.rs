//! In-memory collaborator fakes, the role the teacher's
//! `InMemorySessionStore` plays for `SessionStore`: deterministic stand-ins
//! for tests and for the `LOCAL`-only demo deployment.

use crate::clients::{
    ActionsClient, BusinessFoundationClient, GoalsClient, IssuesClient, MeasuresClient,
    StrategiesClient, WebsiteClient,
};
use crate::error::CollaboratorError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeBusinessFoundationClient {
    by_tenant: Mutex<HashMap<String, Value>>,
}

impl FakeBusinessFoundationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, tenant_id: impl Into<String>, value: Value) {
        self.by_tenant.lock().unwrap().insert(tenant_id.into(), value);
    }
}

#[async_trait]
impl BusinessFoundationClient for FakeBusinessFoundationClient {
    async fn fetch(&self, tenant_id: &str) -> Result<Option<Value>, CollaboratorError> {
        Ok(self.by_tenant.lock().unwrap().get(tenant_id).cloned())
    }
}

/// Shared shape for the Goals/Strategies/Measures fakes: a flat list per
/// tenant, optionally filtered to a single record by id.
#[derive(Default)]
pub struct FakeListClient {
    by_tenant: Mutex<HashMap<String, Vec<Value>>>,
    id_field: &'static str,
}

impl FakeListClient {
    pub fn new(id_field: &'static str) -> Self {
        Self { by_tenant: Mutex::new(HashMap::new()), id_field }
    }

    pub fn seed(&self, tenant_id: impl Into<String>, records: Vec<Value>) {
        self.by_tenant.lock().unwrap().insert(tenant_id.into(), records);
    }

    fn resolve(&self, tenant_id: &str, id: Option<&str>) -> Value {
        let records = self.by_tenant.lock().unwrap().get(tenant_id).cloned().unwrap_or_default();
        match id {
            Some(id) => records
                .into_iter()
                .find(|r| r.get(self.id_field).and_then(Value::as_str) == Some(id))
                .unwrap_or(Value::Null),
            None => Value::Array(records),
        }
    }
}

#[async_trait]
impl GoalsClient for FakeListClient {
    async fn fetch(&self, tenant_id: &str, goal_id: Option<&str>) -> Result<Value, CollaboratorError> {
        Ok(self.resolve(tenant_id, goal_id))
    }
}

#[async_trait]
impl StrategiesClient for FakeListClient {
    async fn fetch(&self, tenant_id: &str, goal_id: Option<&str>) -> Result<Value, CollaboratorError> {
        let records = self.by_tenant.lock().unwrap().get(tenant_id).cloned().unwrap_or_default();
        Ok(match goal_id {
            Some(id) => Value::Array(
                records
                    .into_iter()
                    .filter(|r| r.get("goal_id").and_then(Value::as_str) == Some(id))
                    .collect(),
            ),
            None => Value::Array(records),
        })
    }
}

#[async_trait]
impl MeasuresClient for FakeListClient {
    async fn fetch(&self, tenant_id: &str, measure_id: Option<&str>) -> Result<Value, CollaboratorError> {
        Ok(self.resolve(tenant_id, measure_id))
    }
}

#[derive(Default)]
pub struct FakeKeyedClient {
    by_key: Mutex<HashMap<(String, String), Value>>,
}

impl FakeKeyedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, tenant_id: impl Into<String>, id: impl Into<String>, value: Value) {
        self.by_key.lock().unwrap().insert((tenant_id.into(), id.into()), value);
    }
}

#[async_trait]
impl ActionsClient for FakeKeyedClient {
    async fn fetch(&self, tenant_id: &str, action_id: &str) -> Result<Value, CollaboratorError> {
        Ok(self
            .by_key
            .lock()
            .unwrap()
            .get(&(tenant_id.to_string(), action_id.to_string()))
            .cloned()
            .unwrap_or(Value::Null))
    }
}

#[async_trait]
impl IssuesClient for FakeKeyedClient {
    async fn fetch(&self, tenant_id: &str, issue_id: &str) -> Result<Value, CollaboratorError> {
        Ok(self
            .by_key
            .lock()
            .unwrap()
            .get(&(tenant_id.to_string(), issue_id.to_string()))
            .cloned()
            .unwrap_or(Value::Null))
    }
}

#[derive(Default)]
pub struct FakeWebsiteClient {
    by_url: Mutex<HashMap<String, Value>>,
}

impl FakeWebsiteClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, url: impl Into<String>, value: Value) {
        self.by_url.lock().unwrap().insert(url.into(), value);
    }
}

#[async_trait]
impl WebsiteClient for FakeWebsiteClient {
    async fn fetch(&self, url: &str) -> Result<Value, CollaboratorError> {
        self.by_url
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| CollaboratorError::Http { status: 404, body: "fetch_failed".to_string() })
    }
}
