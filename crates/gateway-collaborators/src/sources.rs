//! Adapters from the collaborator client traits to
//! `gateway_core::enrichment::sources::SourceFetcher`, the seam the
//! enrichment pipeline actually calls through.

use crate::clients::{
    ActionsClient, BusinessFoundationClient, GoalsClient, IssuesClient, MeasuresClient,
    StrategiesClient, WebsiteClient,
};
use async_trait::async_trait;
use gateway_core::enrichment::{CallerContext, SourceFetcher, SourcePayload};
use std::sync::Arc;

pub struct BusinessFoundationSource(pub Arc<dyn BusinessFoundationClient>);

#[async_trait]
impl SourceFetcher for BusinessFoundationSource {
    async fn fetch(&self, caller: &CallerContext, _selector: Option<&str>) -> Result<SourcePayload, String> {
        match self.0.fetch(&caller.tenant_id).await.map_err(|e| e.to_string())? {
            Some(value) => Ok(SourcePayload::present(value)),
            None => Ok(SourcePayload::empty()),
        }
    }
}

pub struct GoalsSource(pub Arc<dyn GoalsClient>);

#[async_trait]
impl SourceFetcher for GoalsSource {
    async fn fetch(&self, caller: &CallerContext, selector: Option<&str>) -> Result<SourcePayload, String> {
        let value = self.0.fetch(&caller.tenant_id, selector).await.map_err(|e| e.to_string())?;
        Ok(if value.is_null() { SourcePayload::empty() } else { SourcePayload::present(value) })
    }
}

pub struct StrategiesSource(pub Arc<dyn StrategiesClient>);

#[async_trait]
impl SourceFetcher for StrategiesSource {
    async fn fetch(&self, caller: &CallerContext, selector: Option<&str>) -> Result<SourcePayload, String> {
        let value = self.0.fetch(&caller.tenant_id, selector).await.map_err(|e| e.to_string())?;
        Ok(if value.is_null() { SourcePayload::empty() } else { SourcePayload::present(value) })
    }
}

pub struct MeasuresSource(pub Arc<dyn MeasuresClient>);

#[async_trait]
impl SourceFetcher for MeasuresSource {
    async fn fetch(&self, caller: &CallerContext, selector: Option<&str>) -> Result<SourcePayload, String> {
        let value = self.0.fetch(&caller.tenant_id, selector).await.map_err(|e| e.to_string())?;
        Ok(if value.is_null() { SourcePayload::empty() } else { SourcePayload::present(value) })
    }
}

pub struct ActionSource(pub Arc<dyn ActionsClient>);

#[async_trait]
impl SourceFetcher for ActionSource {
    async fn fetch(&self, caller: &CallerContext, selector: Option<&str>) -> Result<SourcePayload, String> {
        let action_id = selector.ok_or("ACTION source requires an action_id selector")?;
        let value = self.0.fetch(&caller.tenant_id, action_id).await.map_err(|e| e.to_string())?;
        Ok(if value.is_null() { SourcePayload::empty() } else { SourcePayload::present(value) })
    }
}

pub struct IssueSource(pub Arc<dyn IssuesClient>);

#[async_trait]
impl SourceFetcher for IssueSource {
    async fn fetch(&self, caller: &CallerContext, selector: Option<&str>) -> Result<SourcePayload, String> {
        let issue_id = selector.ok_or("ISSUE source requires an issue_id selector")?;
        let value = self.0.fetch(&caller.tenant_id, issue_id).await.map_err(|e| e.to_string())?;
        Ok(if value.is_null() { SourcePayload::empty() } else { SourcePayload::present(value) })
    }
}

pub struct WebsiteSource(pub Arc<dyn WebsiteClient>);

#[async_trait]
impl SourceFetcher for WebsiteSource {
    async fn fetch(&self, _caller: &CallerContext, selector: Option<&str>) -> Result<SourcePayload, String> {
        let url = selector.ok_or("WEBSITE source requires a url selector")?;
        let value = self.0.fetch(url).await.map_err(|e| e.to_string())?;
        Ok(SourcePayload::present(value))
    }
}
