//! At-least-once dispatch queue (spec §4.7, §5) with a per-tenant
//! concurrency soft limit: excess enqueues succeed as PENDING but aren't
//! handed to a worker until capacity frees (spec §4.7 "back-pressure").

use super::types::JobId;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

struct QueueState {
    items: VecDeque<(JobId, String)>,
    inflight: HashMap<String, u32>,
}

pub struct InMemoryJobQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    tenant_limit: u32,
}

impl InMemoryJobQueue {
    pub fn new(tenant_concurrency_limit: u32) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState { items: VecDeque::new(), inflight: HashMap::new() }),
            notify: Notify::new(),
            tenant_limit: tenant_concurrency_limit,
        })
    }

    pub async fn enqueue(&self, job_id: JobId, tenant_id: String) {
        self.state.lock().await.items.push_back((job_id, tenant_id));
        self.notify.notify_one();
    }

    /// Waits for a job whose tenant is under its concurrency limit. Items
    /// belonging to tenants currently at capacity are skipped (left on the
    /// queue) rather than dropped.
    pub async fn dequeue(&self) -> (JobId, String) {
        loop {
            {
                let mut state = self.state.lock().await;
                let mut skipped = VecDeque::new();
                let mut claimed = None;
                while let Some((job_id, tenant_id)) = state.items.pop_front() {
                    let count = state.inflight.entry(tenant_id.clone()).or_insert(0);
                    if *count < self.tenant_limit {
                        *count += 1;
                        claimed = Some((job_id, tenant_id));
                        break;
                    }
                    skipped.push_back((job_id, tenant_id));
                }
                for item in skipped.into_iter().rev() {
                    state.items.push_front(item);
                }
                if let Some(item) = claimed {
                    return item;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Releases a tenant's inflight slot once a job finishes processing.
    pub async fn release(&self, tenant_id: &str) {
        let mut state = self.state.lock().await;
        if let Some(count) = state.inflight.get_mut(tenant_id) {
            *count = count.saturating_sub(1);
        }
        self.notify.notify_one();
    }
}
