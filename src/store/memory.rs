use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::{CacheStore, PrimaryStore, RawProblemData};
use crate::domain::ids::{JobId, OrgId};
use crate::error::{Error, Result};

/// In-memory `PrimaryStore` used by tests so the saga and persister can be
/// exercised without a live Postgres instance.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPrimaryStore {
    inner: Arc<RwLock<InMemoryPrimaryInner>>,
}

#[derive(Debug, Default)]
struct InMemoryPrimaryInner {
    fixtures: std::collections::HashMap<(String, u8), RawProblemData>,
    jobs: std::collections::HashMap<String, (String, u8, Option<Value>, Option<String>)>,
}

impl InMemoryPrimaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, org_id: OrgId, semester: u8, data: RawProblemData) {
        self.inner
            .write()
            .unwrap()
            .fixtures
            .insert((org_id.id, semester), data);
    }

    pub fn job_row(&self, job_id: &JobId) -> Option<(String, u8, Option<Value>, Option<String>)> {
        self.inner.read().unwrap().jobs.get(job_id.as_str()).cloned()
    }
}

#[async_trait]
impl PrimaryStore for InMemoryPrimaryStore {
    async fn fetch_problem_data(&self, org_id: &OrgId, semester: u8) -> Result<RawProblemData> {
        self.inner
            .read()
            .unwrap()
            .fixtures
            .get(&(org_id.id.clone(), semester))
            .cloned()
            .ok_or_else(|| Error::DataLoad {
                org_id: org_id.id.clone(),
                reason: "no fixture seeded for (org_id, semester)".to_string(),
            })
    }

    async fn update_job(
        &self,
        job_id: &JobId,
        status: &str,
        progress: u8,
        timetable_data: Option<Value>,
        error_message: Option<String>,
    ) -> Result<()> {
        self.inner.write().unwrap().jobs.insert(
            job_id.as_str().to_string(),
            (status.to_string(), progress, timetable_data, error_message),
        );
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn PrimaryStore> {
        Box::new(self.clone())
    }
}

/// In-memory `CacheStore`. Models Redis SETEX/GET/PUBLISH/DEL well enough
/// for the progress tracker and cancellation-flag tests; TTLs are recorded
/// but not actively expired (no test depends on wall-clock expiry).
#[derive(Debug, Clone, Default)]
pub struct InMemoryCacheStore {
    inner: Arc<RwLock<InMemoryCacheInner>>,
}

#[derive(Debug, Default)]
struct InMemoryCacheInner {
    values: std::collections::HashMap<String, String>,
    published: Vec<(String, String)>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published_messages(&self, channel: &str) -> Vec<String> {
        self.inner
            .read()
            .unwrap()
            .published
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn setex(&self, key: &str, _ttl_seconds: u64, value: String) -> Result<()> {
        self.inner.write().unwrap().values.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().unwrap().values.get(key).cloned())
    }

    async fn publish(&self, channel: &str, message: String) -> Result<()> {
        self.inner
            .write()
            .unwrap()
            .published
            .push((channel.to_string(), message));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.inner.write().unwrap().values.remove(key);
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn CacheStore> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_without_seed_is_a_data_load_error() {
        let store = InMemoryPrimaryStore::new();
        let err = store.fetch_problem_data(&OrgId::new("org1"), 1).await.unwrap_err();
        assert!(matches!(err, Error::DataLoad { .. }));
    }

    #[tokio::test]
    async fn cache_round_trips_and_records_publishes() {
        let cache = InMemoryCacheStore::new();
        cache.setex("progress:job:1", 3600, "{}".into()).await.unwrap();
        assert_eq!(cache.get("progress:job:1").await.unwrap(), Some("{}".into()));
        cache.publish("progress:1", "tick".into()).await.unwrap();
        assert_eq!(cache.published_messages("progress:1"), vec!["tick".to_string()]);
        cache.del("progress:job:1").await.unwrap();
        assert_eq!(cache.get("progress:job:1").await.unwrap(), None);
    }
}
