pub mod cache_redis;
pub mod memory;
pub mod primary_sqlx;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::ids::{JobId, OrgId};
use crate::error::Result;

/// Raw data pulled from the primary store before the loader assembles a
/// `ProblemInstance` (spec §6: organizations/departments/faculty/rooms/
/// courses/course_offerings/course_enrollments/students/timetable_configurations).
#[derive(Debug, Clone)]
pub struct RawProblemData {
    pub courses: Value,
    pub faculty: Value,
    pub rooms: Value,
    pub students: Value,
    pub time_config: Value,
}

/// The durable system of record. Production backs this with Postgres via
/// `sqlx`; tests back it with an in-memory fake. Mirrors the teacher's
/// `SystemSimulator` trait-object-plus-clone_box shape so call sites can
/// hold a `Box<dyn PrimaryStore>` without knowing which implementation
/// backs it.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    async fn fetch_problem_data(&self, org_id: &OrgId, semester: u8) -> Result<RawProblemData>;

    /// Single `UPDATE generation_jobs SET …` statement (spec §4.7, §6).
    async fn update_job(&self, job_id: &JobId, status: &str, progress: u8, timetable_data: Option<Value>, error_message: Option<String>) -> Result<()>;

    fn clone_box(&self) -> Box<dyn PrimaryStore>;
}

impl Clone for Box<dyn PrimaryStore> {
    fn clone(&self) -> Box<dyn PrimaryStore> {
        self.clone_box()
    }
}

/// The size-bounded, multi-writer cache surface (spec §5): progress,
/// cancellation flag, and result summary. Production backs this with
/// Redis; tests back it with an in-memory fake.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn setex(&self, key: &str, ttl_seconds: u64, value: String) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn publish(&self, channel: &str, message: String) -> Result<()>;
    async fn del(&self, key: &str) -> Result<()>;

    fn clone_box(&self) -> Box<dyn CacheStore>;
}

impl Clone for Box<dyn CacheStore> {
    fn clone(&self) -> Box<dyn CacheStore> {
        self.clone_box()
    }
}
