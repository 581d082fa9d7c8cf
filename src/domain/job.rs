use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{JobId, OrgId};
use super::variant::Variant;

/// State machine for a single generation run (spec §4.8). Transitions are
/// driven exclusively by the saga controller; every other component only
/// ever reads a job's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum JobStatus {
    Queued,
    Running { stage: Stage },
    Cancelling,
    /// Trapped before Stage 2 CP-SAT completed: no usable solution exists
    /// (spec §4.8).
    Cancelled,
    /// Every cluster produced a usable timetable.
    Completed,
    /// At least one cluster fell back to the sentinel-filled placeholder
    /// but the overall malformed-entry ratio stayed under the 5% abort
    /// threshold (spec §7 `MalformedSolution`). Externally this still
    /// reports as `completed` — `failed_clusters` is retained for logging.
    CompletedWithWarnings { failed_clusters: Vec<usize> },
    /// Trapped at or after Stage 2 CP-SAT completed: the CP-SAT assignment
    /// is kept as the sole persisted variant (spec §4.8).
    PartialSuccess,
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loading,
    Clustering,
    Solving,
    GeneticOptimization,
    Refinement,
    Persisting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: JobId,
    pub org_id: OrgId,
    pub semester: u8,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Populated once Stage 2b completes; `None` before that point and
    /// always `None` for a `Failed`/`Cancelled` job.
    pub variants: Option<Vec<Variant>>,
    pub selected_variant_id: Option<String>,
}

impl GenerationJob {
    pub fn new(id: JobId, org_id: OrgId, semester: u8, now: DateTime<Utc>) -> Self {
        GenerationJob {
            id,
            org_id,
            semester,
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            variants: None,
            selected_variant_id: None,
        }
    }

    pub fn transition(&mut self, status: JobStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            JobStatus::Cancelled
                | JobStatus::Completed
                | JobStatus::CompletedWithWarnings { .. }
                | JobStatus::PartialSuccess
                | JobStatus::Failed { .. }
        )
    }

    /// Whether a cancellation request may still take effect. Mirrors the
    /// saga's safe-point gating: once persistence has started, a
    /// cancellation can no longer roll the run back (spec §5 Cancellation).
    pub fn is_cancellable(&self) -> bool {
        !self.is_terminal()
            && !matches!(
                self.status,
                JobStatus::Running {
                    stage: Stage::Persisting
                } | JobStatus::Cancelling
            )
    }

    /// The external status string stored in `generation_jobs.status` (spec
    /// §4.8's `pending/running/cancelling/cancelled/completed/failed/
    /// partial_success` vocabulary). `CompletedWithWarnings` still reports
    /// as `completed` — its `failed_clusters` detail is log-only.
    pub fn status_label(&self) -> &'static str {
        match &self.status {
            JobStatus::Queued => "pending",
            JobStatus::Running { .. } => "running",
            JobStatus::Cancelling => "cancelling",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Completed | JobStatus::CompletedWithWarnings { .. } => "completed",
            JobStatus::PartialSuccess => "partial_success",
            JobStatus::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> GenerationJob {
        GenerationJob::new(JobId::new("j1"), OrgId::new("org"), 1, Utc::now())
    }

    #[test]
    fn queued_job_is_cancellable() {
        assert!(job().is_cancellable());
    }

    #[test]
    fn persisting_stage_is_not_cancellable() {
        let mut j = job();
        j.transition(
            JobStatus::Running {
                stage: Stage::Persisting,
            },
            Utc::now(),
        );
        assert!(!j.is_cancellable());
    }

    #[test]
    fn terminal_statuses_are_not_cancellable() {
        let mut j = job();
        j.transition(JobStatus::Completed, Utc::now());
        assert!(j.is_terminal());
        assert!(!j.is_cancellable());
    }
}
