use serde_json::json;

use timetable_gen_engine::domain::{JobId, JobStatus, OrgId, TimeConfig};
use timetable_gen_engine::saga::{GenerationRequest, SagaDeps, run};
use timetable_gen_engine::store::memory::{InMemoryCacheStore, InMemoryPrimaryStore};
use timetable_gen_engine::store::{CacheStore, RawProblemData};

fn time_config() -> TimeConfig {
    TimeConfig {
        working_days: 5,
        slots_per_day: 8,
        start_time: "09:00".into(),
        end_time: "17:00".into(),
        slot_duration_minutes: 60,
        lunch_break_enabled: true,
        lunch_break_start: "13:00".into(),
        lunch_break_end: "14:00".into(),
    }
}

fn seed_small_instance(store: &InMemoryPrimaryStore, org: &str) {
    store.seed(
        OrgId::new(org),
        1,
        RawProblemData {
            courses: json!([
                {"offering_id": "c1", "course_id": "c1", "code": "CS101", "name": "Intro", "department_id": "d1", "faculty_id": "f1", "co_faculty_ids": [], "credits": 3, "duration": 1, "room_type_required": "lecture", "required_features": [], "student_ids": []},
                {"offering_id": "c2", "course_id": "c2", "code": "CS102", "name": "Data Structures", "department_id": "d1", "faculty_id": "f2", "co_faculty_ids": [], "credits": 3, "duration": 1, "room_type_required": "lecture", "required_features": [], "student_ids": []},
            ]),
            faculty: json!([
                {"id": "f1", "code": "F1", "name": "Prof A", "department_id": "d1", "max_hours_per_week": 18, "specialization": "cs"},
                {"id": "f2", "code": "F2", "name": "Prof B", "department_id": "d1", "max_hours_per_week": 18, "specialization": "cs"},
            ]),
            rooms: json!([{"id": "r1", "code": "R1", "name": "Room 1", "room_type": "lecture", "capacity": 40, "features": [], "department_id": null, "allow_cross_department_usage": true}]),
            students: json!([]),
            time_config: json!({}),
        },
    );
}

/// Scenario 4: a cancellation flag raised mid-run must leave
/// `generation_jobs` in a state that agrees with the job's own terminal
/// status, whichever side of the CP-SAT boundary the cancel-poller's 500ms
/// tick happens to land on. `partial_success` must never be recorded as
/// `completed`/`progress == 100` (the row is the source of truth, spec §7),
/// and a `cancelled` run must actually write `status = "cancelled"` rather
/// than leaving the row stale.
#[tokio::test]
async fn cancellation_mid_run_keeps_the_primary_row_in_sync_with_the_terminal_status() {
    let primary = InMemoryPrimaryStore::new();
    seed_small_instance(&primary, "org-cancel");
    let cache = InMemoryCacheStore::new();
    cache.setex("cancel:job:job-cancel-mid", 3600, "1".into()).await.unwrap();

    let deps = SagaDeps {
        primary: &primary,
        cache: &cache,
        policy_dir: std::env::temp_dir(),
        audit_dir: std::env::temp_dir(),
        physical_cores: 4,
        available_ram_gb: 10.0,
        parallel_clusters_override: None,
    };

    let job_id = JobId::new("job-cancel-mid");
    let request = GenerationRequest {
        job_id: job_id.clone(),
        organization_id: OrgId::new("org-cancel"),
        semester: 1,
        academic_year: "2026".into(),
        time_config: time_config(),
    };

    let job = run(request, &deps).await;

    match job.status {
        JobStatus::Cancelled => {
            let (status, progress, timetable_data, _) =
                primary.job_row(&job_id).expect("a cancelled run must still write a primary row");
            assert_eq!(status, "cancelled");
            assert!(timetable_data.is_none());
            assert_ne!(progress, 100);
        }
        JobStatus::PartialSuccess => {
            let variants = job.variants.expect("partial success carries the CP-SAT-only variant");
            assert_eq!(variants.len(), 1);
            assert_eq!(variants[0].label, "Partial (CP-SAT only)");

            let (status, progress, timetable_data, _) = primary.job_row(&job_id).unwrap();
            assert_eq!(status, "partial_success");
            assert_ne!(progress, 100, "invariant 5: progress == 100 iff status == completed");
            assert!(timetable_data.is_some());
        }
        JobStatus::Completed | JobStatus::CompletedWithWarnings { .. } => {
            // the poller lost the race against a pipeline that finished
            // inside its 500ms tick; the row must still agree.
            let (status, progress, _, _) = primary.job_row(&job_id).unwrap();
            assert_eq!(status, "completed");
            assert_eq!(progress, 100);
        }
        other => panic!("unexpected terminal status for a run cancelled at t=0: {other:?}"),
    }
}
