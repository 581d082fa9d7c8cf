use std::collections::HashSet;

use timetable_gen_engine::domain::{
    Assignment, Course, CourseId, DepartmentId, FacultyId, JobId, ObjectiveWeights, OrgId, ProblemInstance, Room,
    RoomId, Slot, TimeSlot, TimeSlotId, Variant,
};
use timetable_gen_engine::error::Error;
use timetable_gen_engine::persist::persist;
use timetable_gen_engine::store::memory::{InMemoryCacheStore, InMemoryPrimaryStore};
use timetable_gen_engine::store::CacheStore;

fn instance() -> ProblemInstance {
    ProblemInstance::build(
        OrgId::new("org"),
        1,
        vec![Course {
            id: CourseId::new("c1"),
            code: "CS101".into(),
            name: "Intro".into(),
            department_id: DepartmentId::new("d1"),
            faculty_id: FacultyId::new("f1"),
            co_faculty_ids: vec![],
            credits: 3,
            duration: 1,
            room_type_required: "lecture".into(),
            required_features: vec![],
            student_ids: HashSet::new(),
            enrolled_count: 30,
        }],
        vec![],
        vec![Room {
            id: RoomId::new("r1"),
            code: "R1".into(),
            name: "Room 1".into(),
            room_type: "lecture".into(),
            capacity: 40,
            features: vec![],
            department_id: None,
            allow_cross_department_usage: true,
        }],
        vec![TimeSlot {
            id: TimeSlotId::new("t1"),
            day_of_week: 0,
            period: 0,
            start_time: "09:00".into(),
            end_time: "10:00".into(),
            is_lunch: false,
        }],
        vec![],
    )
}

fn entry() -> Assignment {
    Assignment {
        course_id: CourseId::new("c1"),
        faculty_id: FacultyId::new("f1"),
        room_id: RoomId::new("r1"),
        slot: Slot::Scheduled(TimeSlotId::new("t1")),
        session_index: 0,
    }
}

/// Scenario 1 (happy path): all three variants persist and the persister's
/// own session count matches the entries handed to it.
#[tokio::test]
async fn happy_path_persists_all_variants_with_a_matching_session_count() {
    let instance = instance();
    let entries = vec![entry()];
    let variants = vec![
        Variant::new("Faculty-Friendly", ObjectiveWeights::FACULTY_FRIENDLY, 42, entries.clone()),
        Variant::new("Room-Efficient", ObjectiveWeights::ROOM_EFFICIENT, 55, entries.clone()),
        Variant::new("Student-Spread", ObjectiveWeights::STUDENT_SPREAD, 68, entries.clone()),
    ];
    let primary = InMemoryPrimaryStore::new();
    let cache = InMemoryCacheStore::new();
    let job_id = JobId::new("job-happy");

    let persisted = persist(&job_id, &entries, variants, &instance, "completed", 100, &primary, &cache)
        .await
        .unwrap();
    assert_eq!(persisted.len(), 3);

    let (status, progress, data, _) = primary.job_row(&job_id).unwrap();
    assert_eq!(status, "completed");
    assert_eq!(progress, 100);
    let data = data.unwrap();
    assert_eq!(data["total_sessions_scheduled"], 1);
    assert_eq!(data["variants_count"], 3);
}

/// Idempotence property (spec §8 Invariants): persisting the same final
/// assignment twice under the same job id produces byte-identical
/// `timetable_data`, modulo the `generated_at` timestamp stamped fresh on
/// every write.
#[tokio::test]
async fn repersisting_the_same_assignment_is_idempotent_modulo_timestamp() {
    let instance = instance();
    let entries = vec![entry()];
    let variant = || vec![Variant::new("Faculty-Friendly", ObjectiveWeights::FACULTY_FRIENDLY, 42, entries.clone())];
    let primary = InMemoryPrimaryStore::new();
    let cache = InMemoryCacheStore::new();
    let job_id = JobId::new("job-idempotent");

    persist(&job_id, &entries, variant(), &instance, "completed", 100, &primary, &cache).await.unwrap();
    let (_, _, first, _) = primary.job_row(&job_id).unwrap();
    persist(&job_id, &entries, variant(), &instance, "completed", 100, &primary, &cache).await.unwrap();
    let (_, _, second, _) = primary.job_row(&job_id).unwrap();

    let mut first = first.unwrap();
    let mut second = second.unwrap();
    first["generated_at"] = serde_json::Value::Null;
    second["generated_at"] = serde_json::Value::Null;
    assert_eq!(first, second);
}

/// Scenario 6: a corrupt assignment (more than 5% unscheduled entries)
/// aborts before either store is written.
#[tokio::test]
async fn corrupt_assignment_aborts_before_writing_either_store() {
    let instance = instance();
    let mut entries = vec![entry(); 9];
    for _ in 0..2 {
        entries.push(Assignment {
            course_id: CourseId::new("c1"),
            faculty_id: FacultyId::new("f1"),
            room_id: RoomId::new("r1"),
            slot: Slot::Unscheduled,
            session_index: 0,
        });
    }
    let variants = vec![Variant::new("Faculty-Friendly", ObjectiveWeights::FACULTY_FRIENDLY, 42, entries.clone())];
    let primary = InMemoryPrimaryStore::new();
    let cache = InMemoryCacheStore::new();
    let job_id = JobId::new("job-corrupt");

    let err = persist(&job_id, &entries, variants, &instance, "completed", 100, &primary, &cache)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedSolution { .. }));
    assert!(primary.job_row(&job_id).is_none());
    assert!(cache.get(&format!("result:job:{job_id}")).await.unwrap().is_none());
}
