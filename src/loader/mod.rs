mod rows;

use std::collections::HashSet;

use crate::domain::entities::{Course, Faculty, Room, Student};
use crate::domain::ids::{CourseId, FacultyId, OrgId};
use crate::domain::problem_instance::ProblemInstance;
use crate::domain::time_config::TimeConfig;
use crate::error::{Error, Result};
use crate::store::{PrimaryStore, RawProblemData};

use rows::{RawCourseRow, RawFacultyRow, RawRoomRow, RawStudentRow};

const MAX_SECTION_SIZE: usize = 60;

/// Stage 0 entry point (spec §4.1). Fetches the raw rows for `org_id` /
/// `semester`, splits oversized course offerings into sections, drops
/// courses with an invalid faculty id, and procedurally generates the slot
/// grid from `time_config`.
pub async fn load(org_id: &OrgId, semester: u8, time_config: &TimeConfig, store: &dyn PrimaryStore) -> Result<ProblemInstance> {
    let raw = store.fetch_problem_data(org_id, semester).await.map_err(|e| Error::DataLoad {
        org_id: org_id.id.clone(),
        reason: e.to_string(),
    })?;

    let instance = assemble(org_id.clone(), semester, raw, time_config)?;
    Ok(instance)
}

fn assemble(org_id: OrgId, semester: u8, raw: RawProblemData, time_config: &TimeConfig) -> Result<ProblemInstance> {
    let course_rows: Vec<RawCourseRow> = serde_json::from_value(raw.courses)?;
    let faculty_rows: Vec<RawFacultyRow> = serde_json::from_value(raw.faculty)?;
    let room_rows: Vec<RawRoomRow> = serde_json::from_value(raw.rooms)?;
    let student_rows: Vec<RawStudentRow> = serde_json::from_value(raw.students)?;

    let faculty: Vec<Faculty> = faculty_rows.into_iter().map(RawFacultyRow::into_domain).collect();
    let valid_faculty: HashSet<FacultyId> = faculty.iter().map(|f| f.id.clone()).collect();

    let rooms: Vec<Room> = room_rows.into_iter().map(RawRoomRow::into_domain).collect();
    let students: Vec<Student> = student_rows.into_iter().map(RawStudentRow::into_domain).collect();

    let mut courses = Vec::with_capacity(course_rows.len());
    let mut dropped = 0usize;
    let mut total_enrolled = 0usize;

    for row in course_rows {
        if !row.has_valid_faculty() {
            log::warn!("dropping course offering {} with invalid faculty id", row.offering_id);
            dropped += 1;
            continue;
        }
        total_enrolled += row.student_ids.len();
        for section in split_sections(row, &valid_faculty) {
            courses.push(section);
        }
    }

    log::info!(
        "loader: {} courses loaded ({} dropped for invalid faculty), {} students enrolled total",
        courses.len(),
        dropped,
        total_enrolled
    );

    let time_slots = time_config.generate_slots();
    Ok(ProblemInstance::build(org_id, semester, courses, faculty, rooms, time_slots, students))
}

/// Splits a course offering with >60 enrolled students into
/// `ceil(N/60)` sections, each a first-class `Course` with faculty cycled
/// from primary + co-faculty (spec §4.1).
fn split_sections(row: RawCourseRow, valid_faculty: &HashSet<FacultyId>) -> Vec<Course> {
    let enrolled = row.student_ids.len();
    if enrolled <= MAX_SECTION_SIZE {
        return vec![row.into_domain(0, valid_faculty)];
    }

    let section_count = enrolled.div_ceil(MAX_SECTION_SIZE);
    let chunk_size = enrolled.div_ceil(section_count);

    (0..section_count)
        .map(|k| {
            let start = k * chunk_size;
            let end = ((k + 1) * chunk_size).min(enrolled);
            let mut section = row.clone().into_domain(k, valid_faculty);
            let sliced: HashSet<_> = row.student_ids[start..end].iter().cloned().collect();
            section.enrolled_count = sliced.len();
            section.student_ids = sliced.into_iter().map(crate::domain::ids::StudentId::new).collect();
            section.id = CourseId::new(format!("{}_off_{}_sec{}", row.course_id, row.offering_id, k));
            section
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryPrimaryStore;
    use serde_json::json;

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

    fn raw_fixture(student_count: usize) -> RawProblemData {
        let student_ids: Vec<String> = (0..student_count).map(|i| format!("s{i}")).collect();
        RawProblemData {
            courses: json!([{
                "offering_id": "off1",
                "course_id": "c1",
                "code": "CS101",
                "name": "Intro",
                "department_id": "d1",
                "faculty_id": "f1",
                "co_faculty_ids": ["f2"],
                "credits": 3,
                "duration": 2,
                "room_type_required": "lecture",
                "required_features": [],
                "student_ids": student_ids,
            }]),
            faculty: json!([
                {"id": "f1", "code": "F1", "name": "Prof A", "department_id": "d1", "max_hours_per_week": 18, "specialization": "cs"},
                {"id": "f2", "code": "F2", "name": "Prof B", "department_id": "d1", "max_hours_per_week": 18, "specialization": "cs"},
            ]),
            rooms: json!([]),
            students: json!([]),
            time_config: json!({}),
        }
    }

    #[tokio::test]
    async fn splits_oversized_offering_into_sections() {
        let store = InMemoryPrimaryStore::new();
        store.seed(OrgId::new("org"), 1, raw_fixture(185));
        let instance = load(&OrgId::new("org"), 1, &time_config(), &store).await.unwrap();
        assert_eq!(instance.course_count(), 3);
        assert!(instance.course(&CourseId::new("c1_off_off1_sec0")).is_some());
        assert!(instance.course(&CourseId::new("c1_off_off1_sec1")).is_some());
        assert!(instance.course(&CourseId::new("c1_off_off1_sec2")).is_some());
    }

    #[tokio::test]
    async fn small_offering_is_not_split() {
        let store = InMemoryPrimaryStore::new();
        store.seed(OrgId::new("org"), 1, raw_fixture(30));
        let instance = load(&OrgId::new("org"), 1, &time_config(), &store).await.unwrap();
        assert_eq!(instance.course_count(), 1);
    }
}
