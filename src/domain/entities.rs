use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::ids::{CourseId, DepartmentId, FacultyId, RoomId, StudentId, TimeSlotId};

/// Prefix recognized inside `Course::required_features`; pins every session
/// of the course to a specific time slot (spec §3, HC6 in §4.3).
pub const FIXED_SLOT_PREFIX: &str = "fixed_slot:";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub code: String,
    pub name: String,
    pub department_id: DepartmentId,
    /// Primary instructor. Required and non-null per spec §3 — the loader
    /// drops courses that fail this invariant (see `loader::validate`).
    pub faculty_id: FacultyId,
    /// Co-faculty pool used to cycle instructors across sections created by
    /// the >60-enrollment split (spec §4.1).
    pub co_faculty_ids: Vec<FacultyId>,
    pub credits: u32,
    /// Sessions per week. Invariant: >= 1.
    pub duration: u32,
    pub room_type_required: String,
    /// Ordered, de-duplicated. May contain `fixed_slot:<slot_id>` markers.
    pub required_features: Vec<String>,
    pub student_ids: HashSet<StudentId>,
    pub enrolled_count: usize,
}

impl Course {
    /// The slot id pinned by a `fixed_slot:<id>` marker, if present.
    pub fn fixed_slot(&self) -> Option<TimeSlotId> {
        self.required_features.iter().find_map(|f| {
            f.strip_prefix(FIXED_SLOT_PREFIX)
                .map(|id| TimeSlotId::new(id.to_string()))
        })
    }

    /// Required features excluding fixed-slot markers — the set actually
    /// matched against `Room::features` during candidate precomputation.
    pub fn room_features(&self) -> impl Iterator<Item = &str> {
        self.required_features
            .iter()
            .filter(|f| !f.starts_with(FIXED_SLOT_PREFIX))
            .map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faculty {
    pub id: FacultyId,
    pub code: String,
    pub name: String,
    pub department_id: DepartmentId,
    pub max_hours_per_week: u32,
    pub specialization: String,
}

impl Faculty {
    pub const DEFAULT_MAX_HOURS_PER_WEEK: u32 = 18;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub code: String,
    pub name: String,
    pub room_type: String,
    /// Invariant: > 0.
    pub capacity: u32,
    pub features: Vec<String>,
    pub department_id: Option<DepartmentId>,
    pub allow_cross_department_usage: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub day_of_week: u32,
    pub period: u32,
    pub start_time: String,
    pub end_time: String,
    pub is_lunch: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub enrollment_number: String,
    pub department_id: DepartmentId,
    pub semester: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(required_features: Vec<String>) -> Course {
        Course {
            id: CourseId::new("c1"),
            code: "CS101".into(),
            name: "Intro".into(),
            department_id: DepartmentId::new("d1"),
            faculty_id: FacultyId::new("f1"),
            co_faculty_ids: vec![],
            credits: 3,
            duration: 1,
            room_type_required: "lecture".into(),
            required_features,
            student_ids: HashSet::new(),
            enrolled_count: 0,
        }
    }

    #[test]
    fn no_fixed_slot_marker_returns_none() {
        let c = course(vec!["projector".into()]);
        assert!(c.fixed_slot().is_none());
        assert_eq!(c.room_features().collect::<Vec<_>>(), vec!["projector"]);
    }

    #[test]
    fn fixed_slot_marker_is_parsed_and_excluded_from_room_features() {
        let c = course(vec!["projector".into(), "fixed_slot:t1".into()]);
        assert_eq!(c.fixed_slot(), Some(TimeSlotId::new("t1")));
        assert_eq!(c.room_features().collect::<Vec<_>>(), vec!["projector"]);
    }
}
