use std::collections::{HashMap, HashSet};

use bimap::BiMap;
use slotmap::{SlotMap, new_key_type};

use super::entities::{Course, Faculty, Room, Student, TimeSlot};
use super::ids::{CourseId, OrgId, RoomId, StudentId, TimeSlotId};

new_key_type! {
    /// Opaque arena key for a `Course`. The loader flattens the
    /// courses↔offerings↔enrollments cycle from the primary store into this
    /// flat, cycle-free arena keyed by id (spec §9 design note).
    pub struct CourseKey;
}

/// The immutable, fully-resolved problem instance for one generation run.
/// Owned by the saga controller for the run's duration and shared
/// read-only with every stage (spec §3 Ownership).
#[derive(Debug, Clone)]
pub struct ProblemInstance {
    pub org_id: OrgId,
    pub semester: u8,
    courses: SlotMap<CourseKey, Course>,
    course_index: HashMap<CourseId, CourseKey>,
    faculty: HashMap<String, Faculty>,
    pub rooms: Vec<Room>,
    pub time_slots: Vec<TimeSlot>,
    slot_lookup: BiMap<TimeSlotId, (u32, u32)>,
    pub students: HashMap<String, Student>,
    /// course_id -> set of enrolled student ids, precomputed once (spec §3:
    /// "must never be rebuilt per cluster").
    pub student_course_index: HashMap<CourseId, HashSet<StudentId>>,
}

impl ProblemInstance {
    pub fn build(
        org_id: OrgId,
        semester: u8,
        courses: Vec<Course>,
        faculty: Vec<Faculty>,
        rooms: Vec<Room>,
        time_slots: Vec<TimeSlot>,
        students: Vec<Student>,
    ) -> Self {
        let mut slot_lookup = BiMap::new();
        for slot in &time_slots {
            slot_lookup.insert(slot.id.clone(), (slot.day_of_week, slot.period));
        }

        let student_course_index = courses
            .iter()
            .map(|c| (c.id.clone(), c.student_ids.clone()))
            .collect();

        let mut arena = SlotMap::with_key();
        let mut course_index = HashMap::with_capacity(courses.len());
        for course in courses {
            let id = course.id.clone();
            let key = arena.insert(course);
            course_index.insert(id, key);
        }

        let faculty = faculty.into_iter().map(|f| (f.id.id.clone(), f)).collect();
        let students = students.into_iter().map(|s| (s.id.id.clone(), s)).collect();

        ProblemInstance {
            org_id,
            semester,
            courses: arena,
            course_index,
            faculty,
            rooms,
            time_slots,
            slot_lookup,
            students,
            student_course_index,
        }
    }

    pub fn course(&self, id: &CourseId) -> Option<&Course> {
        self.course_index.get(id).and_then(|k| self.courses.get(*k))
    }

    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.values()
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }

    pub fn faculty(&self, id: &super::ids::FacultyId) -> Option<&Faculty> {
        self.faculty.get(id.as_str())
    }

    pub fn student(&self, id: &StudentId) -> Option<&Student> {
        self.students.get(id.as_str())
    }

    pub fn slot_id_for(&self, day: u32, period: u32) -> Option<&TimeSlotId> {
        self.slot_lookup.get_by_right(&(day, period))
    }

    pub fn slot_coords(&self, id: &TimeSlotId) -> Option<(u32, u32)> {
        self.slot_lookup.get_by_left(id).copied()
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| &r.id == id)
    }

    /// Candidate time slots for scheduling: every slot except lunch breaks
    /// (spec §4.3: "Time slots exclude lunch breaks").
    pub fn schedulable_slots(&self) -> impl Iterator<Item = &TimeSlot> {
        self.time_slots.iter().filter(|s| !s.is_lunch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{DepartmentId, FacultyId};

    fn faculty(id: &str) -> Faculty {
        Faculty {
            id: FacultyId::new(id),
            code: id.to_string(),
            name: id.to_string(),
            department_id: DepartmentId::new("d1"),
            max_hours_per_week: 18,
            specialization: "generic".to_string(),
        }
    }

    #[test]
    fn slot_lookup_is_bidirectional() {
        let slot = crate::domain::entities::TimeSlot {
            id: TimeSlotId::new("5"),
            day_of_week: 0,
            period: 5,
            start_time: "14:00".into(),
            end_time: "15:00".into(),
            is_lunch: false,
        };
        let instance = ProblemInstance::build(
            OrgId::new("org"),
            1,
            vec![],
            vec![faculty("f1")],
            vec![],
            vec![slot],
            vec![],
        );
        assert_eq!(instance.slot_coords(&TimeSlotId::new("5")), Some((0, 5)));
        assert_eq!(instance.slot_id_for(0, 5), Some(&TimeSlotId::new("5")));
        assert!(instance.faculty(&FacultyId::new("f1")).is_some());
    }
}
