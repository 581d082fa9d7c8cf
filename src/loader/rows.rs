use std::collections::HashSet;

use serde::Deserialize;

use crate::domain::entities::{Course, Faculty, Room, Student};
use crate::domain::ids::{CourseId, DepartmentId, FacultyId, RoomId, StudentId};

const ZERO_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// One row of the `course_offerings` join the primary store returns (spec
/// §4.1, §6): the enrollment-bearing unit the loader fans out into
/// `Course` sections.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCourseRow {
    pub offering_id: String,
    pub course_id: String,
    pub code: String,
    pub name: String,
    pub department_id: String,
    pub faculty_id: Option<String>,
    #[serde(default)]
    pub co_faculty_ids: Vec<String>,
    pub credits: u32,
    pub duration: u32,
    pub room_type_required: String,
    #[serde(default)]
    pub required_features: Vec<String>,
    #[serde(default)]
    pub student_ids: Vec<String>,
}

impl RawCourseRow {
    /// Drops rows with a null, empty, or all-zero-UUID primary faculty id
    /// (spec §4.1 Validation).
    pub fn has_valid_faculty(&self) -> bool {
        match &self.faculty_id {
            Some(id) => !id.is_empty() && id != ZERO_UUID,
            None => false,
        }
    }

    pub fn into_domain(self, section_index: usize, valid_faculty: &HashSet<FacultyId>) -> Course {
        let primary = FacultyId::new(self.faculty_id.clone().unwrap_or_default());
        let mut pool = vec![primary];
        for co in &self.co_faculty_ids {
            let id = FacultyId::new(co.clone());
            if valid_faculty.contains(&id) {
                pool.push(id);
            }
        }
        let faculty_id = pool[section_index % pool.len()].clone();

        Course {
            id: CourseId::new(self.offering_id.clone()),
            code: self.code,
            name: self.name,
            department_id: DepartmentId::new(self.department_id),
            faculty_id,
            co_faculty_ids: self.co_faculty_ids.into_iter().map(FacultyId::new).collect(),
            credits: self.credits,
            duration: self.duration,
            room_type_required: self.room_type_required,
            required_features: self.required_features,
            enrolled_count: self.student_ids.len(),
            student_ids: self.student_ids.into_iter().map(StudentId::new).collect::<HashSet<_>>(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFacultyRow {
    pub id: String,
    pub code: String,
    pub name: String,
    pub department_id: String,
    pub max_hours_per_week: u32,
    pub specialization: String,
}

impl RawFacultyRow {
    pub fn into_domain(self) -> Faculty {
        Faculty {
            id: FacultyId::new(self.id),
            code: self.code,
            name: self.name,
            department_id: DepartmentId::new(self.department_id),
            max_hours_per_week: self.max_hours_per_week,
            specialization: self.specialization,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRoomRow {
    pub id: String,
    pub code: String,
    pub name: String,
    pub room_type: String,
    pub capacity: u32,
    #[serde(default)]
    pub features: Vec<String>,
    pub department_id: Option<String>,
    #[serde(default)]
    pub allow_cross_department_usage: bool,
}

impl RawRoomRow {
    pub fn into_domain(self) -> Room {
        Room {
            id: RoomId::new(self.id),
            code: self.code,
            name: self.name,
            room_type: self.room_type,
            capacity: self.capacity,
            features: self.features,
            department_id: self.department_id.map(DepartmentId::new),
            allow_cross_department_usage: self.allow_cross_department_usage,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStudentRow {
    pub id: String,
    pub enrollment_number: String,
    pub department_id: String,
    pub semester: u32,
}

impl RawStudentRow {
    pub fn into_domain(self) -> Student {
        Student {
            id: StudentId::new(self.id),
            enrollment_number: self.enrollment_number,
            department_id: DepartmentId::new(self.department_id),
            semester: self.semester,
        }
    }
}
