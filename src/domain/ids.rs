use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// A phantom-typed string id, so `CourseId` and `RoomId` cannot be swapped
/// by accident even though both are plain strings at rest.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Id<T> {
    pub id: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Id {
            id: id.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> From<Id<T>> for String {
    fn from(id: Id<T>) -> Self {
        id.id
    }
}

impl<T> From<&str> for Id<T> {
    fn from(s: &str) -> Self {
        Id::new(s)
    }
}

impl<T> From<String> for Id<T> {
    fn from(s: String) -> Self {
        Id::new(s)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.split("::").last().unwrap_or(full_name);
        write!(f, "{}({:?})", clean_name, self.id)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct CourseTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct FacultyTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct RoomTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct TimeSlotTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct StudentTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct DepartmentTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct OrgTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct JobTag;

pub type CourseId = Id<CourseTag>;
pub type FacultyId = Id<FacultyTag>;
pub type RoomId = Id<RoomTag>;
pub type TimeSlotId = Id<TimeSlotTag>;
pub type StudentId = Id<StudentTag>;
pub type DepartmentId = Id<DepartmentTag>;
pub type OrgId = Id<OrgTag>;
pub type JobId = Id<JobTag>;

/// Reserved time-slot id recorded for a course/session that could not be
/// scheduled by any CP-SAT strategy (the "greedy fallback sentinel" of
/// spec §3). Downstream components (persister, metrics, invariant checks)
/// must detect and exclude entries carrying this id.
pub const UNSCHEDULED_SENTINEL: &str = "__UNSCHEDULED__";

pub fn is_unscheduled(slot: &TimeSlotId) -> bool {
    slot.as_str() == UNSCHEDULED_SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_slot_is_detected() {
        assert!(is_unscheduled(&TimeSlotId::new(UNSCHEDULED_SENTINEL)));
        assert!(!is_unscheduled(&TimeSlotId::new("t1")));
    }

    #[test]
    fn ids_with_the_same_string_are_equal_regardless_of_origin() {
        assert_eq!(CourseId::new("c1"), CourseId::from("c1"));
        assert_eq!(CourseId::new("c1"), CourseId::from("c1".to_string()));
    }

    #[test]
    fn serializes_as_a_bare_string() {
        let id = CourseId::new("c1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"c1\"");
        let back: CourseId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
