use std::collections::HashMap;

use crate::domain::assignment::{Assignment, Slot};
use crate::domain::ids::CourseId;

/// A candidate schedule, grouped by course so crossover/mutation can work
/// at the course granularity the spec describes (spec §4.5: "children
/// inherit each course's full session set from one parent at a time").
#[derive(Debug, Clone)]
pub struct Individual {
    pub course_order: Vec<CourseId>,
    pub sessions: HashMap<CourseId, Vec<Assignment>>,
}

impl Individual {
    pub fn from_entries(entries: &[Assignment]) -> Self {
        let mut sessions: HashMap<CourseId, Vec<Assignment>> = HashMap::new();
        let mut course_order = Vec::new();
        for entry in entries {
            if !sessions.contains_key(&entry.course_id) {
                course_order.push(entry.course_id.clone());
            }
            sessions.entry(entry.course_id.clone()).or_default().push(entry.clone());
        }
        Individual { course_order, sessions }
    }

    pub fn entries(&self) -> Vec<Assignment> {
        self.course_order
            .iter()
            .flat_map(|c| self.sessions.get(c).cloned().unwrap_or_default())
            .collect()
    }

    pub fn is_scheduled_entry(entry: &Assignment) -> bool {
        !matches!(entry.slot, Slot::Unscheduled)
    }
}
