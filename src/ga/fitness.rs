use std::collections::HashMap;

use crate::domain::assignment::Assignment;
use crate::domain::ids::{RoomId, StudentId, TimeSlotId};
use crate::domain::problem_instance::ProblemInstance;
use crate::domain::variant::ObjectiveWeights;

use super::individual::Individual;

#[derive(Debug, Clone, Copy, Default)]
pub struct FitnessComponents {
    pub faculty_preference: f64,
    pub room_utilization: f64,
    pub peak_spreading: f64,
    pub student_conflict: f64,
}

impl FitnessComponents {
    pub fn weighted_sum(&self, weights: &ObjectiveWeights) -> f64 {
        weights.dot(
            self.faculty_preference,
            self.room_utilization,
            self.peak_spreading,
            self.student_conflict,
        )
    }
}

/// Fitness evaluation (spec §4.5). All four components start at a 100
/// baseline and are penalized/rewarded per assignment; higher is better.
pub fn evaluate(individual: &Individual, instance: &ProblemInstance, slots_per_day: u32) -> FitnessComponents {
    let entries = individual.entries();
    let scheduled: Vec<&Assignment> = entries.iter().filter(|e| Individual::is_scheduled_entry(e)).collect();

    FitnessComponents {
        faculty_preference: faculty_preference(&scheduled, instance, slots_per_day),
        room_utilization: room_utilization(&scheduled, instance),
        peak_spreading: peak_spreading(&scheduled),
        student_conflict: student_conflict(&scheduled, instance),
    }
}

fn faculty_preference(entries: &[&Assignment], instance: &ProblemInstance, slots_per_day: u32) -> f64 {
    let mut score = 100.0;
    for entry in entries {
        let coords = entry.slot.time_slot_id().and_then(|id| instance.slot_coords(id));
        let Some((_, period)) = coords else { continue };
        if period == 0 {
            score -= 5.0;
        } else if period >= slots_per_day.saturating_sub(2) {
            score -= 3.0;
        } else if (1..=5).contains(&period) {
            score += 1.0;
        }
    }
    score
}

fn room_utilization(entries: &[&Assignment], instance: &ProblemInstance) -> f64 {
    let mut score = 100.0;
    for entry in entries {
        let Some(room) = instance.room(&entry.room_id) else { continue };
        let Some(course) = instance.course(&entry.course_id) else { continue };
        let enrolled = course.enrolled_count as f64;
        let capacity = room.capacity as f64;
        if capacity > enrolled * 2.0 {
            score -= 5.0;
        } else if capacity > enrolled * 1.5 {
            score -= 2.0;
        } else if capacity >= enrolled && capacity <= enrolled * 1.5 {
            score += 2.0;
        }
    }
    score
}

fn peak_spreading(entries: &[&Assignment]) -> f64 {
    let mut counts: HashMap<TimeSlotId, u32> = HashMap::new();
    for entry in entries {
        if let Some(slot) = entry.slot.time_slot_id() {
            *counts.entry(slot.clone()).or_insert(0) += 1;
        }
    }
    if counts.is_empty() {
        return 100.0;
    }
    let max_count = *counts.values().max().unwrap() as f64;
    let avg_count = counts.values().sum::<u32>() as f64 / counts.len() as f64;
    let mut score = 100.0;
    if max_count > 2.0 * avg_count {
        score -= (max_count - 2.0 * avg_count) * 10.0;
    }
    score
}

fn student_conflict(entries: &[&Assignment], instance: &ProblemInstance) -> f64 {
    let mut counts: HashMap<(StudentId, TimeSlotId), u32> = HashMap::new();
    for entry in entries {
        let Some(slot) = entry.slot.time_slot_id() else { continue };
        let Some(students) = instance.student_course_index.get(&entry.course_id) else {
            continue;
        };
        for student in students {
            *counts.entry((student.clone(), slot.clone())).or_insert(0) += 1;
        }
    }
    let mut score = 100.0;
    for count in counts.values() {
        if *count > 1 {
            score -= 20.0 * (*count - 1) as f64;
        }
    }
    score
}

/// Faculty double-bookings + room double-bookings across `entries` (spec
/// §4.7 Persister "conflicts_count").
pub fn conflicts_count(entries: &[Assignment]) -> u32 {
    let mut faculty_slots: HashMap<(TimeSlotId, String), u32> = HashMap::new();
    let mut room_slots: HashMap<(TimeSlotId, RoomId), u32> = HashMap::new();
    let mut conflicts = 0u32;
    for entry in entries {
        let Some(slot) = entry.slot.time_slot_id() else { continue };
        let fc = faculty_slots
            .entry((slot.clone(), entry.faculty_id.as_str().to_string()))
            .or_insert(0);
        *fc += 1;
        if *fc > 1 {
            conflicts += 1;
        }
        let rc = room_slots.entry((slot.clone(), entry.room_id.clone())).or_insert(0);
        *rc += 1;
        if *rc > 1 {
            conflicts += 1;
        }
    }
    conflicts
}

pub fn room_utilization_pct(entries: &[Assignment], total_rooms: usize) -> f64 {
    if total_rooms == 0 {
        return 0.0;
    }
    let used: std::collections::HashSet<&RoomId> = entries
        .iter()
        .filter_map(|e| e.slot.time_slot_id().map(|_| &e.room_id))
        .collect();
    100.0 * used.len() as f64 / total_rooms as f64
}
