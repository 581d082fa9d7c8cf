use std::collections::HashMap;

use crate::domain::entities::{Course, Room, TimeSlot};
use crate::domain::ids::{CourseId, RoomId, TimeSlotId};

/// Candidate `(time_slot, room)` tuples for every `(course, session)` pair
/// in a cluster (spec §4.3 Domain precomputation). Built once per cluster,
/// independent of which strategy in the relaxation ladder ends up using
/// it.
pub type CandidateDomains = HashMap<(CourseId, u32), Vec<(TimeSlotId, RoomId)>>;

const MAX_ROOMS_PER_CANDIDATE: usize = 10;

fn room_matches(room: &Room, course: &Course) -> bool {
    let enrolled = course.enrolled_count as f64;
    let capacity_ok = room.capacity as f64 >= enrolled * 0.9 && room.capacity as f64 <= enrolled * 1.5;
    let type_ok = room.room_type.eq_ignore_ascii_case(&course.room_type_required);
    let dept_ok = room.allow_cross_department_usage
        || room.department_id.as_ref() == Some(&course.department_id);
    let features_ok = course.room_features().all(|f| room.features.iter().any(|rf| rf == f));
    capacity_ok && type_ok && dept_ok && features_ok
}

fn room_matches_relaxed(room: &Room, course: &Course) -> bool {
    let type_ok = room.room_type.eq_ignore_ascii_case(&course.room_type_required);
    let capacity_ok = room.capacity as f64 >= course.enrolled_count as f64 * 0.9;
    type_ok && capacity_ok
}

fn best_fit_rooms<'a>(rooms: impl Iterator<Item = &'a Room>, course: &Course) -> Vec<&'a Room> {
    let mut candidates: Vec<&Room> = rooms.collect();
    candidates.sort_by_key(|r| (r.capacity as i64 - course.enrolled_count as i64).abs());
    candidates.truncate(MAX_ROOMS_PER_CANDIDATE);
    candidates
}

/// Builds the candidate domain for every session of `course`. Two
/// relaxation fallbacks widen the room set when the strict filter is empty
/// (spec §4.3): first drop department/feature constraints, then drop the
/// room-type match as well.
fn candidate_rooms<'a>(course: &Course, rooms: &'a [Room]) -> Vec<&'a Room> {
    let strict: Vec<&Room> = rooms.iter().filter(|r| room_matches(r, course)).collect();
    if !strict.is_empty() {
        return best_fit_rooms(strict.into_iter(), course);
    }

    let relaxed: Vec<&Room> = rooms.iter().filter(|r| room_matches_relaxed(r, course)).collect();
    if !relaxed.is_empty() {
        return best_fit_rooms(relaxed.into_iter(), course);
    }

    best_fit_rooms(rooms.iter(), course)
}

pub fn build_candidate_domains(courses: &[&Course], rooms: &[Room], time_slots: &[TimeSlot]) -> CandidateDomains {
    let schedulable: Vec<&TimeSlot> = time_slots.iter().filter(|s| !s.is_lunch).collect();
    let mut domains = CandidateDomains::new();

    for course in courses {
        let room_set = candidate_rooms(course, rooms);
        let slots: Vec<&TimeSlot> = if let Some(fixed) = course.fixed_slot() {
            schedulable
                .iter()
                .copied()
                .filter(|s| s.id == fixed)
                .collect()
        } else {
            schedulable.clone()
        };

        for session in 0..course.duration {
            let tuples: Vec<(TimeSlotId, RoomId)> = slots
                .iter()
                .flat_map(|slot| room_set.iter().map(move |room| (slot.id.clone(), room.id.clone())))
                .collect();
            domains.insert((course.id.clone(), session), tuples);
        }
    }

    domains
}
