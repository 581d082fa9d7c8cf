mod audit;
mod qtable;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rand::Rng;
use rand::rngs::StdRng;

pub use audit::{AuditLog, AuditRecord};
pub use qtable::{ConflictType, PeriodBand, QTable, StateKey, UtilizationBand};

use crate::cpsat::{CandidateDomains, build_candidate_domains};
use crate::domain::assignment::{Assignment, Slot};
use crate::domain::entities::Course;
use crate::domain::ids::{JobId, RoomId, TimeSlotId};
use crate::domain::problem_instance::ProblemInstance;

/// Frozen exploration rate (spec §4.6: "ε frozen at 0.05").
pub const EPSILON: f64 = 0.05;
const MIN_CANDIDATES: usize = 2;
const MAX_CANDIDATES: usize = 5;

/// Stage 3 entry point (spec §4.6). Returns the input unchanged if no
/// policy exists for `semester`, or on any internal error — Stage 3 is
/// never allowed to fail the saga (spec §7 `RefinerError`: "recovered:
/// return input unchanged").
pub fn refine(
    assignment: Vec<Assignment>,
    instance: &ProblemInstance,
    policy_dir: &Path,
    semester: u8,
    job_id: &JobId,
    audit: Option<&AuditLog>,
    rng: &mut StdRng,
    mut cancel_check: impl FnMut() -> bool,
) -> Vec<Assignment> {
    let policy = match QTable::load(policy_dir, semester) {
        Ok(Some(p)) => p,
        Ok(None) => {
            log::debug!("no frozen RL policy for semester {semester}; Stage 3 is a no-op");
            return assignment;
        }
        Err(e) => {
            log::warn!("failed to load RL policy: {e}; Stage 3 is a no-op");
            return assignment;
        }
    };

    let courses: Vec<&Course> = instance.courses().collect();
    let domains = build_candidate_domains(&courses, &instance.rooms, &instance.time_slots);
    let slots_per_day = instance.time_slots.iter().map(|s| s.period).max().map(|m| m + 1).unwrap_or(1);

    let mut current = assignment;
    let conflicted_indices = conflicting_entries(&current);

    for idx in conflicted_indices {
        if cancel_check() {
            log::info!("RL refinement cancelled between episodes");
            break;
        }

        let entry = &current[idx];
        if matches!(entry.slot, Slot::Unscheduled) {
            continue;
        }

        let candidates = local_swap_candidates(entry, &domains, &current, idx);
        if candidates.is_empty() {
            continue;
        }

        let state = encode_state(entry, instance, slots_per_day);
        let (chosen_idx, q_value, exploratory) = select_action(&policy, &state, candidates.len(), rng);

        if let Some(audit) = audit {
            audit.record(AuditRecord {
                job_id: job_id.clone(),
                course_id: entry.course_id.clone(),
                session_index: entry.session_index,
                candidate_count: candidates.len(),
                chosen_index: chosen_idx,
                chosen_q_value: q_value,
                exploratory,
            });
        }

        let (slot, room) = candidates[chosen_idx].clone();
        current[idx].slot = Slot::Scheduled(slot);
        current[idx].room_id = room;
    }

    current
}

fn encode_state(entry: &Assignment, instance: &ProblemInstance, slots_per_day: u32) -> StateKey {
    let period = entry
        .slot
        .time_slot_id()
        .and_then(|id| instance.slot_coords(id))
        .map(|(_, p)| p)
        .unwrap_or(0);
    let (capacity, enrolled) = instance
        .room(&entry.room_id)
        .zip(instance.course(&entry.course_id))
        .map(|(r, c)| (r.capacity, c.enrolled_count as u32))
        .unwrap_or((0, 1));

    StateKey {
        conflict_type: ConflictType::None,
        period_band: PeriodBand::of(period, slots_per_day),
        utilization_band: UtilizationBand::of(capacity, enrolled),
    }
}

/// ε-greedy selection (spec §4.6): with probability ε pick a uniformly
/// random candidate, otherwise the best-Q candidate; ties broken by
/// candidate order. Missing Q-values for a state fall back to index 0.
fn select_action(policy: &QTable, state: &StateKey, num_candidates: usize, rng: &mut StdRng) -> (usize, f64, bool) {
    let values = policy.q_values(state);

    if rng.random_bool(EPSILON) {
        let idx = rng.random_range(0..num_candidates);
        let q = values.and_then(|v| v.get(idx)).copied().unwrap_or(0.0);
        return (idx, q, true);
    }

    match values {
        Some(values) => {
            let mut best_idx = 0;
            let mut best_q = f64::MIN;
            for (i, &q) in values.iter().take(num_candidates).enumerate() {
                if q > best_q {
                    best_q = q;
                    best_idx = i;
                }
            }
            (best_idx, best_q, false)
        }
        None => (0, 0.0, false),
    }
}

/// Indices of entries participating in a faculty, room, or student
/// double-booking in the current assignment.
fn conflicting_entries(entries: &[Assignment]) -> Vec<usize> {
    let mut faculty_slots: HashMap<(TimeSlotId, String), Vec<usize>> = HashMap::new();
    let mut room_slots: HashMap<(TimeSlotId, RoomId), Vec<usize>> = HashMap::new();

    for (i, entry) in entries.iter().enumerate() {
        let Some(slot) = entry.slot.time_slot_id() else { continue };
        faculty_slots
            .entry((slot.clone(), entry.faculty_id.as_str().to_string()))
            .or_default()
            .push(i);
        room_slots.entry((slot.clone(), entry.room_id.clone())).or_default().push(i);
    }

    let mut conflicted: HashSet<usize> = HashSet::new();
    for indices in faculty_slots.values().chain(room_slots.values()) {
        if indices.len() > 1 {
            conflicted.extend(indices.iter().copied());
        }
    }
    let mut out: Vec<usize> = conflicted.into_iter().collect();
    out.sort_unstable();
    out
}

/// 2-5 valid local swaps for `entry` (spec §4.6 Action space): candidates
/// from its precomputed domain that would not put it back in the same
/// slot/room it already occupies, truncated to `MAX_CANDIDATES` and
/// padded only up to what the domain actually offers.
fn local_swap_candidates(
    entry: &Assignment,
    domains: &CandidateDomains,
    current: &[Assignment],
    entry_idx: usize,
) -> Vec<(TimeSlotId, RoomId)> {
    let Some(domain) = domains.get(&(entry.course_id.clone(), entry.session_index)) else {
        return vec![];
    };

    let occupied: HashSet<(TimeSlotId, RoomId)> = current
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != entry_idx)
        .filter_map(|(_, e)| e.slot.time_slot_id().map(|s| (s.clone(), e.room_id.clone())))
        .collect();

    let current_tuple = entry.slot.time_slot_id().map(|s| (s.clone(), entry.room_id.clone()));

    let candidates: Vec<(TimeSlotId, RoomId)> = domain
        .iter()
        .filter(|tuple| Some((*tuple).clone()) != current_tuple)
        .filter(|tuple| !occupied.contains(tuple))
        .take(MAX_CANDIDATES)
        .cloned()
        .collect();

    if candidates.len() < MIN_CANDIDATES { vec![] } else { candidates }
}
