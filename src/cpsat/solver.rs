use cp_sat::builder::CpModelBuilder;
use cp_sat::proto::{CpSolverStatus, SatParameters};

use super::constraints::{apply_constraints, create_vars};
use super::domains::build_candidate_domains;
use super::strategy::{LADDER, starting_index};
use crate::domain::assignment::{Assignment, Slot};
use crate::domain::entities::Course;
use crate::domain::problem_instance::ProblemInstance;

/// Workers per CP-SAT solve: `max(1, physical_cores / parallel_clusters)`
/// (spec §4.3 Solver parameters).
pub fn workers_per_cluster(physical_cores: usize, parallel_clusters: usize) -> usize {
    (physical_cores / parallel_clusters.max(1)).max(1)
}

/// Stage 2 contract (spec §4.3): tries strategies in the relaxation ladder
/// starting from `starting_index(cluster.len())`, returns the first
/// feasible assignment, or `None` if every strategy in range was
/// exhausted.
pub fn solve_cluster(
    courses: &[&Course],
    instance: &ProblemInstance,
    workers: usize,
) -> Option<Vec<Assignment>> {
    let domains = build_candidate_domains(courses, &instance.rooms, &instance.time_slots);
    let start = starting_index(courses.len());

    for strategy in &LADDER[start..] {
        let mut model = CpModelBuilder::new();
        let vars = create_vars(&mut model, &domains);
        apply_constraints(&mut model, &vars, &domains, courses, instance, strategy);

        let mut params = SatParameters::default();
        params.max_time_in_seconds = Some(strategy.timeout_seconds);
        params.num_search_workers = Some(workers as i32);
        params.random_seed = Some(42);
        params.search_branching = Some(2);

        let response = model.solve_with_parameters(&params);
        match response.status() {
            CpSolverStatus::Optimal | CpSolverStatus::Feasible => {
                log::info!(
                    "cluster of {} courses solved with strategy '{}'",
                    courses.len(),
                    strategy.name
                );
                return Some(extract_assignment(courses, &vars, &response));
            }
            _ => {
                log::warn!(
                    "strategy '{}' infeasible for cluster of {} courses, trying next",
                    strategy.name,
                    courses.len()
                );
            }
        }
    }

    None
}

fn extract_assignment(
    courses: &[&Course],
    vars: &super::constraints::Vars,
    response: &cp_sat::proto::CpSolverResponse,
) -> Vec<Assignment> {
    let mut entries = Vec::new();
    for course in courses {
        for session in 0..course.duration {
            let chosen = vars
                .iter()
                .find(|((c, s, _, _), v)| c == &course.id && *s == session && v.solution_value(response));
            if let Some(((_, session_index, slot, room), _)) = chosen {
                entries.push(Assignment {
                    course_id: course.id.clone(),
                    faculty_id: course.faculty_id.clone(),
                    room_id: room.clone(),
                    slot: Slot::Scheduled(slot.clone()),
                    session_index: *session_index,
                });
            }
        }
    }
    entries
}

/// Sentinel-fills every session of `courses` when no strategy produced a
/// feasible model (spec §4.3 Failure mode / §9 greedy fallback sentinel).
pub fn sentinel_fill(courses: &[&Course]) -> Vec<Assignment> {
    courses
        .iter()
        .flat_map(|course| {
            (0..course.duration).map(move |session| Assignment {
                course_id: course.id.clone(),
                faculty_id: course.faculty_id.clone(),
                room_id: crate::domain::ids::RoomId::new(crate::domain::ids::UNSCHEDULED_SENTINEL),
                slot: Slot::Unscheduled,
                session_index: session,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workers_per_cluster_respects_budget() {
        assert_eq!(workers_per_cluster(12, 6), 2);
        assert_eq!(workers_per_cluster(4, 6), 1);
    }
}
