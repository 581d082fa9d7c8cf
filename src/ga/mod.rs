mod fitness;
mod individual;
mod operators;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::cpsat::{CandidateDomains, build_candidate_domains};
use crate::domain::assignment::Assignment;
use crate::domain::entities::Course;
use crate::domain::problem_instance::ProblemInstance;
use crate::domain::variant::{ObjectiveWeights, Variant, normalize_scores};

use fitness::{conflicts_count, evaluate, room_utilization_pct};
use individual::Individual;
use operators::{crossover, elite_count, mutate, tournament_select};

pub const POPULATION_SIZE: usize = 20;
pub const GENERATIONS: usize = 25;

struct Profile {
    label: &'static str,
    weights: ObjectiveWeights,
    seed: u64,
}

const PROFILES: [Profile; 3] = [
    Profile {
        label: "Faculty-Friendly",
        weights: ObjectiveWeights::FACULTY_FRIENDLY,
        seed: 42,
    },
    Profile {
        label: "Room-Efficient",
        weights: ObjectiveWeights::ROOM_EFFICIENT,
        seed: 55,
    },
    Profile {
        label: "Student-Spread",
        weights: ObjectiveWeights::STUDENT_SPREAD,
        seed: 68,
    },
];

/// Stage 2b entry point (spec §4.5): runs the GA three times with fixed
/// weight/seed profiles over the same initial assignment, producing three
/// variants with per-run-normalized scores. `cancel_check` is polled
/// between generations (the GA's SafePoint); a cancellation stops the
/// current variant's evolution early and still returns its best individual
/// so far rather than aborting the whole optimizer.
pub fn optimize(
    initial_assignment: &[Assignment],
    instance: &ProblemInstance,
    mut cancel_check: impl FnMut() -> bool,
    mut on_generation: impl FnMut(usize, usize, usize),
) -> Vec<Variant> {
    if initial_assignment.is_empty() {
        return vec![];
    }

    let courses: Vec<&Course> = instance.courses().collect();
    let domains = build_candidate_domains(&courses, &instance.rooms, &instance.time_slots);
    let slots_per_day = instance
        .time_slots
        .iter()
        .map(|s| s.period)
        .max()
        .map(|m| m + 1)
        .unwrap_or(1);

    let mut variants = Vec::with_capacity(PROFILES.len());
    for (idx, profile) in PROFILES.iter().enumerate() {
        let variant = run_ga(
            profile,
            initial_assignment,
            &domains,
            instance,
            slots_per_day,
            &mut cancel_check,
            |gen| on_generation(idx, gen, GENERATIONS),
        );
        variants.push(variant);
    }

    normalize_scores(&mut variants);
    variants
}

fn run_ga(
    profile: &Profile,
    initial: &[Assignment],
    domains: &CandidateDomains,
    instance: &ProblemInstance,
    slots_per_day: u32,
    cancel_check: &mut impl FnMut() -> bool,
    mut on_generation: impl FnMut(usize),
) -> Variant {
    let mut rng = StdRng::seed_from_u64(profile.seed);
    let seed_individual = Individual::from_entries(initial);

    let mut population: Vec<Individual> = vec![seed_individual.clone()];
    for _ in 1..POPULATION_SIZE {
        let mut mutant = seed_individual.clone();
        mutate(&mut mutant, domains, &mut rng);
        population.push(mutant);
    }

    let mut best = seed_individual.clone();
    let mut best_fitness = f64::MIN;

    for generation in 0..GENERATIONS {
        if cancel_check() {
            log::info!("GA cancelled for variant '{}' at generation {generation}", profile.label);
            break;
        }

        let scored: Vec<(Individual, f64)> = population
            .into_iter()
            .map(|ind| {
                let fitness = evaluate(&ind, instance, slots_per_day).weighted_sum(&profile.weights);
                (ind, fitness)
            })
            .collect();

        if let Some((ind, fitness)) = scored.iter().max_by(|a, b| a.1.total_cmp(&b.1)) {
            if *fitness > best_fitness {
                best_fitness = *fitness;
                best = ind.clone();
            }
        }

        let mut ranked = scored.clone();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let elites = elite_count(ranked.len());

        let mut next_gen: Vec<Individual> = ranked.iter().take(elites).map(|(ind, _)| ind.clone()).collect();
        while next_gen.len() < POPULATION_SIZE {
            let parent_a = tournament_select(&ranked, &mut rng);
            let parent_b = tournament_select(&ranked, &mut rng);
            let mut child = crossover(parent_a, parent_b, &mut rng);
            mutate(&mut child, domains, &mut rng);
            next_gen.push(child);
        }
        population = next_gen;

        on_generation(generation + 1);
    }

    let entries = best.entries();
    let conflicts = conflicts_count(&entries);
    let room_pct = room_utilization_pct(&entries, instance.rooms.len());

    let mut variant = Variant::new(profile.label, profile.weights, profile.seed, entries);
    variant.fitness = best_fitness;
    variant.conflicts_count = conflicts;
    variant.room_utilization_pct = room_pct;
    variant
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assignment::Slot;
    use crate::domain::entities::{Faculty, Room, TimeSlot};
    use crate::domain::ids::{CourseId, DepartmentId, FacultyId, OrgId, RoomId, TimeSlotId};
    use std::collections::HashSet;

    fn tiny_instance() -> ProblemInstance {
        ProblemInstance::build(
            OrgId::new("org"),
            1,
            vec![Course {
                id: CourseId::new("c1"),
                code: "CS101".into(),
                name: "Intro".into(),
                department_id: DepartmentId::new("d1"),
                faculty_id: FacultyId::new("f1"),
                co_faculty_ids: vec![],
                credits: 3,
                duration: 1,
                room_type_required: "lecture".into(),
                required_features: vec![],
                student_ids: HashSet::new(),
                enrolled_count: 30,
            }],
            vec![Faculty {
                id: FacultyId::new("f1"),
                code: "F1".into(),
                name: "Prof".into(),
                department_id: DepartmentId::new("d1"),
                max_hours_per_week: 18,
                specialization: "cs".into(),
            }],
            vec![Room {
                id: RoomId::new("r1"),
                code: "R1".into(),
                name: "Room 1".into(),
                room_type: "lecture".into(),
                capacity: 40,
                features: vec![],
                department_id: None,
                allow_cross_department_usage: true,
            }],
            vec![TimeSlot {
                id: TimeSlotId::new("t1"),
                day_of_week: 0,
                period: 0,
                start_time: "09:00".into(),
                end_time: "10:00".into(),
                is_lunch: false,
            }],
            vec![],
        )
    }

    fn seed_entries() -> Vec<Assignment> {
        vec![Assignment {
            course_id: CourseId::new("c1"),
            faculty_id: FacultyId::new("f1"),
            room_id: RoomId::new("r1"),
            slot: Slot::Scheduled(TimeSlotId::new("t1")),
            session_index: 0,
        }]
    }

    #[test]
    fn empty_initial_assignment_returns_no_variants() {
        let instance = tiny_instance();
        let variants = optimize(&[], &instance, || false, |_, _, _| {});
        assert!(variants.is_empty());
    }

    #[test]
    fn produces_one_variant_per_profile_with_normalized_scores() {
        let instance = tiny_instance();
        let variants = optimize(&seed_entries(), &instance, || false, |_, _, _| {});
        assert_eq!(variants.len(), PROFILES.len());
        for variant in &variants {
            assert!((0.0..=100.0).contains(&variant.normalized_score));
        }
    }

    #[test]
    fn same_seed_and_instance_is_deterministic() {
        let instance = tiny_instance();
        let first = optimize(&seed_entries(), &instance, || false, |_, _, _| {});
        let second = optimize(&seed_entries(), &instance, || false, |_, _, _| {});
        let first_scores: Vec<f64> = first.iter().map(|v| v.fitness).collect();
        let second_scores: Vec<f64> = second.iter().map(|v| v.fitness).collect();
        assert_eq!(first_scores, second_scores);
    }

    #[test]
    fn cancellation_stops_early_without_losing_the_best_individual() {
        let instance = tiny_instance();
        let mut calls = 0;
        let variants = optimize(
            &seed_entries(),
            &instance,
            || {
                calls += 1;
                calls > 1
            },
            |_, _, _| {},
        );
        assert_eq!(variants.len(), PROFILES.len());
        for variant in &variants {
            assert!(!variant.entries.is_empty());
        }
    }
}
