use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::cpsat::CandidateDomains;
use crate::domain::assignment::Slot;

use super::individual::Individual;

const TOURNAMENT_SIZE: usize = 3;
pub const CROSSOVER_RATE: f64 = 0.8;
pub const MUTATION_RATE: f64 = 0.15;
pub const ELITISM_FRACTION: f64 = 0.2;

/// Tournament selection, size 3, best-wins (spec §4.5).
pub fn tournament_select<'a>(population: &'a [(Individual, f64)], rng: &mut StdRng) -> &'a Individual {
    let mut best: Option<&(Individual, f64)> = None;
    for _ in 0..TOURNAMENT_SIZE {
        let candidate = &population[rng.random_range(0..population.len())];
        if best.is_none_or(|b| candidate.1 > b.1) {
            best = Some(candidate);
        }
    }
    &best.expect("tournament pool is non-empty").0
}

/// Single-point crossover over the course id list (spec §4.5): the child
/// inherits every course's full session set from whichever parent owns
/// that course index's side of the cut point.
pub fn crossover(a: &Individual, b: &Individual, rng: &mut StdRng) -> Individual {
    if a.course_order.is_empty() || rng.random_bool(1.0 - CROSSOVER_RATE) {
        return a.clone();
    }
    let cut = rng.random_range(0..a.course_order.len());
    let mut child = a.clone();
    for course_id in &a.course_order[cut..] {
        if let Some(sessions) = b.sessions.get(course_id) {
            child.sessions.insert(course_id.clone(), sessions.clone());
        }
    }
    child
}

/// Per-`(course, session)` mutation: with probability `MUTATION_RATE`,
/// replace either the slot or the room (coin flip) with a uniform random
/// choice from its precomputed domain (spec §4.5).
pub fn mutate(individual: &mut Individual, domains: &CandidateDomains, rng: &mut StdRng) {
    for course_id in individual.course_order.clone() {
        let Some(sessions) = individual.sessions.get_mut(&course_id) else {
            continue;
        };
        for entry in sessions.iter_mut() {
            if !rng.random_bool(MUTATION_RATE) {
                continue;
            }
            let Some(candidates) = domains.get(&(entry.course_id.clone(), entry.session_index)) else {
                continue;
            };
            if candidates.is_empty() {
                continue;
            }
            let (slot, room) = candidates.choose(rng).unwrap().clone();
            if rng.random_bool(0.5) {
                entry.slot = Slot::Scheduled(slot);
            } else {
                entry.room_id = room;
            }
        }
    }
}

/// Top `ELITISM_FRACTION` of the population (by fitness, descending) carry
/// over unchanged each generation.
pub fn elite_count(population_size: usize) -> usize {
    ((population_size as f64) * ELITISM_FRACTION).ceil() as usize
}
