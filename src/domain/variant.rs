use serde::{Deserialize, Serialize};

use super::assignment::Assignment;

/// Fixed GA weight profile (spec §4.5): one of three deterministic runs,
/// each weighting the four fitness components (faculty preference, room
/// utilization, peak spreading, student conflict) differently so the three
/// variants trade off against each other rather than converge on the same
/// schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub faculty: f64,
    pub room: f64,
    pub spread: f64,
    pub student: f64,
}

impl ObjectiveWeights {
    /// "Faculty-Friendly"
    pub const FACULTY_FRIENDLY: ObjectiveWeights = ObjectiveWeights {
        faculty: 0.55,
        room: 0.20,
        spread: 0.15,
        student: 0.10,
    };
    /// "Room-Efficient"
    pub const ROOM_EFFICIENT: ObjectiveWeights = ObjectiveWeights {
        faculty: 0.20,
        room: 0.55,
        spread: 0.15,
        student: 0.10,
    };
    /// "Student-Spread"
    pub const STUDENT_SPREAD: ObjectiveWeights = ObjectiveWeights {
        faculty: 0.20,
        room: 0.20,
        spread: 0.45,
        student: 0.15,
    };

    pub fn dot(&self, faculty: f64, room: f64, spread: f64, student: f64) -> f64 {
        self.faculty * faculty + self.room * room + self.spread * spread + self.student * student
    }
}

/// One of the three candidate timetables produced by Stage 2b, before the
/// optional RL refinement pass. `fitness` is the raw weighted-sum score;
/// `normalized_score` rescales it to `[0, 100]` across the three variants
/// so the persister and API consumers have a stable comparison axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub variant_id: String,
    pub label: String,
    pub weights: ObjectiveWeights,
    pub seed: u64,
    pub fitness: f64,
    pub normalized_score: f64,
    pub entries: Vec<Assignment>,
    pub conflicts_count: u32,
    pub room_utilization_pct: f64,
}

impl Variant {
    pub fn new(label: &str, weights: ObjectiveWeights, seed: u64, entries: Vec<Assignment>) -> Self {
        Variant {
            variant_id: format!("{label}-{seed}"),
            label: label.to_string(),
            weights,
            seed,
            fitness: 0.0,
            normalized_score: 0.0,
            entries,
            conflicts_count: 0,
            room_utilization_pct: 0.0,
        }
    }
}

/// Rescales `fitness` values in place to `[0, 100]`: `100 * fitness /
/// max(fitness)` over the run (spec §3 `Variant`, §9 "normalized fitness").
/// Non-transferable across runs by design — the source divides by the
/// per-run max rather than a fixed theoretical ceiling, and this preserves
/// that observed behavior rather than inventing a fixed denominator.
/// When every variant has non-positive max fitness (degenerate case, e.g. a
/// single-course cluster with zero score), every variant is pinned to
/// `100.0` rather than dividing by zero.
pub fn normalize_scores(variants: &mut [Variant]) {
    let max = variants.iter().fold(f64::MIN, |hi, v| hi.max(v.fitness));
    for v in variants.iter_mut() {
        v.normalized_score = if max.abs() < f64::EPSILON {
            100.0
        } else {
            100.0 * v.fitness / max
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_across_distinct_fitness() {
        let mut variants = vec![
            Variant::new("a", ObjectiveWeights::FACULTY_FRIENDLY, 42, vec![]),
            Variant::new("b", ObjectiveWeights::ROOM_EFFICIENT, 55, vec![]),
        ];
        variants[0].fitness = 10.0;
        variants[1].fitness = 20.0;
        normalize_scores(&mut variants);
        assert_eq!(variants[0].normalized_score, 50.0);
        assert_eq!(variants[1].normalized_score, 100.0);
    }

    #[test]
    fn degenerate_zero_fitness_normalizes_to_hundred() {
        let mut variants = vec![
            Variant::new("a", ObjectiveWeights::FACULTY_FRIENDLY, 42, vec![]),
            Variant::new("b", ObjectiveWeights::ROOM_EFFICIENT, 55, vec![]),
        ];
        variants[0].fitness = 0.0;
        variants[1].fitness = 0.0;
        normalize_scores(&mut variants);
        assert_eq!(variants[0].normalized_score, 100.0);
        assert_eq!(variants[1].normalized_score, 100.0);
    }
}
