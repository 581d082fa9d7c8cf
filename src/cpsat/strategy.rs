#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentConflictMode {
    All,
    Critical,
    None,
}

/// One rung of the progressive relaxation ladder (spec §4.3).
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub hc4_mode: StudentConflictMode,
    pub hc1_faculty_conflict: bool,
    pub hc2_room_conflict: bool,
    pub hc3_faculty_workload: bool,
    pub hc5_per_day_cap: bool,
    pub hc6_fixed_slot: bool,
    pub timeout_seconds: f64,
}

pub const LADDER: [Strategy; 4] = [
    Strategy {
        name: "full",
        hc4_mode: StudentConflictMode::All,
        hc1_faculty_conflict: true,
        hc2_room_conflict: true,
        hc3_faculty_workload: true,
        hc5_per_day_cap: true,
        hc6_fixed_slot: true,
        timeout_seconds: 60.0,
    },
    Strategy {
        name: "relaxed_student",
        hc4_mode: StudentConflictMode::Critical,
        hc1_faculty_conflict: true,
        hc2_room_conflict: true,
        hc3_faculty_workload: true,
        hc5_per_day_cap: true,
        hc6_fixed_slot: true,
        timeout_seconds: 60.0,
    },
    Strategy {
        name: "faculty_room_only",
        hc4_mode: StudentConflictMode::None,
        hc1_faculty_conflict: true,
        hc2_room_conflict: true,
        hc3_faculty_workload: false,
        hc5_per_day_cap: false,
        hc6_fixed_slot: true,
        timeout_seconds: 45.0,
    },
    Strategy {
        name: "minimal",
        hc4_mode: StudentConflictMode::None,
        hc1_faculty_conflict: true,
        hc2_room_conflict: false,
        hc3_faculty_workload: false,
        hc5_per_day_cap: false,
        hc6_fixed_slot: true,
        timeout_seconds: 30.0,
    },
];

/// Students enrolled in at least this many courses of the cluster count as
/// "critical" under `StudentConflictMode::Critical` (spec §4.3 HC4).
pub const CRITICAL_ENROLLMENT_THRESHOLD: usize = 5;

/// Smaller clusters start at the top of the ladder; larger ones may start
/// further down to avoid wasting a 60s timeout on a model unlikely to be
/// feasible at full strictness (spec §4.3: "Smaller clusters should start
/// at strategy 0; larger ones may start further down").
pub fn starting_index(cluster_size: usize) -> usize {
    if cluster_size <= 8 {
        0
    } else if cluster_size <= 15 {
        1
    } else {
        2
    }
}
