use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Discrete state key (spec §4.6): conflict-type tag, time-slot period
/// band, and room-utilization band — 3 of the "4-6 dimensions" the spec
/// allows, chosen as the minimal set that separates the swap decisions
/// Stage 3 actually needs to make.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub conflict_type: ConflictType,
    pub period_band: PeriodBand,
    pub utilization_band: UtilizationBand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictType {
    FacultyDoubleBooked,
    RoomDoubleBooked,
    StudentDoubleBooked,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodBand {
    Early,
    Mid,
    Late,
}

impl PeriodBand {
    pub fn of(period: u32, slots_per_day: u32) -> Self {
        if period == 0 {
            PeriodBand::Early
        } else if period >= slots_per_day.saturating_sub(2) {
            PeriodBand::Late
        } else {
            PeriodBand::Mid
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UtilizationBand {
    Low,
    Medium,
    High,
}

impl UtilizationBand {
    pub fn of(capacity: u32, enrolled: u32) -> Self {
        if enrolled == 0 {
            return UtilizationBand::Low;
        }
        let ratio = capacity as f64 / enrolled as f64;
        if ratio > 1.5 {
            UtilizationBand::Low
        } else if ratio >= 1.0 {
            UtilizationBand::Medium
        } else {
            UtilizationBand::High
        }
    }
}

/// A frozen Q-table: `(state, action_index) -> value`. Loaded once per
/// semester and shared read-only across refinement calls (spec §4.6
/// Invariant: "no Q-value is updated during a generation run").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QTable {
    values: HashMap<StateKey, Vec<f64>>,
}

impl QTable {
    /// Loads a frozen policy for `semester` from `policy_dir/<semester>.json`.
    /// Missing file is a clean no-op (spec §4.6): `Ok(None)`, not an error.
    pub fn load(policy_dir: &Path, semester: u8) -> crate::error::Result<Option<QTable>> {
        let path = policy_dir.join(format!("{semester}.json"));
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        let table: QTable = serde_json::from_slice(&bytes)?;
        Ok(Some(table))
    }

    pub fn q_values(&self, state: &StateKey) -> Option<&[f64]> {
        self.values.get(state).map(|v| v.as_slice())
    }

    #[cfg(test)]
    pub fn insert(&mut self, state: StateKey, values: Vec<f64>) {
        self.values.insert(state, values);
    }
}
