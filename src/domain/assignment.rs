use serde::{Deserialize, Serialize};

use super::ids::{CourseId, FacultyId, RoomId, TimeSlotId, UNSCHEDULED_SENTINEL, is_unscheduled};

/// One scheduled (or unscheduled) session of a course. The CP-SAT solver,
/// the GA and the RL refiner all operate on `Vec<Assignment>` as their
/// common currency; the persister is the only component that needs to know
/// about the sentinel encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub course_id: CourseId,
    pub faculty_id: FacultyId,
    pub room_id: RoomId,
    pub slot: Slot,
    pub session_index: u32,
}

/// A session's placement: either pinned to a real time slot, or marked
/// unscheduled after every CP-SAT strategy in the relaxation ladder failed
/// (spec §4.3's greedy fallback). Kept as an enum in memory so "is this
/// entry malformed" is a type-level question; `UNSCHEDULED_SENTINEL` only
/// exists at the serialization/persistence boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Slot {
    Scheduled(TimeSlotId),
    Unscheduled,
}

impl Slot {
    pub fn is_unscheduled(&self) -> bool {
        matches!(self, Slot::Unscheduled)
    }

    pub fn time_slot_id(&self) -> Option<&TimeSlotId> {
        match self {
            Slot::Scheduled(id) => Some(id),
            Slot::Unscheduled => None,
        }
    }
}

impl From<Slot> for String {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Scheduled(id) => id.as_str().to_string(),
            Slot::Unscheduled => UNSCHEDULED_SENTINEL.to_string(),
        }
    }
}

impl TryFrom<String> for Slot {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let id = TimeSlotId::new(value);
        Ok(if is_unscheduled(&id) {
            Slot::Unscheduled
        } else {
            Slot::Scheduled(id)
        })
    }
}

impl Assignment {
    pub fn is_malformed(&self) -> bool {
        self.slot.is_unscheduled()
    }
}

/// Fraction of `entries` for which `Assignment::is_malformed` holds.
pub fn malformed_fraction(entries: &[Assignment]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let malformed = entries.iter().filter(|e| e.is_malformed()).count();
    malformed as f64 / entries.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_round_trips_through_string() {
        let slot = Slot::Unscheduled;
        let s: String = slot.clone().into();
        assert_eq!(s, UNSCHEDULED_SENTINEL);
        let back = Slot::try_from(s).unwrap();
        assert_eq!(back, Slot::Unscheduled);
    }

    #[test]
    fn scheduled_slot_round_trips() {
        let slot = Slot::Scheduled(TimeSlotId::new("17"));
        let s: String = slot.clone().into();
        assert_eq!(s, "17");
        assert_eq!(Slot::try_from(s).unwrap(), slot);
    }

    #[test]
    fn malformed_fraction_counts_unscheduled_only() {
        let make = |slot: Slot| Assignment {
            course_id: CourseId::new("c"),
            faculty_id: FacultyId::new("f"),
            room_id: RoomId::new("r"),
            slot,
            session_index: 0,
        };
        let entries = vec![
            make(Slot::Scheduled(TimeSlotId::new("1"))),
            make(Slot::Unscheduled),
            make(Slot::Scheduled(TimeSlotId::new("2"))),
            make(Slot::Unscheduled),
        ];
        assert_eq!(malformed_fraction(&entries), 0.5);
    }
}
