use serde::{Deserialize, Serialize};

use super::entities::TimeSlot;
use super::ids::TimeSlotId;

/// Per-tenant grid configuration (spec §6). The loader generates the
/// `TimeSlot` set procedurally from this so all tenants share a uniform
/// slot grid, identifiers `"0"..N-1` ordered day-major, period-minor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    pub working_days: u32,
    pub slots_per_day: u32,
    pub start_time: String,
    pub end_time: String,
    pub slot_duration_minutes: u32,
    pub lunch_break_enabled: bool,
    pub lunch_break_start: String,
    pub lunch_break_end: String,
}

impl TimeConfig {
    pub fn total_slots(&self) -> u32 {
        self.working_days * self.slots_per_day
    }

    /// Generates the uniform slot grid. Slot `k` is day `k / slots_per_day`,
    /// period `k % slots_per_day`; the lunch window is marked by period
    /// index rather than wall-clock overlap, matching the procedural
    /// generation in the original Python loader (each day gets one lunch
    /// period at the midpoint of the day).
    pub fn generate_slots(&self) -> Vec<TimeSlot> {
        let lunch_period = self.slots_per_day / 2;
        let mut slots = Vec::with_capacity(self.total_slots() as usize);
        let mut id = 0u32;
        for day in 0..self.working_days {
            for period in 0..self.slots_per_day {
                let is_lunch = self.lunch_break_enabled && period == lunch_period;
                let (start_time, end_time) = self.period_bounds(period);
                slots.push(TimeSlot {
                    id: TimeSlotId::new(id.to_string()),
                    day_of_week: day,
                    period,
                    start_time,
                    end_time,
                    is_lunch,
                });
                id += 1;
            }
        }
        slots
    }

    fn period_bounds(&self, period: u32) -> (String, String) {
        let start_minutes = parse_hhmm(&self.start_time) + period * self.slot_duration_minutes;
        let end_minutes = start_minutes + self.slot_duration_minutes;
        (format_hhmm(start_minutes), format_hhmm(end_minutes))
    }
}

fn parse_hhmm(s: &str) -> u32 {
    let mut parts = s.splitn(2, ':');
    let h: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let m: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    h * 60 + m
}

fn format_hhmm(total_minutes: u32) -> String {
    format!("{:02}:{:02}", (total_minutes / 60) % 24, total_minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TimeConfig {
        TimeConfig {
            working_days: 5,
            slots_per_day: 8,
            start_time: "09:00".to_string(),
            end_time: "17:00".to_string(),
            slot_duration_minutes: 60,
            lunch_break_enabled: true,
            lunch_break_start: "13:00".to_string(),
            lunch_break_end: "14:00".to_string(),
        }
    }

    #[test]
    fn generates_day_major_period_minor_grid() {
        let slots = config().generate_slots();
        assert_eq!(slots.len(), 40);
        assert_eq!(slots[0].id.as_str(), "0");
        assert_eq!(slots[0].day_of_week, 0);
        assert_eq!(slots[8].day_of_week, 1);
        assert_eq!(slots[8].period, 0);
    }

    #[test]
    fn marks_one_lunch_period_per_day() {
        let slots = config().generate_slots();
        for day in 0..5u32 {
            let lunches = slots
                .iter()
                .filter(|s| s.day_of_week == day && s.is_lunch)
                .count();
            assert_eq!(lunches, 1);
        }
    }

    #[test]
    fn ids_are_unique_and_ordered() {
        let slots = config().generate_slots();
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.id.as_str(), i.to_string());
        }
    }
}
