use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};

use crate::domain::assignment::Assignment;
use crate::domain::ids::JobId;
use crate::domain::problem_instance::ProblemInstance;
use crate::domain::variant::Variant;
use crate::error::{Error, Result};
use crate::store::{CacheStore, PrimaryStore};

const MALFORMED_ABORT_THRESHOLD: f64 = 0.05;
const RESULT_TTL_SECONDS: u64 = 86_400;

/// One row of the persisted timetable (spec §6 `timetable_data.timetable_entries`).
#[derive(Debug, Clone, Serialize)]
pub struct TimetableEntry {
    pub course_id: String,
    pub course_code: String,
    pub course_name: String,
    pub faculty_id: String,
    pub room_id: String,
    pub room_code: String,
    pub time_slot_id: String,
    pub day: String,
    pub day_of_week: u32,
    pub start_time: String,
    pub end_time: String,
    pub session_number: u32,
    pub student_ids: Vec<String>,
    pub batch_ids: Vec<String>,
}

const DAY_NAMES: [&str; 7] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

/// Builds the persisted row list from an assignment, skipping sentinel and
/// malformed entries (spec §4.7 guards). An entry is malformed here when
/// its course, faculty, or room id no longer resolves against `instance` —
/// the typed `Slot` encoding already rules out the "wrong tuple shape"
/// failure mode the spec's dynamic-dict guard exists for.
fn build_entries(entries: &[Assignment], instance: &ProblemInstance) -> Vec<TimetableEntry> {
    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.is_malformed() {
            log::debug!("skipping unscheduled entry for course {}", entry.course_id);
            continue;
        }

        let slot_id = entry.slot.time_slot_id().expect("is_malformed already filtered Unscheduled");
        let Some((course, room, (day_of_week, _period))) = instance
            .course(&entry.course_id)
            .zip(instance.room(&entry.room_id))
            .zip(instance.slot_coords(slot_id))
            .map(|((c, r), coords)| (c, r, coords))
        else {
            log::warn!(
                "skipping malformed entry for course {} (unresolvable course/room/slot)",
                entry.course_id
            );
            continue;
        };

        let time_slot = instance.time_slots.iter().find(|s| &s.id == slot_id);
        let student_ids = instance
            .student_course_index
            .get(&entry.course_id)
            .map(|ids| ids.iter().map(|id| id.as_str().to_string()).collect())
            .unwrap_or_default();

        rows.push(TimetableEntry {
            course_id: course.id.as_str().to_string(),
            course_code: course.code.clone(),
            course_name: course.name.clone(),
            faculty_id: entry.faculty_id.as_str().to_string(),
            room_id: room.id.as_str().to_string(),
            room_code: room.code.clone(),
            time_slot_id: slot_id.as_str().to_string(),
            day: DAY_NAMES.get(day_of_week as usize).copied().unwrap_or("Unknown").to_string(),
            day_of_week,
            start_time: time_slot.map(|s| s.start_time.clone()).unwrap_or_default(),
            end_time: time_slot.map(|s| s.end_time.clone()).unwrap_or_default(),
            session_number: entry.session_index + 1,
            student_ids,
            batch_ids: vec![],
        });
    }
    rows
}

/// Faculty double-bookings + room double-bookings in `entries` (spec §4.7).
fn conflicts_count(entries: &[Assignment]) -> u32 {
    use std::collections::HashMap;
    let mut faculty_slots: HashMap<(&str, &str), u32> = HashMap::new();
    let mut room_slots: HashMap<(&str, &str), u32> = HashMap::new();

    for entry in entries {
        let Some(slot_id) = entry.slot.time_slot_id() else { continue };
        *faculty_slots.entry((entry.faculty_id.as_str(), slot_id.as_str())).or_insert(0) += 1;
        *room_slots.entry((entry.room_id.as_str(), slot_id.as_str())).or_insert(0) += 1;
    }

    let extra = |counts: &HashMap<(&str, &str), u32>| counts.values().filter(|&&c| c > 1).map(|&c| c - 1).sum::<u32>();
    extra(&faculty_slots) + extra(&room_slots)
}

fn room_utilization_pct(entries: &[Assignment], total_rooms: usize) -> f64 {
    if total_rooms == 0 {
        return 0.0;
    }
    use std::collections::HashSet;
    let used: HashSet<&str> = entries
        .iter()
        .filter(|e| !e.is_malformed())
        .map(|e| e.room_id.as_str())
        .collect();
    100.0 * used.len() as f64 / total_rooms as f64
}

fn variant_payload(variant: &Variant, instance: &ProblemInstance) -> Value {
    let rows = build_entries(&variant.entries, instance);
    let total_conflicts = conflicts_count(&variant.entries);
    json!({
        "variant_id": variant.variant_id,
        "label": variant.label,
        "score": variant.normalized_score,
        "fitness": variant.fitness,
        "conflicts": total_conflicts,
        "timetable_entries": rows,
        "room_utilization": variant.room_utilization_pct,
        "quality_metrics": {
            "overall_score": variant.normalized_score,
            "total_conflicts": total_conflicts,
            "room_utilization_score": variant.room_utilization_pct,
        },
        "statistics": {
            "total_classes": rows.len(),
            "total_conflicts": total_conflicts,
        },
    })
}

/// Summary written to the cache store (spec §4.7): scores and metrics only,
/// no entry rows — the full detail lives in the primary store.
fn cache_summary(variants: &[Variant]) -> Value {
    let variant_summaries: Vec<Value> = variants
        .iter()
        .map(|v| {
            json!({
                "id": v.variant_id,
                "label": v.label,
                "normalized_score": v.normalized_score,
                "conflicts_count": v.conflicts_count,
                "room_utilization_pct": v.room_utilization_pct,
                "quality_metrics": {
                    "overall_score": v.normalized_score,
                    "total_conflicts": v.conflicts_count,
                    "room_utilization_score": v.room_utilization_pct,
                },
                "statistics": {
                    "total_classes": v.entries.iter().filter(|e| !e.is_malformed()).count(),
                    "total_conflicts": v.conflicts_count,
                },
            })
        })
        .collect();
    json!({ "variants": variant_summaries })
}

/// Stage 7 entry point (spec §4.7). Runs as the saga's `AtomicSection`: the
/// caller is responsible for deferring cancellation around this call
/// (see `saga::cancellation::AtomicSection`) — `persist` itself does not
/// poll the cancellation token.
///
/// `status`/`progress` are the caller's terminal state for the job row —
/// the full happy path passes `("completed", 100)`; the saga's
/// partial-success path (cancellation observed at or after Stage 2 CP-SAT)
/// passes `("partial_success", 60)`, the cpsat stage's end-of-stage
/// percentage (spec §4.9), since invariant 5 requires `progress == 100 iff
/// status == completed`.
pub async fn persist(
    job_id: &JobId,
    final_assignment: &[Assignment],
    mut variants: Vec<Variant>,
    instance: &ProblemInstance,
    status: &str,
    progress: u8,
    primary: &dyn PrimaryStore,
    cache: &dyn CacheStore,
) -> Result<Vec<Variant>> {
    let malformed = final_assignment.iter().filter(|e| e.is_malformed()).count();
    let total = final_assignment.len();
    if total > 0 {
        let pct = malformed as f64 / total as f64;
        if pct > MALFORMED_ABORT_THRESHOLD {
            return Err(Error::MalformedSolution {
                malformed,
                total,
                pct: pct * 100.0,
            });
        }
    }

    for variant in variants.iter_mut() {
        variant.conflicts_count = conflicts_count(&variant.entries);
        variant.room_utilization_pct = room_utilization_pct(&variant.entries, instance.rooms.len());
    }

    let rows = build_entries(final_assignment, instance);
    let total_sessions_scheduled = rows.len();
    let variant_payloads: Vec<Value> = variants.iter().map(|v| variant_payload(v, instance)).collect();

    let timetable_data = json!({
        "timetable_entries": rows,
        "total_sessions_scheduled": total_sessions_scheduled,
        "total_courses": instance.course_count(),
        "variants_count": variants.len(),
        "variants": variant_payloads,
        "generated_at": Utc::now().to_rfc3339(),
    });

    let primary_result = primary.update_job(job_id, status, progress, Some(timetable_data), None).await;

    let summary = serde_json::to_string(&cache_summary(&variants))?;
    let cache_key = format!("result:job:{job_id}");
    if let Err(e) = cache.setex(&cache_key, RESULT_TTL_SECONDS, summary).await {
        log::warn!("cache summary write failed for job {job_id}: {e}");
    }

    primary_result.map_err(|e| {
        log::error!("primary store write failed for job {job_id}: {e}");
        Error::Persistence(e.to_string())
    })?;

    Ok(variants)
}
