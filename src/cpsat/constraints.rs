use std::collections::{HashMap, HashSet};

use cp_sat::builder::{BoolVar, CpModelBuilder, LinearExpr};

use super::domains::CandidateDomains;
use super::strategy::{CRITICAL_ENROLLMENT_THRESHOLD, Strategy, StudentConflictMode};
use crate::domain::entities::Course;
use crate::domain::ids::{CourseId, FacultyId, RoomId, StudentId, TimeSlotId};
use crate::domain::problem_instance::ProblemInstance;

pub type VarKey = (CourseId, u32, TimeSlotId, RoomId);
pub type Vars = HashMap<VarKey, BoolVar>;

/// Creates one boolean decision variable per `(course, session, slot,
/// room)` candidate tuple (spec §4.3 Variables).
pub fn create_vars(model: &mut CpModelBuilder, domains: &CandidateDomains) -> Vars {
    let mut vars = Vars::new();
    for ((course_id, session), candidates) in domains {
        for (slot, room) in candidates {
            vars.insert(
                (course_id.clone(), *session, slot.clone(), room.clone()),
                model.new_bool_var(),
            );
        }
    }
    vars
}

fn sum(vars: impl Iterator<Item = BoolVar>) -> LinearExpr {
    vars.fold(LinearExpr::from(0), |acc, v| acc + LinearExpr::from(v))
}

/// Applies the assignment constraint (every `(course, session)` sums to
/// exactly 1) plus whichever hard constraints `strategy` enables.
pub fn apply_constraints(
    model: &mut CpModelBuilder,
    vars: &Vars,
    domains: &CandidateDomains,
    courses: &[&Course],
    instance: &ProblemInstance,
    strategy: &Strategy,
) {
    apply_assignment_constraint(model, vars, domains);

    if strategy.hc1_faculty_conflict {
        apply_faculty_conflict(model, vars, courses);
    }
    if strategy.hc2_room_conflict {
        apply_room_conflict(model, vars);
    }
    if strategy.hc3_faculty_workload {
        apply_faculty_workload(model, vars, courses, instance);
    }
    if strategy.hc4_mode != StudentConflictMode::None {
        apply_student_conflict(model, vars, courses, instance, strategy.hc4_mode);
    }
    if strategy.hc5_per_day_cap {
        apply_per_day_cap(model, vars, courses, instance);
    }
    if strategy.hc6_fixed_slot {
        apply_fixed_slot_pinning(model, vars, domains, courses);
    }
}

fn apply_assignment_constraint(model: &mut CpModelBuilder, vars: &Vars, domains: &CandidateDomains) {
    for (course_id, session) in domains.keys() {
        let group = vars
            .iter()
            .filter(|((c, s, _, _), _)| c == course_id && s == session)
            .map(|(_, v)| v.clone());
        model.add_eq(sum(group), LinearExpr::from(1));
    }
}

/// HC1: for every `(faculty_id, time_slot)`, at most one session.
fn apply_faculty_conflict(model: &mut CpModelBuilder, vars: &Vars, courses: &[&Course]) {
    let faculty_of: HashMap<&CourseId, &FacultyId> = courses.iter().map(|c| (&c.id, &c.faculty_id)).collect();
    let mut groups: HashMap<(FacultyId, TimeSlotId), Vec<BoolVar>> = HashMap::new();
    for ((course_id, _, slot, _), var) in vars {
        if let Some(&faculty_id) = faculty_of.get(course_id) {
            groups
                .entry((faculty_id.clone(), slot.clone()))
                .or_default()
                .push(var.clone());
        }
    }
    for group in groups.into_values() {
        model.add_le(sum(group.into_iter()), LinearExpr::from(1));
    }
}

/// HC2: for every `(time_slot, room)`, at most one session.
fn apply_room_conflict(model: &mut CpModelBuilder, vars: &Vars) {
    let mut groups: HashMap<(TimeSlotId, RoomId), Vec<BoolVar>> = HashMap::new();
    for ((_, _, slot, room), var) in vars {
        groups.entry((slot.clone(), room.clone())).or_default().push(var.clone());
    }
    for group in groups.into_values() {
        model.add_le(sum(group.into_iter()), LinearExpr::from(1));
    }
}

/// HC3: for every faculty, total assigned sessions stay within their
/// weekly hour cap.
fn apply_faculty_workload(model: &mut CpModelBuilder, vars: &Vars, courses: &[&Course], instance: &ProblemInstance) {
    let faculty_of: HashMap<&CourseId, &FacultyId> = courses.iter().map(|c| (&c.id, &c.faculty_id)).collect();
    let mut groups: HashMap<FacultyId, Vec<BoolVar>> = HashMap::new();
    for ((course_id, _, _, _), var) in vars {
        if let Some(&faculty_id) = faculty_of.get(course_id) {
            groups.entry(faculty_id.clone()).or_default().push(var.clone());
        }
    }
    for (faculty_id, group) in groups {
        let cap = instance
            .faculty(&faculty_id)
            .map(|f| f.max_hours_per_week)
            .unwrap_or(crate::domain::entities::Faculty::DEFAULT_MAX_HOURS_PER_WEEK);
        model.add_le(sum(group.into_iter()), LinearExpr::from(cap as i64));
    }
}

fn critical_students(courses: &[&Course], instance: &ProblemInstance) -> HashSet<StudentId> {
    let mut counts: HashMap<StudentId, usize> = HashMap::new();
    for course in courses {
        if let Some(students) = instance.student_course_index.get(&course.id) {
            for sid in students {
                *counts.entry(sid.clone()).or_insert(0) += 1;
            }
        }
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n >= CRITICAL_ENROLLMENT_THRESHOLD)
        .map(|(id, _)| id)
        .collect()
}

/// HC4: for every `(student, time_slot)`, at most one session — scoped by
/// `mode` to either all students or only students enrolled in >=5 courses
/// of the cluster.
fn apply_student_conflict(
    model: &mut CpModelBuilder,
    vars: &Vars,
    courses: &[&Course],
    instance: &ProblemInstance,
    mode: StudentConflictMode,
) {
    let scope: Option<HashSet<StudentId>> = match mode {
        StudentConflictMode::All => None,
        StudentConflictMode::Critical => Some(critical_students(courses, instance)),
        StudentConflictMode::None => return,
    };

    let mut groups: HashMap<(StudentId, TimeSlotId), Vec<BoolVar>> = HashMap::new();
    for course in courses {
        let Some(students) = instance.student_course_index.get(&course.id) else {
            continue;
        };
        for student_id in students {
            if let Some(scope) = &scope {
                if !scope.contains(student_id) {
                    continue;
                }
            }
            for ((course_id, _, slot, _), var) in vars {
                if course_id == &course.id {
                    groups
                        .entry((student_id.clone(), slot.clone()))
                        .or_default()
                        .push(var.clone());
                }
            }
        }
    }
    for group in groups.into_values() {
        model.add_le(sum(group.into_iter()), LinearExpr::from(1));
    }
}

/// HC5: for every `(course, day_of_week)`, at most 2 sessions.
fn apply_per_day_cap(model: &mut CpModelBuilder, vars: &Vars, courses: &[&Course], instance: &ProblemInstance) {
    let course_ids: HashSet<&CourseId> = courses.iter().map(|c| &c.id).collect();
    let mut groups: HashMap<(CourseId, u32), Vec<BoolVar>> = HashMap::new();
    for ((course_id, _, slot, _), var) in vars {
        if !course_ids.contains(course_id) {
            continue;
        }
        if let Some((day, _)) = instance.slot_coords(slot) {
            groups.entry((course_id.clone(), day)).or_default().push(var.clone());
        }
    }
    for group in groups.into_values() {
        model.add_le(sum(group.into_iter()), LinearExpr::from(2));
    }
}

/// HC6: for courses with a `fixed_slot:<id>` marker, force every session
/// onto that slot. The candidate domain already excludes other slots for
/// these courses (see `domains::build_candidate_domains`), so this
/// constraint is a safety net that pins `sum(candidates at fixed slot) ==
/// 1` per session — a no-op once the domain restriction holds, but keeps
/// the invariant explicit at the model level per strategy toggling.
fn apply_fixed_slot_pinning(model: &mut CpModelBuilder, vars: &Vars, domains: &CandidateDomains, courses: &[&Course]) {
    for course in courses {
        let Some(fixed) = course.fixed_slot() else { continue };
        for session in 0..course.duration {
            let Some(candidates) = domains.get(&(course.id.clone(), session)) else {
                continue;
            };
            let at_fixed: Vec<BoolVar> = candidates
                .iter()
                .filter(|(slot, _)| slot == &fixed)
                .filter_map(|(slot, room)| vars.get(&(course.id.clone(), session, slot.clone(), room.clone())).cloned())
                .collect();
            if !at_fixed.is_empty() {
                model.add_eq(sum(at_fixed.into_iter()), LinearExpr::from(1));
            }
        }
    }
}
