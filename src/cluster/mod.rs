mod graph;
mod louvain;
mod postprocess;

use crate::domain::entities::Course;
use crate::domain::ids::CourseId;

pub use graph::edge_threshold;
pub use postprocess::{MAX_SIZE, MIN_SIZE, TARGET_SIZE};

/// Stage 1 entry point (spec §4.2). Builds a weighted affinity graph,
/// partitions it with a seeded single-pass Louvain-style detector, and
/// post-processes the result into clusters sized `[MIN_SIZE, MAX_SIZE]`.
/// Falls back to deterministic chunking if the graph ends up empty of
/// edges (isolated-node Louvain output) or if `courses` is trivially
/// small.
pub fn cluster(courses: &[Course], available_ram_gb: f64) -> Vec<Vec<CourseId>> {
    if courses.is_empty() {
        return vec![];
    }
    if courses.len() <= MAX_SIZE {
        return vec![courses.iter().map(|c| c.id.clone()).collect()];
    }

    let threshold = edge_threshold(available_ram_gb);
    let cg = graph::build_graph(courses, threshold);

    if cg.graph.edge_count() == 0 {
        log::warn!("course affinity graph has no edges above threshold {threshold}; falling back to chunking");
        let ids: Vec<CourseId> = courses.iter().map(|c| c.id.clone()).collect();
        return postprocess::chunk_fallback(&ids, TARGET_SIZE);
    }

    let communities = louvain::detect_communities(&cg);
    log::info!(
        "Louvain clustering: {} communities, modularity={:.4}",
        communities.groups.len(),
        communities.modularity
    );

    let groups: Vec<Vec<CourseId>> = communities
        .groups
        .into_iter()
        .map(|nodes| nodes.into_iter().map(|n| cg.graph[n].clone()).collect())
        .collect();

    postprocess::postprocess(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{DepartmentId, FacultyId};
    use std::collections::HashSet;

    fn course(id: &str, faculty: &str) -> Course {
        Course {
            id: CourseId::new(id),
            code: id.to_string(),
            name: id.to_string(),
            department_id: DepartmentId::new("d1"),
            faculty_id: FacultyId::new(faculty),
            co_faculty_ids: vec![],
            credits: 3,
            duration: 2,
            room_type_required: "lecture".to_string(),
            required_features: vec![],
            student_ids: HashSet::new(),
            enrolled_count: 0,
        }
    }

    #[test]
    fn every_course_appears_in_exactly_one_cluster() {
        let courses: Vec<Course> = (0..40).map(|i| course(&format!("c{i}"), &format!("f{}", i % 6))).collect();
        let clusters = cluster(&courses, 10.0);
        let mut seen = HashSet::new();
        for cl in &clusters {
            for id in cl {
                assert!(seen.insert(id.clone()), "course {id} appeared in more than one cluster");
            }
        }
        assert_eq!(seen.len(), 40);
    }

    #[test]
    fn small_instance_is_a_single_cluster() {
        let courses: Vec<Course> = (0..3).map(|i| course(&format!("c{i}"), "f1")).collect();
        let clusters = cluster(&courses, 10.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn empty_courses_yields_no_clusters() {
        assert!(cluster(&[], 10.0).is_empty());
    }
}
