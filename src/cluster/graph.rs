use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use rayon::prelude::*;

use crate::domain::entities::Course;
use crate::domain::ids::CourseId;

/// Weighted course-affinity graph plus the id↔index lookup every consumer
/// needs (mirrors the teacher's `id_by_node`/`node_by_id` pair, adapted
/// from a directed `StableGraph` to an undirected similarity graph).
pub struct CourseGraph {
    pub graph: UnGraph<CourseId, f64>,
    pub node_of: HashMap<CourseId, NodeIndex>,
}

/// RAM-gated edge threshold (spec §4.2): denser graphs are pruned harder
/// when less memory is available for Louvain's working set.
pub fn edge_threshold(available_ram_gb: f64) -> f64 {
    if available_ram_gb >= 8.0 {
        0.1
    } else if available_ram_gb >= 5.0 {
        0.3
    } else if available_ram_gb >= 3.0 {
        0.5
    } else {
        1.0
    }
}

fn pair_weight(a: &Course, b: &Course) -> f64 {
    if a.faculty_id == b.faculty_id {
        return 10.0;
    }

    let mut weight = 0.0;

    let inter = a.student_ids.intersection(&b.student_ids).count();
    if inter > 0 {
        let denom = a.student_ids.len().max(b.student_ids.len()).max(1) as f64;
        weight += 10.0 * (inter as f64 / denom);
    }

    if a.department_id == b.department_id {
        weight += 5.0;
    }

    if a.required_features.iter().any(|f| b.required_features.contains(f)) {
        weight += 3.0;
    }

    weight
}

/// Builds the affinity graph. Edge weights for all unordered pairs are
/// computed in parallel chunks (spec §4.2: "edge construction is parallel
/// over chunks of courses"), then filtered against `threshold` before
/// insertion — pruning happens after scoring, not during, so the parallel
/// pass has no shared mutable state.
pub fn build_graph(courses: &[Course], threshold: f64) -> CourseGraph {
    let mut graph = UnGraph::new_undirected();
    let mut node_of = HashMap::with_capacity(courses.len());
    for c in courses {
        node_of.insert(c.id.clone(), graph.add_node(c.id.clone()));
    }

    let pairs: Vec<(usize, usize)> = (0..courses.len())
        .flat_map(|i| (i + 1..courses.len()).map(move |j| (i, j)))
        .collect();

    let edges: Vec<(usize, usize, f64)> = pairs
        .par_chunks(512.max(pairs.len() / rayon::current_num_threads().max(1)).max(1))
        .flat_map(|chunk| {
            chunk
                .iter()
                .filter_map(|&(i, j)| {
                    let w = pair_weight(&courses[i], &courses[j]);
                    (w > threshold).then_some((i, j, w))
                })
                .collect::<Vec<_>>()
        })
        .collect();

    for (i, j, w) in edges {
        graph.add_edge(node_of[&courses[i].id], node_of[&courses[j].id], w);
    }

    CourseGraph { graph, node_of }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{DepartmentId, FacultyId};
    use std::collections::HashSet;

    fn course(id: &str, faculty: &str, dept: &str) -> Course {
        Course {
            id: CourseId::new(id),
            code: id.to_string(),
            name: id.to_string(),
            department_id: DepartmentId::new(dept),
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
    fn same_faculty_pair_gets_edge_at_any_threshold() {
        let courses = vec![course("a", "f1", "d1"), course("b", "f1", "d2")];
        let g = build_graph(&courses, 9.99);
        assert_eq!(g.graph.edge_count(), 1);
    }

    #[test]
    fn unrelated_pair_is_pruned_above_threshold() {
        let courses = vec![course("a", "f1", "d1"), course("b", "f2", "d2")];
        let g = build_graph(&courses, 0.1);
        assert_eq!(g.graph.edge_count(), 0);
    }

    #[test]
    fn threshold_ladder_matches_spec() {
        assert_eq!(edge_threshold(10.0), 0.1);
        assert_eq!(edge_threshold(6.0), 0.3);
        assert_eq!(edge_threshold(4.0), 0.5);
        assert_eq!(edge_threshold(1.0), 1.0);
    }
}
