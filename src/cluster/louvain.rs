use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::graph::CourseGraph;

/// Fixed seed for reproducible community detection (spec §4.2).
pub const LOUVAIN_SEED: u64 = 42;

pub struct Communities {
    pub modularity: f64,
    /// community id -> member node indices.
    pub groups: Vec<Vec<NodeIndex>>,
}

/// Single-level greedy modularity optimization (the Louvain "local moving"
/// phase, run once rather than recursed over an aggregated graph — the
/// instance sizes in play here, clusters of 5-12 courses, converge in one
/// pass and a second aggregation level buys nothing).
///
/// Node visit order is shuffled with a seeded RNG so the greedy pass is
/// reproducible but not biased by petgraph's insertion order.
pub fn detect_communities(cg: &CourseGraph) -> Communities {
    let n = cg.graph.node_count();
    if n == 0 {
        return Communities {
            modularity: 0.0,
            groups: vec![],
        };
    }

    let mut rng = StdRng::seed_from_u64(LOUVAIN_SEED);
    let mut order: Vec<NodeIndex> = cg.graph.node_indices().collect();
    order.shuffle(&mut rng);

    let mut community_of: HashMap<NodeIndex, usize> =
        cg.graph.node_indices().enumerate().map(|(i, n)| (n, i)).collect();

    let total_weight: f64 = cg.graph.edge_references().map(|e| *e.weight()).sum();
    let two_m = (2.0 * total_weight).max(f64::EPSILON);

    let degree: HashMap<NodeIndex, f64> = cg
        .graph
        .node_indices()
        .map(|n| {
            let d: f64 = cg.graph.edges(n).map(|e| *e.weight()).sum();
            (n, d)
        })
        .collect();

    let mut improved = true;
    let mut passes = 0;
    while improved && passes < 20 {
        improved = false;
        passes += 1;
        for &node in &order {
            let current = community_of[&node];
            let mut neighbor_weight: HashMap<usize, f64> = HashMap::new();
            for edge in cg.graph.edges(node) {
                let other = if edge.source() == node { edge.target() } else { edge.source() };
                *neighbor_weight.entry(community_of[&other]).or_insert(0.0) += *edge.weight();
            }

            let mut best_comm = current;
            let mut best_gain = 0.0;
            for (&comm, &w_in) in &neighbor_weight {
                if comm == current {
                    continue;
                }
                let comm_degree: f64 = community_of
                    .iter()
                    .filter(|(_, &c)| c == comm)
                    .map(|(&nd, _)| degree[&nd])
                    .sum();
                let gain = w_in - (comm_degree * degree[&node]) / two_m;
                if gain > best_gain {
                    best_gain = gain;
                    best_comm = comm;
                }
            }

            if best_comm != current {
                community_of.insert(node, best_comm);
                improved = true;
            }
        }
    }

    let mut groups: HashMap<usize, Vec<NodeIndex>> = HashMap::new();
    for (&node, &comm) in &community_of {
        groups.entry(comm).or_default().push(node);
    }
    let mut groups: Vec<Vec<NodeIndex>> = groups.into_values().collect();
    groups.sort_by_key(|g| g.iter().map(|n| n.index()).min().unwrap_or(0));

    let modularity = compute_modularity(cg, &community_of, two_m);

    Communities { modularity, groups }
}

fn compute_modularity(cg: &CourseGraph, community_of: &HashMap<NodeIndex, usize>, two_m: f64) -> f64 {
    let degree: HashMap<NodeIndex, f64> = cg
        .graph
        .node_indices()
        .map(|n| (n, cg.graph.edges(n).map(|e| *e.weight()).sum()))
        .collect();

    let mut q = 0.0;
    for edge in cg.graph.edge_references() {
        if community_of[&edge.source()] == community_of[&edge.target()] {
            q += 2.0 * edge.weight();
        }
    }
    for node in cg.graph.node_indices() {
        q -= degree[&node] * degree[&node] / two_m;
    }
    q / two_m
}
