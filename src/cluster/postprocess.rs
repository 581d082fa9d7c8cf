use union_find::{QuickUnionUf, UnionBySize, UnionFind};

use crate::domain::ids::CourseId;

pub const TARGET_SIZE: usize = 10;
pub const MIN_SIZE: usize = 5;
pub const MAX_SIZE: usize = 12;
pub const MERGE_MAX_SIZE: usize = 8;

/// Splits clusters over `MAX_SIZE` into contiguous sub-chunks of
/// `TARGET_SIZE`, then merges clusters under `MIN_SIZE` with their
/// neighbors via a disjoint-set union (spec §4.2 post-processing), until
/// every merged group lands in `[MIN_SIZE, MERGE_MAX_SIZE]` or only one
/// undersized group remains.
pub fn postprocess(groups: Vec<Vec<CourseId>>) -> Vec<Vec<CourseId>> {
    let split: Vec<Vec<CourseId>> = groups.into_iter().flat_map(split_oversized).collect();
    merge_undersized(split)
}

fn split_oversized(group: Vec<CourseId>) -> Vec<Vec<CourseId>> {
    if group.len() <= MAX_SIZE {
        return vec![group];
    }
    group
        .chunks(TARGET_SIZE)
        .map(|c| c.to_vec())
        .collect()
}

fn merge_undersized(groups: Vec<Vec<CourseId>>) -> Vec<Vec<CourseId>> {
    if groups.len() <= 1 {
        return groups;
    }

    let mut dsu = QuickUnionUf::<UnionBySize>::new(groups.len());
    let mut sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();

    for i in 0..groups.len() {
        loop {
            let root = dsu.find(i);
            if sizes[root] >= MIN_SIZE {
                break;
            }
            let merge_target = (0..groups.len())
                .filter(|&j| dsu.find(j) != root)
                .min_by_key(|&j| sizes[dsu.find(j)]);
            match merge_target {
                Some(j) => {
                    let a = dsu.find(i);
                    let b_size = sizes[dsu.find(j)];
                    dsu.union(i, j);
                    let new_root = dsu.find(i);
                    let combined = sizes[a] + b_size;
                    sizes[new_root] = combined;
                    if combined > MERGE_MAX_SIZE && combined <= MAX_SIZE {
                        break;
                    }
                }
                None => break,
            }
        }
    }

    let mut merged: std::collections::HashMap<usize, Vec<CourseId>> = std::collections::HashMap::new();
    for (i, group) in groups.into_iter().enumerate() {
        merged.entry(dsu.find(i)).or_default().extend(group);
    }
    merged.into_values().collect()
}

/// Deterministic fallback when graph construction or Louvain fails (spec
/// §4.2 Failure mode): chunk courses into fixed-size groups in input order.
pub fn chunk_fallback(courses: &[CourseId], chunk_size: usize) -> Vec<Vec<CourseId>> {
    courses.chunks(chunk_size.max(1)).map(|c| c.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize, prefix: &str) -> Vec<CourseId> {
        (0..n).map(|i| CourseId::new(format!("{prefix}{i}"))).collect()
    }

    #[test]
    fn splits_oversized_cluster_into_target_chunks() {
        let group = ids(25, "c");
        let result = postprocess(vec![group]);
        assert!(result.iter().all(|g| g.len() <= MAX_SIZE));
        assert_eq!(result.iter().map(|g| g.len()).sum::<usize>(), 25);
    }

    #[test]
    fn merges_undersized_clusters_up_to_min() {
        let groups = vec![ids(2, "a"), ids(2, "b"), ids(2, "c")];
        let result = postprocess(groups);
        for g in &result {
            assert!(g.len() >= MIN_SIZE || result.len() == 1);
        }
        assert_eq!(result.iter().map(|g| g.len()).sum::<usize>(), 6);
    }

    #[test]
    fn chunk_fallback_preserves_all_courses() {
        let courses = ids(23, "c");
        let chunks = chunk_fallback(&courses, TARGET_SIZE);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 23);
    }
}
