use std::sync::Arc;

use actix::prelude::*;

use crate::cpsat::{sentinel_fill, solve_cluster, workers_per_cluster};
use crate::domain::assignment::Assignment;
use crate::domain::entities::Course;
use crate::domain::ids::CourseId;
use crate::domain::problem_instance::ProblemInstance;

/// Parallelism budget (spec §4.4): `parallel_clusters x workers_per_cluster
/// <= physical_cores`. `PARALLEL_CLUSTERS` may override the computed value
/// (spec §6 env vars), but is still clamped to this budget.
pub struct Budget {
    pub parallel_clusters: usize,
    pub workers_per_cluster: usize,
}

pub fn compute_budget(physical_cores: usize, override_parallel_clusters: Option<usize>) -> Budget {
    let p = override_parallel_clusters
        .unwrap_or_else(|| physical_cores.min(6))
        .clamp(1, physical_cores.max(1));
    let workers = workers_per_cluster(physical_cores, p);
    Budget {
        parallel_clusters: p,
        workers_per_cluster: workers,
    }
}

/// One cluster-solve job, isolated from the others the way a separate OS
/// process would be isolated (spec §9: "process-level parallelism for
/// cluster solving... the ProblemInstance-subset for each cluster is
/// serialized and sent"). Here the boundary is a `SyncArbiter` worker
/// thread rather than a real process, but the message carries an owned
/// copy of everything the solve needs, matching the serialize-and-send
/// shape rather than sharing mutable state across threads.
struct SolveClusterMsg {
    cluster_id: usize,
    courses: Vec<Course>,
    instance: Arc<ProblemInstance>,
    workers: usize,
}

impl Message for SolveClusterMsg {
    type Result = ClusterOutcome;
}

pub struct ClusterOutcome {
    pub cluster_id: usize,
    pub entries: Vec<Assignment>,
    pub feasible: bool,
}

struct ClusterSolverActor;

impl Actor for ClusterSolverActor {
    type Context = SyncContext<Self>;
}

impl Handler<SolveClusterMsg> for ClusterSolverActor {
    type Result = ClusterOutcome;

    fn handle(&mut self, msg: SolveClusterMsg, _ctx: &mut Self::Context) -> Self::Result {
        let refs: Vec<&Course> = msg.courses.iter().collect();
        match solve_cluster(&refs, &msg.instance, msg.workers) {
            Some(entries) => ClusterOutcome {
                cluster_id: msg.cluster_id,
                entries,
                feasible: true,
            },
            None => {
                log::warn!("cluster {} infeasible under every strategy; sentinel-filling", msg.cluster_id);
                ClusterOutcome {
                    cluster_id: msg.cluster_id,
                    entries: sentinel_fill(&refs),
                    feasible: false,
                }
            }
        }
    }
}

/// Stage 2 fan-out (spec §4.4). `cancel_check` is polled at each cluster
/// boundary — the executor's SafePoint — and, if it returns `true`, solving
/// stops and sentinels are emitted for every remaining cluster's courses so
/// the run still has a complete (if degraded) assignment to fall back to.
pub async fn run_stage2(
    clusters: Vec<Vec<CourseId>>,
    instance: Arc<ProblemInstance>,
    budget: &Budget,
    available_ram_gb: f64,
    mut on_cluster_done: impl FnMut(usize, usize),
    mut cancel_check: impl FnMut() -> bool,
) -> (Vec<Assignment>, Vec<usize>) {
    let cluster_courses: Vec<Vec<Course>> = clusters
        .iter()
        .map(|ids| {
            ids.iter()
                .filter_map(|id| instance.course(id).cloned())
                .collect()
        })
        .collect();

    if available_ram_gb < 2.0 {
        log::warn!("available RAM below 2 GB; falling back to sequential cluster solving");
        return run_sequential(cluster_courses, &instance, budget, on_cluster_done, cancel_check);
    }

    let addr = SyncArbiter::start(budget.parallel_clusters, || ClusterSolverActor);

    let mut entries = Vec::new();
    let mut failed_clusters = Vec::new();
    let total = cluster_courses.len();

    for (cluster_id, courses) in cluster_courses.into_iter().enumerate() {
        if cancel_check() {
            log::info!("cancellation observed before cluster {cluster_id}; sentinel-filling remainder");
            let refs: Vec<&Course> = courses.iter().collect();
            entries.extend(sentinel_fill(&refs));
            failed_clusters.push(cluster_id);
            continue;
        }

        let msg = SolveClusterMsg {
            cluster_id,
            courses,
            instance: instance.clone(),
            workers: budget.workers_per_cluster,
        };

        match addr.send(msg).await {
            Ok(outcome) => {
                if !outcome.feasible {
                    failed_clusters.push(outcome.cluster_id);
                }
                entries.extend(outcome.entries);
            }
            Err(mailbox_err) => {
                log::error!("cluster {cluster_id} worker mailbox error: {mailbox_err}");
                failed_clusters.push(cluster_id);
            }
        }
        on_cluster_done(cluster_id + 1, total);
    }

    (entries, failed_clusters)
}

fn run_sequential(
    cluster_courses: Vec<Vec<Course>>,
    instance: &ProblemInstance,
    budget: &Budget,
    mut on_cluster_done: impl FnMut(usize, usize),
    mut cancel_check: impl FnMut() -> bool,
) -> (Vec<Assignment>, Vec<usize>) {
    let mut entries = Vec::new();
    let mut failed_clusters = Vec::new();
    let total = cluster_courses.len();

    for (cluster_id, courses) in cluster_courses.into_iter().enumerate() {
        let refs: Vec<&Course> = courses.iter().collect();
        if cancel_check() {
            entries.extend(sentinel_fill(&refs));
            failed_clusters.push(cluster_id);
            continue;
        }
        match solve_cluster(&refs, instance, budget.workers_per_cluster) {
            Some(result) => entries.extend(result),
            None => {
                entries.extend(sentinel_fill(&refs));
                failed_clusters.push(cluster_id);
            }
        }
        on_cluster_done(cluster_id + 1, total);
    }

    (entries, failed_clusters)
}
