use thiserror::Error;

/// Error taxonomy for the timetable generation engine (see spec §7).
///
/// Stage-local recoverable errors (`Clustering`, `ClusterInfeasible`, `Ga`,
/// `Refiner`) are caught by their owning stage and downgraded to a log line
/// plus a fallback behavior; they only escape a stage when a test wants to
/// assert on them directly.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to (de)serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("data load failed for org {org_id}: {reason}")]
    DataLoad { org_id: String, reason: String },

    #[error("clustering failed: {0}")]
    Clustering(String),

    #[error("cluster {cluster_id} infeasible: all strategies exhausted")]
    ClusterInfeasible { cluster_id: usize },

    #[error("GA variant '{label}' failed: {reason}")]
    Ga { label: String, reason: String },

    #[error("refiner failed: {0}")]
    Refiner(String),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error(
        "malformed solution: {malformed} of {total} entries are malformed ({pct:.1}% > 5% threshold)"
    )]
    MalformedSolution {
        malformed: usize,
        total: usize,
        pct: f64,
    },

    #[error("generation cancelled at safe point '{label}'")]
    Cancellation { label: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),
}

pub type Result<T> = std::result::Result<T, Error>;
