use std::str::FromStr;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::error::{Error, Result};

const MIN_CONNECTIONS: u32 = 2;
const MAX_CONNECTIONS: u32 = 10;
const STATEMENT_TIMEOUT_MS: &str = "30000";

/// Environment-sourced runtime configuration (spec §6).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    /// `PARALLEL_CLUSTERS` override, clamped to `2..=physical_cores` by the
    /// executor rather than here — config only parses what was set.
    pub parallel_clusters_override: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::DataLoad { org_id: String::new(), reason: "DATABASE_URL is not set".to_string() })?;
        let redis_url = std::env::var("REDIS_URL")
            .map_err(|_| Error::DataLoad { org_id: String::new(), reason: "REDIS_URL is not set".to_string() })?;
        let parallel_clusters_override = std::env::var("PARALLEL_CLUSTERS").ok().and_then(|v| v.parse().ok());

        Ok(Config { database_url, redis_url, parallel_clusters_override })
    }

    /// Builds the process-lifetime Postgres pool (spec §5: min 2 / max 10
    /// connections, 30s statement timeout, survives across jobs).
    pub async fn build_pool(&self) -> Result<PgPool> {
        let connect_options = PgConnectOptions::from_str(&self.database_url)
            .map_err(Error::Database)?
            .options([("statement_timeout", STATEMENT_TIMEOUT_MS)]);

        PgPoolOptions::new()
            .min_connections(MIN_CONNECTIONS)
            .max_connections(MAX_CONNECTIONS)
            .connect_with(connect_options)
            .await
            .map_err(Error::Database)
    }
}
