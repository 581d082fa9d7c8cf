use std::path::PathBuf;

use clap::Parser;
use timetable_gen_engine::config::Config;
use timetable_gen_engine::domain::ids::{JobId, OrgId};
use timetable_gen_engine::domain::job::JobStatus;
use timetable_gen_engine::domain::time_config::TimeConfig;
use timetable_gen_engine::hardware;
use timetable_gen_engine::logger;
use timetable_gen_engine::saga::{self, GenerationRequest, SagaDeps};
use timetable_gen_engine::store::cache_redis::RedisCacheStore;
use timetable_gen_engine::store::primary_sqlx::SqlxPrimaryStore;

/// Runs one timetable generation job end to end against the configured
/// Postgres and Redis backends (spec §6).
#[derive(Parser, Debug)]
#[command(name = "timetable-gen-engine", version)]
struct Cli {
    #[arg(long)]
    job_id: String,
    #[arg(long)]
    organization_id: String,
    #[arg(long)]
    semester: u8,
    #[arg(long)]
    academic_year: String,

    #[arg(long, default_value_t = 5)]
    working_days: u32,
    #[arg(long, default_value_t = 8)]
    slots_per_day: u32,
    #[arg(long, default_value = "09:00")]
    start_time: String,
    #[arg(long, default_value = "17:00")]
    end_time: String,
    #[arg(long, default_value_t = 60)]
    slot_duration_minutes: u32,
    #[arg(long, default_value_t = true)]
    lunch_break_enabled: bool,
    #[arg(long, default_value = "13:00")]
    lunch_break_start: String,
    #[arg(long, default_value = "14:00")]
    lunch_break_end: String,

    #[arg(long, default_value = "policies")]
    policy_dir: PathBuf,
    #[arg(long, default_value = "logs/audit")]
    audit_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = config.build_pool().await?;
    let cache = RedisCacheStore::connect(&config.redis_url).await?;
    let primary = SqlxPrimaryStore::new(pool);

    std::fs::create_dir_all(&cli.audit_dir)?;

    let deps = SagaDeps {
        primary: &primary,
        cache: &cache,
        policy_dir: cli.policy_dir,
        audit_dir: cli.audit_dir,
        physical_cores: hardware::physical_cores(),
        available_ram_gb: hardware::available_ram_gb(),
        parallel_clusters_override: config.parallel_clusters_override,
    };

    let request = GenerationRequest {
        job_id: JobId::new(cli.job_id),
        organization_id: OrgId::new(cli.organization_id),
        semester: cli.semester,
        academic_year: cli.academic_year,
        time_config: TimeConfig {
            working_days: cli.working_days,
            slots_per_day: cli.slots_per_day,
            start_time: cli.start_time,
            end_time: cli.end_time,
            slot_duration_minutes: cli.slot_duration_minutes,
            lunch_break_enabled: cli.lunch_break_enabled,
            lunch_break_start: cli.lunch_break_start,
            lunch_break_end: cli.lunch_break_end,
        },
    };

    let job = saga::run(request, &deps).await;
    log::info!("job {} finished with status {:?}", job.id, job.status);

    if matches!(job.status, JobStatus::Failed { .. }) {
        std::process::exit(1);
    }
    Ok(())
}
