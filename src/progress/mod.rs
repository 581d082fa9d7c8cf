use std::time::{Duration, Instant};

use serde::Serialize;

use crate::domain::ids::JobId;
use crate::error::Result;
use crate::store::CacheStore;

const PROGRESS_TTL_SECONDS: u64 = 3600;
const CATCH_UP_CAP_PCT_PER_TICK: f64 = 0.3;
const IDLE_MIN_PCT_PER_TICK: f64 = 0.03;
const TICK: Duration = Duration::from_millis(500);
const PRE_COMPLETE_CAP_PCT: f64 = 98.0;
const ETA_TOLERANCE_SECONDS: f64 = 5.0;

/// Cumulative `[start, end]` percentage band and expected wall-clock seconds
/// for one named stage (spec §4.9).
#[derive(Debug, Clone, Copy)]
struct StageBand {
    name: &'static str,
    start: f64,
    end: f64,
    expected_seconds: f64,
}

const STAGES: [StageBand; 6] = [
    StageBand { name: "load_data", start: 0.0, end: 5.0, expected_seconds: 5.0 },
    StageBand { name: "clustering", start: 5.0, end: 10.0, expected_seconds: 10.0 },
    StageBand { name: "cpsat", start: 10.0, end: 60.0, expected_seconds: 180.0 },
    StageBand { name: "ga", start: 60.0, end: 85.0, expected_seconds: 300.0 },
    StageBand { name: "rl", start: 85.0, end: 95.0, expected_seconds: 180.0 },
    StageBand { name: "finalize", start: 95.0, end: 100.0, expected_seconds: 5.0 },
];

#[derive(Debug, Serialize)]
struct ProgressRecord {
    job_id: String,
    stage: String,
    progress: u32,
    eta_seconds: Option<u64>,
    message: Option<String>,
}

/// Stage 9 component (spec §4.9). Tracks cumulative progress across the six
/// named stages with monotonic, speed-capped interpolation and a smoothed
/// ETA, and publishes every update to the cache store.
pub struct ProgressTracker<'a> {
    job_id: JobId,
    cache: &'a dyn CacheStore,
    stage_idx: usize,
    total_items: u32,
    items_done: u32,
    displayed_pct: f64,
    last_tick: Instant,
    smoothed_eta: Option<f64>,
    completed: bool,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(job_id: JobId, cache: &'a dyn CacheStore) -> Self {
        ProgressTracker {
            job_id,
            cache,
            stage_idx: 0,
            total_items: 0,
            items_done: 0,
            displayed_pct: 0.0,
            last_tick: Instant::now(),
            smoothed_eta: None,
            completed: false,
        }
    }

    pub async fn set_stage(&mut self, name: &str, total_items: u32) -> Result<()> {
        if let Some(idx) = STAGES.iter().position(|s| s.name == name) {
            self.stage_idx = idx.max(self.stage_idx);
        }
        self.total_items = total_items;
        self.items_done = 0;
        self.publish(None).await
    }

    pub async fn update_work(&mut self, items_done: u32) -> Result<()> {
        self.items_done = items_done;
        self.publish(None).await
    }

    pub async fn complete(&mut self, message: &str) -> Result<()> {
        self.completed = true;
        self.displayed_pct = 100.0;
        self.publish(Some(message.to_string())).await
    }

    pub async fn fail(&mut self, message: &str) -> Result<()> {
        self.publish(Some(message.to_string())).await
    }

    fn target_pct(&self) -> f64 {
        let band = &STAGES[self.stage_idx];
        if self.total_items == 0 {
            return band.start;
        }
        let fraction = (self.items_done as f64 / self.total_items as f64).clamp(0.0, 1.0);
        band.start + fraction * (band.end - band.start)
    }

    /// Speed-capped, monotonic interpolation toward `target_pct()` (spec
    /// §4.9 Smoothing rules).
    fn advance(&mut self) -> f64 {
        if self.completed {
            return 100.0;
        }
        let elapsed_ticks = (self.last_tick.elapsed().as_secs_f64() / TICK.as_secs_f64()).max(1.0);
        let target = self.target_pct().min(PRE_COMPLETE_CAP_PCT);
        let delta = target - self.displayed_pct;

        let step = if delta > 0.0 {
            delta.min(CATCH_UP_CAP_PCT_PER_TICK * elapsed_ticks)
        } else {
            IDLE_MIN_PCT_PER_TICK * elapsed_ticks
        };

        self.displayed_pct = (self.displayed_pct + step).min(PRE_COMPLETE_CAP_PCT);
        self.last_tick = Instant::now();
        self.displayed_pct
    }

    fn remaining_expected_seconds(&self) -> f64 {
        let band = &STAGES[self.stage_idx];
        let band_fraction_done = if self.total_items == 0 {
            0.0
        } else {
            (self.items_done as f64 / self.total_items as f64).clamp(0.0, 1.0)
        };
        let current_remaining = band.expected_seconds * (1.0 - band_fraction_done);
        let later: f64 = STAGES[self.stage_idx + 1..].iter().map(|s| s.expected_seconds).sum();
        current_remaining + later
    }

    /// EMA-smoothed ETA (spec §4.9): faster smoothing early, slower once the
    /// run has been going over 10s, monotone non-increasing within a
    /// 5-second tolerance.
    fn smoothed_eta_seconds(&mut self, elapsed_since_start: f64) -> f64 {
        let raw = self.remaining_expected_seconds();
        let alpha = if elapsed_since_start > 10.0 { 0.2 } else { 0.3 };
        let next = match self.smoothed_eta {
            Some(prev) => {
                let blended = alpha * raw + (1.0 - alpha) * prev;
                if blended > prev + ETA_TOLERANCE_SECONDS { prev + ETA_TOLERANCE_SECONDS } else { blended }
            }
            None => raw,
        };
        self.smoothed_eta = Some(next);
        next
    }

    async fn publish(&mut self, message: Option<String>) -> Result<()> {
        let pct = self.advance();
        let eta = if self.completed { 0.0 } else { self.smoothed_eta_seconds(0.0) };
        let record = ProgressRecord {
            job_id: self.job_id.as_str().to_string(),
            stage: STAGES[self.stage_idx].name.to_string(),
            progress: pct.round() as u32,
            eta_seconds: Some(eta.round() as u64),
            message,
        };
        let payload = serde_json::to_string(&record)?;
        self.cache
            .setex(&format!("progress:job:{}", self.job_id), PROGRESS_TTL_SECONDS, payload.clone())
            .await?;
        self.cache.publish(&format!("progress:{}", self.job_id), payload).await?;
        Ok(())
    }
}
