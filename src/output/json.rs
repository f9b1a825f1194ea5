//! JSON run summary
//!
//! Machine-readable counterpart to the console summary, written on request
//! (`--json-summary PATH`). Carries the same counts and latency statistics
//! plus the per-picture results in arrival order.

use crate::problem::MatchResult;
use crate::stats::RunStats;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct RunSummary {
    /// When the summary was written
    pub generated_at: String,

    /// Total wall-clock run time in seconds
    pub elapsed_seconds: f64,

    /// Number of worker services that participated
    pub workers: usize,

    pub pictures: PictureCounts,

    /// Per-picture engine latency in microseconds
    pub search_latency_us: LatencySummary,

    /// Pictures completed per worker, keyed by node id
    pub per_worker: BTreeMap<String, u64>,

    /// Per-picture outcomes in arrival order
    pub results: Vec<ResultEntry>,
}

#[derive(Debug, Serialize)]
pub struct PictureCounts {
    pub total: u64,
    pub matched: u64,
    pub unmatched: u64,
}

#[derive(Debug, Serialize)]
pub struct LatencySummary {
    pub min: u64,
    pub mean: f64,
    pub max: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
}

#[derive(Debug, Serialize)]
pub struct ResultEntry {
    pub picture_id: i32,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col: Option<usize>,
}

impl ResultEntry {
    fn from_result(result: &MatchResult) -> Self {
        Self {
            picture_id: result.picture_id,
            found: result.found(),
            object_id: result.location.map(|loc| loc.object_id),
            row: result.location.map(|loc| loc.row),
            col: result.location.map(|loc| loc.col),
        }
    }
}

impl RunSummary {
    pub fn build(stats: &RunStats, duration: Duration, workers: usize) -> Self {
        let hist = stats.search_latency_us();
        let search_latency_us = LatencySummary {
            min: if hist.is_empty() { 0 } else { hist.min() },
            mean: hist.mean(),
            max: hist.max(),
            p50: hist.value_at_percentile(50.0),
            p90: hist.value_at_percentile(90.0),
            p99: hist.value_at_percentile(99.0),
        };

        Self {
            generated_at: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            elapsed_seconds: duration.as_secs_f64(),
            workers,
            pictures: PictureCounts {
                total: stats.total(),
                matched: stats.matched(),
                unmatched: stats.unmatched(),
            },
            search_latency_us,
            per_worker: stats.per_worker().clone(),
            results: stats.results().iter().map(ResultEntry::from_result).collect(),
        }
    }
}

/// Write the JSON run summary to `path`.
pub fn write_summary(
    path: &Path,
    stats: &RunStats,
    duration: Duration,
    workers: usize,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .context("Failed to create JSON summary directory")?;
        }
    }

    let summary = RunSummary::build(stats, duration, workers);
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create JSON summary: {}", path.display()))?;
    serde_json::to_writer_pretty(file, &summary).context("Failed to write JSON summary")?;

    Ok(())
}
