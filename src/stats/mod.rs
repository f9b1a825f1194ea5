//! Run statistics
//!
//! The coordinator records every incoming result here: match/no-match
//! counts, per-picture search latency, and per-worker completion counts.
//! The latter makes the pull-based load balancing visible: a fast worker
//! is handed more pictures, and its completion count shows it.

use crate::distributed::protocol::ResultMessage;
use crate::problem::MatchResult;
use crate::Result;
use anyhow::Context;
use hdrhistogram::Histogram;
use std::collections::BTreeMap;

/// Statistics collected over one run, in result-arrival order.
pub struct RunStats {
    results: Vec<MatchResult>,
    matched: u64,
    unmatched: u64,
    /// Per-picture engine wall-clock, in microseconds.
    search_latency_us: Histogram<u64>,
    /// Pictures completed per worker (keyed by node id).
    per_worker: BTreeMap<String, u64>,
}

impl RunStats {
    pub fn new() -> Result<Self> {
        let search_latency_us =
            Histogram::new(3).context("Failed to create search latency histogram")?;
        Ok(Self {
            results: Vec::new(),
            matched: 0,
            unmatched: 0,
            search_latency_us,
            per_worker: BTreeMap::new(),
        })
    }

    /// Record one worker result.
    pub fn record(&mut self, msg: &ResultMessage) {
        if msg.result.found() {
            self.matched += 1;
        } else {
            self.unmatched += 1;
        }
        self.results.push(msg.result);

        // Sub-microsecond searches still count as one microsecond.
        let us = (msg.search_ns / 1_000).max(1);
        // Saturate rather than fail on out-of-range values.
        let _ = self.search_latency_us.record(us);

        *self.per_worker.entry(msg.node_id.clone()).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.matched + self.unmatched
    }

    pub fn matched(&self) -> u64 {
        self.matched
    }

    pub fn unmatched(&self) -> u64 {
        self.unmatched
    }

    /// All results in arrival order.
    pub fn results(&self) -> &[MatchResult] {
        &self.results
    }

    /// Per-worker completion counts, keyed by node id.
    pub fn per_worker(&self) -> &BTreeMap<String, u64> {
        &self.per_worker
    }

    /// Search latency histogram in microseconds.
    pub fn search_latency_us(&self) -> &Histogram<u64> {
        &self.search_latency_us
    }
}
