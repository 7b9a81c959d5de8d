//! Deterministic replay manifest for audit.
//!
//! The replayer emits one manifest per trace run. Replaying the same trace
//! with the same configuration yields the same `trace_hash`, step log and
//! final state; only `id` and timestamps differ.

use serde::Serialize;
use uuid::Uuid;

use fbscratch_core::config::ScratchConfig;
use fbscratch_mem::{Mark, UsageStats};

/// What a single step did to the arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepDetail {
    Allocated { addr: usize, len: usize },
    /// Zero-size request: no record, no error.
    Skipped,
    Freed { bytes: usize },
    Marked,
    Pinned,
    Floor { addr: usize },
    Reset,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub op: &'static str,
    pub detail: StepDetail,
    /// Cursor after the step.
    pub cursor: usize,
    /// Mark-stack depth after the step.
    pub marks: usize,
    pub available: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    /// A fatal arena error stopped the replay at `step`.
    Aborted {
        step: usize,
        op: &'static str,
        error: String,
        collision: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayManifest {
    pub id: Uuid,

    /// Stable blake3 hash of the trace (hex).
    pub trace_hash: String,

    /// Crate version string for provenance.
    pub engine_version: String,

    pub region_start: usize,
    pub base: usize,

    pub steps: Vec<StepRecord>,
    pub outcome: Outcome,

    pub final_cursor: usize,
    pub final_marks: Vec<Mark>,
    pub pinned_bytes: usize,
    pub stats: UsageStats,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl ReplayManifest {
    pub fn new(trace_hash: String, cfg: &ScratchConfig, started_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            trace_hash,
            engine_version: fbscratch_core::VERSION.to_string(),
            region_start: cfg.region_start,
            base: cfg.base(),
            steps: Vec::new(),
            outcome: Outcome::Completed,
            final_cursor: cfg.base(),
            final_marks: Vec::new(),
            pinned_bytes: 0,
            stats: UsageStats::default(),
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == Outcome::Completed
    }

    /// Bytes still held when the trace ended.
    pub fn leaked_bytes(&self) -> usize {
        self.base - self.final_cursor
    }
}
