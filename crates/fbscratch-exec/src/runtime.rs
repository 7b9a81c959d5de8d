//! Runtime: replay a `Trace` against a fresh arena and emit a `ReplayManifest`.
//!
//! - Builds the arena from the replayer config overlaid with the trace's
//!   region block; the frame buffer floor is a `SharedFloor` the trace can move.
//! - Walks steps in order. The first arena error (collision, mark overflow,
//!   pin without scope, floor outside the region) aborts the replay, exactly
//!   as it would abort the processing call on the device.
//! - Trace-level problems (bad YAML, bad config) are `ExecError`s instead.

use std::time::{SystemTime, UNIX_EPOCH};

use fbscratch_core::config::ScratchConfig;
use fbscratch_core::floor::SharedFloor;
use fbscratch_mem::ScratchArena;

use crate::manifest::{Outcome, ReplayManifest, StepDetail, StepRecord};
use crate::trace::{apply_region, Step, Trace};
use crate::ExecError;

pub struct Replayer {
    cfg: ScratchConfig,
}

impl Replayer {
    pub fn new(cfg: ScratchConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ScratchConfig {
        &self.cfg
    }

    /// Effective config for `trace`: replayer config plus the trace's region.
    pub fn config_for(&self, trace: &Trace) -> ScratchConfig {
        let mut cfg = self.cfg.clone();
        if let Some(region) = &trace.region {
            apply_region(&mut cfg, region);
        }
        cfg
    }

    pub fn run(&self, trace: &Trace) -> Result<ReplayManifest, ExecError> {
        let started = now_ms();
        let trace_hash = hash_trace(trace)?;

        let cfg = self.config_for(trace);
        let floor = SharedFloor::new(
            trace
                .region
                .as_ref()
                .and_then(|r| r.floor)
                .unwrap_or(cfg.region_start),
        );
        let mut arena = ScratchArena::new(&cfg, floor.clone())
            .map_err(|e| ExecError::Arena(e.to_string()))?;

        let mut manifest = ReplayManifest::new(trace_hash, &cfg, started);

        for (index, step) in trace.steps.iter().enumerate() {
            match apply_step(&mut arena, &floor, step) {
                Ok(detail) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(index, op = step.name(), ?detail, cursor = arena.cursor(), "replayed step");
                    manifest.steps.push(StepRecord {
                        index,
                        op: step.name(),
                        detail,
                        cursor: arena.cursor(),
                        marks: arena.mark_depth(),
                        available: arena.available(),
                    });
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(index, op = step.name(), error = %e, "replay aborted");
                    manifest.outcome = Outcome::Aborted {
                        step: index,
                        op: step.name(),
                        error: e.to_string(),
                        collision: e.is_collision(),
                    };
                    break;
                }
            }
        }

        manifest.final_cursor = arena.cursor();
        manifest.final_marks = arena.marks().to_vec();
        manifest.pinned_bytes = arena.pinned_bytes();
        manifest.stats = arena.stats().clone();
        manifest.finished_ms = now_ms();
        Ok(manifest)
    }
}

fn apply_step(
    arena: &mut ScratchArena<SharedFloor>,
    floor: &SharedFloor,
    step: &Step,
) -> fbscratch_mem::Result<StepDetail> {
    // Hints were validated at parse time; a hand-built trace may still carry junk.
    let hint = step
        .hint()
        .map_err(|e| fbscratch_core::error::Error::Config(e.to_string()))?;

    let detail = match step {
        Step::Alloc { size, fill, .. } => match arena.allocate(*size, hint)? {
            Some(alloc) => {
                if let Some(byte) = fill {
                    arena.bytes_mut(&alloc)?.fill(*byte);
                }
                StepDetail::Allocated {
                    addr: alloc.addr(),
                    len: alloc.len(),
                }
            }
            None => StepDetail::Skipped,
        },
        Step::Alloc0 { size, .. } => match arena.allocate_zeroed(*size, hint)? {
            Some(alloc) => StepDetail::Allocated {
                addr: alloc.addr(),
                len: alloc.len(),
            },
            None => StepDetail::Skipped,
        },
        Step::AllocAll { .. } => {
            let alloc = arena.allocate_all(hint)?;
            StepDetail::Allocated {
                addr: alloc.addr(),
                len: alloc.len(),
            }
        }
        Step::Free => StepDetail::Freed {
            bytes: arena.free(),
        },
        Step::Mark => {
            arena.mark()?;
            StepDetail::Marked
        }
        Step::Release => StepDetail::Freed {
            bytes: arena.release_to_mark(),
        },
        Step::Pin => {
            arena.mark_permanent()?;
            StepDetail::Pinned
        }
        Step::ReleasePinned => StepDetail::Freed {
            bytes: arena.release_past_mark_permanent(),
        },
        Step::SetFloor { floor: addr } => {
            floor.set(*addr);
            StepDetail::Floor { addr: *addr }
        }
        Step::Init => {
            arena.init();
            StepDetail::Reset
        }
    };
    Ok(detail)
}

/// Stable hash of a trace (JSON encoding, blake3, hex).
pub fn hash_trace(trace: &Trace) -> Result<String, ExecError> {
    let bytes = serde_json::to_vec(trace).map_err(|e| ExecError::Hash(e.to_string()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
