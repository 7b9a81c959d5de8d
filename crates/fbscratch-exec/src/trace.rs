//! Minimal YAML → allocation trace parser.
//!
//! A trace replays the call pattern of one processing call against a fresh
//! arena. Example (model load, then one inference call):
//! ```yaml
//! region: { start: 1000, len: 1000, floor: 1000 }
//! steps:
//!   - op: mark
//!   - op: alloc
//!     size: 300
//!     hints: [size]
//!   - op: alloc_all
//!     hints: [size]
//!   - op: free
//!   - op: pin
//!   - op: mark
//!   - op: alloc
//!     size: 200
//!     hints: [speed, cache_align]
//!   - op: release
//!   - op: release_pinned
//! ```

use serde::{Deserialize, Serialize};

use fbscratch_core::config::ScratchConfig;
use fbscratch_core::hint::AllocHint;

use crate::ExecError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default)]
    pub region: Option<RegionDef>,
    pub steps: Vec<Step>,
}

/// Region overrides carried by a trace file. Unset fields keep the
/// replayer's configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionDef {
    pub start: Option<usize>,
    pub len: Option<usize>,
    /// Initial top of the frame buffer; defaults to the region start.
    pub floor: Option<usize>,
    pub max_marks: Option<usize>,
    pub cache_line: Option<usize>,
    pub zero_on_free: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Step {
    Alloc {
        size: usize,
        #[serde(default)]
        hints: Vec<String>,
        /// Byte pattern written over the payload, simulating real use.
        #[serde(default)]
        fill: Option<u8>,
    },
    Alloc0 {
        size: usize,
        #[serde(default)]
        hints: Vec<String>,
    },
    AllocAll {
        #[serde(default)]
        hints: Vec<String>,
    },
    Free,
    Mark,
    Release,
    Pin,
    ReleasePinned,
    SetFloor {
        floor: usize,
    },
    Init,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Alloc { .. } => "alloc",
            Step::Alloc0 { .. } => "alloc0",
            Step::AllocAll { .. } => "alloc_all",
            Step::Free => "free",
            Step::Mark => "mark",
            Step::Release => "release",
            Step::Pin => "pin",
            Step::ReleasePinned => "release_pinned",
            Step::SetFloor { .. } => "set_floor",
            Step::Init => "init",
        }
    }

    /// Combined placement hint for allocating steps (`NONE` otherwise).
    pub fn hint(&self) -> Result<AllocHint, ExecError> {
        let names: &[String] = match self {
            Step::Alloc { hints, .. } | Step::Alloc0 { hints, .. } | Step::AllocAll { hints } => {
                hints.as_slice()
            }
            _ => &[],
        };
        names.iter().try_fold(AllocHint::NONE, |acc, n| {
            AllocHint::parse_name(n)
                .map(|h| acc | h)
                .ok_or_else(|| ExecError::UnknownHint(n.clone()))
        })
    }
}

/// Parse YAML into a `Trace`, rejecting unknown hint names up front.
pub fn parse_yaml_trace(yaml: &str) -> Result<Trace, ExecError> {
    let trace: Trace = serde_yaml::from_str(yaml).map_err(|e| ExecError::Parse(e.to_string()))?;
    for step in &trace.steps {
        step.hint()?;
    }
    Ok(trace)
}

/// Overlay a trace's region block onto `cfg`.
pub fn apply_region(cfg: &mut ScratchConfig, region: &RegionDef) {
    if let Some(start) = region.start {
        cfg.region_start = start;
    }
    if let Some(len) = region.len {
        cfg.region_len = len;
    }
    if let Some(marks) = region.max_marks {
        cfg.max_marks = marks;
    }
    if let Some(line) = region.cache_line {
        cfg.cache_line = line;
    }
    if let Some(zero) = region.zero_on_free {
        cfg.zero_on_free = zero;
    }
}
