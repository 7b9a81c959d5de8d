#![forbid(unsafe_code)]
//! fbscratch-exec: allocation traces, deterministic replay, and manifests.
//!
//! A trace is the sequence of arena calls one processing call makes (model
//! load, tensor arena sizing, per-call scratch). Replaying it on a simulated
//! region answers "does this call pattern fit, and does it unwind cleanly?"
//! without the device.

use thiserror::Error;

pub mod manifest;
pub mod runtime;
pub mod trace;

pub use manifest::{Outcome, ReplayManifest, StepDetail, StepRecord};
pub use runtime::{hash_trace, Replayer};
pub use trace::{apply_region, parse_yaml_trace, RegionDef, Step, Trace};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("trace parse: {0}")]
    Parse(String),
    #[error("unknown allocation hint '{0}'")]
    UnknownHint(String),
    #[error("arena setup: {0}")]
    Arena(String),
    #[error("hashing error: {0}")]
    Hash(String),
}
