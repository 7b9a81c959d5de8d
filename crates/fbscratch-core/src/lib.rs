#![forbid(unsafe_code)]
//! fbscratch-core: shared vocabulary for the frame-buffer scratch arena.
//!
//! The arena itself lives in `fbscratch-mem`. This crate only carries the
//! pieces every layer needs to agree on:
//! - `ScratchConfig` (serde, env overrides, validation)
//! - `AllocHint` placement flags
//! - the `FrameBufferFloor` interface exposed by the frame buffer owner
//! - word/alignment arithmetic used for record layout

pub mod config;
pub mod error;
pub mod floor;
pub mod hint;
pub mod layout;
pub mod prelude;

/// Crate version string, stamped into replay manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
