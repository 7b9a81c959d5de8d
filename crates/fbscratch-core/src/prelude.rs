//! Convenient re-exports for downstream crates.

pub use crate::config::ScratchConfig;
pub use crate::error::{Error, Result};
pub use crate::floor::{FixedFloor, FrameBufferFloor, SharedFloor};
pub use crate::hint::AllocHint;
pub use crate::layout::{HEADER, WORD};
