#![forbid(unsafe_code)]
//! fbscratch-mem: the frame-buffer scratch arena.
//!
//! A stack allocator over the RAM sitting directly above the live camera
//! frame. Image filters and inference calls borrow scratch space from it and
//! hand it back in strict LIFO order within a single processing frame.
//!
//! Layers, leaves first:
//! - `region`: base/floor/cursor and size-headed records (push/pop)
//! - `marks`: bounded mark stack, scoped and pinned checkpoints
//! - `arena`: the public `ScratchArena` tying both to the frame buffer floor
//! - `guard`: RAII scopes that release on drop
//!
//! Crossing the floor is never truncated or retried: it surfaces as
//! `Error::Collision` and the in-progress operation must abort.

pub mod arena;
pub mod error;
pub mod guard;
pub mod marks;
pub mod region;
pub mod tracking;

pub use arena::ScratchArena;
pub use error::{Error, Result};
pub use guard::ScopeGuard;
pub use marks::Mark;
pub use region::Allocation;
pub use tracking::UsageStats;
