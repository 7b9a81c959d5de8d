//! RAII scope over the scratch arena.
//!
//! Entering a scope pushes a mark; dropping the guard releases back to it, on
//! normal return and on early `?` exits alike. A scope whose allocations must
//! outlive it (a model loaded into scratch memory) is promoted with
//! [`ScopeGuard::pin`] instead.

use std::ops::{Deref, DerefMut};

use fbscratch_core::floor::FrameBufferFloor;

use crate::arena::ScratchArena;
use crate::error::Result;

pub struct ScopeGuard<'a, F: FrameBufferFloor> {
    arena: &'a mut ScratchArena<F>,
    depth: usize,
    armed: bool,
}

impl<'a, F: FrameBufferFloor> ScopeGuard<'a, F> {
    pub(crate) fn enter(arena: &'a mut ScratchArena<F>) -> Result<Self> {
        arena.mark()?;
        let depth = arena.mark_depth();
        Ok(Self {
            arena,
            depth,
            armed: true,
        })
    }

    /// Mark-stack depth of this scope (1 for the outermost).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Promote this scope to permanent and give up the release-on-drop.
    /// Scopes left open inside it are closed first, and blocks already pinned
    /// inside it become part of this one. On error the guard still releases
    /// normally.
    pub fn pin(mut self) -> Result<()> {
        self.arena.pin_scope(self.depth)?;
        self.armed = false;
        Ok(())
    }
}

impl<F: FrameBufferFloor> Deref for ScopeGuard<'_, F> {
    type Target = ScratchArena<F>;
    fn deref(&self) -> &Self::Target {
        self.arena
    }
}

impl<F: FrameBufferFloor> DerefMut for ScopeGuard<'_, F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.arena
    }
}

impl<F: FrameBufferFloor> Drop for ScopeGuard<'_, F> {
    fn drop(&mut self) {
        if self.armed {
            self.arena.release_scope(self.depth);
            // NOTE: do not log here to keep drop path fast.
            self.armed = false;
        }
    }
}
