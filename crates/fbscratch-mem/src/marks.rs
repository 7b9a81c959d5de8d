//! Fixed-capacity mark stack, held apart from the scratch region.
//!
//! Marks are recorded in address order: a mark pushed later always saves a
//! cursor at or below every earlier one. The innermost mark bounds every pop:
//! records are never popped past a scoped mark's entry cursor, and a `Pinned`
//! mark fences off the block between its entry cursor and `top` until the pin
//! is released.

use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mark {
    /// Ordinary scope checkpoint.
    Scoped { cursor: usize },
    /// Scope promoted to permanent. `[top, cursor)` survives enclosing releases.
    Pinned {
        cursor: usize,
        top: usize,
        /// Cursor of an enclosing scope that was closed while this block was
        /// pinned; its range is reclaimed together with the pinned block.
        deferred: Option<usize>,
    },
}

impl Mark {
    /// Cursor value restored when this mark is fully released.
    pub fn cursor(&self) -> usize {
        match *self {
            Mark::Scoped { cursor } => cursor,
            Mark::Pinned {
                cursor, deferred, ..
            } => deferred.map_or(cursor, |d| d.max(cursor)),
        }
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, Mark::Pinned { .. })
    }
}

pub(crate) struct MarkStack {
    marks: Vec<Mark>,
    capacity: usize,
}

impl MarkStack {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            marks: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.marks.len()
    }

    pub(crate) fn as_slice(&self) -> &[Mark] {
        &self.marks
    }

    pub(crate) fn last(&self) -> Option<Mark> {
        self.marks.last().copied()
    }

    pub(crate) fn clear(&mut self) {
        self.marks.clear();
    }

    pub(crate) fn push_scoped(&mut self, cursor: usize) -> Result<()> {
        if self.marks.len() >= self.capacity {
            return Err(Error::MarkStackOverflow {
                capacity: self.capacity,
            });
        }
        self.marks.push(Mark::Scoped { cursor });
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Option<Mark> {
        self.marks.pop()
    }

    /// Highest cursor records may be popped up to inside the innermost
    /// scope: its entry cursor, or the top of its pinned block.
    pub(crate) fn boundary(&self) -> Option<usize> {
        self.marks.last().map(|m| match *m {
            Mark::Scoped { cursor } => cursor,
            Mark::Pinned { top, .. } => top,
        })
    }

    /// Promote the most recent mark, which must be scoped, to pinned.
    pub(crate) fn pin_last(&mut self, top: usize) -> Result<Mark> {
        let Some(last) = self.marks.last_mut() else {
            return Err(Error::NoOpenMark);
        };
        let Mark::Scoped { cursor } = *last else {
            return Err(Error::NoOpenMark);
        };
        *last = Mark::Pinned {
            cursor,
            top,
            deferred: None,
        };
        Ok(*last)
    }

    /// Promote the scoped mark at `depth` (1-based) to pinned with its block
    /// ending at `top`. Marks above it are folded into the new block.
    pub(crate) fn pin_at(&mut self, depth: usize, top: usize) -> Result<Mark> {
        match depth.checked_sub(1).and_then(|i| self.marks.get(i)) {
            Some(Mark::Scoped { .. }) => {}
            _ => return Err(Error::NoOpenMark),
        }
        self.marks.truncate(depth);
        self.pin_last(top)
    }

    /// Close the nearest scoped mark buried under pinned marks. Its cursor is
    /// handed to the pinned mark directly above it. Returns the closed cursor.
    pub(crate) fn defer_enclosing(&mut self) -> Option<usize> {
        let idx = self.marks.iter().rposition(|m| !m.is_pinned())?;
        let Mark::Scoped { cursor: closed } = self.marks.remove(idx) else {
            return None;
        };
        if let Some(Mark::Pinned { deferred, .. }) = self.marks.get_mut(idx) {
            *deferred = Some(deferred.map_or(closed, |d| d.max(closed)));
        }
        Some(closed)
    }

    /// Remove the most recent pinned mark and every mark above it.
    pub(crate) fn take_last_pinned(&mut self) -> Option<Mark> {
        let idx = self.marks.iter().rposition(Mark::is_pinned)?;
        let pinned = self.marks[idx];
        self.marks.truncate(idx);
        Some(pinned)
    }
}
