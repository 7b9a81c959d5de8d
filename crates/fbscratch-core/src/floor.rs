//! The frame buffer owner's side of the contract.
//!
//! The arena never owns the pixel buffer. It asks the owner for the current
//! top of the live frame (the *floor*) on every allocation, because the capture
//! path may grow or shrink the frame between processing calls.

use std::cell::Cell;
use std::rc::Rc;

/// Exposes the lowest address the scratch arena may use.
pub trait FrameBufferFloor {
    /// Top of the live pixel buffer (first byte the arena may touch).
    fn floor(&self) -> usize;
}

/// A floor that never moves (fixed-size frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFloor(usize);

impl FixedFloor {
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }
}

impl FrameBufferFloor for FixedFloor {
    fn floor(&self) -> usize {
        self.0
    }
}

/// A floor shared between the capture path and the arena.
///
/// Cloning yields another handle to the same floor. Single-threaded by
/// construction (`Rc<Cell<_>>`), matching the arena's ownership model.
#[derive(Debug, Clone, Default)]
pub struct SharedFloor {
    top: Rc<Cell<usize>>,
}

impl SharedFloor {
    pub fn new(addr: usize) -> Self {
        Self {
            top: Rc::new(Cell::new(addr)),
        }
    }

    /// Move the top of the frame buffer (e.g. after a resolution change).
    pub fn set(&self, addr: usize) {
        self.top.set(addr);
    }
}

impl FrameBufferFloor for SharedFloor {
    fn floor(&self) -> usize {
        self.top.get()
    }
}

impl<T: FrameBufferFloor + ?Sized> FrameBufferFloor for &T {
    fn floor(&self) -> usize {
        (**self).floor()
    }
}
