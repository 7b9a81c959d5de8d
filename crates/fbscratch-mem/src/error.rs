use thiserror::Error;

/// Result type local to fbscratch-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The request would cross the floor into live frame-buffer pixels.
    /// Fatal for the in-progress operation; the arena state is untouched.
    #[error(
        "frame buffer scratch collision: requested {requested} bytes ({needed} with header and padding), \
         only {available} bytes free above floor {floor:#x}"
    )]
    Collision {
        requested: usize,
        needed: usize,
        available: usize,
        floor: usize,
    },

    #[error("frame buffer floor {floor:#x} outside scratch region [{start:#x}, {base:#x}]")]
    FloorOutOfRange {
        floor: usize,
        start: usize,
        base: usize,
    },

    #[error("mark stack overflow: capacity {capacity} marks")]
    MarkStackOverflow { capacity: usize },

    #[error("no open scoped mark to promote to permanent")]
    NoOpenMark,

    #[error("allocation at {addr:#x} ({len} bytes) is not live in this arena")]
    ForeignAllocation { addr: usize, len: usize },

    #[error(transparent)]
    Core(#[from] fbscratch_core::error::Error),
}

impl Error {
    /// True for the floor-crossing condition that must abort the caller.
    pub fn is_collision(&self) -> bool {
        matches!(self, Error::Collision { .. })
    }
}
