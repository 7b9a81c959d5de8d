//! Region descriptor and raw record push/pop.
//!
//! The region owns the backing bytes for `[start, base)`. Addresses handed out
//! are absolute (as seen by the frame buffer owner) and translated to offsets
//! into `mem` here and nowhere else. Records grow downward from `base`:
//!
//! ```text
//!  start        floor              cursor                          base
//!    |  pixels   |      free        | hdr | payload | pad | hdr | ... |
//! ```
//!
//! The header word of the most recent record sits exactly at `cursor`.

use fbscratch_core::layout::{align_down, align_up, round_up_word, HEADER, WORD};

use crate::error::{Error, Result};

/// Handle to a live payload inside the arena.
///
/// A plain address/length pair. Reads and writes go through the arena, which
/// checks the handle against the live part of the stack first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Allocation {
    addr: usize,
    len: usize,
}

impl Allocation {
    /// Absolute address of the first payload byte.
    pub fn addr(&self) -> usize {
        self.addr
    }

    /// Payload length in bytes as requested (or usable, for `allocate_all`).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last payload byte.
    pub fn end(&self) -> usize {
        self.addr + self.len
    }
}

/// Where a record would land, computed without touching the region.
#[derive(Debug, Clone, Copy)]
struct Placement {
    header: usize,
    payload: usize,
}

pub(crate) struct Region {
    start: usize,
    base: usize,
    cursor: usize,
    /// Live payloads, newest last. Addresses strictly decrease.
    live: Vec<Allocation>,
    zero_on_free: bool,
    mem: Box<[u8]>,
}

impl Region {
    pub(crate) fn new(start: usize, len: usize, zero_on_free: bool) -> Self {
        Self {
            start,
            base: start + len,
            cursor: start + len,
            live: Vec::new(),
            zero_on_free,
            mem: vec![0u8; len].into_boxed_slice(),
        }
    }

    pub(crate) fn start(&self) -> usize {
        self.start
    }

    pub(crate) fn base(&self) -> usize {
        self.base
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn records(&self) -> usize {
        self.live.len()
    }

    /// Drop every record. Payload bytes are left as they are.
    pub(crate) fn reset(&mut self) {
        self.cursor = self.base;
        self.live.clear();
    }

    fn offset(&self, addr: usize) -> usize {
        addr - self.start
    }

    fn read_word(&self, addr: usize) -> usize {
        let o = self.offset(addr);
        let mut w = [0u8; WORD];
        w.copy_from_slice(&self.mem[o..o + WORD]);
        u32::from_le_bytes(w) as usize
    }

    fn write_word(&mut self, addr: usize, value: usize) {
        let o = self.offset(addr);
        // Region length is validated to fit a u32, so every record size does too.
        self.mem[o..o + WORD].copy_from_slice(&(value as u32).to_le_bytes());
    }

    /// Read any word inside the region, live or not.
    pub(crate) fn peek_word(&self, addr: usize) -> Option<usize> {
        let end = addr.checked_add(WORD)?;
        (addr >= self.start && end <= self.base).then(|| self.read_word(addr))
    }

    fn collision(&self, requested: usize, needed: usize, floor: usize) -> Error {
        Error::Collision {
            requested,
            needed,
            available: self.cursor.saturating_sub(floor),
            floor,
        }
    }

    fn place(&self, size: usize, align: usize, floor: usize) -> Result<Placement> {
        let rounded = round_up_word(size).ok_or_else(|| self.collision(size, usize::MAX, floor))?;
        let needed = rounded.saturating_add(HEADER);

        let payload = self
            .cursor
            .checked_sub(rounded)
            .map(|p| align_down(p, align))
            .ok_or_else(|| self.collision(size, needed, floor))?;
        let header = payload
            .checked_sub(HEADER)
            .ok_or_else(|| self.collision(size, needed, floor))?;

        if header < floor {
            return Err(self.collision(size, self.cursor - header, floor));
        }
        Ok(Placement { header, payload })
    }

    fn commit(&mut self, at: Placement, len: usize) -> Allocation {
        let total = self.cursor - at.header;
        self.write_word(at.header, total);
        self.cursor = at.header;
        let alloc = Allocation {
            addr: at.payload,
            len,
        };
        self.live.push(alloc);
        alloc
    }

    /// Push a record for `size > 0` payload bytes with the payload aligned to
    /// `align`. Fails with `Collision` (and no mutation) if it would cross `floor`.
    pub(crate) fn push(&mut self, size: usize, align: usize, floor: usize) -> Result<Allocation> {
        let at = self.place(size, align, floor)?;
        Ok(self.commit(at, size))
    }

    /// Push one record covering everything between `floor` and the cursor.
    /// The allocation length is the usable payload after alignment padding.
    pub(crate) fn push_all(&mut self, align: usize, floor: usize) -> Result<Allocation> {
        let payload = floor
            .checked_add(HEADER)
            .and_then(|a| align_up(a, align))
            .filter(|&p| p < self.cursor);
        let Some(payload) = payload else {
            return Err(self.collision(0, HEADER + WORD, floor));
        };
        let usable = align_down(self.cursor - payload, WORD);
        if usable == 0 {
            return Err(self.collision(0, HEADER + WORD, floor));
        }
        let at = Placement {
            header: payload - HEADER,
            payload,
        };
        Ok(self.commit(at, usable))
    }

    /// Pop the most recent record unless the cursor has reached `limit`
    /// (the base, or the top of a pinned block). Returns the bytes released.
    pub(crate) fn pop(&mut self, limit: usize) -> Option<usize> {
        if self.cursor >= limit || self.live.is_empty() {
            return None;
        }
        let total = self.read_word(self.cursor);
        if total < HEADER || total % WORD != 0 || self.cursor + total > limit {
            return None;
        }
        if self.zero_on_free {
            let o = self.offset(self.cursor);
            self.mem[o..o + total].fill(0);
        }
        self.cursor += total;
        self.live.pop();
        Some(total)
    }

    /// Pop records until the cursor is at or above `target`, never crossing
    /// `limit`. Returns the bytes released.
    pub(crate) fn unwind_to(&mut self, target: usize, limit: usize) -> usize {
        let target = target.min(limit);
        let mut freed = 0;
        while self.cursor < target {
            match self.pop(limit) {
                Some(n) => freed += n,
                None => break,
            }
        }
        freed
    }

    /// True only for a handle returned by a push whose record is still live.
    /// A stale handle that happens to overlap newer records is rejected, so
    /// payload slices never reach a header word.
    pub(crate) fn is_live(&self, alloc: &Allocation) -> bool {
        self.live
            .binary_search_by(|a| alloc.addr.cmp(&a.addr))
            .is_ok_and(|i| self.live[i].len == alloc.len)
    }

    pub(crate) fn slice(&self, alloc: &Allocation) -> &[u8] {
        let o = self.offset(alloc.addr);
        &self.mem[o..o + alloc.len]
    }

    pub(crate) fn slice_mut(&mut self, alloc: &Allocation) -> &mut [u8] {
        let o = self.offset(alloc.addr);
        &mut self.mem[o..o + alloc.len]
    }
}
