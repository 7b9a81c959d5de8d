//! The scratch arena: a downward-growing stack over the bytes above the live
//! frame buffer, with nested marks and pinned (permanent) escapes.
//!
//! One owned value per processing pipeline. Every operation is synchronous;
//! there is no locking and no global state.

use fbscratch_core::config::ScratchConfig;
use fbscratch_core::floor::{FixedFloor, FrameBufferFloor};
use fbscratch_core::hint::AllocHint;
use fbscratch_core::layout::WORD;

use crate::error::{Error, Result};
use crate::guard::ScopeGuard;
use crate::marks::{Mark, MarkStack};
use crate::region::{Allocation, Region};
use crate::tracking::UsageStats;

pub struct ScratchArena<F = FixedFloor> {
    region: Region,
    marks: MarkStack,
    floor: F,
    cache_line: usize,
    stats: UsageStats,
}

impl<F: FrameBufferFloor> ScratchArena<F> {
    /// Build an empty arena over `cfg`'s region. `floor` is queried on every
    /// allocation and must stay within `[region_start, base]`.
    pub fn new(cfg: &ScratchConfig, floor: F) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            region: Region::new(cfg.region_start, cfg.region_len, cfg.zero_on_free),
            marks: MarkStack::new(cfg.max_marks),
            floor,
            cache_line: cfg.cache_line,
            stats: UsageStats::new(),
        })
    }

    /// Reset to the empty state: cursor at base, no marks, fresh counters.
    /// Used at session start and after recovering from a fatal error.
    pub fn init(&mut self) {
        self.region.reset();
        self.marks.clear();
        self.stats = UsageStats::new();
        #[cfg(feature = "tracing")]
        tracing::debug!(base = self.region.base(), "fb scratch init");
    }

    fn current_floor(&self) -> Result<usize> {
        let floor = self.floor.floor();
        if floor < self.region.start() || floor > self.region.base() {
            return Err(Error::FloorOutOfRange {
                floor,
                start: self.region.start(),
                base: self.region.base(),
            });
        }
        Ok(floor)
    }

    /// Highest cursor value records may be popped up to.
    fn limit(&self) -> usize {
        self.marks.boundary().unwrap_or(self.region.base())
    }

    fn align_for(&self, hint: AllocHint) -> usize {
        if hint.cache_aligned() {
            self.cache_line
        } else {
            WORD
        }
    }

    fn note_collision(&mut self, err: &Error) {
        if err.is_collision() {
            self.stats.collisions += 1;
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %err, cursor = self.region.cursor(), "fb scratch collision");
        }
    }

    fn note_alloc(&mut self, alloc: &Allocation) {
        self.stats.allocations += 1;
        self.stats.record_used(self.used());
        #[cfg(feature = "tracing")]
        tracing::trace!(addr = alloc.addr(), len = alloc.len(), cursor = self.region.cursor(), "fb alloc");
        #[cfg(not(feature = "tracing"))]
        let _ = alloc;
    }

    /// Allocate `size` bytes. `size == 0` yields `Ok(None)` and leaves the
    /// arena untouched. Crossing the floor is a fatal `Collision`.
    pub fn allocate(&mut self, size: usize, hint: AllocHint) -> Result<Option<Allocation>> {
        if size == 0 {
            return Ok(None);
        }
        let floor = self.current_floor()?;
        self.stats.record_hint(hint);
        match self.region.push(size, self.align_for(hint), floor) {
            Ok(alloc) => {
                self.note_alloc(&alloc);
                Ok(Some(alloc))
            }
            Err(e) => {
                self.note_collision(&e);
                Err(e)
            }
        }
    }

    /// Like [`allocate`](Self::allocate), with the payload zero-filled.
    pub fn allocate_zeroed(&mut self, size: usize, hint: AllocHint) -> Result<Option<Allocation>> {
        let alloc = self.allocate(size, hint)?;
        if let Some(a) = &alloc {
            self.region.slice_mut(a).fill(0);
        }
        Ok(alloc)
    }

    /// Claim everything left between the floor and the cursor as one record.
    /// The returned length is the usable payload after alignment padding.
    pub fn allocate_all(&mut self, hint: AllocHint) -> Result<Allocation> {
        let floor = self.current_floor()?;
        self.stats.record_hint(hint);
        match self.region.push_all(self.align_for(hint), floor) {
            Ok(alloc) => {
                self.note_alloc(&alloc);
                Ok(alloc)
            }
            Err(e) => {
                self.note_collision(&e);
                Err(e)
            }
        }
    }

    /// Pop the most recent record. A no-op on an empty arena, at the entry
    /// cursor of the innermost open scope, or when the top of the stack is a
    /// pinned block. Returns the bytes released.
    pub fn free(&mut self) -> usize {
        match self.region.pop(self.limit()) {
            Some(n) => {
                self.stats.frees += 1;
                n
            }
            None => 0,
        }
    }

    fn unwind(&mut self, target: usize) -> usize {
        let before = self.region.records();
        let freed = self.region.unwind_to(target, self.limit());
        self.stats.frees += (before - self.region.records()) as u64;
        freed
    }

    /// Open a scope: remember the current cursor on the mark stack.
    pub fn mark(&mut self) -> Result<()> {
        self.marks.push_scoped(self.region.cursor())
    }

    /// Close the most recent scope, popping every record allocated since it.
    ///
    /// If the most recent mark is pinned, only records above the pinned block
    /// are released and the nearest enclosing scope is closed by deferring
    /// its cursor to the pin. Without any mark this is a no-op.
    pub fn release_to_mark(&mut self) -> usize {
        let freed = match self.marks.last() {
            None => 0,
            Some(Mark::Scoped { cursor }) => {
                self.marks.pop();
                self.unwind(cursor)
            }
            Some(Mark::Pinned { top, .. }) => {
                let freed = self.unwind(top);
                self.marks.defer_enclosing();
                freed
            }
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(freed, cursor = self.region.cursor(), marks = self.marks.len(), "fb release to mark");
        freed
    }

    /// Promote the most recent scope to permanent. Its records survive every
    /// enclosing release until [`release_past_mark_permanent`](Self::release_past_mark_permanent).
    pub fn mark_permanent(&mut self) -> Result<()> {
        let pinned = self.marks.pin_last(self.region.cursor())?;
        self.note_pin(pinned);
        Ok(())
    }

    fn note_pin(&mut self, pinned: Mark) {
        self.stats.pins += 1;
        #[cfg(feature = "tracing")]
        tracing::debug!(?pinned, "fb mark permanent");
        #[cfg(not(feature = "tracing"))]
        let _ = pinned;
    }

    /// Tear down the most recent pinned block: everything above it, the block
    /// itself, and any enclosing scope that was closed while it was pinned.
    /// Scoped marks opened after the pin are dropped. No pin means no-op.
    pub fn release_past_mark_permanent(&mut self) -> usize {
        let Some(pinned) = self.marks.take_last_pinned() else {
            return 0;
        };
        let freed = self.unwind(pinned.cursor());
        #[cfg(feature = "tracing")]
        tracing::debug!(freed, cursor = self.region.cursor(), "fb release past permanent");
        freed
    }

    /// Close the scope whose mark sits at `depth` (1-based), including any
    /// scoped marks opened inside it and left open.
    pub(crate) fn release_scope(&mut self, depth: usize) {
        while self.marks.len() >= depth {
            let len = self.marks.len();
            let only_pins_above = self.marks.as_slice()[depth..]
                .iter()
                .all(Mark::is_pinned);
            self.release_to_mark();
            if only_pins_above || self.marks.len() == len {
                break;
            }
        }
    }

    /// Promote the scope at `depth`. Scoped marks left open above the newest
    /// pinned block inside it are closed first; pinned blocks nested inside
    /// the scope are folded into the new one.
    pub(crate) fn pin_scope(&mut self, depth: usize) -> Result<()> {
        while self.marks.len() > depth && !self.marks.last().is_some_and(|m| m.is_pinned()) {
            self.release_to_mark();
        }
        let pinned = self.marks.pin_at(depth, self.region.cursor())?;
        self.note_pin(pinned);
        Ok(())
    }

    /// Enter an RAII scope: marks now, releases on drop.
    pub fn scope(&mut self) -> Result<ScopeGuard<'_, F>> {
        ScopeGuard::enter(self)
    }

    /// Read access to a live allocation.
    pub fn bytes(&self, alloc: &Allocation) -> Result<&[u8]> {
        if !self.region.is_live(alloc) {
            return Err(Error::ForeignAllocation {
                addr: alloc.addr(),
                len: alloc.len(),
            });
        }
        Ok(self.region.slice(alloc))
    }

    /// Write access to a live allocation.
    pub fn bytes_mut(&mut self, alloc: &Allocation) -> Result<&mut [u8]> {
        if !self.region.is_live(alloc) {
            return Err(Error::ForeignAllocation {
                addr: alloc.addr(),
                len: alloc.len(),
            });
        }
        Ok(self.region.slice_mut(alloc))
    }

    /// Raw word at `addr` (header inspection for diagnostics).
    pub fn peek_word(&self, addr: usize) -> Option<usize> {
        self.region.peek_word(addr)
    }

    pub fn cursor(&self) -> usize {
        self.region.cursor()
    }

    pub fn base(&self) -> usize {
        self.region.base()
    }

    pub fn region_start(&self) -> usize {
        self.region.start()
    }

    /// Current floor as reported by the frame buffer owner.
    pub fn floor(&self) -> usize {
        self.floor.floor()
    }

    /// Free bytes between the floor and the cursor (before header/padding).
    pub fn available(&self) -> usize {
        self.region.cursor().saturating_sub(self.floor.floor())
    }

    /// Bytes consumed by live records, headers and padding included.
    pub fn used(&self) -> usize {
        self.region.base() - self.region.cursor()
    }

    /// Number of live records.
    pub fn depth(&self) -> usize {
        self.region.records()
    }

    pub fn mark_depth(&self) -> usize {
        self.marks.len()
    }

    pub fn marks(&self) -> &[Mark] {
        self.marks.as_slice()
    }

    /// Bytes currently fenced off by pinned blocks.
    pub fn pinned_bytes(&self) -> usize {
        self.marks
            .as_slice()
            .iter()
            .map(|m| match *m {
                Mark::Pinned { cursor, top, .. } => cursor.saturating_sub(top),
                Mark::Scoped { .. } => 0,
            })
            .sum()
    }

    /// Cursor at base and no marks open.
    pub fn is_empty(&self) -> bool {
        self.region.cursor() == self.region.base() && self.marks.len() == 0
    }

    pub fn stats(&self) -> &UsageStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> ScratchArena {
        let cfg = ScratchConfig::with_region(1000, 1000);
        ScratchArena::new(&cfg, FixedFloor::new(1000)).unwrap()
    }

    #[test]
    fn release_scope_keeps_enclosing_mark() {
        let mut a = arena();
        a.mark().unwrap(); // outer
        a.mark().unwrap(); // scope under test, depth 2
        a.allocate(16, AllocHint::NONE).unwrap();
        a.mark().unwrap(); // inner, pinned
        a.allocate(16, AllocHint::NONE).unwrap();
        a.mark_permanent().unwrap();

        a.release_scope(2);
        // Scope 2 closed by deferral onto the pin; outer scope still open.
        assert_eq!(a.mark_depth(), 2);
        assert!(matches!(a.marks()[0], Mark::Scoped { cursor: 2000 }));
        assert!(a.marks()[1].is_pinned());
    }

    #[test]
    fn pin_scope_closes_stray_marks_first() {
        let mut a = arena();
        a.mark().unwrap();
        a.allocate(8, AllocHint::NONE).unwrap();
        let after_model = a.cursor();
        a.mark().unwrap();
        a.allocate(8, AllocHint::NONE).unwrap();

        a.pin_scope(1).unwrap();
        assert_eq!(a.cursor(), after_model);
        assert_eq!(a.pinned_bytes(), 2000 - after_model);
    }

    #[test]
    fn pin_scope_folds_nested_pin() {
        let mut a = arena();
        a.mark().unwrap(); // scope under test
        a.allocate(16, AllocHint::NONE).unwrap();
        a.mark().unwrap();
        a.allocate(16, AllocHint::NONE).unwrap();
        a.mark_permanent().unwrap();
        let top = a.cursor();

        a.pin_scope(1).unwrap();
        assert_eq!(
            a.marks(),
            &[Mark::Pinned {
                cursor: 2000,
                top,
                deferred: None
            }]
        );
        assert_eq!(a.stats().pins, 2);
    }

    #[test]
    fn free_stops_at_scope_entry() {
        let mut a = arena();
        a.allocate(8, AllocHint::NONE).unwrap();
        a.mark().unwrap();
        assert_eq!(a.free(), 0);
        a.mark_permanent().unwrap();
        assert_eq!(a.pinned_bytes(), 0);
    }

    #[test]
    fn stats_count_hints_and_collisions() {
        let mut a = arena();
        a.allocate(8, AllocHint::PREFER_SPEED | AllocHint::CACHE_ALIGN)
            .unwrap();
        assert!(a.allocate(4096, AllocHint::PREFER_SIZE).is_err());
        let s = a.stats();
        assert_eq!(s.allocations, 1);
        assert_eq!(s.collisions, 1);
        assert_eq!(s.speed_hints, 1);
        assert_eq!(s.size_hints, 1);
        assert_eq!(s.aligned, 1);
    }
}
