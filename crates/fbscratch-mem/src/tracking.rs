//! Lightweight peak/usage counters for the scratch arena.
//!
//! Keep this cheap: plain integers updated inline by the arena. Downstream can
//! forward a snapshot to whatever telemetry the firmware has.

use serde::Serialize;

use fbscratch_core::hint::AllocHint;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    /// Highest number of bytes (records plus headers) ever in use at once.
    pub peak_bytes: usize,
    /// Successful allocations, including `allocate_all`.
    pub allocations: u64,
    /// Records popped by `free` or any release.
    pub frees: u64,
    /// Requests rejected because they would cross the floor.
    pub collisions: u64,
    /// Requests carrying `PREFER_SPEED`.
    pub speed_hints: u64,
    /// Requests carrying `PREFER_SIZE`.
    pub size_hints: u64,
    /// Requests carrying `CACHE_ALIGN`.
    pub aligned: u64,
    /// Scopes promoted to permanent.
    pub pins: u64,
}

impl UsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new "used bytes" value; updates peak if higher.
    pub fn record_used(&mut self, used_bytes: usize) {
        if used_bytes > self.peak_bytes {
            self.peak_bytes = used_bytes;
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(used_bytes, peak = self.peak_bytes, "fb scratch usage");
    }

    pub(crate) fn record_hint(&mut self, hint: AllocHint) {
        if hint.contains(AllocHint::PREFER_SPEED) {
            self.speed_hints += 1;
        }
        if hint.contains(AllocHint::PREFER_SIZE) {
            self.size_hints += 1;
        }
        if hint.cache_aligned() {
            self.aligned += 1;
        }
    }

    pub fn peak(&self) -> usize {
        self.peak_bytes
    }
}
