//! Placement hints passed alongside allocation sizes.
//!
//! Hints influence *placement* only; they never change the LIFO discipline of
//! the arena. With a single contiguous region the speed/size preferences have
//! nowhere else to go, so the arena only counts them. `CACHE_ALIGN` moves the
//! payload down to the nearest cache-line boundary (DMA and tensor buffers).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AllocHint: u32 {
        /// Caller prefers the fastest memory available.
        const PREFER_SPEED = 1 << 0;
        /// Caller prefers the placement with the smallest footprint.
        const PREFER_SIZE = 1 << 1;
        /// Payload must start on a cache-line boundary.
        const CACHE_ALIGN = 1 << 2;
    }
}

impl AllocHint {
    /// No placement preference.
    pub const NONE: Self = Self::empty();

    /// Parse a short lowercase hint name as used in trace files and the CLI.
    pub fn parse_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::NONE),
            "speed" | "prefer_speed" => Some(Self::PREFER_SPEED),
            "size" | "prefer_size" => Some(Self::PREFER_SIZE),
            "cache_align" | "align" => Some(Self::CACHE_ALIGN),
            _ => None,
        }
    }

    pub fn cache_aligned(self) -> bool {
        self.contains(Self::CACHE_ALIGN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trace_names() {
        assert_eq!(AllocHint::parse_name("speed"), Some(AllocHint::PREFER_SPEED));
        assert_eq!(AllocHint::parse_name(" Cache_Align "), Some(AllocHint::CACHE_ALIGN));
        assert_eq!(AllocHint::parse_name("none"), Some(AllocHint::NONE));
        assert_eq!(AllocHint::parse_name("fastest"), None);
    }

    #[test]
    fn combined_hints_keep_alignment() {
        let h = AllocHint::PREFER_SPEED | AllocHint::CACHE_ALIGN;
        assert!(h.cache_aligned());
        assert!(!AllocHint::PREFER_SIZE.cache_aligned());
    }
}
