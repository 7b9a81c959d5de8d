//! Arena configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::WORD;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// Lowest address of the backing memory (bottom of the frame buffer).
    /// The floor reported by the frame buffer owner must never drop below it.
    pub region_start: usize,

    /// Bytes from `region_start` up to the arena base. The base is the cursor
    /// value of an empty arena.
    pub region_len: usize,

    /// Capacity of the mark stack. Marks live outside the scratch region.
    pub max_marks: usize,

    /// Cache-line size used by `AllocHint::CACHE_ALIGN`. Power of two, `>= WORD`.
    pub cache_line: usize,

    /// Scrub payload bytes when records are popped (debug aid).
    pub zero_on_free: bool,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            region_start: 0x2000_0000,
            region_len: 16 * 1024, // minimum fb-alloc size on the smallest boards
            max_marks: 64,
            cache_line: 32,
            zero_on_free: false,
        }
    }
}

impl ScratchConfig {
    /// Region spanning `[start, start + len)` with defaults for everything else.
    pub fn with_region(start: usize, len: usize) -> Self {
        Self {
            region_start: start,
            region_len: len,
            ..Self::default()
        }
    }

    /// Cursor value of an empty arena.
    pub fn base(&self) -> usize {
        self.region_start.saturating_add(self.region_len)
    }

    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `FBSCRATCH_REGION_START`: lowest address (decimal or `0x` hex)
    /// - `FBSCRATCH_REGION_LEN`: region length in bytes
    /// - `FBSCRATCH_MAX_MARKS`: mark stack capacity
    /// - `FBSCRATCH_CACHE_LINE`: cache-line size in bytes
    /// - `FBSCRATCH_ZERO_ON_FREE`: `1`/`true` to scrub popped payloads
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_usize("FBSCRATCH_REGION_START") {
            cfg.region_start = v;
        }

        if let Some(v) = env_usize("FBSCRATCH_REGION_LEN") {
            cfg.region_len = v;
        }

        if let Some(v) = env_usize("FBSCRATCH_MAX_MARKS") {
            cfg.max_marks = v;
        }

        if let Some(v) = env_usize("FBSCRATCH_CACHE_LINE") {
            cfg.cache_line = v;
        }

        if let Ok(s) = std::env::var("FBSCRATCH_ZERO_ON_FREE") {
            cfg.zero_on_free = matches!(s.trim(), "1" | "true" | "yes" | "on");
        }

        cfg
    }

    /// Reject layouts the arena cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.region_len == 0 {
            return Err(Error::Config("region_len must be non-zero".into()));
        }
        if self.region_start % WORD != 0 || self.region_len % WORD != 0 {
            return Err(Error::Config(format!(
                "region [{:#x}, +{}) must be {WORD}-byte aligned",
                self.region_start, self.region_len
            )));
        }
        if self.region_start.checked_add(self.region_len).is_none() {
            return Err(Error::Config("region end overflows the address space".into()));
        }
        // Record headers are 32-bit words.
        if u32::try_from(self.region_len).is_err() {
            return Err(Error::Config(format!(
                "region_len {} does not fit a 32-bit record header",
                self.region_len
            )));
        }
        if self.max_marks == 0 {
            return Err(Error::Config("max_marks must be at least 1".into()));
        }
        if !self.cache_line.is_power_of_two() || self.cache_line < WORD {
            return Err(Error::Config(format!(
                "cache_line {} must be a power of two >= {WORD}",
                self.cache_line
            )));
        }
        Ok(())
    }
}

fn env_usize(key: &str) -> Option<usize> {
    let s = std::env::var(key).ok()?;
    parse_usize(&s)
}

/// Parse a decimal or `0x`-prefixed hexadecimal size/address.
pub fn parse_usize(s: &str) -> Option<usize> {
    let s = s.trim().replace('_', "");
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => s.parse::<usize>().ok(),
    }
}
