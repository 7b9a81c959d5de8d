//! Word and alignment arithmetic for allocation records.
//!
//! Every record is `[header word][payload, rounded to WORD][padding]`, laid out
//! from low to high addresses. The header word holds the total byte count of
//! the record so a pop only needs to read one word at the cursor.

/// Machine word size used for size rounding and the record header.
pub const WORD: usize = 4;

/// Size of the per-record header, in bytes.
pub const HEADER: usize = WORD;

/// Round `n` up to a multiple of [`WORD`]. Returns `None` on overflow.
pub const fn round_up_word(n: usize) -> Option<usize> {
    match n.checked_add(WORD - 1) {
        Some(v) => Some(v / WORD * WORD),
        None => None,
    }
}

/// Largest multiple of `align` that is `<= addr`. `align` must be a power of two.
pub const fn align_down(addr: usize, align: usize) -> usize {
    addr & !(align - 1)
}

/// Smallest multiple of `align` that is `>= addr`. `align` must be a power of two.
pub const fn align_up(addr: usize, align: usize) -> Option<usize> {
    match addr.checked_add(align - 1) {
        Some(v) => Some(align_down(v, align)),
        None => None,
    }
}
