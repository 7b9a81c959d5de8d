//! Raw stack behaviour: allocate / allocate_zeroed / allocate_all / free

use fbscratch_core::config::ScratchConfig;
use fbscratch_core::floor::FixedFloor;
use fbscratch_core::hint::AllocHint;
use fbscratch_mem::{Error, ScratchArena};

/// Region [1000, 2000), floor 1000, base 2000.
fn small_arena() -> ScratchArena {
    let cfg = ScratchConfig::with_region(1000, 1000);
    ScratchArena::new(&cfg, FixedFloor::new(1000)).expect("valid config")
}

#[test]
fn test_worked_example_layout() {
    let mut arena = small_arena();
    assert_eq!(arena.cursor(), 2000);

    let a = arena
        .allocate(10, AllocHint::NONE)
        .expect("allocate")
        .expect("non-null");

    // 10 rounds to 12, plus a 4-byte header = 16 bytes.
    assert_eq!(a.addr(), 1988);
    assert_eq!(a.len(), 10);
    assert_eq!(arena.cursor(), 1984);
    assert_eq!(arena.peek_word(1984), Some(16));
    assert_eq!(arena.used(), 16);

    assert_eq!(arena.free(), 16);
    assert_eq!(arena.cursor(), 2000);
    assert!(arena.is_empty());
}

#[test]
fn test_zero_size_returns_none_without_moving() {
    let mut arena = small_arena();
    assert!(arena.allocate(0, AllocHint::NONE).unwrap().is_none());
    assert!(arena.allocate_zeroed(0, AllocHint::CACHE_ALIGN).unwrap().is_none());
    assert_eq!(arena.cursor(), 2000);
    assert_eq!(arena.depth(), 0);
    assert_eq!(arena.stats().allocations, 0);
}

#[test]
fn test_frees_restore_cursor_in_reverse_order() {
    let mut arena = small_arena();
    let sizes = [1usize, 7, 8, 33, 100];
    let mut cursors = Vec::new();
    for &s in &sizes {
        cursors.push(arena.cursor());
        arena.allocate(s, AllocHint::NONE).unwrap();
    }
    assert_eq!(arena.depth(), sizes.len());

    for expected in cursors.iter().rev() {
        arena.free();
        assert_eq!(arena.cursor(), *expected);
    }
    assert_eq!(arena.cursor(), 2000);
}

#[test]
fn test_free_on_empty_is_noop() {
    let mut arena = small_arena();
    assert_eq!(arena.free(), 0);
    assert_eq!(arena.free(), 0);
    assert_eq!(arena.cursor(), 2000);
}

#[test]
fn test_allocate_zeroed_clears_reused_memory() {
    let mut arena = small_arena();
    let a = arena.allocate(64, AllocHint::NONE).unwrap().unwrap();
    arena.bytes_mut(&a).unwrap().fill(0xAA);
    arena.free();

    let b = arena.allocate_zeroed(64, AllocHint::NONE).unwrap().unwrap();
    assert_eq!(a.addr(), b.addr());
    assert!(arena.bytes(&b).unwrap().iter().all(|&v| v == 0));
}

#[test]
fn test_cache_align_pads_and_free_pops_padding() {
    let mut arena = small_arena();
    arena.allocate(4, AllocHint::NONE).unwrap(); // cursor 1992
    let before = arena.cursor();

    let a = arena
        .allocate(10, AllocHint::PREFER_SPEED | AllocHint::CACHE_ALIGN)
        .unwrap()
        .unwrap();
    assert_eq!(a.addr() % 32, 0);
    assert_eq!(a.addr(), 1952);
    // Header right below the payload, size includes the padding above it.
    assert_eq!(arena.cursor(), 1948);
    assert_eq!(arena.peek_word(1948), Some(before - 1948));

    arena.free();
    assert_eq!(arena.cursor(), before);
}

#[test]
fn test_allocate_all_takes_everything_above_floor() {
    let mut arena = small_arena();
    arena.allocate(100, AllocHint::NONE).unwrap(); // cursor 1896

    let all = arena.allocate_all(AllocHint::PREFER_SIZE).unwrap();
    assert_eq!(all.addr(), 1004);
    assert_eq!(all.len(), 1896 - 1004);
    assert_eq!(arena.cursor(), 1000);
    assert_eq!(arena.available(), 0);

    arena.free();
    assert_eq!(arena.cursor(), 1896);
}

#[test]
fn test_allocate_all_reports_usable_bytes_after_alignment() {
    let mut arena = small_arena();
    let all = arena.allocate_all(AllocHint::CACHE_ALIGN).unwrap();
    // First 32-byte boundary with room for a header above the floor.
    assert_eq!(all.addr(), 1024);
    assert_eq!(all.len(), 2000 - 1024);
    assert_eq!(arena.cursor(), 1020);

    arena.free();
    assert_eq!(arena.cursor(), 2000);
}

#[test]
fn test_stale_handle_is_rejected() {
    let mut arena = small_arena();
    let a = arena.allocate(16, AllocHint::NONE).unwrap().unwrap();
    arena.free();
    assert!(matches!(
        arena.bytes(&a),
        Err(Error::ForeignAllocation { addr: 1984, len: 16 })
    ));
}

#[test]
fn test_stale_handle_over_newer_headers_is_rejected() {
    let mut arena = small_arena();
    arena.allocate(4, AllocHint::NONE).unwrap();
    let stale = arena.allocate(12, AllocHint::NONE).unwrap().unwrap();
    arena.free();

    // Two smaller records now occupy the old payload, header at 1984 inside it.
    arena.allocate(4, AllocHint::NONE).unwrap();
    let b = arena.allocate(4, AllocHint::NONE).unwrap().unwrap();
    assert_eq!(b.addr(), stale.addr());
    assert!(matches!(
        arena.bytes_mut(&stale),
        Err(Error::ForeignAllocation { addr: 1980, len: 12 })
    ));
    arena.bytes_mut(&b).unwrap().fill(0xEE);

    assert_eq!(arena.peek_word(1984), Some(8));
    assert_eq!(arena.free(), 8);
    assert_eq!(arena.free(), 8);
    assert_eq!(arena.free(), 8);
    assert!(arena.is_empty());
}

#[test]
fn test_free_stops_at_open_scope() {
    let mut arena = small_arena();
    arena.allocate(8, AllocHint::NONE).unwrap();
    arena.mark().unwrap();
    assert_eq!(arena.free(), 0);
    assert_eq!(arena.cursor(), 1988);

    arena.mark_permanent().unwrap();
    assert_eq!(arena.pinned_bytes(), 0);
    arena.release_past_mark_permanent();
    assert_eq!(arena.free(), 12);
    assert!(arena.is_empty());
}

#[test]
fn test_payload_writes_do_not_touch_headers() {
    let mut arena = small_arena();
    arena.allocate(8, AllocHint::NONE).unwrap();
    let b = arena.allocate(8, AllocHint::NONE).unwrap().unwrap();
    arena.bytes_mut(&b).unwrap().fill(0xFF);

    assert_eq!(arena.free(), 12);
    assert_eq!(arena.free(), 12);
    assert_eq!(arena.cursor(), 2000);
}

#[test]
fn test_init_resets_everything() {
    let mut arena = small_arena();
    arena.mark().unwrap();
    arena.allocate(40, AllocHint::PREFER_SPEED).unwrap();
    arena.mark().unwrap();
    arena.allocate(40, AllocHint::NONE).unwrap();
    arena.mark_permanent().unwrap();

    arena.init();
    assert!(arena.is_empty());
    assert_eq!(arena.depth(), 0);
    assert_eq!(arena.stats().allocations, 0);
    assert_eq!(arena.pinned_bytes(), 0);
}

#[test]
fn test_peak_usage_is_tracked() {
    let mut arena = small_arena();
    arena.allocate(60, AllocHint::NONE).unwrap(); // 64
    arena.allocate(60, AllocHint::NONE).unwrap(); // 128
    arena.free();
    arena.allocate(8, AllocHint::NONE).unwrap(); // 76
    assert_eq!(arena.stats().peak(), 128);
    assert_eq!(arena.used(), 76);
    assert_eq!(arena.stats().frees, 1);
}
