use criterion::{criterion_group, criterion_main, Criterion};
use fbscratch_core::prelude::*;
use fbscratch_exec::{parse_yaml_trace, Replayer};
use fbscratch_mem::ScratchArena;

const START: usize = 0x2000_0000;
const LEN: usize = 64 * 1024;

fn new_arena() -> ScratchArena {
    let cfg = ScratchConfig::with_region(START, LEN);
    ScratchArena::new(&cfg, FixedFloor::new(START)).unwrap()
}

fn bench_alloc_free(c: &mut Criterion) {
    let mut arena = new_arena();
    c.bench_function("alloc_free_cycle", |b| {
        b.iter(|| {
            for size in [16usize, 100, 256, 1024] {
                arena.allocate(size, AllocHint::NONE).unwrap();
            }
            for _ in 0..4 {
                arena.free();
            }
        })
    });

    let mut arena = new_arena();
    c.bench_function("alloc_cache_aligned", |b| {
        b.iter(|| {
            arena
                .allocate(200, AllocHint::PREFER_SPEED | AllocHint::CACHE_ALIGN)
                .unwrap();
            arena.free();
        })
    });
}

fn bench_nested_scopes(c: &mut Criterion) {
    let mut arena = new_arena();
    arena.mark().unwrap();
    arena.allocate(8 * 1024, AllocHint::PREFER_SIZE).unwrap();
    arena.mark_permanent().unwrap();

    c.bench_function("nested_mark_release_over_pin", |b| {
        b.iter(|| {
            for _ in 0..8 {
                arena.mark().unwrap();
                arena.allocate(128, AllocHint::NONE).unwrap();
            }
            for _ in 0..8 {
                arena.release_to_mark();
            }
        })
    });
}

fn bench_replay(c: &mut Criterion) {
    let trace = parse_yaml_trace(
        r#"
steps:
  - op: mark
  - op: alloc
    size: 4096
    hints: [size]
  - op: alloc_all
  - op: free
  - op: pin
  - op: mark
  - op: alloc
    size: 2048
    hints: [speed, cache_align]
  - op: release
  - op: release_pinned
"#,
    )
    .unwrap();
    let replayer = Replayer::new(ScratchConfig::with_region(START, LEN));
    c.bench_function("replay_model_load", |b| {
        b.iter(|| replayer.run(&trace).unwrap())
    });
}

criterion_group!(scratch, bench_alloc_free, bench_nested_scopes, bench_replay);
criterion_main!(scratch);
