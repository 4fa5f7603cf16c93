//! Slot pool benchmarks: allocation against a saturated prefix, churn, and
//! a tick-style cursor pass with removal.
//!
//! Run with: `cargo bench --bench slot_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ember_core::prelude::*;

#[derive(Debug, Default, Clone)]
struct Mote {
    x: f32,
    y: f32,
    life: f32,
}

fn filled(capacity: usize, fraction: f64) -> SlotPool<Mote> {
    let mut pool = SlotPool::new(capacity);
    let n = (pool.capacity() as f64 * fraction) as usize;
    for i in 0..n {
        pool.insert(Mote {
            x: i as f32,
            y: 0.0,
            life: 1.0,
        });
    }
    pool
}

fn bench_alloc_after_prefix(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_first_free");
    for capacity in [256usize, 4096, 65_536] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                let mut pool = filled(capacity, 0.9);
                b.iter(|| {
                    let id = pool.alloc_first_free().expect("room left");
                    pool.remove(black_box(id));
                });
            },
        );
    }
    group.finish();
}

fn bench_cursor_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_pass");
    for capacity in [1024usize, 16_384] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                b.iter_batched(
                    || filled(capacity, 0.5),
                    |mut pool| {
                        let mut cursor = pool.iterate();
                        while cursor.next().is_some() {
                            let expired = cursor.current_mut().is_some_and(|m| {
                                m.life -= 0.6;
                                m.x += 1.0;
                                m.y += 1.0;
                                m.life <= 0.5
                            });
                            if expired {
                                cursor.remove_current();
                            }
                        }
                        black_box(pool.len())
                    },
                    criterion::BatchSize::LargeInput,
                );
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_alloc_after_prefix, bench_cursor_pass);
criterion_main!(benches);
