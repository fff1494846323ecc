//! Benchmarks for restartable generator cycles.

use std::hint::black_box;

use criterion::{BatchSize, BenchmarkId, Criterion};
use saavy_poly::{
    graph::{NoiseSource, NoiseType, Restartable, TripleShapeOscillator},
    io::OfflineProvider,
    SignalNodeProvider,
};

/// Start, stop and drain `cycles` generations
fn cycle<G: saavy_poly::graph::RestartableGenerator>(
    ctx: &mut OfflineProvider,
    source: &mut Restartable<G>,
    cycles: usize,
) {
    for i in 0..cycles {
        let t = i as f64 * 0.1;
        ctx.advance_to(t);
        source.start_source(ctx, t).expect("start");
        source.stop_source(ctx, t + 0.05).expect("stop");
        ctx.advance_to(t + 0.05);
        for notice in ctx.take_ended() {
            source.handle_ended(ctx, &notice).expect("ended");
        }
    }
}

pub fn bench_restartable(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/restartable");

    for cycles in [1usize, 16] {
        // Three oscillators per generation
        group.bench_with_input(
            BenchmarkId::new("triple_shape", cycles),
            &cycles,
            |b, &cycles| {
                b.iter_batched(
                    || {
                        let mut ctx = OfflineProvider::new();
                        let osc = TripleShapeOscillator::new(&mut ctx).expect("oscillator");
                        (ctx, Restartable::new(osc))
                    },
                    |(mut ctx, mut source)| {
                        cycle(&mut ctx, &mut source, black_box(cycles));
                        (ctx, source)
                    },
                    BatchSize::SmallInput,
                )
            },
        );

        // One buffered source per generation, buffer shared
        group.bench_with_input(BenchmarkId::new("noise", cycles), &cycles, |b, &cycles| {
            b.iter_batched(
                || {
                    let mut ctx = OfflineProvider::new();
                    let noise = NoiseSource::new(&mut ctx, NoiseType::Pink);
                    (ctx, Restartable::new(noise))
                },
                |(mut ctx, mut source)| {
                    cycle(&mut ctx, &mut source, black_box(cycles));
                    black_box(ctx.current_time());
                    (ctx, source)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}
