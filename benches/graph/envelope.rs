//! Benchmarks for the scheduled ADSR envelope.

use std::hint::black_box;

use criterion::{BatchSize, Criterion};
use saavy_poly::{
    graph::EnvelopeGenerator,
    io::OfflineProvider,
    settings::AdsrParams,
};

fn setup() -> (OfflineProvider, EnvelopeGenerator) {
    let mut ctx = OfflineProvider::new();
    let env = EnvelopeGenerator::new(&mut ctx, AdsrParams::new(0.01, 0.2, 0.7, 0.3))
        .expect("envelope");
    (ctx, env)
}

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/envelope");

    // Attack from silence
    group.bench_function("attack", |b| {
        b.iter_batched(
            setup,
            |(mut ctx, mut env)| {
                env.trigger_attack(black_box(&mut ctx)).expect("attack");
                (ctx, env)
            },
            BatchSize::SmallInput,
        )
    });

    // Attack, release, then re-attack mid-release (cancel and hold)
    group.bench_function("retrigger_mid_release", |b| {
        b.iter_batched(
            setup,
            |(mut ctx, mut env)| {
                env.trigger_attack(&mut ctx).expect("attack");
                ctx.advance_to(0.5);
                env.trigger_release(&mut ctx).expect("release");
                ctx.advance_to(0.6);
                env.trigger_attack(black_box(&mut ctx)).expect("retrigger");
                black_box(env.level_at(&ctx, 0.6));
                (ctx, env)
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}
