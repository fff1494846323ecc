//! Benchmarks for whole voice pools.

use std::hint::black_box;

use criterion::{BatchSize, BenchmarkId, Criterion};
use saavy_poly::{
    io::OfflineProvider,
    settings::SynthConfig,
    synth::{PolySynth, VoiceFactory},
    voices::{AnalogVoice, SimpleVoice},
    Note,
};

use crate::POOL_SIZES;

const NOTES_PER_RUN: usize = 64;

fn config(voice_count: usize) -> SynthConfig {
    SynthConfig {
        voice_count,
        ..SynthConfig::default()
    }
}

/// An arpeggio over two octaves, 50ms apart, releasing each note 30ms after
/// it starts. Pools smaller than the overlap steal constantly.
fn storm<F: VoiceFactory>(synth: &mut PolySynth<F, OfflineProvider>) {
    for i in 0..NOTES_PER_RUN {
        let t = i as f64 * 0.05;
        let note = Note::from_midi(48 + (i * 7 % 24) as i32).expect("note");
        synth.advance_to(t);
        synth.trigger_attack(note);
        synth.advance_to(t + 0.03);
        synth.trigger_release(note);
    }
}

pub fn bench_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/pool");

    for &voices in POOL_SIZES {
        // === SIMPLE VOICE ===
        // One oscillator per voice: the floor for a note event
        group.bench_with_input(BenchmarkId::new("simple", voices), &voices, |b, &voices| {
            b.iter_batched(
                || {
                    PolySynth::with_config(OfflineProvider::new(), SimpleVoice::new, config(voices))
                        .expect("pool")
                },
                |mut synth| {
                    storm(black_box(&mut synth));
                    synth
                },
                BatchSize::LargeInput,
            )
        });

        // === ANALOG VOICE ===
        // Five generators, a filter envelope and three mixers per voice
        group.bench_with_input(BenchmarkId::new("analog", voices), &voices, |b, &voices| {
            b.iter_batched(
                || {
                    PolySynth::with_config(OfflineProvider::new(), AnalogVoice::factory(), config(voices))
                        .expect("pool")
                },
                |mut synth| {
                    storm(black_box(&mut synth));
                    synth
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}
