use std::sync::Arc;

use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    graph::{node::NodeGroup, restartable::RestartableGenerator},
    io::provider::{NodeId, Param, ParamRef, SignalNodeProvider},
    settings::oscillator::{GAIN, NOISE_BUFFER_SECONDS, NOISE_SAMPLE_RATE},
};

/*
Noise Sources
=============

Noise is played from a looping buffer filled once per source. A fresh source
node is created for every generation, but the buffer itself is shared, so
restarting a noise voice costs one node, not two seconds of random numbers.
A `NoiseBank` goes one step further and shares one buffer per colour between
every source built from it, e.g. all voices of a pool.

  white   Independent uniform samples in [-1, 1]. Flat spectrum.

  pink    -3 dB/octave. White noise through Paul Kellet's parallel bank of
          one-pole filters (the "refined" version):

            b0 = 0.99886 b0 + w 0.0555179
            b1 = 0.99332 b1 + w 0.0750759
            b2 = 0.96900 b2 + w 0.1538520
            b3 = 0.86650 b3 + w 0.3104856
            b4 = 0.55000 b4 + w 0.5329522
            b5 = -0.7616 b5 - w 0.0168980
            out = (b0 + ... + b6 + w 0.5362) * 0.11
            b6 = w 0.115926

  brown   -6 dB/octave. A leaky integrator of white noise:

            last = (last + 0.02 w) / 1.02
            out  = last * 3.5

Every buffer is normalised so its peak is just under 1.0.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoiseType {
    White,
    Pink,
    Brown,
}

impl NoiseType {
    /// In mixer input order
    pub const ALL: [NoiseType; 3] = [NoiseType::White, NoiseType::Pink, NoiseType::Brown];

    pub fn index(self) -> usize {
        match self {
            NoiseType::White => 0,
            NoiseType::Pink => 1,
            NoiseType::Brown => 2,
        }
    }

    pub fn fill(self, buffer: &mut [f32], rng: &mut impl Rng) {
        match self {
            NoiseType::White => fill_white(buffer, rng),
            NoiseType::Pink => fill_pink(buffer, rng),
            NoiseType::Brown => fill_brown(buffer, rng),
        }
        normalize(buffer);
    }
}

#[inline]
fn white_sample(rng: &mut impl Rng) -> f32 {
    rng.random::<f32>() * 2.0 - 1.0
}

fn fill_white(buffer: &mut [f32], rng: &mut impl Rng) {
    for sample in buffer.iter_mut() {
        *sample = white_sample(rng);
    }
}

fn fill_pink(buffer: &mut [f32], rng: &mut impl Rng) {
    let (mut b0, mut b1, mut b2, mut b3, mut b4, mut b5, mut b6) =
        (0.0f32, 0.0f32, 0.0f32, 0.0f32, 0.0f32, 0.0f32, 0.0f32);

    for sample in buffer.iter_mut() {
        let white = white_sample(rng);
        b0 = 0.99886 * b0 + white * 0.0555179;
        b1 = 0.99332 * b1 + white * 0.0750759;
        b2 = 0.96900 * b2 + white * 0.1538520;
        b3 = 0.86650 * b3 + white * 0.3104856;
        b4 = 0.55000 * b4 + white * 0.5329522;
        b5 = -0.7616 * b5 - white * 0.0168980;
        *sample = (b0 + b1 + b2 + b3 + b4 + b5 + b6 + white * 0.5362) * 0.11;
        b6 = white * 0.115926;
    }
}

fn fill_brown(buffer: &mut [f32], rng: &mut impl Rng) {
    let mut last = 0.0f32;
    for sample in buffer.iter_mut() {
        let white = white_sample(rng);
        last = (last + 0.02 * white) / 1.02;
        *sample = last * 3.5;
    }
}

fn normalize(buffer: &mut [f32]) {
    let peak = buffer.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    if peak > 0.0 {
        let scale = (1.0 / peak - f32::EPSILON).abs();
        for sample in buffer.iter_mut() {
            *sample *= scale;
        }
    }
}

/// Buffer length used by [`NoiseSource::new`]
pub fn default_buffer_len() -> usize {
    (NOISE_BUFFER_SECONDS * NOISE_SAMPLE_RATE) as usize
}

fn noise_buffer(kind: NoiseType, len: usize, rng: &mut impl Rng) -> Arc<[f32]> {
    let mut buffer = vec![0.0; len];
    kind.fill(&mut buffer, rng);
    buffer.into()
}

/// One buffer of each colour, cheap to clone and share.
#[derive(Debug, Clone)]
pub struct NoiseBank {
    buffers: [Arc<[f32]>; 3],
}

impl NoiseBank {
    pub fn new() -> Self {
        Self::with_rng(default_buffer_len(), &mut rand::rng())
    }

    pub fn with_rng(len: usize, rng: &mut impl Rng) -> Self {
        Self {
            buffers: NoiseType::ALL.map(|kind| noise_buffer(kind, len, &mut *rng)),
        }
    }

    pub fn buffer(&self, kind: NoiseType) -> Arc<[f32]> {
        Arc::clone(&self.buffers[kind.index()])
    }
}

impl Default for NoiseBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Looping noise of one colour into a persistent output gain.
#[derive(Debug)]
pub struct NoiseSource {
    kind: NoiseType,
    buffer: Arc<[f32]>,
    output: NodeId,
    gain: f64,
}

impl NoiseSource {
    pub fn new(ctx: &mut dyn SignalNodeProvider, kind: NoiseType) -> Self {
        Self::with_rng(ctx, kind, default_buffer_len(), &mut rand::rng())
    }

    /// Explicit buffer length and random source (seeded rngs give repeatable buffers)
    pub fn with_rng(
        ctx: &mut dyn SignalNodeProvider,
        kind: NoiseType,
        len: usize,
        rng: &mut impl Rng,
    ) -> Self {
        Self::with_buffer(ctx, kind, noise_buffer(kind, len, &mut *rng))
    }

    /// Play an existing buffer, usually one from a [`NoiseBank`]
    pub fn with_buffer(ctx: &mut dyn SignalNodeProvider, kind: NoiseType, buffer: Arc<[f32]>) -> Self {
        Self {
            kind,
            buffer,
            output: ctx.create_gain(GAIN.default as f32),
            gain: GAIN.default,
        }
    }

    pub fn kind(&self) -> NoiseType {
        self.kind
    }

    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn set_gain(&mut self, ctx: &mut dyn SignalNodeProvider, gain: f64) -> bool {
        let Some(gain) = GAIN.accept("noise gain", gain) else {
            return false;
        };
        let now = ctx.current_time();
        match ctx.set_value_at(ParamRef::new(self.output, Param::Gain), gain as f32, now) {
            Ok(()) => {
                self.gain = gain;
                true
            }
            Err(err) => {
                log::warn!("noise gain: {err}");
                false
            }
        }
    }
}

impl RestartableGenerator for NoiseSource {
    fn init_nodes(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        group: &mut NodeGroup,
    ) -> Result<()> {
        let noise = group.track_endable(ctx.create_noise(Arc::clone(&self.buffer)));
        group.connect(ctx, noise, self.output)
    }

    fn output(&self) -> NodeId {
        self.output
    }

    fn dispose(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        ctx.dispose(self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::restartable::Restartable,
        io::offline::{NodeKind, OfflineProvider},
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn buffer(kind: NoiseType, seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut buffer = vec![0.0; 4096];
        kind.fill(&mut buffer, &mut rng);
        buffer
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }

    #[test]
    fn buffers_are_normalised() {
        for kind in NoiseType::ALL {
            let buffer = buffer(kind, 7);
            let peak = peak(&buffer);
            assert!(peak <= 1.0, "{kind:?} peak {peak}");
            assert!(peak > 0.99, "{kind:?} peak {peak}");
            assert!(buffer.iter().all(|s| s.is_finite()));
        }
    }

    #[test]
    fn same_seed_gives_same_buffer() {
        assert_eq!(buffer(NoiseType::Pink, 3), buffer(NoiseType::Pink, 3));
        assert_ne!(buffer(NoiseType::Pink, 3), buffer(NoiseType::Pink, 4));
    }

    #[test]
    fn brown_noise_moves_slower_than_white() {
        let mean_step = |b: &[f32]| {
            b.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f32>() / (b.len() - 1) as f32
        };
        let white = buffer(NoiseType::White, 11);
        let brown = buffer(NoiseType::Brown, 11);
        assert!(mean_step(&brown) < mean_step(&white) / 4.0);
    }

    #[test]
    fn empty_buffer_is_left_alone() {
        let mut empty: Vec<f32> = Vec::new();
        NoiseType::White.fill(&mut empty, &mut StdRng::seed_from_u64(0));
        assert!(empty.is_empty());

        let mut silent = vec![0.0f32; 8];
        normalize(&mut silent);
        assert!(silent.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn generations_share_one_buffer() {
        let mut ctx = OfflineProvider::new();
        let mut rng = StdRng::seed_from_u64(1);
        let noise = NoiseSource::with_rng(&mut ctx, NoiseType::White, 512, &mut rng);
        let mut source = Restartable::new(noise);

        source.start_source(&mut ctx, 0.0).unwrap();
        source.stop_source(&mut ctx, 0.0).unwrap();
        source.start_source(&mut ctx, 0.0).unwrap();

        let inputs = ctx.inputs_of(source.generator().output());
        assert_eq!(inputs.len(), 2);
        for node in inputs {
            assert_eq!(ctx.kind(node), Some(NodeKind::Noise));
            assert_eq!(ctx.noise_buffer_len(node), Some(512));
        }
    }

    #[test]
    fn bank_shares_buffers_between_sources() {
        let mut ctx = OfflineProvider::new();
        let bank = NoiseBank::with_rng(256, &mut StdRng::seed_from_u64(5));

        let a = NoiseSource::with_buffer(&mut ctx, NoiseType::Pink, bank.buffer(NoiseType::Pink));
        let b = NoiseSource::with_buffer(&mut ctx, NoiseType::Pink, bank.buffer(NoiseType::Pink));
        let white = bank.buffer(NoiseType::White);

        assert!(std::ptr::eq(a.buffer(), b.buffer()));
        assert_eq!(a.buffer().len(), 256);
        assert_ne!(&white[..], a.buffer());
    }

    #[test]
    fn gain_setter_validates() {
        let mut ctx = OfflineProvider::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut noise = NoiseSource::with_rng(&mut ctx, NoiseType::Brown, 16, &mut rng);

        assert!(noise.set_gain(&mut ctx, 0.5));
        assert!(!noise.set_gain(&mut ctx, 1.5));
        assert_eq!(noise.gain(), 0.5);
    }
}
