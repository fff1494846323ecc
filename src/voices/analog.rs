//! Analog voice - a classic subtractive synth voice.
//!
//! Two multi-shape oscillators and a noise source, mixed, filtered and shaped
//! by two envelopes. This is the voice the demo binary plays.
//!
//! # How It Works
//!
//! ```text
//!   osc 1 (tri/saw/pulse) ─┐
//!   osc 2 (tri/saw/pulse) ─┼─▶ [additive mixer] ─▶ [lowpass + filter ADSR]
//!   noise (white/pink/brown)┘                                 │
//!                                                             ▼
//!                                  [output gain] ◀── [amp gain ◀ voice ADSR]
//! ```
//!
//! 1. Both oscillators follow the played note, each with its own offset
//! 2. Noise is silent until its mixer level is raised
//! 3. The filter envelope sweeps the cutoff on every note
//! 4. The amp gain rests at 0; the voice ADSR is added onto it
//! 5. The output gain sets the overall voice level
//!
//! # Variations
//!
//! - Detune osc 2 by a few cents = thicker, chorused sound
//! - Osc 2 an octave down = heavier bass
//! - Negative filter envelope amount = closing, "wah" attacks
//!
//! Pools should be built with [`AnalogVoice::factory`], which hands every
//! voice the same noise buffers instead of filling three new ones per voice.

use crate::{
    error::{Result, SynthError},
    graph::{
        composite::GeneratorTree,
        filter::LowpassFilter,
        mix::{AdditiveMixer, ToggleMixer},
        node::{SignalSource, Startable},
        noise::{NoiseBank, NoiseSource, NoiseType},
        oscillator::TripleShapeOscillator,
        restartable::Restartable,
    },
    io::provider::{EndedNotice, NodeId, Param, ParamRef, SignalNodeProvider},
    note::Note,
    settings::{adsr::OFF_LEVEL, voice::GAIN},
    synth::{factory::VoiceFactory, poly::PolySynth, voice::VoiceGraph},
};

/// Generator kinds the analog voice is built from
#[derive(Debug)]
pub enum AnalogSource {
    Shape(Restartable<TripleShapeOscillator>),
    Noise(Restartable<NoiseSource>),
}

impl SignalSource for AnalogSource {
    fn output(&self) -> NodeId {
        match self {
            AnalogSource::Shape(osc) => osc.output(),
            AnalogSource::Noise(noise) => noise.output(),
        }
    }
}

impl Startable for AnalogSource {
    fn start_signal(&mut self, ctx: &mut dyn SignalNodeProvider, at: f64) -> Result<()> {
        match self {
            AnalogSource::Shape(osc) => osc.start_source(ctx, at),
            AnalogSource::Noise(noise) => noise.start_source(ctx, at),
        }
    }

    fn stop_signal(&mut self, ctx: &mut dyn SignalNodeProvider, at: f64) -> Result<()> {
        match self {
            AnalogSource::Shape(osc) => osc.stop_source(ctx, at),
            AnalogSource::Noise(noise) => noise.stop_source(ctx, at),
        }
    }

    fn recreate_internal_nodes(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        match self {
            AnalogSource::Shape(osc) => osc.recreate(ctx),
            AnalogSource::Noise(noise) => noise.recreate(ctx),
        }
    }

    fn handle_ended(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        notice: &EndedNotice,
    ) -> Result<bool> {
        match self {
            AnalogSource::Shape(osc) => osc.handle_ended(ctx, notice),
            AnalogSource::Noise(noise) => noise.handle_ended(ctx, notice),
        }
    }

    fn teardown(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        match self {
            AnalogSource::Shape(osc) => osc.teardown(ctx),
            AnalogSource::Noise(noise) => noise.teardown(ctx),
        }
    }
}

#[derive(Debug)]
pub struct AnalogVoice {
    tree: GeneratorTree<AnalogSource>,
    noise_mixer: ToggleMixer,
    mixer: AdditiveMixer,
    filter: LowpassFilter,
    amp: NodeId,
    output: NodeId,
    noise_type: NoiseType,
    gain: f64,
}

impl AnalogVoice {
    /// Mixer input (and tree child) of each source
    pub const OSC1: usize = 0;
    pub const OSC2: usize = 1;
    pub const NOISE: usize = 2;

    /// A voice with noise buffers of its own
    pub fn new(ctx: &mut dyn SignalNodeProvider) -> Result<Self> {
        Self::with_noise(ctx, &NoiseBank::new())
    }

    /// Voice factory whose voices all play from one shared [`NoiseBank`]
    pub fn factory() -> impl Fn(&mut dyn SignalNodeProvider) -> Result<AnalogVoice> + Send + Clone
    {
        let noise = NoiseBank::new();
        move |ctx: &mut dyn SignalNodeProvider| AnalogVoice::with_noise(ctx, &noise)
    }

    pub fn with_noise(ctx: &mut dyn SignalNodeProvider, noise: &NoiseBank) -> Result<Self> {
        let osc1 = Restartable::new(TripleShapeOscillator::new(ctx)?);
        let osc2 = Restartable::new(TripleShapeOscillator::new(ctx)?);
        let noises = NoiseType::ALL
            .into_iter()
            .map(|kind| {
                let source = NoiseSource::with_buffer(ctx, kind, noise.buffer(kind));
                GeneratorTree::leaf(AnalogSource::Noise(Restartable::new(source)))
            })
            .collect();
        let noise_mixer = ToggleMixer::new(ctx, NoiseType::ALL.len())?;
        let mixer = AdditiveMixer::new(ctx, 3)?;
        let filter = LowpassFilter::new(ctx)?;

        let tree = GeneratorTree::composite(
            mixer.output(),
            vec![
                GeneratorTree::leaf(AnalogSource::Shape(osc1)),
                GeneratorTree::leaf(AnalogSource::Shape(osc2)),
                GeneratorTree::composite(noise_mixer.output(), noises),
            ],
        );

        let mut voice = Self {
            tree,
            noise_mixer,
            mixer,
            filter,
            amp: ctx.create_gain(OFF_LEVEL),
            output: ctx.create_gain(GAIN.default as f32),
            noise_type: NoiseType::White,
            gain: GAIN.default,
        };
        if let Err(err) = voice.wire(ctx) {
            let cleanup = voice.tree.teardown(ctx).and(VoiceGraph::teardown(&mut voice, ctx));
            if let Err(cleanup) = cleanup {
                log::warn!("analog voice cleanup: {cleanup}");
            }
            return Err(err);
        }

        log::debug!("analog voice built: {} generators", voice.tree.leaf_count());
        Ok(voice)
    }

    fn wire(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        let missing = |node| SynthError::InvalidNodeState {
            node,
            reason: "mixer input or generator missing",
        };

        for index in [Self::OSC1, Self::OSC2] {
            let from = self.tree.leaf_at(&[index]).map(|source| source.output());
            let to = self.mixer.input(index);
            let (from, to) = from.zip(to).ok_or(missing(self.mixer.output()))?;
            ctx.connect(from, to.into())?;
        }
        for kind in NoiseType::ALL {
            let from = self
                .tree
                .leaf_at(&[Self::NOISE, kind.index()])
                .map(|source| source.output());
            let to = self.noise_mixer.input(kind.index());
            let (from, to) = from.zip(to).ok_or(missing(self.noise_mixer.output()))?;
            ctx.connect(from, to.into())?;
        }
        let noise_input = self
            .mixer
            .input(Self::NOISE)
            .ok_or(missing(self.mixer.output()))?;
        ctx.connect(self.noise_mixer.output(), noise_input.into())?;

        ctx.connect(self.mixer.output(), self.filter.input().into())?;
        ctx.connect(self.filter.output(), self.amp.into())?;
        ctx.connect(self.amp, self.output.into())?;

        // white noise selected, but silent until its level is raised
        if !self.noise_mixer.solo(ctx, self.noise_type.index()) {
            log::warn!("analog voice: could not select {:?} noise", self.noise_type);
        }
        if !self.mixer.set_input_gain(ctx, Self::NOISE, 0.0) {
            log::warn!("analog voice: could not mute noise");
        }
        Ok(())
    }

    /// `AnalogVoice::OSC1` or `AnalogVoice::OSC2`
    pub fn oscillator(&self, index: usize) -> Option<&TripleShapeOscillator> {
        match self.tree.leaf_at(&[index])? {
            AnalogSource::Shape(osc) => Some(osc.generator()),
            AnalogSource::Noise(_) => None,
        }
    }

    pub fn oscillator_mut(&mut self, index: usize) -> Option<&mut TripleShapeOscillator> {
        match self.tree.leaf_at_mut(&[index])? {
            AnalogSource::Shape(osc) => Some(osc.generator_mut()),
            AnalogSource::Noise(_) => None,
        }
    }

    pub fn noise(&self, kind: NoiseType) -> Option<&NoiseSource> {
        match self.tree.leaf_at(&[Self::NOISE, kind.index()])? {
            AnalogSource::Noise(noise) => Some(noise.generator()),
            AnalogSource::Shape(_) => None,
        }
    }

    pub fn filter(&self) -> &LowpassFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut LowpassFilter {
        &mut self.filter
    }

    pub fn mixer(&self) -> &AdditiveMixer {
        &self.mixer
    }

    pub fn noise_type(&self) -> NoiseType {
        self.noise_type
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Level of one mixer input: `OSC1`, `OSC2` or `NOISE`
    pub fn set_level(&mut self, ctx: &mut dyn SignalNodeProvider, input: usize, level: f64) -> bool {
        self.mixer.set_input_gain(ctx, input, level)
    }

    pub fn set_noise_type(&mut self, ctx: &mut dyn SignalNodeProvider, kind: NoiseType) -> bool {
        if self.noise_mixer.solo(ctx, kind.index()) {
            self.noise_type = kind;
            true
        } else {
            false
        }
    }

    pub fn set_gain(&mut self, ctx: &mut dyn SignalNodeProvider, gain: f64) -> bool {
        let Some(gain) = GAIN.accept("voice gain", gain) else {
            return false;
        };
        let now = ctx.current_time();
        match ctx.set_value_at(ParamRef::new(self.output, Param::Gain), gain as f32, now) {
            Ok(()) => {
                self.gain = gain;
                true
            }
            Err(err) => {
                log::warn!("voice gain: {err}");
                false
            }
        }
    }

    fn for_each_oscillator(
        &mut self,
        mut f: impl FnMut(&mut TripleShapeOscillator) -> bool,
    ) -> bool {
        let mut ok = true;
        for index in [Self::OSC1, Self::OSC2] {
            match self.oscillator_mut(index) {
                Some(osc) => ok &= f(osc),
                None => ok = false,
            }
        }
        ok
    }
}

impl VoiceGraph for AnalogVoice {
    type Leaf = AnalogSource;

    fn generators_mut(&mut self) -> &mut GeneratorTree<AnalogSource> {
        &mut self.tree
    }

    fn set_note(&mut self, ctx: &mut dyn SignalNodeProvider, note: Note) -> Result<()> {
        if !self.for_each_oscillator(|osc| osc.set_note(ctx, note)) {
            log::warn!("analog voice: retune to {note} incomplete");
        }
        Ok(())
    }

    fn on_attack(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        self.filter.trigger_attack(ctx)
    }

    fn on_release(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        self.filter.trigger_release(ctx)
    }

    fn output(&self) -> NodeId {
        self.output
    }

    fn envelope_target(&self) -> ParamRef {
        ParamRef::new(self.amp, Param::Gain)
    }

    fn copy_settings(&mut self, ctx: &mut dyn SignalNodeProvider, template: &Self) -> bool {
        let mut ok = self.filter.copy_settings(ctx, &template.filter);
        ok &= self.set_noise_type(ctx, template.noise_type);
        ok &= self.set_gain(ctx, template.gain);
        for input in [Self::OSC1, Self::OSC2, Self::NOISE] {
            ok &= template
                .mixer
                .input_gain(input)
                .is_some_and(|level| self.set_level(ctx, input, level));
        }
        for index in [Self::OSC1, Self::OSC2] {
            ok &= match (self.oscillator_mut(index), template.oscillator(index)) {
                (Some(osc), Some(other)) => osc.copy_settings(ctx, other),
                _ => false,
            };
        }
        ok
    }

    fn teardown(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        let noise_mixer = self.noise_mixer.dispose(ctx);
        let mixer = self.mixer.dispose(ctx);
        let filter = self.filter.dispose(ctx);
        let amp = ctx.dispose(self.amp);
        let output = ctx.dispose(self.output);
        noise_mixer.and(mixer).and(filter).and(amp).and(output)
    }
}

/// Patch-wide setters for a pool of analog voices. Each one is applied to
/// every voice and returns `true` only if every voice accepted it.
impl<F, P> PolySynth<F, P>
where
    F: VoiceFactory<Graph = AnalogVoice>,
    P: SignalNodeProvider,
{
    pub fn set_cutoff_frequency(&mut self, hz: f64) -> bool {
        self.update_graphs(|voice, ctx| voice.filter_mut().set_cutoff_frequency(ctx, hz))
    }

    pub fn set_resonance(&mut self, q: f64) -> bool {
        self.update_graphs(|voice, ctx| voice.filter_mut().set_resonance(ctx, q))
    }

    pub fn set_filter_envelope_amount(&mut self, cents: f64) -> bool {
        self.update_graphs(|voice, ctx| voice.filter_mut().set_envelope_amount(ctx, cents))
    }

    pub fn set_filter_attack_duration(&mut self, seconds: f64) -> bool {
        self.update_graphs(|voice, _| voice.filter_mut().envelope_mut().set_attack_duration(seconds))
    }

    pub fn set_filter_decay_duration(&mut self, seconds: f64) -> bool {
        self.update_graphs(|voice, _| voice.filter_mut().envelope_mut().set_decay_duration(seconds))
    }

    pub fn set_filter_sustain_level(&mut self, level: f64) -> bool {
        self.update_graphs(|voice, _| voice.filter_mut().envelope_mut().set_sustain_level(level))
    }

    pub fn set_filter_release_duration(&mut self, seconds: f64) -> bool {
        self.update_graphs(|voice, _| {
            voice.filter_mut().envelope_mut().set_release_duration(seconds)
        })
    }

    pub fn set_noise_type(&mut self, kind: NoiseType) -> bool {
        self.update_graphs(|voice, ctx| voice.set_noise_type(ctx, kind))
    }

    pub fn set_voice_gain(&mut self, gain: f64) -> bool {
        self.update_graphs(|voice, ctx| voice.set_gain(ctx, gain))
    }

    /// `AnalogVoice::OSC1`, `OSC2` or `NOISE`
    pub fn set_source_level(&mut self, input: usize, level: f64) -> bool {
        self.update_graphs(|voice, ctx| voice.set_level(ctx, input, level))
    }

    pub fn set_shape_enabled(&mut self, osc: usize, shape: usize, enabled: bool) -> bool {
        self.update_graphs(|voice, ctx| {
            voice
                .oscillator_mut(osc)
                .is_some_and(|o| o.set_shape_enabled(ctx, shape, enabled))
        })
    }

    pub fn set_pulse_width(&mut self, osc: usize, width: f64) -> bool {
        self.update_graphs(|voice, ctx| {
            voice
                .oscillator_mut(osc)
                .is_some_and(|o| o.set_pulse_width(ctx, width))
        })
    }

    pub fn set_octaves_offset(&mut self, osc: usize, octaves: i32) -> bool {
        self.update_graphs(|voice, ctx| {
            voice
                .oscillator_mut(osc)
                .is_some_and(|o| o.set_octaves_offset(ctx, octaves))
        })
    }

    pub fn set_semitones_offset(&mut self, osc: usize, semitones: i32) -> bool {
        self.update_graphs(|voice, ctx| {
            voice
                .oscillator_mut(osc)
                .is_some_and(|o| o.set_semitones_offset(ctx, semitones))
        })
    }

    pub fn set_cents_offset(&mut self, osc: usize, cents: f32) -> bool {
        self.update_graphs(|voice, ctx| {
            voice
                .oscillator_mut(osc)
                .is_some_and(|o| o.set_cents_offset(ctx, cents))
        })
    }
}
