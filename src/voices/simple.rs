//! Simple voice - one oscillator, nothing else.
//!
//! The smallest useful patch, handy for tests and as a template for your own.
//!
//! # How It Works
//!
//! 1. A single restartable oscillator (pulse unless told otherwise)
//! 2. Straight into the amp gain, which rests at 0
//! 3. The voice's ADSR envelope is added onto the amp gain

use crate::{
    error::Result,
    graph::{
        composite::GeneratorTree, node::SignalSource, oscillator::ShapeOscillator,
        restartable::Restartable,
    },
    io::provider::{NodeId, Param, ParamRef, SignalNodeProvider, Waveform},
    note::Note,
    settings::adsr::OFF_LEVEL,
    synth::voice::VoiceGraph,
};

#[derive(Debug)]
pub struct SimpleVoice {
    tree: GeneratorTree<Restartable<ShapeOscillator>>,
    amp: NodeId,
}

impl SimpleVoice {
    pub fn new(ctx: &mut dyn SignalNodeProvider) -> Result<Self> {
        Self::with_shape(ctx, Waveform::Pulse)
    }

    pub fn with_shape(ctx: &mut dyn SignalNodeProvider, shape: Waveform) -> Result<Self> {
        let mut osc = Restartable::new(ShapeOscillator::new(ctx, shape));
        let amp = ctx.create_gain(OFF_LEVEL);
        if let Err(err) = ctx.connect(osc.output(), amp.into()) {
            let cleanup = osc.teardown(ctx).and(ctx.dispose(amp));
            if let Err(cleanup) = cleanup {
                log::warn!("simple voice cleanup: {cleanup}");
            }
            return Err(err);
        }
        Ok(Self {
            tree: GeneratorTree::leaf(osc),
            amp,
        })
    }

    pub fn oscillator(&self) -> Option<&ShapeOscillator> {
        self.tree.leaf_at(&[]).map(|osc| osc.generator())
    }

    pub fn oscillator_mut(&mut self) -> Option<&mut ShapeOscillator> {
        self.tree.leaf_at_mut(&[]).map(|osc| osc.generator_mut())
    }
}

impl VoiceGraph for SimpleVoice {
    type Leaf = Restartable<ShapeOscillator>;

    fn generators_mut(&mut self) -> &mut GeneratorTree<Self::Leaf> {
        &mut self.tree
    }

    fn set_note(&mut self, ctx: &mut dyn SignalNodeProvider, note: Note) -> Result<()> {
        if let Some(osc) = self.oscillator_mut() {
            osc.set_note(ctx, note);
        }
        Ok(())
    }

    fn output(&self) -> NodeId {
        self.amp
    }

    fn envelope_target(&self) -> ParamRef {
        ParamRef::new(self.amp, Param::Gain)
    }

    fn copy_settings(&mut self, ctx: &mut dyn SignalNodeProvider, template: &Self) -> bool {
        match (self.oscillator_mut(), template.oscillator()) {
            (Some(osc), Some(from)) => osc.copy_settings(ctx, from),
            _ => false,
        }
    }

    fn teardown(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        ctx.dispose(self.amp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{node::Startable, restartable::RestartableGenerator},
        io::offline::{NodeKind, OfflineProvider},
        settings::AdsrParams,
        synth::voice::SynthVoice,
    };

    #[test]
    fn attack_plays_a_tuned_pulse() {
        let mut ctx = OfflineProvider::new();
        let graph = SimpleVoice::new(&mut ctx).unwrap();
        let mut voice = SynthVoice::new(&mut ctx, graph, AdsrParams::voice()).unwrap();

        let a4 = Note::from_midi(69).unwrap();
        voice.trigger_attack(&mut ctx, a4).unwrap();

        let osc = voice.graph().oscillator().and_then(|o| o.live_node()).unwrap();
        assert_eq!(ctx.kind(osc), Some(NodeKind::Oscillator(Waveform::Pulse)));
        assert_eq!(
            ctx.param_value(ParamRef::new(osc, Param::Frequency), 0.0),
            Some(440.0)
        );
        assert!(ctx.is_playing(osc, 0.0));
    }

    #[test]
    fn settings_copy_onto_a_fresh_voice() {
        let mut ctx = OfflineProvider::new();
        let mut template = SimpleVoice::new(&mut ctx).unwrap();
        let osc = template.oscillator_mut().unwrap();
        assert!(osc.set_semitones_offset(&mut ctx, 7));
        assert!(osc.set_pulse_width(&mut ctx, 0.25));
        assert!(osc.set_gain(&mut ctx, 0.3));

        let mut fresh = SimpleVoice::new(&mut ctx).unwrap();
        assert!(fresh.copy_settings(&mut ctx, &template));

        let osc = fresh.oscillator().unwrap();
        assert_eq!(osc.tuning().offset().semitones, 7);
        assert_eq!(osc.pulse_width(), 0.25);
        assert_eq!(osc.gain(), 0.3);
        assert_eq!(
            ctx.param_value(ParamRef::new(osc.output(), Param::Gain), 0.0),
            Some(0.3)
        );
    }

    #[test]
    fn shape_can_be_chosen() {
        let mut ctx = OfflineProvider::new();
        let mut graph = SimpleVoice::with_shape(&mut ctx, Waveform::Sawtooth).unwrap();
        assert_eq!(
            graph.oscillator().map(|o| o.shape()),
            Some(Waveform::Sawtooth)
        );

        graph.generators_mut().teardown(&mut ctx).unwrap();
        graph.teardown(&mut ctx).unwrap();
        assert_eq!(ctx.node_count(), 0);
    }
}
