use crate::{
    error::Result,
    graph::{
        composite::GeneratorTree,
        envelope::EnvelopeGenerator,
        node::{SignalSource, Startable},
    },
    io::provider::{EndedNotice, NodeId, ParamRef, SignalNodeProvider},
    note::Note,
    settings::AdsrParams,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,           // Available for allocation
    InAttackPhase,  // Sounding: attack, decay or sustain
    InReleasePhase, // Key released, envelope ramping to silence
}

/// The patch a [`SynthVoice`] plays: a tree of restartable generators plus
/// whatever static stages sit between the tree and the voice output.
///
/// The voice owns the amplitude envelope and connects it to
/// [`envelope_target`](VoiceGraph::envelope_target); the graph only has to
/// expose a parameter for it.
pub trait VoiceGraph {
    type Leaf: Startable;

    fn generators_mut(&mut self) -> &mut GeneratorTree<Self::Leaf>;

    /// Retune every generator. Called before the new generation is built.
    fn set_note(&mut self, ctx: &mut dyn SignalNodeProvider, note: Note) -> Result<()>;

    /// Extra work on attack, e.g. a filter envelope
    fn on_attack(&mut self, _ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        Ok(())
    }

    fn on_release(&mut self, _ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        Ok(())
    }

    fn output(&self) -> NodeId;

    /// Parameter the amplitude envelope is added to. Should rest at 0.
    fn envelope_target(&self) -> ParamRef;

    /// Take over `template`'s patch settings (not its note). Called on every
    /// voice of a rebuilt pool; `false` if any setting was refused.
    fn copy_settings(&mut self, _ctx: &mut dyn SignalNodeProvider, _template: &Self) -> bool {
        true
    }

    /// Dispose of the static stages. The generator tree is torn down separately.
    fn teardown(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()>;
}

/// One monophonic voice: a patch, its amplitude envelope and a small state
/// machine.
///
/// Leaving the release phase is detected lazily by
/// [`check_and_update_state`](Self::check_and_update_state); there is no timer.
#[derive(Debug)]
pub struct SynthVoice<G> {
    graph: G,
    envelope: EnvelopeGenerator,
    state: VoiceState,
    note: Option<Note>,
    attack_trigger_time: Option<f64>,
    release_finish_time: Option<f64>,
}

impl<G: VoiceGraph> SynthVoice<G> {
    /// Takes ownership of `graph`; on failure its nodes are disposed too.
    pub fn new(ctx: &mut dyn SignalNodeProvider, graph: G, amp: AdsrParams) -> Result<Self> {
        let mut voice = Self {
            graph,
            envelope: EnvelopeGenerator::new(ctx, amp)?,
            state: VoiceState::Free,
            note: None,
            attack_trigger_time: None,
            release_finish_time: None,
        };

        let target = voice.graph.envelope_target();
        if let Err(err) = ctx.connect(voice.envelope.output(), target.into()) {
            if let Err(cleanup) = voice.teardown(ctx) {
                log::warn!("voice cleanup: {cleanup}");
            }
            return Err(err);
        }
        Ok(voice)
    }

    /// Start `note` now. Legal in every state: a sounding voice is restarted
    /// without passing through `Free`.
    pub fn trigger_attack(&mut self, ctx: &mut dyn SignalNodeProvider, note: Note) -> Result<()> {
        let now = ctx.current_time();
        log::debug!("voice attack {note} at {now} (was {:?})", self.state);

        self.state = VoiceState::InAttackPhase;
        self.note = Some(note);
        self.attack_trigger_time = Some(now);
        self.release_finish_time = None;

        self.graph.set_note(ctx, note)?;
        let tree = self.graph.generators_mut();
        tree.recreate_internal_nodes(ctx)?;
        tree.start_signal(ctx, now)?;
        self.envelope.trigger_attack(ctx)?;
        self.graph.on_attack(ctx)
    }

    /// Release the held note. Generators are scheduled to stop when the
    /// envelope reaches silence. Anything but an attacking voice is left alone.
    pub fn trigger_release(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        if self.state != VoiceState::InAttackPhase {
            log::debug!("voice release ignored in {:?}", self.state);
            return Ok(());
        }

        let now = ctx.current_time();
        let finish = now + self.envelope.estimated_release_duration();
        log::debug!("voice release {:?} at {now}, silent at {finish}", self.note);

        self.state = VoiceState::InReleasePhase;
        self.release_finish_time = Some(finish);

        self.envelope.trigger_release(ctx)?;
        self.graph.generators_mut().stop_signal(ctx, finish)?;
        self.graph.on_release(ctx)
    }

    /// Reap the voice if its release has finished by `now`, then report its state.
    pub fn check_and_update_state(&mut self, now: f64) -> VoiceState {
        if self.state == VoiceState::InReleasePhase
            && self.release_finish_time.is_some_and(|finish| now > finish)
        {
            log::trace!("voice free at {now}");
            self.state = VoiceState::Free;
            self.note = None;
            self.attack_trigger_time = None;
            self.release_finish_time = None;
        }
        self.state
    }

    pub fn handle_ended(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        notice: &EndedNotice,
    ) -> Result<bool> {
        self.graph.generators_mut().handle_ended(ctx, notice)
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn note(&self) -> Option<Note> {
        self.note
    }

    /// Structural match on the held note
    pub fn holds(&self, note: Note) -> bool {
        self.note == Some(note)
    }

    pub fn attack_trigger_time(&self) -> Option<f64> {
        self.attack_trigger_time
    }

    pub fn release_finish_time(&self) -> Option<f64> {
        self.release_finish_time
    }

    pub fn envelope(&self) -> &EnvelopeGenerator {
        &self.envelope
    }

    pub fn envelope_mut(&mut self) -> &mut EnvelopeGenerator {
        &mut self.envelope
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    pub fn output(&self) -> NodeId {
        self.graph.output()
    }

    /// Dispose of everything immediately, sounding or not.
    pub fn teardown(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        let tree = self.graph.generators_mut().teardown(ctx);
        let envelope = self.envelope.dispose(ctx);
        let graph = self.graph.teardown(ctx);
        self.state = VoiceState::Free;
        self.note = None;
        tree.and(envelope).and(graph)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        graph::restartable::{
            tests::{deliver, TestSource},
            Restartable,
        },
        io::{offline::OfflineProvider, provider::Param},
    };

    /// One test source into a gain whose level the envelope drives.
    pub(crate) struct TestGraph {
        tree: GeneratorTree<Restartable<TestSource>>,
        amp: NodeId,
        pub(crate) notes: Vec<Note>,
    }

    impl TestGraph {
        pub(crate) fn new(ctx: &mut dyn SignalNodeProvider) -> Result<Self> {
            let source = Restartable::new(TestSource::new(ctx, 1));
            let amp = ctx.create_gain(0.0);
            ctx.connect(source.output(), amp.into())?;
            Ok(Self {
                tree: GeneratorTree::leaf(source),
                amp,
                notes: Vec::new(),
            })
        }
    }

    impl VoiceGraph for TestGraph {
        type Leaf = Restartable<TestSource>;

        fn generators_mut(&mut self) -> &mut GeneratorTree<Self::Leaf> {
            &mut self.tree
        }

        fn set_note(&mut self, _ctx: &mut dyn SignalNodeProvider, note: Note) -> Result<()> {
            self.notes.push(note);
            Ok(())
        }

        fn output(&self) -> NodeId {
            self.amp
        }

        fn envelope_target(&self) -> ParamRef {
            ParamRef::new(self.amp, Param::Gain)
        }

        fn teardown(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
            ctx.dispose(self.amp)
        }
    }

    fn voice(ctx: &mut OfflineProvider) -> SynthVoice<TestGraph> {
        let graph = TestGraph::new(ctx).unwrap();
        SynthVoice::new(ctx, graph, AdsrParams::new(0.01, 0.3, 0.5, 1.0)).unwrap()
    }

    fn e4() -> Note {
        Note::natural(4, 4).unwrap()
    }

    #[test]
    fn attack_then_release_walks_the_states() {
        let mut ctx = OfflineProvider::new();
        let mut voice = voice(&mut ctx);
        assert!(voice.is_free());

        voice.trigger_attack(&mut ctx, e4()).unwrap();
        assert_eq!(voice.state(), VoiceState::InAttackPhase);
        assert_eq!(voice.note(), Some(e4()));
        assert_eq!(voice.attack_trigger_time(), Some(0.0));
        assert_eq!(voice.graph().notes, vec![e4()]);

        ctx.advance_to(0.5);
        voice.trigger_release(&mut ctx).unwrap();
        assert_eq!(voice.release_finish_time(), Some(1.5));

        for t in [0.6, 1.0, 1.5] {
            assert_eq!(voice.check_and_update_state(t), VoiceState::InReleasePhase);
        }
        assert_eq!(voice.check_and_update_state(1.51), VoiceState::Free);
        assert_eq!(voice.note(), None);
        assert_eq!(voice.attack_trigger_time(), None);
        assert_eq!(voice.release_finish_time(), None);
    }

    #[test]
    fn release_finish_time_ignores_sustain_length() {
        for held in [0.4, 2.0, 7.5] {
            let mut ctx = OfflineProvider::new();
            let mut voice = voice(&mut ctx);
            voice.trigger_attack(&mut ctx, e4()).unwrap();
            ctx.advance_to(held);
            voice.trigger_release(&mut ctx).unwrap();
            assert_eq!(voice.release_finish_time(), Some(held + 1.0));
            assert_eq!(voice.envelope().finish_time(), held + 1.0);
        }
    }

    #[test]
    fn release_on_free_or_releasing_voice_is_ignored() {
        let mut ctx = OfflineProvider::new();
        let mut voice = voice(&mut ctx);

        voice.trigger_release(&mut ctx).unwrap();
        assert!(voice.is_free());

        voice.trigger_attack(&mut ctx, e4()).unwrap();
        ctx.advance_to(0.5);
        voice.trigger_release(&mut ctx).unwrap();
        ctx.advance_to(0.7);
        voice.trigger_release(&mut ctx).unwrap();
        assert_eq!(voice.release_finish_time(), Some(1.5));
    }

    #[test]
    fn generators_stop_when_envelope_is_silent() {
        let mut ctx = OfflineProvider::new();
        let mut voice = voice(&mut ctx);
        voice.trigger_attack(&mut ctx, e4()).unwrap();
        ctx.advance_to(0.5);
        voice.trigger_release(&mut ctx).unwrap();

        let source = voice.graph().tree.leaf_at(&[]).map(|l| l.output()).unwrap();
        ctx.advance_to(1.4);
        deliver(&mut ctx, voice.graph_mut().generators_mut());
        assert_eq!(ctx.inputs_of(source).len(), 1);

        ctx.advance_to(1.5);
        deliver(&mut ctx, voice.graph_mut().generators_mut());
        assert!(ctx.inputs_of(source).is_empty());
    }

    #[test]
    fn retrigger_during_release_cuts_old_generation() {
        let mut ctx = OfflineProvider::new();
        let mut voice = voice(&mut ctx);
        voice.trigger_attack(&mut ctx, e4()).unwrap();
        ctx.advance_to(0.5);
        voice.trigger_release(&mut ctx).unwrap();

        ctx.advance_to(0.8);
        let level = voice.envelope().level_at(&ctx, 0.8).unwrap();
        let g4 = Note::natural(4, 7).unwrap();
        voice.trigger_attack(&mut ctx, g4).unwrap();

        assert_eq!(voice.state(), VoiceState::InAttackPhase);
        assert_eq!(voice.release_finish_time(), None);
        // no jump back to zero
        assert!((voice.envelope().level_at(&ctx, 0.8).unwrap() - level).abs() < 1e-6);

        ctx.advance_to(0.9);
        deliver(&mut ctx, voice.graph_mut().generators_mut());
        let source = voice.graph().tree.leaf_at(&[]).map(|l| l.output()).unwrap();
        assert_eq!(ctx.inputs_of(source).len(), 1);
        assert!(ctx.is_playing(ctx.inputs_of(source)[0], 0.9));
    }

    #[test]
    fn envelope_drives_the_target_parameter() {
        let mut ctx = OfflineProvider::new();
        let voice = voice(&mut ctx);
        let target = voice.graph().envelope_target();
        assert!(ctx.is_connected(voice.envelope().output(), target));
    }

    #[test]
    fn teardown_disposes_every_node() {
        let mut ctx = OfflineProvider::new();
        let mut voice = voice(&mut ctx);
        voice.trigger_attack(&mut ctx, e4()).unwrap();

        voice.teardown(&mut ctx).unwrap();
        assert_eq!(ctx.node_count(), 0);
        assert_eq!(ctx.link_count(), 0);
    }
}
