use crate::{
    error::{Result, SynthError},
    io::{
        offline::OfflineProvider,
        provider::{NodeId, SignalNodeProvider},
    },
    note::Note,
    settings::{voice, AdsrParams, SynthConfig},
    synth::{
        factory::VoiceFactory,
        message::{MessageReceiver, SynthMessage},
        voice::{SynthVoice, VoiceGraph, VoiceState},
    },
};

/*
Voice Allocation
================

triggerAttack(note)
  1. Reap: every voice whose release has finished becomes Free.
  2. A voice already holding `note` is re-triggered in place (legato).
  3. Otherwise the first Free voice in pool order.
  4. Otherwise steal: the voice with the oldest attack time, ties going to the
     lower pool index. The stolen voice is released and immediately attacked
     with the new note; there is no cross-fade.

The allocation table maps held notes to voice indices in attack order. A
note stays in the table through its release, until the voice is reaped or
stolen, so releasing twice finds the same voice and the second call is a
no-op.

Every decision depends only on pool order and attack times, so the same
events at the same times always land on the same voices.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Allocation {
    Retrigger(usize),
    Free(usize),
    Steal(usize),
}

impl Allocation {
    fn index(self) -> usize {
        match self {
            Allocation::Retrigger(index) | Allocation::Free(index) | Allocation::Steal(index) => {
                index
            }
        }
    }
}

/// Fixed-size pool of [`SynthVoice`]s built by a [`VoiceFactory`].
///
/// The synth owns its signal node provider; every voice output is summed into
/// one persistent output gain, see [`output_node`](Self::output_node).
pub struct PolySynth<F: VoiceFactory, P> {
    ctx: P,
    factory: F,
    voices: Vec<SynthVoice<F::Graph>>,
    table: Vec<(Note, usize)>,
    output: NodeId,
    amp: AdsrParams,
}

impl<F: VoiceFactory, P: SignalNodeProvider> PolySynth<F, P> {
    pub fn new(ctx: P, factory: F) -> Result<Self> {
        Self::with_config(ctx, factory, SynthConfig::default())
    }

    pub fn with_config(mut ctx: P, factory: F, config: SynthConfig) -> Result<Self> {
        config.validate()?;

        let output = ctx.create_gain(1.0);
        let mut synth = Self {
            ctx,
            factory,
            voices: Vec::with_capacity(config.voice_count),
            table: Vec::new(),
            output,
            amp: config.amp_envelope,
        };
        synth.build_voices(config.voice_count)?;
        log::info!("poly synth ready with {} voices", synth.voices.len());
        Ok(synth)
    }

    pub fn trigger_attack(&mut self, note: Note) {
        self.reap();

        let Some(allocation) = self.allocate(note) else {
            self.report_no_voice(note);
            return;
        };
        let index = allocation.index();
        let Some(voice) = self.voices.get_mut(index) else {
            self.report_no_voice(note);
            return;
        };
        let ctx: &mut dyn SignalNodeProvider = &mut self.ctx;

        match allocation {
            Allocation::Retrigger(_) => log::debug!("retrigger voice {index} for {note}"),
            Allocation::Free(_) => log::debug!("voice {index} takes {note}"),
            Allocation::Steal(_) => {
                log::debug!("steal voice {index} from {:?} for {note}", voice.note());
                if let Err(err) = voice.trigger_release(ctx) {
                    log::warn!("voice {index}: release before steal: {err}");
                }
            }
        }
        if let Err(err) = voice.trigger_attack(ctx, note) {
            log::warn!("voice {index}: attack {note}: {err}");
        }

        self.table.retain(|&(_, i)| i != index);
        self.table.push((note, index));
    }

    pub fn trigger_release(&mut self, note: Note) {
        self.reap();

        let Some(index) = self.voice_for(note) else {
            log::debug!("release {note}: unmatched");
            return;
        };
        if !self.voices.get(index).is_some_and(|v| v.holds(note)) {
            self.table.retain(|&(n, _)| n != note);
            self.report_no_voice(note);
            return;
        }
        let voice = &mut self.voices[index];

        match voice.state() {
            VoiceState::InAttackPhase => {
                if let Err(err) = voice.trigger_release(&mut self.ctx) {
                    log::warn!("voice {index}: release {note}: {err}");
                }
            }
            state => log::debug!("release {note}: voice {index} already {state:?}"),
        }
    }

    /// Release every sounding voice
    pub fn release_all(&mut self) {
        let ctx: &mut dyn SignalNodeProvider = &mut self.ctx;
        for (index, voice) in self.voices.iter_mut().enumerate() {
            if let Err(err) = voice.trigger_release(ctx) {
                log::warn!("voice {index}: release all: {err}");
            }
        }
    }

    /// Replace the pool with `count` fresh voices. Sounding notes are cut;
    /// the patch settings of the old voices carry over to the new ones.
    ///
    /// If a new voice cannot be built the old pool is kept as it was.
    pub fn set_voice_count(&mut self, count: usize) -> bool {
        if voice::COUNT.accept("voice count", count as f64).is_none() {
            return false;
        }

        let mut fresh = Vec::with_capacity(count);
        for _ in 0..count {
            match self.create_voice() {
                Ok(voice) => fresh.push(voice),
                Err(err) => {
                    log::error!("voice pool rebuild: {err}");
                    let ctx: &mut dyn SignalNodeProvider = &mut self.ctx;
                    for mut voice in fresh {
                        if let Err(cleanup) = voice.teardown(ctx) {
                            log::warn!("voice cleanup: {cleanup}");
                        }
                    }
                    return false;
                }
            }
        }

        let mut copied = true;
        if let Some(template) = self.voices.first() {
            for voice in &mut fresh {
                copied &= voice.graph_mut().copy_settings(&mut self.ctx, template.graph());
            }
        }
        if !copied {
            log::warn!("voice pool rebuild: some patch settings were not carried over");
        }

        log::info!(
            "rebuilding pool: {} -> {count} voices, {} notes dropped",
            self.voices.len(),
            self.table.len()
        );
        self.discard_voices();
        self.voices = fresh;
        true
    }

    /// Dispatch every pending control message. Returns how many were handled.
    pub fn process_messages<R: MessageReceiver + ?Sized>(&mut self, rx: &mut R) -> usize {
        let mut handled = 0;
        while let Some(msg) = rx.pop() {
            match msg {
                SynthMessage::NoteOn { note } => self.trigger_attack(note),
                SynthMessage::NoteOff { note } => self.trigger_release(note),
                SynthMessage::AllNotesOff => self.release_all(),
                SynthMessage::SetVoiceCount { count } => {
                    self.set_voice_count(count);
                }
            }
            handled += 1;
        }
        handled
    }

    /// Route the provider's ended notices to the generators that scheduled
    /// them. Returns the number of notices taken.
    pub fn poll_notifications(&mut self) -> usize {
        let notices = self.ctx.take_ended();
        for notice in &notices {
            let mut claimed = false;
            for voice in &mut self.voices {
                match voice.handle_ended(&mut self.ctx, notice) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(err) => log::warn!("ended notice for {}: {err}", notice.node),
                }
                claimed = true;
                break;
            }
            if !claimed {
                log::trace!("ended notice for {} has no owner", notice.node);
            }
        }
        notices.len()
    }

    /// Apply a patch-specific change to every voice graph.
    /// All voices are visited; `true` only if every call succeeded.
    pub fn update_graphs(
        &mut self,
        mut f: impl FnMut(&mut F::Graph, &mut dyn SignalNodeProvider) -> bool,
    ) -> bool {
        let mut ok = true;
        for voice in &mut self.voices {
            ok &= f(voice.graph_mut(), &mut self.ctx);
        }
        ok
    }

    pub fn amp_envelope(&self) -> AdsrParams {
        self.amp
    }

    pub fn set_amp_envelope(&mut self, params: AdsrParams) -> bool {
        if let Err(err) = params.validate() {
            log::warn!("amp envelope: {err}");
            return false;
        }
        for voice in &mut self.voices {
            voice.envelope_mut().set_params(params);
        }
        self.amp = params;
        true
    }

    pub fn set_attack_duration(&mut self, seconds: f64) -> bool {
        self.set_amp_envelope(AdsrParams {
            attack: seconds,
            ..self.amp
        })
    }

    pub fn set_decay_duration(&mut self, seconds: f64) -> bool {
        self.set_amp_envelope(AdsrParams {
            decay: seconds,
            ..self.amp
        })
    }

    pub fn set_sustain_level(&mut self, level: f64) -> bool {
        self.set_amp_envelope(AdsrParams {
            sustain: level,
            ..self.amp
        })
    }

    pub fn set_release_duration(&mut self, seconds: f64) -> bool {
        self.set_amp_envelope(AdsrParams {
            release: seconds,
            ..self.amp
        })
    }

    /// Connectable handle carrying the sum of all voices
    pub fn output_node(&self) -> NodeId {
        self.output
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// State of every voice in pool order, after reaping finished releases.
    pub fn voice_states(&mut self) -> Vec<VoiceState> {
        self.reap();
        self.voices.iter().map(|v| v.state()).collect()
    }

    pub fn voices(&self) -> &[SynthVoice<F::Graph>] {
        &self.voices
    }

    /// Index of the voice holding `note`, if any
    pub fn voice_for(&self, note: Note) -> Option<usize> {
        self.table
            .iter()
            .find(|&&(held, _)| held == note)
            .map(|&(_, index)| index)
    }

    /// Held notes and their voices, oldest attack first
    pub fn allocation_table(&self) -> &[(Note, usize)] {
        &self.table
    }

    pub fn provider(&self) -> &P {
        &self.ctx
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.ctx
    }

    fn allocate(&self, note: Note) -> Option<Allocation> {
        if let Some(index) = self.voices.iter().position(|v| v.holds(note)) {
            return Some(Allocation::Retrigger(index));
        }
        if let Some(index) = self.voices.iter().position(|v| v.is_free()) {
            return Some(Allocation::Free(index));
        }
        // min_by keeps the first of equal elements, so ties go to pool order
        self.voices
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let a = a.attack_trigger_time().unwrap_or(f64::NEG_INFINITY);
                let b = b.attack_trigger_time().unwrap_or(f64::NEG_INFINITY);
                a.total_cmp(&b)
            })
            .map(|(index, _)| Allocation::Steal(index))
    }

    fn reap(&mut self) {
        let now = self.ctx.current_time();
        for (index, voice) in self.voices.iter_mut().enumerate() {
            if voice.state() == VoiceState::InReleasePhase
                && voice.check_and_update_state(now) == VoiceState::Free
            {
                self.table.retain(|&(_, i)| i != index);
            }
        }
    }

    fn report_no_voice(&self, note: Note) {
        let err = SynthError::NoVoiceAvailable { note };
        log::error!("{err} ({} voices)", self.voices.len());
        debug_assert!(false, "{err}");
    }

    fn build_voices(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            let voice = self.create_voice()?;
            self.voices.push(voice);
        }
        Ok(())
    }

    fn create_voice(&mut self) -> Result<SynthVoice<F::Graph>> {
        let ctx: &mut dyn SignalNodeProvider = &mut self.ctx;
        let graph = self.factory.create_graph(ctx)?;
        let mut voice = SynthVoice::new(ctx, graph, self.amp)?;
        if let Err(err) = ctx.connect(voice.output(), self.output.into()) {
            if let Err(cleanup) = voice.teardown(ctx) {
                log::warn!("voice cleanup: {cleanup}");
            }
            return Err(err);
        }
        Ok(voice)
    }

    fn discard_voices(&mut self) {
        self.table.clear();
        let ctx: &mut dyn SignalNodeProvider = &mut self.ctx;
        for (index, mut voice) in self.voices.drain(..).enumerate() {
            if let Err(err) = voice.teardown(ctx) {
                log::warn!("voice {index}: teardown: {err}");
            }
        }
    }
}

impl<F: VoiceFactory> PolySynth<F, OfflineProvider> {
    /// Move the offline clock and deliver the ended notices that fall due.
    pub fn advance_to(&mut self, time: f64) {
        self.ctx.advance_to(time);
        self.poll_notifications();
    }

    pub fn advance_by(&mut self, seconds: f64) {
        self.ctx.advance_by(seconds);
        self.poll_notifications();
    }
}
