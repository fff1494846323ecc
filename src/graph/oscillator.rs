use crate::{
    error::Result,
    graph::{
        mix::ToggleMixer,
        node::{NodeGroup, SignalSource},
        restartable::RestartableGenerator,
    },
    io::provider::{NodeId, Param, ParamRef, SignalNodeProvider, Waveform},
    note::{Note, NoteOffset},
    settings::oscillator::{CENTS_OFFSET, GAIN, OCTAVES_OFFSET, PULSE_WIDTH, SEMITONES_OFFSET},
};

/// The note an oscillator plays plus its coarse/fine transposition.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tuning {
    note: Option<Note>,
    offset: NoteOffset,
}

impl Tuning {
    pub fn note(&self) -> Option<Note> {
        self.note
    }

    pub fn offset(&self) -> NoteOffset {
        self.offset
    }

    /// `None` until a note has been set
    pub fn frequency(&self) -> Option<f64> {
        self.note.map(|note| note.frequency_with_offset(&self.offset))
    }

    pub fn set_note(&mut self, note: Note) {
        self.note = Some(note);
    }

    pub fn set_octaves_offset(&mut self, octaves: i32) -> bool {
        match OCTAVES_OFFSET.accept("octaves offset", octaves as f64) {
            Some(_) => {
                self.offset.octaves = octaves;
                true
            }
            None => false,
        }
    }

    pub fn set_semitones_offset(&mut self, semitones: i32) -> bool {
        match SEMITONES_OFFSET.accept("semitones offset", semitones as f64) {
            Some(_) => {
                self.offset.semitones = semitones;
                true
            }
            None => false,
        }
    }

    pub fn set_cents_offset(&mut self, cents: f32) -> bool {
        match CENTS_OFFSET.accept("cents offset", cents as f64) {
            Some(_) => {
                self.offset.cents = cents;
                true
            }
            None => false,
        }
    }
}

fn retune(ctx: &mut dyn SignalNodeProvider, osc: NodeId, tuning: &Tuning) -> Result<()> {
    if let Some(frequency) = tuning.frequency() {
        let now = ctx.current_time();
        ctx.set_value_at(ParamRef::new(osc, Param::Frequency), frequency as f32, now)?;
    }
    Ok(())
}

fn set_pulse_width(ctx: &mut dyn SignalNodeProvider, osc: NodeId, width: f64) -> Result<()> {
    let now = ctx.current_time();
    ctx.set_value_at(ParamRef::new(osc, Param::PulseWidth), width as f32, now)
}

/// Log and fold a provider error into a setter's success flag
fn applied(what: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            log::warn!("{what}: {err}");
            false
        }
    }
}

/// A single periodic shape into a persistent gain.
///
/// Tuning and pulse width are stored and applied to every new generation, as
/// well as to the one currently live.
#[derive(Debug)]
pub struct ShapeOscillator {
    shape: Waveform,
    output: NodeId,
    tuning: Tuning,
    pulse_width: f64,
    gain: f64,
    live: Option<NodeId>,
}

impl ShapeOscillator {
    pub fn new(ctx: &mut dyn SignalNodeProvider, shape: Waveform) -> Self {
        Self {
            shape,
            output: ctx.create_gain(GAIN.default as f32),
            tuning: Tuning::default(),
            pulse_width: PULSE_WIDTH.default,
            gain: GAIN.default,
            live: None,
        }
    }

    pub fn shape(&self) -> Waveform {
        self.shape
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn pulse_width(&self) -> f64 {
        self.pulse_width
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Oscillator of the most recent generation, until it is torn down
    pub fn live_node(&self) -> Option<NodeId> {
        self.live
    }

    /// Offset, pulse width and gain of `other`. The played note is kept.
    pub fn copy_settings(&mut self, ctx: &mut dyn SignalNodeProvider, other: &Self) -> bool {
        let offset = other.tuning.offset();
        [
            self.set_octaves_offset(ctx, offset.octaves),
            self.set_semitones_offset(ctx, offset.semitones),
            self.set_cents_offset(ctx, offset.cents),
            self.set_pulse_width(ctx, other.pulse_width),
            self.set_gain(ctx, other.gain),
        ]
        .into_iter()
        .all(|ok| ok)
    }

    pub fn set_note(&mut self, ctx: &mut dyn SignalNodeProvider, note: Note) -> bool {
        self.tuning.set_note(note);
        self.retune_live(ctx)
    }

    pub fn set_octaves_offset(&mut self, ctx: &mut dyn SignalNodeProvider, octaves: i32) -> bool {
        self.tuning.set_octaves_offset(octaves) && self.retune_live(ctx)
    }

    pub fn set_semitones_offset(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        semitones: i32,
    ) -> bool {
        self.tuning.set_semitones_offset(semitones) && self.retune_live(ctx)
    }

    pub fn set_cents_offset(&mut self, ctx: &mut dyn SignalNodeProvider, cents: f32) -> bool {
        self.tuning.set_cents_offset(cents) && self.retune_live(ctx)
    }

    /// Only meaningful for [`Waveform::Pulse`]; other shapes store the value.
    pub fn set_pulse_width(&mut self, ctx: &mut dyn SignalNodeProvider, width: f64) -> bool {
        let Some(width) = PULSE_WIDTH.accept("pulse width", width) else {
            return false;
        };
        self.pulse_width = width;
        match (self.shape, self.live) {
            (Waveform::Pulse, Some(osc)) => {
                applied("pulse width", set_pulse_width(ctx, osc, width))
            }
            _ => true,
        }
    }

    pub fn set_gain(&mut self, ctx: &mut dyn SignalNodeProvider, gain: f64) -> bool {
        let Some(gain) = GAIN.accept("oscillator gain", gain) else {
            return false;
        };
        let now = ctx.current_time();
        let ok = applied(
            "oscillator gain",
            ctx.set_value_at(ParamRef::new(self.output, Param::Gain), gain as f32, now),
        );
        if ok {
            self.gain = gain;
        }
        ok
    }

    fn retune_live(&mut self, ctx: &mut dyn SignalNodeProvider) -> bool {
        match self.live {
            Some(osc) => applied("oscillator frequency", retune(ctx, osc, &self.tuning)),
            None => true,
        }
    }
}

impl RestartableGenerator for ShapeOscillator {
    fn init_nodes(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        group: &mut NodeGroup,
    ) -> Result<()> {
        let osc = group.track_endable(ctx.create_oscillator(self.shape));
        retune(ctx, osc, &self.tuning)?;
        if self.shape == Waveform::Pulse {
            set_pulse_width(ctx, osc, self.pulse_width)?;
        }
        group.connect(ctx, osc, self.output)?;
        self.live = Some(osc);
        Ok(())
    }

    fn disconnect_nodes(&mut self, ctx: &mut dyn SignalNodeProvider, group: NodeGroup) -> Result<()> {
        if self.live.is_some_and(|osc| group.owns(osc)) {
            self.live = None;
        }
        group.teardown(ctx)
    }

    fn output(&self) -> NodeId {
        self.output
    }

    fn dispose(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        ctx.dispose(self.output)
    }
}

/// Triangle, sawtooth and pulse oscillators on the same pitch, each toggled
/// on or off through a [`ToggleMixer`]. Only the triangle is on initially.
#[derive(Debug)]
pub struct TripleShapeOscillator {
    mixer: ToggleMixer,
    tuning: Tuning,
    pulse_width: f64,
    live: Option<[NodeId; 3]>,
}

impl TripleShapeOscillator {
    pub const TRIANGLE: usize = 0;
    pub const SAW: usize = 1;
    pub const PULSE: usize = 2;

    const SHAPES: [Waveform; 3] = [Waveform::Triangle, Waveform::Sawtooth, Waveform::Pulse];

    pub fn new(ctx: &mut dyn SignalNodeProvider) -> Result<Self> {
        let mut mixer = ToggleMixer::new(ctx, Self::SHAPES.len())?;
        if !mixer.toggle_on(ctx, Self::TRIANGLE) {
            log::warn!("triple oscillator: could not enable triangle");
        }
        Ok(Self {
            mixer,
            tuning: Tuning::default(),
            pulse_width: PULSE_WIDTH.default,
            live: None,
        })
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn pulse_width(&self) -> f64 {
        self.pulse_width
    }

    /// `TRIANGLE`, `SAW` or `PULSE`
    pub fn is_shape_enabled(&self, shape: usize) -> Option<bool> {
        self.mixer.is_enabled(shape)
    }

    pub fn live_nodes(&self) -> Option<[NodeId; 3]> {
        self.live
    }

    /// Enabled shapes, pulse width and offset of `other`. The played note is kept.
    pub fn copy_settings(&mut self, ctx: &mut dyn SignalNodeProvider, other: &Self) -> bool {
        let mut ok = true;
        for shape in 0..Self::SHAPES.len() {
            let enabled = other.is_shape_enabled(shape).unwrap_or(false);
            ok &= self.set_shape_enabled(ctx, shape, enabled);
        }
        let offset = other.tuning.offset();
        ok &= self.set_pulse_width(ctx, other.pulse_width);
        ok &= self.set_octaves_offset(ctx, offset.octaves);
        ok &= self.set_semitones_offset(ctx, offset.semitones);
        ok &= self.set_cents_offset(ctx, offset.cents);
        ok
    }

    pub fn set_shape_enabled(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        shape: usize,
        enabled: bool,
    ) -> bool {
        self.mixer.set_enabled(ctx, shape, enabled)
    }

    pub fn toggle_shape(&mut self, ctx: &mut dyn SignalNodeProvider, shape: usize) -> bool {
        self.mixer.toggle(ctx, shape)
    }

    pub fn set_note(&mut self, ctx: &mut dyn SignalNodeProvider, note: Note) -> bool {
        self.tuning.set_note(note);
        self.retune_live(ctx)
    }

    pub fn set_octaves_offset(&mut self, ctx: &mut dyn SignalNodeProvider, octaves: i32) -> bool {
        self.tuning.set_octaves_offset(octaves) && self.retune_live(ctx)
    }

    pub fn set_semitones_offset(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        semitones: i32,
    ) -> bool {
        self.tuning.set_semitones_offset(semitones) && self.retune_live(ctx)
    }

    pub fn set_cents_offset(&mut self, ctx: &mut dyn SignalNodeProvider, cents: f32) -> bool {
        self.tuning.set_cents_offset(cents) && self.retune_live(ctx)
    }

    pub fn set_pulse_width(&mut self, ctx: &mut dyn SignalNodeProvider, width: f64) -> bool {
        let Some(width) = PULSE_WIDTH.accept("pulse width", width) else {
            return false;
        };
        self.pulse_width = width;
        match self.live {
            Some(nodes) => applied("pulse width", set_pulse_width(ctx, nodes[Self::PULSE], width)),
            None => true,
        }
    }

    fn retune_live(&mut self, ctx: &mut dyn SignalNodeProvider) -> bool {
        let Some(nodes) = self.live else {
            return true;
        };
        nodes
            .iter()
            .map(|&osc| applied("oscillator frequency", retune(ctx, osc, &self.tuning)))
            .fold(true, |ok, applied| ok && applied)
    }
}

impl RestartableGenerator for TripleShapeOscillator {
    fn init_nodes(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        group: &mut NodeGroup,
    ) -> Result<()> {
        let mut nodes = [NodeId(0); 3];
        let shapes = Self::SHAPES.into_iter().zip(self.mixer.inputs());
        for (slot, (shape, input)) in nodes.iter_mut().zip(shapes) {
            let osc = group.track_endable(ctx.create_oscillator(shape));
            retune(ctx, osc, &self.tuning)?;
            group.connect(ctx, osc, input)?;
            *slot = osc;
        }
        set_pulse_width(ctx, nodes[Self::PULSE], self.pulse_width)?;
        self.live = Some(nodes);
        Ok(())
    }

    fn disconnect_nodes(&mut self, ctx: &mut dyn SignalNodeProvider, group: NodeGroup) -> Result<()> {
        if self.live.is_some_and(|nodes| group.owns(nodes[0])) {
            self.live = None;
        }
        group.teardown(ctx)
    }

    fn output(&self) -> NodeId {
        self.mixer.output()
    }

    fn dispose(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        self.mixer.dispose(ctx)
    }
}
