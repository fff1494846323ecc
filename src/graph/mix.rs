use crate::{
    error::Result,
    graph::node::SignalSource,
    io::provider::{NodeId, Param, ParamRef, SignalNodeProvider},
    settings::mixer::{INPUT_GAIN, TOGGLE_OFF, TOGGLE_ON},
};

/*
Multi-Input Mixing
==================

Both mixers are persistent: their nodes are created once and live as long as
the voice. Restartable generators wire each new generation into a mixer input,
so the mixer never needs to know a generation changed.

  input 0 ─▶ [gain 0] ─┐
  input 1 ─▶ [gain 1] ─┼─▶ [output gain] ─▶
  input 2 ─▶ [gain 2] ─┘

Inputs are addressed by index, fixed at construction.

ToggleMixer
-----------
Each input is either on (gain 1) or off (gain 0). The output gain keeps the
sum inside [-1, 1]:

  output = 1 / enabled - EPSILON     (enabled > 0)
  output = 0                         (nothing enabled)

Used to pick which shapes of an oscillator, or which noise colour, sound.

AdditiveMixer
-------------
Each input has its own weight in [0, 1]; the output gain is 1 / inputs.
Used to balance the generators of a voice against each other.

Changes apply at the provider's current time.
*/

#[derive(Debug, Clone, Copy)]
struct ToggledInput {
    gain: NodeId,
    enabled: bool,
}

#[derive(Debug)]
pub struct ToggleMixer {
    inputs: Vec<ToggledInput>,
    output: NodeId,
}

impl ToggleMixer {
    /// `inputs` muted inputs
    pub fn new(ctx: &mut dyn SignalNodeProvider, inputs: usize) -> Result<Self> {
        let mut mixer = Self {
            inputs: Vec::with_capacity(inputs),
            output: ctx.create_gain(0.0),
        };
        for _ in 0..inputs {
            let gain = ctx.create_gain(TOGGLE_OFF);
            mixer.inputs.push(ToggledInput {
                gain,
                enabled: false,
            });
            if let Err(err) = ctx.connect(gain, mixer.output.into()) {
                if let Err(cleanup) = mixer.dispose(ctx) {
                    log::warn!("toggle mixer cleanup: {cleanup}");
                }
                return Err(err);
            }
        }
        Ok(mixer)
    }

    /// Node to connect a source into
    pub fn input(&self, index: usize) -> Option<NodeId> {
        self.inputs.get(index).map(|input| input.gain)
    }

    /// Input nodes in index order
    pub fn inputs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inputs.iter().map(|input| input.gain)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn is_enabled(&self, index: usize) -> Option<bool> {
        self.inputs.get(index).map(|input| input.enabled)
    }

    pub fn enabled_count(&self) -> usize {
        self.inputs.iter().filter(|input| input.enabled).count()
    }

    /// Output gain for the current toggle states
    pub fn output_gain(&self) -> f32 {
        match self.enabled_count() {
            0 => TOGGLE_OFF,
            n => TOGGLE_ON / n as f32 - f32::EPSILON,
        }
    }

    pub fn toggle_on(&mut self, ctx: &mut dyn SignalNodeProvider, index: usize) -> bool {
        self.set_enabled(ctx, index, true)
    }

    pub fn toggle_off(&mut self, ctx: &mut dyn SignalNodeProvider, index: usize) -> bool {
        self.set_enabled(ctx, index, false)
    }

    /// Flip an input
    pub fn toggle(&mut self, ctx: &mut dyn SignalNodeProvider, index: usize) -> bool {
        match self.is_enabled(index) {
            Some(enabled) => self.set_enabled(ctx, index, !enabled),
            None => {
                log::warn!("toggle({index}): input index out of range");
                false
            }
        }
    }

    pub fn set_enabled(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        index: usize,
        enabled: bool,
    ) -> bool {
        let Some(input) = self.inputs.get_mut(index) else {
            log::warn!("set_enabled({index}, {enabled}): input index out of range");
            return false;
        };

        let now = ctx.current_time();
        let level = if enabled { TOGGLE_ON } else { TOGGLE_OFF };
        if let Err(err) = ctx.set_value_at(ParamRef::new(input.gain, Param::Gain), level, now) {
            log::warn!("set_enabled({index}, {enabled}): {err}");
            return false;
        }
        input.enabled = enabled;
        log::debug!("toggle mixer input {index} {}", if enabled { "on" } else { "off" });

        self.apply_output_gain(ctx)
    }

    /// Enable exactly one input, muting the rest
    pub fn solo(&mut self, ctx: &mut dyn SignalNodeProvider, index: usize) -> bool {
        if index >= self.inputs.len() {
            log::warn!("solo({index}): input index out of range");
            return false;
        }
        (0..self.inputs.len())
            .map(|i| self.set_enabled(ctx, i, i == index))
            .fold(true, |ok, changed| ok && changed)
    }

    pub fn dispose(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        let mut result = Ok(());
        for input in self.inputs.drain(..) {
            result = result.and(ctx.dispose(input.gain));
        }
        result.and(ctx.dispose(self.output))
    }

    fn apply_output_gain(&mut self, ctx: &mut dyn SignalNodeProvider) -> bool {
        let now = ctx.current_time();
        match ctx.set_value_at(ParamRef::new(self.output, Param::Gain), self.output_gain(), now) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("toggle mixer output gain: {err}");
                false
            }
        }
    }
}

impl SignalSource for ToggleMixer {
    fn output(&self) -> NodeId {
        self.output
    }
}

#[derive(Debug)]
pub struct AdditiveMixer {
    inputs: Vec<NodeId>,
    levels: Vec<f64>,
    output: NodeId,
}

impl AdditiveMixer {
    /// `inputs` inputs at full weight
    pub fn new(ctx: &mut dyn SignalNodeProvider, inputs: usize) -> Result<Self> {
        let output_gain = match inputs {
            0 => 0.0,
            n => 1.0 / n as f32,
        };
        let mut mixer = Self {
            inputs: Vec::with_capacity(inputs),
            levels: Vec::with_capacity(inputs),
            output: ctx.create_gain(output_gain),
        };
        for _ in 0..inputs {
            let gain = ctx.create_gain(INPUT_GAIN.default as f32);
            mixer.inputs.push(gain);
            mixer.levels.push(INPUT_GAIN.default);
            if let Err(err) = ctx.connect(gain, mixer.output.into()) {
                if let Err(cleanup) = mixer.dispose(ctx) {
                    log::warn!("additive mixer cleanup: {cleanup}");
                }
                return Err(err);
            }
        }
        Ok(mixer)
    }

    pub fn input(&self, index: usize) -> Option<NodeId> {
        self.inputs.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn input_gain(&self, index: usize) -> Option<f64> {
        self.levels.get(index).copied()
    }

    pub fn set_input_gain(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        index: usize,
        gain: f64,
    ) -> bool {
        let Some(&node) = self.inputs.get(index) else {
            log::warn!("set_input_gain({index}, {gain}): input index out of range");
            return false;
        };
        let Some(gain) = INPUT_GAIN.accept("mixer input gain", gain) else {
            return false;
        };

        let now = ctx.current_time();
        match ctx.set_value_at(ParamRef::new(node, Param::Gain), gain as f32, now) {
            Ok(()) => {
                self.levels[index] = gain;
                true
            }
            Err(err) => {
                log::warn!("set_input_gain({index}, {gain}): {err}");
                false
            }
        }
    }

    pub fn dispose(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        let mut result = Ok(());
        for input in self.inputs.drain(..) {
            result = result.and(ctx.dispose(input));
        }
        self.levels.clear();
        result.and(ctx.dispose(self.output))
    }
}

impl SignalSource for AdditiveMixer {
    fn output(&self) -> NodeId {
        self.output
    }
}
