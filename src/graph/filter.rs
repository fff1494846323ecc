use crate::{
    error::Result,
    graph::{
        envelope::EnvelopeGenerator,
        node::{NodeGroup, SignalSource},
    },
    io::provider::{NodeId, Param, ParamRef, SignalNodeProvider},
    settings::{
        filter::{CUTOFF, ENVELOPE_AMOUNT, RESONANCE},
        AdsrParams,
    },
};

/*
Lowpass Filter Stage
====================

  in ─▶ [input gain] ─▶ [lowpass] ─▶ [output gain] ─▶ out
                            ▲
                          detune
                            │
        [envelope] ─▶ [amount gain]

The cutoff sweep is done in cents through the filter's detune parameter: the
envelope's 0..1 level is scaled by the envelope amount (±4800 cents, four
octaves) and added to detune. A positive amount opens the filter on attack,
a negative one closes it.

All nodes are persistent. The stage has its own envelope, attacked and
released together with the voice's amplitude envelope.
*/

#[derive(Debug)]
pub struct LowpassFilter {
    nodes: NodeGroup,
    input: NodeId,
    filter: NodeId,
    output: NodeId,
    amount: NodeId,
    envelope: EnvelopeGenerator,
    cutoff: f64,
    resonance: f64,
    envelope_amount: f64,
}

impl LowpassFilter {
    pub fn new(ctx: &mut dyn SignalNodeProvider) -> Result<Self> {
        let envelope = EnvelopeGenerator::new(ctx, AdsrParams::filter())?;

        let mut nodes = NodeGroup::new();
        let input = nodes.track(ctx.create_gain(1.0));
        let filter = nodes.track(ctx.create_lowpass(CUTOFF.default as f32, RESONANCE.default as f32));
        let output = nodes.track(ctx.create_gain(1.0));
        let amount = nodes.track(ctx.create_gain(ENVELOPE_AMOUNT.default as f32));

        let mut stage = Self {
            nodes,
            input,
            filter,
            output,
            amount,
            envelope,
            cutoff: CUTOFF.default,
            resonance: RESONANCE.default,
            envelope_amount: ENVELOPE_AMOUNT.default,
        };
        if let Err(err) = stage.wire(ctx) {
            if let Err(cleanup) = stage.dispose(ctx) {
                log::warn!("filter cleanup: {cleanup}");
            }
            return Err(err);
        }
        Ok(stage)
    }

    fn wire(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        let detune = ParamRef::new(self.filter, Param::Detune);
        self.nodes.connect(ctx, self.input, self.filter)?;
        self.nodes.connect(ctx, self.filter, self.output)?;
        self.nodes.connect(ctx, self.envelope.output(), self.amount)?;
        self.nodes.connect(ctx, self.amount, detune)
    }

    /// Node to connect the signal into
    pub fn input(&self) -> NodeId {
        self.input
    }

    pub fn filter_node(&self) -> NodeId {
        self.filter
    }

    pub fn envelope(&self) -> &EnvelopeGenerator {
        &self.envelope
    }

    pub fn envelope_mut(&mut self) -> &mut EnvelopeGenerator {
        &mut self.envelope
    }

    pub fn cutoff_frequency(&self) -> f64 {
        self.cutoff
    }

    pub fn resonance(&self) -> f64 {
        self.resonance
    }

    pub fn envelope_amount(&self) -> f64 {
        self.envelope_amount
    }

    pub fn set_cutoff_frequency(&mut self, ctx: &mut dyn SignalNodeProvider, hz: f64) -> bool {
        let Some(hz) = CUTOFF.accept("cutoff frequency", hz) else {
            return false;
        };
        if self.set_param(ctx, ParamRef::new(self.filter, Param::Frequency), hz) {
            self.cutoff = hz;
            true
        } else {
            false
        }
    }

    pub fn set_resonance(&mut self, ctx: &mut dyn SignalNodeProvider, q: f64) -> bool {
        let Some(q) = RESONANCE.accept("resonance", q) else {
            return false;
        };
        if self.set_param(ctx, ParamRef::new(self.filter, Param::Q), q) {
            self.resonance = q;
            true
        } else {
            false
        }
    }

    /// In cents at full envelope level
    pub fn set_envelope_amount(&mut self, ctx: &mut dyn SignalNodeProvider, cents: f64) -> bool {
        let Some(cents) = ENVELOPE_AMOUNT.accept("filter envelope amount", cents) else {
            return false;
        };
        if self.set_param(ctx, ParamRef::new(self.amount, Param::Gain), cents) {
            self.envelope_amount = cents;
            true
        } else {
            false
        }
    }

    /// Cutoff, resonance, envelope amount and envelope shape of `other`
    pub fn copy_settings(&mut self, ctx: &mut dyn SignalNodeProvider, other: &Self) -> bool {
        [
            self.set_cutoff_frequency(ctx, other.cutoff),
            self.set_resonance(ctx, other.resonance),
            self.set_envelope_amount(ctx, other.envelope_amount),
            self.envelope.set_params(other.envelope.params()),
        ]
        .into_iter()
        .all(|ok| ok)
    }

    pub fn trigger_attack(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        self.envelope.trigger_attack(ctx)
    }

    pub fn trigger_release(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        self.envelope.trigger_release(ctx)
    }

    pub fn dispose(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        let nodes = std::mem::take(&mut self.nodes).teardown(ctx);
        let envelope = self.envelope.dispose(ctx);
        nodes.and(envelope)
    }

    fn set_param(&self, ctx: &mut dyn SignalNodeProvider, param: ParamRef, value: f64) -> bool {
        let now = ctx.current_time();
        match ctx.set_value_at(param, value as f32, now) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("filter {:?}: {err}", param.param);
                false
            }
        }
    }
}

impl SignalSource for LowpassFilter {
    fn output(&self) -> NodeId {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::offline::OfflineProvider;

    #[test]
    fn stage_is_wired_in_series() {
        let mut ctx = OfflineProvider::new();
        let stage = LowpassFilter::new(&mut ctx).unwrap();

        assert!(ctx.is_connected(stage.input(), stage.filter_node()));
        assert!(ctx.is_connected(stage.filter_node(), stage.output()));
        assert!(ctx.is_connected(
            stage.amount,
            ParamRef::new(stage.filter_node(), Param::Detune)
        ));
        assert!(ctx.is_connected(stage.envelope().output(), stage.amount));
    }

    #[test]
    fn setters_validate_ranges() {
        let mut ctx = OfflineProvider::new();
        let mut stage = LowpassFilter::new(&mut ctx).unwrap();

        assert!(stage.set_cutoff_frequency(&mut ctx, 1200.0));
        assert!(!stage.set_cutoff_frequency(&mut ctx, 50.0));
        assert_eq!(stage.cutoff_frequency(), 1200.0);
        assert_eq!(
            ctx.param_value(ParamRef::new(stage.filter_node(), Param::Frequency), 0.0),
            Some(1200.0)
        );

        assert!(stage.set_resonance(&mut ctx, 4.0));
        assert!(!stage.set_resonance(&mut ctx, 0.0));
        assert_eq!(stage.resonance(), 4.0);

        assert!(stage.set_envelope_amount(&mut ctx, -2400.0));
        assert!(!stage.set_envelope_amount(&mut ctx, 5000.0));
        assert_eq!(stage.envelope_amount(), -2400.0);
    }

    #[test]
    fn envelope_follows_triggers() {
        let mut ctx = OfflineProvider::new();
        let mut stage = LowpassFilter::new(&mut ctx).unwrap();
        assert!(stage.envelope_mut().set_attack_duration(0.5));

        stage.trigger_attack(&mut ctx).unwrap();
        ctx.advance_to(1.0);
        assert_eq!(stage.envelope().level_at(&ctx, 1.0), Some(1.0));

        stage.trigger_release(&mut ctx).unwrap();
        let end = stage.envelope().finish_time();
        assert_eq!(stage.envelope().level_at(&ctx, end), Some(0.0));
    }

    #[test]
    fn dispose_removes_everything() {
        let mut ctx = OfflineProvider::new();
        let mut stage = LowpassFilter::new(&mut ctx).unwrap();
        stage.dispose(&mut ctx).unwrap();
        assert_eq!(ctx.node_count(), 0);
        assert_eq!(ctx.link_count(), 0);
    }
}
