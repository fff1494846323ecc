use crate::{
    error::Result,
    graph::node::SignalSource,
    io::provider::{NodeId, Param, ParamRef, SignalNodeProvider},
    settings::{
        adsr::{self, FLOOR_LEVEL, OFF_LEVEL, ON_LEVEL, SAFETY_DURATION},
        AdsrParams,
    },
};

/*
Scheduled ADSR Envelope
=======================

The envelope does not compute samples. It writes a timeline of automation
events on a gain parameter and lets the provider play it back.

Vocabulary
----------

  level       The automated gain value, 0.0 to 1.0. A constant source of 1.0
              feeds the gain node, so the node's output *is* the level.

  hold        `cancel_and_hold_at(now)`: freeze the level wherever it is right
              now and drop everything scheduled after. Every trigger starts
              with one, so re-triggering never jumps.

  safety      A small gap (SAFETY_DURATION) in front of each phase
              transition, so two automation events never share a timestamp.


Attack (at time `now`)
----------------------

  hold(now)
  ramp → 1.0      arriving at attack_end = now + safety + attack
  ramp → sustain  arriving at decay_end  = attack_end + safety + decay

  Level
    1.0 ┤     ╱╲
        │    ╱  ╲___________  sustain
        │   ╱
    0.0 ┼──●───────────────────→ t
          now  │   │
               │   decay_end
               attack_end

Release (at time `now`)
-----------------------

  hold(now)
  ramp → FLOOR    arriving at release_end - safety
  ramp → 0.0      arriving at release_end = now + release

The level is exactly zero at `release_end`, which is what `finish_time`
reports, so a caller can tear down anything the envelope gates at that time.
The release minimum is larger than the safety gap, so the floor ramp always
has positive length.

Because every trigger holds first, a release interrupted by a new attack
ramps up from the current level rather than restarting from zero, and an
attack interrupted by a release ramps down from wherever it got to.

Parameter changes are stored and picked up by the next trigger.
*/

/// Durations, sustain level and the absolute times of the last triggers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopePhaseTimeline {
    pub attack_duration: f64,
    pub decay_duration: f64,
    pub sustain_level: f64,
    pub release_duration: f64,

    pub on_time: f64,
    pub attack_end_time: f64,
    pub decay_end_time: f64,
    pub release_start_time: f64,
    pub release_end_time: f64,
}

impl EnvelopePhaseTimeline {
    fn new(params: &AdsrParams) -> Self {
        Self {
            attack_duration: params.attack,
            decay_duration: params.decay,
            sustain_level: params.sustain,
            release_duration: params.release,
            on_time: 0.0,
            attack_end_time: 0.0,
            decay_end_time: 0.0,
            release_start_time: 0.0,
            release_end_time: 0.0,
        }
    }
}

#[derive(Debug)]
pub struct EnvelopeGenerator {
    source: NodeId,
    level: NodeId,
    timeline: EnvelopePhaseTimeline,
}

impl EnvelopeGenerator {
    /// Creates the constant source and level gain. The source runs for the
    /// envelope's whole life; only the gain is automated.
    pub fn new(ctx: &mut dyn SignalNodeProvider, params: AdsrParams) -> Result<Self> {
        params.validate()?;

        let now = ctx.current_time();
        let source = ctx.create_constant(ON_LEVEL);
        let level = ctx.create_gain(OFF_LEVEL);

        let wired = ctx
            .connect(source, level.into())
            .and_then(|()| ctx.start(source, now));
        if let Err(err) = wired {
            for node in [level, source] {
                if let Err(cleanup) = ctx.dispose(node) {
                    log::warn!("envelope cleanup: {cleanup}");
                }
            }
            return Err(err);
        }

        Ok(Self {
            source,
            level,
            timeline: EnvelopePhaseTimeline::new(&params),
        })
    }

    pub fn level_param(&self) -> ParamRef {
        ParamRef::new(self.level, Param::Gain)
    }

    pub fn timeline(&self) -> &EnvelopePhaseTimeline {
        &self.timeline
    }

    pub fn params(&self) -> AdsrParams {
        AdsrParams::new(
            self.timeline.attack_duration,
            self.timeline.decay_duration,
            self.timeline.sustain_level,
            self.timeline.release_duration,
        )
    }

    pub fn trigger_attack(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        let now = ctx.current_time();
        let param = self.level_param();
        ctx.cancel_and_hold_at(param, now)?;

        let t = &mut self.timeline;
        t.on_time = now;
        t.attack_end_time = now + SAFETY_DURATION + t.attack_duration;
        t.decay_end_time = t.attack_end_time + SAFETY_DURATION + t.decay_duration;

        ctx.linear_ramp_to_value_at(param, ON_LEVEL, t.attack_end_time)?;
        ctx.linear_ramp_to_value_at(param, t.sustain_level as f32, t.decay_end_time)?;

        log::trace!(
            "envelope attack at {now}: peak {}, sustain from {}",
            t.attack_end_time,
            t.decay_end_time
        );
        Ok(())
    }

    pub fn trigger_release(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        let now = ctx.current_time();
        let param = self.level_param();
        ctx.cancel_and_hold_at(param, now)?;

        let t = &mut self.timeline;
        t.release_start_time = now;
        t.release_end_time = now + t.release_duration;

        ctx.linear_ramp_to_value_at(param, FLOOR_LEVEL, t.release_end_time - SAFETY_DURATION)?;
        ctx.linear_ramp_to_value_at(param, OFF_LEVEL, t.release_end_time)?;

        log::trace!("envelope release at {now}: silent at {}", t.release_end_time);
        Ok(())
    }

    /// How long a release started now takes to reach silence
    pub fn estimated_release_duration(&self) -> f64 {
        self.timeline.release_duration
    }

    /// When the last scheduled release reaches zero
    pub fn finish_time(&self) -> f64 {
        self.timeline.release_end_time
    }

    pub fn level_at(&self, ctx: &dyn SignalNodeProvider, time: f64) -> Option<f32> {
        ctx.param_value(self.level_param(), time)
    }

    pub fn set_attack_duration(&mut self, seconds: f64) -> bool {
        match adsr::ATTACK.accept("attack duration", seconds) {
            Some(seconds) => {
                self.timeline.attack_duration = seconds;
                true
            }
            None => false,
        }
    }

    pub fn set_decay_duration(&mut self, seconds: f64) -> bool {
        match adsr::DECAY.accept("decay duration", seconds) {
            Some(seconds) => {
                self.timeline.decay_duration = seconds;
                true
            }
            None => false,
        }
    }

    pub fn set_sustain_level(&mut self, level: f64) -> bool {
        match adsr::SUSTAIN.accept("sustain level", level) {
            Some(level) => {
                self.timeline.sustain_level = level;
                true
            }
            None => false,
        }
    }

    pub fn set_release_duration(&mut self, seconds: f64) -> bool {
        match adsr::RELEASE.accept("release duration", seconds) {
            Some(seconds) => {
                self.timeline.release_duration = seconds;
                true
            }
            None => false,
        }
    }

    /// All four at once. Nothing changes unless every value is in range.
    pub fn set_params(&mut self, params: AdsrParams) -> bool {
        if let Err(err) = params.validate() {
            log::warn!("envelope: {err}");
            return false;
        }
        let times = self.timeline;
        self.timeline = EnvelopePhaseTimeline {
            on_time: times.on_time,
            attack_end_time: times.attack_end_time,
            decay_end_time: times.decay_end_time,
            release_start_time: times.release_start_time,
            release_end_time: times.release_end_time,
            ..EnvelopePhaseTimeline::new(&params)
        };
        true
    }

    pub fn dispose(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        let source = ctx.dispose(self.source);
        let level = ctx.dispose(self.level);
        source.and(level)
    }
}

impl SignalSource for EnvelopeGenerator {
    fn output(&self) -> NodeId {
        self.level
    }
}
