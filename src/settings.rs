//! Parameter ranges and defaults.
//!
//! Every setter in the crate validates through [`ParamRange::check`]. A value
//! outside the range is rejected, the previous value is kept and the caller
//! gets `false` (or an `Err` inside the crate).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};

/// Inclusive `[min, max]` range with a default value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl ParamRange {
    pub const fn new(min: f64, max: f64, default: f64) -> Self {
        Self { min, max, default }
    }

    pub fn contains(&self, value: f64) -> bool {
        // NaN fails both comparisons and is rejected
        self.min <= value && value <= self.max
    }

    /// Returns the value unchanged if it is inside the range.
    pub fn check(&self, name: &'static str, value: f64) -> Result<f64> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(SynthError::OutOfRangeParameter {
                name,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Setter-facing variant of [`check`](Self::check): a rejected value is
    /// logged at warn level and `None` is returned.
    pub fn accept(&self, name: &'static str, value: f64) -> Option<f64> {
        match self.check(name, value) {
            Ok(value) => {
                log::debug!("{name} = {value}");
                Some(value)
            }
            Err(err) => {
                log::warn!("{err}");
                None
            }
        }
    }
}

/// ADSR envelope limits. Durations are in seconds, levels in `0..=1`.
pub mod adsr {
    use super::ParamRange;

    /// Gap inserted before each phase transition so two automation events never
    /// share a timestamp.
    pub const SAFETY_DURATION: f64 = 0.01;

    pub const ATTACK: ParamRange = ParamRange::new(0.0, 8.0, 0.01);
    pub const DECAY: ParamRange = ParamRange::new(0.0, 8.0, 0.3);
    // exponential-friendly floor, never exactly zero
    pub const SUSTAIN: ParamRange = ParamRange::new(0.0001, 1.0, 0.5);
    pub const RELEASE: ParamRange = ParamRange::new(SAFETY_DURATION + 0.01, 8.0, 1.0);

    /// Level the release ramp aims for before the final step to zero
    pub const FLOOR_LEVEL: f32 = 0.0001;
    pub const OFF_LEVEL: f32 = 0.0;
    pub const ON_LEVEL: f32 = 1.0;

    pub const VOICE_ATTACK: f64 = 0.01;
    pub const VOICE_DECAY: f64 = 1.0;
    pub const VOICE_SUSTAIN: f64 = 0.8;
    pub const VOICE_RELEASE: f64 = 1.0;

    pub const FILTER_ATTACK: f64 = 0.0;
    pub const FILTER_DECAY: f64 = 0.0;
    pub const FILTER_SUSTAIN: f64 = 1.0;
    pub const FILTER_RELEASE: f64 = RELEASE.min;
}

/// Lowpass filter limits
pub mod filter {
    use super::ParamRange;

    /// Cutoff frequency in Hz
    pub const CUTOFF: ParamRange = ParamRange::new(100.0, 6000.0, 6000.0);
    /// Resonance as a Q factor
    pub const RESONANCE: ParamRange = ParamRange::new(0.0001, 50.0, 1.0);
    /// Envelope amount in cents applied to the filter detune (4800 = 4 octaves)
    pub const ENVELOPE_AMOUNT: ParamRange = ParamRange::new(-4800.0, 4800.0, 0.0);
}

/// Oscillator limits
pub mod oscillator {
    use super::ParamRange;

    pub const GAIN: ParamRange = ParamRange::new(0.0, 1.0, 1.0);
    pub const PULSE_WIDTH: ParamRange = ParamRange::new(0.0, 1.0, 0.5);
    pub const OCTAVES_OFFSET: ParamRange = ParamRange::new(-2.0, 2.0, 0.0);
    pub const SEMITONES_OFFSET: ParamRange = ParamRange::new(-12.0, 12.0, 0.0);
    pub const CENTS_OFFSET: ParamRange = ParamRange::new(-100.0, 100.0, 0.0);

    /// Length of the looping noise buffers, in seconds of audio at 48 kHz
    pub const NOISE_BUFFER_SECONDS: f64 = 2.0;
    pub const NOISE_SAMPLE_RATE: f64 = 48_000.0;
}

/// Mixer input limits
pub mod mixer {
    use super::ParamRange;

    pub const INPUT_GAIN: ParamRange = ParamRange::new(0.0, 1.0, 1.0);
    pub const TOGGLE_OFF: f32 = 0.0;
    pub const TOGGLE_ON: f32 = 1.0;
}

/// Voice and pool limits
pub mod voice {
    use super::ParamRange;

    pub const GAIN: ParamRange = ParamRange::new(0.0, 1.0, 0.5);
    pub const COUNT: ParamRange = ParamRange::new(1.0, 32.0, 8.0);
}

/// Note limits
pub mod note {
    pub const A4_FREQUENCY: f64 = 440.0;
    pub const A4_MIDI_NUMBER: i32 = 69;
    pub const MIN_MIDI_NOTE: i32 = 0;
    pub const MAX_MIDI_NOTE: i32 = 127;
    pub const MAX_CENTS: f32 = 100.0;
    /// Octaves a note may name: C-1 (MIDI 0) up to B9
    pub const MIN_OCTAVE: i32 = -1;
    pub const MAX_OCTAVE: i32 = 9;
}

/// The four ADSR parameters as one value, used for presets and defaults.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrParams {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl AdsrParams {
    pub const fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Defaults for an amplitude envelope
    pub const fn voice() -> Self {
        Self::new(
            adsr::VOICE_ATTACK,
            adsr::VOICE_DECAY,
            adsr::VOICE_SUSTAIN,
            adsr::VOICE_RELEASE,
        )
    }

    /// Defaults for a filter cutoff envelope
    pub const fn filter() -> Self {
        Self::new(
            adsr::FILTER_ATTACK,
            adsr::FILTER_DECAY,
            adsr::FILTER_SUSTAIN,
            adsr::FILTER_RELEASE,
        )
    }

    /// Checks all four values, reporting the first one out of range.
    pub fn validate(&self) -> Result<()> {
        adsr::ATTACK.check("attack duration", self.attack)?;
        adsr::DECAY.check("decay duration", self.decay)?;
        adsr::SUSTAIN.check("sustain level", self.sustain)?;
        adsr::RELEASE.check("release duration", self.release)?;
        Ok(())
    }
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self::new(
            adsr::ATTACK.default,
            adsr::DECAY.default,
            adsr::SUSTAIN.default,
            adsr::RELEASE.default,
        )
    }
}

/// Pool-level configuration a host can load as a preset.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthConfig {
    pub voice_count: usize,
    pub amp_envelope: AdsrParams,
}

impl SynthConfig {
    pub fn validate(&self) -> Result<()> {
        voice::COUNT.check("voice count", self.voice_count as f64)?;
        self.amp_envelope.validate()
    }
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            voice_count: voice::COUNT.default as usize,
            amp_envelope: AdsrParams::voice(),
        }
    }
}
