//! Pre-built voice graphs.
//!
//! Each voice is a ready-to-use [`VoiceGraph`](crate::synth::VoiceGraph).
//! Hand its constructor to a [`PolySynth`](crate::synth::PolySynth) as the
//! voice factory, or study them to learn how a patch is put together.
//!
//! # Example
//!
//! ```ignore
//! use saavy_poly::{io::OfflineProvider, synth::PolySynth, voices::AnalogVoice};
//!
//! let mut synth = PolySynth::new(OfflineProvider::new(), AnalogVoice::factory())?;
//! synth.set_cutoff_frequency(1200.0);
//! ```

mod analog;
mod simple;

pub use analog::{AnalogSource, AnalogVoice};
pub use simple::SimpleVoice;
