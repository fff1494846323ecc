//! Polyphonic voice management on top of a scheduled signal graph.
//!
//! The crate never renders audio. It drives a [`SignalNodeProvider`]: creates
//! source, gain and filter nodes, wires them, schedules parameter automation
//! and reacts to sources finishing. What it adds is the lifecycle: one-shot
//! sources that can be restarted forever, ADSR envelopes that re-trigger
//! without clicks, and a voice pool with deterministic voice stealing.
//!
//! ```ignore
//! use saavy_poly::{io::OfflineProvider, note::Note, synth::PolySynth, voices::AnalogVoice};
//!
//! let mut synth = PolySynth::new(OfflineProvider::new(), AnalogVoice::factory())?;
//! let c4: Note = "C4".parse()?;
//! synth.trigger_attack(c4);
//! synth.advance_to(0.5);
//! synth.trigger_release(c4);
//! ```

pub mod error;
pub mod graph; // Restartable generators, envelopes, mixers and filters
pub mod io; // Signal node provider contract, offline provider, MIDI
pub mod note;
pub mod settings; // Parameter ranges and defaults
pub mod synth; // Voice management and polyphony
pub mod voices; // Ready-made voice graphs

pub use error::{Result, SynthError};
pub use io::SignalNodeProvider;
pub use note::Note;
