// Purpose: Voice management, polyphony, control messages
// This layer sits above the graph types and manages multiple voices

pub mod factory;
pub mod message;
pub mod poly;
pub mod voice;

pub use factory::VoiceFactory;
pub use message::{MessageReceiver, SynthMessage};
pub use poly::PolySynth;
pub use voice::{SynthVoice, VoiceGraph, VoiceState};
