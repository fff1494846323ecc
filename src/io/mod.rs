// Purpose - external interfaces: the host's signal graph, MIDI input

/// Web-Audio-style parameter automation timelines.
pub mod automation;
/// MIDI events to synth messages.
pub mod converter;
pub mod midi;
/// In-process provider with an explicit clock, used by tests and the CLI.
pub mod offline;
/// The signal node provider contract.
pub mod provider;

pub use offline::OfflineProvider;
pub use provider::{Endpoint, NodeId, Param, ParamRef, SignalNodeProvider, Waveform};
