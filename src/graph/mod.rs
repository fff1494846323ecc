//! Composable building blocks for constructing voice graphs.
//!
//! Graph types sit on top of a [`SignalNodeProvider`](crate::io::SignalNodeProvider):
//! they create provider nodes, wire them together and schedule automation,
//! but never touch samples. Restartable generators give one-shot sources a
//! start/stop lifecycle; generator trees make several of them act as one.

/// Leaf/Composite trees of generators sharing one lifecycle.
pub mod composite;
/// Scheduled ADSR envelope.
pub mod envelope;
/// Lowpass stage with its own cutoff envelope.
pub mod filter;
/// On/off and weighted multi-input mixers.
pub mod mix;
/// Node groups and the capability traits shared by graph types.
pub mod node;
/// White, pink and brown looping noise.
pub mod noise;
/// Periodic oscillators and tuning.
pub mod oscillator;
/// Generation-based lifecycle for one-shot sources.
pub mod restartable;

pub use composite::{Composite, GeneratorTree};
pub use envelope::{EnvelopeGenerator, EnvelopePhaseTimeline};
pub use filter::LowpassFilter;
pub use mix::{AdditiveMixer, ToggleMixer};
pub use node::{Composable, NodeGroup, SignalSource, Startable};
pub use noise::{NoiseBank, NoiseSource, NoiseType};
pub use oscillator::{ShapeOscillator, TripleShapeOscillator, Tuning};
pub use restartable::{Restartable, RestartableGenerator};
