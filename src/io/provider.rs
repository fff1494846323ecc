use std::sync::Arc;

use crate::error::Result;

/// Handle to a node owned by a [`SignalNodeProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Periodic waveform shapes a provider can synthesize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    Square,
    /// Variable duty cycle, controlled by [`Param::PulseWidth`]
    Pulse,
}

/// Scalar parameters that accept automation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Param {
    Gain,
    Frequency,
    /// In cents
    Detune,
    Q,
    Offset,
    PulseWidth,
}

/// A parameter of a specific node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamRef {
    pub node: NodeId,
    pub param: Param,
}

impl ParamRef {
    pub fn new(node: NodeId, param: Param) -> Self {
        Self { node, param }
    }
}

/// Where a node's output can be connected: another node's input, or one of
/// its parameters (in which case the signal is added to the parameter value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Node(NodeId),
    Param(ParamRef),
}

impl From<NodeId> for Endpoint {
    fn from(node: NodeId) -> Self {
        Endpoint::Node(node)
    }
}

impl From<ParamRef> for Endpoint {
    fn from(param: ParamRef) -> Self {
        Endpoint::Param(param)
    }
}

/// Identifies the restartable generator that registered an ended callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeneratorId(pub u64);

/// Attached to an ended callback so the notice can be routed back to the
/// generator generation that scheduled the stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndedToken {
    pub generator: GeneratorId,
    pub generation: u64,
}

/// Delivered by the provider once a stopped source has finished playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndedNotice {
    pub node: NodeId,
    pub token: EndedToken,
}

/// The host's audio graph: primitive stages, wiring, scheduled automation and
/// end-of-playback notification.
///
/// Every call only *schedules* work against the provider's clock; nothing
/// blocks waiting for playback. Ended callbacks are queued by the provider and
/// collected with [`take_ended`](SignalNodeProvider::take_ended).
pub trait SignalNodeProvider: Send {
    /// Monotonic audio clock, in seconds
    fn current_time(&self) -> f64;

    fn create_oscillator(&mut self, shape: Waveform) -> NodeId;

    /// Looping source playing back a pre-filled buffer
    fn create_noise(&mut self, buffer: Arc<[f32]>) -> NodeId;

    fn create_gain(&mut self, gain: f32) -> NodeId;

    fn create_lowpass(&mut self, cutoff_hz: f32, q: f32) -> NodeId;

    fn create_constant(&mut self, offset: f32) -> NodeId;

    fn connect(&mut self, from: NodeId, to: Endpoint) -> Result<()>;

    fn disconnect(&mut self, from: NodeId, to: Endpoint) -> Result<()>;

    /// Forget a node. Its links are dropped and pending callbacks cancelled.
    fn dispose(&mut self, node: NodeId) -> Result<()>;

    /// Step to `value` at `time`
    fn set_value_at(&mut self, param: ParamRef, value: f32, time: f64) -> Result<()>;

    /// Linear ramp from the previous event to `value`, arriving at `end_time`
    fn linear_ramp_to_value_at(&mut self, param: ParamRef, value: f32, end_time: f64)
        -> Result<()>;

    /// Drop every event after `time` and hold the value the parameter had at `time`
    fn cancel_and_hold_at(&mut self, param: ParamRef, time: f64) -> Result<()>;

    /// Value of a parameter at `time` according to its automation
    fn param_value(&self, param: ParamRef, time: f64) -> Option<f32>;

    /// Start a source. A source may only be started once.
    fn start(&mut self, node: NodeId, time: f64) -> Result<()>;

    /// Schedule a started source to stop. Calling again reschedules the stop.
    fn stop(&mut self, node: NodeId, time: f64) -> Result<()>;

    /// Register a one-shot ended notification for a source
    fn on_ended(&mut self, node: NodeId, token: EndedToken) -> Result<()>;

    /// Remove a registered ended notification, including one already queued
    fn cancel_ended(&mut self, node: NodeId);

    /// Collect the ended notices delivered since the last call
    fn take_ended(&mut self) -> Vec<EndedNotice>;
}
