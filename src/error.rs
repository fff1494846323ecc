use crate::io::provider::{Endpoint, NodeId, Param};
use crate::note::Note;

/// Errors raised by the provider plumbing and the lifecycle layer.
///
/// None of these cross the controller boundary: `PolySynth` logs them and
/// reports `false` or does nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthError {
    /// A setter received a value outside its documented range
    OutOfRangeParameter {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// The pool is non-empty but its bookkeeping points at a voice that is gone
    NoVoiceAvailable { note: Note },
    /// The provider has no node with this id (never created, or disposed)
    UnknownNode(NodeId),
    /// The node exists but does not expose this parameter
    UnknownParam { node: NodeId, param: Param },
    /// The operation is illegal in the node's current playback state
    InvalidNodeState { node: NodeId, reason: &'static str },
    /// Disconnect was requested for a link that does not exist
    NotConnected { from: NodeId, to: Endpoint },
}

pub type Result<T> = std::result::Result<T, SynthError>;

impl std::fmt::Display for SynthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthError::OutOfRangeParameter {
                name,
                value,
                min,
                max,
            } => write!(f, "{name} = {value} is outside [{min}, {max}]"),
            SynthError::NoVoiceAvailable { note } => {
                write!(f, "no voice available for {note}: allocation table is inconsistent")
            }
            SynthError::UnknownNode(node) => write!(f, "unknown node {node}"),
            SynthError::UnknownParam { node, param } => {
                write!(f, "node {node} has no {param:?} parameter")
            }
            SynthError::InvalidNodeState { node, reason } => {
                write!(f, "node {node}: {reason}")
            }
            SynthError::NotConnected { from, to } => {
                write!(f, "node {from} is not connected to {to:?}")
            }
        }
    }
}

impl std::error::Error for SynthError {}
