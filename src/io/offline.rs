use std::{collections::BTreeMap, sync::Arc};

use crate::{
    error::{Result, SynthError},
    io::{
        automation::AutomationTimeline,
        provider::{
            EndedNotice, EndedToken, Endpoint, NodeId, Param, ParamRef, SignalNodeProvider,
            Waveform,
        },
    },
};

/*
Offline Provider
================

An in-process SignalNodeProvider with an explicit clock. It keeps the graph
bookkeeping a real host would (nodes, links, automation, source playback) but
does not synthesize samples; the voice management layer only needs to know
what is scheduled, what is connected and when sources finish.

The clock only moves when the owner calls `advance_to`/`advance_by`. Moving
it past a source's stop time marks the source as ended and queues its ended
notice, in stop-time order (ties by node id), so a test replaying the same
events always sees the same notices.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Oscillator(Waveform),
    Noise,
    Gain,
    Lowpass,
    Constant,
}

impl NodeKind {
    fn is_source(self) -> bool {
        matches!(
            self,
            NodeKind::Oscillator(_) | NodeKind::Noise | NodeKind::Constant
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Playback {
    /// Processing node, never started or stopped
    NotSource,
    Idle,
    Scheduled { start: f64, stop: Option<f64> },
    Ended,
}

#[derive(Debug)]
struct NodeState {
    kind: NodeKind,
    params: BTreeMap<Param, AutomationTimeline>,
    playback: Playback,
    ended_token: Option<EndedToken>,
    buffer_len: usize,
}

impl NodeState {
    fn new(kind: NodeKind, params: &[(Param, f32)]) -> Self {
        Self {
            kind,
            params: params
                .iter()
                .map(|&(param, value)| (param, AutomationTimeline::new(value)))
                .collect(),
            playback: if kind.is_source() {
                Playback::Idle
            } else {
                Playback::NotSource
            },
            ended_token: None,
            buffer_len: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct OfflineProvider {
    now: f64,
    next_id: u64,
    nodes: BTreeMap<NodeId, NodeState>,
    links: Vec<(NodeId, Endpoint)>,
    ended: Vec<EndedNotice>,
}

impl OfflineProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward and deliver ended notices for every source whose
    /// stop time has been reached. Moving backwards is ignored.
    pub fn advance_to(&mut self, time: f64) {
        if time < self.now {
            log::warn!("advance_to({time}): clock is already at {}", self.now);
            return;
        }
        self.now = time;

        let mut finished: Vec<(f64, NodeId)> = self
            .nodes
            .iter()
            .filter_map(|(&id, node)| match node.playback {
                Playback::Scheduled {
                    stop: Some(stop), ..
                } if stop <= time => Some((stop, id)),
                _ => None,
            })
            .collect();
        finished.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        for (_, id) in finished {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.playback = Playback::Ended;
                if let Some(token) = node.ended_token.take() {
                    self.ended.push(EndedNotice { node: id, token });
                }
            }
        }
    }

    pub fn advance_by(&mut self, seconds: f64) {
        self.advance_to(self.now + seconds);
    }

    /// Number of live (not disposed) nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(|n| n.kind)
    }

    pub fn playback(&self, node: NodeId) -> Option<Playback> {
        self.nodes.get(&node).map(|n| n.playback)
    }

    /// True while a source has started and not yet reached its stop time
    pub fn is_playing(&self, node: NodeId, time: f64) -> bool {
        match self.playback(node) {
            Some(Playback::Scheduled { start, stop }) => {
                start <= time && stop.map_or(true, |stop| time < stop)
            }
            _ => false,
        }
    }

    pub fn is_connected(&self, from: NodeId, to: impl Into<Endpoint>) -> bool {
        let to = to.into();
        self.links.iter().any(|&(f, t)| f == from && t == to)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Nodes wired into `to`'s input
    pub fn inputs_of(&self, to: NodeId) -> Vec<NodeId> {
        self.links
            .iter()
            .filter(|(_, t)| *t == Endpoint::Node(to))
            .map(|(f, _)| *f)
            .collect()
    }

    /// Events held by a parameter's automation timeline
    pub fn automation_len(&self, param: ParamRef) -> Option<usize> {
        self.nodes
            .get(&param.node)?
            .params
            .get(&param.param)
            .map(AutomationTimeline::len)
    }

    pub fn noise_buffer_len(&self, node: NodeId) -> Option<usize> {
        self.nodes
            .get(&node)
            .filter(|n| n.kind == NodeKind::Noise)
            .map(|n| n.buffer_len)
    }

    fn insert(&mut self, state: NodeState) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        log::trace!("create {id}: {:?}", state.kind);
        self.nodes.insert(id, state);
        id
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut NodeState> {
        self.nodes.get_mut(&node).ok_or(SynthError::UnknownNode(node))
    }

    fn timeline_mut(&mut self, param: ParamRef) -> Result<&mut AutomationTimeline> {
        self.node_mut(param.node)?
            .params
            .get_mut(&param.param)
            .ok_or(SynthError::UnknownParam {
                node: param.node,
                param: param.param,
            })
    }

    fn check_endpoint(&self, to: Endpoint) -> Result<()> {
        match to {
            Endpoint::Node(node) => match self.nodes.get(&node) {
                Some(_) => Ok(()),
                None => Err(SynthError::UnknownNode(node)),
            },
            Endpoint::Param(param) => {
                let node = self
                    .nodes
                    .get(&param.node)
                    .ok_or(SynthError::UnknownNode(param.node))?;
                if node.params.contains_key(&param.param) {
                    Ok(())
                } else {
                    Err(SynthError::UnknownParam {
                        node: param.node,
                        param: param.param,
                    })
                }
            }
        }
    }
}

impl SignalNodeProvider for OfflineProvider {
    fn current_time(&self) -> f64 {
        self.now
    }

    fn create_oscillator(&mut self, shape: Waveform) -> NodeId {
        let mut params = vec![(Param::Frequency, 440.0), (Param::Detune, 0.0)];
        if shape == Waveform::Pulse {
            params.push((Param::PulseWidth, 0.5));
        }
        self.insert(NodeState::new(NodeKind::Oscillator(shape), &params))
    }

    fn create_noise(&mut self, buffer: Arc<[f32]>) -> NodeId {
        let mut state = NodeState::new(NodeKind::Noise, &[]);
        state.buffer_len = buffer.len();
        self.insert(state)
    }

    fn create_gain(&mut self, gain: f32) -> NodeId {
        self.insert(NodeState::new(NodeKind::Gain, &[(Param::Gain, gain)]))
    }

    fn create_lowpass(&mut self, cutoff_hz: f32, q: f32) -> NodeId {
        self.insert(NodeState::new(
            NodeKind::Lowpass,
            &[
                (Param::Frequency, cutoff_hz),
                (Param::Detune, 0.0),
                (Param::Q, q),
            ],
        ))
    }

    fn create_constant(&mut self, offset: f32) -> NodeId {
        self.insert(NodeState::new(
            NodeKind::Constant,
            &[(Param::Offset, offset)],
        ))
    }

    fn connect(&mut self, from: NodeId, to: Endpoint) -> Result<()> {
        if !self.nodes.contains_key(&from) {
            return Err(SynthError::UnknownNode(from));
        }
        self.check_endpoint(to)?;
        if !self.is_connected(from, to) {
            self.links.push((from, to));
        }
        Ok(())
    }

    fn disconnect(&mut self, from: NodeId, to: Endpoint) -> Result<()> {
        let before = self.links.len();
        self.links.retain(|&(f, t)| !(f == from && t == to));
        if self.links.len() == before {
            return Err(SynthError::NotConnected { from, to });
        }
        Ok(())
    }

    fn dispose(&mut self, node: NodeId) -> Result<()> {
        if self.nodes.remove(&node).is_none() {
            return Err(SynthError::UnknownNode(node));
        }
        self.links.retain(|&(from, to)| {
            let touches_target = match to {
                Endpoint::Node(id) => id == node,
                Endpoint::Param(param) => param.node == node,
            };
            from != node && !touches_target
        });
        self.ended.retain(|notice| notice.node != node);
        log::trace!("dispose {node}");
        Ok(())
    }

    fn set_value_at(&mut self, param: ParamRef, value: f32, time: f64) -> Result<()> {
        let now = self.now;
        let timeline = self.timeline_mut(param)?;
        timeline.set_value_at(value, time);
        timeline.forget_before(now);
        Ok(())
    }

    fn linear_ramp_to_value_at(
        &mut self,
        param: ParamRef,
        value: f32,
        end_time: f64,
    ) -> Result<()> {
        let now = self.now;
        let timeline = self.timeline_mut(param)?;
        timeline.linear_ramp_to_value_at(value, end_time, now);
        timeline.forget_before(now);
        Ok(())
    }

    fn cancel_and_hold_at(&mut self, param: ParamRef, time: f64) -> Result<()> {
        self.timeline_mut(param)?.cancel_and_hold_at(time);
        Ok(())
    }

    fn param_value(&self, param: ParamRef, time: f64) -> Option<f32> {
        self.nodes
            .get(&param.node)?
            .params
            .get(&param.param)
            .map(|timeline| timeline.value_at(time))
    }

    fn start(&mut self, node: NodeId, time: f64) -> Result<()> {
        let state = self.node_mut(node)?;
        match state.playback {
            Playback::Idle => {
                state.playback = Playback::Scheduled {
                    start: time,
                    stop: None,
                };
                Ok(())
            }
            Playback::NotSource => Err(SynthError::InvalidNodeState {
                node,
                reason: "not a source",
            }),
            _ => Err(SynthError::InvalidNodeState {
                node,
                reason: "source can only be started once",
            }),
        }
    }

    fn stop(&mut self, node: NodeId, time: f64) -> Result<()> {
        let state = self.node_mut(node)?;
        match state.playback {
            Playback::Scheduled { start, .. } => {
                state.playback = Playback::Scheduled {
                    start,
                    stop: Some(time.max(start)),
                };
                Ok(())
            }
            // stopping a finished source is harmless
            Playback::Ended => Ok(()),
            Playback::Idle => Err(SynthError::InvalidNodeState {
                node,
                reason: "source was never started",
            }),
            Playback::NotSource => Err(SynthError::InvalidNodeState {
                node,
                reason: "not a source",
            }),
        }
    }

    fn on_ended(&mut self, node: NodeId, token: EndedToken) -> Result<()> {
        let state = self.node_mut(node)?;
        if state.playback == Playback::Ended {
            self.ended.push(EndedNotice { node, token });
        } else {
            state.ended_token = Some(token);
        }
        Ok(())
    }

    fn cancel_ended(&mut self, node: NodeId) {
        if let Some(state) = self.nodes.get_mut(&node) {
            state.ended_token = None;
        }
        self.ended.retain(|notice| notice.node != node);
    }

    fn take_ended(&mut self) -> Vec<EndedNotice> {
        std::mem::take(&mut self.ended)
    }
}
