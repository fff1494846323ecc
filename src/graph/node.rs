use crate::{
    error::Result,
    io::provider::{EndedNotice, Endpoint, NodeId, SignalNodeProvider},
};

/// The provider nodes created together for one generation of a generator,
/// plus the links between them.
///
/// A group remembers which of its nodes are *endable* (sources that fire an
/// ended notice once stopped) and every link it made, so it can be torn down
/// without the generator having to remember its own topology.
#[derive(Debug, Default)]
pub struct NodeGroup {
    nodes: Vec<NodeId>,
    endables: Vec<NodeId>,
    links: Vec<(NodeId, Endpoint)>,
}

impl NodeGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a processing node
    pub fn track(&mut self, node: NodeId) -> NodeId {
        self.nodes.push(node);
        node
    }

    /// Take ownership of a source node that will report when it ends
    pub fn track_endable(&mut self, node: NodeId) -> NodeId {
        self.nodes.push(node);
        self.endables.push(node);
        node
    }

    /// Connect through the provider and record the link for teardown.
    pub fn connect(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        from: NodeId,
        to: impl Into<Endpoint>,
    ) -> Result<()> {
        let to = to.into();
        ctx.connect(from, to)?;
        self.links.push((from, to));
        Ok(())
    }

    pub fn endables(&self) -> &[NodeId] {
        &self.endables
    }

    pub fn owns(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Undo every link (newest first), then dispose every node.
    ///
    /// All steps are attempted even when one fails; the first error is returned.
    pub fn teardown(self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        let mut first_err = None;

        for &node in &self.endables {
            ctx.cancel_ended(node);
        }
        for &(from, to) in self.links.iter().rev() {
            if let Err(err) = ctx.disconnect(from, to) {
                first_err.get_or_insert(err);
            }
        }
        for &node in self.nodes.iter().rev() {
            if let Err(err) = ctx.dispose(node) {
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Anything with a connectable output
pub trait SignalSource {
    fn output(&self) -> NodeId;
}

/// Start/stop lifecycle shared by restartable generators and generator trees.
///
/// Times are absolute, on the provider's clock.
pub trait Startable {
    /// Begin emitting. Creates a fresh generation first if none is prepared.
    fn start_signal(&mut self, ctx: &mut dyn SignalNodeProvider, at: f64) -> Result<()>;

    /// Schedule the running generation to stop. Its nodes are torn down once
    /// every source in it has reported ended.
    fn stop_signal(&mut self, ctx: &mut dyn SignalNodeProvider, at: f64) -> Result<()>;

    /// Retire whatever is running now and prepare a fresh, unstarted generation.
    fn recreate_internal_nodes(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()>;

    /// Offer an ended notice. Returns `true` if it belonged to this node
    /// (including stale notices that were recognised and ignored).
    fn handle_ended(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        notice: &EndedNotice,
    ) -> Result<bool>;

    /// Dispose of every node, draining or not. The value is unusable afterwards.
    fn teardown(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()>;
}

/// Nodes that aggregate child nodes
pub trait Composable {
    type Child;

    fn children(&self) -> &[Self::Child];

    fn children_mut(&mut self) -> &mut [Self::Child];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{offline::OfflineProvider, provider::Waveform};

    #[test]
    fn teardown_removes_links_and_nodes() {
        let mut ctx = OfflineProvider::new();
        let sink = ctx.create_gain(1.0);

        let mut group = NodeGroup::new();
        let osc = group.track_endable(ctx.create_oscillator(Waveform::Sine));
        let gain = group.track(ctx.create_gain(0.5));
        group.connect(&mut ctx, osc, gain).unwrap();
        group.connect(&mut ctx, gain, sink).unwrap();

        assert_eq!(group.endables(), &[osc]);
        assert!(group.owns(gain));
        assert!(!group.owns(sink));

        group.teardown(&mut ctx).unwrap();
        assert_eq!(ctx.node_count(), 1);
        assert_eq!(ctx.link_count(), 0);
        assert!(ctx.contains(sink));
    }

    #[test]
    fn teardown_continues_after_error() {
        let mut ctx = OfflineProvider::new();
        let mut group = NodeGroup::new();
        let a = group.track(ctx.create_gain(1.0));
        let b = group.track(ctx.create_gain(1.0));
        group.connect(&mut ctx, a, b).unwrap();

        // someone else already removed the link
        ctx.disconnect(a, b.into()).unwrap();

        assert!(group.teardown(&mut ctx).is_err());
        assert_eq!(ctx.node_count(), 0);
    }
}
