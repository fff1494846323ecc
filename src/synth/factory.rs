use crate::{error::Result, io::provider::SignalNodeProvider, synth::voice::VoiceGraph};

/// Factory for creating voices with a specific patch/sound design
///
/// This is the "instrument design" layer - you configure your sound once,
/// then PolySynth uses this factory to build identical voice graphs, again
/// every time the pool is resized.
pub trait VoiceFactory: Send {
    type Graph: VoiceGraph;

    fn create_graph(&self, ctx: &mut dyn SignalNodeProvider) -> Result<Self::Graph>;
}

impl<F, G> VoiceFactory for F
where
    F: Fn(&mut dyn SignalNodeProvider) -> Result<G> + Send,
    G: VoiceGraph,
{
    type Graph = G;

    fn create_graph(&self, ctx: &mut dyn SignalNodeProvider) -> Result<Self::Graph> {
        self(ctx)
    }
}
