use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    error::Result,
    graph::node::{NodeGroup, SignalSource, Startable},
    io::provider::{EndedNotice, EndedToken, GeneratorId, NodeId, SignalNodeProvider},
};

/*
Restartable Generators
======================

Provider sources are one-shot: once stopped, a source can never play again.
A voice, though, is started and stopped thousands of times. The wrapper here
hides that by building a fresh set of sources (a "generation") for every start.

A generator splits its nodes in two:
  - persistent nodes (its output, usually a gain or mixer), created once
  - per-generation nodes (the sources and anything in front of the output),
    created by `init_nodes` into a NodeGroup

Lifecycle of one generation:

  recreate ──▶ prepared ──start──▶ running ──stop(at)──▶ draining ──▶ torn down
                                                            │
                                  every endable source has reported ended

Stopping only *schedules* the sources to stop. The nodes must stay wired until
the sound has actually finished, so each endable source gets an ended callback
carrying the generation number. The group is torn down when the last pending
source reports, exactly once, whatever the order the notices arrive in. A
group with no endable sources is torn down immediately.

Generation numbers make late notices harmless: a notice only touches the
draining generation it names. Anything else (an already torn down generation,
a duplicate) is recognised and dropped.

Starting while older generations are still draining cuts them at the new start
time so two generations never sound on top of each other.
*/

static NEXT_GENERATOR_ID: AtomicU64 = AtomicU64::new(1);

/// A group of one-shot sources that can be rebuilt on demand.
///
/// Implementors only describe how to build one generation; [`Restartable`]
/// drives the lifecycle.
pub trait RestartableGenerator {
    /// Create this generation's nodes and wire them into the persistent
    /// output. Must not touch anything downstream of the output.
    fn init_nodes(&mut self, ctx: &mut dyn SignalNodeProvider, group: &mut NodeGroup)
        -> Result<()>;

    fn start_nodes(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        group: &NodeGroup,
        at: f64,
    ) -> Result<()> {
        for &node in group.endables() {
            ctx.start(node, at)?;
        }
        Ok(())
    }

    fn stop_nodes(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        group: &NodeGroup,
        at: f64,
    ) -> Result<()> {
        for &node in group.endables() {
            ctx.stop(node, at)?;
        }
        Ok(())
    }

    /// Sever and dispose one generation. Generators that keep handles to
    /// their live nodes override this to forget them.
    fn disconnect_nodes(&mut self, ctx: &mut dyn SignalNodeProvider, group: NodeGroup) -> Result<()> {
        group.teardown(ctx)
    }

    fn output(&self) -> NodeId;

    /// Dispose of the persistent nodes
    fn dispose(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()>;
}

#[derive(Debug)]
struct Generation {
    number: u64,
    group: NodeGroup,
}

#[derive(Debug)]
struct Draining {
    generation: Generation,
    /// Endable sources that have not reported yet
    pending: Vec<NodeId>,
    stop_at: f64,
}

/// Drives a [`RestartableGenerator`] through start/stop generations.
#[derive(Debug)]
pub struct Restartable<G> {
    id: GeneratorId,
    generator: G,
    next_generation: u64,
    prepared: Option<Generation>,
    running: Option<Generation>,
    draining: Vec<Draining>,
}

impl<G: RestartableGenerator> Restartable<G> {
    pub fn new(generator: G) -> Self {
        Self {
            id: GeneratorId(NEXT_GENERATOR_ID.fetch_add(1, Ordering::Relaxed)),
            generator,
            next_generation: 0,
            prepared: None,
            running: None,
            draining: Vec::new(),
        }
    }

    pub fn id(&self) -> GeneratorId {
        self.id
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut G {
        &mut self.generator
    }

    /// Number of the running generation, if any
    pub fn generation(&self) -> Option<u64> {
        self.running.as_ref().map(|g| g.number)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Stopped generations still waiting for their sources to end
    pub fn draining_count(&self) -> usize {
        self.draining.len()
    }

    /// Retire the running generation (stopping it now) and build a new one
    /// without starting it.
    pub fn recreate(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        let now = ctx.current_time();
        if let Some(running) = self.running.take() {
            self.retire(ctx, running, now)?;
        }
        if let Some(unused) = self.prepared.take() {
            self.generator.disconnect_nodes(ctx, unused.group)?;
        }
        self.prepared = Some(self.init_generation(ctx)?);
        Ok(())
    }

    /// `init_nodes`, then start. Uses the prepared generation when there is one.
    pub fn start_source(&mut self, ctx: &mut dyn SignalNodeProvider, at: f64) -> Result<()> {
        if let Some(running) = self.running.take() {
            self.retire(ctx, running, at)?;
        }
        self.cut_draining(ctx, at)?;

        let generation = match self.prepared.take() {
            Some(generation) => generation,
            None => self.init_generation(ctx)?,
        };

        if let Err(err) = self.generator.start_nodes(ctx, &generation.group, at) {
            self.discard(ctx, generation);
            return Err(err);
        }

        log::trace!(
            "generator {:?}: generation {} started at {at}",
            self.id,
            generation.number
        );
        self.running = Some(generation);
        Ok(())
    }

    pub fn stop_source(&mut self, ctx: &mut dyn SignalNodeProvider, at: f64) -> Result<()> {
        match self.running.take() {
            Some(running) => self.retire(ctx, running, at),
            None => {
                log::debug!("generator {:?}: stop without a running generation", self.id);
                Ok(())
            }
        }
    }

    pub fn handle_ended(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        notice: &EndedNotice,
    ) -> Result<bool> {
        if notice.token.generator != self.id {
            return Ok(false);
        }

        let generation = notice.token.generation;
        let Some(index) = self
            .draining
            .iter()
            .position(|d| d.generation.number == generation)
        else {
            log::trace!(
                "generator {:?}: ignoring stale ended notice for generation {generation}",
                self.id
            );
            return Ok(true);
        };

        let draining = &mut self.draining[index];
        draining.pending.retain(|&node| node != notice.node);
        if draining.pending.is_empty() {
            let drained = self.draining.remove(index);
            log::trace!(
                "generator {:?}: generation {generation} drained",
                self.id
            );
            self.generator
                .disconnect_nodes(ctx, drained.generation.group)?;
        }
        Ok(true)
    }

    pub fn teardown(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        let mut first_err = None;

        let groups = self
            .prepared
            .take()
            .into_iter()
            .chain(self.running.take())
            .chain(self.draining.drain(..).map(|d| d.generation))
            .collect::<Vec<_>>();

        for generation in groups {
            if let Err(err) = self.generator.disconnect_nodes(ctx, generation.group) {
                first_err.get_or_insert(err);
            }
        }
        if let Err(err) = self.generator.dispose(ctx) {
            first_err.get_or_insert(err);
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn init_generation(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<Generation> {
        let number = self.next_generation;
        self.next_generation += 1;

        let mut group = NodeGroup::new();
        match self.generator.init_nodes(ctx, &mut group) {
            Ok(()) => Ok(Generation { number, group }),
            Err(err) => {
                if let Err(cleanup) = group.teardown(ctx) {
                    log::warn!("generator {:?}: cleanup after failed init: {cleanup}", self.id);
                }
                Err(err)
            }
        }
    }

    fn retire(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        generation: Generation,
        at: f64,
    ) -> Result<()> {
        if generation.group.endables().is_empty() {
            return self.generator.disconnect_nodes(ctx, generation.group);
        }

        if let Err(err) = self.schedule_stop(ctx, &generation, at) {
            // no ended notices will arrive for it
            self.discard(ctx, generation);
            return Err(err);
        }

        let pending = generation.group.endables().to_vec();
        self.draining.push(Draining {
            generation,
            pending,
            stop_at: at,
        });
        Ok(())
    }

    fn schedule_stop(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        generation: &Generation,
        at: f64,
    ) -> Result<()> {
        self.generator.stop_nodes(ctx, &generation.group, at)?;

        let token = EndedToken {
            generator: self.id,
            generation: generation.number,
        };
        for &node in generation.group.endables() {
            ctx.on_ended(node, token)?;
        }
        Ok(())
    }

    fn cut_draining(&mut self, ctx: &mut dyn SignalNodeProvider, at: f64) -> Result<()> {
        for draining in self.draining.iter_mut().filter(|d| d.stop_at > at) {
            for &node in &draining.pending {
                ctx.stop(node, at)?;
            }
            draining.stop_at = at;
        }
        Ok(())
    }

    fn discard(&mut self, ctx: &mut dyn SignalNodeProvider, generation: Generation) {
        if let Err(err) = self.generator.disconnect_nodes(ctx, generation.group) {
            log::warn!("generator {:?}: discarding generation {}: {err}", self.id, generation.number);
        }
    }
}

impl<G: RestartableGenerator> SignalSource for Restartable<G> {
    fn output(&self) -> NodeId {
        self.generator.output()
    }
}

impl<G: RestartableGenerator> Startable for Restartable<G> {
    fn start_signal(&mut self, ctx: &mut dyn SignalNodeProvider, at: f64) -> Result<()> {
        self.start_source(ctx, at)
    }

    fn stop_signal(&mut self, ctx: &mut dyn SignalNodeProvider, at: f64) -> Result<()> {
        self.stop_source(ctx, at)
    }

    fn recreate_internal_nodes(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        self.recreate(ctx)
    }

    fn handle_ended(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        notice: &EndedNotice,
    ) -> Result<bool> {
        Restartable::handle_ended(self, ctx, notice)
    }

    fn teardown(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        Restartable::teardown(self, ctx)
    }
}
