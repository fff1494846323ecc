use crate::{
    error::{Result, SynthError},
    graph::node::{Composable, SignalSource, Startable},
    io::provider::{EndedNotice, NodeId, SignalNodeProvider},
};

/*
Generator Trees
===============

A voice is usually built from several restartable generators that must start
and stop together: two oscillators plus a bank of noise sources, say. The tree
makes them one unit:

  Composite(mixer)
  ├── Leaf(osc 1)
  ├── Leaf(osc 2)
  └── Composite(noise mixer)
      ├── Leaf(white)
      ├── Leaf(pink)
      └── Leaf(brown)

Every lifecycle call fans out to the children in insertion order. Siblings are
independent: a failing child does not prevent the rest from being started or
stopped. The first error is reported after every child has been visited.

Leaves are a patch-specific type `L` (typically an enum over the generator
kinds a patch uses), so typed access to a single generator is a plain path
lookup (`leaf_at_mut(&[2, 0])`) rather than a downcast.

A composite's output is whatever node its children were wired into; the tree
does not do the wiring, the patch that builds it does.
*/

#[derive(Debug)]
pub enum GeneratorTree<L> {
    Leaf(L),
    Composite(Composite<L>),
}

#[derive(Debug)]
pub struct Composite<L> {
    output: NodeId,
    children: Vec<GeneratorTree<L>>,
}

impl<L> Composite<L> {
    pub fn new(output: NodeId, children: Vec<GeneratorTree<L>>) -> Self {
        Self { output, children }
    }

    pub fn push(&mut self, child: GeneratorTree<L>) {
        self.children.push(child);
    }
}

impl<L> Composable for Composite<L> {
    type Child = GeneratorTree<L>;

    fn children(&self) -> &[GeneratorTree<L>] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut [GeneratorTree<L>] {
        &mut self.children
    }
}

impl<L> GeneratorTree<L> {
    pub fn leaf(leaf: L) -> Self {
        GeneratorTree::Leaf(leaf)
    }

    pub fn composite(output: NodeId, children: Vec<GeneratorTree<L>>) -> Self {
        GeneratorTree::Composite(Composite::new(output, children))
    }

    /// Follow child indices from this node down to a leaf.
    /// An empty path addresses this node itself.
    pub fn leaf_at(&self, path: &[usize]) -> Option<&L> {
        match (self, path.split_first()) {
            (GeneratorTree::Leaf(leaf), None) => Some(leaf),
            (GeneratorTree::Composite(composite), Some((&index, rest))) => {
                composite.children.get(index)?.leaf_at(rest)
            }
            _ => None,
        }
    }

    pub fn leaf_at_mut(&mut self, path: &[usize]) -> Option<&mut L> {
        match (self, path.split_first()) {
            (GeneratorTree::Leaf(leaf), None) => Some(leaf),
            (GeneratorTree::Composite(composite), Some((&index, rest))) => {
                composite.children.get_mut(index)?.leaf_at_mut(rest)
            }
            _ => None,
        }
    }

    /// Depth-first, insertion order
    pub fn for_each_leaf_mut(&mut self, f: &mut impl FnMut(&mut L)) {
        match self {
            GeneratorTree::Leaf(leaf) => f(leaf),
            GeneratorTree::Composite(composite) => {
                for child in &mut composite.children {
                    child.for_each_leaf_mut(f);
                }
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            GeneratorTree::Leaf(_) => 1,
            GeneratorTree::Composite(composite) => {
                composite.children.iter().map(|c| c.leaf_count()).sum()
            }
        }
    }

    /// Apply `op` to every child, keep going on failure, return the first error.
    fn fan_out(
        children: &mut [GeneratorTree<L>],
        ctx: &mut dyn SignalNodeProvider,
        mut op: impl FnMut(&mut GeneratorTree<L>, &mut dyn SignalNodeProvider) -> Result<()>,
    ) -> Result<()>
    where
        L: Startable,
    {
        let mut first_err: Option<SynthError> = None;
        for child in children {
            if let Err(err) = op(child, ctx) {
                log::warn!("generator tree: {err}");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<L: SignalSource> SignalSource for GeneratorTree<L> {
    fn output(&self) -> NodeId {
        match self {
            GeneratorTree::Leaf(leaf) => leaf.output(),
            GeneratorTree::Composite(composite) => composite.output,
        }
    }
}

impl<L: Startable> Startable for GeneratorTree<L> {
    fn start_signal(&mut self, ctx: &mut dyn SignalNodeProvider, at: f64) -> Result<()> {
        match self {
            GeneratorTree::Leaf(leaf) => leaf.start_signal(ctx, at),
            GeneratorTree::Composite(composite) => {
                Self::fan_out(&mut composite.children, ctx, |child, ctx| {
                    child.start_signal(ctx, at)
                })
            }
        }
    }

    fn stop_signal(&mut self, ctx: &mut dyn SignalNodeProvider, at: f64) -> Result<()> {
        match self {
            GeneratorTree::Leaf(leaf) => leaf.stop_signal(ctx, at),
            GeneratorTree::Composite(composite) => {
                Self::fan_out(&mut composite.children, ctx, |child, ctx| {
                    child.stop_signal(ctx, at)
                })
            }
        }
    }

    fn recreate_internal_nodes(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        match self {
            GeneratorTree::Leaf(leaf) => leaf.recreate_internal_nodes(ctx),
            GeneratorTree::Composite(composite) => {
                Self::fan_out(&mut composite.children, ctx, |child, ctx| {
                    child.recreate_internal_nodes(ctx)
                })
            }
        }
    }

    fn handle_ended(
        &mut self,
        ctx: &mut dyn SignalNodeProvider,
        notice: &EndedNotice,
    ) -> Result<bool> {
        match self {
            GeneratorTree::Leaf(leaf) => leaf.handle_ended(ctx, notice),
            GeneratorTree::Composite(composite) => {
                for child in &mut composite.children {
                    if child.handle_ended(ctx, notice)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn teardown(&mut self, ctx: &mut dyn SignalNodeProvider) -> Result<()> {
        match self {
            GeneratorTree::Leaf(leaf) => leaf.teardown(ctx),
            GeneratorTree::Composite(composite) => {
                Self::fan_out(&mut composite.children, ctx, |child, ctx| child.teardown(ctx))
            }
        }
    }
}
