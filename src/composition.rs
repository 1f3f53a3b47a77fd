//! Composition trees: how sub-results of sibling regions combine.
//!
//! A [`CompositionTree`] is built for one region computation and consumed by
//! [`CompositionTree::unpack`], which turns it into a single
//! [`SchedulingGraph`]:
//!
//! - a [`CompositionTree::Leaf`] is rebound to the computation's scope,
//!   normalized and built into a lattice;
//! - a [`CompositionTree::Seq`] folds its children with
//!   [`SchedulingGraph::sequential_compose`];
//! - a [`CompositionTree::Par`] folds its children with
//!   [`SchedulingGraph::parallel_compose`].
//!
//! Composite nodes always have at least one child, so a composite with a
//! single child simply unpacks to that child.

use std::fmt;

use log::debug;

use crate::config::SchedulerConfig;
use crate::detector::Normalizer;
use crate::error::Result;
use crate::operation::BehaviorModel;
use crate::scheduling::{create_scheduling_graph, SchedulingGraph};
use crate::types::ScopeId;

/// Non-empty, ordered list of sub-trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Children {
    first: Box<CompositionTree>,
    rest: Vec<CompositionTree>,
}

impl Children {
    pub fn new(first: CompositionTree, rest: Vec<CompositionTree>) -> Self {
        Self {
            first: Box::new(first),
            rest,
        }
    }

    /// `None` if `trees` is empty.
    pub fn from_vec(trees: Vec<CompositionTree>) -> Option<Self> {
        let mut iter = trees.into_iter();
        let first = iter.next()?;
        Some(Self::new(first, iter.collect()))
    }

    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompositionTree> {
        std::iter::once(&*self.first).chain(self.rest.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositionTree {
    Leaf(BehaviorModel),
    Seq(Children),
    Par(Children),
}

impl CompositionTree {
    /// Sequential composite of `trees`, `None` if there are none.
    pub fn seq(trees: Vec<CompositionTree>) -> Option<Self> {
        Children::from_vec(trees).map(CompositionTree::Seq)
    }

    /// Parallel composite of `trees`, `None` if there are none.
    pub fn par(trees: Vec<CompositionTree>) -> Option<Self> {
        Children::from_vec(trees).map(CompositionTree::Par)
    }

    /// Behavior models at the leaves, left to right.
    pub fn leaves(&self) -> Vec<&BehaviorModel> {
        match self {
            CompositionTree::Leaf(model) => vec![model],
            CompositionTree::Seq(children) | CompositionTree::Par(children) => {
                children.iter().flat_map(|c| c.leaves()).collect()
            }
        }
    }

    /// Builds one scheduling graph for the whole tree.
    ///
    /// Every leaf is rebound to `scope` and passed through `normalizer`
    /// before its lattice is built. Structural errors from composition
    /// (and the size guard of `config`) are propagated.
    pub fn unpack<N>(self, scope: ScopeId, normalizer: &N, config: &SchedulerConfig) -> Result<SchedulingGraph>
    where
        N: Normalizer + ?Sized,
    {
        match self {
            CompositionTree::Leaf(mut model) => {
                model.rebind(scope);
                let models = normalizer.prepare(vec![model]);
                let (graph, dimensions) = create_scheduling_graph(&models, config)?;
                debug!("unpack: leaf with dims = {:?}", dimensions);
                Ok(graph)
            }
            CompositionTree::Seq(children) => {
                let Children { first, rest } = children;
                let mut graph = first.unpack(scope, normalizer, config)?;
                for child in rest {
                    graph.sequential_compose(child.unpack(scope, normalizer, config)?)?;
                }
                Ok(graph)
            }
            CompositionTree::Par(children) => {
                let Children { first, rest } = children;
                let mut graph = first.unpack(scope, normalizer, config)?;
                for child in rest {
                    graph.parallel_compose(child.unpack(scope, normalizer, config)?)?;
                }
                Ok(graph)
            }
        }
    }
}

impl fmt::Display for CompositionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (tag, children) = match self {
            CompositionTree::Leaf(model) => return write!(f, "{}#{}", model.thread(), model.len()),
            CompositionTree::Seq(children) => ("SEQ", children),
            CompositionTree::Par(children) => ("PAR", children),
        };
        write!(f, "{}[", tag)?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", child)?;
        }
        write!(f, "]")
    }
}
