//! Task graphs: pragma-annotated regions and how they relate.
//!
//! Nodes and edges live in arenas and refer to each other by [`TaskNodeId`].
//! Edges are typed:
//!
//! - [`EdgeKind::Contains`]: structural nesting (a parallel region contains
//!   its loops);
//! - [`EdgeKind::Sequential`]: program order between sibling regions;
//! - [`EdgeKind::Concurrent`]: siblings that may run at the same time;
//! - [`EdgeKind::Depends`]: data dependency.
//!
//! A contained node without incoming sequential edges is the *head* of a
//! sequence; following sequential edges from a head visits the whole chain.

use std::collections::HashSet;
use std::fmt;

use log::debug;

use crate::error::{Error, Result};
use crate::operation::BehaviorModel;
use crate::pragma::Region;
use crate::result::NodeResult;
use crate::types::TaskNodeId;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EdgeKind {
    Contains,
    Sequential,
    Concurrent,
    Depends,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Sequential => "sequential",
            EdgeKind::Concurrent => "concurrent",
            EdgeKind::Depends => "depends",
        };
        f.write_str(name)
    }
}

/// One region of the task graph.
#[derive(Debug, Clone)]
pub struct TaskNode {
    id: TaskNodeId,
    region: Region,
    behavior_models: Vec<BehaviorModel>,
    pub result: NodeResult,
}

impl TaskNode {
    pub fn id(&self) -> TaskNodeId {
        self.id
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Behavior models recorded directly for this region.
    pub fn behavior_models(&self) -> &[BehaviorModel] {
        &self.behavior_models
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct TaskEdge {
    source: TaskNodeId,
    target: TaskNodeId,
    kind: EdgeKind,
}

#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    edges: Vec<TaskEdge>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGraph {
    /// Creates a graph holding only the root region.
    pub fn new() -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        };
        graph.add_node(Region::Root);
        graph
    }

    pub fn root(&self) -> TaskNodeId {
        TaskNodeId::new(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = TaskNodeId> {
        (0..self.nodes.len()).map(TaskNodeId::new)
    }

    pub fn add_node(&mut self, region: Region) -> TaskNodeId {
        let id = TaskNodeId::new(self.nodes.len());
        self.nodes.push(TaskNode {
            id,
            region,
            behavior_models: Vec::new(),
            result: NodeResult::new(),
        });
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    fn check(&self, id: TaskNodeId) -> Result<()> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(Error::UnknownNode(id))
        }
    }

    pub fn node(&self, id: TaskNodeId) -> Result<&TaskNode> {
        self.nodes.get(id.index()).ok_or(Error::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: TaskNodeId) -> Result<&mut TaskNode> {
        self.nodes.get_mut(id.index()).ok_or(Error::UnknownNode(id))
    }

    /// Records a behavior model for `id`.
    pub fn add_behavior_model(&mut self, id: TaskNodeId, model: BehaviorModel) -> Result<()> {
        self.node_mut(id)?.behavior_models.push(model);
        Ok(())
    }

    /// Adds a typed edge. Adding the same edge twice has no effect.
    pub fn add_edge(&mut self, source: TaskNodeId, target: TaskNodeId, kind: EdgeKind) -> Result<()> {
        self.check(source)?;
        self.check(target)?;

        let edge = TaskEdge { source, target, kind };
        if self.outgoing[source.index()].iter().any(|&e| self.edges[e] == edge) {
            return Ok(());
        }

        let e = self.edges.len();
        self.edges.push(edge);
        self.outgoing[source.index()].push(e);
        self.incoming[target.index()].push(e);
        Ok(())
    }

    /// Targets of the outgoing edges of `id` with the given kind, in insertion order.
    ///
    /// `id` must belong to this graph.
    pub(crate) fn out_neighbors(&self, id: TaskNodeId, kind: EdgeKind) -> impl Iterator<Item = TaskNodeId> + '_ {
        self.outgoing[id.index()]
            .iter()
            .map(|&e| self.edges[e])
            .filter(move |e| e.kind == kind)
            .map(|e| e.target)
    }

    /// Sources of the incoming edges of `id` with the given kind, in insertion order.
    ///
    /// `id` must belong to this graph.
    pub(crate) fn in_neighbors(&self, id: TaskNodeId, kind: EdgeKind) -> impl Iterator<Item = TaskNodeId> + '_ {
        self.incoming[id.index()]
            .iter()
            .map(|&e| self.edges[e])
            .filter(move |e| e.kind == kind)
            .map(|e| e.source)
    }

    /// Regions directly contained in `id`.
    pub fn contained(&self, id: TaskNodeId) -> Result<Vec<TaskNodeId>> {
        self.check(id)?;
        Ok(self.children(id))
    }

    /// A node is a sequence head iff it has no incoming sequential edge.
    pub fn is_sequence_head(&self, id: TaskNodeId) -> Result<bool> {
        self.check(id)?;
        Ok(self.is_head(id))
    }

    /// The chain started at `head`: `head` followed by every node reachable
    /// over sequential edges, each visited once, in breadth-first order.
    pub fn sequence(&self, head: TaskNodeId) -> Result<Vec<TaskNodeId>> {
        self.check(head)?;
        Ok(self.chain(head))
    }

    fn children(&self, id: TaskNodeId) -> Vec<TaskNodeId> {
        self.out_neighbors(id, EdgeKind::Contains).collect()
    }

    fn is_head(&self, id: TaskNodeId) -> bool {
        self.in_neighbors(id, EdgeKind::Sequential).next().is_none()
    }

    fn chain(&self, head: TaskNodeId) -> Vec<TaskNodeId> {
        let mut chain = vec![head];
        let mut visited = HashSet::from([head]);
        let mut i = 0;
        while i < chain.len() {
            let current = chain[i];
            for next in self.out_neighbors(current, EdgeKind::Sequential) {
                if visited.insert(next) {
                    chain.push(next);
                }
            }
            i += 1;
        }
        chain
    }

    /// Behavior models of the sequence-starting regions contained in `id`.
    ///
    /// Contained regions with an incoming sequential edge are skipped: they
    /// are reached through the chain of their head. For every head the
    /// models of its whole chain are collected, see
    /// [`TaskGraph::gather_sequence`].
    pub fn gather_behavior_models(&self, id: TaskNodeId) -> Result<Vec<BehaviorModel>> {
        self.check(id)?;
        let mut visited = HashSet::from([id]);
        Ok(self.gather_contained(id, &mut visited))
    }

    /// Behavior models of the chain started at `head`, in chain order.
    ///
    /// Each chain member contributes its own recorded models, followed by
    /// the models gathered from the regions it contains.
    pub fn gather_sequence(&self, head: TaskNodeId) -> Result<Vec<BehaviorModel>> {
        self.check(head)?;
        let mut visited = HashSet::new();
        Ok(self.gather_chain(head, &mut visited))
    }

    fn gather_contained(&self, id: TaskNodeId, visited: &mut HashSet<TaskNodeId>) -> Vec<BehaviorModel> {
        let mut gathered = Vec::new();
        for child in self.children(id) {
            if !self.is_head(child) {
                debug!("gather: {} is not a sequence head, skipping", child);
                continue;
            }
            gathered.extend(self.gather_chain(child, visited));
        }
        gathered
    }

    fn gather_chain(&self, head: TaskNodeId, visited: &mut HashSet<TaskNodeId>) -> Vec<BehaviorModel> {
        let mut gathered = Vec::new();
        for member in self.chain(head) {
            if !visited.insert(member) {
                continue;
            }
            gathered.extend(self.nodes[member.index()].behavior_models.iter().cloned());
            gathered.extend(self.gather_contained(member, visited));
        }
        gathered
    }

    /// Nodes reachable from the root over containment, children before parents.
    pub fn post_order(&self) -> Vec<TaskNodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = HashSet::from([self.root()]);
        // (node, whether its children were already pushed)
        let mut stack = vec![(self.root(), false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.children(id).into_iter().rev() {
                if visited.insert(child) {
                    stack.push((child, false));
                }
            }
        }
        order
    }
}
