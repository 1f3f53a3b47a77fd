//! Scheduling graphs: the interleaving state space of concurrent behavior models.
//!
//! A [`SchedulingGraph`] built from `k` behavior models of lengths `n₁…nₖ` is
//! the product-order lattice of all progress vectors `v` with `0 ≤ vᵢ ≤ nᵢ`.
//! Every edge advances exactly one thread by one operation, so every
//! root-to-leaf path is one interleaving of the models.
//!
//! # Identity and memoization
//!
//! Nodes are stored in a hash-consing [`Table`] keyed by [`StateKey`]
//! (progress vector + scope fingerprint). A vector reached along two paths
//! resolves to the same node, so a lattice has exactly `Π(nᵢ+1)` nodes.
//! The fingerprint is fresh per graph instance, which keeps identities of
//! unrelated graphs apart once they are merged by composition.
//!
//! # Composition
//!
//! - [`SchedulingGraph::sequential_compose`] chains another graph after every
//!   completion state of this one.
//! - [`SchedulingGraph::parallel_compose`] replaces this graph with the
//!   asynchronous product of both graphs: operations of either side may
//!   interleave freely, each side keeps its own order.
//!
//! Both consume the other graph and merge into `self` in place.
//!
//! # Examples
//!
//! ```
//! use racegraph::config::SchedulerConfig;
//! use racegraph::operation::BehaviorModel;
//! use racegraph::scheduling::SchedulingGraph;
//! use racegraph::types::ThreadId;
//!
//! let x = BehaviorModel::new(ThreadId::new(0)).write("v");
//! let y = BehaviorModel::new(ThreadId::new(1)).write("v");
//!
//! let graph = SchedulingGraph::build(&[x, y], &SchedulerConfig::default()).unwrap();
//! assert_eq!(graph.len(), 4);
//! assert_eq!(graph.edge_count(), 4);
//! assert_eq!(graph.leaves().len(), 1);
//! ```

use std::collections::{BTreeSet, VecDeque};
use std::fmt::Debug;
use std::sync::Arc;

use log::debug;

use crate::config::SchedulerConfig;
use crate::error::{Error, Result, Side};
use crate::operation::{BehaviorModel, Operation};
use crate::progress::{combine_dimensions, Fingerprint, ProgressVector, StateKey};
use crate::reference::StateRef;
use crate::table::Table;
use crate::types::{ScopeId, ThreadId};

/// A transition between two states.
///
/// `op` is the operation performed by the transition. Transitions added by
/// sequential composition (completion of one graph to the start of the next)
/// perform no operation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Edge {
    pub target: StateRef,
    pub op: Option<Operation>,
}

#[derive(Clone)]
pub struct SchedulingGraph {
    config: SchedulerConfig,
    table: Table<StateKey>,
    /// Index-aligned with `table`; slot 0 belongs to the sentinel.
    payloads: Vec<Option<Operation>>,
    out_edges: Vec<Vec<Edge>>,
    in_edges: Vec<Vec<StateRef>>,
    edge_count: usize,
    root: Option<StateRef>,
    dimensions: Vec<u32>,
    scope: ScopeId,
    scopes: BTreeSet<ScopeId>,
    lock_names: BTreeSet<Arc<str>>,
    var_names: BTreeSet<Arc<str>>,
}

impl Debug for SchedulingGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulingGraph")
            .field("scope", &self.scope)
            .field("dimensions", &self.dimensions)
            .field("states", &self.len())
            .field("edges", &self.edge_count)
            .finish()
    }
}

/// Builds the initial lattice for a flat set of behavior models.
///
/// Returns the graph together with its dimensions (the model lengths).
pub fn create_scheduling_graph(
    behavior_models: &[BehaviorModel],
    config: &SchedulerConfig,
) -> Result<(SchedulingGraph, Vec<u32>)> {
    let graph = SchedulingGraph::build(behavior_models, config)?;
    let dimensions = graph.dimensions().to_vec();
    Ok((graph, dimensions))
}

fn check_limit(required: Option<u128>, config: &SchedulerConfig) -> Result<()> {
    let limit = config.state_limit();
    match required {
        Some(required) if required <= limit as u128 => Ok(()),
        required => Err(Error::TooManyStates {
            required: required.unwrap_or(u128::MAX),
            limit,
        }),
    }
}

/// Length of one model as a lattice dimension.
fn dimension(len: usize, config: &SchedulerConfig) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::TooManyStates {
        required: len as u128 + 1,
        limit: config.state_limit(),
    })
}

impl SchedulingGraph {
    /// A graph with no states at all.
    ///
    /// Empty graphs cannot take part in composition.
    pub fn empty(config: &SchedulerConfig) -> Self {
        Self {
            config: config.clone(),
            table: Table::new(config.table_bits),
            payloads: vec![None],
            out_edges: vec![Vec::new()],
            in_edges: vec![Vec::new()],
            edge_count: 0,
            root: None,
            dimensions: Vec::new(),
            scope: ScopeId::fresh(),
            scopes: BTreeSet::new(),
            lock_names: BTreeSet::new(),
            var_names: BTreeSet::new(),
        }
    }

    /// Builds the full interleaving lattice of `behavior_models`.
    ///
    /// Fails with [`Error::TooManyStates`] before allocating any state if the
    /// lattice would exceed [`SchedulerConfig::max_states`].
    pub fn build(behavior_models: &[BehaviorModel], config: &SchedulerConfig) -> Result<Self> {
        let dimensions = behavior_models
            .iter()
            .map(|m| dimension(m.len(), config))
            .collect::<Result<Vec<u32>>>()?;

        let required = dimensions
            .iter()
            .try_fold(1u128, |acc, &n| acc.checked_mul(n as u128 + 1));
        check_limit(required, config)?;

        let mut graph = Self::empty(config);
        let fingerprint = Fingerprint::single(graph.scope);
        graph.scopes.insert(graph.scope);

        let root_key = StateKey::new(ProgressVector::zero(dimensions.len()), fingerprint.clone());
        let (root, _) = graph.insert(root_key, None);
        graph.root = Some(root);

        let mut queue = VecDeque::from([root]);
        while let Some(node) = queue.pop_front() {
            let progress = graph.key(node).progress.clone();
            for (i, model) in behavior_models.iter().enumerate() {
                let done = progress.get(i);
                if done >= dimensions[i] {
                    continue;
                }
                let op = model.operations()[done as usize].clone();
                let key = StateKey::new(progress.advanced(i), fingerprint.clone());
                let (next, fresh) = graph.insert(key, Some(op.clone()));
                if fresh {
                    queue.push_back(next);
                }
                graph.add_edge(node, next, Some(op));
            }
        }

        for model in behavior_models {
            graph.lock_names.extend(model.lock_names());
            graph.var_names.extend(model.var_names());
        }
        graph.dimensions = dimensions;

        debug!(
            "build: {} models, dims = {:?}, {} states, {} edges, scope {}",
            behavior_models.len(),
            graph.dimensions,
            graph.len(),
            graph.edge_count,
            graph.scope
        );

        Ok(graph)
    }
}

impl SchedulingGraph {
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// The unique start state (all-zero progress), if the graph is not empty.
    pub fn root(&self) -> Option<StateRef> {
        self.root
    }

    /// All states without outgoing transitions.
    pub fn leaves(&self) -> Vec<StateRef> {
        self.states().filter(|&s| self.is_leaf(s)).collect()
    }

    /// All states, in insertion order.
    pub fn states(&self) -> impl Iterator<Item = StateRef> + '_ {
        self.table.indices().map(StateRef::from)
    }

    pub fn is_leaf(&self, state: StateRef) -> bool {
        self.out_edges[state.index()].is_empty()
    }

    pub fn key(&self, state: StateRef) -> &StateKey {
        self.table.value(state.index())
    }

    /// The operation of the transition that first reached `state`.
    ///
    /// `None` for the roots of every merged graph. A state reachable along
    /// several transitions keeps the first one; [`Edge::op`] is the label of
    /// each individual transition.
    pub fn payload(&self, state: StateRef) -> Option<&Operation> {
        self.payloads[state.index()].as_ref()
    }

    /// Thread that performed the transition recorded as the payload.
    pub fn last_thread(&self, state: StateRef) -> Option<ThreadId> {
        self.payload(state).map(|op| op.thread())
    }

    pub fn out_edges(&self, state: StateRef) -> &[Edge] {
        &self.out_edges[state.index()]
    }

    pub fn successors(&self, state: StateRef) -> impl Iterator<Item = StateRef> + '_ {
        self.out_edges(state).iter().map(|e| e.target)
    }

    pub fn predecessors(&self, state: StateRef) -> &[StateRef] {
        &self.in_edges[state.index()]
    }

    /// Lengths of the participating behavior models.
    pub fn dimensions(&self) -> &[u32] {
        &self.dimensions
    }

    /// Fingerprint allocated for this graph instance.
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Fingerprints of every graph merged into this one.
    pub fn scopes(&self) -> &BTreeSet<ScopeId> {
        &self.scopes
    }

    pub fn lock_names(&self) -> &BTreeSet<Arc<str>> {
        &self.lock_names
    }

    pub fn var_names(&self) -> &BTreeSet<Arc<str>> {
        &self.var_names
    }

    /// States ordered so that every transition goes forward.
    pub fn topological_order(&self) -> Vec<StateRef> {
        let mut in_degree: Vec<usize> = self.in_edges.iter().map(|p| p.len()).collect();
        let mut queue: VecDeque<StateRef> = self.states().filter(|s| in_degree[s.index()] == 0).collect();
        let mut order = Vec::with_capacity(self.len());
        while let Some(state) = queue.pop_front() {
            order.push(state);
            for next in self.successors(state) {
                in_degree[next.index()] -= 1;
                if in_degree[next.index()] == 0 {
                    queue.push_back(next);
                }
            }
        }
        assert_eq!(order.len(), self.len(), "Scheduling graph must be acyclic");
        order
    }

    fn insert(&mut self, key: StateKey, payload: Option<Operation>) -> (StateRef, bool) {
        let (index, fresh) = self.table.put(key);
        if fresh {
            assert_eq!(index, self.payloads.len());
            self.payloads.push(payload);
            self.out_edges.push(Vec::new());
            self.in_edges.push(Vec::new());
        }
        (StateRef::from(index), fresh)
    }

    fn add_edge(&mut self, from: StateRef, to: StateRef, op: Option<Operation>) {
        let edges = &mut self.out_edges[from.index()];
        if edges.iter().any(|e| e.target == to) {
            return;
        }
        edges.push(Edge { target: to, op });
        self.in_edges[to.index()].push(from);
        self.edge_count += 1;
    }

    /// Follows op-less links from `state` to the state where the next
    /// operation (or the end) happens.
    ///
    /// Links only leave former leaves, so a linked state has no other
    /// transition.
    pub fn settle(&self, mut state: StateRef) -> StateRef {
        while let [Edge { target, op: None }] = self.out_edges(state) {
            state = *target;
        }
        state
    }

    /// Returns the roots of both operands.
    fn check_composable(&self, other: &SchedulingGraph) -> Result<(StateRef, StateRef)> {
        let root = self.root.ok_or(Error::EmptyGraph(Side::Target))?;
        let other_root = other.root.ok_or(Error::EmptyGraph(Side::Source))?;
        if let Some(&scope) = self.scopes.intersection(&other.scopes).next() {
            return Err(Error::FingerprintCollision(scope));
        }
        Ok((root, other_root))
    }

    fn merge_names(&mut self, other: &SchedulingGraph) {
        self.lock_names.extend(other.lock_names.iter().cloned());
        self.var_names.extend(other.var_names.iter().cloned());
        self.scopes.extend(other.scopes.iter().copied());
        self.dimensions = combine_dimensions(&self.dimensions, &other.dimensions);
    }

    /// Chains `other` after every completion state of `self`.
    ///
    /// The leaves of `self` (taken before the merge) get a transition to the
    /// root of `other`, so the resulting leaves are exactly the leaves of
    /// `other`. Dimensions are combined by positional maximum.
    pub fn sequential_compose(&mut self, other: SchedulingGraph) -> Result<()> {
        let (_, other_root) = self.check_composable(&other)?;

        let required = (self.len() as u128).checked_add(other.len() as u128);
        check_limit(required, &self.config)?;

        for index in other.table.indices() {
            let key = other.table.value(index);
            if self.table.find(key).is_some() {
                let scope = key.fingerprint.scopes().first().copied().unwrap_or(other.scope);
                return Err(Error::FingerprintCollision(scope));
            }
        }

        let leaves = self.leaves();

        // Source indices start at 1, so `remap[i - 1]` is the new handle of state `i`.
        let mut remap: Vec<StateRef> = Vec::with_capacity(other.len());
        for index in other.table.indices() {
            let key = other.table.value(index).clone();
            let (state, fresh) = self.insert(key, other.payloads[index].clone());
            assert!(fresh, "State {} already present in target", index);
            remap.push(state);
        }
        let lookup = |s: StateRef| remap[s.index() - 1];

        for index in other.table.indices() {
            let from = lookup(StateRef::from(index));
            for edge in &other.out_edges[index] {
                self.add_edge(from, lookup(edge.target), edge.op.clone());
            }
        }

        let other_root = lookup(other_root);
        for &leaf in &leaves {
            self.add_edge(leaf, other_root, None);
        }

        self.merge_names(&other);

        debug!(
            "sequential_compose: {} leaves linked to {}, {} states, dims = {:?}",
            leaves.len(),
            other_root,
            self.len(),
            self.dimensions
        );

        Ok(())
    }

    /// Replaces `self` with the concurrent composition of `self` and `other`.
    ///
    /// The result has one state per pair of settled states `(a, b)` (see
    /// [`SchedulingGraph::settle`]), a transition `(a, b) → (settle(a'), b)`
    /// for every transition `a → a'` of `self` and `(a, b) → (a, settle(b'))`
    /// for every transition `b → b'` of `other`. Op-less links are silent, so
    /// every interleaving of the two operation sets appears on exactly one
    /// path. Dimensions are combined by positional maximum.
    pub fn parallel_compose(&mut self, other: SchedulingGraph) -> Result<()> {
        let (a0, b0) = self.check_composable(&other)?;

        let required = (self.len() as u128).checked_mul(other.len() as u128);
        check_limit(required, &self.config)?;

        let mut product = Self::empty(&self.config);
        product.scope = self.scope;

        let pair_key = |a: StateRef, b: StateRef| {
            let ka = self.key(a);
            let kb = other.key(b);
            StateKey::new(
                ka.progress.concat(&kb.progress),
                ka.fingerprint.concat(&kb.fingerprint),
            )
        };

        let (a0, b0) = (self.settle(a0), other.settle(b0));
        let (root, _) = product.insert(pair_key(a0, b0), None);
        product.root = Some(root);

        // Settled states only carry operation transitions.
        let mut queue = VecDeque::from([(a0, b0, root)]);
        while let Some((a, b, node)) = queue.pop_front() {
            for edge in self.out_edges(a) {
                let a1 = self.settle(edge.target);
                let (next, fresh) = product.insert(pair_key(a1, b), edge.op.clone());
                if fresh {
                    queue.push_back((a1, b, next));
                }
                product.add_edge(node, next, edge.op.clone());
            }
            for edge in other.out_edges(b) {
                let b1 = other.settle(edge.target);
                let (next, fresh) = product.insert(pair_key(a, b1), edge.op.clone());
                if fresh {
                    queue.push_back((a, b1, next));
                }
                product.add_edge(node, next, edge.op.clone());
            }
        }

        self.table = product.table;
        self.payloads = product.payloads;
        self.out_edges = product.out_edges;
        self.in_edges = product.in_edges;
        self.edge_count = product.edge_count;
        self.root = product.root;
        self.merge_names(&other);

        debug!(
            "parallel_compose: {} states, {} edges, dims = {:?}",
            self.len(),
            self.edge_count,
            self.dimensions
        );

        Ok(())
    }
}
