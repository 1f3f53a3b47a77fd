//! Per-node result computation.
//!
//! A [`Predictor`] dispatches on the region kind of a task-graph node. Only
//! parallel regions have a computation:
//!
//! 1. every contained sequence head contributes the composition sub-tree of
//!    its chain ([`composition_tree`]);
//! 2. the sub-trees are joined as `SEQ[PAR[..], PAR[..], ..]`, one singleton
//!    `PAR` per contained chain;
//! 3. the tree is unpacked into one [`SchedulingGraph`];
//! 4. the race detector runs on the graph and its findings are stored on the
//!    node.
//!
//! Every other kind is reported as [`Outcome::Unsupported`] and leaves the
//! node marked as such, so callers can tell incomplete coverage apart from a
//! clean result.
//!
//! # Example
//!
//! ```
//! use racegraph::detector::RaceDetector;
//! use racegraph::operation::BehaviorModel;
//! use racegraph::pragma::{PragmaKind, Region, SourceSpan};
//! use racegraph::predict::{Outcome, Predictor};
//! use racegraph::result::{DataRace, NodeResult, State};
//! use racegraph::scheduling::SchedulingGraph;
//! use racegraph::task_graph::{EdgeKind, TaskGraph};
//! use racegraph::types::ThreadId;
//!
//! let mut graph = TaskGraph::new();
//! let parallel = graph.add_node(Region::new(PragmaKind::Parallel, SourceSpan::new(1, 1, 9)));
//! let body = graph.add_node(Region::new(PragmaKind::For, SourceSpan::new(1, 2, 8)));
//! graph.add_edge(parallel, body, EdgeKind::Contains).unwrap();
//! graph.add_behavior_model(body, BehaviorModel::new(ThreadId::new(0)).write("x")).unwrap();
//!
//! let detector = |g: &SchedulingGraph, _: &[u32], _: &NodeResult| -> (Vec<DataRace>, Vec<State>) {
//!     assert_eq!(g.len(), 2);
//!     (Vec::new(), Vec::new())
//! };
//! let predictor = Predictor::new(detector);
//! let outcome = predictor.compute(&mut graph, parallel).unwrap();
//! assert_eq!(outcome, Outcome::Computed { data_races: 0, states: 0 });
//! ```

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::composition::CompositionTree;
use crate::config::SchedulerConfig;
use crate::detector::{Identity, Normalizer, RaceDetector};
use crate::error::{Error, Result};
use crate::pragma::{PragmaKind, Region};
use crate::result::Unsupported;
use crate::scheduling::SchedulingGraph;
use crate::task_graph::TaskGraph;
use crate::types::TaskNodeId;

/// What happened to one node.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outcome {
    Computed { data_races: usize, states: usize },
    Unsupported(Unsupported),
}

/// Result of walking a whole task graph.
#[derive(Debug, Default)]
pub struct Summary {
    pub computed: Vec<TaskNodeId>,
    pub unsupported: Vec<(TaskNodeId, Unsupported)>,
    pub failed: Vec<(TaskNodeId, Error)>,
}

impl Summary {
    /// Whether every visited node was computed.
    pub fn is_complete(&self) -> bool {
        self.unsupported.is_empty() && self.failed.is_empty()
    }
}

pub struct Predictor<D, N = Identity> {
    config: SchedulerConfig,
    normalizer: N,
    detector: D,
}

impl<D> Predictor<D, Identity>
where
    D: RaceDetector,
{
    pub fn new(detector: D) -> Self {
        Self {
            config: SchedulerConfig::default(),
            normalizer: Identity,
            detector,
        }
    }
}

impl<D, N> Predictor<D, N>
where
    D: RaceDetector,
    N: Normalizer,
{
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_normalizer<M: Normalizer>(self, normalizer: M) -> Predictor<D, M> {
        Predictor {
            config: self.config,
            normalizer,
            detector: self.detector,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Computes the result of `node` and stores it on the node.
    ///
    /// Structural errors of the computation are returned; unsupported kinds
    /// are an [`Outcome`], not an error.
    pub fn compute(&self, task_graph: &mut TaskGraph, node: TaskNodeId) -> Result<Outcome> {
        let region = task_graph.node(node)?.region().clone();
        let reason = match &region {
            Region::Parallel(_) => return self.compute_parallel(task_graph, node),
            Region::For(_) => Unsupported::Kind(PragmaKind::For),
            Region::Barrier(_) => Unsupported::Kind(PragmaKind::Barrier),
            Region::Single(_) => Unsupported::Kind(PragmaKind::Single),
            Region::Task(_) => Unsupported::Kind(PragmaKind::Task),
            Region::TaskWait(_) => Unsupported::Kind(PragmaKind::TaskWait),
            Region::Unrecognized { directive, .. } => Unsupported::Unrecognized(directive.clone()),
            Region::Root => Unsupported::Root,
        };

        warn!("{} ({}): {}", node, region, reason);
        task_graph.node_mut(node)?.result.set_unsupported(reason.clone());
        Ok(Outcome::Unsupported(reason))
    }

    fn compute_parallel(&self, task_graph: &mut TaskGraph, node: TaskNodeId) -> Result<Outcome> {
        let tree = composition_tree(task_graph, node)?;
        let scope = task_graph.node_mut(node)?.result.renew_fingerprint();

        let graph = match tree {
            Some(tree) => {
                debug!("{}: composition tree {}", node, tree);
                tree.unpack(scope, &self.normalizer, &self.config)?
            }
            None => {
                debug!("{}: no behavior models", node);
                SchedulingGraph::build(&[], &self.config)?
            }
        };
        let dimensions = graph.dimensions().to_vec();

        let result = &mut task_graph.node_mut(node)?.result;
        let (data_races, states) = self.detector.detect(&graph, &dimensions, result);
        let outcome = Outcome::Computed {
            data_races: data_races.len(),
            states: states.len(),
        };
        info!(
            "{}: {} states in graph, {} races, {} final states",
            node,
            graph.len(),
            data_races.len(),
            states.len()
        );
        result.set_computed(data_races, states);

        Ok(outcome)
    }

    /// Computes every node reachable from the root, children before parents.
    ///
    /// Failures of single nodes are collected in the [`Summary`] rather than
    /// aborting the walk.
    pub fn compute_all(&self, task_graph: &mut TaskGraph) -> Summary {
        let mut summary = Summary::default();
        for node in task_graph.post_order() {
            if node == task_graph.root() {
                continue;
            }
            match self.compute(task_graph, node) {
                Ok(Outcome::Computed { .. }) => summary.computed.push(node),
                Ok(Outcome::Unsupported(reason)) => summary.unsupported.push((node, reason)),
                Err(err) => {
                    warn!("{}: computation failed: {}", node, err);
                    summary.failed.push((node, err));
                }
            }
        }
        info!(
            "computed {} nodes, {} unsupported, {} failed",
            summary.computed.len(),
            summary.unsupported.len(),
            summary.failed.len()
        );
        summary
    }
}

/// Composition tree of a parallel region: `SEQ[PAR[c₁], PAR[c₂], ..]` with
/// one entry per contained chain that has any behavior models.
///
/// `None` if no contained region records a behavior model.
pub fn composition_tree(task_graph: &TaskGraph, node: TaskNodeId) -> Result<Option<CompositionTree>> {
    let mut visited = HashSet::from([node]);
    let mut entries = Vec::new();
    for child in task_graph.contained(node)? {
        if !task_graph.is_sequence_head(child)? {
            continue;
        }
        match chain_tree(task_graph, child, &mut visited)? {
            Some(sub) => entries.extend(CompositionTree::par(vec![sub])),
            None => debug!("{}: {} has no behavior models, skipping", node, child),
        }
    }
    Ok(CompositionTree::seq(entries))
}

/// Builds a composite, collapsing a single child into itself.
fn collapse(mut trees: Vec<CompositionTree>, compose: fn(Vec<CompositionTree>) -> Option<CompositionTree>) -> Option<CompositionTree> {
    if trees.len() == 1 {
        trees.pop()
    } else {
        compose(trees)
    }
}

/// Members of a chain run one after another.
fn chain_tree(
    task_graph: &TaskGraph,
    head: TaskNodeId,
    visited: &mut HashSet<TaskNodeId>,
) -> Result<Option<CompositionTree>> {
    let mut members = Vec::new();
    for member in task_graph.sequence(head)? {
        if visited.insert(member) {
            members.extend(member_tree(task_graph, member, visited)?);
        }
    }
    Ok(collapse(members, CompositionTree::seq))
}

/// The models recorded for a region run concurrently (one per thread); the
/// chains it contains follow them.
fn member_tree(
    task_graph: &TaskGraph,
    member: TaskNodeId,
    visited: &mut HashSet<TaskNodeId>,
) -> Result<Option<CompositionTree>> {
    let own: Vec<CompositionTree> = task_graph
        .node(member)?
        .behavior_models()
        .iter()
        .cloned()
        .map(CompositionTree::Leaf)
        .collect();

    let mut parts: Vec<CompositionTree> = collapse(own, CompositionTree::par).into_iter().collect();
    for child in task_graph.contained(member)? {
        if task_graph.is_sequence_head(child)? {
            parts.extend(chain_tree(task_graph, child, visited)?);
        }
    }
    Ok(collapse(parts, CompositionTree::seq))
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::operation::BehaviorModel;
    use crate::pragma::SourceSpan;
    use crate::result::{DataRace, NodeResult, ResultStatus, State};
    use crate::task_graph::EdgeKind;
    use crate::types::ThreadId;

    fn region(kind: PragmaKind, line: u32) -> Region {
        Region::new(kind, SourceSpan::new(1, line, line))
    }

    fn write(thread: u32, var: &str) -> BehaviorModel {
        BehaviorModel::new(ThreadId::new(thread)).write(var)
    }

    fn no_races(_: &SchedulingGraph, _: &[u32], _: &NodeResult) -> (Vec<DataRace>, Vec<State>) {
        (Vec::new(), Vec::new())
    }

    /// parallel { for a ; for b }
    fn two_loops() -> (TaskGraph, TaskNodeId, TaskNodeId, TaskNodeId) {
        let mut graph = TaskGraph::new();
        let p = graph.add_node(region(PragmaKind::Parallel, 1));
        let a = graph.add_node(region(PragmaKind::For, 2));
        let b = graph.add_node(region(PragmaKind::For, 6));
        graph.add_edge(graph.root(), p, EdgeKind::Contains).unwrap();
        graph.add_edge(p, a, EdgeKind::Contains).unwrap();
        graph.add_edge(p, b, EdgeKind::Contains).unwrap();
        graph.add_behavior_model(a, write(0, "x")).unwrap();
        graph.add_behavior_model(b, write(1, "y").write("z")).unwrap();
        (graph, p, a, b)
    }

    #[test]
    fn test_tree_shape_two_loops() {
        let (graph, p, _, _) = two_loops();
        let tree = composition_tree(&graph, p).unwrap().unwrap();
        assert_eq!(tree.to_string(), "SEQ[PAR[t0#1], PAR[t1#2]]");
    }

    #[test]
    fn test_tree_multi_thread_loop() {
        let (mut graph, p, a, _) = two_loops();
        graph.add_behavior_model(a, write(2, "x")).unwrap();
        let tree = composition_tree(&graph, p).unwrap().unwrap();
        assert_eq!(tree.to_string(), "SEQ[PAR[PAR[t0#1, t2#1]], PAR[t1#2]]");
    }

    #[test]
    fn test_tree_chain() {
        let (mut graph, p, a, b) = two_loops();
        graph.add_edge(a, b, EdgeKind::Sequential).unwrap();
        let tree = composition_tree(&graph, p).unwrap().unwrap();
        assert_eq!(tree.to_string(), "SEQ[PAR[SEQ[t0#1, t1#2]]]");
    }

    #[test]
    fn test_tree_leaves_match_gathering() {
        let (mut graph, p, a, b) = two_loops();
        let t = graph.add_node(region(PragmaKind::Task, 3));
        graph.add_edge(a, t, EdgeKind::Contains).unwrap();
        graph.add_behavior_model(t, write(3, "w")).unwrap();
        graph.add_edge(a, b, EdgeKind::Sequential).unwrap();

        let tree = composition_tree(&graph, p).unwrap().unwrap();
        let leaves: Vec<BehaviorModel> = tree.leaves().into_iter().cloned().collect();
        assert_eq!(leaves, graph.gather_behavior_models(p).unwrap());
        assert_eq!(tree.to_string(), "SEQ[PAR[SEQ[SEQ[t0#1, t3#1], t1#2]]]");
    }

    #[test]
    fn test_tree_empty() {
        let mut graph = TaskGraph::new();
        let p = graph.add_node(region(PragmaKind::Parallel, 1));
        let a = graph.add_node(region(PragmaKind::For, 2));
        graph.add_edge(p, a, EdgeKind::Contains).unwrap();
        assert_eq!(composition_tree(&graph, p).unwrap(), None);
    }

    #[test]
    fn test_tree_unknown_node() {
        let (graph, _, _, _) = two_loops();
        let err = composition_tree(&graph, TaskNodeId::new(99)).unwrap_err();
        assert!(matches!(err, Error::UnknownNode(_)));
    }

    #[test]
    fn test_compute_parallel() {
        let (mut graph, p, _, _) = two_loops();
        let predictor = Predictor::new(|g: &SchedulingGraph, dims: &[u32], _: &NodeResult| {
            // x ; (y, z): 2 + 3 states, dims max([1], [2])
            assert_eq!(g.len(), 5);
            assert_eq!(dims, &[2]);
            no_races(g, dims, &NodeResult::new())
        });

        let before = graph.node(p).unwrap().result.current_fingerprint();
        let outcome = predictor.compute(&mut graph, p).unwrap();
        assert_eq!(outcome, Outcome::Computed { data_races: 0, states: 0 });

        let result = &graph.node(p).unwrap().result;
        assert!(result.is_complete());
        assert_ne!(result.current_fingerprint(), before);
    }

    #[test]
    fn test_compute_stores_detector_output() {
        let (mut graph, p, _, _) = two_loops();
        let predictor = Predictor::new(|g: &SchedulingGraph, _: &[u32], _: &NodeResult| {
            let leaf = g.leaves()[0];
            let race = DataRace {
                var: "x".into(),
                first: g.payload(leaf).cloned().unwrap(),
                second: g.payload(leaf).cloned().unwrap(),
                state: Some(g.key(leaf).clone()),
            };
            let state = State {
                key: g.key(leaf).clone(),
                held_locks: Default::default(),
            };
            (vec![race], vec![state])
        });

        let outcome = predictor.compute(&mut graph, p).unwrap();
        assert_eq!(outcome, Outcome::Computed { data_races: 1, states: 1 });
        let result = &graph.node(p).unwrap().result;
        assert_eq!(result.data_races.len(), 1);
        assert_eq!(result.states.len(), 1);
    }

    #[test]
    fn test_compute_unsupported_kinds() {
        let mut graph = TaskGraph::new();
        let predictor = Predictor::new(no_races);
        for kind in [
            PragmaKind::For,
            PragmaKind::Barrier,
            PragmaKind::Single,
            PragmaKind::Task,
            PragmaKind::TaskWait,
        ] {
            let n = graph.add_node(region(kind, 1));
            let outcome = predictor.compute(&mut graph, n).unwrap();
            assert_eq!(outcome, Outcome::Unsupported(Unsupported::Kind(kind)));
            assert_eq!(
                graph.node(n).unwrap().result.status(),
                &ResultStatus::Unsupported(Unsupported::Kind(kind))
            );
        }

        let n = graph.add_node(Region::parse("critical", SourceSpan::new(1, 1, 1)));
        let outcome = predictor.compute(&mut graph, n).unwrap();
        assert_eq!(outcome, Outcome::Unsupported(Unsupported::Unrecognized("critical".into())));

        let root = graph.root();
        assert_eq!(
            predictor.compute(&mut graph, root).unwrap(),
            Outcome::Unsupported(Unsupported::Root)
        );
    }

    #[test]
    fn test_compute_unknown_node() {
        let mut graph = TaskGraph::new();
        let predictor = Predictor::new(no_races);
        let err = predictor.compute(&mut graph, TaskNodeId::new(9)).unwrap_err();
        assert!(matches!(err, Error::UnknownNode(_)));
    }

    #[test]
    fn test_compute_empty_parallel() {
        let mut graph = TaskGraph::new();
        let p = graph.add_node(region(PragmaKind::Parallel, 1));
        let predictor = Predictor::new(|g: &SchedulingGraph, dims: &[u32], prior: &NodeResult| {
            assert_eq!(g.len(), 1);
            no_races(g, dims, prior)
        });
        let outcome = predictor.compute(&mut graph, p).unwrap();
        assert_eq!(outcome, Outcome::Computed { data_races: 0, states: 0 });
    }

    #[test]
    fn test_compute_size_guard_is_fatal() {
        let (mut graph, p, _, _) = two_loops();
        let predictor = Predictor::new(no_races).with_config(SchedulerConfig::default().with_max_states(4));
        let err = predictor.compute(&mut graph, p).unwrap_err();
        assert!(matches!(err, Error::TooManyStates { .. }));
        assert_eq!(graph.node(p).unwrap().result.status(), &ResultStatus::Unprocessed);
    }

    #[test]
    fn test_compute_all() {
        let (mut graph, p, a, b) = two_loops();
        let predictor = Predictor::new(no_races);
        let summary = predictor.compute_all(&mut graph);

        assert_eq!(summary.computed, vec![p]);
        assert_eq!(
            summary.unsupported,
            vec![
                (a, Unsupported::Kind(PragmaKind::For)),
                (b, Unsupported::Kind(PragmaKind::For)),
            ]
        );
        assert!(summary.failed.is_empty());
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_compute_all_collects_failures() {
        let (mut graph, p, _, _) = two_loops();
        let predictor = Predictor::new(no_races).with_config(SchedulerConfig::default().with_max_states(2));
        let summary = predictor.compute_all(&mut graph);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, p);
        assert!(summary.computed.is_empty());
    }

    #[test]
    fn test_with_normalizer() {
        struct DropAll;
        impl Normalizer for DropAll {
            fn prepare(&self, models: Vec<BehaviorModel>) -> Vec<BehaviorModel> {
                models.into_iter().map(|m| BehaviorModel::new(m.thread())).collect()
            }
        }

        let (mut graph, p, _, _) = two_loops();
        let predictor = Predictor::new(|g: &SchedulingGraph, dims: &[u32], prior: &NodeResult| {
            assert_eq!(g.len(), 2);
            assert_eq!(dims, &[0]);
            no_races(g, dims, prior)
        })
        .with_normalizer(DropAll);
        assert!(matches!(predictor.compute(&mut graph, p), Ok(Outcome::Computed { .. })));
    }
}
