//! Iterator over the interleavings of a scheduling graph.
//!
//! Every root-to-leaf path of a [`SchedulingGraph`] is one possible execution
//! order of the participating behavior models. The iterator yields the
//! operations along each path, skipping the operation-free transitions that
//! sequential composition inserts between sub-graphs.
//!
//! # Example
//!
//! ```
//! use racegraph::config::SchedulerConfig;
//! use racegraph::operation::BehaviorModel;
//! use racegraph::scheduling::SchedulingGraph;
//! use racegraph::types::ThreadId;
//!
//! let x = BehaviorModel::new(ThreadId::new(0)).write("a").write("b");
//! let y = BehaviorModel::new(ThreadId::new(1)).read("a");
//! let graph = SchedulingGraph::build(&[x, y], &SchedulerConfig::default()).unwrap();
//!
//! // 3! / (2! * 1!) orders
//! assert_eq!(graph.interleavings().count(), 3);
//! for path in graph.interleavings() {
//!     assert_eq!(path.len(), 3);
//! }
//! ```
//!
//! Note: the number of interleavings is exponential in the number of
//! operations, so use [`SchedulingGraph::count_interleavings`] when only
//! the number is needed.

use crate::operation::Operation;
use crate::reference::StateRef;
use crate::scheduling::SchedulingGraph;

impl SchedulingGraph {
    /// Returns an iterator over all root-to-leaf paths, as operation sequences.
    ///
    /// An empty graph has no paths. A graph consisting of a single state has
    /// exactly one, empty, path.
    pub fn interleavings(&self) -> Interleavings<'_> {
        Interleavings::new(self)
    }
}

/// Frame on the exploration stack.
#[derive(Debug)]
struct StackFrame {
    /// The state being explored
    state: StateRef,
    /// Index of the next outgoing transition to follow
    next_edge: usize,
}

/// An iterator over the interleavings of a scheduling graph.
///
/// Created by [`SchedulingGraph::interleavings()`].
///
/// Uses depth-first traversal with backtracking. The current path is kept
/// in a single vector that grows and shrinks with the stack.
pub struct Interleavings<'a> {
    graph: &'a SchedulingGraph,
    stack: Vec<StackFrame>,
    /// Labels of the transitions on the current path
    current_path: Vec<Option<&'a Operation>>,
}

impl<'a> Interleavings<'a> {
    fn new(graph: &'a SchedulingGraph) -> Self {
        let stack = graph
            .root()
            .map(|state| StackFrame { state, next_edge: 0 })
            .into_iter()
            .collect();
        Interleavings {
            graph,
            stack,
            current_path: Vec::new(),
        }
    }

    fn backtrack(&mut self) {
        self.stack.pop();
        // Pop the transition that led here (unless at the root)
        if !self.stack.is_empty() {
            self.current_path.pop();
        }
    }
}

impl<'a> Iterator for Interleavings<'a> {
    type Item = Vec<&'a Operation>;

    fn next(&mut self) -> Option<Self::Item> {
        let graph = self.graph;
        loop {
            let frame = self.stack.last_mut()?;
            let edges = graph.out_edges(frame.state);

            if edges.is_empty() {
                let result = self.current_path.iter().flatten().copied().collect();
                self.backtrack();
                return Some(result);
            }

            if let Some(edge) = edges.get(frame.next_edge) {
                frame.next_edge += 1;
                self.current_path.push(edge.op.as_ref());
                self.stack.push(StackFrame {
                    state: edge.target,
                    next_edge: 0,
                });
            } else {
                self.backtrack();
            }
        }
    }
}
