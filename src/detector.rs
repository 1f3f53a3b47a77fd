//! Collaborators the result computation hands work to.
//!
//! The crate builds scheduling graphs; deciding what counts as a race and
//! rewriting models before simulation belong to the implementations of these
//! traits.

use crate::operation::BehaviorModel;
use crate::result::{DataRace, NodeResult, State};
use crate::scheduling::SchedulingGraph;

/// Rewrites behavior models before a scheduling graph is built from them.
pub trait Normalizer {
    fn prepare(&self, behavior_models: Vec<BehaviorModel>) -> Vec<BehaviorModel>;
}

/// Normalizer that leaves models untouched.
#[derive(Debug, Default, Copy, Clone)]
pub struct Identity;

impl Normalizer for Identity {
    fn prepare(&self, behavior_models: Vec<BehaviorModel>) -> Vec<BehaviorModel> {
        behavior_models
    }
}

/// Explores the interleavings of a graph and reports conflicts.
///
/// `prior` is the result already stored on the node, so detectors can carry
/// states forward between computations.
pub trait RaceDetector {
    fn detect(
        &self,
        graph: &SchedulingGraph,
        dimensions: &[u32],
        prior: &NodeResult,
    ) -> (Vec<DataRace>, Vec<State>);
}

impl<F> RaceDetector for F
where
    F: Fn(&SchedulingGraph, &[u32], &NodeResult) -> (Vec<DataRace>, Vec<State>),
{
    fn detect(
        &self,
        graph: &SchedulingGraph,
        dimensions: &[u32],
        prior: &NodeResult,
    ) -> (Vec<DataRace>, Vec<State>) {
        self(graph, dimensions, prior)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::types::ThreadId;

    #[test]
    fn test_identity() {
        let models = vec![BehaviorModel::new(ThreadId::new(0)).write("x")];
        assert_eq!(Identity.prepare(models.clone()), models);
    }

    #[test]
    fn test_closure_detector() {
        let graph = SchedulingGraph::build(&[], &SchedulerConfig::default()).unwrap();
        let detector = |g: &SchedulingGraph, dims: &[u32], _: &NodeResult| -> (Vec<DataRace>, Vec<State>) {
            assert!(dims.is_empty());
            assert_eq!(g.len(), 1);
            (Vec::new(), Vec::new())
        };
        let (races, states) = detector.detect(&graph, graph.dimensions(), &NodeResult::new());
        assert!(races.is_empty());
        assert!(states.is_empty());
    }
}
