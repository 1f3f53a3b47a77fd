//! Per-node analysis results.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::operation::Operation;
use crate::pragma::PragmaKind;
use crate::progress::StateKey;
use crate::types::ScopeId;

/// Conflicting pair of operations reported by a race detector.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DataRace {
    pub var: Arc<str>,
    pub first: Operation,
    pub second: Operation,
    /// State in which the conflict was observed, if the detector tracks it.
    pub state: Option<StateKey>,
}

impl fmt::Display for DataRace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "race on '{}': {} / {}", self.var, self.first, self.second)?;
        if let Some(state) = &self.state {
            write!(f, " at {}", state)?;
        }
        Ok(())
    }
}

/// A reachable final state reported by a race detector.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct State {
    pub key: StateKey,
    pub held_locks: BTreeSet<Arc<str>>,
}

/// Why a node could not be computed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Unsupported {
    /// A known pragma kind without a result computation.
    Kind(PragmaKind),
    /// A directive this crate does not know.
    Unrecognized(String),
    /// The synthetic root of the task graph.
    Root,
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unsupported::Kind(kind) => write!(f, "pragma '{}' is not supported yet", kind),
            Unsupported::Unrecognized(directive) => write!(f, "unrecognized pragma '{}'", directive),
            Unsupported::Root => write!(f, "the root region has no pragma"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub enum ResultStatus {
    #[default]
    Unprocessed,
    Computed,
    Unsupported(Unsupported),
}

/// Result slot of one task-graph node.
///
/// Besides the races and states found so far, the result owns the scope
/// fingerprint its computation binds behavior models to.
#[derive(Debug, Clone)]
pub struct NodeResult {
    pub data_races: Vec<DataRace>,
    pub states: Vec<State>,
    status: ResultStatus,
    fingerprint: ScopeId,
}

impl Default for NodeResult {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeResult {
    pub fn new() -> Self {
        Self {
            data_races: Vec::new(),
            states: Vec::new(),
            status: ResultStatus::Unprocessed,
            fingerprint: ScopeId::fresh(),
        }
    }

    pub fn status(&self) -> &ResultStatus {
        &self.status
    }

    /// Whether the node was fully computed.
    pub fn is_complete(&self) -> bool {
        self.status == ResultStatus::Computed
    }

    /// Fingerprint of the current (or last) computation.
    pub fn current_fingerprint(&self) -> ScopeId {
        self.fingerprint
    }

    /// Allocate a fresh fingerprint for a new computation and return it.
    pub fn renew_fingerprint(&mut self) -> ScopeId {
        self.fingerprint = ScopeId::fresh();
        self.fingerprint
    }

    pub fn set_computed(&mut self, data_races: Vec<DataRace>, states: Vec<State>) {
        self.data_races = data_races;
        self.states = states;
        self.status = ResultStatus::Computed;
    }

    /// Mark the node as not computable; clears anything found earlier.
    pub fn set_unsupported(&mut self, reason: Unsupported) {
        self.data_races.clear();
        self.states.clear();
        self.status = ResultStatus::Unsupported(reason);
    }
}
