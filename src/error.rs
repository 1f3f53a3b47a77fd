use crate::types::{ScopeId, TaskNodeId};

/// Which operand of a composition an error refers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Side {
    Target,
    Source,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Target => write!(f, "target"),
            Side::Source => write!(f, "source"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cannot compose: {0} graph has no root")]
    EmptyGraph(Side),
    #[error("scope fingerprint {0} is present in both composed graphs")]
    FingerprintCollision(ScopeId),
    #[error("interleaving space needs {required} states, limit is {limit}")]
    TooManyStates { required: u128, limit: usize },
    #[error("task graph has no node {0}")]
    UnknownNode(TaskNodeId),
}

pub type Result<T> = std::result::Result<T, Error>;
