//! Progress vectors and state identities.

use std::fmt;

use crate::types::ScopeId;
use crate::utils::{pairing2, pairing_seq, MyHash};

/// Per-thread count of operations consumed so far.
///
/// Component `i` never exceeds the length of behavior model `i`.
#[derive(Debug, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ProgressVector(Vec<u32>);

impl ProgressVector {
    /// The all-zero vector for `k` threads.
    pub fn zero(k: usize) -> Self {
        Self(vec![0; k])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn get(&self, thread: usize) -> u32 {
        self.0[thread]
    }

    /// Returns a copy with component `thread` incremented by one.
    pub fn advanced(&self, thread: usize) -> Self {
        let mut next = self.clone();
        next.0[thread] += 1;
        next
    }

    /// Concatenation of `self` and `other`.
    pub fn concat(&self, other: &ProgressVector) -> Self {
        let mut v = Vec::with_capacity(self.len() + other.len());
        v.extend_from_slice(&self.0);
        v.extend_from_slice(&other.0);
        Self(v)
    }

    /// Total number of operations consumed.
    pub fn total(&self) -> u64 {
        self.0.iter().map(|&x| x as u64).sum()
    }

    /// Whether every thread has consumed all of its operations.
    pub fn is_complete(&self, dimensions: &[u32]) -> bool {
        self.0 == dimensions
    }
}

impl From<Vec<u32>> for ProgressVector {
    fn from(v: Vec<u32>) -> Self {
        Self(v)
    }
}

impl fmt::Display for ProgressVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}

/// Scope lineage of a state.
///
/// States of a freshly built lattice carry a single scope. States produced
/// by parallel composition carry the scopes of both factors, in order, next
/// to the concatenated progress vector.
#[derive(Debug, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Fingerprint(Vec<ScopeId>);

impl Fingerprint {
    pub fn single(scope: ScopeId) -> Self {
        Self(vec![scope])
    }

    pub fn scopes(&self) -> &[ScopeId] {
        &self.0
    }

    pub fn concat(&self, other: &Fingerprint) -> Self {
        let mut v = Vec::with_capacity(self.0.len() + other.0.len());
        v.extend_from_slice(&self.0);
        v.extend_from_slice(&other.0);
        Self(v)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{s}")?;
        }
        Ok(())
    }
}

/// Identity of a state node: unique within one scheduling graph.
#[derive(Debug, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StateKey {
    pub progress: ProgressVector,
    pub fingerprint: Fingerprint,
}

impl StateKey {
    pub fn new(progress: ProgressVector, fingerprint: Fingerprint) -> Self {
        Self { progress, fingerprint }
    }
}

impl MyHash for StateKey {
    fn hash(&self) -> u64 {
        let p = MyHash::hash(self.progress.as_slice());
        let f = pairing_seq(self.fingerprint.scopes().iter().map(|s| s.get()));
        pairing2(p, f)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.progress, self.fingerprint)
    }
}

/// Combines two dimension vectors by positional maximum.
///
/// Entries present in only the longer vector are appended unchanged.
pub fn combine_dimensions(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut dims: Vec<u32> = a.iter().zip(b).map(|(&x, &y)| x.max(y)).collect();
    let n = dims.len();
    if a.len() > n {
        dims.extend_from_slice(&a[n..]);
    } else if b.len() > n {
        dims.extend_from_slice(&b[n..]);
    }
    dims
}
