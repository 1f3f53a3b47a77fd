//! Type-safe wrappers for thread, scope and task-node identifiers.
//!
//! These newtypes keep the different integer identities apart at compile
//! time, so a thread id can never be passed where a task-graph handle or a
//! scope fingerprint is expected.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of the thread (or task) that recorded a behavior model.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ThreadId(u32);

impl ThreadId {
    pub const fn new(id: u32) -> Self {
        ThreadId(id)
    }

    /// Returns the raw thread id.
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl From<u32> for ThreadId {
    fn from(id: u32) -> Self {
        ThreadId(id)
    }
}

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);

/// Scope fingerprint of a scheduling graph (or of a computation).
///
/// Fingerprints come from a process-wide monotonically increasing counter,
/// so two calls to [`ScopeId::fresh`] never return the same value, even when
/// called from different threads.
///
/// # Invariants
///
/// - `0` is never handed out by [`ScopeId::fresh`]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    /// Allocates a new, never-before-seen fingerprint.
    pub fn fresh() -> Self {
        ScopeId(NEXT_SCOPE.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw fingerprint value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Creates a fingerprint from a raw value without reserving it.
    ///
    /// Only useful for tests that need a deterministic value. Two graphs
    /// built with the same raw fingerprint will collide on composition.
    pub const fn from_raw(raw: u64) -> Self {
        ScopeId(raw)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

/// Handle of a node in a [`TaskGraph`][crate::task_graph::TaskGraph].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TaskNodeId(usize);

impl TaskNodeId {
    pub(crate) const fn new(index: usize) -> Self {
        TaskNodeId(index)
    }

    /// Returns the raw arena index.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<TaskNodeId> for usize {
    fn from(id: TaskNodeId) -> Self {
        id.0
    }
}
