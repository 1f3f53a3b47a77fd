//! Recorded per-thread operations and behavior models.
//!
//! A [`BehaviorModel`] is the ordered sequence of [`Operation`]s one thread
//! (or task) performed inside a region. Models are the input of scheduling
//! graph construction: every interleaving of their operations becomes a path
//! through the graph.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::types::{ScopeId, ThreadId};

/// What an [`Operation`] does to its target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum OperationKind {
    Read,
    Write,
    LockAcquire,
    LockRelease,
}

impl OperationKind {
    /// Memory access (read or write), as opposed to a lock operation.
    pub fn is_access(self) -> bool {
        matches!(self, OperationKind::Read | OperationKind::Write)
    }

    pub fn is_lock(self) -> bool {
        !self.is_access()
    }

    fn symbol(self) -> &'static str {
        match self {
            OperationKind::Read => "R",
            OperationKind::Write => "W",
            OperationKind::LockAcquire => "L",
            OperationKind::LockRelease => "U",
        }
    }
}

/// One recorded action of a thread.
///
/// The target is a variable name for accesses and a lock name for lock
/// operations.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Operation {
    thread: ThreadId,
    kind: OperationKind,
    target: Arc<str>,
}

impl Operation {
    pub fn new(thread: ThreadId, kind: OperationKind, target: impl Into<Arc<str>>) -> Self {
        Self {
            thread,
            kind,
            target: target.into(),
        }
    }

    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Variable accessed by this operation, if it is an access.
    pub fn var_name(&self) -> Option<&str> {
        self.kind.is_access().then_some(&*self.target)
    }

    /// Lock touched by this operation, if it is a lock operation.
    pub fn lock_name(&self) -> Option<&str> {
        self.kind.is_lock().then_some(&*self.target)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}({})", self.thread, self.kind.symbol(), self.target)
    }
}

/// Ordered operation sequence recorded for one thread.
///
/// Operations are only ever appended. A model may be rebound to a scope
/// with [`BehaviorModel::rebind`] before it is used to build a scheduling
/// graph, which tags it with the computation it takes part in.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BehaviorModel {
    thread: ThreadId,
    operations: Vec<Operation>,
    scope: Option<ScopeId>,
}

impl BehaviorModel {
    pub fn new(thread: ThreadId) -> Self {
        Self {
            thread,
            operations: Vec::new(),
            scope: None,
        }
    }

    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Scope this model is currently bound to, if any.
    pub fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    /// Append an operation performed by this model's thread.
    pub fn push(&mut self, kind: OperationKind, target: impl Into<Arc<str>>) {
        self.operations.push(Operation::new(self.thread, kind, target));
    }

    pub fn read(mut self, var: impl Into<Arc<str>>) -> Self {
        self.push(OperationKind::Read, var);
        self
    }

    pub fn write(mut self, var: impl Into<Arc<str>>) -> Self {
        self.push(OperationKind::Write, var);
        self
    }

    pub fn acquire(mut self, lock: impl Into<Arc<str>>) -> Self {
        self.push(OperationKind::LockAcquire, lock);
        self
    }

    pub fn release(mut self, lock: impl Into<Arc<str>>) -> Self {
        self.push(OperationKind::LockRelease, lock);
        self
    }

    /// Bind this model to `scope`, replacing any previous binding.
    pub fn rebind(&mut self, scope: ScopeId) {
        self.scope = Some(scope);
    }

    /// Names of all locks this model touches.
    pub fn lock_names(&self) -> BTreeSet<Arc<str>> {
        self.operations
            .iter()
            .filter(|op| op.kind.is_lock())
            .map(|op| op.target.clone())
            .collect()
    }

    /// Names of all variables this model accesses.
    pub fn var_names(&self) -> BTreeSet<Arc<str>> {
        self.operations
            .iter()
            .filter(|op| op.kind.is_access())
            .map(|op| op.target.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let model = BehaviorModel::new(ThreadId::new(1))
            .acquire("m")
            .read("x")
            .write("x")
            .release("m");

        assert_eq!(model.len(), 4);
        assert!(model.operations().iter().all(|op| op.thread() == ThreadId::new(1)));
        assert_eq!(model.operations()[1].kind(), OperationKind::Read);
        assert_eq!(model.operations()[1].var_name(), Some("x"));
        assert_eq!(model.operations()[0].lock_name(), Some("m"));
        assert_eq!(model.operations()[0].var_name(), None);
    }

    #[test]
    fn test_name_sets() {
        let model = BehaviorModel::new(ThreadId::new(0))
            .write("a")
            .acquire("l")
            .read("b")
            .write("a")
            .release("l");

        assert_eq!(model.var_names().len(), 2);
        assert!(model.var_names().contains("a"));
        assert!(model.var_names().contains("b"));
        assert_eq!(model.lock_names().len(), 1);
        assert!(model.lock_names().contains("l"));
    }

    #[test]
    fn test_rebind() {
        let mut model = BehaviorModel::new(ThreadId::new(0)).write("v");
        assert_eq!(model.scope(), None);
        let s1 = ScopeId::fresh();
        model.rebind(s1);
        assert_eq!(model.scope(), Some(s1));
        let s2 = ScopeId::fresh();
        model.rebind(s2);
        assert_eq!(model.scope(), Some(s2));
    }

    #[test]
    fn test_display() {
        let op = Operation::new(ThreadId::new(2), OperationKind::Write, "v");
        assert_eq!(op.to_string(), "t2:W(v)");
    }
}
