use std::fmt::{Display, Formatter};

/// Handle of a state node inside one [`SchedulingGraph`][crate::scheduling::SchedulingGraph].
///
/// Handles are only meaningful for the graph that produced them. Index `0`
/// is the table sentinel and never names a real node.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StateRef(u32);

impl StateRef {
    pub const fn new(index: u32) -> Self {
        assert!(index != 0, "StateRef index must be non-zero");
        Self(index)
    }

    /// Return the index of the referenced node.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Return the internal representation of the reference.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<usize> for StateRef {
    fn from(index: usize) -> Self {
        assert!(index <= u32::MAX as usize, "State index {} does not fit into u32", index);
        StateRef::new(index as u32)
    }
}

impl Display for StateRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}
