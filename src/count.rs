use num_bigint::BigUint;

use crate::scheduling::SchedulingGraph;

impl SchedulingGraph {
    /// Number of root-to-leaf paths, i.e. of distinct interleavings.
    ///
    /// For a lattice over models of lengths `n₁…nₖ` this is the multinomial
    /// coefficient `(Σnᵢ)! / Π(nᵢ!)`. An empty graph has zero interleavings.
    pub fn count_interleavings(&self) -> BigUint {
        let Some(root) = self.root() else {
            return BigUint::ZERO;
        };

        let mut counts: Vec<BigUint> = vec![BigUint::ZERO; self.len() + 1];
        for state in self.topological_order().into_iter().rev() {
            let count = if self.is_leaf(state) {
                BigUint::from(1u32)
            } else {
                self.successors(state).map(|next| &counts[next.index()]).sum()
            };
            counts[state.index()] = count;
        }

        counts.swap_remove(root.index())
    }
}
