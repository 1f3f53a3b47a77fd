//! Limits and sizing for scheduling-graph construction.

/// Configuration for building and composing scheduling graphs.
///
/// # Examples
///
/// ```
/// use racegraph::config::SchedulerConfig;
///
/// let config = SchedulerConfig::default().with_max_states(10_000);
/// assert_eq!(config.max_states, 10_000);
/// ```
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of state nodes a single graph may hold (default: 2^20).
    ///
    /// Construction and composition check the size of the result before
    /// materializing anything and fail with
    /// [`Error::TooManyStates`][crate::error::Error::TooManyStates] instead.
    pub max_states: usize,
    /// Initial number of unique-table buckets, as a power of two (default: 12).
    pub table_bits: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_states: 1 << 20,
            table_bits: 12,
        }
    }
}

impl SchedulerConfig {
    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }

    pub fn with_table_bits(mut self, table_bits: usize) -> Self {
        assert!(table_bits <= 31, "Table bits should be in the range 0..=31");
        self.table_bits = table_bits;
        self
    }

    /// The effective state limit: `max_states`, capped by what a
    /// [`StateRef`][crate::reference::StateRef] can address.
    pub fn state_limit(&self) -> usize {
        self.max_states.min(u32::MAX as usize - 1)
    }
}
