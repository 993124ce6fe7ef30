#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Evaluation knobs of a [`Reasoner`](crate::Reasoner)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Reorder head clauses before matching: most-bound store clauses
    /// first, builtins once their inputs are bound
    pub reorder_clauses: bool,
    /// Hard cap on the rounds of a recursive stratum, applied on top of the
    /// guard bound
    pub round_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reorder_clauses: true,
            round_limit: None,
        }
    }
}

impl Config {
    /// Enables or disables clause reordering
    #[must_use]
    pub fn with_reorder_clauses(mut self, reorder: bool) -> Self {
        self.reorder_clauses = reorder;
        self
    }

    /// Caps the rounds of every recursive stratum
    #[must_use]
    pub fn with_round_limit(mut self, limit: usize) -> Self {
        self.round_limit = Some(limit);
        self
    }

    /// The bound actually used for a stratum whose guard allows `bound`
    /// rounds
    #[must_use]
    pub fn rounds(&self, bound: usize) -> usize {
        self.round_limit.map_or(bound, |limit| bound.min(limit))
    }
}
