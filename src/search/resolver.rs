//! Derive the root [`ScoringMode`] from what a search asks for.
//!
//! Two questions decide the mode: must every match be counted, and does the
//! requested ordering involve the relevance score.
//!
//! | exact count | orders by score | mode |
//! |---|---|---|
//! | yes | no | `CompleteNoScores` |
//! | yes | yes | `Complete` |
//! | no | yes | `TopScores` |
//! | no | no | `TopDocs` |

use serde::{Deserialize, Serialize};

use crate::query::scoring_mode::ScoringMode;
use crate::query::sort::Sort;

/// How results are ordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResultOrdering {
    /// No particular order (e.g. counting).
    #[default]
    Unordered,
    /// Ordered by the given sort keys.
    Sorted(Sort),
}

impl ResultOrdering {
    /// Order by relevance score.
    pub fn relevance() -> Self {
        ResultOrdering::Sorted(Sort::relevance())
    }

    /// Whether the ordering reads the relevance score.
    pub fn needs_scores(&self) -> bool {
        match self {
            ResultOrdering::Unordered => false,
            ResultOrdering::Sorted(sort) => sort.needs_scores(),
        }
    }
}

/// Resolve the mode for an exact-count flag and an ordering.
pub fn resolve_scoring_mode(exact_count: bool, ordering: &ResultOrdering) -> ScoringMode {
    ScoringMode::from_facets(exact_count, ordering.needs_scores())
}

/// What a collector needs from an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResultRequirements {
    /// Every match must be visited and counted.
    pub exact_count: bool,
    /// Requested ordering.
    pub ordering: ResultOrdering,
}

impl ResultRequirements {
    /// Create requirements.
    pub fn new(exact_count: bool, ordering: ResultOrdering) -> Self {
        ResultRequirements {
            exact_count,
            ordering,
        }
    }

    /// The resolved mode.
    pub fn scoring_mode(&self) -> ScoringMode {
        resolve_scoring_mode(self.exact_count, &self.ordering)
    }
}
