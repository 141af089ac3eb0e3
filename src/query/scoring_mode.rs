//! The scoring-mode contract handed down the query tree.
//!
//! A [`ScoringMode`] tells a query node two independent things:
//!
//! - whether every matching document must be visited (`exhaustive`), and
//! - whether a relevance score must be computed for each match (`needs_scores`).
//!
//! The mode is fixed when a weight is created for a query and never changes
//! while that weight, or any evaluator it produces, is alive.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How exhaustively, and with or without scores, a query must be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoringMode {
    /// Exact match set with exact scores.
    Complete,
    /// Exact match set or count, scores are irrelevant.
    CompleteNoScores,
    /// Top hits by score; non-competitive documents may be skipped.
    TopScores,
    /// Top hits by a non-score order; scores are never needed.
    TopDocs,
}

impl ScoringMode {
    /// Every variant, in declaration order.
    pub const ALL: [ScoringMode; 4] = [
        ScoringMode::Complete,
        ScoringMode::CompleteNoScores,
        ScoringMode::TopScores,
        ScoringMode::TopDocs,
    ];

    /// Build the mode that has exactly the given facets.
    pub const fn from_facets(exhaustive: bool, needs_scores: bool) -> Self {
        match (exhaustive, needs_scores) {
            (true, true) => ScoringMode::Complete,
            (true, false) => ScoringMode::CompleteNoScores,
            (false, true) => ScoringMode::TopScores,
            (false, false) => ScoringMode::TopDocs,
        }
    }

    /// Whether every matching document must be visited.
    ///
    /// When this is `false` an evaluator may stop as soon as the remaining
    /// candidates provably cannot enter the result set.
    pub const fn is_exhaustive(self) -> bool {
        matches!(self, ScoringMode::Complete | ScoringMode::CompleteNoScores)
    }

    /// Whether a score must be computed for every matching document.
    ///
    /// When this is `false` nothing downstream may depend on a score value.
    pub const fn needs_scores(self) -> bool {
        matches!(self, ScoringMode::Complete | ScoringMode::TopScores)
    }

    /// The same exhaustiveness, without scores.
    pub const fn without_scores(self) -> Self {
        ScoringMode::from_facets(self.is_exhaustive(), false)
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScoringMode::Complete => "COMPLETE",
            ScoringMode::CompleteNoScores => "COMPLETE_NO_SCORES",
            ScoringMode::TopScores => "TOP_SCORES",
            ScoringMode::TopDocs => "TOP_DOCS",
        };
        f.write_str(name)
    }
}
