//! Query system for searching documents.
//!
//! Every query is compiled into a [`Weight`] under a [`ScoringMode`] before it
//! touches the index. Composite queries derive the modes of their children
//! from their own; see [`BooleanQuery::clause_scoring_mode`] and
//! [`ConstantScoreQuery::inner_scoring_mode`].

pub mod boolean;
pub mod constant_score;
pub mod evaluator;
pub mod match_all;
#[allow(clippy::module_inception)]
pub mod query;
pub mod scorer;
pub mod scoring_mode;
pub mod sort;
pub mod term;
pub mod visitor;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::search::collector::TotalHits;

pub use self::boolean::{BooleanClause, BooleanQuery, BooleanQueryBuilder, Occur};
pub use self::constant_score::ConstantScoreQuery;
pub use self::evaluator::Evaluator;
pub use self::match_all::MatchAllQuery;
pub use self::query::{Query, Weight};
pub use self::scorer::{BM25Scorer, Bm25Params, ConstantScorer, Scorer};
pub use self::scoring_mode::ScoringMode;
pub use self::sort::{Sort, SortField, SortOrder, SortValue};
pub use self::term::TermQuery;
pub use self::visitor::{QueryVisitor, TermCollector};

/// A search hit containing a document and its score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The global document ID.
    pub doc_id: u64,
    /// The relevance score, present only when the search computed scores.
    pub score: Option<f32>,
    /// Values of the sort keys, when sorted by fields.
    pub sort_values: Vec<SortValue>,
    /// The document (if retrieved).
    pub document: Option<Document>,
}

/// Search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// The search hits.
    pub hits: Vec<SearchHit>,
    /// Total number of matching documents.
    pub total_hits: TotalHits,
    /// Maximum score in the results, if scores were computed.
    pub max_score: Option<f32>,
}

impl SearchResults {
    /// Document ids of the hits, in rank order.
    pub fn doc_ids(&self) -> Vec<u64> {
        self.hits.iter().map(|hit| hit.doc_id).collect()
    }
}
