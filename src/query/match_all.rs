//! Query that matches every document.

use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::evaluator::{AllEvaluator, Evaluator};
use crate::query::query::{Query, Weight, query_eq_as, query_hash_as};
use crate::query::scorer::ConstantScorer;
use crate::query::scoring_mode::ScoringMode;
use crate::query::visitor::QueryVisitor;
use crate::search::searcher::Searcher;

/// Matches all documents, each scored with the query's boost.
#[derive(Debug, Clone)]
pub struct MatchAllQuery {
    boost: f32,
}

impl MatchAllQuery {
    /// Create a new match-all query.
    pub fn new() -> Self {
        MatchAllQuery { boost: 1.0 }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl Default for MatchAllQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for MatchAllQuery {
    fn eq(&self, other: &Self) -> bool {
        self.boost.to_bits() == other.boost.to_bits()
    }
}

impl Eq for MatchAllQuery {}

impl Hash for MatchAllQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.boost.to_bits().hash(state);
    }
}

impl Query for MatchAllQuery {
    fn weight(
        &self,
        _searcher: &Searcher,
        scoring_mode: ScoringMode,
        boost: f32,
    ) -> Result<Box<dyn Weight>> {
        Ok(Box::new(MatchAllWeight {
            scoring_mode,
            score: boost * self.boost,
        }))
    }

    fn visit(&self, visitor: &mut dyn QueryVisitor) {
        visitor.visit_leaf(self);
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn description(&self) -> String {
        if self.boost == 1.0 {
            "*:*".to_string()
        } else {
            format!("*:*^{}", self.boost)
        }
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        query_eq_as(self, other)
    }

    fn query_hash(&self, state: &mut dyn Hasher) {
        query_hash_as(self, state);
    }
}

/// Weight of a [`MatchAllQuery`].
#[derive(Debug)]
pub struct MatchAllWeight {
    scoring_mode: ScoringMode,
    score: f32,
}

impl Weight for MatchAllWeight {
    fn scoring_mode(&self) -> ScoringMode {
        self.scoring_mode
    }

    fn evaluator(&self, reader: &Arc<dyn IndexReader>) -> Result<Option<Box<dyn Evaluator>>> {
        if reader.max_doc() == 0 {
            return Ok(None);
        }
        Ok(Some(Box::new(AllEvaluator::new(
            reader.max_doc(),
            ConstantScorer::new(self.score),
            !self.scoring_mode.is_exhaustive(),
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::index::memory::MemoryIndex;
    use crate::query::evaluator::tests::drain;
    use crate::search::config::SearcherConfig;

    #[test]
    fn test_matches_all_with_boost_as_score() {
        let mut builder = MemoryIndex::builder();
        for text in ["a", "b", "c"] {
            builder.add_document(Document::builder().add_text("field", text).build());
        }
        let searcher =
            Searcher::new(builder.build().segment_readers(), SearcherConfig::default()).unwrap();

        let query = MatchAllQuery::new().with_boost(2.0);
        let weight = query.weight(&searcher, ScoringMode::Complete, 1.5).unwrap();
        let mut evaluator = weight.evaluator(&searcher.segments()[0]).unwrap().unwrap();

        assert_eq!(evaluator.score().unwrap(), 3.0);
        assert_eq!(drain(evaluator.as_mut()), vec![0, 1, 2]);
    }

    #[test]
    fn test_description_and_equality() {
        assert_eq!(MatchAllQuery::new().description(), "*:*");
        assert_eq!(MatchAllQuery::new().with_boost(2.0).description(), "*:*^2");
        assert_eq!(MatchAllQuery::new(), MatchAllQuery::default());
        assert_ne!(MatchAllQuery::new(), MatchAllQuery::new().with_boost(2.0));
    }
}
