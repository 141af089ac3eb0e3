//! Term query implementation for exact term matching.

use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::{IndexReader, PostingIterator, TERMINATED};
use crate::query::evaluator::Evaluator;
use crate::query::query::{Query, Weight, query_eq_as, query_hash_as};
use crate::query::scorer::{BM25Scorer, Bm25Params, Scorer};
use crate::query::scoring_mode::ScoringMode;
use crate::query::visitor::QueryVisitor;
use crate::search::searcher::Searcher;

/// A query that matches documents containing a specific term.
#[derive(Debug, Clone)]
pub struct TermQuery {
    /// The field to search in.
    field: String,
    /// The term to search for.
    term: String,
    /// The boost factor for this query.
    boost: f32,
}

impl TermQuery {
    /// Create a new term query.
    ///
    /// The term is matched as-is; it must already be in its indexed form
    /// (lowercased).
    pub fn new<F, T>(field: F, term: T) -> Self
    where
        F: Into<String>,
        T: Into<String>,
    {
        TermQuery {
            field: field.into(),
            term: term.into(),
            boost: 1.0,
        }
    }

    /// Get the field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Get the term.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl PartialEq for TermQuery {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
            && self.term == other.term
            && self.boost.to_bits() == other.boost.to_bits()
    }
}

impl Eq for TermQuery {}

impl Hash for TermQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.field.hash(state);
        self.term.hash(state);
        self.boost.to_bits().hash(state);
    }
}

impl Query for TermQuery {
    fn weight(
        &self,
        searcher: &Searcher,
        scoring_mode: ScoringMode,
        boost: f32,
    ) -> Result<Box<dyn Weight>> {
        let doc_freq = searcher
            .term_statistics(&self.field, &self.term)?
            .map(|stats| stats.doc_freq)
            .unwrap_or(0);
        let avg_field_length = searcher
            .collection_statistics(&self.field)?
            .map(|stats| stats.avg_length())
            .unwrap_or(0.0);

        let similarity = TermSimilarity {
            doc_freq,
            avg_field_length,
            total_docs: searcher.doc_count(),
            boost: boost * self.boost,
            params: searcher.config().bm25,
        };

        Ok(Box::new(TermWeight {
            field: self.field.clone(),
            term: self.term.clone(),
            scoring_mode,
            similarity,
        }))
    }

    fn visit(&self, visitor: &mut dyn QueryVisitor) {
        visitor.consume_term(&self.field, &self.term);
        visitor.visit_leaf(self);
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn description(&self) -> String {
        if self.boost == 1.0 {
            format!("{}:{}", self.field, self.term)
        } else {
            format!("{}:{}^{}", self.field, self.term, self.boost)
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

/// Index-wide statistics retained so a BM25 scorer can be built on demand.
#[derive(Debug, Clone, Copy)]
struct TermSimilarity {
    doc_freq: u64,
    avg_field_length: f64,
    total_docs: u64,
    boost: f32,
    params: Bm25Params,
}

impl TermSimilarity {
    fn scorer(&self) -> BM25Scorer {
        BM25Scorer::with_params(
            self.doc_freq,
            self.avg_field_length,
            self.total_docs,
            self.boost,
            self.params,
        )
    }
}

/// Weight of a [`TermQuery`].
#[derive(Debug)]
pub struct TermWeight {
    field: String,
    term: String,
    scoring_mode: ScoringMode,
    similarity: TermSimilarity,
}

impl TermWeight {
    /// Create the concrete evaluator over one segment.
    pub fn term_evaluator(&self, reader: &Arc<dyn IndexReader>) -> Result<Option<TermEvaluator>> {
        let Some(postings) = reader.postings(&self.field, &self.term)? else {
            return Ok(None);
        };
        if postings.doc_id() == TERMINATED {
            return Ok(None);
        }

        let scorer = self
            .scoring_mode
            .needs_scores()
            .then(|| self.similarity.scorer());

        Ok(Some(TermEvaluator {
            postings,
            reader: Arc::clone(reader),
            field: self.field.clone(),
            similarity: self.similarity,
            scorer,
            allow_pruning: !self.scoring_mode.is_exhaustive(),
            exhausted: false,
        }))
    }
}

impl Weight for TermWeight {
    fn scoring_mode(&self) -> ScoringMode {
        self.scoring_mode
    }

    fn evaluator(&self, reader: &Arc<dyn IndexReader>) -> Result<Option<Box<dyn Evaluator>>> {
        Ok(self
            .term_evaluator(reader)?
            .map(|evaluator| Box::new(evaluator) as Box<dyn Evaluator>))
    }
}

/// Walks the postings of one term in one segment.
#[derive(Debug)]
pub struct TermEvaluator {
    postings: Box<dyn PostingIterator>,
    reader: Arc<dyn IndexReader>,
    field: String,
    similarity: TermSimilarity,
    /// Built eagerly only when the mode needs scores.
    scorer: Option<BM25Scorer>,
    allow_pruning: bool,
    exhausted: bool,
}

impl TermEvaluator {
    /// Whether a scorer has been built for this evaluator.
    pub fn has_scorer(&self) -> bool {
        self.scorer.is_some()
    }
}

impl Evaluator for TermEvaluator {
    fn doc_id(&self) -> u64 {
        if self.exhausted {
            TERMINATED
        } else {
            self.postings.doc_id()
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        self.postings.next()
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        self.postings.skip_to(target)
    }

    fn cost(&self) -> u64 {
        self.postings.cost()
    }

    fn score(&mut self) -> Result<f32> {
        let doc_id = self.doc_id();
        if doc_id == TERMINATED {
            return Ok(0.0);
        }
        let term_freq = self.postings.term_freq() as f32;
        let field_length = self
            .reader
            .field_length(doc_id, &self.field)
            .map(|length| length as f32);

        let similarity = self.similarity;
        let scorer = self.scorer.get_or_insert_with(|| similarity.scorer());
        Ok(scorer.score(term_freq, field_length))
    }

    fn max_score(&self) -> f32 {
        match &self.scorer {
            Some(scorer) => scorer.max_score(),
            None => self.similarity.scorer().max_score(),
        }
    }

    fn set_min_competitive_score(&mut self, min_score: f32) {
        if self.allow_pruning && self.max_score() <= min_score {
            self.exhausted = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::index::memory::MemoryIndex;
    use crate::search::config::SearcherConfig;

    fn searcher() -> Searcher {
        let mut builder = MemoryIndex::builder();
        for i in 0..5 {
            builder.add_document(
                Document::builder()
                    .add_text("field", format!("this is document {i}"))
                    .build(),
            );
        }
        Searcher::new(builder.build().segment_readers(), SearcherConfig::default()).unwrap()
    }

    fn evaluator(searcher: &Searcher, query: &TermQuery, mode: ScoringMode) -> TermEvaluator {
        let weight = TermWeight {
            field: query.field().to_string(),
            term: query.term().to_string(),
            scoring_mode: mode,
            similarity: TermSimilarity {
                doc_freq: 5,
                avg_field_length: 4.0,
                total_docs: 5,
                boost: 1.0,
                params: Bm25Params::default(),
            },
        };
        weight
            .term_evaluator(&searcher.segments()[0])
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_term_weight_keeps_mode() {
        let searcher = searcher();
        let query = TermQuery::new("field", "this");
        for mode in ScoringMode::ALL {
            let weight = query.weight(&searcher, mode, 1.0).unwrap();
            assert_eq!(weight.scoring_mode(), mode);
        }
    }

    #[test]
    fn test_scorer_built_only_when_scores_needed() {
        let searcher = searcher();
        let query = TermQuery::new("field", "this");

        let scoring = evaluator(&searcher, &query, ScoringMode::Complete);
        assert!(scoring.has_scorer());

        let mut lazy = evaluator(&searcher, &query, ScoringMode::CompleteNoScores);
        assert!(!lazy.has_scorer());
        // An explicit request still yields a score
        assert!(lazy.score().unwrap() > 0.0);
        assert!(lazy.has_scorer());
    }

    #[test]
    fn test_missing_term_has_no_evaluator() {
        let searcher = searcher();
        let query = TermQuery::new("field", "missing");
        let weight = query
            .weight(&searcher, ScoringMode::Complete, 1.0)
            .unwrap();
        assert!(weight.evaluator(&searcher.segments()[0]).unwrap().is_none());
    }

    #[test]
    fn test_matches_every_document_with_term() {
        let searcher = searcher();
        let query = TermQuery::new("field", "3");
        let weight = query
            .weight(&searcher, ScoringMode::CompleteNoScores, 1.0)
            .unwrap();
        let mut evaluator = weight.evaluator(&searcher.segments()[0]).unwrap().unwrap();

        assert_eq!(evaluator.doc_id(), 3);
        assert_eq!(evaluator.cost(), 1);
        assert!(!evaluator.next().unwrap());
    }

    #[test]
    fn test_competitive_hint_only_prunes_non_exhaustive_modes() {
        let searcher = searcher();
        let query = TermQuery::new("field", "this");

        for mode in ScoringMode::ALL {
            let weight = query.weight(&searcher, mode, 1.0).unwrap();
            let mut evaluator = weight.evaluator(&searcher.segments()[0]).unwrap().unwrap();
            let bound = evaluator.max_score();

            evaluator.set_min_competitive_score(bound / 2.0);
            assert!(!evaluator.is_exhausted());

            evaluator.set_min_competitive_score(bound);
            assert_eq!(evaluator.is_exhausted(), !mode.is_exhaustive());
        }
    }

    #[test]
    fn test_description() {
        assert_eq!(TermQuery::new("field", "this").description(), "field:this");
        assert_eq!(
            TermQuery::new("field", "this").with_boost(2.0).description(),
            "field:this^2"
        );
    }
}
