//! Constant-score wrapper around another query.

use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use log::trace;

use crate::error::Result;
use crate::index::reader::{IndexReader, TERMINATED};
use crate::query::evaluator::Evaluator;
use crate::query::query::{Query, Weight, query_eq_as, query_hash_as};
use crate::query::scoring_mode::ScoringMode;
use crate::query::visitor::QueryVisitor;
use crate::search::searcher::Searcher;

/// Matches the documents of the inner query, all with the same score.
#[derive(Debug, Clone)]
pub struct ConstantScoreQuery {
    query: Box<dyn Query>,
    score: f32,
}

impl ConstantScoreQuery {
    /// Wrap `query`; every match scores 1.0.
    pub fn new(query: Box<dyn Query>) -> Self {
        ConstantScoreQuery { query, score: 1.0 }
    }

    /// Set the score given to every match.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// The wrapped query.
    pub fn query(&self) -> &dyn Query {
        self.query.as_ref()
    }

    /// The score given to every match.
    pub fn score(&self) -> f32 {
        self.score
    }

    /// The mode the wrapped query runs under when the wrapper receives `mode`.
    ///
    /// The inner scores are never read, so only exhaustiveness carries over.
    pub const fn inner_scoring_mode(mode: ScoringMode) -> ScoringMode {
        mode.without_scores()
    }
}

impl PartialEq for ConstantScoreQuery {
    fn eq(&self, other: &Self) -> bool {
        *self.query == *other.query && self.score.to_bits() == other.score.to_bits()
    }
}

impl Eq for ConstantScoreQuery {}

impl Hash for ConstantScoreQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.query.hash(state);
        self.score.to_bits().hash(state);
    }
}

impl Query for ConstantScoreQuery {
    fn weight(
        &self,
        searcher: &Searcher,
        scoring_mode: ScoringMode,
        boost: f32,
    ) -> Result<Box<dyn Weight>> {
        let inner_mode = Self::inner_scoring_mode(scoring_mode);
        trace!(
            "Constant score over {}: {scoring_mode} -> {inner_mode}",
            self.query.description()
        );

        Ok(Box::new(ConstantScoreWeight {
            inner: self.query.weight(searcher, inner_mode, 1.0)?,
            score: self.score * boost,
            scoring_mode,
        }))
    }

    fn rewrite(&self, searcher: &Searcher) -> Result<Option<Box<dyn Query>>> {
        if let Some(nested) = self.query.as_any().downcast_ref::<ConstantScoreQuery>() {
            return Ok(Some(Box::new(ConstantScoreQuery {
                query: nested.query.clone(),
                score: self.score,
            })));
        }

        Ok(self.query.rewrite(searcher)?.map(|query| {
            Box::new(ConstantScoreQuery {
                query,
                score: self.score,
            }) as Box<dyn Query>
        }))
    }

    fn visit(&self, visitor: &mut dyn QueryVisitor) {
        self.query.visit(visitor);
    }

    fn boost(&self) -> f32 {
        self.score
    }

    fn description(&self) -> String {
        if self.score == 1.0 {
            format!("ConstantScore({})", self.query.description())
        } else {
            format!("ConstantScore({})^{}", self.query.description(), self.score)
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

/// Weight of a [`ConstantScoreQuery`].
#[derive(Debug)]
pub struct ConstantScoreWeight {
    inner: Box<dyn Weight>,
    score: f32,
    scoring_mode: ScoringMode,
}

impl ConstantScoreWeight {
    /// The weight of the wrapped query.
    pub fn inner(&self) -> &dyn Weight {
        self.inner.as_ref()
    }
}

impl Weight for ConstantScoreWeight {
    fn scoring_mode(&self) -> ScoringMode {
        self.scoring_mode
    }

    fn evaluator(&self, reader: &Arc<dyn IndexReader>) -> Result<Option<Box<dyn Evaluator>>> {
        Ok(self.inner.evaluator(reader)?.map(|inner| {
            Box::new(ConstantScoreEvaluator {
                inner,
                score: self.score,
                allow_pruning: !self.scoring_mode.is_exhaustive(),
                exhausted: false,
            }) as Box<dyn Evaluator>
        }))
    }
}

/// Reports a fixed score for every document of the inner evaluator.
#[derive(Debug)]
pub struct ConstantScoreEvaluator {
    inner: Box<dyn Evaluator>,
    score: f32,
    allow_pruning: bool,
    exhausted: bool,
}

impl Evaluator for ConstantScoreEvaluator {
    fn doc_id(&self) -> u64 {
        if self.exhausted {
            TERMINATED
        } else {
            self.inner.doc_id()
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        self.inner.next()
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        self.inner.skip_to(target)
    }

    fn cost(&self) -> u64 {
        self.inner.cost()
    }

    fn score(&mut self) -> Result<f32> {
        Ok(self.score)
    }

    fn max_score(&self) -> f32 {
        self.score
    }

    fn set_min_competitive_score(&mut self, min_score: f32) {
        // All remaining documents tie with the one already collected
        if self.allow_pruning && self.score <= min_score {
            self.exhausted = true;
        }
    }
}
