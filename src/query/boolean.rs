//! Boolean query implementation for combining multiple queries.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};
use crate::index::reader::IndexReader;
use crate::query::constant_score::ConstantScoreQuery;
use crate::query::evaluator::{
    ConjunctionEvaluator, DisjunctionEvaluator, Evaluator, ReqExclEvaluator, ReqOptEvaluator,
};
use crate::query::query::{Query, Weight, query_eq_as, query_hash_as};
use crate::query::scoring_mode::ScoringMode;
use crate::query::visitor::QueryVisitor;
use crate::search::searcher::Searcher;

/// Occurrence requirements for boolean clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occur {
    /// The clause must match and contributes to the score.
    Must,
    /// The clause should match; matching raises the score.
    Should,
    /// The clause must not match.
    MustNot,
    /// The clause must match but never contributes to the score.
    Filter,
}

impl Occur {
    /// Whether a document has to match this clause.
    pub fn is_required(self) -> bool {
        matches!(self, Occur::Must | Occur::Filter)
    }

    /// Whether this clause can contribute to the score.
    pub fn is_scoring(self) -> bool {
        matches!(self, Occur::Must | Occur::Should)
    }
}

impl fmt::Display for Occur {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Occur::Must => "MUST",
            Occur::Should => "SHOULD",
            Occur::MustNot => "MUST_NOT",
            Occur::Filter => "FILTER",
        };
        f.write_str(name)
    }
}

/// A clause in a boolean query.
#[derive(Debug, Clone, Hash)]
pub struct BooleanClause {
    /// The query for this clause.
    pub query: Box<dyn Query>,
    /// The occurrence requirement.
    pub occur: Occur,
}

impl BooleanClause {
    /// Create a new boolean clause.
    pub fn new(query: Box<dyn Query>, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }

    /// Create a MUST clause.
    pub fn must(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Must)
    }

    /// Create a SHOULD clause.
    pub fn should(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Should)
    }

    /// Create a MUST_NOT clause.
    pub fn must_not(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::MustNot)
    }

    /// Create a FILTER clause.
    pub fn filter(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Filter)
    }
}

impl PartialEq for BooleanClause {
    fn eq(&self, other: &Self) -> bool {
        self.occur == other.occur && *self.query == *other.query
    }
}

impl Eq for BooleanClause {}

/// A boolean query that combines multiple queries with boolean logic.
#[derive(Debug, Clone)]
pub struct BooleanQuery {
    /// The clauses in this boolean query.
    clauses: Vec<BooleanClause>,
    /// The boost factor for this query.
    boost: f32,
    /// Minimum number of should clauses that must match.
    minimum_should_match: usize,
}

impl BooleanQuery {
    /// Create a boolean query from its clauses.
    ///
    /// A query made only of MUST_NOT clauses has nothing to exclude from and
    /// is rejected. An empty query is valid and matches nothing.
    pub fn new(clauses: Vec<BooleanClause>) -> Result<Self> {
        if !clauses.is_empty() && clauses.iter().all(|c| c.occur == Occur::MustNot) {
            return Err(GlaiveError::query(
                "Boolean query needs at least one MUST, SHOULD or FILTER clause",
            ));
        }
        Ok(BooleanQuery {
            clauses,
            boost: 1.0,
            minimum_should_match: 0,
        })
    }

    /// Create a builder.
    pub fn builder() -> BooleanQueryBuilder {
        BooleanQueryBuilder::new()
    }

    /// The mode a clause is evaluated under when its parent receives `mode`.
    ///
    /// MUST_NOT and FILTER clauses only decide membership, so they never
    /// score and must see every match. MUST and SHOULD inherit `mode`.
    pub const fn clause_scoring_mode(occur: Occur, mode: ScoringMode) -> ScoringMode {
        match occur {
            Occur::MustNot | Occur::Filter => ScoringMode::CompleteNoScores,
            Occur::Must | Occur::Should => mode,
        }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Set the minimum number of should clauses that must match.
    pub fn with_minimum_should_match(mut self, minimum: usize) -> Self {
        self.minimum_should_match = minimum;
        self
    }

    /// Get the clauses.
    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    /// Get the minimum should match value.
    pub fn minimum_should_match(&self) -> usize {
        self.minimum_should_match
    }

    /// Check if this query is empty.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Collapse a query with a single positive clause.
    ///
    /// A single required clause leaves no optional clause to satisfy
    /// `minimum_should_match`, so it only collapses when that is zero.
    fn simplify(&self) -> Option<Box<dyn Query>> {
        let [clause] = self.clauses.as_slice() else {
            return None;
        };
        let msm = self.minimum_should_match;
        match clause.occur {
            Occur::Must if msm == 0 && self.boost == 1.0 => Some(clause.query.clone()),
            Occur::Should if msm <= 1 && self.boost == 1.0 => Some(clause.query.clone()),
            Occur::Filter if msm == 0 => Some(Box::new(
                ConstantScoreQuery::new(clause.query.clone()).with_score(0.0),
            )),
            _ => None,
        }
    }
}

impl PartialEq for BooleanQuery {
    fn eq(&self, other: &Self) -> bool {
        self.clauses == other.clauses
            && self.minimum_should_match == other.minimum_should_match
            && self.boost.to_bits() == other.boost.to_bits()
    }
}

impl Eq for BooleanQuery {}

impl Hash for BooleanQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.clauses.hash(state);
        self.minimum_should_match.hash(state);
        self.boost.to_bits().hash(state);
    }
}

impl Query for BooleanQuery {
    fn weight(
        &self,
        searcher: &Searcher,
        scoring_mode: ScoringMode,
        boost: f32,
    ) -> Result<Box<dyn Weight>> {
        let boost = boost * self.boost;
        let mut clauses = Vec::with_capacity(self.clauses.len());

        for (i, clause) in self.clauses.iter().enumerate() {
            let clause_mode = Self::clause_scoring_mode(clause.occur, scoring_mode);
            trace!(
                "Boolean clause {i} ({}) {}: {scoring_mode} -> {clause_mode}",
                clause.occur,
                clause.query.description()
            );
            let weight = clause.query.weight(searcher, clause_mode, boost)?;
            clauses.push((clause.occur, weight));
        }

        Ok(Box::new(BooleanWeight {
            clauses,
            minimum_should_match: self.minimum_should_match,
            scoring_mode,
        }))
    }

    fn rewrite(&self, searcher: &Searcher) -> Result<Option<Box<dyn Query>>> {
        if let Some(simplified) = self.simplify() {
            return Ok(Some(simplified));
        }

        let mut changed = false;
        let mut clauses = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            match clause.query.rewrite(searcher)? {
                Some(rewritten) => {
                    changed = true;
                    clauses.push(BooleanClause::new(rewritten, clause.occur));
                }
                None => clauses.push(clause.clone()),
            }
        }

        if !changed {
            return Ok(None);
        }
        Ok(Some(Box::new(BooleanQuery {
            clauses,
            boost: self.boost,
            minimum_should_match: self.minimum_should_match,
        })))
    }

    fn visit(&self, visitor: &mut dyn QueryVisitor) {
        for clause in &self.clauses {
            if visitor.accepts(clause.occur) {
                clause.query.visit(visitor);
            }
        }
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn description(&self) -> String {
        if self.clauses.is_empty() {
            return "()".to_string();
        }

        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| match clause.occur {
                Occur::Must => format!("+{}", clause.query.description()),
                Occur::Should => clause.query.description(),
                Occur::MustNot => format!("-{}", clause.query.description()),
                Occur::Filter => format!("#{}", clause.query.description()),
            })
            .collect();

        let mut result = format!("({})", parts.join(" "));
        if self.minimum_should_match > 0 {
            result = format!("{result}~{}", self.minimum_should_match);
        }

        if self.boost == 1.0 {
            result
        } else {
            format!("{}^{}", result, self.boost)
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

/// Weight of a [`BooleanQuery`]; holds one weight per clause.
#[derive(Debug)]
pub struct BooleanWeight {
    clauses: Vec<(Occur, Box<dyn Weight>)>,
    minimum_should_match: usize,
    scoring_mode: ScoringMode,
}

impl BooleanWeight {
    /// Weights of the clauses, in clause order.
    pub fn clause_weights(&self) -> impl Iterator<Item = (Occur, &dyn Weight)> {
        self.clauses
            .iter()
            .map(|(occur, weight)| (*occur, weight.as_ref()))
    }
}

impl Weight for BooleanWeight {
    fn scoring_mode(&self) -> ScoringMode {
        self.scoring_mode
    }

    fn evaluator(&self, reader: &Arc<dyn IndexReader>) -> Result<Option<Box<dyn Evaluator>>> {
        let has_required = self.clauses.iter().any(|(occur, _)| occur.is_required());
        // Optional clauses cannot change the match set here and their scores are unused
        let skip_optional = !self.scoring_mode.needs_scores()
            && has_required
            && self.minimum_should_match == 0;

        let mut scoring = Vec::new();
        let mut filters = Vec::new();
        let mut optional = Vec::new();
        let mut prohibited = Vec::new();

        for (occur, weight) in &self.clauses {
            if *occur == Occur::Should && skip_optional {
                continue;
            }
            let evaluator = weight.evaluator(reader)?;
            match (occur, evaluator) {
                (Occur::Must | Occur::Filter, None) => return Ok(None),
                (Occur::Must, Some(evaluator)) => scoring.push(evaluator),
                (Occur::Filter, Some(evaluator)) => filters.push(evaluator),
                (Occur::Should, Some(evaluator)) => optional.push(evaluator),
                (Occur::MustNot, Some(evaluator)) => prohibited.push(evaluator),
                (Occur::Should | Occur::MustNot, None) => {}
            }
        }

        if optional.len() < self.minimum_should_match {
            return Ok(None);
        }

        let optional: Option<Box<dyn Evaluator>> = match optional.len() {
            0 => None,
            1 if self.minimum_should_match <= 1 => optional.pop(),
            _ => Some(Box::new(DisjunctionEvaluator::with_minimum_should_match(
                optional,
                self.minimum_should_match,
            )?)),
        };

        let positive: Box<dyn Evaluator> = if has_required {
            let required: Box<dyn Evaluator> = if scoring.len() == 1 && filters.is_empty() {
                scoring.remove(0)
            } else {
                Box::new(ConjunctionEvaluator::new(scoring, filters)?)
            };
            match optional {
                Some(optional) if self.minimum_should_match > 0 => {
                    Box::new(ConjunctionEvaluator::new(vec![required, optional], vec![])?)
                }
                Some(optional) => Box::new(ReqOptEvaluator::new(required, optional)),
                None => required,
            }
        } else {
            match optional {
                Some(optional) => optional,
                None => return Ok(None),
            }
        };

        if prohibited.is_empty() {
            Ok(Some(positive))
        } else {
            Ok(Some(Box::new(ReqExclEvaluator::new(positive, prohibited)?)))
        }
    }
}

/// Builder for boolean queries.
#[derive(Debug)]
pub struct BooleanQueryBuilder {
    clauses: Vec<BooleanClause>,
    boost: f32,
    minimum_should_match: usize,
}

impl BooleanQueryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        BooleanQueryBuilder {
            clauses: Vec::new(),
            boost: 1.0,
            minimum_should_match: 0,
        }
    }

    /// Add a MUST clause.
    pub fn must(mut self, query: Box<dyn Query>) -> Self {
        self.clauses.push(BooleanClause::must(query));
        self
    }

    /// Add a SHOULD clause.
    pub fn should(mut self, query: Box<dyn Query>) -> Self {
        self.clauses.push(BooleanClause::should(query));
        self
    }

    /// Add a MUST_NOT clause.
    pub fn must_not(mut self, query: Box<dyn Query>) -> Self {
        self.clauses.push(BooleanClause::must_not(query));
        self
    }

    /// Add a FILTER clause.
    pub fn filter(mut self, query: Box<dyn Query>) -> Self {
        self.clauses.push(BooleanClause::filter(query));
        self
    }

    /// Set the boost factor.
    pub fn boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Set the minimum number of should clauses that must match.
    pub fn minimum_should_match(mut self, minimum: usize) -> Self {
        self.minimum_should_match = minimum;
        self
    }

    /// Build the query.
    pub fn build(self) -> Result<BooleanQuery> {
        Ok(BooleanQuery::new(self.clauses)?
            .with_boost(self.boost)
            .with_minimum_should_match(self.minimum_should_match))
    }
}

impl Default for BooleanQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::index::memory::MemoryIndex;
    use crate::query::evaluator::tests::drain;
    use crate::query::match_all::MatchAllQuery;
    use crate::query::term::TermQuery;
    use crate::search::config::SearcherConfig;

    fn term(text: &str) -> Box<dyn Query> {
        Box::new(TermQuery::new("field", text))
    }

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

    fn matches(searcher: &Searcher, query: &BooleanQuery, mode: ScoringMode) -> Vec<u64> {
        let weight = query.weight(searcher, mode, 1.0).unwrap();
        match weight.evaluator(&searcher.segments()[0]).unwrap() {
            Some(mut evaluator) => drain(evaluator.as_mut()),
            None => Vec::new(),
        }
    }

    #[test]
    fn test_clause_equality() {
        assert_eq!(BooleanClause::must(term("a")), BooleanClause::must(term("a")));
        assert_ne!(BooleanClause::must(term("a")), BooleanClause::filter(term("a")));
        assert_ne!(BooleanClause::must(term("a")), BooleanClause::must(term("b")));

        let wrapped = |score: f32| {
            BooleanClause::should(Box::new(ConstantScoreQuery::new(term("a")).with_score(score)))
        };
        assert_eq!(wrapped(1.0), wrapped(1.0));
        assert_ne!(wrapped(1.0), wrapped(2.0));
    }

    #[test]
    fn test_clause_scoring_mode() {
        for mode in ScoringMode::ALL {
            assert_eq!(BooleanQuery::clause_scoring_mode(Occur::Must, mode), mode);
            assert_eq!(BooleanQuery::clause_scoring_mode(Occur::Should, mode), mode);
            assert_eq!(
                BooleanQuery::clause_scoring_mode(Occur::MustNot, mode),
                ScoringMode::CompleteNoScores
            );
            assert_eq!(
                BooleanQuery::clause_scoring_mode(Occur::Filter, mode),
                ScoringMode::CompleteNoScores
            );
        }
    }

    #[test]
    fn test_only_prohibited_clauses_rejected() {
        let result = BooleanQuery::builder()
            .must_not(term("3"))
            .must_not(term("4"))
            .build();
        assert!(matches!(result, Err(GlaiveError::Query(_))));

        assert!(BooleanQuery::new(vec![BooleanClause::must_not(term("3"))]).is_err());
        assert!(
            BooleanQuery::builder()
                .filter(term("this"))
                .must_not(term("3"))
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let searcher = searcher();
        let query = BooleanQuery::new(Vec::new()).unwrap();
        assert!(query.is_empty());
        assert!(matches(&searcher, &query, ScoringMode::Complete).is_empty());
    }

    #[test]
    fn test_must_and_must_not() {
        let searcher = searcher();
        let query = BooleanQuery::builder()
            .must(term("this"))
            .must_not(term("3"))
            .build()
            .unwrap();

        for mode in ScoringMode::ALL {
            assert_eq!(matches(&searcher, &query, mode), vec![0, 1, 2, 4]);
        }
    }

    #[test]
    fn test_should_only_is_disjunction() {
        let searcher = searcher();
        let query = BooleanQuery::builder()
            .should(term("1"))
            .should(term("3"))
            .should(term("missing"))
            .build()
            .unwrap();

        assert_eq!(matches(&searcher, &query, ScoringMode::Complete), vec![1, 3]);
    }

    #[test]
    fn test_missing_required_clause_matches_nothing() {
        let searcher = searcher();
        let query = BooleanQuery::builder()
            .must(term("this"))
            .filter(term("missing"))
            .build()
            .unwrap();

        assert!(matches(&searcher, &query, ScoringMode::Complete).is_empty());
    }

    #[test]
    fn test_minimum_should_match() {
        let searcher = searcher();
        let query = BooleanQuery::builder()
            .must(term("document"))
            .should(term("this"))
            .should(term("2"))
            .minimum_should_match(2)
            .build()
            .unwrap();

        // Optional clauses still gate matches when a minimum is set
        for mode in ScoringMode::ALL {
            assert_eq!(matches(&searcher, &query, mode), vec![2]);
        }

        let unreachable = BooleanQuery::builder()
            .should(term("this"))
            .should(term("missing"))
            .minimum_should_match(2)
            .build()
            .unwrap();
        assert!(matches(&searcher, &unreachable, ScoringMode::Complete).is_empty());
    }

    #[test]
    fn test_filter_does_not_score() {
        let searcher = searcher();
        let scored = BooleanQuery::builder()
            .must(term("this"))
            .build()
            .unwrap();
        let filtered = BooleanQuery::builder()
            .must(term("this"))
            .filter(term("2"))
            .build()
            .unwrap();

        let score_of = |query: &BooleanQuery| {
            let weight = query.weight(&searcher, ScoringMode::Complete, 1.0).unwrap();
            let mut evaluator = weight.evaluator(&searcher.segments()[0]).unwrap().unwrap();
            evaluator.skip_to(2).unwrap();
            evaluator.score().unwrap()
        };

        assert_eq!(score_of(&scored), score_of(&filtered));
    }

    #[test]
    fn test_should_raises_score_of_required_matches() {
        let searcher = searcher();
        let query = BooleanQuery::builder()
            .must(term("this"))
            .should(term("2"))
            .build()
            .unwrap();
        let weight = query.weight(&searcher, ScoringMode::Complete, 1.0).unwrap();
        let mut evaluator = weight.evaluator(&searcher.segments()[0]).unwrap().unwrap();

        let base = evaluator.score().unwrap();
        evaluator.skip_to(2).unwrap();
        assert!(evaluator.score().unwrap() > base);
        assert_eq!(drain(evaluator.as_mut()), vec![2, 3, 4]);
    }

    #[test]
    fn test_rewrite_collapses_single_clause() {
        let searcher = searcher();

        let single = BooleanQuery::builder().must(term("this")).build().unwrap();
        let rewritten = single.rewrite(&searcher).unwrap().unwrap();
        assert_eq!(rewritten, term("this"));

        let filter = BooleanQuery::builder().filter(term("this")).build().unwrap();
        let rewritten = filter.rewrite(&searcher).unwrap().unwrap();
        let expected: Box<dyn Query> =
            Box::new(ConstantScoreQuery::new(term("this")).with_score(0.0));
        assert_eq!(rewritten, expected);

        let boosted = BooleanQuery::builder()
            .must(term("this"))
            .boost(2.0)
            .build()
            .unwrap();
        assert!(boosted.rewrite(&searcher).unwrap().is_none());
    }

    #[test]
    fn test_rewrite_keeps_minimum_should_match_semantics() {
        let searcher = searcher();

        let shapes = [
            (Occur::Must, 1),
            (Occur::Must, 2),
            (Occur::Filter, 1),
            (Occur::Should, 1),
            (Occur::Should, 2),
        ];
        for (occur, msm) in shapes {
            let query = BooleanQuery::new(vec![BooleanClause::new(term("this"), occur)])
                .unwrap()
                .with_minimum_should_match(msm);
            let direct = matches(&searcher, &query, ScoringMode::CompleteNoScores);

            let counted = match query.rewrite(&searcher).unwrap() {
                Some(rewritten) => {
                    let weight = rewritten
                        .weight(&searcher, ScoringMode::CompleteNoScores, 1.0)
                        .unwrap();
                    match weight.evaluator(&searcher.segments()[0]).unwrap() {
                        Some(mut evaluator) => drain(evaluator.as_mut()),
                        None => Vec::new(),
                    }
                }
                None => direct.clone(),
            };
            assert_eq!(direct, counted, "{occur} with minimum_should_match {msm}");
        }

        let required = BooleanQuery::builder()
            .must(term("this"))
            .minimum_should_match(1)
            .build()
            .unwrap();
        assert!(required.rewrite(&searcher).unwrap().is_none());
        assert!(matches(&searcher, &required, ScoringMode::Complete).is_empty());

        let optional = BooleanQuery::builder()
            .should(term("this"))
            .minimum_should_match(1)
            .build()
            .unwrap();
        assert_eq!(optional.rewrite(&searcher).unwrap().unwrap(), term("this"));
    }

    #[test]
    fn test_rewrite_descends_into_clauses() {
        let searcher = searcher();
        let nested = BooleanQuery::builder().must(term("3")).build().unwrap();
        let query = BooleanQuery::builder()
            .must(Box::new(MatchAllQuery::new()))
            .must_not(Box::new(nested))
            .build()
            .unwrap();

        let rewritten = query.rewrite(&searcher).unwrap().unwrap();
        let expected = BooleanQuery::builder()
            .must(Box::new(MatchAllQuery::new()))
            .must_not(term("3"))
            .build()
            .unwrap();
        assert_eq!(rewritten.as_any().downcast_ref::<BooleanQuery>(), Some(&expected));
        assert!(expected.rewrite(&searcher).unwrap().is_none());
    }

    #[test]
    fn test_description() {
        let query = BooleanQuery::builder()
            .must(term("this"))
            .should(term("is"))
            .must_not(term("3"))
            .filter(term("document"))
            .build()
            .unwrap();
        assert_eq!(
            query.description(),
            "(+field:this field:is -field:3 #field:document)"
        );
        assert_eq!(query.with_boost(2.0).description().chars().last(), Some('2'));
    }
}
