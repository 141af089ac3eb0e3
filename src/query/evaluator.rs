//! Per-segment evaluators produced by weights.
//!
//! An evaluator walks the documents a query matches in one segment, in
//! increasing document-id order. A fresh evaluator is already positioned on
//! its first match (or on [`TERMINATED`]).
//!
//! Scores are only pulled through [`Evaluator::score`], and the searcher
//! only calls it when the weight's scoring mode needs scores.

use std::fmt::Debug;

use crate::error::Result;
use crate::index::reader::TERMINATED;
use crate::query::scorer::{ConstantScorer, Scorer};

/// Trait for document evaluators.
pub trait Evaluator: Send + Debug {
    /// Get the current document ID.
    fn doc_id(&self) -> u64;

    /// Move to the next matching document.
    fn next(&mut self) -> Result<bool>;

    /// Skip to the first matching document >= target.
    ///
    /// Never moves backwards. Returns whether a document is available.
    fn skip_to(&mut self, target: u64) -> Result<bool>;

    /// Get the estimated number of documents this evaluator visits.
    fn cost(&self) -> u64;

    /// Check if this evaluator is exhausted.
    fn is_exhausted(&self) -> bool {
        self.doc_id() == TERMINATED
    }

    /// Score of the current document.
    fn score(&mut self) -> Result<f32>;

    /// Upper bound of any score this evaluator can still produce.
    fn max_score(&self) -> f32;

    /// Tell the evaluator that documents scoring at or below `min_score`
    /// cannot enter the results.
    ///
    /// Only sent when the scoring mode is not exhaustive. Evaluators that can
    /// prove nothing remaining beats the threshold may terminate early.
    fn set_min_competitive_score(&mut self, _min_score: f32) {}
}

/// Matches every document of a segment with a constant score.
#[derive(Debug)]
pub struct AllEvaluator {
    current_doc: u64,
    max_doc: u64,
    scorer: ConstantScorer,
    allow_pruning: bool,
}

impl AllEvaluator {
    /// Create an evaluator over `0..max_doc`.
    pub fn new(max_doc: u64, scorer: ConstantScorer, allow_pruning: bool) -> Self {
        AllEvaluator {
            current_doc: if max_doc == 0 { TERMINATED } else { 0 },
            max_doc,
            scorer,
            allow_pruning,
        }
    }
}

impl Evaluator for AllEvaluator {
    fn doc_id(&self) -> u64 {
        self.current_doc
    }

    fn next(&mut self) -> Result<bool> {
        if self.current_doc == TERMINATED {
            return Ok(false);
        }
        self.current_doc += 1;
        if self.current_doc >= self.max_doc {
            self.current_doc = TERMINATED;
        }
        Ok(self.current_doc != TERMINATED)
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if self.current_doc == TERMINATED || target <= self.current_doc {
            return Ok(self.current_doc != TERMINATED);
        }
        self.current_doc = if target >= self.max_doc {
            TERMINATED
        } else {
            target
        };
        Ok(self.current_doc != TERMINATED)
    }

    fn cost(&self) -> u64 {
        self.max_doc
    }

    fn score(&mut self) -> Result<f32> {
        Ok(self.scorer.value())
    }

    fn max_score(&self) -> f32 {
        self.scorer.max_score()
    }

    fn set_min_competitive_score(&mut self, min_score: f32) {
        // Every remaining document ties with the current one
        if self.allow_pruning && self.scorer.value() <= min_score {
            self.current_doc = TERMINATED;
        }
    }
}

/// A conjunction (AND) of evaluators.
///
/// Only the scoring members contribute to the score; filter members just
/// gate membership.
#[derive(Debug)]
pub struct ConjunctionEvaluator {
    /// Members ordered by ascending cost, flagged with whether they score.
    members: Vec<(Box<dyn Evaluator>, bool)>,
    current_doc: u64,
    cost: u64,
}

impl ConjunctionEvaluator {
    /// Create a conjunction of scoring and non-scoring evaluators.
    pub fn new(
        scoring: Vec<Box<dyn Evaluator>>,
        filters: Vec<Box<dyn Evaluator>>,
    ) -> Result<Self> {
        let mut members: Vec<(Box<dyn Evaluator>, bool)> = scoring
            .into_iter()
            .map(|evaluator| (evaluator, true))
            .chain(filters.into_iter().map(|evaluator| (evaluator, false)))
            .collect();
        // The cheapest member leads
        members.sort_by_key(|(evaluator, _)| evaluator.cost());

        let cost = members
            .first()
            .map(|(evaluator, _)| evaluator.cost())
            .unwrap_or(0);
        let mut evaluator = ConjunctionEvaluator {
            members,
            current_doc: 0,
            cost,
        };
        if evaluator.members.is_empty() {
            evaluator.current_doc = TERMINATED;
        } else {
            evaluator.align()?;
        }
        Ok(evaluator)
    }

    /// Advance all members until they sit on the same document.
    fn align(&mut self) -> Result<bool> {
        loop {
            let mut max_doc = 0;
            for (member, _) in &self.members {
                let doc_id = member.doc_id();
                if doc_id == TERMINATED {
                    self.current_doc = TERMINATED;
                    return Ok(false);
                }
                max_doc = max_doc.max(doc_id);
            }

            let mut aligned = true;
            for (member, _) in &mut self.members {
                if member.doc_id() < max_doc {
                    if !member.skip_to(max_doc)? {
                        self.current_doc = TERMINATED;
                        return Ok(false);
                    }
                    if member.doc_id() != max_doc {
                        aligned = false;
                    }
                }
            }

            if aligned {
                self.current_doc = max_doc;
                return Ok(true);
            }
        }
    }
}

impl Evaluator for ConjunctionEvaluator {
    fn doc_id(&self) -> u64 {
        self.current_doc
    }

    fn next(&mut self) -> Result<bool> {
        if self.current_doc == TERMINATED {
            return Ok(false);
        }
        if !self.members[0].0.next()? {
            self.current_doc = TERMINATED;
            return Ok(false);
        }
        self.align()
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if self.current_doc == TERMINATED || target <= self.current_doc {
            return Ok(self.current_doc != TERMINATED);
        }
        if !self.members[0].0.skip_to(target)? {
            self.current_doc = TERMINATED;
            return Ok(false);
        }
        self.align()
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn score(&mut self) -> Result<f32> {
        let mut total = 0.0;
        for (member, scores) in &mut self.members {
            if *scores {
                total += member.score()?;
            }
        }
        Ok(total)
    }

    fn max_score(&self) -> f32 {
        self.members
            .iter()
            .filter(|(_, scores)| *scores)
            .map(|(member, _)| member.max_score())
            .sum()
    }
}

/// A disjunction (OR) of evaluators with an optional minimum match count.
///
/// Keeps its members in a plain vector; clause counts are small, and scoring
/// needs mutable access to every member positioned on the current document.
#[derive(Debug)]
pub struct DisjunctionEvaluator {
    members: Vec<Box<dyn Evaluator>>,
    minimum_should_match: usize,
    current_doc: u64,
    cost: u64,
}

impl DisjunctionEvaluator {
    /// Create a disjunction matching documents hit by at least one member.
    pub fn new(members: Vec<Box<dyn Evaluator>>) -> Result<Self> {
        Self::with_minimum_should_match(members, 1)
    }

    /// Create a disjunction matching documents hit by at least `minimum` members.
    pub fn with_minimum_should_match(
        members: Vec<Box<dyn Evaluator>>,
        minimum: usize,
    ) -> Result<Self> {
        let members: Vec<_> = members
            .into_iter()
            .filter(|member| !member.is_exhausted())
            .collect();
        let cost = members.iter().map(|member| member.cost()).sum();
        let mut evaluator = DisjunctionEvaluator {
            members,
            minimum_should_match: minimum.max(1),
            current_doc: 0,
            cost,
        };
        evaluator.settle()?;
        Ok(evaluator)
    }

    /// Position on the smallest document matched by enough members.
    fn settle(&mut self) -> Result<bool> {
        loop {
            let candidate = self
                .members
                .iter()
                .map(|member| member.doc_id())
                .min()
                .unwrap_or(TERMINATED);
            if candidate == TERMINATED {
                self.current_doc = TERMINATED;
                return Ok(false);
            }

            let matching = self
                .members
                .iter()
                .filter(|member| member.doc_id() == candidate)
                .count();
            if matching >= self.minimum_should_match {
                self.current_doc = candidate;
                return Ok(true);
            }

            for member in &mut self.members {
                if member.doc_id() == candidate {
                    member.next()?;
                }
            }
        }
    }
}

impl Evaluator for DisjunctionEvaluator {
    fn doc_id(&self) -> u64 {
        self.current_doc
    }

    fn next(&mut self) -> Result<bool> {
        if self.current_doc == TERMINATED {
            return Ok(false);
        }
        let current = self.current_doc;
        for member in &mut self.members {
            if member.doc_id() == current {
                member.next()?;
            }
        }
        self.settle()
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if self.current_doc == TERMINATED || target <= self.current_doc {
            return Ok(self.current_doc != TERMINATED);
        }
        for member in &mut self.members {
            if member.doc_id() < target {
                member.skip_to(target)?;
            }
        }
        self.settle()
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn score(&mut self) -> Result<f32> {
        let current = self.current_doc;
        let mut total = 0.0;
        for member in &mut self.members {
            if member.doc_id() == current {
                total += member.score()?;
            }
        }
        Ok(total)
    }

    fn max_score(&self) -> f32 {
        self.members.iter().map(|member| member.max_score()).sum()
    }
}

/// Required matches minus any document hit by an excluded evaluator.
#[derive(Debug)]
pub struct ReqExclEvaluator {
    required: Box<dyn Evaluator>,
    excluded: Vec<Box<dyn Evaluator>>,
    current_doc: u64,
}

impl ReqExclEvaluator {
    /// Create an exclusion evaluator.
    pub fn new(required: Box<dyn Evaluator>, excluded: Vec<Box<dyn Evaluator>>) -> Result<Self> {
        let mut evaluator = ReqExclEvaluator {
            required,
            excluded,
            current_doc: 0,
        };
        evaluator.advance_to_next_valid()?;
        Ok(evaluator)
    }

    /// Check whether any excluded evaluator matches the document.
    fn is_excluded(&mut self, doc_id: u64) -> Result<bool> {
        for excluded in &mut self.excluded {
            if excluded.doc_id() < doc_id {
                excluded.skip_to(doc_id)?;
            }
            if excluded.doc_id() == doc_id {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Move the required evaluator forward until it sits on a kept document.
    fn advance_to_next_valid(&mut self) -> Result<bool> {
        loop {
            let doc_id = self.required.doc_id();
            if doc_id == TERMINATED {
                self.current_doc = TERMINATED;
                return Ok(false);
            }
            if !self.is_excluded(doc_id)? {
                self.current_doc = doc_id;
                return Ok(true);
            }
            self.required.next()?;
        }
    }
}

impl Evaluator for ReqExclEvaluator {
    fn doc_id(&self) -> u64 {
        self.current_doc
    }

    fn next(&mut self) -> Result<bool> {
        if self.current_doc == TERMINATED {
            return Ok(false);
        }
        self.required.next()?;
        self.advance_to_next_valid()
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if self.current_doc == TERMINATED || target <= self.current_doc {
            return Ok(self.current_doc != TERMINATED);
        }
        self.required.skip_to(target)?;
        self.advance_to_next_valid()
    }

    fn cost(&self) -> u64 {
        self.required.cost()
    }

    fn score(&mut self) -> Result<f32> {
        self.required.score()
    }

    fn max_score(&self) -> f32 {
        self.required.max_score()
    }

    fn set_min_competitive_score(&mut self, min_score: f32) {
        // Exclusions never change the score, so the hint applies unchanged
        self.required.set_min_competitive_score(min_score);
        if self.required.is_exhausted() {
            self.current_doc = TERMINATED;
        }
    }
}

/// Required matches whose score is raised by an optional evaluator.
#[derive(Debug)]
pub struct ReqOptEvaluator {
    required: Box<dyn Evaluator>,
    optional: Box<dyn Evaluator>,
}

impl ReqOptEvaluator {
    /// Create a required-plus-optional evaluator.
    pub fn new(required: Box<dyn Evaluator>, optional: Box<dyn Evaluator>) -> Self {
        ReqOptEvaluator { required, optional }
    }
}

impl Evaluator for ReqOptEvaluator {
    fn doc_id(&self) -> u64 {
        self.required.doc_id()
    }

    fn next(&mut self) -> Result<bool> {
        self.required.next()
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        self.required.skip_to(target)
    }

    fn cost(&self) -> u64 {
        self.required.cost()
    }

    fn score(&mut self) -> Result<f32> {
        let doc_id = self.required.doc_id();
        let mut total = self.required.score()?;
        if self.optional.doc_id() < doc_id {
            self.optional.skip_to(doc_id)?;
        }
        if self.optional.doc_id() == doc_id {
            total += self.optional.score()?;
        }
        Ok(total)
    }

    fn max_score(&self) -> f32 {
        self.required.max_score() + self.optional.max_score()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A fixed list of documents, each with its own score.
    #[derive(Debug)]
    pub(crate) struct VecEvaluator {
        docs: Vec<(u64, f32)>,
        position: usize,
    }

    impl VecEvaluator {
        pub(crate) fn boxed(docs: &[u64]) -> Box<dyn Evaluator> {
            Self::scored(&docs.iter().map(|&doc| (doc, 1.0)).collect::<Vec<_>>())
        }

        pub(crate) fn scored(docs: &[(u64, f32)]) -> Box<dyn Evaluator> {
            Box::new(VecEvaluator {
                docs: docs.to_vec(),
                position: 0,
            })
        }
    }

    impl Evaluator for VecEvaluator {
        fn doc_id(&self) -> u64 {
            self.docs
                .get(self.position)
                .map(|(doc, _)| *doc)
                .unwrap_or(TERMINATED)
        }

        fn next(&mut self) -> Result<bool> {
            if self.position < self.docs.len() {
                self.position += 1;
            }
            Ok(self.position < self.docs.len())
        }

        fn skip_to(&mut self, target: u64) -> Result<bool> {
            while self.doc_id() < target {
                self.position += 1;
            }
            Ok(self.position < self.docs.len())
        }

        fn cost(&self) -> u64 {
            self.docs.len() as u64
        }

        fn score(&mut self) -> Result<f32> {
            Ok(self.docs.get(self.position).map(|(_, s)| *s).unwrap_or(0.0))
        }

        fn max_score(&self) -> f32 {
            self.docs.iter().map(|(_, s)| *s).fold(0.0, f32::max)
        }
    }

    pub(crate) fn drain(evaluator: &mut dyn Evaluator) -> Vec<u64> {
        let mut docs = Vec::new();
        while !evaluator.is_exhausted() {
            docs.push(evaluator.doc_id());
            evaluator.next().unwrap();
        }
        docs
    }

    #[test]
    fn test_all_evaluator() {
        let mut evaluator = AllEvaluator::new(5, ConstantScorer::new(1.0), false);

        assert_eq!(evaluator.doc_id(), 0);
        assert_eq!(evaluator.cost(), 5);
        assert!(evaluator.next().unwrap());
        assert_eq!(evaluator.doc_id(), 1);
        assert!(evaluator.skip_to(4).unwrap());
        assert_eq!(evaluator.doc_id(), 4);
        assert!(!evaluator.next().unwrap());
        assert!(evaluator.is_exhausted());

        let empty = AllEvaluator::new(0, ConstantScorer::new(1.0), false);
        assert!(empty.is_exhausted());
    }

    #[test]
    fn test_all_evaluator_pruning_only_when_allowed() {
        let mut exhaustive = AllEvaluator::new(5, ConstantScorer::new(1.0), false);
        exhaustive.set_min_competitive_score(1.0);
        assert!(!exhaustive.is_exhausted());

        let mut prunable = AllEvaluator::new(5, ConstantScorer::new(1.0), true);
        prunable.set_min_competitive_score(0.5);
        assert!(!prunable.is_exhausted());
        prunable.set_min_competitive_score(1.0);
        assert!(prunable.is_exhausted());
    }

    #[test]
    fn test_conjunction() {
        let mut evaluator = ConjunctionEvaluator::new(
            vec![
                VecEvaluator::boxed(&[1, 3, 5, 7, 9]),
                VecEvaluator::boxed(&[3, 4, 5, 9]),
            ],
            vec![VecEvaluator::boxed(&[0, 3, 9])],
        )
        .unwrap();

        assert_eq!(evaluator.cost(), 3);
        assert_eq!(evaluator.doc_id(), 3);
        // Filter members do not contribute
        assert_eq!(evaluator.score().unwrap(), 2.0);
        assert_eq!(drain(&mut evaluator), vec![3, 9]);
    }

    #[test]
    fn test_conjunction_skip_to() {
        let mut evaluator = ConjunctionEvaluator::new(
            vec![
                VecEvaluator::boxed(&[1, 3, 5, 7, 9]),
                VecEvaluator::boxed(&[1, 5, 7, 9]),
            ],
            vec![],
        )
        .unwrap();

        assert!(evaluator.skip_to(6).unwrap());
        assert_eq!(evaluator.doc_id(), 7);
        assert!(!evaluator.skip_to(10).unwrap());
        assert!(evaluator.is_exhausted());
    }

    #[test]
    fn test_disjunction_scores_every_match() {
        let mut evaluator = DisjunctionEvaluator::new(vec![
            VecEvaluator::scored(&[(1, 1.0), (4, 1.0)]),
            VecEvaluator::scored(&[(1, 2.0), (2, 2.0)]),
        ])
        .unwrap();

        assert_eq!(evaluator.doc_id(), 1);
        assert_eq!(evaluator.score().unwrap(), 3.0);
        assert!(evaluator.next().unwrap());
        assert_eq!(evaluator.doc_id(), 2);
        assert_eq!(evaluator.score().unwrap(), 2.0);
        assert_eq!(evaluator.max_score(), 3.0);
        assert_eq!(drain(&mut evaluator), vec![2, 4]);
    }

    #[test]
    fn test_disjunction_minimum_should_match() {
        let mut evaluator = DisjunctionEvaluator::with_minimum_should_match(
            vec![
                VecEvaluator::boxed(&[1, 2, 3]),
                VecEvaluator::boxed(&[2, 3, 4]),
                VecEvaluator::boxed(&[3, 4, 5]),
            ],
            2,
        )
        .unwrap();

        assert_eq!(drain(&mut evaluator), vec![2, 3, 4]);
    }

    #[test]
    fn test_disjunction_skip_to() {
        let mut evaluator = DisjunctionEvaluator::new(vec![
            VecEvaluator::boxed(&[1, 8]),
            VecEvaluator::boxed(&[3, 6]),
        ])
        .unwrap();

        assert!(evaluator.skip_to(4).unwrap());
        assert_eq!(evaluator.doc_id(), 6);
        assert!(evaluator.skip_to(7).unwrap());
        assert_eq!(evaluator.doc_id(), 8);
        assert!(!evaluator.next().unwrap());
    }

    #[test]
    fn test_req_excl() {
        let mut evaluator = ReqExclEvaluator::new(
            VecEvaluator::boxed(&[0, 1, 2, 3, 4]),
            vec![VecEvaluator::boxed(&[3]), VecEvaluator::boxed(&[0, 4])],
        )
        .unwrap();

        assert_eq!(drain(&mut evaluator), vec![1, 2]);
    }

    #[test]
    fn test_req_opt_adds_optional_score() {
        let mut evaluator = ReqOptEvaluator::new(
            VecEvaluator::scored(&[(1, 1.0), (2, 1.0), (5, 1.0)]),
            VecEvaluator::scored(&[(2, 0.5), (3, 0.5)]),
        );

        assert_eq!(evaluator.doc_id(), 1);
        assert_eq!(evaluator.score().unwrap(), 1.0);
        evaluator.next().unwrap();
        assert_eq!(evaluator.score().unwrap(), 1.5);
        evaluator.next().unwrap();
        assert_eq!(evaluator.doc_id(), 5);
        assert_eq!(evaluator.score().unwrap(), 1.0);
        assert_eq!(evaluator.max_score(), 1.5);
    }
}
