//! Collector implementations for gathering search results.
//!
//! A collector states what it needs from an evaluation through
//! [`Collector::scoring_mode`], which every implementation derives with the
//! resolver. The searcher then only hands over scores when that mode needs
//! them.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};
use crate::index::reader::IndexReader;
use crate::query::SearchHit;
use crate::query::scoring_mode::ScoringMode;
use crate::query::sort::{Sort, SortField, SortValue};
use crate::search::resolver::{ResultOrdering, resolve_scoring_mode};

/// Hits counted exactly before a top-k collector may start pruning.
pub const DEFAULT_TOTAL_HITS_THRESHOLD: usize = 1000;

/// Whether [`TotalHits::value`] is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TotalHitsRelation {
    /// The count is exact.
    EqualTo,
    /// The count is a lower bound; pruning may have skipped matches.
    GreaterThanOrEqualTo,
}

/// Number of matches of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TotalHits {
    /// Number of matches counted.
    pub value: u64,
    /// How `value` relates to the true number of matches.
    pub relation: TotalHitsRelation,
}

impl TotalHits {
    /// An exact count.
    pub fn exact(value: u64) -> Self {
        TotalHits {
            value,
            relation: TotalHitsRelation::EqualTo,
        }
    }

    /// A lower bound.
    pub fn lower_bound(value: u64) -> Self {
        TotalHits {
            value,
            relation: TotalHitsRelation::GreaterThanOrEqualTo,
        }
    }

    /// Whether the count is exact.
    pub fn is_exact(&self) -> bool {
        self.relation == TotalHitsRelation::EqualTo
    }
}

impl fmt::Display for TotalHits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.relation {
            TotalHitsRelation::EqualTo => write!(f, "{}", self.value),
            TotalHitsRelation::GreaterThanOrEqualTo => write!(f, "{}+", self.value),
        }
    }
}

/// Trait for collecting search results.
pub trait Collector: Send + Debug {
    /// The mode the root query must be evaluated under.
    fn scoring_mode(&self) -> ScoringMode;

    /// Called before the documents of a segment are collected.
    ///
    /// `doc_base` turns segment-local ids into global ones.
    fn set_segment(&mut self, segment_ord: usize, doc_base: u64);

    /// Collect a document hit.
    ///
    /// `score` is `None` when the scoring mode does not need scores.
    fn collect(&mut self, reader: &dyn IndexReader, doc_id: u64, score: Option<f32>)
    -> Result<()>;

    /// Whether more documents of the current segment can change the results.
    fn needs_more(&self) -> bool {
        true
    }

    /// Score a document must exceed to still enter the results.
    fn min_competitive_score(&self) -> Option<f32> {
        None
    }

    /// Get the final results.
    fn results(&self) -> Vec<SearchHit>;

    /// Get the number of matches.
    fn total_hits(&self) -> TotalHits;

    /// Reset the collector for a new search.
    fn reset(&mut self);

    /// An empty collector with the same settings, for one segment.
    fn segment_collector(&self) -> Box<dyn Collector>;

    /// Fold the results of a segment collector into this one.
    fn merge(&mut self, other: Box<dyn Collector>) -> Result<()>;

    /// Convert into `Any` for merging.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

fn downcast_collector<C: 'static>(other: Box<dyn Collector>) -> Result<Box<C>> {
    other
        .into_any()
        .downcast::<C>()
        .map_err(|_| GlaiveError::invalid_operation("Cannot merge collectors of different types"))
}

fn required_score(score: Option<f32>) -> Result<f32> {
    score.ok_or_else(|| {
        GlaiveError::invalid_operation("Collector sorts by score but no score was computed")
    })
}

/// A collector that just counts the number of matching documents.
#[derive(Debug, Default)]
pub struct CountCollector {
    /// Total number of documents that matched.
    count: u64,
}

impl CountCollector {
    /// Create a new count collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the count.
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Collector for CountCollector {
    fn scoring_mode(&self) -> ScoringMode {
        resolve_scoring_mode(true, &ResultOrdering::Unordered)
    }

    fn set_segment(&mut self, _segment_ord: usize, _doc_base: u64) {}

    fn collect(
        &mut self,
        _reader: &dyn IndexReader,
        _doc_id: u64,
        _score: Option<f32>,
    ) -> Result<()> {
        self.count += 1;
        Ok(())
    }

    fn results(&self) -> Vec<SearchHit> {
        Vec::new()
    }

    fn total_hits(&self) -> TotalHits {
        TotalHits::exact(self.count)
    }

    fn reset(&mut self) {
        self.count = 0;
    }

    fn segment_collector(&self) -> Box<dyn Collector> {
        Box::new(CountCollector::new())
    }

    fn merge(&mut self, other: Box<dyn Collector>) -> Result<()> {
        let other = downcast_collector::<CountCollector>(other)?;
        self.count += other.count;
        Ok(())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A collector that keeps every match with its score.
#[derive(Debug, Default)]
pub struct AllDocsCollector {
    doc_base: u64,
    hits: Vec<ScoredDoc>,
}

impl AllDocsCollector {
    /// Create a new collector.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collector for AllDocsCollector {
    fn scoring_mode(&self) -> ScoringMode {
        resolve_scoring_mode(true, &ResultOrdering::relevance())
    }

    fn set_segment(&mut self, _segment_ord: usize, doc_base: u64) {
        self.doc_base = doc_base;
    }

    fn collect(&mut self, _reader: &dyn IndexReader, doc_id: u64, score: Option<f32>) -> Result<()> {
        self.hits.push(ScoredDoc {
            doc_id: self.doc_base + doc_id,
            score: required_score(score)?,
        });
        Ok(())
    }

    fn results(&self) -> Vec<SearchHit> {
        let mut hits = self.hits.clone();
        hits.sort();
        hits.into_iter().map(ScoredDoc::into_hit).collect()
    }

    fn total_hits(&self) -> TotalHits {
        TotalHits::exact(self.hits.len() as u64)
    }

    fn reset(&mut self) {
        self.doc_base = 0;
        self.hits.clear();
    }

    fn segment_collector(&self) -> Box<dyn Collector> {
        Box::new(AllDocsCollector::new())
    }

    fn merge(&mut self, other: Box<dyn Collector>) -> Result<()> {
        let other = downcast_collector::<AllDocsCollector>(other)?;
        self.hits.extend(other.hits);
        Ok(())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A scored document for use in the heap.
#[derive(Debug, Clone)]
struct ScoredDoc {
    doc_id: u64,
    score: f32,
}

impl ScoredDoc {
    fn into_hit(self) -> SearchHit {
        SearchHit {
            doc_id: self.doc_id,
            score: Some(self.score),
            sort_values: Vec::new(),
            document: None,
        }
    }
}

impl PartialEq for ScoredDoc {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredDoc {}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDoc {
    fn cmp(&self, other: &Self) -> Ordering {
        // Better hits are smaller: higher score first, then earlier doc.
        // The heap top is therefore the worst hit kept.
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

/// A collector that keeps the top N documents by score.
#[derive(Debug)]
pub struct TopDocsCollector {
    /// Maximum number of documents to collect.
    max_docs: usize,
    /// Matches counted exactly before pruning may start.
    total_hits_threshold: usize,
    /// Minimum score threshold.
    min_score: f32,
    doc_base: u64,
    /// Collected hits, worst on top.
    hits: BinaryHeap<ScoredDoc>,
    /// Total number of documents processed.
    total_hits: u64,
    /// Set once a segment collector reported a lower bound.
    merged_lower_bound: bool,
}

impl TopDocsCollector {
    /// Create a new top docs collector.
    pub fn new(max_docs: usize) -> Self {
        TopDocsCollector {
            max_docs,
            total_hits_threshold: DEFAULT_TOTAL_HITS_THRESHOLD,
            min_score: 0.0,
            doc_base: 0,
            hits: BinaryHeap::new(),
            total_hits: 0,
            merged_lower_bound: false,
        }
    }

    /// Count every match exactly when `threshold` is `usize::MAX`.
    pub fn with_total_hits_threshold(mut self, threshold: usize) -> Self {
        self.total_hits_threshold = threshold;
        self
    }

    /// Create a new top docs collector with minimum score threshold.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Get the maximum number of documents to collect.
    pub fn max_docs(&self) -> usize {
        self.max_docs
    }

    /// Whether the collector has to count every match.
    pub fn is_exact(&self) -> bool {
        self.total_hits_threshold == usize::MAX
    }

    fn is_full(&self) -> bool {
        self.max_docs > 0 && self.hits.len() >= self.max_docs
    }

    fn pruning_possible(&self) -> bool {
        !self.is_exact()
            && self.is_full()
            && self.total_hits >= self.total_hits_threshold as u64
    }
}

impl Collector for TopDocsCollector {
    fn scoring_mode(&self) -> ScoringMode {
        resolve_scoring_mode(self.is_exact(), &ResultOrdering::relevance())
    }

    fn set_segment(&mut self, _segment_ord: usize, doc_base: u64) {
        self.doc_base = doc_base;
    }

    fn collect(&mut self, _reader: &dyn IndexReader, doc_id: u64, score: Option<f32>) -> Result<()> {
        let score = required_score(score)?;
        self.total_hits += 1;

        // Check minimum score threshold
        if score < self.min_score || self.max_docs == 0 {
            return Ok(());
        }

        let scored_doc = ScoredDoc {
            doc_id: self.doc_base + doc_id,
            score,
        };

        if self.hits.len() < self.max_docs {
            self.hits.push(scored_doc);
        } else if let Some(worst) = self.hits.peek()
            && scored_doc < *worst
        {
            self.hits.pop();
            self.hits.push(scored_doc);
        }

        Ok(())
    }

    fn min_competitive_score(&self) -> Option<f32> {
        if self.pruning_possible() {
            self.hits.peek().map(|worst| worst.score)
        } else {
            None
        }
    }

    fn results(&self) -> Vec<SearchHit> {
        self.hits
            .clone()
            .into_sorted_vec()
            .into_iter()
            .map(ScoredDoc::into_hit)
            .collect()
    }

    fn total_hits(&self) -> TotalHits {
        if self.merged_lower_bound || self.pruning_possible() {
            TotalHits::lower_bound(self.total_hits)
        } else {
            TotalHits::exact(self.total_hits)
        }
    }

    fn reset(&mut self) {
        self.doc_base = 0;
        self.hits.clear();
        self.total_hits = 0;
        self.merged_lower_bound = false;
    }

    fn segment_collector(&self) -> Box<dyn Collector> {
        Box::new(
            TopDocsCollector::new(self.max_docs)
                .with_total_hits_threshold(self.total_hits_threshold)
                .with_min_score(self.min_score),
        )
    }

    fn merge(&mut self, other: Box<dyn Collector>) -> Result<()> {
        let other = downcast_collector::<TopDocsCollector>(other)?;
        self.merged_lower_bound |= !other.total_hits().is_exact();
        self.total_hits += other.total_hits;
        for hit in other.hits {
            self.hits.push(hit);
            if self.hits.len() > self.max_docs {
                self.hits.pop();
            }
        }
        Ok(())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[derive(Debug, Clone)]
struct FieldDoc {
    doc_id: u64,
    score: Option<f32>,
    values: Vec<SortValue>,
}

/// A collector that keeps the top N documents by a [`Sort`].
#[derive(Debug)]
pub struct TopFieldCollector {
    max_docs: usize,
    sort: Sort,
    total_hits_threshold: usize,
    doc_base: u64,
    /// Collected hits, best first.
    hits: Vec<FieldDoc>,
    total_hits: u64,
    merged_lower_bound: bool,
}

impl TopFieldCollector {
    /// Create a collector keeping the first `max_docs` documents by `sort`.
    pub fn new(max_docs: usize, sort: Sort) -> Self {
        TopFieldCollector {
            max_docs,
            sort,
            total_hits_threshold: DEFAULT_TOTAL_HITS_THRESHOLD,
            doc_base: 0,
            hits: Vec::new(),
            total_hits: 0,
            merged_lower_bound: false,
        }
    }

    /// Count every match exactly when `threshold` is `usize::MAX`.
    pub fn with_total_hits_threshold(mut self, threshold: usize) -> Self {
        self.total_hits_threshold = threshold;
        self
    }

    /// The sort in use.
    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Whether the collector has to count every match.
    pub fn is_exact(&self) -> bool {
        self.total_hits_threshold == usize::MAX
    }

    fn is_full(&self) -> bool {
        self.max_docs > 0 && self.hits.len() >= self.max_docs
    }

    fn pruning_possible(&self) -> bool {
        !self.is_exact()
            && self.is_full()
            && self.total_hits >= self.total_hits_threshold as u64
    }

    fn rank(&self, a: &FieldDoc, b: &FieldDoc) -> Ordering {
        self.sort
            .compare(&a.values, &b.values)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    }

    fn insert(&mut self, doc: FieldDoc) {
        if self.max_docs == 0 {
            return;
        }
        if self.is_full() {
            match self.hits.last() {
                Some(worst) if self.rank(&doc, worst) == Ordering::Less => {}
                _ => return,
            }
        }
        let position = self
            .hits
            .partition_point(|hit| self.rank(hit, &doc) == Ordering::Less);
        self.hits.insert(position, doc);
        self.hits.truncate(self.max_docs);
    }
}

impl Collector for TopFieldCollector {
    fn scoring_mode(&self) -> ScoringMode {
        resolve_scoring_mode(self.is_exact(), &ResultOrdering::Sorted(self.sort.clone()))
    }

    fn set_segment(&mut self, _segment_ord: usize, doc_base: u64) {
        self.doc_base = doc_base;
    }

    fn collect(&mut self, reader: &dyn IndexReader, doc_id: u64, score: Option<f32>) -> Result<()> {
        self.total_hits += 1;

        let global_id = self.doc_base + doc_id;
        let mut values = Vec::with_capacity(self.sort.fields().len());
        for field in self.sort.fields() {
            values.push(match field {
                SortField::Score => SortValue::Score(required_score(score)?),
                SortField::Doc => SortValue::Doc(global_id),
                SortField::Field { name, .. } => SortValue::Field(reader.doc_value(doc_id, name)),
            });
        }

        self.insert(FieldDoc {
            doc_id: global_id,
            score,
            values,
        });
        Ok(())
    }

    fn needs_more(&self) -> bool {
        // Later documents of the segment sort after every kept one
        !(self.sort.is_index_order_first() && self.pruning_possible())
    }

    fn min_competitive_score(&self) -> Option<f32> {
        // Only safe when ties on score are broken by index order
        let score_then_doc = match self.sort.fields() {
            [SortField::Score] | [SortField::Score, SortField::Doc] => true,
            _ => false,
        };
        if score_then_doc && self.pruning_possible() {
            self.hits.last().and_then(|worst| worst.score)
        } else {
            None
        }
    }

    fn results(&self) -> Vec<SearchHit> {
        self.hits
            .iter()
            .map(|hit| SearchHit {
                doc_id: hit.doc_id,
                score: hit.score,
                sort_values: hit.values.clone(),
                document: None,
            })
            .collect()
    }

    fn total_hits(&self) -> TotalHits {
        if self.merged_lower_bound || self.pruning_possible() {
            TotalHits::lower_bound(self.total_hits)
        } else {
            TotalHits::exact(self.total_hits)
        }
    }

    fn reset(&mut self) {
        self.doc_base = 0;
        self.hits.clear();
        self.total_hits = 0;
        self.merged_lower_bound = false;
    }

    fn segment_collector(&self) -> Box<dyn Collector> {
        Box::new(
            TopFieldCollector::new(self.max_docs, self.sort.clone())
                .with_total_hits_threshold(self.total_hits_threshold),
        )
    }

    fn merge(&mut self, other: Box<dyn Collector>) -> Result<()> {
        let other = downcast_collector::<TopFieldCollector>(other)?;
        self.merged_lower_bound |= !other.total_hits().is_exact();
        self.total_hits += other.total_hits;
        for hit in other.hits {
            self.insert(hit);
        }
        Ok(())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
