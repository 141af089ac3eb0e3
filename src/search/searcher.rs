//! Searcher implementation for executing queries against a set of segments.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use log::{debug, warn};
use parking_lot::RwLock;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::document::Document;
use crate::error::{GlaiveError, Result};
use crate::index::reader::IndexReader;
use crate::query::query::{Query, Weight};
use crate::query::scoring_mode::ScoringMode;
use crate::query::sort::Sort;
use crate::query::SearchResults;
use crate::search::SearchRequest;
use crate::search::collector::{Collector, CountCollector, TopDocsCollector, TopFieldCollector};
use crate::search::config::SearcherConfig;

/// Index-wide statistics of one term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermStatistics {
    /// Number of documents containing the term.
    pub doc_freq: u64,
    /// Total number of occurrences.
    pub total_freq: u64,
}

/// Index-wide statistics of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionStatistics {
    /// Number of documents holding the field.
    pub doc_count: u64,
    /// Total number of terms in the field.
    pub total_terms: u64,
}

impl CollectionStatistics {
    /// Average number of terms per document holding the field.
    pub fn avg_length(&self) -> f64 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.total_terms as f64 / self.doc_count as f64
        }
    }
}

/// A searcher that executes queries against a set of segments.
pub struct Searcher {
    segments: Vec<Arc<dyn IndexReader>>,
    /// Global id of the first document of each segment.
    doc_bases: Vec<u64>,
    config: SearcherConfig,
    rewrite_cache: RwLock<AHashMap<Box<dyn Query>, Box<dyn Query>>>,
    thread_pool: Option<ThreadPool>,
}

impl fmt::Debug for Searcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Searcher")
            .field("segments", &self.segments.len())
            .field("doc_bases", &self.doc_bases)
            .field("config", &self.config)
            .finish()
    }
}

impl Searcher {
    /// Create a searcher over `segments`, in global document order.
    pub fn new(segments: Vec<Arc<dyn IndexReader>>, config: SearcherConfig) -> Result<Self> {
        config.validate()?;

        let mut doc_bases = Vec::with_capacity(segments.len());
        let mut base = 0;
        for segment in &segments {
            doc_bases.push(base);
            base += segment.max_doc();
        }

        let thread_pool = if config.parallel {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.num_threads)
                .thread_name(|i| format!("glaive-search-{i}"))
                .build()
                .map_err(|e| GlaiveError::other(format!("Failed to create thread pool: {e}")))?;
            Some(pool)
        } else {
            None
        };

        Ok(Searcher {
            segments,
            doc_bases,
            config,
            rewrite_cache: RwLock::new(AHashMap::new()),
            thread_pool,
        })
    }

    /// Get the segment readers.
    pub fn segments(&self) -> &[Arc<dyn IndexReader>] {
        &self.segments
    }

    /// Get the configuration.
    pub fn config(&self) -> &SearcherConfig {
        &self.config
    }

    /// Total number of documents.
    pub fn doc_count(&self) -> u64 {
        self.segments.iter().map(|segment| segment.doc_count()).sum()
    }

    /// Index-wide statistics of a term, `None` if no document contains it.
    pub fn term_statistics(&self, field: &str, term: &str) -> Result<Option<TermStatistics>> {
        let mut stats = TermStatistics {
            doc_freq: 0,
            total_freq: 0,
        };
        for segment in &self.segments {
            if let Some(info) = segment.term_info(field, term)? {
                stats.doc_freq += info.doc_freq;
                stats.total_freq += info.total_freq;
            }
        }
        Ok((stats.doc_freq > 0).then_some(stats))
    }

    /// Index-wide statistics of a field, `None` if no document holds it.
    pub fn collection_statistics(&self, field: &str) -> Result<Option<CollectionStatistics>> {
        let mut stats = CollectionStatistics {
            doc_count: 0,
            total_terms: 0,
        };
        for segment in &self.segments {
            if let Some(field_stats) = segment.field_stats(field)? {
                stats.doc_count += field_stats.doc_count;
                stats.total_terms += field_stats.total_terms;
            }
        }
        Ok((stats.doc_count > 0).then_some(stats))
    }

    /// Rewrite a query until it no longer changes.
    pub fn rewrite(&self, query: &dyn Query) -> Result<Box<dyn Query>> {
        let key = query.clone_box();
        if self.config.cache_rewrites
            && let Some(cached) = self.rewrite_cache.read().get(&key)
        {
            return Ok(cached.clone());
        }

        let mut current = key.clone();
        let mut converged = false;
        for _ in 0..self.config.max_rewrite_iterations {
            match current.rewrite(self)? {
                Some(rewritten) => current = rewritten,
                None => {
                    converged = true;
                    break;
                }
            }
        }
        if !converged {
            warn!(
                "Rewrite of {} did not converge after {} iterations",
                query.description(),
                self.config.max_rewrite_iterations
            );
            return Err(GlaiveError::query(format!(
                "Rewrite did not converge after {} iterations",
                self.config.max_rewrite_iterations
            )));
        }

        if self.config.cache_rewrites && self.config.max_cached_rewrites > 0 {
            let mut cache = self.rewrite_cache.write();
            if cache.len() >= self.config.max_cached_rewrites {
                debug!("Rewrite cache reached {} entries, clearing", cache.len());
                cache.clear();
            }
            cache.insert(key, current.clone());
        }
        Ok(current)
    }

    /// Compile a query for one execution under `scoring_mode`.
    pub fn create_weight(
        &self,
        query: &dyn Query,
        scoring_mode: ScoringMode,
    ) -> Result<Box<dyn Weight>> {
        debug!(
            "Creating weight for {} with scoring mode {scoring_mode}",
            query.description()
        );
        query.weight(self, scoring_mode, 1.0)
    }

    /// Execute a query, feeding every match to `collector`.
    pub fn search_with_collector(
        &self,
        query: &dyn Query,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let query = self.rewrite(query)?;
        let weight = self.create_weight(query.as_ref(), collector.scoring_mode())?;

        match &self.thread_pool {
            Some(pool) if self.segments.len() > 1 => {
                let partials: Vec<Box<dyn Collector>> = self
                    .segments
                    .iter()
                    .map(|_| collector.segment_collector())
                    .collect();

                let partials = pool.install(|| {
                    partials
                        .into_par_iter()
                        .enumerate()
                        .map(|(ord, mut partial)| {
                            self.search_segment(weight.as_ref(), ord, partial.as_mut())?;
                            Ok(partial)
                        })
                        .collect::<Result<Vec<_>>>()
                })?;

                for partial in partials {
                    collector.merge(partial)?;
                }
            }
            _ => {
                for ord in 0..self.segments.len() {
                    self.search_segment(weight.as_ref(), ord, collector)?;
                }
            }
        }

        Ok(())
    }

    /// Drive one segment's evaluator into the collector.
    fn search_segment(
        &self,
        weight: &dyn Weight,
        ord: usize,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let reader = &self.segments[ord];
        collector.set_segment(ord, self.doc_bases[ord]);
        if !collector.needs_more() {
            return Ok(());
        }

        let Some(mut evaluator) = weight.evaluator(reader)? else {
            debug!("Segment {ord}: no matches");
            return Ok(());
        };

        let mode = weight.scoring_mode();
        let mut last_min_score = None;
        let mut collected = 0u64;

        while !evaluator.is_exhausted() {
            let doc_id = evaluator.doc_id();
            let score = if mode.needs_scores() {
                Some(evaluator.score()?)
            } else {
                None
            };
            collector.collect(reader.as_ref(), doc_id, score)?;
            collected += 1;

            if !mode.is_exhaustive() {
                if !collector.needs_more() {
                    debug!("Segment {ord}: stopped early after {collected} documents");
                    break;
                }
                if let Some(min_score) = collector.min_competitive_score()
                    && last_min_score != Some(min_score)
                {
                    evaluator.set_min_competitive_score(min_score);
                    last_min_score = Some(min_score);
                }
            }

            evaluator.next()?;
        }

        debug!("Segment {ord}: collected {collected} documents under {mode}");
        Ok(())
    }

    /// Execute a search request.
    pub fn search(&self, request: SearchRequest) -> Result<SearchResults> {
        let config = request.config;
        let mut collector: Box<dyn Collector> = match config.sort {
            Some(sort) if sort != Sort::relevance() => Box::new(
                TopFieldCollector::new(config.max_docs, sort)
                    .with_total_hits_threshold(config.total_hits_threshold),
            ),
            _ => Box::new(
                TopDocsCollector::new(config.max_docs)
                    .with_total_hits_threshold(config.total_hits_threshold)
                    .with_min_score(config.min_score),
            ),
        };

        self.search_with_collector(request.query.as_ref(), collector.as_mut())?;

        let mut hits = collector.results();
        if config.load_documents {
            for hit in &mut hits {
                hit.document = self.document(hit.doc_id)?;
            }
        }

        let max_score = hits
            .iter()
            .filter_map(|hit| hit.score)
            .reduce(f32::max);

        Ok(SearchResults {
            hits,
            total_hits: collector.total_hits(),
            max_score,
        })
    }

    /// Count the documents matching a query.
    pub fn count(&self, query: &dyn Query) -> Result<u64> {
        let mut collector = CountCollector::new();
        self.search_with_collector(query, &mut collector)?;
        Ok(collector.count())
    }

    /// Load a document by global id.
    pub fn document(&self, doc_id: u64) -> Result<Option<Document>> {
        let ord = self.doc_bases.partition_point(|&base| base <= doc_id);
        if ord == 0 {
            return Ok(None);
        }
        let ord = ord - 1;
        self.segments[ord].document(doc_id - self.doc_bases[ord])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::MemoryIndex;
    use crate::query::boolean::BooleanQuery;
    use crate::query::match_all::MatchAllQuery;
    use crate::query::term::TermQuery;
    use crate::search::collector::TotalHits;

    fn two_segments(config: SearcherConfig) -> Searcher {
        let mut builder = MemoryIndex::builder();
        for i in 0..3 {
            builder.add_document(
                Document::builder()
                    .add_text("field", format!("this is document {i}"))
                    .build(),
            );
        }
        builder.commit();
        for i in 3..5 {
            builder.add_document(
                Document::builder()
                    .add_text("field", format!("this is document {i}"))
                    .build(),
            );
        }
        Searcher::new(builder.build().segment_readers(), config).unwrap()
    }

    #[test]
    fn test_statistics_span_segments() {
        let searcher = two_segments(SearcherConfig::default());
        assert_eq!(searcher.doc_count(), 5);

        let stats = searcher.term_statistics("field", "this").unwrap().unwrap();
        assert_eq!(stats.doc_freq, 5);
        assert!(searcher.term_statistics("field", "missing").unwrap().is_none());

        let collection = searcher.collection_statistics("field").unwrap().unwrap();
        assert_eq!(collection.doc_count, 5);
        assert_eq!(collection.avg_length(), 4.0);
    }

    #[test]
    fn test_count_and_global_ids() {
        let searcher = two_segments(SearcherConfig::default());
        assert_eq!(searcher.count(&TermQuery::new("field", "this")).unwrap(), 5);

        let results = searcher
            .search(SearchRequest::new(Box::new(TermQuery::new("field", "4"))))
            .unwrap();
        assert_eq!(results.doc_ids(), vec![4]);
        let document = results.hits[0].document.as_ref().unwrap();
        assert_eq!(
            document.get_field("field").and_then(|v| v.as_text()),
            Some("this is document 4")
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = two_segments(SearcherConfig::default());
        let parallel = two_segments(SearcherConfig {
            parallel: true,
            num_threads: 2,
            ..SearcherConfig::default()
        });

        let query = || {
            Box::new(
                BooleanQuery::builder()
                    .must(Box::new(TermQuery::new("field", "this")))
                    .should(Box::new(TermQuery::new("field", "4")))
                    .build()
                    .unwrap(),
            )
        };
        let a = sequential
            .search(SearchRequest::new(query()).max_docs(3))
            .unwrap();
        let b = parallel
            .search(SearchRequest::new(query()).max_docs(3))
            .unwrap();

        assert_eq!(a.doc_ids(), b.doc_ids());
        assert_eq!(a.doc_ids()[0], 4);
        assert_eq!(a.total_hits, TotalHits::exact(5));
        assert_eq!(b.total_hits, TotalHits::exact(5));
    }

    #[test]
    fn test_rewrite_is_cached() {
        let searcher = two_segments(SearcherConfig::default());
        let query = BooleanQuery::builder()
            .must(Box::new(MatchAllQuery::new()))
            .build()
            .unwrap();

        let rewritten = searcher.rewrite(&query).unwrap();
        let expected: Box<dyn Query> = Box::new(MatchAllQuery::new());
        assert_eq!(rewritten, expected);
        assert_eq!(searcher.rewrite_cache.read().len(), 1);
        assert_eq!(searcher.rewrite(&query).unwrap(), expected);
    }

    #[test]
    fn test_rewrite_cache_stays_bounded() {
        let searcher = two_segments(SearcherConfig {
            max_cached_rewrites: 2,
            ..SearcherConfig::default()
        });

        for i in 0..5 {
            let query = BooleanQuery::builder()
                .must(Box::new(TermQuery::new("field", i.to_string())))
                .build()
                .unwrap();
            let rewritten = searcher.rewrite(&query).unwrap();
            let expected: Box<dyn Query> = Box::new(TermQuery::new("field", i.to_string()));
            assert_eq!(rewritten, expected);
            assert!(searcher.rewrite_cache.read().len() <= 2);
        }

        let disabled = two_segments(SearcherConfig {
            max_cached_rewrites: 0,
            ..SearcherConfig::default()
        });
        disabled.rewrite(&MatchAllQuery::new()).unwrap();
        assert!(disabled.rewrite_cache.read().is_empty());
    }

    #[test]
    fn test_rewrite_limit() {
        let searcher = two_segments(SearcherConfig {
            max_rewrite_iterations: 1,
            cache_rewrites: false,
            ..SearcherConfig::default()
        });
        let nested = BooleanQuery::builder()
            .must(Box::new(
                BooleanQuery::builder()
                    .must(Box::new(MatchAllQuery::new()))
                    .build()
                    .unwrap(),
            ))
            .build()
            .unwrap();

        assert!(matches!(
            searcher.rewrite(&nested),
            Err(GlaiveError::Query(_))
        ));
    }

    #[test]
    fn test_document_lookup() {
        let searcher = two_segments(SearcherConfig::default());
        assert!(searcher.document(0).unwrap().is_some());
        assert!(searcher.document(3).unwrap().is_some());
        assert!(searcher.document(5).unwrap().is_none());
    }
}
