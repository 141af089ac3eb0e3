//! Search execution: mode resolution, collectors and the searcher.

pub mod collector;
pub mod config;
pub mod resolver;
pub mod searcher;

use crate::query::query::Query;
use crate::query::sort::{Sort, SortOrder};

pub use self::collector::{
    AllDocsCollector, Collector, CountCollector, DEFAULT_TOTAL_HITS_THRESHOLD, TopDocsCollector,
    TopFieldCollector, TotalHits, TotalHitsRelation,
};
pub use self::config::SearcherConfig;
pub use self::resolver::{ResultOrdering, ResultRequirements, resolve_scoring_mode};
pub use self::searcher::{CollectionStatistics, Searcher, TermStatistics};

/// Configuration for search operations.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Maximum number of documents to return.
    pub max_docs: usize,
    /// Minimum score threshold.
    pub min_score: f32,
    /// Matches counted exactly before pruning may start; `usize::MAX` counts all.
    pub total_hits_threshold: usize,
    /// Result ordering; `None` orders by relevance.
    pub sort: Option<Sort>,
    /// Whether to load document content.
    pub load_documents: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_docs: 10,
            min_score: 0.0,
            total_hits_threshold: DEFAULT_TOTAL_HITS_THRESHOLD,
            sort: None,
            load_documents: true,
        }
    }
}

/// Search request containing query and configuration.
#[derive(Debug)]
pub struct SearchRequest {
    /// The query to execute.
    pub query: Box<dyn Query>,
    /// Search configuration.
    pub config: SearchConfig,
}

impl SearchRequest {
    /// Create a new search request.
    pub fn new(query: Box<dyn Query>) -> Self {
        SearchRequest {
            query,
            config: SearchConfig::default(),
        }
    }

    /// Set the maximum number of documents to return.
    pub fn max_docs(mut self, max_docs: usize) -> Self {
        self.config.max_docs = max_docs;
        self
    }

    /// Set the minimum score threshold.
    pub fn min_score(mut self, min_score: f32) -> Self {
        self.config.min_score = min_score;
        self
    }

    /// Set how many matches are counted exactly.
    pub fn total_hits_threshold(mut self, threshold: usize) -> Self {
        self.config.total_hits_threshold = threshold;
        self
    }

    /// Count every match exactly, or only up to the default threshold.
    pub fn track_total_hits(mut self, exact: bool) -> Self {
        self.config.total_hits_threshold = if exact {
            usize::MAX
        } else {
            DEFAULT_TOTAL_HITS_THRESHOLD
        };
        self
    }

    /// Set the result ordering.
    pub fn sort(mut self, sort: Sort) -> Self {
        self.config.sort = Some(sort);
        self
    }

    /// Sort results by a field in ascending order.
    pub fn sort_by_field_asc(self, field: &str) -> Self {
        self.sort(Sort::by_field(field, SortOrder::Asc))
    }

    /// Sort results by a field in descending order.
    pub fn sort_by_field_desc(self, field: &str) -> Self {
        self.sort(Sort::by_field(field, SortOrder::Desc))
    }

    /// Sort results by index order.
    pub fn sort_by_doc(self) -> Self {
        self.sort(Sort::index_order())
    }

    /// Sort results by relevance score (default).
    pub fn sort_by_score(mut self) -> Self {
        self.config.sort = None;
        self
    }

    /// Set whether to load document content.
    pub fn load_documents(mut self, load_documents: bool) -> Self {
        self.config.load_documents = load_documents;
        self
    }

    /// Set the search configuration.
    pub fn config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Whether the requested ordering reads scores.
    pub fn needs_scores(&self) -> bool {
        self.config
            .sort
            .as_ref()
            .is_none_or(Sort::needs_scores)
    }
}
