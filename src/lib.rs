//! # Glaive
//!
//! Full-text query evaluation driven by scoring modes.
//!
//! Every search decides up front whether documents must be scored and
//! whether every match must be visited. That decision, a [`ScoringMode`],
//! is resolved from what the caller asks for and then propagated through
//! the query tree, so that non-scoring clauses never compute scores and
//! top-k searches may stop early.
//!
//! ## Features
//!
//! - Four-valued scoring modes resolved from collectors
//! - Term, match-all, boolean and constant-score queries
//! - Query rewriting to a fixed point, with a rewrite cache
//! - Top-k by score, by index order or by field values
//! - In-memory segmented index with BM25 scoring
//! - Optional parallel segment evaluation
//!
//! ## Example
//!
//! ```
//! use glaive::prelude::*;
//!
//! let mut builder = MemoryIndex::builder();
//! for i in 0..5 {
//!     builder.add_document(
//!         Document::builder()
//!             .add_text("field", format!("this is document {i}"))
//!             .build(),
//!     );
//! }
//! let searcher = Searcher::new(builder.build().segment_readers(), SearcherConfig::default())?;
//!
//! let query = BooleanQuery::builder()
//!     .must(Box::new(TermQuery::new("field", "this")))
//!     .must_not(Box::new(TermQuery::new("field", "3")))
//!     .build()?;
//! let results = searcher.search(SearchRequest::new(Box::new(query)).max_docs(5))?;
//! assert_eq!(results.total_hits.value, 4);
//! # Ok::<(), glaive::error::GlaiveError>(())
//! ```
//!
//! [`ScoringMode`]: crate::query::scoring_mode::ScoringMode

pub mod analysis;
pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod search;

pub mod prelude {
    pub use crate::document::{Document, DocumentBuilder, FieldValue};
    pub use crate::error::{GlaiveError, Result};
    pub use crate::index::{IndexReader, MemoryIndex};
    pub use crate::query::{
        BooleanQuery, ConstantScoreQuery, MatchAllQuery, Occur, Query, ScoringMode, SearchHit,
        SearchResults, Sort, SortField, SortOrder, TermQuery,
    };
    pub use crate::search::{
        Collector, CountCollector, SearchRequest, Searcher, SearcherConfig, TopDocsCollector,
        TopFieldCollector, TotalHits, TotalHitsRelation,
    };
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
