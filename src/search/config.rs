//! Searcher configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};
use crate::query::scorer::Bm25Params;

/// Configuration for a [`Searcher`](crate::search::searcher::Searcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearcherConfig {
    /// Evaluate segments in parallel.
    pub parallel: bool,

    /// Thread pool size for parallel evaluation.
    pub num_threads: usize,

    /// Upper bound on rewrite passes before giving up.
    pub max_rewrite_iterations: usize,

    /// Remember rewritten forms of queries.
    pub cache_rewrites: bool,

    /// Entries the rewrite cache holds before it is cleared.
    pub max_cached_rewrites: usize,

    /// BM25 parameters used by term queries.
    pub bm25: Bm25Params,
}

impl Default for SearcherConfig {
    fn default() -> Self {
        SearcherConfig {
            parallel: false,
            num_threads: num_cpus::get(),
            max_rewrite_iterations: 16,
            cache_rewrites: true,
            max_cached_rewrites: 1024,
            bm25: Bm25Params::default(),
        }
    }
}

impl SearcherConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SearcherConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(GlaiveError::config("num_threads must be at least 1"));
        }
        if self.max_rewrite_iterations == 0 {
            return Err(GlaiveError::config(
                "max_rewrite_iterations must be at least 1",
            ));
        }
        if self.bm25.k1.is_nan() || self.bm25.k1 < 0.0 || !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(GlaiveError::config(
                "bm25.k1 must be non-negative and bm25.b within [0, 1]",
            ));
        }
        Ok(())
    }
}
