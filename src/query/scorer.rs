//! Scoring implementations for ranking search results.
//!
//! Scorers only exist for evaluations whose [`ScoringMode`] needs scores.
//! How a score is computed is not part of the scoring-mode contract, so this
//! module stays deliberately plain.
//!
//! [`ScoringMode`]: crate::query::scoring_mode::ScoringMode

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// Trait for document scorers.
pub trait Scorer: Send + Sync + Debug {
    /// Calculate the score for a document.
    fn score(&self, term_freq: f32, field_length: Option<f32>) -> f32;

    /// Get the boost factor for this scorer.
    fn boost(&self) -> f32;

    /// Upper bound of any score this scorer can produce.
    fn max_score(&self) -> f32;

    /// Get the name of this scorer.
    fn name(&self) -> &'static str;
}

/// BM25 tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f32,
    /// Length normalization strength.
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Bm25Params { k1: 1.2, b: 0.75 }
    }
}

/// BM25 scorer implementation.
#[derive(Debug, Clone)]
pub struct BM25Scorer {
    /// Document frequency of the term.
    doc_freq: u64,
    /// Average field length.
    avg_field_length: f64,
    /// Total number of documents in the index.
    total_docs: u64,
    /// Boost factor.
    boost: f32,
    /// BM25 parameters.
    params: Bm25Params,
}

impl BM25Scorer {
    /// Create a new BM25 scorer with default parameters.
    pub fn new(doc_freq: u64, avg_field_length: f64, total_docs: u64, boost: f32) -> Self {
        Self::with_params(
            doc_freq,
            avg_field_length,
            total_docs,
            boost,
            Bm25Params::default(),
        )
    }

    /// Create a new BM25 scorer with custom parameters.
    pub fn with_params(
        doc_freq: u64,
        avg_field_length: f64,
        total_docs: u64,
        boost: f32,
        params: Bm25Params,
    ) -> Self {
        BM25Scorer {
            doc_freq,
            avg_field_length,
            total_docs,
            boost,
            params,
        }
    }

    /// Calculate the IDF (Inverse Document Frequency) component.
    ///
    /// Uses `ln(1 + (N - df + 0.5) / (df + 0.5))`, which stays positive even
    /// for terms present in every document.
    fn idf(&self) -> f32 {
        if self.doc_freq == 0 || self.total_docs == 0 {
            return 0.0;
        }

        let n = self.total_docs as f32;
        let df = self.doc_freq as f32;

        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Calculate the TF (Term Frequency) component.
    fn tf(&self, term_freq: f32, field_length: f32) -> f32 {
        if term_freq == 0.0 {
            return 0.0;
        }

        let avg_len = self.avg_field_length as f32;
        let norm_factor = if avg_len > 0.0 {
            1.0 - self.params.b + self.params.b * (field_length / avg_len)
        } else {
            1.0
        };

        (term_freq * (self.params.k1 + 1.0)) / (term_freq + self.params.k1 * norm_factor)
    }

    /// Get the BM25 parameters.
    pub fn params(&self) -> Bm25Params {
        self.params
    }
}

impl Scorer for BM25Scorer {
    fn score(&self, term_freq: f32, field_length: Option<f32>) -> f32 {
        if self.doc_freq == 0 || self.total_docs == 0 {
            return 0.0;
        }

        let field_length = field_length.unwrap_or(self.avg_field_length as f32);
        self.boost * self.idf() * self.tf(term_freq, field_length)
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn max_score(&self) -> f32 {
        // A negative boost flips the sign, so no match can score above zero
        (self.boost * self.idf() * (self.params.k1 + 1.0)).max(0.0)
    }

    fn name(&self) -> &'static str {
        "BM25"
    }
}

/// A constant scorer that always returns the same score.
#[derive(Debug, Clone)]
pub struct ConstantScorer {
    score: f32,
    boost: f32,
}

impl ConstantScorer {
    /// Create a new constant scorer.
    pub fn new(score: f32) -> Self {
        ConstantScorer { score, boost: 1.0 }
    }

    /// Create a new constant scorer with boost.
    pub fn with_boost(score: f32, boost: f32) -> Self {
        ConstantScorer { score, boost }
    }

    /// The score every document receives.
    pub fn value(&self) -> f32 {
        self.score * self.boost
    }
}

impl Scorer for ConstantScorer {
    fn score(&self, _term_freq: f32, _field_length: Option<f32>) -> f32 {
        self.value()
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn max_score(&self) -> f32 {
        self.value()
    }

    fn name(&self) -> &'static str {
        "Constant"
    }
}
