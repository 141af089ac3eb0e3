//! Index reader for searching and retrieving documents.
//!
//! An [`IndexReader`] gives access to one segment. Document ids are local to
//! the segment and start at zero.

use std::fmt::Debug;

use crate::document::{Document, FieldValue};
use crate::error::{GlaiveError, Result};

/// Sentinel document id returned once an iterator is exhausted.
pub const TERMINATED: u64 = u64::MAX;

/// Trait for segment readers.
pub trait IndexReader: Send + Sync + Debug {
    /// Get the number of documents in the segment.
    fn doc_count(&self) -> u64;

    /// One past the largest document id in the segment.
    fn max_doc(&self) -> u64;

    /// Get term information for a field and term.
    fn term_info(&self, field: &str, term: &str) -> Result<Option<ReaderTermInfo>>;

    /// Get posting list for a field and term.
    fn postings(&self, field: &str, term: &str) -> Result<Option<Box<dyn PostingIterator>>>;

    /// Get field statistics.
    fn field_stats(&self, field: &str) -> Result<Option<FieldStats>>;

    /// Number of terms the field holds in the given document.
    fn field_length(&self, doc_id: u64, field: &str) -> Option<u32>;

    /// The stored value of a field, used for sorting.
    fn doc_value(&self, doc_id: u64, field: &str) -> Option<FieldValue>;

    /// Get a document by ID.
    fn document(&self, doc_id: u64) -> Result<Option<Document>>;

    /// Get this reader as Any for downcasting.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Information about a term in a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderTermInfo {
    /// The field name.
    pub field: String,

    /// The term text.
    pub term: String,

    /// Number of documents containing this term.
    pub doc_freq: u64,

    /// Total number of occurrences of this term.
    pub total_freq: u64,
}

/// Statistics about a field in a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldStats {
    /// The field name.
    pub field: String,

    /// Total number of term occurrences.
    pub total_terms: u64,

    /// Number of documents with this field.
    pub doc_count: u64,
}

impl FieldStats {
    /// Average number of terms per document holding the field.
    pub fn avg_length(&self) -> f64 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.total_terms as f64 / self.doc_count as f64
        }
    }
}

/// Iterator over a posting list.
///
/// A fresh iterator is already positioned on its first document, or on
/// [`TERMINATED`] when the list is empty.
pub trait PostingIterator: Send + Debug {
    /// Get the current document ID.
    fn doc_id(&self) -> u64;

    /// Get the term frequency in the current document.
    fn term_freq(&self) -> u64;

    /// Move to the next document.
    fn next(&mut self) -> Result<bool>;

    /// Skip to the first document >= target.
    fn skip_to(&mut self, target: u64) -> Result<bool>;

    /// Get the cost of iterating through this posting list.
    fn cost(&self) -> u64;
}

/// A posting iterator over in-memory vectors.
#[derive(Debug, Clone)]
pub struct BasicPostingIterator {
    /// Document IDs in the posting list, strictly increasing.
    doc_ids: Vec<u64>,

    /// Term frequencies for each document.
    term_freqs: Vec<u64>,

    /// Current position in the posting list.
    position: usize,
}

impl BasicPostingIterator {
    /// Create a new posting iterator.
    pub fn new(doc_ids: Vec<u64>, term_freqs: Vec<u64>) -> Result<Self> {
        if doc_ids.len() != term_freqs.len() {
            return Err(GlaiveError::index(
                "Document IDs and term frequencies must have the same length",
            ));
        }
        if doc_ids.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(GlaiveError::index(
                "Document IDs must be strictly increasing",
            ));
        }

        Ok(BasicPostingIterator {
            doc_ids,
            term_freqs,
            position: 0,
        })
    }

    /// Create an empty posting iterator.
    pub fn empty() -> Self {
        BasicPostingIterator {
            doc_ids: Vec::new(),
            term_freqs: Vec::new(),
            position: 0,
        }
    }
}

impl PostingIterator for BasicPostingIterator {
    fn doc_id(&self) -> u64 {
        self.doc_ids
            .get(self.position)
            .copied()
            .unwrap_or(TERMINATED)
    }

    fn term_freq(&self) -> u64 {
        self.term_freqs.get(self.position).copied().unwrap_or(0)
    }

    fn next(&mut self) -> Result<bool> {
        if self.position >= self.doc_ids.len() {
            return Ok(false);
        }
        self.position += 1;
        Ok(self.position < self.doc_ids.len())
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if self.position >= self.doc_ids.len() {
            return Ok(false);
        }

        // Binary search over the remaining range; never moves backwards
        let remaining = &self.doc_ids[self.position..];
        let offset = match remaining.binary_search(&target) {
            Ok(index) | Err(index) => index,
        };
        self.position += offset;
        Ok(self.position < self.doc_ids.len())
    }

    fn cost(&self) -> u64 {
        self.doc_ids.len() as u64
    }
}
