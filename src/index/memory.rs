//! In-memory segmented index.
//!
//! Documents are buffered into the current segment until [`MemoryIndexBuilder::commit`]
//! seals it. Each sealed segment is an immutable [`MemorySegment`] that can be
//! searched concurrently with the others.

use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::UnicodeWordAnalyzer;
use crate::document::{Document, FieldValue};
use crate::error::Result;
use crate::index::reader::{
    BasicPostingIterator, FieldStats, IndexReader, PostingIterator, ReaderTermInfo,
};

#[derive(Debug, Default, Clone)]
struct PostingList {
    doc_ids: Vec<u64>,
    term_freqs: Vec<u64>,
}

/// An immutable, fully in-memory segment.
#[derive(Debug, Default)]
pub struct MemorySegment {
    documents: Vec<Document>,
    postings: AHashMap<String, AHashMap<String, PostingList>>,
    /// Per field, the number of terms in each document (0 when absent).
    field_lengths: AHashMap<String, Vec<u32>>,
    field_stats: AHashMap<String, FieldStats>,
}

impl MemorySegment {
    fn add_document(&mut self, analyzer: &UnicodeWordAnalyzer, doc: Document) {
        let doc_id = self.documents.len() as u64;

        for (field, value) in doc.fields() {
            let FieldValue::Text(text) = value else {
                continue;
            };

            let terms = analyzer.analyze(text);
            let mut freqs: AHashMap<&str, u64> = AHashMap::new();
            for term in &terms {
                *freqs.entry(term.as_str()).or_insert(0) += 1;
            }

            let field_postings = self.postings.entry(field.to_string()).or_default();
            for (term, freq) in freqs {
                let list = field_postings.entry(term.to_string()).or_default();
                list.doc_ids.push(doc_id);
                list.term_freqs.push(freq);
            }

            let lengths = self.field_lengths.entry(field.to_string()).or_default();
            lengths.resize(doc_id as usize + 1, 0);
            lengths[doc_id as usize] = terms.len() as u32;

            let stats = self
                .field_stats
                .entry(field.to_string())
                .or_insert_with(|| FieldStats {
                    field: field.to_string(),
                    total_terms: 0,
                    doc_count: 0,
                });
            stats.total_terms += terms.len() as u64;
            stats.doc_count += 1;
        }

        self.documents.push(doc);
    }

    fn posting_list(&self, field: &str, term: &str) -> Option<&PostingList> {
        self.postings.get(field).and_then(|terms| terms.get(term))
    }
}

impl IndexReader for MemorySegment {
    fn doc_count(&self) -> u64 {
        self.documents.len() as u64
    }

    fn max_doc(&self) -> u64 {
        self.documents.len() as u64
    }

    fn term_info(&self, field: &str, term: &str) -> Result<Option<ReaderTermInfo>> {
        Ok(self.posting_list(field, term).map(|list| ReaderTermInfo {
            field: field.to_string(),
            term: term.to_string(),
            doc_freq: list.doc_ids.len() as u64,
            total_freq: list.term_freqs.iter().sum(),
        }))
    }

    fn postings(&self, field: &str, term: &str) -> Result<Option<Box<dyn PostingIterator>>> {
        match self.posting_list(field, term) {
            Some(list) => {
                let iter =
                    BasicPostingIterator::new(list.doc_ids.clone(), list.term_freqs.clone())?;
                Ok(Some(Box::new(iter)))
            }
            None => Ok(None),
        }
    }

    fn field_stats(&self, field: &str) -> Result<Option<FieldStats>> {
        Ok(self.field_stats.get(field).cloned())
    }

    fn field_length(&self, doc_id: u64, field: &str) -> Option<u32> {
        self.field_lengths
            .get(field)
            .and_then(|lengths| lengths.get(doc_id as usize).copied())
    }

    fn doc_value(&self, doc_id: u64, field: &str) -> Option<FieldValue> {
        self.documents
            .get(doc_id as usize)
            .and_then(|doc| doc.get_field(field).cloned())
    }

    fn document(&self, doc_id: u64) -> Result<Option<Document>> {
        Ok(self.documents.get(doc_id as usize).cloned())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// A searchable set of sealed segments.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    segments: Vec<Arc<MemorySegment>>,
}

impl MemoryIndex {
    /// Create a builder for a new index.
    pub fn builder() -> MemoryIndexBuilder {
        MemoryIndexBuilder::new()
    }

    /// The segments as readers, in commit order.
    pub fn segment_readers(&self) -> Vec<Arc<dyn IndexReader>> {
        self.segments
            .iter()
            .map(|segment| Arc::clone(segment) as Arc<dyn IndexReader>)
            .collect()
    }

    /// Number of sealed segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total number of documents across segments.
    pub fn doc_count(&self) -> u64 {
        self.segments.iter().map(|segment| segment.doc_count()).sum()
    }
}

/// Builds a [`MemoryIndex`] one document at a time.
#[derive(Debug, Default)]
pub struct MemoryIndexBuilder {
    analyzer: UnicodeWordAnalyzer,
    segments: Vec<Arc<MemorySegment>>,
    pending: MemorySegment,
    sealed_docs: u64,
}

impl MemoryIndexBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document to the current segment and return its global id.
    pub fn add_document(&mut self, doc: Document) -> u64 {
        let doc_id = self.sealed_docs + self.pending.doc_count();
        self.pending.add_document(&self.analyzer, doc);
        doc_id
    }

    /// Add several documents to the current segment.
    pub fn add_documents<I>(&mut self, docs: I)
    where
        I: IntoIterator<Item = Document>,
    {
        for doc in docs {
            self.add_document(doc);
        }
    }

    /// Seal the current segment. Does nothing if it is empty.
    pub fn commit(&mut self) {
        if self.pending.doc_count() == 0 {
            return;
        }
        let segment = std::mem::take(&mut self.pending);
        self.sealed_docs += segment.doc_count();
        self.segments.push(Arc::new(segment));
    }

    /// Seal any pending documents and produce the index.
    pub fn build(mut self) -> MemoryIndex {
        self.commit();
        MemoryIndex {
            segments: self.segments,
        }
    }
}
