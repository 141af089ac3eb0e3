//! Query tree traversal.

use ahash::AHashSet;

use crate::query::boolean::Occur;
use crate::query::query::Query;

/// Callbacks invoked while walking a query tree.
pub trait QueryVisitor {
    /// Whether to descend into a clause with the given occurrence.
    ///
    /// Prohibited clauses are skipped unless a visitor opts in.
    fn accepts(&self, occur: Occur) -> bool {
        occur != Occur::MustNot
    }

    /// Called for every leaf query reached.
    fn visit_leaf(&mut self, _query: &dyn Query) {}

    /// Called for every term a leaf query matches on.
    fn consume_term(&mut self, _field: &str, _term: &str) {}
}

/// Collects the `(field, term)` pairs of a query tree.
#[derive(Debug, Default, Clone)]
pub struct TermCollector {
    terms: AHashSet<(String, String)>,
}

impl TermCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the positive terms of `query`.
    pub fn collect(query: &dyn Query) -> AHashSet<(String, String)> {
        let mut collector = TermCollector::new();
        query.visit(&mut collector);
        collector.terms
    }

    /// The terms gathered so far.
    pub fn terms(&self) -> &AHashSet<(String, String)> {
        &self.terms
    }
}

impl QueryVisitor for TermCollector {
    fn consume_term(&mut self, field: &str, term: &str) {
        self.terms.insert((field.to_string(), term.to_string()));
    }
}
