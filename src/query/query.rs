//! Base query and weight traits.
//!
//! A [`Query`] is an immutable description of what to match. Executing it
//! first compiles a [`Weight`] bound to one [`ScoringMode`]; the weight then
//! produces one [`Evaluator`] per segment. Keeping the mode on the weight
//! lets the same query run concurrently under different modes.

use std::any::{Any, TypeId};
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::evaluator::Evaluator;
use crate::query::scoring_mode::ScoringMode;
use crate::query::visitor::QueryVisitor;
use crate::search::searcher::Searcher;

/// Trait for search queries.
pub trait Query: Send + Sync + Debug {
    /// Compile this query for one execution under `scoring_mode`.
    ///
    /// `boost` is the product of the boosts of all enclosing queries.
    fn weight(
        &self,
        searcher: &Searcher,
        scoring_mode: ScoringMode,
        boost: f32,
    ) -> Result<Box<dyn Weight>>;

    /// Rewrite this query into a simpler equivalent.
    ///
    /// Returns `None` when the query is already in its simplest form.
    fn rewrite(&self, _searcher: &Searcher) -> Result<Option<Box<dyn Query>>> {
        Ok(None)
    }

    /// Walk this query tree.
    fn visit(&self, visitor: &mut dyn QueryVisitor);

    /// Get the boost factor for this query.
    fn boost(&self) -> f32;

    /// Get a human-readable description of this query.
    fn description(&self) -> String;

    /// Clone this query.
    fn clone_box(&self) -> Box<dyn Query>;

    /// Get this query as Any for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Structural equality with another query.
    fn query_eq(&self, other: &dyn Query) -> bool;

    /// Feed the structure of this query into `state`.
    fn query_hash(&self, state: &mut dyn Hasher);
}

impl PartialEq for dyn Query + '_ {
    fn eq(&self, other: &dyn Query) -> bool {
        self.query_eq(other)
    }
}

impl Eq for dyn Query + '_ {}

// Lets `Box<dyn Query> == Box<dyn Query>` (and `assert_eq!`) compile;
// works around rust-lang/rust#31740.
impl PartialEq<&Self> for Box<dyn Query> {
    fn eq(&self, other: &&Self) -> bool {
        self.as_ref() == other.as_ref()
    }
}

impl Hash for dyn Query + '_ {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.query_hash(state);
    }
}

impl Clone for Box<dyn Query> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Compare `this` with `other` if `other` has the same concrete type.
pub fn query_eq_as<Q>(this: &Q, other: &dyn Query) -> bool
where
    Q: Query + PartialEq + 'static,
{
    other
        .as_any()
        .downcast_ref::<Q>()
        .is_some_and(|other| this == other)
}

/// Hash `this` together with its concrete type.
pub fn query_hash_as<Q>(this: &Q, mut state: &mut dyn Hasher)
where
    Q: Query + Hash + 'static,
{
    TypeId::of::<Q>().hash(&mut state);
    this.hash(&mut state);
}

/// A query compiled for one execution under a fixed [`ScoringMode`].
pub trait Weight: Send + Sync + Debug {
    /// The mode this weight was created with.
    fn scoring_mode(&self) -> ScoringMode;

    /// Create an evaluator over one segment.
    ///
    /// Returns `None` when nothing in the segment can match.
    fn evaluator(&self, reader: &Arc<dyn IndexReader>) -> Result<Option<Box<dyn Evaluator>>>;
}
