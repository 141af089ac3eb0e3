//! Schema-less documents.
//!
//! A [`Document`] is a set of named [`FieldValue`]s. Text fields are analysed
//! and indexed for term matching; every value is also kept for sorting.

#[allow(clippy::module_inception)]
pub mod document;
pub mod field_value;

pub use document::{Document, DocumentBuilder};
pub use field_value::FieldValue;
