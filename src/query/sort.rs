//! Result ordering.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::FieldValue;
use crate::error::{GlaiveError, Result};

/// Sort order for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order (lowest to highest).
    Asc,
    /// Descending order (highest to lowest).
    Desc,
}

/// One key of a [`Sort`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortField {
    /// Sort by relevance score, best first.
    #[default]
    Score,
    /// Sort by index order, earliest first.
    Doc,
    /// Sort by a document field value.
    Field {
        /// Field name to sort by.
        name: String,
        /// Sort order.
        order: SortOrder,
    },
}

impl SortField {
    /// Sort by a field.
    pub fn field<S: Into<String>>(name: S, order: SortOrder) -> Self {
        SortField::Field {
            name: name.into(),
            order,
        }
    }

    /// Whether this key reads the relevance score.
    pub fn needs_scores(&self) -> bool {
        matches!(self, SortField::Score)
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortField::Score => f.write_str("<score>"),
            SortField::Doc => f.write_str("<doc>"),
            SortField::Field { name, order } => match order {
                SortOrder::Asc => write!(f, "{name}"),
                SortOrder::Desc => write!(f, "{name}!"),
            },
        }
    }
}

/// A non-empty sequence of sort keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<SortField>", into = "Vec<SortField>")]
pub struct Sort {
    fields: Vec<SortField>,
}

impl Sort {
    /// Create a sort from its keys.
    pub fn new(fields: Vec<SortField>) -> Result<Self> {
        if fields.is_empty() {
            return Err(GlaiveError::query("Sort needs at least one field"));
        }
        Ok(Sort { fields })
    }

    /// Sort by relevance score.
    pub fn relevance() -> Self {
        Sort {
            fields: vec![SortField::Score],
        }
    }

    /// Sort by index order.
    pub fn index_order() -> Self {
        Sort {
            fields: vec![SortField::Doc],
        }
    }

    /// Sort by a single field.
    pub fn by_field<S: Into<String>>(name: S, order: SortOrder) -> Self {
        Sort {
            fields: vec![SortField::field(name, order)],
        }
    }

    /// The sort keys, most significant first.
    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    /// Whether any key reads the relevance score.
    pub fn needs_scores(&self) -> bool {
        self.fields.iter().any(SortField::needs_scores)
    }

    /// Whether the most significant key is index order.
    pub fn is_index_order_first(&self) -> bool {
        self.fields.first() == Some(&SortField::Doc)
    }

    /// Compare two rows of sort values; `Less` means `a` ranks first.
    pub fn compare(&self, a: &[SortValue], b: &[SortValue]) -> Ordering {
        self.fields
            .iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(field, (a, b))| compare_values(field, a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl TryFrom<Vec<SortField>> for Sort {
    type Error = GlaiveError;

    fn try_from(fields: Vec<SortField>) -> Result<Self> {
        Sort::new(fields)
    }
}

impl From<Sort> for Vec<SortField> {
    fn from(sort: Sort) -> Self {
        sort.fields
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.fields.iter().map(|field| field.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// The value of one sort key for a hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SortValue {
    /// Relevance score.
    Score(f32),
    /// Global document id.
    Doc(u64),
    /// Field value; `None` when the document lacks the field.
    Field(Option<FieldValue>),
}

fn compare_values(field: &SortField, a: &SortValue, b: &SortValue) -> Ordering {
    match (field, a, b) {
        (SortField::Score, SortValue::Score(a), SortValue::Score(b)) => b.total_cmp(a),
        (SortField::Doc, SortValue::Doc(a), SortValue::Doc(b)) => a.cmp(b),
        (SortField::Field { order, .. }, SortValue::Field(a), SortValue::Field(b)) => {
            match (a, b) {
                (Some(a), Some(b)) => match order {
                    SortOrder::Asc => a.sort_cmp(b),
                    SortOrder::Desc => b.sort_cmp(a),
                },
                // Missing values sort last in either order
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }
        _ => Ordering::Equal,
    }
}
