//! Query model representation.
//!
//! The query model is the intermediate representation between an operator
//! chain and the documents sent to the server. It keeps the predicate, sort
//! keys, and projection as uncompiled expressions so callers can inspect a
//! chain before any field is resolved.

use std::fmt;

use bson::Document;
use quarry_common::types::TypeName;
use quarry_core::expr::{BinaryOp, Expr, Lambda};

use super::paging::Paging;

/// A structured, not yet rendered query.
#[derive(Debug, Clone)]
pub struct QueryModel {
    /// The collection's document type.
    pub document_type: TypeName,

    /// The combined filter predicate.
    pub where_clause: Option<Lambda>,

    /// Sort keys, primary first.
    pub order_by: Vec<OrderByClause>,

    /// The projection applied to each result.
    pub projection: Option<Lambda>,

    /// The folded skip/take window.
    pub paging: Paging,

    /// The type results are narrowed to.
    pub of_type: Option<TypeName>,

    /// The index hint.
    pub index_hint: Option<IndexHint>,

    /// The key selector of a Distinct.
    pub distinct: Option<Lambda>,

    /// The terminal element selector.
    pub element_selector: Option<ElementSelector>,
}

impl QueryModel {
    /// Creates an empty model over `document_type`.
    pub fn new(document_type: impl Into<TypeName>) -> Self {
        Self {
            document_type: document_type.into(),
            where_clause: None,
            order_by: Vec::new(),
            projection: None,
            paging: Paging::new(),
            of_type: None,
            index_hint: None,
            distinct: None,
            element_selector: None,
        }
    }

    /// Returns the folded offset.
    #[must_use]
    pub fn skip(&self) -> Option<u64> {
        self.paging.skip()
    }

    /// Returns the folded limit.
    #[must_use]
    pub fn take(&self) -> Option<u64> {
        self.paging.take()
    }

    /// Returns `true` when the query provably returns nothing.
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        self.paging.is_empty()
    }

    /// Returns the type the filter's parameter is declared as.
    #[must_use]
    pub fn effective_type(&self) -> &TypeName {
        self.of_type.as_ref().unwrap_or(&self.document_type)
    }

    /// Conjoins `predicate` with the existing filter.
    ///
    /// The incoming lambda's parameter wins: after a type narrow it carries
    /// the more derived type.
    pub(crate) fn add_predicate(&mut self, predicate: &Lambda) {
        let Some(parameter) = predicate.single_parameter() else {
            return;
        };
        self.where_clause = Some(match self.where_clause.take() {
            None => predicate.clone(),
            Some(existing) => {
                let previous = match existing.single_parameter() {
                    Some(old) => existing.body.replace_parameter(&old.name, parameter),
                    None => *existing.body,
                };
                Lambda {
                    parameters: vec![parameter.clone()],
                    body: Box::new(Expr::binary(
                        BinaryOp::AndAlso,
                        previous,
                        (*predicate.body).clone(),
                    )),
                }
            }
        });
    }
}

/// One sort key.
#[derive(Debug, Clone)]
pub struct OrderByClause {
    /// The key selector.
    pub key: Lambda,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order.
    Ascending,
    /// Descending order.
    Descending,
}

impl SortDirection {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Returns the sort document value (`1` or `-1`).
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// Which index the server should use.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexHint {
    /// An index by name.
    Name(String),
    /// An index by key pattern.
    Keys(Document),
}

impl fmt::Display for IndexHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Keys(keys) => write!(f, "{keys}"),
        }
    }
}

/// The terminal operator that reduces the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementSelector {
    /// Any / existence test.
    Any,
    /// Count.
    Count,
    /// LongCount.
    LongCount,
    /// First.
    First,
    /// FirstOrDefault.
    FirstOrDefault,
    /// Single.
    Single,
    /// SingleOrDefault.
    SingleOrDefault,
    /// Last.
    Last,
    /// LastOrDefault.
    LastOrDefault,
    /// ElementAt.
    ElementAt,
    /// ElementAtOrDefault.
    ElementAtOrDefault,
    /// Max.
    Max,
    /// Min.
    Min,
}

impl ElementSelector {
    /// Returns the operator's name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Any => "Any",
            Self::Count => "Count",
            Self::LongCount => "LongCount",
            Self::First => "First",
            Self::FirstOrDefault => "FirstOrDefault",
            Self::Single => "Single",
            Self::SingleOrDefault => "SingleOrDefault",
            Self::Last => "Last",
            Self::LastOrDefault => "LastOrDefault",
            Self::ElementAt => "ElementAt",
            Self::ElementAtOrDefault => "ElementAtOrDefault",
            Self::Max => "Max",
            Self::Min => "Min",
        }
    }
}

impl fmt::Display for ElementSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
