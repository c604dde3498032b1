//! Compiled predicate fragments and the boolean combination tree.

use std::fmt;

use bson::{Bson, Document, doc};

/// A compiled piece of a filter document.
///
/// The empty document selects everything. The unsatisfiable sentinel is
/// `{"$nor": [{}]}`, which selects nothing and negates back to `{}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment(Document);

impl Fragment {
    /// The fragment that selects every document.
    #[must_use]
    pub fn matches_all() -> Self {
        Self(Document::new())
    }

    /// The fragment that selects no document.
    #[must_use]
    pub fn matches_none() -> Self {
        Self(doc! { "$nor": [{}] })
    }

    /// `{path: condition}`: a bare value is an equality test, an operator
    /// document a set of constraints.
    pub fn field(path: impl Into<String>, condition: impl Into<Bson>) -> Self {
        let mut document = Document::new();
        document.insert(path.into(), condition.into());
        Self(document)
    }

    /// `{path: {operator: value}}`.
    pub fn operator(path: impl Into<String>, operator: &str, value: impl Into<Bson>) -> Self {
        let mut condition = Document::new();
        condition.insert(operator, value.into());
        Self::field(path, condition)
    }

    /// Wraps an already-built document.
    #[must_use]
    pub fn from_document(document: Document) -> Self {
        Self(document)
    }

    /// Returns `true` for the select-everything fragment.
    #[must_use]
    pub fn is_matches_all(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` for the unsatisfiable sentinel.
    #[must_use]
    pub fn is_matches_none(&self) -> bool {
        self.0.len() == 1
            && matches!(
                self.0.get("$nor"),
                Some(Bson::Array(members))
                    if members.len() == 1
                        && matches!(&members[0], Bson::Document(d) if d.is_empty())
            )
    }

    /// Returns the underlying document.
    #[must_use]
    pub fn as_document(&self) -> &Document {
        &self.0
    }

    /// Unwraps the underlying document.
    #[must_use]
    pub fn into_document(self) -> Document {
        self.0
    }
}

impl From<Document> for Fragment {
    fn from(document: Document) -> Self {
        Self(document)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A boolean combination of fragments, folded bottom-up by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub enum BoolNode {
    /// All children hold.
    And(Vec<BoolNode>),
    /// At least one child holds.
    Or(Vec<BoolNode>),
    /// The child does not hold.
    Not(Box<BoolNode>),
    /// A compiled leaf.
    Leaf(Fragment),
}

impl BoolNode {
    /// Builds a conjunction, splicing nested conjunctions into one level.
    #[must_use]
    pub fn and(left: BoolNode, right: BoolNode) -> Self {
        let mut children = Vec::new();
        for node in [left, right] {
            match node {
                BoolNode::And(nested) => children.extend(nested),
                other => children.push(other),
            }
        }
        BoolNode::And(children)
    }

    /// Builds a disjunction, splicing nested disjunctions into one level.
    #[must_use]
    pub fn or(left: BoolNode, right: BoolNode) -> Self {
        let mut children = Vec::new();
        for node in [left, right] {
            match node {
                BoolNode::Or(nested) => children.extend(nested),
                other => children.push(other),
            }
        }
        BoolNode::Or(children)
    }

    /// Negates a node.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(node: BoolNode) -> Self {
        BoolNode::Not(Box::new(node))
    }

    /// Returns a leaf holding `fragment`.
    #[must_use]
    pub fn leaf(fragment: Fragment) -> Self {
        BoolNode::Leaf(fragment)
    }
}

impl From<Fragment> for BoolNode {
    fn from(fragment: Fragment) -> Self {
        BoolNode::Leaf(fragment)
    }
}

/// Renders an integer as Int32 when it fits.
#[must_use]
pub fn compact_int(n: i64) -> Bson {
    i32::try_from(n).map_or(Bson::Int64(n), Bson::Int32)
}
