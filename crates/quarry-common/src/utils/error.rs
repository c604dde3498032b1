//! Error types for Quarry.
//!
//! Errors come in two tiers. [`QueryError`] is structural: it is raised while
//! the operator chain is walked into a query model, and names the operator or
//! overload that cannot be expressed. [`TranslationError`] is raised only when
//! a filter document is materialized, for a specific field and representation
//! the compiler cannot render. Both are deterministic; nothing here is worth
//! retrying.

use thiserror::Error;

/// The main error type for Quarry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The operator chain is outside the supported catalog.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A predicate or field could not be rendered into a filter document.
    #[error(transparent)]
    Translation(#[from] TranslationError),

    /// The expression tree nests deeper than the configured limit.
    #[error("The expression is nested deeper than the configured limit of {0}.")]
    TooDeep(usize),

    /// A literal or argument has an unusable value.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Internal error that should not happen.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns `true` for errors raised while building the query model.
    ///
    /// Structural errors never depend on the class registry, so callers can
    /// reject a chain before any serialization metadata is consulted.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Error::Query(_))
    }
}

/// Structural errors in the outer operator chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The operator is not in the supported catalog.
    #[error("The {0} query operator is not supported.")]
    UnsupportedOperator(String),

    /// The indexed overload (a lambda taking the element position) was used.
    #[error("The indexed version of the {0} query operator is not supported.")]
    IndexedOverload(String),

    /// A predicate-bearing operator followed a projection.
    #[error("{0} with predicate after a projection is not supported.")]
    PredicateAfterProjection(String),

    /// A filter, projection, or sort followed Skip or Take.
    #[error("Skip and Take must be terminal: a {0} cannot follow them.")]
    SkipTakeNotTerminal(String),

    /// A second index hint was attached.
    #[error("An index hint has already been set.")]
    DuplicateIndexHint,

    /// An index hint and Distinct appeared in the same chain.
    #[error("An index hint cannot be combined with Distinct.")]
    HintWithDistinct,

    /// An operator appeared in a position its ordering rules forbid.
    #[error("{0}")]
    InvalidSequence(String),

    /// The chain does not have the shape of an operator call.
    #[error("Malformed operator chain: {0}")]
    Malformed(String),
}

/// Errors raised while rendering a query model into documents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// No class map is registered under the name.
    #[error("Class '{0}' is not registered.")]
    UnknownClass(String),

    /// The class neither maps the member nor resolves it dynamically.
    #[error("Member '{member}' of class '{class}' is not mapped.")]
    UnknownMember {
        /// The class that was searched.
        class: String,
        /// The member name.
        member: String,
    },

    /// The expression is not a resolvable field access.
    #[error("Unable to determine the serialization information for the expression: {0}.")]
    Unresolvable(String),

    /// The predicate has no rendering in the filter language.
    #[error("Unsupported where clause: {0}.")]
    UnsupportedPredicate(String),

    /// An element predicate needs document-serialized elements.
    #[error("{operator} is only supported for items that serialize into documents, not {codec}.")]
    OnlyForDocumentElements {
        /// The operator name.
        operator: String,
        /// The element codec that was found.
        codec: String,
    },

    /// A collection operator was applied to a member that is not a sequence.
    #[error("{operator} requires a member serialized as an array, not {codec}.")]
    NotASequence {
        /// The operator name.
        operator: String,
        /// The codec that was found.
        codec: String,
    },

    /// The member's representation does not support the operator.
    #[error("{operator} is only supported for representation {supported}, not {actual}.")]
    UnsupportedRepresentation {
        /// The operator name.
        operator: String,
        /// The supported representations, already joined for display.
        supported: String,
        /// The representation that was found.
        actual: String,
    },

    /// A literal cannot be encoded through the field's codec.
    #[error("A {value} value cannot be encoded with the {codec} codec.")]
    ValueMismatch {
        /// The literal's kind.
        value: String,
        /// The codec's name.
        codec: String,
    },

    /// A type-narrowing target is outside the nominal type's hierarchy.
    #[error("Type '{target}' is not a subtype of '{nominal}'.")]
    NotASubtype {
        /// The narrowing target.
        target: String,
        /// The declared type being narrowed.
        nominal: String,
    },

    /// A string comparison under a transform needs a string literal.
    #[error("When using {0} in a string comparison the value being compared to must serialize as a string.")]
    NonStringComparand(String),

    /// The projection or key selector does not name a single field.
    #[error("{operator} requires a selector that resolves to a single field: {expression}.")]
    NotAFieldSelector {
        /// The operator name.
        operator: String,
        /// The offending selector.
        expression: String,
    },
}

/// Result type alias for Quarry operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_tiers() {
        let structural: Error = QueryError::UnsupportedOperator("GroupBy".into()).into();
        assert!(structural.is_structural());
        assert_eq!(
            structural.to_string(),
            "The GroupBy query operator is not supported."
        );

        let late: Error = TranslationError::UnsupportedRepresentation {
            operator: "ContainsKey".into(),
            supported: "Document or ArrayOfDocuments".into(),
            actual: "ArrayOfArrays".into(),
        }
        .into();
        assert!(!late.is_structural());
        assert_eq!(
            late.to_string(),
            "ContainsKey is only supported for representation Document or ArrayOfDocuments, not ArrayOfArrays."
        );
    }
}
