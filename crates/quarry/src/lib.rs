//! # Quarry
//!
//! Compiles typed query-operator chains into document-database filter
//! documents.
//!
//! Start with [`QueryTranslator`]: hand it a [`ClassRegistry`] describing how
//! your classes serialize, then feed it operator chains built from [`Expr`].
//! Translation runs in two stages, so structural problems (an unsupported
//! operator, a Skip before a Where) are reported before any field is resolved.
//!
//! | Stage | Method | Consults the registry |
//! | ----- | ------ | --------------------- |
//! | Chain to model | [`QueryTranslator::translate`] | no |
//! | Model to documents | [`QueryTranslator::compile`] | yes |
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use quarry::{ClassMap, Codec, Expr, InMemoryRegistry, Method, Parameter, QueryTranslator};
//!
//! let registry = InMemoryRegistry::from_class_maps([ClassMap::new("Person")
//!     .map_member("Name", "name", Codec::String)
//!     .map_member("Age", "age", Codec::int32())]);
//! let translator = QueryTranslator::new(Arc::new(registry));
//!
//! let x = Parameter::new("x", "Person");
//! let chain = Expr::source("Person")
//!     .apply(
//!         Method::Where,
//!         vec![Expr::lambda(
//!             x.clone(),
//!             Expr::parameter(&x)
//!                 .member("Name")
//!                 .call(Method::StartsWith, vec![Expr::constant("T")]),
//!         )],
//!     )
//!     .apply(Method::Take, vec![Expr::constant(10)]);
//!
//! let query = translator.compile_chain(&chain)?;
//! assert_eq!(query.limit, Some(10));
//! # Ok::<(), quarry::Error>(())
//! ```

// Re-export the translator API
pub use quarry_engine::{
    CompiledQuery, CompilerConfig, ElementSelector, IndexHint, QueryModel, QueryTranslator,
    SortDirection,
};

// Re-export the expression tree - front ends build chains from these
pub use quarry_core::expr::{BinaryOp, Expr, Lambda, Method, Parameter};

// Re-export the serialization contracts
pub use quarry_core::serialization::{
    ClassMap, ClassRegistry, Codec, DictionaryRepresentation, DiscriminatorConvention,
    EnumRepresentation, ExtraElementsResolver, FnMemberResolver, InMemoryRegistry, MemberMap,
    MemberResolver, ScalarRepresentation,
};

// Re-export literal values and errors
pub use quarry_common::types::{TypeName, Value};
pub use quarry_common::utils::error::{Error, QueryError, Result, TranslationError};

/// Lower-level building blocks, for callers that drive the stages themselves.
pub mod engine {
    pub use quarry_engine::query::predicate::{Fragment, PredicateCompiler};
    pub use quarry_engine::query::{Narrowing, assemble, build_filter, narrow, translate};
    pub use quarry_core::resolver::{ElementPath, SerializationInfo, SerializationInfoResolver};
}
