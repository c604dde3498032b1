//! Predicate compilation.
//!
//! A predicate body is compiled leaf by leaf into [`Fragment`]s, combined in
//! a [`BoolNode`] tree, and folded by the normalizer into one filter
//! document. String predicates become anchored patterns; sequence and
//! dictionary predicates pick their operator from the member's codec.

mod collection;
mod compiler;
mod fragment;
mod normalizer;
mod pattern;

pub use compiler::PredicateCompiler;
pub use fragment::{BoolNode, Fragment};
pub use normalizer::{conjoin, disjoin, fold, negate};
