//! # quarry-engine
//!
//! The compiler proper: operator chains become query models, and query
//! models become filter, sort, and hint documents.
//!
//! ## Modules
//!
//! - [`config`] - Compiler configuration
//! - [`query`] - Query model building, predicate compilation, assembly
//! - [`translator`] - The [`QueryTranslator`] entry point

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod query;
pub mod translator;

#[cfg(test)]
mod test_support;

pub use config::CompilerConfig;
pub use query::{CompiledQuery, ElementSelector, IndexHint, QueryModel, SortDirection};
pub use translator::QueryTranslator;
