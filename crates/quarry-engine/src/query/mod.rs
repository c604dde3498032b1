//! Query model building and filter assembly.
//!
//! | Stage | Input | Output |
//! |-------|-------|--------|
//! | [`builder`] | operator chain | [`QueryModel`] |
//! | [`assembler`] | [`QueryModel`] | [`CompiledQuery`] |
//!
//! The builder never consults the class registry, so structural errors are
//! raised before any field is resolved.

pub mod assembler;
pub mod builder;
pub mod discriminator;
pub mod model;
pub mod paging;
pub mod predicate;

pub use assembler::{CompiledQuery, assemble, build_filter};
pub use builder::translate;
pub use discriminator::{Narrowing, narrow};
pub use model::{ElementSelector, IndexHint, OrderByClause, QueryModel, SortDirection};
pub use paging::Paging;
pub use predicate::{Fragment, PredicateCompiler};
