//! # quarry-common
//!
//! Foundation layer for Quarry: literal values, type names, and errors.
//!
//! This crate provides the fundamental building blocks used by all other
//! Quarry crates. It has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Core type definitions (Value, TypeName)
//! - [`utils`] - Utility functions and helpers (errors)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use types::{TypeName, Value};
pub use utils::error::{Error, QueryError, Result, TranslationError};
