//! Core type definitions for Quarry.
//!
//! This module contains the fundamental types shared by the expression tree
//! and the compiler:
//! - Literal values ([`Value`])
//! - Class and scalar type names ([`TypeName`])

mod type_name;
mod value;

pub use type_name::TypeName;
pub use value::Value;
