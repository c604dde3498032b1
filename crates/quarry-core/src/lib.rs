//! # quarry-core
//!
//! Core data structures for Quarry: the portable expression tree and the
//! serialization contracts the compiler resolves fields against.
//!
//! ## Modules
//!
//! - [`expr`] - The owned expression tree and the method catalog
//! - [`serialization`] - Codecs, class maps, member strategies, the class registry
//! - [`resolver`] - Serialization info resolution (element paths and codecs)
//! - [`encoder`] - Literal rendering through a field's codec

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod encoder;
pub mod expr;
pub mod resolver;
pub mod serialization;

pub use expr::{BinaryOp, Expr, Lambda, Method, Parameter};
pub use resolver::{ElementPath, SerializationInfo, SerializationInfoResolver};
pub use serialization::{ClassMap, ClassRegistry, Codec, InMemoryRegistry, MemberMap};
