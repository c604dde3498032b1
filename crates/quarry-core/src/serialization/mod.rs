//! Serialization contracts consulted by the compiler.
//!
//! - [`codec`] - How a member is laid out on the wire
//! - [`class_map`] - Per-class member tables
//! - [`member_resolver`] - Dynamic member resolution strategies
//! - [`registry`] - The read-only class registry service
//! - [`discriminator`] - Discriminator conventions

pub mod class_map;
pub mod codec;
pub mod discriminator;
pub mod member_resolver;
pub mod registry;

pub use class_map::{ClassMap, MemberMap};
pub use codec::{Codec, DictionaryRepresentation, EnumRepresentation, ScalarRepresentation};
pub use discriminator::DiscriminatorConvention;
pub use member_resolver::{ExtraElementsResolver, FnMemberResolver, MemberResolver};
pub use registry::{ClassRegistry, InMemoryRegistry};
