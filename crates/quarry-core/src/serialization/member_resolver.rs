//! Dynamic member resolution strategies.
//!
//! A class that stores members the static map cannot enumerate (a catch-all
//! element bag, identifier-keyed members) installs a strategy. The resolver
//! only asks it after the declared members and the base chain came up empty.

use std::fmt;

use super::class_map::{ClassMap, MemberMap};
use super::codec::Codec;

/// Resolves members a class does not declare statically.
pub trait MemberResolver: Send + Sync + fmt::Debug {
    /// Returns the mapping for `member`, or `None` to decline.
    fn resolve_member(&self, class: &ClassMap, member: &str) -> Option<MemberMap>;
}

/// Maps every name to an element of the same name with a fixed codec.
#[derive(Debug, Clone)]
pub struct ExtraElementsResolver {
    codec: Codec,
}

impl ExtraElementsResolver {
    /// Creates a resolver yielding `codec` for every member.
    #[must_use]
    pub fn new(codec: Codec) -> Self {
        Self { codec }
    }
}

impl MemberResolver for ExtraElementsResolver {
    fn resolve_member(&self, _class: &ClassMap, member: &str) -> Option<MemberMap> {
        Some(MemberMap::new(member, self.codec.clone()))
    }
}

/// Adapts a closure into a [`MemberResolver`].
pub struct FnMemberResolver<F> {
    resolve: F,
}

impl<F> FnMemberResolver<F>
where
    F: Fn(&ClassMap, &str) -> Option<MemberMap> + Send + Sync,
{
    /// Wraps `resolve`.
    pub fn new(resolve: F) -> Self {
        Self { resolve }
    }
}

impl<F> fmt::Debug for FnMemberResolver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMemberResolver").finish_non_exhaustive()
    }
}

impl<F> MemberResolver for FnMemberResolver<F>
where
    F: Fn(&ClassMap, &str) -> Option<MemberMap> + Send + Sync,
{
    fn resolve_member(&self, class: &ClassMap, member: &str) -> Option<MemberMap> {
        (self.resolve)(class, member)
    }
}
