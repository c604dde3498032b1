//! Per-class serialization contracts.

use std::sync::Arc;

use indexmap::IndexMap;
use quarry_common::types::TypeName;
use serde::{Deserialize, Serialize};

use super::codec::Codec;
use super::member_resolver::{ExtraElementsResolver, MemberResolver};

/// How one member is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberMap {
    /// The element name on the wire.
    pub element_name: String,
    /// The member's codec.
    pub codec: Codec,
}

impl MemberMap {
    /// Creates a member map.
    pub fn new(element_name: impl Into<String>, codec: Codec) -> Self {
        Self {
            element_name: element_name.into(),
            codec,
        }
    }
}

/// The serialization contract of one class.
///
/// Members are looked up first in `members`, then in the base class chain,
/// and only then through the class's dynamic [`MemberResolver`], if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMap {
    /// The class name.
    pub name: TypeName,

    /// The direct base class, if the class takes part in a hierarchy.
    #[serde(default)]
    pub base: Option<TypeName>,

    /// The discriminator tag; defaults to the class name.
    #[serde(default)]
    pub discriminator: Option<String>,

    /// Marks the root of a hierarchy whose discriminator is stored as the
    /// array of tags from this class down.
    #[serde(default)]
    pub is_root: bool,

    /// Declared members in declaration order.
    #[serde(default)]
    pub members: IndexMap<String, MemberMap>,

    /// Codec of a catch-all element bag; unknown members resolve into it.
    #[serde(default)]
    pub extra_elements: Option<Codec>,

    #[serde(skip)]
    member_resolver: Option<Arc<dyn MemberResolver>>,
}

impl ClassMap {
    /// Creates an empty class map.
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            base: None,
            discriminator: None,
            is_root: false,
            members: IndexMap::new(),
            extra_elements: None,
            member_resolver: None,
        }
    }

    /// Sets the base class.
    pub fn with_base(mut self, base: impl Into<TypeName>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Sets the discriminator tag.
    pub fn with_discriminator(mut self, tag: impl Into<String>) -> Self {
        self.discriminator = Some(tag.into());
        self
    }

    /// Marks the class as the root of a hierarchical discriminator.
    pub fn as_root(mut self) -> Self {
        self.is_root = true;
        self
    }

    /// Maps a member to an element.
    pub fn map_member(
        mut self,
        member: impl Into<String>,
        element_name: impl Into<String>,
        codec: Codec,
    ) -> Self {
        self.members
            .insert(member.into(), MemberMap::new(element_name, codec));
        self
    }

    /// Routes unknown members into a catch-all element bag.
    pub fn with_extra_elements(mut self, codec: Codec) -> Self {
        self.extra_elements = Some(codec);
        self
    }

    /// Installs a dynamic member resolution strategy.
    pub fn with_member_resolver(mut self, resolver: Arc<dyn MemberResolver>) -> Self {
        self.member_resolver = Some(resolver);
        self
    }

    /// Returns the discriminator tag written for instances of this class.
    #[must_use]
    pub fn discriminator_tag(&self) -> &str {
        self.discriminator.as_deref().unwrap_or(self.name.as_str())
    }

    /// Looks up a declared member of this class only.
    #[must_use]
    pub fn declared_member(&self, member: &str) -> Option<&MemberMap> {
        self.members.get(member)
    }

    /// Resolves a member the class does not declare.
    ///
    /// The installed strategy wins over the extra-elements bag.
    #[must_use]
    pub fn dynamic_member(&self, member: &str) -> Option<MemberMap> {
        if let Some(resolver) = &self.member_resolver {
            if let Some(found) = resolver.resolve_member(self, member) {
                return Some(found);
            }
        }
        self.extra_elements
            .as_ref()
            .and_then(|codec| ExtraElementsResolver::new(codec.clone()).resolve_member(self, member))
    }
}
