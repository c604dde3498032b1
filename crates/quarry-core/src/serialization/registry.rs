//! The class registry service.
//!
//! The registry is populated once at startup and only read while queries are
//! compiled. Hierarchy queries (ancestors, subtypes, discriminator tags) are
//! provided methods over the two primitive lookups, so alternative registries
//! only implement [`ClassRegistry::lookup`] and [`ClassRegistry::direct_subtypes`].

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use quarry_common::types::TypeName;
use quarry_common::utils::error::{Error, Result, TranslationError};

use super::class_map::{ClassMap, MemberMap};
use super::discriminator::DiscriminatorConvention;

/// Read-only lookup of class serialization contracts.
pub trait ClassRegistry: Send + Sync {
    /// Returns the class map registered under `name`.
    fn lookup(&self, name: &str) -> Option<Arc<ClassMap>>;

    /// Returns the classes whose direct base is `name`, ordered by name.
    fn direct_subtypes(&self, name: &str) -> Vec<Arc<ClassMap>>;

    /// Returns the class map registered under `name`, or an error naming it.
    fn require(&self, name: &str) -> Result<Arc<ClassMap>> {
        self.lookup(name)
            .ok_or_else(|| TranslationError::UnknownClass(name.to_string()).into())
    }

    /// Returns `name` and its ancestors, nearest first.
    fn ancestry(&self, name: &str) -> Result<Vec<Arc<ClassMap>>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(TypeName::new(name));
        while let Some(class_name) = current {
            if !seen.insert(class_name.clone()) {
                return Err(Error::Internal(format!(
                    "inheritance cycle through class '{class_name}'"
                )));
            }
            let class = self.require(class_name.as_str())?;
            current = class.base.clone();
            chain.push(class);
        }
        Ok(chain)
    }

    /// Returns every transitive subtype of `name`, depth first.
    fn all_subtypes(&self, name: &str) -> Vec<Arc<ClassMap>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<Arc<ClassMap>> = self.direct_subtypes(name);
        stack.reverse();
        while let Some(class) = stack.pop() {
            if !seen.insert(class.name.clone()) {
                continue;
            }
            let mut children = self.direct_subtypes(class.name.as_str());
            children.reverse();
            out.push(class);
            stack.extend(children);
        }
        out
    }

    /// Returns `true` if `derived` is `base` or inherits from it.
    fn is_subtype_of(&self, derived: &str, base: &str) -> Result<bool> {
        Ok(self
            .ancestry(derived)?
            .iter()
            .any(|class| class.name == base))
    }

    /// Finds a member on `class` or its bases, then through the dynamic
    /// strategies of the same chain.
    fn find_member(&self, class: &str, member: &str) -> Result<Option<MemberMap>> {
        let chain = self.ancestry(class)?;
        if let Some(found) = chain.iter().find_map(|c| c.declared_member(member)) {
            return Ok(Some(found.clone()));
        }
        Ok(chain.iter().find_map(|c| c.dynamic_member(member)))
    }

    /// Returns the discriminator convention governing `name`.
    fn discriminator_convention(&self, name: &str) -> Result<DiscriminatorConvention> {
        Ok(if self.ancestry(name)?.iter().any(|c| c.is_root) {
            DiscriminatorConvention::Hierarchical
        } else {
            DiscriminatorConvention::Scalar
        })
    }

    /// Returns the discriminator value stored for instances of `name`:
    /// the tag path from the hierarchical root down, or the single tag.
    fn discriminator_values(&self, name: &str) -> Result<Vec<String>> {
        let chain = self.ancestry(name)?;
        match chain.iter().position(|c| c.is_root) {
            Some(root) => Ok(chain[..=root]
                .iter()
                .rev()
                .map(|c| c.discriminator_tag().to_string())
                .collect()),
            None => Ok(vec![chain[0].discriminator_tag().to_string()]),
        }
    }
}

/// A [`ClassRegistry`] held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    classes: RwLock<HashMap<TypeName, Arc<ClassMap>>>,
}

impl InMemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding `maps`.
    pub fn from_class_maps(maps: impl IntoIterator<Item = ClassMap>) -> Self {
        let registry = Self::new();
        for map in maps {
            registry.register(map);
        }
        registry
    }

    /// Registers (or replaces) a class map.
    pub fn register(&self, map: ClassMap) {
        tracing::debug!(class = %map.name, members = map.members.len(), "registering class map");
        self.classes.write().insert(map.name.clone(), Arc::new(map));
    }

    /// Returns the number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    /// Returns `true` if no class is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }

    /// Returns every registered class map, ordered by name.
    #[must_use]
    pub fn class_maps(&self) -> Vec<Arc<ClassMap>> {
        let mut maps: Vec<_> = self.classes.read().values().cloned().collect();
        maps.sort_by(|a, b| a.name.cmp(&b.name));
        maps
    }
}

impl ClassRegistry for InMemoryRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<ClassMap>> {
        self.classes.read().get(name).cloned()
    }

    fn direct_subtypes(&self, name: &str) -> Vec<Arc<ClassMap>> {
        let mut subtypes: Vec<_> = self
            .classes
            .read()
            .values()
            .filter(|c| c.base.as_ref().is_some_and(|b| b == name))
            .cloned()
            .collect();
        subtypes.sort_by(|a, b| a.name.cmp(&b.name));
        subtypes
    }
}
