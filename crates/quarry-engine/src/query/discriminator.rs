//! Discriminator injection for polymorphic collections.
//!
//! Narrowing a query to a subtype adds a constraint on the discriminator
//! element. Under the hierarchical convention the element holds every tag from
//! the root down, so membership of one tag selects a whole subtree; under the
//! scalar convention each document holds one tag and a subtree needs `$in`.

use bson::Bson;
use quarry_common::utils::error::{Result, TranslationError};
use quarry_core::resolver::ElementPath;
use quarry_core::serialization::{ClassRegistry, DiscriminatorConvention};

use super::predicate::Fragment;
use crate::config::CompilerConfig;

/// Which documents a narrowing keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narrowing {
    /// The target and all of its subtypes (`OfType<T>`, `x is T`).
    Subtree,
    /// Precisely the target (`x.GetType() == typeof(T)`).
    Exact,
}

/// Builds the discriminator constraint narrowing `nominal` to `target`.
///
/// `prefix` is the element path of the (sub)document being tested; the
/// discriminator element is addressed beneath it.
///
/// # Errors
///
/// Fails when either class is unknown or `target` does not derive from
/// `nominal`.
pub fn narrow(
    registry: &dyn ClassRegistry,
    config: &CompilerConfig,
    nominal: &str,
    target: &str,
    prefix: &ElementPath,
    narrowing: Narrowing,
) -> Result<Fragment> {
    if !registry.is_subtype_of(target, nominal)? {
        return Err(TranslationError::NotASubtype {
            target: target.to_string(),
            nominal: nominal.to_string(),
        }
        .into());
    }
    let subtypes = registry.all_subtypes(target);
    if target == nominal && (narrowing == Narrowing::Subtree || subtypes.is_empty()) {
        return Ok(Fragment::matches_all());
    }

    let element = prefix.child(config.discriminator_element.clone());
    let tags = registry.discriminator_values(target)?;
    let Some(tag) = tags.last().cloned() else {
        return Err(quarry_common::Error::Internal(format!(
            "class '{target}' has no discriminator"
        )));
    };
    let convention = registry.discriminator_convention(target)?;

    let fragment = match (convention, narrowing) {
        (DiscriminatorConvention::Hierarchical, Narrowing::Subtree) => {
            Fragment::field(element.dotted(), tag)
        }
        (DiscriminatorConvention::Hierarchical, Narrowing::Exact) => {
            let mut document = bson::Document::new();
            document.insert(element.dotted(), tag);
            if !subtypes.is_empty() {
                let deeper = element.child(tags.len().to_string());
                document.insert(deeper.dotted(), bson::doc! { "$exists": false });
            }
            Fragment::from_document(document)
        }
        (DiscriminatorConvention::Scalar, Narrowing::Subtree) if !subtypes.is_empty() => {
            let mut all: Vec<Bson> = vec![Bson::String(tag)];
            all.extend(
                subtypes
                    .iter()
                    .map(|class| Bson::String(class.discriminator_tag().to_string())),
            );
            Fragment::operator(element.dotted(), "$in", all)
        }
        (DiscriminatorConvention::Scalar, _) => Fragment::field(element.dotted(), tag),
    };
    tracing::trace!(nominal, target, ?narrowing, filter = %fragment, "injected discriminator");
    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::zoo_registry;
    use bson::doc;

    fn run(nominal: &str, target: &str, narrowing: Narrowing) -> Result<Fragment> {
        narrow(
            &zoo_registry(),
            &CompilerConfig::default(),
            nominal,
            target,
            &ElementPath::root(),
            narrowing,
        )
    }

    #[test]
    fn test_root_narrowing_is_noop() {
        assert!(run("Animal", "Animal", Narrowing::Subtree).unwrap().is_matches_all());
    }

    #[test]
    fn test_hierarchical_subtree() {
        assert_eq!(
            run("Animal", "Cat", Narrowing::Subtree).unwrap().as_document(),
            &doc! { "_t": "Cat" }
        );
    }

    #[test]
    fn test_hierarchical_exact_excludes_subtypes() {
        assert_eq!(
            run("Animal", "Cat", Narrowing::Exact).unwrap().as_document(),
            &doc! { "_t": "Cat", "_t.2": { "$exists": false } }
        );
        assert_eq!(
            run("Animal", "Dog", Narrowing::Exact).unwrap().as_document(),
            &doc! { "_t": "Dog" }
        );
        assert_eq!(
            run("Animal", "Animal", Narrowing::Exact).unwrap().as_document(),
            &doc! { "_t": "Animal", "_t.1": { "$exists": false } }
        );
    }

    #[test]
    fn test_scalar_subtree_uses_in() {
        assert_eq!(
            run("Shape", "Polygon", Narrowing::Subtree).unwrap().as_document(),
            &doc! { "_t": { "$in": ["Polygon", "square"] } }
        );
        assert_eq!(
            run("Shape", "Polygon", Narrowing::Exact).unwrap().as_document(),
            &doc! { "_t": "Polygon" }
        );
    }

    #[test]
    fn test_prefix_and_custom_element() {
        let fragment = narrow(
            &zoo_registry(),
            &CompilerConfig::default().with_discriminator_element("kind"),
            "Animal",
            "Dog",
            &ElementPath::parse("pet"),
            Narrowing::Subtree,
        )
        .unwrap();
        assert_eq!(fragment.as_document(), &doc! { "pet.kind": "Dog" });
    }

    #[test]
    fn test_not_a_subtype() {
        let err = run("Cat", "Dog", Narrowing::Subtree).unwrap_err();
        assert_eq!(err.to_string(), "Type 'Dog' is not a subtype of 'Cat'.");
    }
}
