//! Class maps used across the engine's tests.
//!
//! - `Person`: flat scalars, a string array, a document array, a dictionary
//! - `Animal` > `Cat` > `Lion`, `Animal` > `Dog`: hierarchical discriminators
//! - `Shape` > `Polygon` > `Square`: scalar discriminators, `Square` tagged `square`

use quarry_core::expr::Parameter;
use quarry_core::serialization::{
    ClassMap, Codec, DictionaryRepresentation, EnumRepresentation, InMemoryRegistry,
};

/// The `x` parameter of a `Person` predicate.
pub fn person() -> Parameter {
    Parameter::new("x", "Person")
}

/// The `Color` enumeration, stored by name.
pub fn color_codec() -> Codec {
    Codec::Enum {
        type_name: "Color".into(),
        variants: [("Red", 1), ("Green", 2), ("Blue", 3)]
            .into_iter()
            .map(|(name, ordinal)| (name.to_string(), ordinal))
            .collect(),
        representation: EnumRepresentation::String,
    }
}

/// Builds the shared registry.
pub fn zoo_registry() -> InMemoryRegistry {
    InMemoryRegistry::from_class_maps([
        ClassMap::new("Person")
            .map_member("Name", "name", Codec::String)
            .map_member("Age", "age", Codec::int32())
            .map_member("X", "X", Codec::int32())
            .map_member("Y", "Y", Codec::int32())
            .map_member("Active", "active", Codec::Boolean)
            .map_member("Color", "color", color_codec())
            .map_member("Tags", "tags", Codec::array(Codec::String))
            .map_member("Lines", "lines", Codec::array(Codec::document("Line")))
            .map_member(
                "Attrs",
                "attrs",
                Codec::dictionary(Codec::String, Codec::int32(), DictionaryRepresentation::Document),
            )
            .map_member(
                "Scores",
                "scores",
                Codec::dictionary(
                    Codec::String,
                    Codec::int32(),
                    DictionaryRepresentation::ArrayOfDocuments,
                ),
            ),
        ClassMap::new("Line")
            .map_member("Sku", "sku", Codec::String)
            .map_member("Qty", "qty", Codec::int32()),
        ClassMap::new("Animal")
            .as_root()
            .map_member("Name", "name", Codec::String)
            .map_member("Age", "age", Codec::int32())
            .map_member("Tags", "tags", Codec::array(Codec::String)),
        ClassMap::new("Cat")
            .with_base("Animal")
            .map_member("Lives", "lives", Codec::int32()),
        ClassMap::new("Lion").with_base("Cat"),
        ClassMap::new("Dog")
            .with_base("Animal")
            .map_member("Breed", "breed", Codec::String),
        ClassMap::new("Shape").map_member("Area", "area", Codec::double()),
        ClassMap::new("Polygon")
            .with_base("Shape")
            .map_member("Sides", "sides", Codec::int32()),
        ClassMap::new("Square")
            .with_base("Polygon")
            .with_discriminator("square"),
    ])
}
