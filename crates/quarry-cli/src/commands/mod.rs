//! CLI command implementations.

pub mod classes;
pub mod compile;
pub mod model;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use quarry_core::expr::Expr;
use quarry_core::serialization::{ClassMap, InMemoryRegistry};

/// Reads an operator chain from a JSON file.
pub fn load_chain(path: &Path) -> Result<Expr> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read query file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid operator chain", path.display()))
}

/// Reads a JSON array of class maps into a registry.
pub fn load_registry(path: &Path) -> Result<InMemoryRegistry> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read class file {}", path.display()))?;
    let maps: Vec<ClassMap> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid list of class maps", path.display()))?;
    Ok(InMemoryRegistry::from_class_maps(maps))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;

    use quarry_common::Value;
    use quarry_core::expr::{Expr, Method, Parameter};
    use quarry_core::serialization::{ClassMap, Codec};
    use tempfile::NamedTempFile;

    pub fn write_json<T: serde::Serialize>(value: &T) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(value).unwrap().as_bytes())
            .unwrap();
        file
    }

    pub fn classes() -> Vec<ClassMap> {
        vec![
            ClassMap::new("Animal")
                .as_root()
                .map_member("Name", "name", Codec::String)
                .map_member("Age", "age", Codec::int32()),
            ClassMap::new("Cat")
                .with_base("Animal")
                .map_member("Lives", "lives", Codec::int32()),
        ]
    }

    pub fn cats_named_tom() -> Expr {
        let c = Parameter::new("c", "Cat");
        Expr::source("Animal")
            .apply(Method::OfType, vec![Expr::constant(Value::Type("Cat".into()))])
            .apply(
                Method::Where,
                vec![Expr::lambda(
                    c.clone(),
                    Expr::parameter(&c).member("Name").equal(Expr::constant("Tom")),
                )],
            )
            .apply(
                Method::OrderByDescending,
                vec![Expr::lambda(c.clone(), Expr::parameter(&c).member("Age"))],
            )
            .apply(Method::Take, vec![Expr::constant(5)])
    }
}
