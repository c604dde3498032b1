//! Class listing command.

use std::path::Path;

use anyhow::Result;
use comfy_table::Cell;
use quarry_core::serialization::ClassRegistry;
use serde::Serialize;

use super::load_registry;
use crate::OutputFormat;
use crate::output::{self, Format};

/// One mapped member.
#[derive(Serialize)]
struct MemberOutput {
    member: String,
    element: String,
    codec: String,
}

/// One registered class.
#[derive(Serialize)]
struct ClassOutput {
    name: String,
    base: Option<String>,
    discriminator: Vec<String>,
    convention: String,
    members: Vec<MemberOutput>,
}

fn build(classes: &Path) -> Result<Vec<ClassOutput>> {
    let registry = load_registry(classes)?;
    let mut out = Vec::with_capacity(registry.len());
    for class in registry.class_maps() {
        let name = class.name.as_str();
        out.push(ClassOutput {
            name: name.to_string(),
            base: class.base.as_ref().map(ToString::to_string),
            discriminator: registry.discriminator_values(name)?,
            convention: format!("{:?}", registry.discriminator_convention(name)?),
            members: class
                .members
                .iter()
                .map(|(member, map)| MemberOutput {
                    member: member.clone(),
                    element: map.element_name.clone(),
                    codec: map.codec.name(),
                })
                .collect(),
        });
    }
    Ok(out)
}

/// Run the classes command.
pub fn run(classes: &Path, format: OutputFormat, quiet: bool) -> Result<()> {
    let output = build(classes)?;

    let fmt: Format = format.into();
    match fmt {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            if quiet {
                return Ok(());
            }
            let mut table = output::create_table();
            output::add_header(
                &mut table,
                &["Class", "Base", "Discriminator", "Member", "Element", "Codec"],
            );
            for class in &output {
                let tags = class.discriminator.join(", ");
                let base = class.base.clone().unwrap_or_else(|| "-".to_string());
                if class.members.is_empty() {
                    table.add_row(vec![
                        Cell::new(&class.name),
                        Cell::new(&base),
                        Cell::new(&tags),
                        Cell::new("-"),
                        Cell::new("-"),
                        Cell::new("-"),
                    ]);
                }
                for member in &class.members {
                    table.add_row(vec![
                        Cell::new(&class.name),
                        Cell::new(&base),
                        Cell::new(&tags),
                        Cell::new(&member.member),
                        Cell::new(&member.element),
                        Cell::new(&member.codec),
                    ]);
                }
            }
            println!("{table}");
        }
    }

    Ok(())
}
