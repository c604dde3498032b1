//! Compile command.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use bson::Bson;
use quarry_engine::{CompiledQuery, CompilerConfig, QueryTranslator};
use serde::Serialize;

use super::{load_chain, load_registry};
use crate::OutputFormat;
use crate::output::{self, Format};

/// The rendered documents of a chain.
#[derive(Serialize)]
struct CompileOutput {
    filter: Option<serde_json::Value>,
    sort: Option<serde_json::Value>,
    skip: Option<u64>,
    limit: Option<u64>,
    hint: Option<serde_json::Value>,
    distinct_field: Option<String>,
    projection: Option<String>,
    element_selector: Option<String>,
    empty_result: bool,
}

impl From<&CompiledQuery> for CompileOutput {
    fn from(query: &CompiledQuery) -> Self {
        Self {
            filter: query.filter.as_ref().map(output::document_json),
            sort: query.sort.as_ref().map(output::document_json),
            skip: query.skip,
            limit: query.limit,
            hint: query.hint.clone().map(Bson::into_relaxed_extjson),
            distinct_field: query.distinct_field.clone(),
            projection: query.projection.as_ref().map(ToString::to_string),
            element_selector: query.element_selector.map(|s| s.name().to_string()),
            empty_result: query.empty_result,
        }
    }
}

fn build(query: &Path, classes: &Path, discriminator: &str) -> Result<CompiledQuery> {
    let chain = load_chain(query)?;
    let registry = load_registry(classes)?;
    let config = CompilerConfig::default().with_discriminator_element(discriminator);
    let translator = QueryTranslator::with_config(Arc::new(registry), config);
    Ok(translator.compile_chain(&chain)?)
}

/// Run the compile command.
pub fn run(
    query: &Path,
    classes: &Path,
    discriminator: &str,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let compiled = build(query, classes, discriminator)?;

    let fmt: Format = format.into();
    match fmt {
        Format::Json => output::print_json(&CompileOutput::from(&compiled), quiet)?,
        Format::Table => {
            let items = vec![
                ("Filter", output::document_cell(compiled.filter.as_ref())),
                ("Sort", output::document_cell(compiled.sort.as_ref())),
                ("Skip", output::optional_cell(compiled.skip)),
                ("Limit", output::optional_cell(compiled.limit)),
                (
                    "Hint",
                    output::optional_cell(compiled.hint.clone().map(Bson::into_relaxed_extjson)),
                ),
                ("Distinct", output::optional_cell(compiled.distinct_field)),
                ("Projection", output::optional_cell(compiled.projection)),
                (
                    "Selector",
                    output::optional_cell(compiled.element_selector.map(|s| s.name())),
                ),
                ("Empty result", compiled.empty_result.to_string()),
            ];
            output::print_key_value_table(&items, quiet);
        }
    }

    Ok(())
}
