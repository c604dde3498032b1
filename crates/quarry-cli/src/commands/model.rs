//! Query model command.

use std::path::Path;

use anyhow::Result;
use quarry_core::expr::Lambda;
use quarry_engine::{CompilerConfig, QueryModel};
use serde::Serialize;

use super::load_chain;
use crate::OutputFormat;
use crate::output::{self, Format};

/// The structural view of a chain.
#[derive(Serialize)]
struct ModelOutput {
    document_type: String,
    filter: Option<String>,
    order_by: Vec<String>,
    projection: Option<String>,
    skip: Option<u64>,
    take: Option<u64>,
    of_type: Option<String>,
    index_hint: Option<String>,
    distinct: Option<String>,
    element_selector: Option<String>,
}

impl From<&QueryModel> for ModelOutput {
    fn from(model: &QueryModel) -> Self {
        let lambda = |l: &Lambda| l.to_string();
        Self {
            document_type: model.document_type.to_string(),
            filter: model.where_clause.as_ref().map(lambda),
            order_by: model
                .order_by
                .iter()
                .map(|clause| format!("{} {:?}", lambda(&clause.key), clause.direction))
                .collect(),
            projection: model.projection.as_ref().map(lambda),
            skip: model.skip(),
            take: model.take(),
            of_type: model.of_type.as_ref().map(ToString::to_string),
            index_hint: model.index_hint.as_ref().map(ToString::to_string),
            distinct: model.distinct.as_ref().map(lambda),
            element_selector: model.element_selector.map(|s| s.name().to_string()),
        }
    }
}

fn build(query: &Path) -> Result<ModelOutput> {
    let chain = load_chain(query)?;
    let model = quarry_engine::query::translate(&chain, &CompilerConfig::default())?;
    Ok(ModelOutput::from(&model))
}

/// Run the model command.
pub fn run(query: &Path, format: OutputFormat, quiet: bool) -> Result<()> {
    let output = build(query)?;

    let fmt: Format = format.into();
    match fmt {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            let items = vec![
                ("Document type", output.document_type),
                ("Filter", output::optional_cell(output.filter)),
                (
                    "Order by",
                    if output.order_by.is_empty() {
                        "-".to_string()
                    } else {
                        output.order_by.join(", ")
                    },
                ),
                ("Projection", output::optional_cell(output.projection)),
                ("Skip", output::optional_cell(output.skip)),
                ("Take", output::optional_cell(output.take)),
                ("OfType", output::optional_cell(output.of_type)),
                ("Index hint", output::optional_cell(output.index_hint)),
                ("Distinct", output::optional_cell(output.distinct)),
                ("Selector", output::optional_cell(output.element_selector)),
            ];
            output::print_key_value_table(&items, quiet);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn test_model_is_structural_only() {
        let query = fixtures::write_json(&fixtures::cats_named_tom());
        let output = build(query.path()).unwrap();
        assert_eq!(output.document_type, "Animal");
        assert_eq!(output.of_type.as_deref(), Some("Cat"));
        assert_eq!(output.take, Some(5));
        assert_eq!(output.order_by, vec!["c => c.Age Descending".to_string()]);
    }
}
