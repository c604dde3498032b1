//! Operator chain to QueryModel translator.
//!
//! Flattens the nested static calls of an operator chain into steps, then
//! walks them in composition order, folding each into the query model. Every
//! operator outside the catalog, and every ordering the target protocol
//! cannot express, fails here with an error naming the operator.

use quarry_common::types::{TypeName, Value};
use quarry_common::utils::error::{Error, QueryError, Result};
use quarry_core::expr::{Expr, Lambda, Method};
use smallvec::SmallVec;

use super::model::{ElementSelector, IndexHint, OrderByClause, QueryModel, SortDirection};
use crate::config::CompilerConfig;

/// Translates an operator chain into a query model.
///
/// # Errors
///
/// Returns a structural error if the chain uses an unsupported operator or
/// overload, or orders operators in a way the filter language cannot compose.
pub fn translate(chain: &Expr, config: &CompilerConfig) -> Result<QueryModel> {
    if chain.depth() > config.max_depth {
        return Err(Error::TooDeep(config.max_depth));
    }
    let (document_type, steps) = flatten(chain)?;
    let mut translator = ChainTranslator::new(document_type);
    for step in steps.iter().rev() {
        translator.translate_step(step)?;
    }
    let model = translator.finish();
    tracing::debug!(
        document_type = %model.document_type,
        has_filter = model.where_clause.is_some(),
        sort_keys = model.order_by.len(),
        skip = ?model.skip(),
        take = ?model.take(),
        "built query model"
    );
    Ok(model)
}

/// One operator application, its source argument stripped.
struct Step<'a> {
    method: &'a Method,
    arguments: &'a [Expr],
}

/// Steps of a typical chain fit inline.
type Steps<'a> = SmallVec<[Step<'a>; 8]>;

/// Collects the chain's steps, outermost first.
fn flatten(chain: &Expr) -> Result<(TypeName, Steps<'_>)> {
    let mut steps = Steps::new();
    let mut current = chain;
    loop {
        match current {
            Expr::Source { document_type } => return Ok((document_type.clone(), steps)),
            Expr::Call {
                method,
                object: None,
                arguments,
            } => match arguments.split_first() {
                Some((source, rest)) => {
                    steps.push(Step {
                        method,
                        arguments: rest,
                    });
                    current = source;
                }
                None => {
                    return Err(QueryError::Malformed(format!(
                        "{method} has no source argument"
                    ))
                    .into());
                }
            },
            other => {
                return Err(QueryError::Malformed(format!(
                    "expected an operator call or a source, found {other}"
                ))
                .into());
            }
        }
    }
}

/// Translator from operator steps to a QueryModel.
struct ChainTranslator {
    model: QueryModel,
}

impl ChainTranslator {
    fn new(document_type: TypeName) -> Self {
        Self {
            model: QueryModel::new(document_type),
        }
    }

    fn finish(self) -> QueryModel {
        self.model
    }

    fn translate_step(&mut self, step: &Step<'_>) -> Result<()> {
        tracing::trace!(operator = %step.method, "translating operator");

        if self.model.distinct.is_some() {
            return Err(if *step.method == Method::WithIndex {
                QueryError::HintWithDistinct
            } else {
                QueryError::InvalidSequence("No further operators may follow Distinct.".into())
            }
            .into());
        }
        if let Some(selector) = self.model.element_selector {
            return Err(QueryError::InvalidSequence(format!(
                "{} cannot follow the {selector} operator.",
                step.method
            ))
            .into());
        }

        match step.method {
            Method::Where => self.translate_where(step),
            Method::Select => self.translate_select(step),
            Method::OrderBy => self.translate_order_by(step, SortDirection::Ascending, false),
            Method::OrderByDescending => {
                self.translate_order_by(step, SortDirection::Descending, false)
            }
            Method::ThenBy => self.translate_order_by(step, SortDirection::Ascending, true),
            Method::ThenByDescending => {
                self.translate_order_by(step, SortDirection::Descending, true)
            }
            Method::Skip => {
                let count = integer_argument(step, 0)?;
                self.model.paging.apply_skip(count);
                Ok(())
            }
            Method::Take => {
                let count = integer_argument(step, 0)?;
                self.model.paging.apply_take(count);
                Ok(())
            }
            Method::OfType => self.translate_of_type(step),
            Method::Distinct => self.translate_distinct(),
            Method::WithIndex => self.translate_with_index(step),
            Method::Any => self.translate_selector(step, ElementSelector::Any),
            Method::Count => self.translate_selector(step, ElementSelector::Count),
            Method::LongCount => self.translate_selector(step, ElementSelector::LongCount),
            Method::First => self.translate_selector(step, ElementSelector::First),
            Method::FirstOrDefault => {
                self.translate_selector(step, ElementSelector::FirstOrDefault)
            }
            Method::Single => self.translate_selector(step, ElementSelector::Single),
            Method::SingleOrDefault => {
                self.translate_selector(step, ElementSelector::SingleOrDefault)
            }
            Method::Last => self.translate_last(step, ElementSelector::Last),
            Method::LastOrDefault => self.translate_last(step, ElementSelector::LastOrDefault),
            Method::ElementAt => self.translate_element_at(step, ElementSelector::ElementAt),
            Method::ElementAtOrDefault => {
                self.translate_element_at(step, ElementSelector::ElementAtOrDefault)
            }
            Method::Max => self.translate_max_min(step, ElementSelector::Max),
            Method::Min => self.translate_max_min(step, ElementSelector::Min),
            Method::All
            | Method::Aggregate
            | Method::Average
            | Method::Cast
            | Method::Concat
            | Method::DefaultIfEmpty
            | Method::Except
            | Method::GroupBy
            | Method::GroupJoin
            | Method::Intersect
            | Method::Join
            | Method::Reverse
            | Method::SelectMany
            | Method::SequenceEqual
            | Method::SkipWhile
            | Method::Sum
            | Method::TakeWhile
            | Method::Union
            | Method::Zip
            | Method::Contains
            | Method::ContainsAll
            | Method::ContainsAny
            | Method::ContainsKey
            | Method::StartsWith
            | Method::EndsWith
            | Method::Equals
            | Method::In
            | Method::Inject
            | Method::IsMatch
            | Method::IsNullOrEmpty
            | Method::IndexOf
            | Method::IndexOfAny
            | Method::GetType
            | Method::ToLower
            | Method::ToUpper
            | Method::ToLowerInvariant
            | Method::ToUpperInvariant
            | Method::Trim
            | Method::TrimStart
            | Method::TrimEnd
            | Method::Other(_) => {
                Err(QueryError::UnsupportedOperator(step.method.name().to_string()).into())
            }
        }
    }

    fn translate_where(&mut self, step: &Step<'_>) -> Result<()> {
        let predicate = lambda_argument(step, 0)?;
        self.ensure_single_parameter(step, predicate)?;
        self.ensure_not_paged("Where")?;
        if self.model.projection.is_some() {
            return Err(QueryError::PredicateAfterProjection("Where".into()).into());
        }
        self.model.add_predicate(predicate);
        Ok(())
    }

    fn translate_select(&mut self, step: &Step<'_>) -> Result<()> {
        let projection = lambda_argument(step, 0)?;
        self.ensure_single_parameter(step, projection)?;
        self.ensure_not_paged("Select")?;
        if projection.is_identity() {
            return Ok(());
        }
        if self.model.projection.is_some() {
            return Err(QueryError::InvalidSequence(
                "Select after a projection is not supported.".into(),
            )
            .into());
        }
        self.model.projection = Some(projection.clone());
        Ok(())
    }

    fn translate_order_by(
        &mut self,
        step: &Step<'_>,
        direction: SortDirection,
        secondary: bool,
    ) -> Result<()> {
        let key = lambda_argument(step, 0)?;
        self.ensure_not_paged(step.method.name())?;
        if secondary && self.model.order_by.is_empty() {
            return Err(QueryError::InvalidSequence(format!(
                "{} can only be used after OrderBy or OrderByDescending.",
                step.method
            ))
            .into());
        }
        if !secondary && !self.model.order_by.is_empty() {
            return Err(QueryError::InvalidSequence(
                "Only one OrderBy or OrderByDescending clause is allowed \
                 (use ThenBy or ThenByDescending for multiple order by clauses)."
                    .into(),
            )
            .into());
        }
        self.model.order_by.push(OrderByClause {
            key: key.clone(),
            direction,
        });
        Ok(())
    }

    fn translate_of_type(&mut self, step: &Step<'_>) -> Result<()> {
        let target = match step.arguments.first().and_then(Expr::as_constant) {
            Some(Value::Type(t)) => t.clone(),
            _ => {
                return Err(
                    QueryError::Malformed("OfType requires a type argument".into()).into(),
                );
            }
        };
        if self.model.projection.is_some() {
            return Err(QueryError::InvalidSequence(
                "OfType after a projection is not supported.".into(),
            )
            .into());
        }
        self.ensure_not_paged("OfType")?;
        if target != self.model.document_type {
            self.model.of_type = Some(target);
        }
        Ok(())
    }

    fn translate_distinct(&mut self) -> Result<()> {
        if self.model.index_hint.is_some() {
            return Err(QueryError::HintWithDistinct.into());
        }
        if !self.model.order_by.is_empty() {
            return Err(
                QueryError::InvalidSequence("Distinct cannot be used with OrderBy.".into()).into(),
            );
        }
        if self.model.paging.is_set() {
            return Err(QueryError::InvalidSequence(
                "Distinct cannot be used with Skip or Take.".into(),
            )
            .into());
        }
        match self.model.projection.take() {
            Some(key) => {
                self.model.distinct = Some(key);
                Ok(())
            }
            None => Err(QueryError::InvalidSequence(
                "Distinct must be used with Select to identify the field whose values are to be returned."
                    .into(),
            )
            .into()),
        }
    }

    fn translate_with_index(&mut self, step: &Step<'_>) -> Result<()> {
        if self.model.index_hint.is_some() {
            return Err(QueryError::DuplicateIndexHint.into());
        }
        let hint = match step.arguments.first().and_then(Expr::as_constant) {
            Some(Value::String(name)) => IndexHint::Name(name.clone()),
            Some(Value::Document(keys)) => IndexHint::Keys(keys.clone()),
            _ => {
                return Err(QueryError::Malformed(
                    "WithIndex requires an index name or a key document".into(),
                )
                .into());
            }
        };
        self.model.index_hint = Some(hint);
        Ok(())
    }

    fn translate_selector(&mut self, step: &Step<'_>, selector: ElementSelector) -> Result<()> {
        self.add_selector_predicate(step, selector)?;
        match selector {
            ElementSelector::Any | ElementSelector::Count | ElementSelector::LongCount => {
                self.model.projection = None;
            }
            ElementSelector::First | ElementSelector::FirstOrDefault => {
                self.model.paging.apply_take(1);
            }
            // Two results are enough to tell "one" from "many".
            ElementSelector::Single | ElementSelector::SingleOrDefault => {
                self.model.paging.apply_take(2);
            }
            _ => {}
        }
        self.model.element_selector = Some(selector);
        Ok(())
    }

    fn translate_last(&mut self, step: &Step<'_>, selector: ElementSelector) -> Result<()> {
        self.add_selector_predicate(step, selector)?;
        if self.model.order_by.is_empty() {
            return Err(QueryError::InvalidSequence(format!(
                "{selector} can only be used after OrderBy or OrderByDescending."
            ))
            .into());
        }
        // Reversing the sort would turn a skipped prefix into a skipped suffix.
        if self.model.paging.is_set() {
            return Err(QueryError::InvalidSequence(format!(
                "{selector} cannot be used after Skip or Take."
            ))
            .into());
        }
        for clause in &mut self.model.order_by {
            clause.direction = clause.direction.reversed();
        }
        self.model.paging.apply_take(1);
        self.model.element_selector = Some(selector);
        Ok(())
    }

    fn translate_element_at(&mut self, step: &Step<'_>, selector: ElementSelector) -> Result<()> {
        let index = integer_argument(step, 0)?;
        self.model.paging.apply_skip(index);
        self.model.paging.apply_take(1);
        self.model.element_selector = Some(selector);
        Ok(())
    }

    fn translate_max_min(&mut self, step: &Step<'_>, selector: ElementSelector) -> Result<()> {
        if !self.model.order_by.is_empty() {
            return Err(QueryError::InvalidSequence(format!(
                "{selector} cannot be used with OrderBy."
            ))
            .into());
        }
        if self.model.paging.is_set() {
            return Err(QueryError::InvalidSequence(format!(
                "{selector} cannot be used with Skip or Take."
            ))
            .into());
        }
        let key = match step.arguments.first() {
            Some(argument) => match argument.as_lambda() {
                Some(lambda) => lambda.clone(),
                None => return Err(malformed_lambda(step)),
            },
            None => match self.model.projection.take() {
                Some(projection) => projection,
                None => {
                    return Err(QueryError::InvalidSequence(format!(
                        "{selector} requires a selector or a preceding Select."
                    ))
                    .into());
                }
            },
        };
        let direction = if selector == ElementSelector::Max {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        self.model.order_by = split_sort_keys(&key)
            .into_iter()
            .map(|key| OrderByClause { key, direction })
            .collect();
        self.model.projection = Some(key);
        self.model.paging.apply_take(1);
        self.model.element_selector = Some(selector);
        Ok(())
    }

    fn add_selector_predicate(&mut self, step: &Step<'_>, selector: ElementSelector) -> Result<()> {
        let Some(argument) = step.arguments.first() else {
            return Ok(());
        };
        let predicate = argument.as_lambda().ok_or_else(|| malformed_lambda(step))?;
        self.ensure_single_parameter(step, predicate)?;
        if self.model.projection.is_some() {
            return Err(QueryError::PredicateAfterProjection(selector.name().into()).into());
        }
        self.ensure_not_paged(selector.name())?;
        self.model.add_predicate(predicate);
        Ok(())
    }

    fn ensure_single_parameter(&self, step: &Step<'_>, lambda: &Lambda) -> Result<()> {
        match lambda.parameters.len() {
            1 => Ok(()),
            2 => Err(QueryError::IndexedOverload(step.method.name().to_string()).into()),
            n => Err(QueryError::Malformed(format!(
                "{} expects a one-parameter lambda, found {n} parameters",
                step.method
            ))
            .into()),
        }
    }

    fn ensure_not_paged(&self, operator: &str) -> Result<()> {
        if self.model.paging.is_set() {
            return Err(QueryError::SkipTakeNotTerminal(operator.to_string()).into());
        }
        Ok(())
    }
}

/// Splits a composite key (`new { A = x.A, B = x.B }`) into one selector per member.
fn split_sort_keys(key: &Lambda) -> Vec<Lambda> {
    match key.body.as_ref() {
        Expr::New { members } => members
            .iter()
            .map(|(_, body)| Lambda {
                parameters: key.parameters.clone(),
                body: Box::new(body.clone()),
            })
            .collect(),
        _ => vec![key.clone()],
    }
}

fn lambda_argument<'a>(step: &Step<'a>, position: usize) -> Result<&'a Lambda> {
    step.arguments
        .get(position)
        .and_then(Expr::as_lambda)
        .ok_or_else(|| malformed_lambda(step))
}

fn integer_argument(step: &Step<'_>, position: usize) -> Result<i64> {
    step.arguments
        .get(position)
        .and_then(Expr::as_constant)
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            QueryError::Malformed(format!("{} requires a constant integer", step.method)).into()
        })
}

fn malformed_lambda(step: &Step<'_>) -> Error {
    QueryError::Malformed(format!("{} requires a lambda argument", step.method)).into()
}
