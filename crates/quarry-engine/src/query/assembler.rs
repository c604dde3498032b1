//! Query document assembly.
//!
//! Renders a [`QueryModel`] into the documents a find request carries. This
//! is the only stage that consults the class registry, so representation
//! errors surface here rather than while the chain is walked.

use bson::{Bson, Document};
use quarry_common::utils::error::{Result, TranslationError};
use quarry_core::expr::{Expr, Lambda};
use quarry_core::resolver::ElementPath;
use quarry_core::serialization::ClassRegistry;

use super::discriminator::{self, Narrowing};
use super::model::{ElementSelector, IndexHint, QueryModel};
use super::predicate::{Fragment, PredicateCompiler, conjoin};
use crate::config::CompilerConfig;

/// The rendered parts of a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledQuery {
    /// The filter document; `None` selects everything.
    pub filter: Option<Document>,
    /// The sort document, primary key first.
    pub sort: Option<Document>,
    /// Documents to skip.
    pub skip: Option<u64>,
    /// Maximum documents to return.
    pub limit: Option<u64>,
    /// The index hint: a bare name or a key document.
    pub hint: Option<Bson>,
    /// The element path of a Distinct key.
    pub distinct_field: Option<String>,
    /// The projection, left uncompiled for the caller's deserializer.
    pub projection: Option<Lambda>,
    /// The terminal element selector.
    pub element_selector: Option<ElementSelector>,
    /// Set when the query provably returns nothing; nothing else is rendered.
    pub empty_result: bool,
}

/// Renders every part of `model`.
///
/// # Errors
///
/// Returns a translation error when a field cannot be resolved or a
/// predicate has no rendering.
pub fn assemble(
    model: &QueryModel,
    registry: &dyn ClassRegistry,
    config: &CompilerConfig,
) -> Result<CompiledQuery> {
    if model.is_empty_result() {
        tracing::debug!(document_type = %model.document_type, "take(0): returning empty result");
        return Ok(CompiledQuery {
            element_selector: model.element_selector,
            empty_result: true,
            ..CompiledQuery::default()
        });
    }

    let mut compiler = PredicateCompiler::new(registry, config);
    let filter = compile_filter(model, &mut compiler, config)?;

    let mut sort = Document::new();
    for clause in &model.order_by {
        let path = field_path(&mut compiler, &clause.key, "OrderBy")?;
        sort.insert(path, clause.direction.as_i32());
    }

    let distinct_field = model
        .distinct
        .as_ref()
        .map(|key| field_path(&mut compiler, key, "Distinct"))
        .transpose()?;

    let hint = model.index_hint.as_ref().map(|hint| match hint {
        IndexHint::Name(name) => Bson::String(name.clone()),
        IndexHint::Keys(keys) => Bson::Document(keys.clone()),
    });

    let compiled = CompiledQuery {
        filter,
        sort: (!sort.is_empty()).then_some(sort),
        skip: model.skip(),
        limit: model.take(),
        hint,
        distinct_field,
        projection: model.projection.clone(),
        element_selector: model.element_selector,
        empty_result: false,
    };
    tracing::debug!(
        document_type = %model.document_type,
        filter = ?compiled.filter,
        sort = ?compiled.sort,
        "assembled query"
    );
    if config.log_compiled_queries {
        tracing::info!(
            document_type = %model.document_type,
            filter = %compiled.filter.as_ref().map_or_else(|| "{}".to_string(), ToString::to_string),
            skip = ?compiled.skip,
            limit = ?compiled.limit,
            "compiled query"
        );
    }
    Ok(compiled)
}

/// Renders only the filter of `model`.
///
/// Returns `None` when the query selects every document.
///
/// # Errors
///
/// Returns a translation error when the predicate has no rendering.
pub fn build_filter(
    model: &QueryModel,
    registry: &dyn ClassRegistry,
    config: &CompilerConfig,
) -> Result<Option<Document>> {
    let mut compiler = PredicateCompiler::new(registry, config);
    compile_filter(model, &mut compiler, config)
}

fn compile_filter(
    model: &QueryModel,
    compiler: &mut PredicateCompiler<'_>,
    config: &CompilerConfig,
) -> Result<Option<Document>> {
    let mut parts = Vec::with_capacity(2);
    if let Some(target) = &model.of_type {
        parts.push(discriminator::narrow(
            compiler.resolver_mut().registry(),
            config,
            model.document_type.as_str(),
            target.as_str(),
            &ElementPath::root(),
            Narrowing::Subtree,
        )?);
    }
    if let Some(predicate) = &model.where_clause {
        parts.push(compiler.compile_lambda(predicate)?);
    }
    let filter = conjoin(parts);
    Ok(if filter.is_matches_all() {
        None
    } else {
        Some(Fragment::into_document(filter))
    })
}

/// Resolves a key selector to a single element path.
fn field_path(
    compiler: &mut PredicateCompiler<'_>,
    selector: &Lambda,
    operator: &str,
) -> Result<String> {
    let not_a_field = || TranslationError::NotAFieldSelector {
        operator: operator.to_string(),
        expression: selector.to_string(),
    };
    if matches!(selector.body.as_ref(), Expr::New { .. }) {
        return Err(not_a_field().into());
    }
    let info = compiler.resolver_mut().resolve(&selector.body)?;
    if info.element_path.is_root() {
        return Err(not_a_field().into());
    }
    Ok(info.element_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::builder::translate;
    use crate::test_support::fixtures::{person, zoo_registry};
    use crate::test_support::matcher::matches;
    use bson::doc;
    use quarry_core::expr::{Method, Parameter};

    fn compile(chain: &Expr) -> Result<CompiledQuery> {
        let config = CompilerConfig::default();
        let model = translate(chain, &config)?;
        assemble(&model, &zoo_registry(), &config)
    }

    fn animals() -> Expr {
        Expr::source("Animal")
    }

    fn lambda(p: &Parameter, body: Expr) -> Expr {
        Expr::lambda(p.clone(), body)
    }

    #[test]
    fn test_bare_source_has_no_filter() {
        let compiled = compile(&Expr::source("Person")).unwrap();
        assert_eq!(compiled.filter, None);
        assert_eq!(compiled.sort, None);
        assert!(!compiled.empty_result);
    }

    #[test]
    fn test_sort_skip_take_and_hint() {
        let x = person();
        let chain = Expr::source("Person")
            .apply(Method::OrderBy, vec![lambda(&x, Expr::parameter(&x).member("Name"))])
            .apply(
                Method::ThenByDescending,
                vec![lambda(&x, Expr::parameter(&x).member("Age"))],
            )
            .apply(Method::WithIndex, vec![Expr::constant("by_name")])
            .apply(Method::Skip, vec![Expr::constant(10)])
            .apply(Method::Take, vec![Expr::constant(5)]);
        let compiled = compile(&chain).unwrap();
        assert_eq!(compiled.sort, Some(doc! { "name": 1, "age": -1 }));
        assert_eq!(compiled.skip, Some(10));
        assert_eq!(compiled.limit, Some(5));
        assert_eq!(compiled.hint, Some(Bson::String("by_name".into())));
    }

    #[test]
    fn test_take_zero_compiles_nothing() {
        let x = person();
        // Field-to-field comparison would fail if it were compiled.
        let chain = Expr::source("Person")
            .apply(
                Method::Where,
                vec![lambda(
                    &x,
                    Expr::parameter(&x).member("X").equal(Expr::parameter(&x).member("Y")),
                )],
            )
            .apply(Method::Take, vec![Expr::constant(0)]);
        let compiled = compile(&chain).unwrap();
        assert!(compiled.empty_result);
        assert_eq!(compiled.filter, None);
    }

    #[test]
    fn test_of_type_root_is_noop() {
        let chain = animals().apply(
            Method::OfType,
            vec![Expr::constant(quarry_common::Value::Type("Animal".into()))],
        );
        assert_eq!(compile(&chain).unwrap().filter, None);
    }

    #[test]
    fn test_of_type_and_where_in_either_order() {
        let a = Parameter::new("a", "Animal");
        let c = Parameter::new("c", "Cat");
        let of_cat = || Expr::constant(quarry_common::Value::Type("Cat".into()));
        let name_is = |p: &Parameter| lambda(p, Expr::parameter(p).member("Name").equal(Expr::constant("Tom")));

        let narrowed_first = animals()
            .apply(Method::OfType, vec![of_cat()])
            .apply(Method::Where, vec![name_is(&c)]);
        let filtered_first = animals()
            .apply(Method::Where, vec![name_is(&a)])
            .apply(Method::OfType, vec![of_cat()]);

        let expected = Some(doc! { "_t": "Cat", "name": "Tom" });
        assert_eq!(compile(&narrowed_first).unwrap().filter, expected);
        assert_eq!(compile(&filtered_first).unwrap().filter, expected);
    }

    #[test]
    fn test_derived_member_after_of_type() {
        let c = Parameter::new("c", "Cat");
        let chain = animals()
            .apply(
                Method::OfType,
                vec![Expr::constant(quarry_common::Value::Type("Cat".into()))],
            )
            .apply(
                Method::Where,
                vec![lambda(&c, Expr::parameter(&c).member("Lives").greater_than(Expr::constant(3)))],
            );
        let filter = compile(&chain).unwrap().filter.unwrap();
        assert_eq!(filter, doc! { "_t": "Cat", "lives": { "$gt": 3 } });

        let tom = doc! { "_t": ["Animal", "Cat"], "name": "Tom", "lives": 9 };
        let rex = doc! { "_t": ["Animal", "Dog"], "name": "Rex", "lives": 9 };
        assert!(matches(&filter, &tom));
        assert!(!matches(&filter, &rex));
    }

    #[test]
    fn test_distinct_field() {
        let x = person();
        let chain = Expr::source("Person")
            .apply(Method::Select, vec![lambda(&x, Expr::parameter(&x).member("Name"))])
            .apply(Method::Distinct, vec![]);
        let compiled = compile(&chain).unwrap();
        assert_eq!(compiled.distinct_field.as_deref(), Some("name"));
    }

    #[test]
    fn test_sort_key_must_be_field() {
        let x = person();
        let chain = Expr::source("Person").apply(
            Method::OrderBy,
            vec![lambda(
                &x,
                Expr::New {
                    members: vec![("A".into(), Expr::parameter(&x).member("Age"))],
                },
            )],
        );
        let err = compile(&chain).unwrap_err();
        assert!(err.to_string().starts_with("OrderBy requires a selector"));
    }

    #[test]
    fn test_build_filter_only() {
        let x = person();
        let chain = Expr::source("Person").apply(
            Method::Where,
            vec![lambda(&x, Expr::parameter(&x).member("Age").less_than(Expr::constant(30)))],
        );
        let config = CompilerConfig::default();
        let model = translate(&chain, &config).unwrap();
        assert_eq!(
            build_filter(&model, &zoo_registry(), &config).unwrap(),
            Some(doc! { "age": { "$lt": 30 } })
        );
    }
}
