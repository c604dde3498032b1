//! The translator entry point.

use std::sync::Arc;

use bson::Document;
use quarry_common::utils::error::Result;
use quarry_core::expr::Expr;
use quarry_core::serialization::ClassRegistry;

use crate::config::CompilerConfig;
use crate::query::{CompiledQuery, QueryModel, assemble, build_filter, translate};

/// Translates operator chains into query models and compiled documents.
///
/// A translator is cheap to clone and safe to share: the registry is
/// read-only and every compilation owns its own resolver cache.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use quarry_core::expr::{Expr, Method, Parameter};
/// use quarry_core::serialization::{ClassMap, Codec, InMemoryRegistry};
/// use quarry_engine::QueryTranslator;
///
/// let registry = InMemoryRegistry::from_class_maps([
///     ClassMap::new("Person").map_member("Age", "age", Codec::int32()),
/// ]);
/// let translator = QueryTranslator::new(Arc::new(registry));
///
/// let x = Parameter::new("x", "Person");
/// let chain = Expr::source("Person").apply(
///     Method::Where,
///     vec![Expr::lambda(
///         x.clone(),
///         Expr::parameter(&x).member("Age").greater_than(Expr::constant(21)),
///     )],
/// );
/// let filter = translator.compile_chain(&chain).unwrap().filter.unwrap();
/// assert_eq!(filter, bson::doc! { "age": { "$gt": 21 } });
/// ```
#[derive(Clone)]
pub struct QueryTranslator {
    registry: Arc<dyn ClassRegistry>,
    config: CompilerConfig,
}

impl QueryTranslator {
    /// Creates a translator with the default configuration.
    #[must_use]
    pub fn new(registry: Arc<dyn ClassRegistry>) -> Self {
        Self::with_config(registry, CompilerConfig::default())
    }

    /// Creates a translator with an explicit configuration.
    #[must_use]
    pub fn with_config(registry: Arc<dyn ClassRegistry>, config: CompilerConfig) -> Self {
        Self { registry, config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Returns the class registry.
    #[must_use]
    pub fn registry(&self) -> &dyn ClassRegistry {
        self.registry.as_ref()
    }

    /// Builds the query model of an operator chain.
    ///
    /// The registry is not consulted, so only structural errors are raised.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain uses an unsupported operator or ordering.
    pub fn translate(&self, chain: &Expr) -> Result<QueryModel> {
        translate(chain, &self.config)
    }

    /// Renders the filter of a model; `None` selects everything.
    ///
    /// # Errors
    ///
    /// Returns an error if the predicate cannot be rendered.
    pub fn build_filter(&self, model: &QueryModel) -> Result<Option<Document>> {
        build_filter(model, self.registry.as_ref(), &self.config)
    }

    /// Renders every part of a model.
    ///
    /// # Errors
    ///
    /// Returns an error if a field or predicate cannot be rendered.
    pub fn compile(&self, model: &QueryModel) -> Result<CompiledQuery> {
        assemble(model, self.registry.as_ref(), &self.config)
    }

    /// Builds and renders an operator chain in one step.
    ///
    /// # Errors
    ///
    /// Returns the first structural or translation error.
    pub fn compile_chain(&self, chain: &Expr) -> Result<CompiledQuery> {
        let model = self.translate(chain)?;
        self.compile(&model)
    }
}

impl std::fmt::Debug for QueryTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryTranslator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
