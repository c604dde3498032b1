//! Serialization info resolution.
//!
//! Maps a field-access expression (member chains, sequence and dictionary
//! indexers, nested documents) to the element path and codec the compiler
//! needs. One resolver lives for one compilation: its cache is never shared
//! across queries.

mod path;

pub use path::ElementPath;

use hashbrown::HashMap;
use quarry_common::types::{TypeName, Value};
use quarry_common::utils::error::{Result, TranslationError};

use crate::expr::{Expr, Method, Parameter};
use crate::serialization::{Codec, ClassRegistry, DictionaryRepresentation};

/// What the compiler knows about one resolved field.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializationInfo {
    /// The wire path, relative to the innermost element scope.
    pub element_path: ElementPath,
    /// The declared type of the field.
    pub nominal_type: TypeName,
    /// The field's codec, representation options included.
    pub codec: Codec,
}

impl SerializationInfo {
    /// Info for a whole document of `class` at the scope root.
    pub fn root(class: impl Into<TypeName>) -> Self {
        let class = class.into();
        Self {
            element_path: ElementPath::root(),
            codec: Codec::Document {
                class: class.clone(),
            },
            nominal_type: class,
        }
    }

    /// Returns the dotted element name.
    #[must_use]
    pub fn element_name(&self) -> String {
        self.element_path.dotted()
    }

    /// Returns info for the elements of a sequence field.
    ///
    /// Element constraints address the sequence itself, so the path is kept.
    pub fn item_info(&self, operator: &str) -> Result<SerializationInfo> {
        match self.codec.item() {
            Some(item) => Ok(SerializationInfo {
                element_path: self.element_path.clone(),
                nominal_type: TypeName::new(item.name()),
                codec: item.clone(),
            }),
            None => Err(TranslationError::NotASequence {
                operator: operator.to_string(),
                codec: self.codec.name(),
            }
            .into()),
        }
    }
}

/// Resolves expressions to [`SerializationInfo`] against a class registry.
pub struct SerializationInfoResolver<'r> {
    registry: &'r dyn ClassRegistry,
    bindings: HashMap<String, SerializationInfo>,
    cache: HashMap<String, SerializationInfo>,
}

impl<'r> SerializationInfoResolver<'r> {
    /// Creates a resolver with an empty cache.
    pub fn new(registry: &'r dyn ClassRegistry) -> Self {
        Self {
            registry,
            bindings: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    /// Returns the registry this resolver reads.
    #[must_use]
    pub fn registry(&self) -> &'r dyn ClassRegistry {
        self.registry
    }

    /// Binds a lambda parameter to explicit info, as element lambdas do.
    ///
    /// Bindings change what parameter-rooted paths mean, so the cache is dropped.
    pub fn bind_parameter(&mut self, parameter: &Parameter, info: SerializationInfo) {
        self.bindings.insert(parameter.name.clone(), info);
        self.cache.clear();
    }

    /// Removes a parameter binding.
    pub fn unbind_parameter(&mut self, parameter: &Parameter) {
        if self.bindings.remove(&parameter.name).is_some() {
            self.cache.clear();
        }
    }

    /// Resolves a field-access expression.
    pub fn resolve(&mut self, expr: &Expr) -> Result<SerializationInfo> {
        let key = expr.to_string();
        if let Some(info) = self.cache.get(&key) {
            return Ok(info.clone());
        }
        let info = self.resolve_uncached(expr)?;
        tracing::trace!(expression = %key, path = %info.element_path, codec = %info.codec.name(), "resolved serialization info");
        self.cache.insert(key, info.clone());
        Ok(info)
    }

    fn resolve_uncached(&mut self, expr: &Expr) -> Result<SerializationInfo> {
        match expr {
            Expr::Parameter(p) => Ok(self
                .bindings
                .get(&p.name)
                .cloned()
                .unwrap_or_else(|| SerializationInfo::root(p.ty.clone()))),
            Expr::Member { target, name } => {
                let parent = self.resolve(target)?;
                self.resolve_member(&parent, name, expr)
            }
            Expr::Index { target, index } => {
                let parent = self.resolve(target)?;
                match index.as_constant() {
                    Some(key) => self.resolve_index(&parent, key, expr),
                    None => Err(unresolvable(expr)),
                }
            }
            Expr::Call {
                method: Method::ElementAt,
                object: None,
                arguments,
            } => match arguments.as_slice() {
                [source, Expr::Constant { value }] => {
                    let parent = self.resolve(source)?;
                    self.resolve_index(&parent, value, expr)
                }
                _ => Err(unresolvable(expr)),
            },
            Expr::Convert { operand, .. } => self.resolve(operand),
            _ => Err(unresolvable(expr)),
        }
    }

    fn resolve_member(
        &mut self,
        parent: &SerializationInfo,
        member: &str,
        expr: &Expr,
    ) -> Result<SerializationInfo> {
        let Some(class) = parent.codec.document_class() else {
            return Err(unresolvable(expr));
        };
        match self.registry.find_member(class.as_str(), member)? {
            Some(found) => Ok(SerializationInfo {
                element_path: parent.element_path.child(found.element_name),
                nominal_type: TypeName::new(found.codec.name()),
                codec: found.codec,
            }),
            None => Err(TranslationError::UnknownMember {
                class: class.to_string(),
                member: member.to_string(),
            }
            .into()),
        }
    }

    fn resolve_index(
        &mut self,
        parent: &SerializationInfo,
        key: &Value,
        expr: &Expr,
    ) -> Result<SerializationInfo> {
        match (parent.codec.unwrap_nullable(), key) {
            (Codec::Array { item }, Value::Int32(_) | Value::Int64(_)) => {
                let position = key.as_i64().unwrap_or_default();
                if position < 0 {
                    return Err(unresolvable(expr));
                }
                Ok(SerializationInfo {
                    element_path: parent.element_path.child(position.to_string()),
                    nominal_type: TypeName::new(item.name()),
                    codec: (**item).clone(),
                })
            }
            (
                Codec::Dictionary {
                    value,
                    representation,
                    ..
                },
                Value::String(k),
            ) => match representation {
                DictionaryRepresentation::Document => Ok(SerializationInfo {
                    element_path: parent.element_path.child(k.clone()),
                    nominal_type: TypeName::new(value.name()),
                    codec: (**value).clone(),
                }),
                other => Err(TranslationError::UnsupportedRepresentation {
                    operator: "Dictionary indexer".to_string(),
                    supported: DictionaryRepresentation::Document.name().to_string(),
                    actual: other.name().to_string(),
                }
                .into()),
            },
            _ => Err(unresolvable(expr)),
        }
    }
}

fn unresolvable(expr: &Expr) -> quarry_common::Error {
    TranslationError::Unresolvable(expr.to_string()).into()
}
