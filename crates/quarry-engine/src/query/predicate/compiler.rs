//! Predicate compiler.
//!
//! Walks a predicate body into a [`BoolNode`] tree, resolving every field
//! through the serialization info resolver and rendering literals with the
//! field's codec. The tree is folded into one fragment by the normalizer.
//!
//! Comparison dispatch, in order:
//!
//! | Left operand | Strategy |
//! |--------------|----------|
//! | `a % m` | `$mod` |
//! | `seq.Count`, `seq.Length`, `Count(seq)` | `$size` / positional `$exists` |
//! | `s.Length` | length pattern |
//! | `s.IndexOf(..)`, `s.IndexOfAny(..)` | position pattern |
//! | `s[i]` | character pattern |
//! | `s.ToLower()`, `s.Trim()`, ... | anchored equality pattern |
//! | `x.GetType()` | exact discriminator |
//! | boolean-valued predicate | the predicate, possibly negated |
//! | anything resolvable | relational operator |

use bson::Bson;
use quarry_common::types::Value;
use quarry_common::utils::error::{Error, Result, TranslationError};
use quarry_core::encoder;
use quarry_core::expr::{BinaryOp, Expr, Lambda, Method};
use quarry_core::resolver::{SerializationInfo, SerializationInfoResolver};
use quarry_core::serialization::{ClassRegistry, Codec};

use super::collection;
use super::fragment::{BoolNode, Fragment, compact_int};
use super::normalizer::fold;
use super::pattern::{self, IndexTarget, StringPredicate, StringTransform, Synthesized};
use crate::config::CompilerConfig;
use crate::query::discriminator::{self, Narrowing};

/// Compiles predicate expressions into filter fragments.
///
/// A compiler owns the resolver cache of one compilation.
pub struct PredicateCompiler<'a> {
    resolver: SerializationInfoResolver<'a>,
    config: &'a CompilerConfig,
}

impl<'a> PredicateCompiler<'a> {
    /// Creates a compiler reading `registry`.
    pub fn new(registry: &'a dyn ClassRegistry, config: &'a CompilerConfig) -> Self {
        Self {
            resolver: SerializationInfoResolver::new(registry),
            config,
        }
    }

    /// Returns the resolver, for callers resolving sort and distinct keys.
    pub fn resolver_mut(&mut self) -> &mut SerializationInfoResolver<'a> {
        &mut self.resolver
    }

    /// Compiles the body of a one-parameter predicate lambda.
    ///
    /// # Errors
    ///
    /// Returns a translation error for predicates without a filter rendering.
    pub fn compile_lambda(&mut self, predicate: &Lambda) -> Result<Fragment> {
        if predicate.single_parameter().is_none() {
            return Err(TranslationError::UnsupportedPredicate(predicate.to_string()).into());
        }
        self.compile(&predicate.body)
    }

    /// Compiles a boolean expression.
    ///
    /// # Errors
    ///
    /// Returns a translation error for predicates without a filter rendering.
    pub fn compile(&mut self, expr: &Expr) -> Result<Fragment> {
        Ok(fold(self.build(expr)?))
    }

    fn build(&mut self, expr: &Expr) -> Result<BoolNode> {
        match expr {
            Expr::Binary {
                op: BinaryOp::AndAlso | BinaryOp::And,
                left,
                right,
            } => Ok(BoolNode::and(self.build(left)?, self.build(right)?)),
            Expr::Binary {
                op: BinaryOp::OrElse | BinaryOp::Or,
                left,
                right,
            } => Ok(BoolNode::or(self.build(left)?, self.build(right)?)),
            Expr::Binary { op, left, right } if op.is_comparison() => {
                self.build_comparison(expr, *op, left, right)
            }
            Expr::Not { operand } => Ok(BoolNode::not(self.build(operand)?)),
            Expr::Constant {
                value: Value::Bool(b),
            } => Ok(BoolNode::leaf(if *b {
                Fragment::matches_all()
            } else {
                Fragment::matches_none()
            })),
            Expr::TypeIs { operand, ty } => {
                self.build_type_test(operand, ty.as_str(), Narrowing::Subtree)
            }
            Expr::Call {
                method,
                object,
                arguments,
            } => self.build_call(expr, method, object.as_deref(), arguments),
            Expr::Convert { operand, .. } if !is_field_access(operand) => self.build(operand),
            Expr::Member { .. } | Expr::Index { .. } | Expr::Convert { .. } => {
                let info = self.resolve_field(expr)?;
                if !info.codec.is_boolean() {
                    return Err(unsupported(expr));
                }
                Ok(BoolNode::leaf(Fragment::field(info.element_name(), true)))
            }
            _ => Err(unsupported(expr)),
        }
    }

    // === Comparisons ===

    fn build_comparison(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<BoolNode> {
        let (op, field, constant) = match (
            left.strip_convert().as_constant(),
            right.strip_convert().as_constant(),
        ) {
            (_, Some(value)) => (op, left, value),
            (Some(value), None) => (op.flip(), right, value),
            (None, None) => return Err(unsupported(expr)),
        };
        let target = field.strip_convert();

        match target {
            Expr::Binary {
                op: BinaryOp::Modulo,
                left: dividend,
                right: divisor,
            } => return self.build_modulo(expr, op, dividend, divisor, constant),
            Expr::Member { target: owner, name } if name == "Length" || name == "Count" => {
                if let Some(node) = self.try_build_length(expr, op, owner, constant)? {
                    return Ok(node);
                }
            }
            Expr::Call {
                method: Method::Count | Method::LongCount,
                object: None,
                arguments,
            } if arguments.len() == 1 => {
                let info = self.resolve_field(&arguments[0])?;
                return collection::size(&info, op, integer(constant)?);
            }
            Expr::Call {
                method: method @ (Method::IndexOf | Method::IndexOfAny),
                object: Some(object),
                arguments,
            } => return self.build_index_of(expr, op, method, object, arguments, constant),
            Expr::Index { target: owner, index } => {
                if let Some(node) = self.try_build_char_index(expr, op, owner, index, constant)? {
                    return Ok(node);
                }
            }
            Expr::Call {
                method,
                object: Some(_),
                ..
            } if method.is_string_transform() => {
                return self.build_transformed_equality(expr, op, target, constant);
            }
            Expr::Call {
                method: Method::GetType,
                object: Some(object),
                ..
            } => return self.build_get_type(expr, op, object, constant),
            _ => {}
        }

        if let Value::Bool(expected) = constant {
            if !is_field_access(target) {
                let keep = match op {
                    BinaryOp::Equal => *expected,
                    BinaryOp::NotEqual => !*expected,
                    _ => return Err(unsupported(expr)),
                };
                let inner = self.build(target)?;
                return Ok(if keep { inner } else { BoolNode::not(inner) });
            }
        }

        self.build_field_comparison(expr, op, field, constant)
    }

    fn build_field_comparison(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        field: &Expr,
        constant: &Value,
    ) -> Result<BoolNode> {
        let info = self.resolve_field(field)?;
        if info.element_path.is_root() {
            return Err(unsupported(expr));
        }
        let value = encoder::encode(&info.codec, constant)?;
        let path = info.element_name();
        let fragment = match op {
            BinaryOp::Equal if !matches!(value, Bson::RegularExpression(_)) => {
                Fragment::field(path, value)
            }
            BinaryOp::Equal => Fragment::operator(path, "$eq", value),
            BinaryOp::NotEqual => Fragment::operator(path, "$ne", value),
            BinaryOp::LessThan => Fragment::operator(path, "$lt", value),
            BinaryOp::LessThanOrEqual => Fragment::operator(path, "$lte", value),
            BinaryOp::GreaterThan => Fragment::operator(path, "$gt", value),
            BinaryOp::GreaterThanOrEqual => Fragment::operator(path, "$gte", value),
            _ => return Err(unsupported(expr)),
        };
        Ok(BoolNode::leaf(fragment))
    }

    fn build_modulo(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        dividend: &Expr,
        divisor: &Expr,
        remainder: &Value,
    ) -> Result<BoolNode> {
        let info = self.resolve_field(dividend)?;
        let divisor = divisor
            .strip_convert()
            .as_constant()
            .ok_or_else(|| unsupported(expr))
            .and_then(integer)?;
        if divisor == 0 {
            return Err(Error::InvalidValue("modulo by zero".to_string()));
        }
        let remainder = integer(remainder)?;
        let node = BoolNode::leaf(Fragment::operator(
            info.element_name(),
            "$mod",
            vec![compact_int(divisor), compact_int(remainder)],
        ));
        equality_only(expr, op, node)
    }

    fn try_build_length(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        owner: &Expr,
        constant: &Value,
    ) -> Result<Option<BoolNode>> {
        let (base, transforms) = peel_transforms(owner)?;
        let info = self.resolve_field(base)?;
        if info.codec.is_string() {
            let n = integer(constant)?;
            let (op, negated) = if op == BinaryOp::NotEqual {
                (BinaryOp::Equal, true)
            } else {
                (op, false)
            };
            let node = self.string_pattern(&info, &transforms, &StringPredicate::Length(op, n))?;
            return Ok(Some(if negated { BoolNode::not(node) } else { node }));
        }
        if !transforms.is_empty() {
            return Err(unsupported(expr));
        }
        if info.codec.item().is_some()
            || matches!(info.codec.unwrap_nullable(), Codec::Dictionary { .. })
        {
            return Ok(Some(collection::size(&info, op, integer(constant)?)?));
        }
        Ok(None)
    }

    fn build_index_of(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        method: &Method,
        object: &Expr,
        arguments: &[Expr],
        constant: &Value,
    ) -> Result<BoolNode> {
        let (base, transforms) = peel_transforms(object)?;
        let info = self.resolve_string(expr, base)?;
        let mut args = arguments.iter().map(|a| a.strip_convert().as_constant());
        let target = match (method, args.next().flatten()) {
            (Method::IndexOf, Some(Value::Char(c))) => IndexTarget::Char(*c),
            (Method::IndexOf, Some(Value::String(s))) => IndexTarget::Text(s.clone()),
            (Method::IndexOfAny, Some(value)) => {
                IndexTarget::AnyOf(char_set(value).ok_or_else(|| unsupported(expr))?)
            }
            _ => return Err(unsupported(expr)),
        };
        let start = args.next().flatten().map(integer).transpose()?;
        let count = args.next().flatten().map(integer).transpose()?;
        let predicate = StringPredicate::IndexOf {
            target,
            start,
            count,
            index: integer(constant)?,
        };
        let node = self.string_pattern(&info, &transforms, &predicate)?;
        equality_only(expr, op, node)
    }

    /// Compiles `s[i] == c` and `s[i] != c` on a string field.
    ///
    /// Both forms select only strings long enough to have position `i`, as
    /// indexing past the end has no value to compare. `!(s[i] == c)` is the
    /// complement of the equality instead and also selects shorter strings.
    fn try_build_char_index(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        owner: &Expr,
        index: &Expr,
        constant: &Value,
    ) -> Result<Option<BoolNode>> {
        let (base, transforms) = peel_transforms(owner)?;
        let info = self.resolve_field(base)?;
        if !info.codec.is_string() {
            if transforms.is_empty() {
                return Ok(None);
            }
            return Err(unsupported(expr));
        }
        let position = index
            .strip_convert()
            .as_constant()
            .ok_or_else(|| unsupported(expr))
            .and_then(integer)?;
        let ch = single_char(constant).ok_or_else(|| unsupported(expr))?;
        let equal = match op {
            BinaryOp::Equal => true,
            BinaryOp::NotEqual => false,
            _ => return Err(unsupported(expr)),
        };
        let predicate = StringPredicate::CharAt {
            index: position,
            ch,
            equal,
        };
        self.string_pattern(&info, &transforms, &predicate).map(Some)
    }

    fn build_transformed_equality(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        target: &Expr,
        constant: &Value,
    ) -> Result<BoolNode> {
        let (base, transforms) = peel_transforms(target)?;
        if constant.is_null() {
            return self.build_field_comparison(expr, op, base, constant);
        }
        let info = self.resolve_string(expr, base)?;
        let literal = match constant {
            Value::String(s) => s.clone(),
            Value::Char(c) => c.to_string(),
            _ => {
                let outermost = match target {
                    Expr::Call { method, .. } => method.name().to_string(),
                    other => other.to_string(),
                };
                return Err(TranslationError::NonStringComparand(outermost).into());
            }
        };
        let node = self.string_pattern(&info, &transforms, &StringPredicate::Equals(literal))?;
        equality_only(expr, op, node)
    }

    fn build_get_type(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        object: &Expr,
        constant: &Value,
    ) -> Result<BoolNode> {
        let target = constant.as_type().ok_or_else(|| unsupported(expr))?;
        let node = self.build_type_test(object, target.as_str(), Narrowing::Exact)?;
        equality_only(expr, op, node)
    }

    fn build_type_test(
        &mut self,
        operand: &Expr,
        target: &str,
        narrowing: Narrowing,
    ) -> Result<BoolNode> {
        let info = self.resolver.resolve(operand)?;
        let Some(nominal) = info.codec.document_class() else {
            return Err(unsupported(operand));
        };
        let fragment = discriminator::narrow(
            self.resolver.registry(),
            self.config,
            nominal.as_str(),
            target,
            &info.element_path,
            narrowing,
        )?;
        Ok(BoolNode::leaf(fragment))
    }

    // === Method calls ===

    fn build_call(
        &mut self,
        expr: &Expr,
        method: &Method,
        object: Option<&Expr>,
        arguments: &[Expr],
    ) -> Result<BoolNode> {
        let (receiver, rest) = match object {
            Some(object) => (Some(object), arguments),
            None => match arguments.split_first() {
                Some((first, rest)) => (Some(first), rest),
                None => (None, arguments),
            },
        };
        let Some(receiver) = receiver else {
            return Err(unsupported(expr));
        };
        let first_constant = rest.first().map(|a| a.strip_convert()).and_then(Expr::as_constant);

        match method {
            Method::StartsWith | Method::EndsWith if rest.len() == 1 => {
                let literal = string_literal(first_constant).ok_or_else(|| unsupported(expr))?;
                let predicate = if *method == Method::StartsWith {
                    StringPredicate::StartsWith(literal)
                } else {
                    StringPredicate::EndsWith(literal)
                };
                let (base, transforms) = peel_transforms(receiver)?;
                let info = self.resolve_string(expr, base)?;
                self.string_pattern(&info, &transforms, &predicate)
            }
            Method::Contains if rest.len() == 1 => self.build_contains(expr, receiver, &rest[0]),
            Method::In if rest.len() == 1 => {
                let values = array_literal(first_constant).ok_or_else(|| unsupported(expr))?;
                let info = self.resolve_field(receiver)?;
                Ok(BoolNode::leaf(collection::one_of(&info, values)?))
            }
            Method::ContainsAll | Method::ContainsAny if rest.len() == 1 => {
                let values = array_literal(first_constant).ok_or_else(|| unsupported(expr))?;
                let info = self.resolve_field(receiver)?;
                let fragment = if *method == Method::ContainsAll {
                    collection::contains_all(&info, values)?
                } else {
                    collection::contains_any(&info, values)?
                };
                Ok(BoolNode::leaf(fragment))
            }
            Method::ContainsKey if rest.len() == 1 => {
                let key = first_constant.ok_or_else(|| unsupported(expr))?;
                let info = self.resolve_field(receiver)?;
                Ok(BoolNode::leaf(collection::contains_key(&info, key)?))
            }
            Method::Any if rest.is_empty() => {
                let info = self.resolve_field(receiver)?;
                Ok(BoolNode::leaf(collection::not_empty(&info)?))
            }
            Method::Any if rest.len() == 1 => {
                let predicate = rest[0].as_lambda().ok_or_else(|| unsupported(expr))?;
                self.build_element_match(expr, receiver, predicate)
            }
            Method::Equals if rest.len() == 1 => {
                self.build_comparison(expr, BinaryOp::Equal, receiver, &rest[0])
            }
            Method::IsNullOrEmpty if rest.is_empty() => {
                let info = self.resolve_string(expr, receiver)?;
                let path = info.element_name();
                Ok(BoolNode::Or(vec![
                    BoolNode::leaf(Fragment::operator(path.clone(), "$type", 10)),
                    BoolNode::leaf(Fragment::field(path, "")),
                ]))
            }
            Method::IsMatch => self.build_is_match(expr, receiver, rest),
            Method::Inject if rest.is_empty() => match receiver.strip_convert().as_constant() {
                Some(Value::Document(document)) => {
                    Ok(BoolNode::leaf(Fragment::from_document(document.clone())))
                }
                _ => Err(unsupported(expr)),
            },
            _ => Err(unsupported(expr)),
        }
    }

    fn build_contains(&mut self, expr: &Expr, receiver: &Expr, item: &Expr) -> Result<BoolNode> {
        if let Some(values) = array_literal(receiver.strip_convert().as_constant()) {
            let info = self.resolve_field(item)?;
            return Ok(BoolNode::leaf(collection::one_of(&info, values)?));
        }
        let item = item.strip_convert().as_constant().ok_or_else(|| unsupported(expr))?;
        let (base, transforms) = peel_transforms(receiver)?;
        let info = self.resolve_field(base)?;
        if info.codec.is_string() {
            let literal = string_literal(Some(item)).ok_or_else(|| unsupported(expr))?;
            return self.string_pattern(&info, &transforms, &StringPredicate::Contains(literal));
        }
        if !transforms.is_empty() {
            return Err(unsupported(expr));
        }
        Ok(BoolNode::leaf(collection::contains(&info, item)?))
    }

    fn build_element_match(
        &mut self,
        expr: &Expr,
        source: &Expr,
        predicate: &Lambda,
    ) -> Result<BoolNode> {
        let parameter = predicate.single_parameter().ok_or_else(|| unsupported(expr))?;
        let info = self.resolve_field(source)?;
        let scope = collection::element_scope(&info, "Any")?;
        self.resolver.bind_parameter(parameter, scope);
        let inner = self.compile(&predicate.body);
        self.resolver.unbind_parameter(parameter);
        Ok(BoolNode::leaf(collection::element_match(&info, inner?)))
    }

    fn build_is_match(&mut self, expr: &Expr, receiver: &Expr, rest: &[Expr]) -> Result<BoolNode> {
        let constants: Vec<Option<&Value>> =
            rest.iter().map(|a| a.strip_convert().as_constant()).collect();
        // Regex instance: pattern.IsMatch(field)
        if let Some(Value::Regex { pattern, options }) = receiver.strip_convert().as_constant() {
            let [field] = rest else {
                return Err(unsupported(expr));
            };
            let info = self.resolve_string(expr, field)?;
            return Ok(BoolNode::leaf(Fragment::field(
                info.element_name(),
                encoder::regex(pattern, options),
            )));
        }
        // Static: IsMatch(field, pattern[, options])
        let (pattern, options) = match constants.as_slice() {
            [Some(Value::String(p))] => (p.clone(), String::new()),
            [Some(Value::Regex { pattern, options })] => (pattern.clone(), options.clone()),
            [Some(Value::String(p)), Some(Value::String(o))] => (p.clone(), o.clone()),
            _ => return Err(unsupported(expr)),
        };
        let info = self.resolve_string(expr, receiver)?;
        Ok(BoolNode::leaf(Fragment::field(
            info.element_name(),
            encoder::regex(&pattern, &options),
        )))
    }

    // === Helpers ===

    fn string_pattern(
        &self,
        info: &SerializationInfo,
        transforms: &[StringTransform],
        predicate: &StringPredicate,
    ) -> Result<BoolNode> {
        Ok(BoolNode::leaf(match pattern::synthesize(transforms, predicate)? {
            Synthesized::Match {
                pattern,
                case_insensitive,
            } => {
                let mut options = self.config.base_regex_options().to_string();
                if case_insensitive {
                    options.push('i');
                }
                Fragment::field(info.element_name(), encoder::regex(&pattern, &options))
            }
            Synthesized::Unsatisfiable => Fragment::matches_none(),
        }))
    }

    fn resolve_field(&mut self, expr: &Expr) -> Result<SerializationInfo> {
        self.resolver.resolve(expr)
    }

    fn resolve_string(&mut self, expr: &Expr, field: &Expr) -> Result<SerializationInfo> {
        let info = self.resolver.resolve(field)?;
        if info.codec.is_string() {
            Ok(info)
        } else {
            Err(unsupported(expr))
        }
    }
}

/// Splits `s.Trim().ToLower()` into `s` and its transforms, innermost first.
fn peel_transforms(expr: &Expr) -> Result<(&Expr, Vec<StringTransform>)> {
    let mut transforms = Vec::new();
    let mut current = expr.strip_convert();
    while let Expr::Call {
        method,
        object: Some(object),
        arguments,
    } = current
    {
        if !method.is_string_transform() {
            break;
        }
        let chars = trim_chars(method, arguments).ok_or_else(|| unsupported(current))?;
        let transform =
            StringTransform::from_method(method, chars).ok_or_else(|| unsupported(current))?;
        transforms.push(transform);
        current = object.strip_convert();
    }
    transforms.reverse();
    Ok((current, transforms))
}

/// Character arguments of a trim; `Some(None)` means whitespace.
fn trim_chars(method: &Method, arguments: &[Expr]) -> Option<Option<Vec<char>>> {
    if matches!(
        method,
        Method::ToLower | Method::ToUpper | Method::ToLowerInvariant | Method::ToUpperInvariant
    ) || arguments.is_empty()
    {
        return Some(None);
    }
    let mut chars = Vec::new();
    for argument in arguments {
        chars.extend(char_set(argument.strip_convert().as_constant()?)?);
    }
    Some(Some(chars))
}

fn char_set(value: &Value) -> Option<Vec<char>> {
    match value {
        Value::Char(c) => Some(vec![*c]),
        Value::String(s) => Some(s.chars().collect()),
        Value::Array(items) => items.iter().map(Value::as_char).collect(),
        _ => None,
    }
}

fn single_char(value: &Value) -> Option<char> {
    match value {
        Value::Char(c) => Some(*c),
        Value::String(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        }
        _ => None,
    }
}

fn string_literal(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Char(c) => Some(c.to_string()),
        _ => None,
    }
}

fn array_literal(value: Option<&Value>) -> Option<&[Value]> {
    value?.as_array()
}

fn integer(value: &Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| Error::InvalidValue(format!("expected an integer, found {value}")))
}

fn equality_only(expr: &Expr, op: BinaryOp, node: BoolNode) -> Result<BoolNode> {
    match op {
        BinaryOp::Equal => Ok(node),
        BinaryOp::NotEqual => Ok(BoolNode::not(node)),
        _ => Err(unsupported(expr)),
    }
}

fn is_field_access(expr: &Expr) -> bool {
    match expr {
        Expr::Member { .. } | Expr::Index { .. } | Expr::Parameter(_) => true,
        Expr::Call {
            method: Method::ElementAt,
            object: None,
            ..
        } => true,
        Expr::Convert { operand, .. } => is_field_access(operand),
        _ => false,
    }
}

fn unsupported(expr: &Expr) -> Error {
    TranslationError::UnsupportedPredicate(expr.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::{person, zoo_registry};
    use crate::test_support::matcher::matches;
    use bson::{Document, doc};
    use quarry_core::expr::Parameter;

    fn compile(body: Expr) -> Result<Document> {
        let registry = zoo_registry();
        let config = CompilerConfig::default();
        let mut compiler = PredicateCompiler::new(&registry, &config);
        compiler.compile(&body).map(Fragment::into_document)
    }

    fn p() -> Expr {
        Expr::parameter(&person())
    }

    fn re(pattern: &str, options: &str) -> Bson {
        encoder::regex(pattern, options)
    }

    // === Relational ===

    #[test]
    fn test_equality_renders_bare_value() {
        assert_eq!(
            compile(p().member("Age").equal(Expr::constant(30))).unwrap(),
            doc! { "age": 30 }
        );
        assert_eq!(
            compile(Expr::constant(30).less_than(p().member("Age"))).unwrap(),
            doc! { "age": { "$gt": 30 } }
        );
    }

    #[test]
    fn test_flat_conjunction_and_negation() {
        let both = p()
            .member("X")
            .equal(Expr::constant(1))
            .and_also(p().member("Y").equal(Expr::constant(11)));
        assert_eq!(compile(both.clone()).unwrap(), doc! { "X": 1, "Y": 11 });
        assert_eq!(
            compile(Expr::not(both)).unwrap(),
            doc! { "$nor": [{ "X": 1, "Y": 11 }] }
        );
    }

    #[test]
    fn test_same_field_promotes() {
        let body = p()
            .member("Age")
            .not_equal(Expr::constant(1))
            .and_also(p().member("Age").not_equal(Expr::constant(2)));
        assert_eq!(
            compile(body).unwrap(),
            doc! { "$and": [{ "age": { "$ne": 1 } }, { "age": { "$ne": 2 } }] }
        );
    }

    #[test]
    fn test_field_to_field_unsupported() {
        let err = compile(p().member("X").equal(p().member("Y"))).unwrap_err();
        assert!(matches!(
            err,
            Error::Translation(TranslationError::UnsupportedPredicate(_))
        ));
    }

    #[test]
    fn test_boolean_member_and_constants() {
        assert_eq!(compile(p().member("Active")).unwrap(), doc! { "active": true });
        assert_eq!(
            compile(Expr::not(p().member("Active"))).unwrap(),
            doc! { "active": { "$ne": true } }
        );
        assert_eq!(compile(Expr::constant(true)).unwrap(), doc! {});
        assert!(Fragment::from_document(compile(Expr::constant(false)).unwrap()).is_matches_none());
    }

    #[test]
    fn test_enum_rewrapping() {
        let body = p().member("Color").convert("Int32").equal(Expr::constant(2));
        assert_eq!(compile(body).unwrap(), doc! { "color": "Green" });
    }

    #[test]
    fn test_modulo() {
        let body = Expr::binary(BinaryOp::Modulo, p().member("Age"), Expr::constant(5))
            .equal(Expr::constant(1));
        assert_eq!(compile(body).unwrap(), doc! { "age": { "$mod": [5, 1] } });
    }

    // === Strings ===

    #[test]
    fn test_string_methods() {
        assert_eq!(
            compile(p().member("Name").call(Method::StartsWith, vec![Expr::constant("T")])).unwrap(),
            doc! { "name": re("^T", "s") }
        );
        assert_eq!(
            compile(p().member("Name").member("Length").equal(Expr::constant(3))).unwrap(),
            doc! { "name": re("^.{3}$", "s") }
        );
        assert_eq!(
            compile(
                p().member("Name")
                    .call(Method::ToLower, vec![])
                    .equal(Expr::constant("tom"))
            )
            .unwrap(),
            doc! { "name": re("^tom$", "is") }
        );
    }

    #[test]
    fn test_case_fold_contradiction() {
        let eq = p()
            .member("Name")
            .call(Method::ToLower, vec![])
            .equal(Expr::constant("Tom"));
        assert!(Fragment::from_document(compile(eq).unwrap()).is_matches_none());
        let ne = p()
            .member("Name")
            .call(Method::ToLower, vec![])
            .not_equal(Expr::constant("Tom"));
        assert_eq!(compile(ne).unwrap(), doc! {});
    }

    #[test]
    fn test_transform_needs_string_literal() {
        let err = compile(
            p().member("Name")
                .call(Method::ToUpper, vec![])
                .equal(Expr::constant(3)),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "When using ToUpper in a string comparison the value being compared to must serialize as a string."
        );
    }

    #[test]
    fn test_is_null_or_empty() {
        let body = Expr::static_call(Method::IsNullOrEmpty, vec![p().member("Name")]);
        assert_eq!(
            compile(body).unwrap(),
            doc! { "$or": [{ "name": { "$type": 10 } }, { "name": "" }] }
        );
    }

    #[test]
    fn test_char_index() {
        let body = p()
            .member("Name")
            .index(Expr::constant(1))
            .equal(Expr::constant('o'));
        assert_eq!(compile(body).unwrap(), doc! { "name": re("^.{1}o", "s") });
    }

    fn selects(body: Expr, names: &[&str]) -> Vec<bool> {
        let filter = compile(body).unwrap();
        names
            .iter()
            .map(|name| matches(&filter, &doc! { "name": *name }))
            .collect()
    }

    fn lower_name() -> Expr {
        p().member("Name").call(Method::ToLower, vec![])
    }

    #[test]
    fn test_case_fold_index_of_selection() {
        let index_of = |target: Expr, index: i32| {
            lower_name()
                .call(Method::IndexOf, vec![target])
                .equal(Expr::constant(index))
        };
        let names = ["banana", "BANANA", "xxa", "xxA", "aaa"];

        // An uppercase char never occurs after ToLower.
        assert_eq!(
            selects(index_of(Expr::constant('A'), -1), &names),
            [true, true, true, true, true]
        );
        assert_eq!(
            selects(index_of(Expr::constant('A'), 2), &names),
            [false, false, false, false, false]
        );
        assert_eq!(
            selects(index_of(Expr::constant('a'), 2), &names),
            [false, false, true, true, false]
        );
        assert_eq!(
            selects(index_of(Expr::constant('a'), -1), &["xyz", "XAY"]),
            [true, false]
        );
    }

    #[test]
    fn test_case_fold_index_of_any_drops_unreachable_chars() {
        let body = lower_name()
            .call(Method::IndexOfAny, vec![Expr::constant("Ab")])
            .equal(Expr::constant(1));
        assert_eq!(selects(body, &["xB", "Ab", "bb", "xa"]), [true, true, false, false]);

        let none_reachable = lower_name()
            .call(Method::IndexOfAny, vec![Expr::constant("AB")])
            .equal(Expr::constant(0));
        assert!(Fragment::from_document(compile(none_reachable).unwrap()).is_matches_none());
    }

    #[test]
    fn test_case_fold_char_index_selection() {
        let at_zero = |op: BinaryOp, ch: char| {
            Expr::binary(op, lower_name().index(Expr::constant(0)), Expr::constant(ch))
        };
        let names = ["apple", "Apple", "pear", ""];
        assert_eq!(
            selects(at_zero(BinaryOp::NotEqual, 'A'), &names),
            [true, true, true, false]
        );
        assert_eq!(
            selects(at_zero(BinaryOp::Equal, 'A'), &names),
            [false, false, false, false]
        );
        assert_eq!(
            selects(at_zero(BinaryOp::NotEqual, 'a'), &names),
            [false, false, true, false]
        );
        assert_eq!(
            selects(Expr::not(at_zero(BinaryOp::Equal, 'a')), &names),
            [false, false, true, true]
        );
    }

    // === Collections ===

    #[test]
    fn test_array_size_and_negation() {
        let body = p().member("Tags").member("Count").equal(Expr::constant(3));
        assert_eq!(compile(body.clone()).unwrap(), doc! { "tags": { "$size": 3 } });
        assert_eq!(
            compile(Expr::not(body)).unwrap(),
            doc! { "tags": { "$not": { "$size": 3 } } }
        );
    }

    #[test]
    fn test_membership() {
        let contains = p()
            .member("Tags")
            .call(Method::Contains, vec![Expr::constant("red")]);
        assert_eq!(compile(contains).unwrap(), doc! { "tags": "red" });

        let one_of = Expr::constant(vec![1, 2, 3]).call(Method::Contains, vec![p().member("Age")]);
        assert_eq!(compile(one_of.clone()).unwrap(), doc! { "age": { "$in": [1, 2, 3] } });
        assert_eq!(
            compile(Expr::not(one_of)).unwrap(),
            doc! { "age": { "$nin": [1, 2, 3] } }
        );
    }

    #[test]
    fn test_any_with_predicate() {
        let l = Parameter::new("l", "Line");
        let body = p().member("Lines").apply(
            Method::Any,
            vec![Expr::lambda(
                l.clone(),
                Expr::parameter(&l).member("Qty").greater_than(Expr::constant(2)),
            )],
        );
        assert_eq!(
            compile(body).unwrap(),
            doc! { "lines": { "$elemMatch": { "qty": { "$gt": 2 } } } }
        );

        let scalar = Parameter::new("t", "String");
        let err = compile(p().member("Tags").apply(
            Method::Any,
            vec![Expr::lambda(
                scalar.clone(),
                Expr::parameter(&scalar).equal(Expr::constant("a")),
            )],
        ))
        .unwrap_err();
        assert!(err.to_string().starts_with("Any is only supported for items"));
    }

    #[test]
    fn test_inject() {
        let body = Expr::static_call(
            Method::Inject,
            vec![Expr::constant(Value::Document(doc! { "$where": "true" }))],
        )
        .and_also(p().member("Age").equal(Expr::constant(3)));
        assert_eq!(compile(body).unwrap(), doc! { "$where": "true", "age": 3 });
    }

    // === Type tests ===

    #[test]
    fn test_type_is_and_get_type() {
        let a = Parameter::new("a", "Animal");
        let is_cat = Expr::parameter(&a).type_is("Cat");
        let registry = zoo_registry();
        let config = CompilerConfig::default();
        let mut compiler = PredicateCompiler::new(&registry, &config);
        assert_eq!(
            compiler.compile(&is_cat).unwrap().into_document(),
            doc! { "_t": "Cat" }
        );
        let exact = Expr::parameter(&a)
            .call(Method::GetType, vec![])
            .equal(Expr::constant(Value::Type("Cat".into())));
        assert_eq!(
            compiler.compile(&exact).unwrap().into_document(),
            doc! { "_t": "Cat", "_t.2": { "$exists": false } }
        );
    }
}
