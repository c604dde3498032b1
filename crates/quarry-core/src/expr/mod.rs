//! The portable expression tree.
//!
//! A query arrives as an owned, acyclic [`Expr`]: the outer operator chain is
//! a nest of static [`Expr::Call`] nodes whose first argument is the source
//! they apply to, and predicates, key selectors, and projections appear as
//! [`Expr::Lambda`] arguments. Trees serialize with serde so front ends and
//! the CLI can hand them over as JSON.
//!
//! ```
//! use quarry_core::expr::{Expr, Method, Parameter};
//!
//! let x = Parameter::new("x", "Person");
//! let chain = Expr::source("Person").apply(
//!     Method::Where,
//!     vec![Expr::lambda(
//!         x.clone(),
//!         Expr::parameter(&x).member("Age").greater_than(Expr::constant(21)),
//!     )],
//! );
//! assert_eq!(chain.to_string(), "Queryable<Person>.Where(x => (x.Age > 21))");
//! ```

mod format;
mod method;

pub use method::Method;

use quarry_common::types::{TypeName, Value};
use serde::{Deserialize, Serialize};

/// A lambda parameter with its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name, unique within its lambda.
    pub name: String,
    /// Declared type of the parameter.
    pub ty: TypeName,
}

impl Parameter {
    /// Creates a parameter.
    pub fn new(name: impl Into<String>, ty: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// A lambda: parameters plus a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    /// The declared parameters, in order.
    pub parameters: Vec<Parameter>,
    /// The body expression.
    pub body: Box<Expr>,
}

impl Lambda {
    /// Returns the single parameter of a one-argument lambda.
    #[must_use]
    pub fn single_parameter(&self) -> Option<&Parameter> {
        match self.parameters.as_slice() {
            [p] => Some(p),
            _ => None,
        }
    }

    /// Returns `true` for `x => x`.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        match (self.single_parameter(), self.body.as_ref()) {
            (Some(p), Expr::Parameter(q)) => p.name == q.name,
            _ => false,
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// Short-circuit `&&`.
    AndAlso,
    /// Short-circuit `||`.
    OrElse,
    /// Non-short-circuit `&`.
    And,
    /// Non-short-circuit `|`.
    Or,
    /// `^`
    ExclusiveOr,
    /// `%`
    Modulo,
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
}

impl BinaryOp {
    /// Returns the operator's source symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::AndAlso => "&&",
            Self::OrElse => "||",
            Self::And => "&",
            Self::Or => "|",
            Self::ExclusiveOr => "^",
            Self::Modulo => "%",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }

    /// Returns `true` for the six relational operators.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::LessThan
                | Self::LessThanOrEqual
                | Self::GreaterThan
                | Self::GreaterThanOrEqual
        )
    }

    /// Returns the operator with its operands swapped (`a < b` is `b > a`).
    ///
    /// Non-relational operators are returned unchanged.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::LessThan => Self::GreaterThan,
            Self::LessThanOrEqual => Self::GreaterThanOrEqual,
            Self::GreaterThan => Self::LessThan,
            Self::GreaterThanOrEqual => Self::LessThanOrEqual,
            other => other,
        }
    }
}

/// A node of the expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    /// The queryable collection the chain starts from.
    Source {
        /// The document type stored in the collection.
        document_type: TypeName,
    },

    /// A reference to a lambda parameter.
    Parameter(Parameter),

    /// A lambda (predicate, key selector, or projection).
    Lambda(Lambda),

    /// A literal.
    Constant {
        /// The literal value.
        value: Value,
    },

    /// Field or property access.
    Member {
        /// The object being accessed.
        target: Box<Expr>,
        /// The member name.
        name: String,
    },

    /// Indexer access (`a[i]`, `d["k"]`, `s[i]`).
    Index {
        /// The indexed object.
        target: Box<Expr>,
        /// The index expression.
        index: Box<Expr>,
    },

    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },

    /// Logical negation.
    Not {
        /// The negated operand.
        operand: Box<Expr>,
    },

    /// A type conversion (casts, enum-to-integer, nullable lifting).
    Convert {
        /// The converted operand.
        operand: Box<Expr>,
        /// The target type.
        ty: TypeName,
    },

    /// A runtime type test (`x is T`).
    TypeIs {
        /// The tested operand.
        operand: Box<Expr>,
        /// The tested type.
        ty: TypeName,
    },

    /// A method call. Static and extension calls have no `object`.
    Call {
        /// The method.
        method: Method,
        /// The receiver of an instance call.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        object: Option<Box<Expr>>,
        /// The arguments.
        #[serde(default)]
        arguments: Vec<Expr>,
    },

    /// An object construction (`new { A = x.A, B = x.B }`).
    New {
        /// Member names paired with their initializers.
        members: Vec<(String, Expr)>,
    },
}

impl Expr {
    /// Creates a source node for a collection of `document_type`.
    pub fn source(document_type: impl Into<TypeName>) -> Self {
        Expr::Source {
            document_type: document_type.into(),
        }
    }

    /// Creates a parameter reference.
    #[must_use]
    pub fn parameter(p: &Parameter) -> Self {
        Expr::Parameter(p.clone())
    }

    /// Creates a single-parameter lambda.
    #[must_use]
    pub fn lambda(parameter: Parameter, body: Expr) -> Self {
        Expr::Lambda(Lambda {
            parameters: vec![parameter],
            body: Box::new(body),
        })
    }

    /// Creates a literal.
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant {
            value: value.into(),
        }
    }

    /// Creates a binary node.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Creates a logical negation.
    #[must_use]
    pub fn not(operand: Expr) -> Self {
        Expr::Not {
            operand: Box::new(operand),
        }
    }

    /// Creates a static or extension call.
    #[must_use]
    pub fn static_call(method: Method, arguments: Vec<Expr>) -> Self {
        Expr::Call {
            method,
            object: None,
            arguments,
        }
    }

    /// Applies an operator to this expression as its source.
    ///
    /// `source.apply(Where, [pred])` is the call `Where(source, pred)`.
    #[must_use]
    pub fn apply(self, method: Method, arguments: Vec<Expr>) -> Self {
        let mut all = Vec::with_capacity(arguments.len() + 1);
        all.push(self);
        all.extend(arguments);
        Expr::static_call(method, all)
    }

    /// Calls an instance method on this expression.
    #[must_use]
    pub fn call(self, method: Method, arguments: Vec<Expr>) -> Self {
        Expr::Call {
            method,
            object: Some(Box::new(self)),
            arguments,
        }
    }

    /// Accesses a member of this expression.
    #[must_use]
    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member {
            target: Box::new(self),
            name: name.into(),
        }
    }

    /// Indexes this expression.
    #[must_use]
    pub fn index(self, index: Expr) -> Self {
        Expr::Index {
            target: Box::new(self),
            index: Box::new(index),
        }
    }

    /// Converts this expression to another type.
    #[must_use]
    pub fn convert(self, ty: impl Into<TypeName>) -> Self {
        Expr::Convert {
            operand: Box::new(self),
            ty: ty.into(),
        }
    }

    /// Tests this expression's runtime type.
    #[must_use]
    pub fn type_is(self, ty: impl Into<TypeName>) -> Self {
        Expr::TypeIs {
            operand: Box::new(self),
            ty: ty.into(),
        }
    }

    /// `self == other`
    #[must_use]
    pub fn equal(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Equal, self, other)
    }

    /// `self != other`
    #[must_use]
    pub fn not_equal(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::NotEqual, self, other)
    }

    /// `self < other`
    #[must_use]
    pub fn less_than(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::LessThan, self, other)
    }

    /// `self <= other`
    #[must_use]
    pub fn less_or_equal(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::LessThanOrEqual, self, other)
    }

    /// `self > other`
    #[must_use]
    pub fn greater_than(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::GreaterThan, self, other)
    }

    /// `self >= other`
    #[must_use]
    pub fn greater_or_equal(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::GreaterThanOrEqual, self, other)
    }

    /// `self && other`
    #[must_use]
    pub fn and_also(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::AndAlso, self, other)
    }

    /// `self || other`
    #[must_use]
    pub fn or_else(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::OrElse, self, other)
    }

    /// Returns the literal if this is a constant.
    #[must_use]
    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Expr::Constant { value } => Some(value),
            _ => None,
        }
    }

    /// Returns the lambda if this is one.
    #[must_use]
    pub fn as_lambda(&self) -> Option<&Lambda> {
        match self {
            Expr::Lambda(lambda) => Some(lambda),
            _ => None,
        }
    }

    /// Strips any number of enclosing conversions.
    #[must_use]
    pub fn strip_convert(&self) -> &Expr {
        let mut expr = self;
        while let Expr::Convert { operand, .. } = expr {
            expr = operand;
        }
        expr
    }

    /// Returns the nesting depth of the tree (a leaf has depth 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        let children = match self {
            Expr::Source { .. } | Expr::Parameter(_) | Expr::Constant { .. } => 0,
            Expr::Lambda(lambda) => lambda.body.depth(),
            Expr::Member { target, .. } => target.depth(),
            Expr::Index { target, index } => target.depth().max(index.depth()),
            Expr::Binary { left, right, .. } => left.depth().max(right.depth()),
            Expr::Not { operand }
            | Expr::Convert { operand, .. }
            | Expr::TypeIs { operand, .. } => operand.depth(),
            Expr::Call {
                object, arguments, ..
            } => object
                .iter()
                .map(|o| o.depth())
                .chain(arguments.iter().map(Expr::depth))
                .max()
                .unwrap_or(0),
            Expr::New { members } => members.iter().map(|(_, e)| e.depth()).max().unwrap_or(0),
        };
        children + 1
    }

    /// Returns a copy with every reference to the parameter `from` replaced by `to`.
    ///
    /// Nested lambdas that redeclare `from` shadow it and are left alone.
    #[must_use]
    pub fn replace_parameter(&self, from: &str, to: &Parameter) -> Expr {
        let recurse = |e: &Expr| Box::new(e.replace_parameter(from, to));
        match self {
            Expr::Parameter(p) if p.name == from => Expr::Parameter(to.clone()),
            Expr::Source { .. } | Expr::Parameter(_) | Expr::Constant { .. } => self.clone(),
            Expr::Lambda(lambda) => {
                if lambda.parameters.iter().any(|p| p.name == from) {
                    self.clone()
                } else {
                    Expr::Lambda(Lambda {
                        parameters: lambda.parameters.clone(),
                        body: recurse(&lambda.body),
                    })
                }
            }
            Expr::Member { target, name } => Expr::Member {
                target: recurse(target),
                name: name.clone(),
            },
            Expr::Index { target, index } => Expr::Index {
                target: recurse(target),
                index: recurse(index),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: recurse(left),
                right: recurse(right),
            },
            Expr::Not { operand } => Expr::Not {
                operand: recurse(operand),
            },
            Expr::Convert { operand, ty } => Expr::Convert {
                operand: recurse(operand),
                ty: ty.clone(),
            },
            Expr::TypeIs { operand, ty } => Expr::TypeIs {
                operand: recurse(operand),
                ty: ty.clone(),
            },
            Expr::Call {
                method,
                object,
                arguments,
            } => Expr::Call {
                method: method.clone(),
                object: object.as_deref().map(recurse),
                arguments: arguments
                    .iter()
                    .map(|a| a.replace_parameter(from, to))
                    .collect(),
            },
            Expr::New { members } => Expr::New {
                members: members
                    .iter()
                    .map(|(n, e)| (n.clone(), e.replace_parameter(from, to)))
                    .collect(),
            },
        }
    }
}
