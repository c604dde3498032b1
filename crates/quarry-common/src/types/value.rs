//! Compile-time literal values.
//!
//! A [`Value`] is the constant side of a comparison or the argument of a
//! predicate method. It carries just enough type information for the literal
//! encoder to render it through a field's codec: an enum keeps its ordinal and
//! name, a char stays a char, and so on.

use std::fmt;

use bson::oid::ObjectId;
use bson::{DateTime, Decimal128, Document};
use serde::{Deserialize, Serialize};

use super::TypeName;

/// A literal value appearing in an expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// The null reference.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 32-bit signed integer.
    Int32(i32),

    /// 64-bit signed integer.
    Int64(i64),

    /// 64-bit floating point.
    Double(f64),

    /// 128-bit decimal.
    Decimal128(Decimal128),

    /// UTF-8 string.
    String(String),

    /// A single character.
    Char(char),

    /// UTC timestamp with millisecond precision.
    DateTime(DateTime),

    /// A document identifier.
    ObjectId(ObjectId),

    /// Raw bytes.
    Binary(Vec<u8>),

    /// A regular expression with its option letters.
    Regex {
        /// The pattern source.
        pattern: String,
        /// Option letters (`i`, `m`, `s`, `x`).
        options: String,
    },

    /// A member of an enumeration.
    Enum {
        /// The enumeration's type name.
        type_name: TypeName,
        /// The member's declared name.
        name: String,
        /// The member's underlying integer value.
        ordinal: i64,
    },

    /// A type reference (`typeof(T)`).
    Type(TypeName),

    /// An ordered list of values (a local collection).
    Array(Vec<Value>),

    /// A raw document, passed through untouched.
    Document(Document),
}

impl Value {
    /// Returns a short name for the value's kind, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::Double(_) => "Double",
            Value::Decimal128(_) => "Decimal128",
            Value::String(_) => "String",
            Value::Char(_) => "Char",
            Value::DateTime(_) => "DateTime",
            Value::ObjectId(_) => "ObjectId",
            Value::Binary(_) => "Binary",
            Value::Regex { .. } => "Regex",
            Value::Enum { .. } => "Enum",
            Value::Type(_) => "Type",
            Value::Array(_) => "Array",
            Value::Document(_) => "Document",
        }
    }

    /// Returns `true` if this is the null value.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean payload, if any.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns an integral payload widened to `i64`.
    ///
    /// Enum members yield their ordinal.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(i) => Some(*i as i64),
            Value::Int64(i) => Some(*i),
            Value::Enum { ordinal, .. } => Some(*ordinal),
            _ => None,
        }
    }

    /// Returns the string payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the char payload, if any.
    #[must_use]
    pub const fn as_char(&self) -> Option<char> {
        match self {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    /// Returns the elements of a local collection, if any.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the referenced type of a `typeof` literal, if any.
    #[must_use]
    pub const fn as_type(&self) -> Option<&TypeName> {
        match self {
            Value::Type(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int32(i) => write!(f, "{i}"),
            Value::Int64(i) => write!(f, "{i}L"),
            Value::Double(d) => write!(f, "{d:?}"),
            Value::Decimal128(d) => write!(f, "{d:?}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Char(c) => write!(f, "{c:?}"),
            Value::DateTime(dt) => write!(f, "DateTime({})", dt.timestamp_millis()),
            Value::ObjectId(oid) => write!(f, "ObjectId(\"{oid}\")"),
            Value::Binary(bytes) => write!(f, "Binary({} bytes)", bytes.len()),
            Value::Regex { pattern, options } => write!(f, "/{pattern}/{options}"),
            Value::Enum {
                type_name, name, ..
            } => write!(f, "{type_name}.{name}"),
            Value::Type(t) => write!(f, "typeof({t})"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Document(doc) => write!(f, "{doc}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int32(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}
