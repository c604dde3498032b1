//! Unified value codec enumeration.
//!
//! A codec describes how one member is laid out on the wire. The compiler
//! never serializes whole objects; it asks the codec two questions: how to
//! render a literal compared against the member, and which translation
//! strategy applies to it (regex for strings, `$size` for sequences, key
//! paths for dictionaries, nested paths for documents).
//!
//! # Supported Codecs
//!
//! | Codec | Wire shape | Representation options |
//! |-------|------------|------------------------|
//! | Boolean | boolean | none |
//! | Int32 / Int64 / Double | number | Native, String, Int32, Int64, Double |
//! | Decimal128 | decimal128 | none |
//! | String | string | none |
//! | Char | int32 code point | Native, String |
//! | DateTime / ObjectId / Binary | matching BSON type | none |
//! | Enum | int32, int64 or name | Int32, Int64, String |
//! | Nullable | inner or null | inner's |
//! | Array | array of item | item's |
//! | Dictionary | document or array | Document, ArrayOfArrays, ArrayOfDocuments |
//! | Document | embedded document | the class map's |
//! | Raw | any | none |

use indexmap::IndexMap;
use quarry_common::types::TypeName;
use serde::{Deserialize, Serialize};

/// Wire representation of a scalar member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScalarRepresentation {
    /// The codec's natural BSON type.
    #[default]
    Native,
    /// Rendered as a decimal string.
    String,
    /// Rendered as a 32-bit integer.
    Int32,
    /// Rendered as a 64-bit integer.
    Int64,
    /// Rendered as a double.
    Double,
}

/// Wire representation of an enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnumRepresentation {
    /// The underlying value as a 32-bit integer.
    #[default]
    Int32,
    /// The underlying value as a 64-bit integer.
    Int64,
    /// The member's name.
    String,
}

/// Wire layout of a dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DictionaryRepresentation {
    /// An embedded document keyed by the dictionary keys.
    #[default]
    Document,
    /// An array of two-element `[key, value]` arrays.
    ArrayOfArrays,
    /// An array of `{k: key, v: value}` documents.
    ArrayOfDocuments,
}

impl DictionaryRepresentation {
    /// Returns the representation's name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Document => "Document",
            Self::ArrayOfArrays => "ArrayOfArrays",
            Self::ArrayOfDocuments => "ArrayOfDocuments",
        }
    }
}

/// Value codec identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Codec {
    /// Boolean values.
    Boolean,

    /// 32-bit integers.
    Int32 {
        /// Wire representation.
        #[serde(default)]
        representation: ScalarRepresentation,
    },

    /// 64-bit integers.
    Int64 {
        /// Wire representation.
        #[serde(default)]
        representation: ScalarRepresentation,
    },

    /// Doubles.
    Double {
        /// Wire representation.
        #[serde(default)]
        representation: ScalarRepresentation,
    },

    /// 128-bit decimals.
    Decimal128,

    /// Strings.
    String,

    /// Characters.
    Char {
        /// Wire representation: `Native` is the code point, `String` a one-character string.
        #[serde(default)]
        representation: ScalarRepresentation,
    },

    /// UTC timestamps.
    DateTime,

    /// Object identifiers.
    ObjectId,

    /// Raw bytes.
    Binary,

    /// Enumerations.
    Enum {
        /// The enumeration's type name.
        type_name: TypeName,
        /// Declared members and their underlying values.
        #[serde(default)]
        variants: IndexMap<String, i64>,
        /// Wire representation.
        #[serde(default)]
        representation: EnumRepresentation,
    },

    /// A nullable wrapper around another codec.
    Nullable {
        /// The wrapped codec.
        inner: Box<Codec>,
    },

    /// Sequences.
    Array {
        /// The element codec.
        item: Box<Codec>,
    },

    /// Dictionaries.
    Dictionary {
        /// The key codec.
        key: Box<Codec>,
        /// The value codec.
        value: Box<Codec>,
        /// Wire layout.
        #[serde(default)]
        representation: DictionaryRepresentation,
    },

    /// Embedded documents described by a class map.
    Document {
        /// The class name.
        class: TypeName,
    },

    /// Values passed through without a declared shape.
    Raw,
}

impl Codec {
    /// A native 32-bit integer codec.
    #[must_use]
    pub const fn int32() -> Self {
        Self::Int32 {
            representation: ScalarRepresentation::Native,
        }
    }

    /// A native 64-bit integer codec.
    #[must_use]
    pub const fn int64() -> Self {
        Self::Int64 {
            representation: ScalarRepresentation::Native,
        }
    }

    /// A native double codec.
    #[must_use]
    pub const fn double() -> Self {
        Self::Double {
            representation: ScalarRepresentation::Native,
        }
    }

    /// A sequence of `item`.
    #[must_use]
    pub fn array(item: Codec) -> Self {
        Self::Array {
            item: Box::new(item),
        }
    }

    /// A nullable `inner`.
    #[must_use]
    pub fn nullable(inner: Codec) -> Self {
        Self::Nullable {
            inner: Box::new(inner),
        }
    }

    /// An embedded document of `class`.
    pub fn document(class: impl Into<TypeName>) -> Self {
        Self::Document {
            class: class.into(),
        }
    }

    /// A dictionary with the given layout.
    #[must_use]
    pub fn dictionary(key: Codec, value: Codec, representation: DictionaryRepresentation) -> Self {
        Self::Dictionary {
            key: Box::new(key),
            value: Box::new(value),
            representation,
        }
    }

    /// Returns a human-readable name for the codec.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Boolean => "Boolean".to_string(),
            Self::Int32 { .. } => "Int32".to_string(),
            Self::Int64 { .. } => "Int64".to_string(),
            Self::Double { .. } => "Double".to_string(),
            Self::Decimal128 => "Decimal128".to_string(),
            Self::String => "String".to_string(),
            Self::Char { .. } => "Char".to_string(),
            Self::DateTime => "DateTime".to_string(),
            Self::ObjectId => "ObjectId".to_string(),
            Self::Binary => "Binary".to_string(),
            Self::Enum { type_name, .. } => type_name.to_string(),
            Self::Nullable { inner } => format!("Nullable<{}>", inner.name()),
            Self::Array { item } => format!("Array<{}>", item.name()),
            Self::Dictionary { key, value, .. } => {
                format!("Dictionary<{}, {}>", key.name(), value.name())
            }
            Self::Document { class } => class.to_string(),
            Self::Raw => "Raw".to_string(),
        }
    }

    /// Strips a nullable wrapper.
    #[must_use]
    pub fn unwrap_nullable(&self) -> &Codec {
        match self {
            Self::Nullable { inner } => inner.unwrap_nullable(),
            other => other,
        }
    }

    /// Returns the element codec of a sequence.
    #[must_use]
    pub fn item(&self) -> Option<&Codec> {
        match self.unwrap_nullable() {
            Self::Array { item } => Some(item),
            _ => None,
        }
    }

    /// Returns the class of an embedded document.
    #[must_use]
    pub fn document_class(&self) -> Option<&TypeName> {
        match self.unwrap_nullable() {
            Self::Document { class } => Some(class),
            _ => None,
        }
    }

    /// Returns `true` for string members (the regex strategy applies).
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self.unwrap_nullable(), Self::String)
    }

    /// Returns `true` for boolean members.
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        matches!(self.unwrap_nullable(), Self::Boolean)
    }

    /// Returns `true` for enumerations.
    #[must_use]
    pub fn is_enum(&self) -> bool {
        matches!(self.unwrap_nullable(), Self::Enum { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_names() {
        assert_eq!(Codec::int32().name(), "Int32");
        assert_eq!(Codec::array(Codec::String).name(), "Array<String>");
        assert_eq!(
            Codec::dictionary(
                Codec::String,
                Codec::int32(),
                DictionaryRepresentation::Document
            )
            .name(),
            "Dictionary<String, Int32>"
        );
        assert_eq!(Codec::nullable(Codec::int64()).name(), "Nullable<Int64>");
    }

    #[test]
    fn test_nullable_is_transparent() {
        let c = Codec::nullable(Codec::array(Codec::document("Item")));
        assert!(c.item().is_some());
        assert_eq!(
            c.item().and_then(Codec::document_class).map(TypeName::as_str),
            Some("Item")
        );
        assert!(Codec::nullable(Codec::String).is_string());
    }
}
