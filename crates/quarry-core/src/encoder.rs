//! Literal rendering through a field's codec.
//!
//! Every constant that lands in a filter goes through [`encode`] with the
//! codec of the field it is compared against, so a string-represented integer
//! compares as a string and an enum stored by name compares by name.

use bson::spec::BinarySubtype;
use bson::{Binary, Bson, Regex};
use quarry_common::types::Value;
use quarry_common::utils::error::{Error, Result, TranslationError};

use crate::serialization::{Codec, EnumRepresentation, ScalarRepresentation};

/// Encodes `value` as `codec` would serialize it.
pub fn encode(codec: &Codec, value: &Value) -> Result<Bson> {
    if value.is_null() {
        return Ok(Bson::Null);
    }
    match codec {
        Codec::Nullable { inner } => encode(inner, value),
        Codec::Boolean => match value {
            Value::Bool(b) => Ok(Bson::Boolean(*b)),
            _ => Err(mismatch(codec, value)),
        },
        Codec::Int32 { representation } | Codec::Int64 { representation } => {
            let Some(n) = value.as_i64() else {
                return Err(mismatch(codec, value));
            };
            let native = if matches!(codec, Codec::Int32 { .. }) {
                ScalarRepresentation::Int32
            } else {
                ScalarRepresentation::Int64
            };
            render_integer(n, resolve_native(*representation, native), codec, value)
        }
        Codec::Double { representation } => {
            let d = match value {
                Value::Double(d) => *d,
                other => match other.as_i64() {
                    Some(n) => n as f64,
                    None => return Err(mismatch(codec, value)),
                },
            };
            Ok(match resolve_native(*representation, ScalarRepresentation::Double) {
                ScalarRepresentation::String => Bson::String(d.to_string()),
                ScalarRepresentation::Int32 => Bson::Int32(d as i32),
                ScalarRepresentation::Int64 => Bson::Int64(d as i64),
                _ => Bson::Double(d),
            })
        }
        Codec::Decimal128 => match value {
            Value::Decimal128(d) => Ok(Bson::Decimal128(*d)),
            _ => Err(mismatch(codec, value)),
        },
        Codec::String => match value {
            Value::String(s) => Ok(Bson::String(s.clone())),
            Value::Char(c) => Ok(Bson::String(c.to_string())),
            _ => Err(mismatch(codec, value)),
        },
        Codec::Char { representation } => {
            let c = match value {
                Value::Char(c) => *c,
                other => other
                    .as_i64()
                    .and_then(|n| u32::try_from(n).ok())
                    .and_then(char::from_u32)
                    .ok_or_else(|| mismatch(codec, value))?,
            };
            Ok(match representation {
                ScalarRepresentation::String => Bson::String(c.to_string()),
                ScalarRepresentation::Int64 => Bson::Int64(i64::from(u32::from(c))),
                _ => Bson::Int32(u32::from(c) as i32),
            })
        }
        Codec::DateTime => match value {
            Value::DateTime(dt) => Ok(Bson::DateTime(*dt)),
            _ => Err(mismatch(codec, value)),
        },
        Codec::ObjectId => match value {
            Value::ObjectId(oid) => Ok(Bson::ObjectId(*oid)),
            Value::String(s) => bson::oid::ObjectId::parse_str(s)
                .map(Bson::ObjectId)
                .map_err(|e| Error::InvalidValue(format!("'{s}' is not an ObjectId: {e}"))),
            _ => Err(mismatch(codec, value)),
        },
        Codec::Binary => match value {
            Value::Binary(bytes) => Ok(Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: bytes.clone(),
            })),
            _ => Err(mismatch(codec, value)),
        },
        Codec::Enum {
            variants,
            representation,
            ..
        } => {
            let (name, ordinal) = match value {
                Value::Enum { name, ordinal, .. } => (Some(name.clone()), *ordinal),
                Value::String(s) if *representation == EnumRepresentation::String => {
                    return Ok(Bson::String(s.clone()));
                }
                other => match other.as_i64() {
                    // An integer compared against an enum member is re-wrapped
                    // as the enum it was converted from.
                    Some(n) => (
                        variants
                            .iter()
                            .find(|(_, v)| **v == n)
                            .map(|(k, _)| k.clone()),
                        n,
                    ),
                    None => return Err(mismatch(codec, value)),
                },
            };
            Ok(match representation {
                EnumRepresentation::Int32 => Bson::Int32(ordinal as i32),
                EnumRepresentation::Int64 => Bson::Int64(ordinal),
                EnumRepresentation::String => {
                    Bson::String(name.unwrap_or_else(|| ordinal.to_string()))
                }
            })
        }
        Codec::Array { item } => match value {
            Value::Array(items) => Ok(Bson::Array(encode_all(item, items)?)),
            _ => Err(mismatch(codec, value)),
        },
        Codec::Dictionary { .. } | Codec::Document { .. } => match value {
            Value::Document(doc) => Ok(Bson::Document(doc.clone())),
            _ => Err(mismatch(codec, value)),
        },
        Codec::Raw => Ok(to_raw_bson(value)),
    }
}

/// Encodes each value with the same codec.
pub fn encode_all(codec: &Codec, values: &[Value]) -> Result<Vec<Bson>> {
    values.iter().map(|v| encode(codec, v)).collect()
}

/// Converts a value without a declared codec.
#[must_use]
pub fn to_raw_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Int32(i) => Bson::Int32(*i),
        Value::Int64(i) => Bson::Int64(*i),
        Value::Double(d) => Bson::Double(*d),
        Value::Decimal128(d) => Bson::Decimal128(*d),
        Value::String(s) => Bson::String(s.clone()),
        Value::Char(c) => Bson::String(c.to_string()),
        Value::DateTime(dt) => Bson::DateTime(*dt),
        Value::ObjectId(oid) => Bson::ObjectId(*oid),
        Value::Binary(bytes) => Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: bytes.clone(),
        }),
        Value::Regex { pattern, options } => regex(pattern, options),
        Value::Enum { ordinal, .. } => match i32::try_from(*ordinal) {
            Ok(i) => Bson::Int32(i),
            Err(_) => Bson::Int64(*ordinal),
        },
        Value::Type(t) => Bson::String(t.to_string()),
        Value::Array(items) => Bson::Array(items.iter().map(to_raw_bson).collect()),
        Value::Document(doc) => Bson::Document(doc.clone()),
    }
}

/// Builds a regular expression value with its options in canonical order.
#[must_use]
pub fn regex(pattern: &str, options: &str) -> Bson {
    let mut letters: Vec<char> = options.chars().collect();
    letters.sort_unstable();
    letters.dedup();
    Bson::RegularExpression(Regex {
        pattern: pattern.to_string(),
        options: letters.into_iter().collect(),
    })
}

fn resolve_native(
    representation: ScalarRepresentation,
    native: ScalarRepresentation,
) -> ScalarRepresentation {
    match representation {
        ScalarRepresentation::Native => native,
        other => other,
    }
}

fn render_integer(
    n: i64,
    representation: ScalarRepresentation,
    codec: &Codec,
    value: &Value,
) -> Result<Bson> {
    Ok(match representation {
        ScalarRepresentation::Int32 => {
            Bson::Int32(i32::try_from(n).map_err(|_| mismatch(codec, value))?)
        }
        ScalarRepresentation::Double => Bson::Double(n as f64),
        ScalarRepresentation::String => Bson::String(n.to_string()),
        _ => Bson::Int64(n),
    })
}

fn mismatch(codec: &Codec, value: &Value) -> Error {
    TranslationError::ValueMismatch {
        value: value.kind().to_string(),
        codec: codec.name(),
    }
    .into()
}
