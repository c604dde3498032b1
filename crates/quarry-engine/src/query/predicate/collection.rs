//! Collection and dictionary operators.
//!
//! Every function takes the resolved info of the sequence or dictionary
//! member and chooses the operator form from its codec and representation.
//! Representation mismatches surface here, while the filter is built.

use bson::Bson;
use quarry_common::types::Value;
use quarry_common::utils::error::{Result, TranslationError};
use quarry_core::encoder;
use quarry_core::expr::BinaryOp;
use quarry_core::resolver::{ElementPath, SerializationInfo};
use quarry_core::serialization::{Codec, DictionaryRepresentation};

use super::fragment::{BoolNode, Fragment, compact_int};

/// `Any()`: the member exists, is not null, and has at least one element.
pub fn not_empty(info: &SerializationInfo) -> Result<Fragment> {
    require_sequence(info, "Any")?;
    let mut condition = bson::Document::new();
    condition.insert("$ne", Bson::Null);
    condition.insert("$not", bson::doc! { "$size": 0 });
    Ok(Fragment::field(info.element_name(), condition))
}

/// Returns the scope an element predicate is compiled in: the item's info,
/// re-rooted so paths inside `$elemMatch` are relative.
pub fn element_scope(info: &SerializationInfo, operator: &str) -> Result<SerializationInfo> {
    let item = info.item_info(operator)?;
    if item.codec.document_class().is_none() {
        return Err(TranslationError::OnlyForDocumentElements {
            operator: operator.to_string(),
            codec: item.codec.name(),
        }
        .into());
    }
    Ok(SerializationInfo {
        element_path: ElementPath::root(),
        ..item
    })
}

/// `Any(predicate)`: at least one element satisfies the compiled predicate.
#[must_use]
pub fn element_match(info: &SerializationInfo, predicate: Fragment) -> Fragment {
    Fragment::operator(
        info.element_name(),
        "$elemMatch",
        Bson::Document(predicate.into_document()),
    )
}

/// `seq.Contains(item)`: some element equals `item`.
pub fn contains(info: &SerializationInfo, item: &Value) -> Result<Fragment> {
    let item_info = info.item_info("Contains")?;
    let encoded = encoder::encode(&item_info.codec, item)?;
    Ok(Fragment::field(info.element_name(), encoded))
}

/// `In(field, values)` and `values.Contains(field)`: the member is one of `values`.
pub fn one_of(info: &SerializationInfo, values: &[Value]) -> Result<Fragment> {
    let encoded = encoder::encode_all(&info.codec, values)?;
    Ok(Fragment::operator(info.element_name(), "$in", encoded))
}

/// `ContainsAll(values)`: every value is an element.
pub fn contains_all(info: &SerializationInfo, values: &[Value]) -> Result<Fragment> {
    let item_info = info.item_info("ContainsAll")?;
    let encoded = encoder::encode_all(&item_info.codec, values)?;
    Ok(Fragment::operator(info.element_name(), "$all", encoded))
}

/// `ContainsAny(values)`: at least one value is an element.
pub fn contains_any(info: &SerializationInfo, values: &[Value]) -> Result<Fragment> {
    let item_info = info.item_info("ContainsAny")?;
    let encoded = encoder::encode_all(&item_info.codec, values)?;
    Ok(Fragment::operator(info.element_name(), "$in", encoded))
}

/// `ContainsKey(key)` on a dictionary member.
pub fn contains_key(info: &SerializationInfo, key: &Value) -> Result<Fragment> {
    let Codec::Dictionary {
        key: key_codec,
        representation,
        ..
    } = info.codec.unwrap_nullable()
    else {
        return Err(TranslationError::UnsupportedPredicate(format!(
            "ContainsKey on {}, which is not a dictionary",
            info.codec.name()
        ))
        .into());
    };
    match representation {
        DictionaryRepresentation::Document => {
            let segment = match key {
                Value::String(s) => s.clone(),
                other => match other.as_i64() {
                    Some(n) => n.to_string(),
                    None => {
                        return Err(TranslationError::ValueMismatch {
                            value: other.kind().to_string(),
                            codec: key_codec.name(),
                        }
                        .into());
                    }
                },
            };
            let path = info.element_path.child(segment);
            Ok(Fragment::operator(path.dotted(), "$exists", true))
        }
        DictionaryRepresentation::ArrayOfDocuments => {
            let encoded = encoder::encode(key_codec, key)?;
            Ok(Fragment::operator(
                info.element_name(),
                "$elemMatch",
                bson::doc! { "k": encoded },
            ))
        }
        DictionaryRepresentation::ArrayOfArrays => Err(TranslationError::UnsupportedRepresentation {
            operator: "ContainsKey".to_string(),
            supported: "Document or ArrayOfDocuments".to_string(),
            actual: representation.name().to_string(),
        }
        .into()),
    }
}

/// `seq.Count op n` / `seq.Length op n`.
///
/// Equality uses `$size`. Range tests check whether a given position
/// exists, since `$size` only matches exact lengths.
pub fn size(info: &SerializationInfo, op: BinaryOp, n: i64) -> Result<BoolNode> {
    require_sequence(info, "Count")?;
    let path = &info.element_path;
    let exists_at = |position: i64, exists: bool| {
        BoolNode::leaf(Fragment::operator(
            path.child(position.to_string()).dotted(),
            "$exists",
            exists,
        ))
    };
    let field_exists = || BoolNode::leaf(Fragment::operator(path.dotted(), "$exists", true));
    let none = || BoolNode::leaf(Fragment::matches_none());

    Ok(match op {
        BinaryOp::Equal | BinaryOp::NotEqual => {
            let equal = if n < 0 {
                none()
            } else {
                BoolNode::leaf(Fragment::operator(path.dotted(), "$size", compact_int(n)))
            };
            if op == BinaryOp::Equal {
                equal
            } else {
                BoolNode::not(equal)
            }
        }
        BinaryOp::GreaterThan if n < 0 => field_exists(),
        BinaryOp::GreaterThan => exists_at(n, true),
        BinaryOp::GreaterThanOrEqual if n <= 0 => field_exists(),
        BinaryOp::GreaterThanOrEqual => exists_at(n - 1, true),
        BinaryOp::LessThan if n <= 0 => none(),
        BinaryOp::LessThan => exists_at(n - 1, false),
        BinaryOp::LessThanOrEqual if n < 0 => none(),
        BinaryOp::LessThanOrEqual => exists_at(n, false),
        other => {
            return Err(TranslationError::UnsupportedPredicate(format!(
                "Count with the {} operator",
                other.symbol()
            ))
            .into());
        }
    })
}

/// Sequences and array-shaped dictionaries support positional operators.
fn require_sequence(info: &SerializationInfo, operator: &str) -> Result<()> {
    match info.codec.unwrap_nullable() {
        Codec::Array { .. } => Ok(()),
        Codec::Dictionary { representation, .. } => match representation {
            DictionaryRepresentation::ArrayOfArrays | DictionaryRepresentation::ArrayOfDocuments => {
                Ok(())
            }
            DictionaryRepresentation::Document => Err(TranslationError::UnsupportedRepresentation {
                operator: operator.to_string(),
                supported: "ArrayOfArrays or ArrayOfDocuments".to_string(),
                actual: representation.name().to_string(),
            }
            .into()),
        },
        other => Err(TranslationError::NotASequence {
            operator: operator.to_string(),
            codec: other.name(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::predicate::normalizer::fold;
    use bson::doc;
    use quarry_common::types::TypeName;

    fn info(path: &str, codec: Codec) -> SerializationInfo {
        SerializationInfo {
            element_path: ElementPath::parse(path),
            nominal_type: TypeName::new(codec.name()),
            codec,
        }
    }

    fn tags() -> SerializationInfo {
        info("tags", Codec::array(Codec::String))
    }

    fn size_doc(op: BinaryOp, n: i64) -> bson::Document {
        fold(size(&tags(), op, n).unwrap()).into_document()
    }

    #[test]
    fn test_not_empty() {
        assert_eq!(
            not_empty(&tags()).unwrap().as_document(),
            &doc! { "tags": { "$ne": null, "$not": { "$size": 0 } } }
        );
    }

    #[test]
    fn test_size_forms() {
        assert_eq!(size_doc(BinaryOp::Equal, 3), doc! { "tags": { "$size": 3 } });
        assert_eq!(
            size_doc(BinaryOp::NotEqual, 3),
            doc! { "tags": { "$not": { "$size": 3 } } }
        );
        assert_eq!(
            size_doc(BinaryOp::GreaterThan, 2),
            doc! { "tags.2": { "$exists": true } }
        );
        assert_eq!(
            size_doc(BinaryOp::GreaterThanOrEqual, 2),
            doc! { "tags.1": { "$exists": true } }
        );
        assert_eq!(
            size_doc(BinaryOp::GreaterThanOrEqual, 0),
            doc! { "tags": { "$exists": true } }
        );
        assert_eq!(
            size_doc(BinaryOp::LessThan, 2),
            doc! { "tags.1": { "$exists": false } }
        );
        assert_eq!(
            size_doc(BinaryOp::LessThanOrEqual, 2),
            doc! { "tags.2": { "$exists": false } }
        );
        assert!(Fragment::from_document(size_doc(BinaryOp::LessThan, 0)).is_matches_none());
    }

    #[test]
    fn test_membership_operators() {
        let values = [Value::from("a"), Value::from("b")];
        assert_eq!(
            contains_all(&tags(), &values).unwrap().as_document(),
            &doc! { "tags": { "$all": ["a", "b"] } }
        );
        assert_eq!(
            contains_any(&tags(), &values).unwrap().as_document(),
            &doc! { "tags": { "$in": ["a", "b"] } }
        );
        assert_eq!(
            contains(&tags(), &Value::from("a")).unwrap().as_document(),
            &doc! { "tags": "a" }
        );
        let age = info("age", Codec::int32());
        assert_eq!(
            one_of(&age, &[Value::Int32(1), Value::Int32(2)])
                .unwrap()
                .as_document(),
            &doc! { "age": { "$in": [1, 2] } }
        );
    }

    #[test]
    fn test_contains_key_by_representation() {
        let dict = |representation| {
            info(
                "attrs",
                Codec::dictionary(Codec::String, Codec::int32(), representation),
            )
        };
        let key = Value::from("color");
        assert_eq!(
            contains_key(&dict(DictionaryRepresentation::Document), &key)
                .unwrap()
                .as_document(),
            &doc! { "attrs.color": { "$exists": true } }
        );
        assert_eq!(
            contains_key(&dict(DictionaryRepresentation::ArrayOfDocuments), &key)
                .unwrap()
                .as_document(),
            &doc! { "attrs": { "$elemMatch": { "k": "color" } } }
        );
        let err = contains_key(&dict(DictionaryRepresentation::ArrayOfArrays), &key).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ContainsKey is only supported for representation Document or ArrayOfDocuments, not ArrayOfArrays."
        );
    }

    #[test]
    fn test_element_scope_requires_documents() {
        let lines = info("lines", Codec::array(Codec::document("Line")));
        let scope = element_scope(&lines, "Any").unwrap();
        assert!(scope.element_path.is_root());
        let err = element_scope(&tags(), "Any").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Any is only supported for items that serialize into documents, not String."
        );
    }
}
