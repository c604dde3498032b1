//! Boolean normalizer.
//!
//! Folds a [`BoolNode`] tree into a single fragment using the filter
//! language's algebra. Conjunctions flatten into one document while every
//! field is constrained once (or its operator maps combine); anything else is
//! promoted to an explicit `$and`. Negation substitutes operator complements
//! where one exists so the result still selects documents missing the field.

use bson::{Bson, Document};

use super::fragment::{BoolNode, Fragment};

/// Operators whose negation is expressed with `$not`.
const NOT_WRAPPABLE: &[&str] = &[
    "$gt",
    "$gte",
    "$lt",
    "$lte",
    "$all",
    "$size",
    "$elemMatch",
    "$mod",
    "$type",
];

/// Folds a boolean tree bottom-up.
#[must_use]
pub fn fold(node: BoolNode) -> Fragment {
    match node {
        BoolNode::Leaf(fragment) => fragment,
        BoolNode::And(children) => conjoin(children.into_iter().map(fold)),
        BoolNode::Or(children) => disjoin(children.into_iter().map(fold)),
        BoolNode::Not(child) => negate(fold(*child)),
    }
}

/// Conjoins fragments.
#[must_use]
pub fn conjoin(fragments: impl IntoIterator<Item = Fragment>) -> Fragment {
    let mut clauses: Vec<(String, Bson)> = Vec::new();
    for fragment in fragments {
        if fragment.is_matches_none() {
            return Fragment::matches_none();
        }
        for (key, value) in fragment.into_document() {
            if key == "$and" {
                if let Bson::Array(members) = value {
                    for member in members {
                        match member {
                            Bson::Document(d) => add_clauses(&mut clauses, d),
                            other => clauses.push(("$and".to_string(), Bson::Array(vec![other]))),
                        }
                    }
                    continue;
                }
                clauses.push((key, value));
                continue;
            }
            add_clause(&mut clauses, key, value);
        }
    }
    render_conjunction(clauses)
}

fn add_clauses(clauses: &mut Vec<(String, Bson)>, document: Document) {
    for (key, value) in document {
        add_clause(clauses, key, value);
    }
}

fn add_clause(clauses: &mut Vec<(String, Bson)>, key: String, value: Bson) {
    for (existing_key, existing) in clauses.iter_mut() {
        if *existing_key != key {
            continue;
        }
        if *existing == value {
            return;
        }
        if let Some(merged) = merge_conditions(existing, &value) {
            *existing = merged;
            return;
        }
    }
    clauses.push((key, value));
}

/// Combines two operator maps on one field when no operator repeats.
fn merge_conditions(existing: &Bson, incoming: &Bson) -> Option<Bson> {
    let (Bson::Document(left), Bson::Document(right)) = (existing, incoming) else {
        return None;
    };
    if !is_operator_map(left) || !is_operator_map(right) {
        return None;
    }
    if right.keys().any(|k| left.contains_key(k)) {
        return None;
    }
    let mut merged = left.clone();
    for (k, v) in right {
        merged.insert(k.clone(), v.clone());
    }
    Some(Bson::Document(merged))
}

fn render_conjunction(clauses: Vec<(String, Bson)>) -> Fragment {
    let distinct = {
        let mut seen = hashbrown::HashSet::new();
        clauses.iter().all(|(k, _)| seen.insert(k.as_str()))
    };
    if distinct {
        return Fragment::from_document(clauses.into_iter().collect());
    }
    let members: Vec<Bson> = clauses
        .into_iter()
        .map(|(k, v)| {
            let mut d = Document::new();
            d.insert(k, v);
            Bson::Document(d)
        })
        .collect();
    Fragment::field("$and", members)
}

/// Disjoins fragments.
#[must_use]
pub fn disjoin(fragments: impl IntoIterator<Item = Fragment>) -> Fragment {
    let mut members: Vec<Document> = Vec::new();
    for fragment in fragments {
        if fragment.is_matches_all() {
            return Fragment::matches_all();
        }
        if fragment.is_matches_none() {
            continue;
        }
        let mut document = fragment.into_document();
        let nested = match document.get("$or") {
            Some(Bson::Array(_)) if document.len() == 1 => document.remove("$or"),
            _ => None,
        };
        let alternatives = match nested {
            Some(Bson::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Bson::Document(d) => Some(d),
                    _ => None,
                })
                .collect(),
            _ => vec![document],
        };
        for alternative in alternatives {
            if !members.contains(&alternative) {
                members.push(alternative);
            }
        }
    }
    match members.len() {
        0 => Fragment::matches_none(),
        1 => Fragment::from_document(members.remove(0)),
        _ => Fragment::field(
            "$or",
            members.into_iter().map(Bson::Document).collect::<Vec<_>>(),
        ),
    }
}

/// Negates a fragment.
///
/// Applying this twice re-derives the original selection through the same
/// complement table rather than cancelling two wrappers.
#[must_use]
pub fn negate(fragment: Fragment) -> Fragment {
    if fragment.is_matches_all() {
        return Fragment::matches_none();
    }
    let document = fragment.into_document();
    let Some((key, value)) = single_element(&document).map(|(k, v)| (k.to_string(), v.clone()))
    else {
        return nor(document);
    };
    match (key.as_str(), value) {
        ("$or", Bson::Array(members)) => Fragment::field("$nor", members),
        ("$nor", Bson::Array(mut members)) => {
            if let [Bson::Document(_)] = members.as_slice() {
                if let Some(Bson::Document(only)) = members.pop() {
                    return Fragment::from_document(only);
                }
            }
            Fragment::field("$or", members)
        }
        (k, _) if k.starts_with('$') => nor(document),
        (field, Bson::RegularExpression(re)) => {
            Fragment::operator(field, "$not", Bson::RegularExpression(re))
        }
        (field, Bson::Document(condition)) if is_operator_map(&condition) => {
            negate_condition(field, &condition).unwrap_or_else(|| nor(document))
        }
        (field, bare) => Fragment::operator(field, "$ne", bare),
    }
}

fn negate_condition(field: &str, condition: &Document) -> Option<Fragment> {
    if is_regex_condition(condition) {
        let pattern = condition.get_str("$regex").ok()?;
        let options = condition.get_str("$options").unwrap_or_default();
        return Some(Fragment::operator(
            field,
            "$not",
            quarry_core::encoder::regex(pattern, options),
        ));
    }
    let (operator, operand) = single_element(condition)?;
    Some(match (operator, operand) {
        ("$eq", v) => Fragment::operator(field, "$ne", v.clone()),
        ("$ne", v) => Fragment::field(field, v.clone()),
        ("$in", v) => Fragment::operator(field, "$nin", v.clone()),
        ("$nin", v) => Fragment::operator(field, "$in", v.clone()),
        ("$exists", Bson::Boolean(b)) => Fragment::operator(field, "$exists", !b),
        ("$not", v) => Fragment::field(field, v.clone()),
        (op, _) if NOT_WRAPPABLE.contains(&op) => {
            Fragment::operator(field, "$not", Bson::Document(condition.clone()))
        }
        _ => return None,
    })
}

fn nor(document: Document) -> Fragment {
    Fragment::field("$nor", vec![Bson::Document(document)])
}

fn single_element(document: &Document) -> Option<(&str, &Bson)> {
    if document.len() == 1 {
        document.iter().next().map(|(k, v)| (k.as_str(), v))
    } else {
        None
    }
}

fn is_operator_map(document: &Document) -> bool {
    !document.is_empty() && document.keys().all(|k| k.starts_with('$'))
}

fn is_regex_condition(document: &Document) -> bool {
    document.contains_key("$regex") && document.keys().all(|k| k == "$regex" || k == "$options")
}
