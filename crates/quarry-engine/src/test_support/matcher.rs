//! A small evaluator for compiled filter documents.
//!
//! Implements the query operators the compiler emits with the server's
//! semantics for missing fields and array traversal, so tests can check
//! which documents a filter selects. Patterns run on the `regex` crate, which
//! has no lookaround; a pattern it rejects selects nothing.

use std::cmp::Ordering;

use bson::{Bson, Document, Regex};

/// Returns `true` if `document` satisfies `filter`.
pub fn matches(filter: &Document, document: &Document) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "$and" => members(condition).iter().all(|f| matches(f, document)),
        "$or" => members(condition).iter().any(|f| matches(f, document)),
        "$nor" => !members(condition).iter().any(|f| matches(f, document)),
        path => {
            let values = lookup(document, path);
            field_matches(&values, condition)
        }
    })
}

fn members(condition: &Bson) -> Vec<Document> {
    match condition {
        Bson::Array(items) => items
            .iter()
            .filter_map(|b| b.as_document().cloned())
            .collect(),
        _ => Vec::new(),
    }
}

/// Collects the values a dotted path reaches, traversing arrays.
fn lookup(document: &Document, path: &str) -> Vec<Bson> {
    let mut current = vec![Bson::Document(document.clone())];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Bson::Document(d) => {
                    if let Some(v) = d.get(segment) {
                        next.push(v.clone());
                    }
                }
                Bson::Array(items) => {
                    if let Ok(position) = segment.parse::<usize>() {
                        if let Some(v) = items.get(position) {
                            next.push(v.clone());
                        }
                    } else {
                        for item in items {
                            if let Bson::Document(d) = item {
                                if let Some(v) = d.get(segment) {
                                    next.push(v.clone());
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    current
}

/// The values themselves plus the elements of any array among them.
fn expanded(values: &[Bson]) -> Vec<Bson> {
    let mut out = Vec::new();
    for value in values {
        if let Bson::Array(items) = value {
            out.extend(items.iter().cloned());
        }
        out.push(value.clone());
    }
    out
}

fn is_operator_map(condition: &Bson) -> bool {
    match condition {
        Bson::Document(d) => d.keys().next().is_some_and(|k| k.starts_with('$')),
        _ => false,
    }
}

fn field_matches(values: &[Bson], condition: &Bson) -> bool {
    match condition {
        Bson::Document(operators) if is_operator_map(condition) => {
            if let Some(Bson::String(pattern)) = operators.get("$regex") {
                let options = operators.get_str("$options").unwrap_or("");
                let regex = Regex {
                    pattern: pattern.clone(),
                    options: options.to_string(),
                };
                if !any_regex(values, &regex) {
                    return false;
                }
            }
            operators
                .iter()
                .filter(|(op, _)| *op != "$regex" && *op != "$options")
                .all(|(op, operand)| operator_matches(values, op, operand))
        }
        Bson::RegularExpression(regex) => any_regex(values, regex),
        other => equals(values, other),
    }
}

fn operator_matches(values: &[Bson], op: &str, operand: &Bson) -> bool {
    match op {
        "$eq" => equals(values, operand),
        "$ne" => !equals(values, operand),
        "$gt" => compares(values, operand, |o| o == Ordering::Greater),
        "$gte" => compares(values, operand, |o| o != Ordering::Less),
        "$lt" => compares(values, operand, |o| o == Ordering::Less),
        "$lte" => compares(values, operand, |o| o != Ordering::Greater),
        "$in" => in_list(values, operand),
        "$nin" => !in_list(values, operand),
        "$exists" => (!values.is_empty()) == operand.as_bool().unwrap_or(true),
        "$not" => !field_matches(values, operand),
        "$size" => {
            let n = as_i64(operand);
            values
                .iter()
                .any(|v| matches!(v, Bson::Array(items) if Some(items.len() as i64) == n))
        }
        "$all" => match operand {
            Bson::Array(required) => {
                !required.is_empty() && required.iter().all(|r| equals(values, r))
            }
            _ => false,
        },
        "$elemMatch" => {
            let Bson::Document(inner) = operand else {
                return false;
            };
            values.iter().any(|v| match v {
                Bson::Array(items) => items.iter().any(|item| element_matches(item, inner)),
                _ => false,
            })
        }
        "$mod" => {
            let (divisor, remainder) = match operand {
                Bson::Array(parts) if parts.len() == 2 => (as_i64(&parts[0]), as_i64(&parts[1])),
                _ => return false,
            };
            let (Some(divisor), Some(remainder)) = (divisor, remainder) else {
                return false;
            };
            expanded(values)
                .iter()
                .filter_map(as_i64)
                .any(|n| divisor != 0 && n % divisor == remainder)
        }
        "$type" => expanded(values).iter().any(|v| type_matches(v, operand)),
        _ => false,
    }
}

fn element_matches(item: &Bson, condition: &Document) -> bool {
    let wrapped = Bson::Document(condition.clone());
    if is_operator_map(&wrapped) {
        return field_matches(std::slice::from_ref(item), &wrapped);
    }
    match item {
        Bson::Document(d) => matches(condition, d),
        _ => false,
    }
}

fn equals(values: &[Bson], target: &Bson) -> bool {
    if matches!(target, Bson::Null) && values.is_empty() {
        return true;
    }
    expanded(values).iter().any(|v| same(v, target))
}

fn in_list(values: &[Bson], list: &Bson) -> bool {
    match list {
        Bson::Array(items) => items.iter().any(|item| match item {
            Bson::RegularExpression(regex) => any_regex(values, regex),
            other => equals(values, other),
        }),
        _ => false,
    }
}

fn compares(values: &[Bson], target: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    expanded(values)
        .iter()
        .filter_map(|v| order(v, target))
        .any(accept)
}

fn any_regex(values: &[Bson], regex: &Regex) -> bool {
    let mut flags = String::new();
    for letter in regex.options.chars() {
        if matches!(letter, 'i' | 's' | 'm' | 'x') {
            flags.push(letter);
        }
    }
    let source = if flags.is_empty() {
        regex.pattern.clone()
    } else {
        format!("(?{flags}){}", regex.pattern)
    };
    let Ok(compiled) = regex::Regex::new(&source) else {
        return false;
    };
    expanded(values)
        .iter()
        .any(|v| matches!(v, Bson::String(s) if compiled.is_match(s)))
}

fn type_matches(value: &Bson, operand: &Bson) -> bool {
    let code = match operand {
        Bson::String(alias) => match alias.as_str() {
            "double" => 1,
            "string" => 2,
            "object" => 3,
            "array" => 4,
            "bool" => 8,
            "null" => 10,
            "int" => 16,
            "long" => 18,
            _ => return false,
        },
        other => match as_i64(other) {
            Some(code) => code,
            None => return false,
        },
    };
    i64::from(value.element_type() as u8) == code
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        Bson::Double(d) if d.fract() == 0.0 => Some(*d as i64),
        _ => None,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(d) => Some(*d),
        _ => None,
    }
}

fn same(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn order(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        _ => as_f64(a)?.partial_cmp(&as_f64(b)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_missing_fields() {
        let empty = doc! {};
        assert!(matches(&doc! { "a": { "$ne": 1 } }, &empty));
        assert!(matches(&doc! { "a": null }, &empty));
        assert!(!matches(&doc! { "a": { "$gt": 1 } }, &empty));
        assert!(matches(&doc! { "a": { "$not": { "$gt": 1 } } }, &empty));
    }

    #[test]
    fn test_array_traversal() {
        let d = doc! { "_t": ["Animal", "Cat"], "lines": [{ "qty": 1 }, { "qty": 5 }] };
        assert!(matches(&doc! { "_t": "Cat" }, &d));
        assert!(matches(&doc! { "_t.1": { "$exists": true } }, &d));
        assert!(matches(&doc! { "_t.2": { "$exists": false } }, &d));
        assert!(matches(&doc! { "lines.qty": 5 }, &d));
        assert!(matches(&doc! { "lines": { "$elemMatch": { "qty": { "$gt": 2 } } } }, &d));
        assert!(matches(&doc! { "lines": { "$size": 2 } }, &d));
    }

    #[test]
    fn test_logical_and_regex() {
        let d = doc! { "name": "Tom", "age": 30 };
        assert!(matches(&doc! { "$or": [{ "age": 1 }, { "name": "Tom" }] }, &d));
        assert!(!matches(&doc! { "$nor": [{ "age": 30 }] }, &d));
        let pattern = Bson::RegularExpression(Regex {
            pattern: "^t".into(),
            options: "i".into(),
        });
        assert!(matches(&doc! { "name": pattern }, &d));
        assert!(matches(&doc! { "age": { "$mod": [7, 2] } }, &d));
        assert!(matches(&doc! { "missing": { "$type": 10 } }, &doc! { "missing": null }));
    }
}
