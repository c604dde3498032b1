//! Pattern synthesis for string predicates.
//!
//! Turns a string predicate, optionally applied after case folding and
//! trimming, into an anchored pattern. Patterns use the server's PCRE
//! dialect; literals are escaped with [`regex::escape`], whose output PCRE
//! reads the same way.

use quarry_common::utils::error::{Result, TranslationError};
use quarry_core::expr::{BinaryOp, Method};

/// A transform applied to a string member before the predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringTransform {
    /// `ToLower` / `ToLowerInvariant`.
    ToLower,
    /// `ToUpper` / `ToUpperInvariant`.
    ToUpper,
    /// `Trim`, with an explicit character set or whitespace.
    Trim(Option<Vec<char>>),
    /// `TrimStart`.
    TrimStart(Option<Vec<char>>),
    /// `TrimEnd`.
    TrimEnd(Option<Vec<char>>),
}

impl StringTransform {
    /// Maps a transform method and its character arguments.
    #[must_use]
    pub fn from_method(method: &Method, chars: Option<Vec<char>>) -> Option<Self> {
        Some(match method {
            Method::ToLower | Method::ToLowerInvariant => Self::ToLower,
            Method::ToUpper | Method::ToUpperInvariant => Self::ToUpper,
            Method::Trim => Self::Trim(chars),
            Method::TrimStart => Self::TrimStart(chars),
            Method::TrimEnd => Self::TrimEnd(chars),
            _ => return None,
        })
    }

    fn name(&self) -> &'static str {
        match self {
            Self::ToLower => "ToLower",
            Self::ToUpper => "ToUpper",
            Self::Trim(_) => "Trim",
            Self::TrimStart(_) => "TrimStart",
            Self::TrimEnd(_) => "TrimEnd",
        }
    }
}

/// What `IndexOf` searches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexTarget {
    /// A single character.
    Char(char),
    /// Any character of a set (`IndexOfAny`).
    AnyOf(Vec<char>),
    /// A substring.
    Text(String),
}

/// The predicate terminating a string chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringPredicate {
    /// `Contains(s)`.
    Contains(String),
    /// `StartsWith(s)`.
    StartsWith(String),
    /// `EndsWith(s)`.
    EndsWith(String),
    /// Equality with a literal.
    Equals(String),
    /// `Length op n`.
    Length(BinaryOp, i64),
    /// `IndexOf(target[, start[, count]]) == index`.
    IndexOf {
        /// What is searched for.
        target: IndexTarget,
        /// The search start.
        start: Option<i64>,
        /// The search window length.
        count: Option<i64>,
        /// The expected result; `-1` means "not found".
        index: i64,
    },
    /// `s[index] == ch` (or `!=` when `equal` is false).
    CharAt {
        /// The character position.
        index: i64,
        /// The compared character.
        ch: char,
        /// Whether the character must equal `ch`.
        equal: bool,
    },
}

/// The synthesized pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesized {
    /// A pattern the field must match.
    Match {
        /// The pattern source.
        pattern: String,
        /// Whether the `i` option applies.
        case_insensitive: bool,
    },
    /// No string can satisfy the predicate.
    Unsatisfiable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fold {
    Lower,
    Upper,
}

/// Trim character set: `None` is whitespace.
type TrimSet = Option<Vec<char>>;

#[derive(Debug, Default)]
struct Transforms {
    fold: Option<Fold>,
    leading: Option<TrimSet>,
    trailing: Option<TrimSet>,
}

impl Transforms {
    fn collect(transforms: &[StringTransform]) -> Result<Self> {
        let mut out = Self::default();
        for transform in transforms {
            match transform {
                StringTransform::ToLower => out.fold = Some(Fold::Lower),
                StringTransform::ToUpper => out.fold = Some(Fold::Upper),
                StringTransform::Trim(set) => {
                    set_trim(&mut out.leading, set, transform)?;
                    set_trim(&mut out.trailing, set, transform)?;
                }
                StringTransform::TrimStart(set) => set_trim(&mut out.leading, set, transform)?,
                StringTransform::TrimEnd(set) => set_trim(&mut out.trailing, set, transform)?,
            }
        }
        Ok(out)
    }

    fn has_trim(&self) -> bool {
        self.leading.is_some() || self.trailing.is_some()
    }

    fn contradicts(&self, literal: &str) -> bool {
        match self.fold {
            Some(Fold::Lower) => literal != literal.to_lowercase(),
            Some(Fold::Upper) => literal != literal.to_uppercase(),
            None => false,
        }
    }

    fn contradicts_char(&self, c: char) -> bool {
        let mut buf = [0u8; 4];
        self.contradicts(c.encode_utf8(&mut buf))
    }

    /// Drops the characters the fold removes; they can never be found.
    fn reachable(&self, target: &IndexTarget) -> IndexTarget {
        match target {
            IndexTarget::Char(c) if self.contradicts_char(*c) => IndexTarget::AnyOf(Vec::new()),
            IndexTarget::AnyOf(set) => IndexTarget::AnyOf(
                set.iter()
                    .copied()
                    .filter(|c| !self.contradicts_char(*c))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn leading_violation(&self, literal: &str) -> bool {
        match (&self.leading, literal.chars().next()) {
            (Some(set), Some(c)) => trims(set, c),
            _ => false,
        }
    }

    fn trailing_violation(&self, literal: &str) -> bool {
        match (&self.trailing, literal.chars().last()) {
            (Some(set), Some(c)) => trims(set, c),
            _ => false,
        }
    }

    fn leading_pattern(&self) -> String {
        self.leading.as_ref().map(trim_class).unwrap_or_default()
    }

    fn trailing_pattern(&self) -> String {
        self.trailing.as_ref().map(trim_class).unwrap_or_default()
    }
}

fn set_trim(slot: &mut Option<TrimSet>, set: &TrimSet, transform: &StringTransform) -> Result<()> {
    match slot {
        Some(existing) if existing != set => Err(TranslationError::UnsupportedPredicate(format!(
            "{} after a trim with a different character set",
            transform.name()
        ))
        .into()),
        _ => {
            *slot = Some(set.clone());
            Ok(())
        }
    }
}

fn trims(set: &TrimSet, c: char) -> bool {
    match set {
        Some(chars) => chars.contains(&c),
        None => c.is_whitespace(),
    }
}

fn trim_class(set: &TrimSet) -> String {
    match set {
        Some(chars) => format!("[{}]*", escape_class(chars)),
        None => "\\s*".to_string(),
    }
}

/// Escapes characters for use inside a `[...]` class.
#[must_use]
pub fn escape_class(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    for &c in chars {
        if matches!(c, '\\' | ']' | '-' | '^' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Synthesizes a pattern for `predicate` applied after `transforms`.
///
/// # Errors
///
/// Returns an error for combinations that have no exact pattern, such as a
/// length test after a trim.
pub fn synthesize(transforms: &[StringTransform], predicate: &StringPredicate) -> Result<Synthesized> {
    let t = Transforms::collect(transforms)?;
    let case_insensitive = t.fold.is_some();
    let matched = |pattern: String| Synthesized::Match {
        pattern,
        case_insensitive,
    };

    match predicate {
        StringPredicate::Equals(s) => {
            if t.contradicts(s) || t.leading_violation(s) || t.trailing_violation(s) {
                return Ok(Synthesized::Unsatisfiable);
            }
            Ok(matched(format!(
                "^{}{}{}$",
                t.leading_pattern(),
                regex::escape(s),
                t.trailing_pattern()
            )))
        }
        StringPredicate::StartsWith(s) => {
            if t.contradicts(s) || t.leading_violation(s) {
                return Ok(Synthesized::Unsatisfiable);
            }
            if t.trailing_violation(s) {
                return Err(unsupported("StartsWith with a literal ending in a trimmed character"));
            }
            Ok(matched(format!("^{}{}", t.leading_pattern(), regex::escape(s))))
        }
        StringPredicate::EndsWith(s) => {
            if t.contradicts(s) || t.trailing_violation(s) {
                return Ok(Synthesized::Unsatisfiable);
            }
            if t.leading_violation(s) {
                return Err(unsupported("EndsWith with a literal starting with a trimmed character"));
            }
            Ok(matched(format!("{}{}$", regex::escape(s), t.trailing_pattern())))
        }
        StringPredicate::Contains(s) => {
            if t.contradicts(s) {
                return Ok(Synthesized::Unsatisfiable);
            }
            if t.leading_violation(s) || t.trailing_violation(s) {
                return Err(unsupported("Contains with a literal bordered by a trimmed character"));
            }
            Ok(matched(regex::escape(s)))
        }
        StringPredicate::Length(op, n) => {
            if t.has_trim() {
                return Err(unsupported("Length after a trim"));
            }
            Ok(match length_pattern(*op, *n)? {
                Some(pattern) => matched(pattern),
                None => Synthesized::Unsatisfiable,
            })
        }
        StringPredicate::IndexOf {
            target,
            start,
            count,
            index,
        } => {
            if t.has_trim() {
                return Err(unsupported("IndexOf after a trim"));
            }
            if let IndexTarget::Text(s) = target {
                if t.contradicts(s) {
                    return Ok(Synthesized::Unsatisfiable);
                }
            }
            let target = t.reachable(target);
            Ok(
                match index_of_pattern(&target, start.unwrap_or(0), *count, *index)? {
                    Some(pattern) => matched(pattern),
                    None => Synthesized::Unsatisfiable,
                },
            )
        }
        StringPredicate::CharAt { index, ch, equal } => {
            if t.has_trim() {
                return Err(unsupported("a character index after a trim"));
            }
            if *index < 0 {
                return Ok(Synthesized::Unsatisfiable);
            }
            if t.contradicts_char(*ch) {
                // The folded string never holds `ch`: only the position must exist.
                return Ok(if *equal {
                    Synthesized::Unsatisfiable
                } else {
                    matched(format!("^.{{{}}}", index.saturating_add(1)))
                });
            }
            let escaped = regex::escape(&ch.to_string());
            Ok(matched(if *equal {
                format!("^.{{{index}}}{escaped}")
            } else {
                format!("^.{{{index}}}[^{}]", escape_class(&[*ch]))
            }))
        }
    }
}

/// Length pattern for `op n`; `None` when no length qualifies.
fn length_pattern(op: BinaryOp, n: i64) -> Result<Option<String>> {
    let bounded = |min: i64, max: Option<i64>| -> Option<String> {
        let min = min.max(0);
        match max {
            Some(max) if max < min => None,
            Some(max) if max == min => Some(format!("^.{{{min}}}$")),
            Some(max) => Some(format!("^.{{{min},{max}}}$")),
            None => Some(format!("^.{{{min},}}$")),
        }
    };
    Ok(match op {
        BinaryOp::Equal => {
            if n < 0 {
                None
            } else {
                bounded(n, Some(n))
            }
        }
        BinaryOp::GreaterThan => bounded(n.saturating_add(1), None),
        BinaryOp::GreaterThanOrEqual => bounded(n, None),
        BinaryOp::LessThan => bounded(0, Some(n.saturating_sub(1))),
        BinaryOp::LessThanOrEqual => bounded(0, Some(n)),
        other => {
            return Err(unsupported(&format!(
                "Length with the {} operator",
                other.symbol()
            )));
        }
    })
}

fn index_of_pattern(
    target: &IndexTarget,
    start: i64,
    count: Option<i64>,
    index: i64,
) -> Result<Option<String>> {
    if start < 0 || count.is_some_and(|c| c < 0) {
        return Ok(None);
    }
    let prefix = if start > 0 {
        format!("^.{{{start}}}")
    } else {
        "^".to_string()
    };
    let window = count.map(|c| format!("(?=.{{{c}}})")).unwrap_or_default();

    if index == -1 {
        if count.is_some() {
            return Err(unsupported("IndexOf == -1 with a count"));
        }
        return Ok(Some(match target {
            IndexTarget::AnyOf(set) if set.is_empty() => prefix,
            IndexTarget::Char(c) => format!("{prefix}[^{}]*$", escape_class(&[*c])),
            IndexTarget::AnyOf(set) => format!("{prefix}[^{}]*$", escape_class(set)),
            IndexTarget::Text(s) => format!("{prefix}(?!.*{})", regex::escape(s)),
        }));
    }
    if index < start {
        return Ok(None);
    }
    let offset = index - start;

    match target {
        IndexTarget::Char(c) => Ok(single_position(
            &prefix,
            &window,
            &escape_class(&[*c]),
            &regex::escape(&c.to_string()),
            offset,
            count,
        )),
        IndexTarget::AnyOf(set) if set.is_empty() => Ok(None),
        IndexTarget::AnyOf(set) => {
            let class = escape_class(set);
            Ok(single_position(
                &prefix,
                &window,
                &class,
                &format!("[{class}]"),
                offset,
                count,
            ))
        }
        IndexTarget::Text(s) => {
            let len = i64::try_from(s.chars().count()).unwrap_or(i64::MAX);
            if count.is_some_and(|c| len > c - offset) {
                return Ok(None);
            }
            let escaped = regex::escape(s);
            let exclusion = if offset > 0 {
                format!("(?!.{{0,{}}}{escaped})", offset - 1)
            } else {
                String::new()
            };
            Ok(Some(format!(
                "{prefix}{window}{exclusion}.{{{offset}}}{escaped}"
            )))
        }
    }
}

/// `offset` characters outside `excluded`, then one matching `found`.
fn single_position(
    prefix: &str,
    window: &str,
    excluded: &str,
    found: &str,
    offset: i64,
    count: Option<i64>,
) -> Option<String> {
    if count.is_some_and(|c| offset >= c) {
        return None;
    }
    Some(format!("{prefix}{window}[^{excluded}]{{{offset}}}{found}"))
}

fn unsupported(what: &str) -> quarry_common::Error {
    TranslationError::UnsupportedPredicate(what.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(transforms: &[StringTransform], predicate: StringPredicate) -> String {
        match synthesize(transforms, &predicate).unwrap() {
            Synthesized::Match { pattern, .. } => pattern,
            Synthesized::Unsatisfiable => panic!("unexpectedly unsatisfiable"),
        }
    }

    #[test]
    fn test_anchors_and_escaping() {
        assert_eq!(pattern(&[], StringPredicate::Contains("a.b".into())), "a\\.b");
        assert_eq!(pattern(&[], StringPredicate::StartsWith("T".into())), "^T");
        assert_eq!(pattern(&[], StringPredicate::EndsWith("x+".into())), "x\\+$");
        assert_eq!(pattern(&[], StringPredicate::Equals("abc".into())), "^abc$");
    }

    #[test]
    fn test_length_forms() {
        let len = |op, n| pattern(&[], StringPredicate::Length(op, n));
        assert_eq!(len(BinaryOp::Equal, 3), "^.{3}$");
        assert_eq!(len(BinaryOp::GreaterThan, 3), "^.{4,}$");
        assert_eq!(len(BinaryOp::GreaterThanOrEqual, 3), "^.{3,}$");
        assert_eq!(len(BinaryOp::LessThan, 3), "^.{0,2}$");
        assert_eq!(len(BinaryOp::LessThanOrEqual, 3), "^.{0,3}$");
        assert_eq!(
            synthesize(&[], &StringPredicate::Length(BinaryOp::LessThan, 0)).unwrap(),
            Synthesized::Unsatisfiable
        );
    }

    #[test]
    fn test_trim_widens_anchors() {
        assert_eq!(
            pattern(&[StringTransform::Trim(None)], StringPredicate::Equals("abc".into())),
            "^\\s*abc\\s*$"
        );
        assert_eq!(
            pattern(
                &[StringTransform::TrimStart(Some(vec!['x', '-']))],
                StringPredicate::StartsWith("ab".into())
            ),
            "^[x\\-]*ab"
        );
        assert_eq!(
            synthesize(
                &[StringTransform::Trim(None)],
                &StringPredicate::Equals(" abc".into())
            )
            .unwrap(),
            Synthesized::Unsatisfiable
        );
        assert!(
            synthesize(
                &[StringTransform::Trim(None)],
                &StringPredicate::Length(BinaryOp::Equal, 3)
            )
            .is_err()
        );
    }

    #[test]
    fn test_case_fold() {
        let out = synthesize(&[StringTransform::ToLower], &StringPredicate::Equals("abc".into()))
            .unwrap();
        assert_eq!(
            out,
            Synthesized::Match {
                pattern: "^abc$".into(),
                case_insensitive: true
            }
        );
        let contradiction =
            synthesize(&[StringTransform::ToLower], &StringPredicate::Equals("Abc".into()))
                .unwrap();
        assert_eq!(contradiction, Synthesized::Unsatisfiable);
        let upper =
            synthesize(&[StringTransform::ToUpper], &StringPredicate::StartsWith("ab".into()))
                .unwrap();
        assert_eq!(upper, Synthesized::Unsatisfiable);
    }

    #[test]
    fn test_index_of_char() {
        let at = |start, count, index| {
            synthesize(
                &[],
                &StringPredicate::IndexOf {
                    target: IndexTarget::Char('e'),
                    start,
                    count,
                    index,
                },
            )
            .unwrap()
        };
        let p = |s: Synthesized| match s {
            Synthesized::Match { pattern, .. } => pattern,
            Synthesized::Unsatisfiable => "<none>".to_string(),
        };
        assert_eq!(p(at(None, None, 2)), "^[^e]{2}e");
        assert_eq!(p(at(Some(1), None, 3)), "^.{1}[^e]{2}e");
        assert_eq!(p(at(Some(1), Some(2), 2)), "^.{1}(?=.{2})[^e]{1}e");
        assert_eq!(p(at(Some(1), Some(2), 3)), "<none>");
        assert_eq!(p(at(Some(2), None, 1)), "<none>");
        assert_eq!(p(at(None, None, -1)), "^[^e]*$");
    }

    #[test]
    fn test_index_of_text() {
        let p = pattern(
            &[],
            StringPredicate::IndexOf {
                target: IndexTarget::Text("ab".into()),
                start: None,
                count: None,
                index: 2,
            },
        );
        assert_eq!(p, "^(?!.{0,1}ab).{2}ab");
        let unsat = synthesize(
            &[],
            &StringPredicate::IndexOf {
                target: IndexTarget::Text("abc".into()),
                start: Some(1),
                count: Some(3),
                index: 2,
            },
        )
        .unwrap();
        assert_eq!(unsat, Synthesized::Unsatisfiable);
    }

    #[test]
    fn test_char_at() {
        assert_eq!(
            pattern(
                &[],
                StringPredicate::CharAt {
                    index: 2,
                    ch: 'x',
                    equal: true
                }
            ),
            "^.{2}x"
        );
        assert_eq!(
            pattern(
                &[],
                StringPredicate::CharAt {
                    index: 0,
                    ch: ']',
                    equal: false
                }
            ),
            "^.{0}[^\\]]"
        );
    }

    #[test]
    fn test_case_fold_unreachable_chars() {
        let lower = [StringTransform::ToLower];
        let index_of = |target, index| {
            synthesize(
                &lower,
                &StringPredicate::IndexOf {
                    target,
                    start: None,
                    count: None,
                    index,
                },
            )
            .unwrap()
        };
        assert_eq!(index_of(IndexTarget::Char('A'), 2), Synthesized::Unsatisfiable);
        assert_eq!(
            index_of(IndexTarget::Char('A'), -1),
            Synthesized::Match {
                pattern: "^".into(),
                case_insensitive: true
            }
        );
        assert_eq!(
            index_of(IndexTarget::AnyOf(vec!['A', 'b']), 1),
            Synthesized::Match {
                pattern: "^[^b]{1}[b]".into(),
                case_insensitive: true
            }
        );
        let ne = synthesize(
            &[StringTransform::ToUpper],
            &StringPredicate::CharAt {
                index: 2,
                ch: 'x',
                equal: false,
            },
        )
        .unwrap();
        assert_eq!(
            ne,
            Synthesized::Match {
                pattern: "^.{3}".into(),
                case_insensitive: true
            }
        );
    }

    #[test]
    fn test_escape_class() {
        assert_eq!(escape_class(&['a', '-', ']']), "a\\-\\]");
    }
}
