//! Readable rendering of expression trees.
//!
//! The rendering doubles as the resolver's cache key, so two expressions that
//! print the same must resolve the same.

use std::fmt;

use super::{Expr, Lambda};

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parameters.as_slice() {
            [p] => write!(f, "{} => {}", p.name, self.body),
            params => {
                f.write_str("(")?;
                write_list(f, params.iter().map(|p| &p.name))?;
                write!(f, ") => {}", self.body)
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Source { document_type } => write!(f, "Queryable<{document_type}>"),
            Expr::Parameter(p) => f.write_str(&p.name),
            Expr::Lambda(lambda) => write!(f, "{lambda}"),
            Expr::Constant { value } => write!(f, "{value}"),
            Expr::Member { target, name } => write!(f, "{target}.{name}"),
            Expr::Index { target, index } => write!(f, "{target}[{index}]"),
            Expr::Binary { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Not { operand } => write!(f, "!{operand}"),
            Expr::Convert { operand, ty } => write!(f, "({ty}){operand}"),
            Expr::TypeIs { operand, ty } => write!(f, "({operand} is {ty})"),
            Expr::Call {
                method,
                object: Some(object),
                arguments,
            } => {
                write!(f, "{object}.{method}(")?;
                write_list(f, arguments.iter())?;
                f.write_str(")")
            }
            Expr::Call {
                method,
                object: None,
                arguments,
            } => match arguments.split_first() {
                // Extension-method style reads closest to the source chain.
                Some((first, rest)) => {
                    write!(f, "{first}.{method}(")?;
                    write_list(f, rest.iter())?;
                    f.write_str(")")
                }
                None => write!(f, "{method}()"),
            },
            Expr::New { members } => {
                f.write_str("new { ")?;
                for (i, (name, value)) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name} = {value}")?;
                }
                f.write_str(" }")
            }
        }
    }
}

fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
