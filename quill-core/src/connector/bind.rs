//! Named placeholder rewriting.
//!
//! Compiled statements use `:name` placeholders. Drivers want positional ones,
//! so each `:name` is replaced by the dialect's placeholder and its value is
//! pushed in occurrence order. A name used twice is bound twice.

use crate::builder::Bindings;
use crate::{Dialect, Error, Result, Value};

/// Rewrite `sql` for `dialect`, returning the new text and the ordered values.
pub(crate) fn to_positional(
    sql: &str,
    bindings: &Bindings,
    dialect: Dialect,
) -> Result<(String, Vec<Value>)> {
    let mut out = String::with_capacity(sql.len());
    let mut params = Vec::with_capacity(bindings.len());
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            // postgres cast
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                out.push_str("::");
            }
            ':' if chars.peek().is_some_and(|n| n.is_alphabetic() || *n == '_') => {
                let mut key = String::from(":");
                while let Some(&n) = chars.peek() {
                    if !(n.is_alphanumeric() || n == '_') {
                        break;
                    }
                    key.push(n);
                    chars.next();
                }

                let value = bindings.get(&key).ok_or_else(|| {
                    Error::invalid_query(format!("no value bound for placeholder '{key}'"))
                })?;
                params.push(value.clone());
                out.push_str(&dialect.placeholder(params.len()));
            }
            _ => out.push(c),
        }
    }

    Ok((out, params))
}
