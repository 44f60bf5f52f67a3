//! Comparison operators for WHERE and JOIN ... ON clauses

use std::borrow::Cow;
use std::fmt::{self, Display};

/// A SQL comparison operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator(Cow<'static, str>);

impl Operator {
    pub const EQ: Self = Operator(Cow::Borrowed("="));
    pub const NEQ: Self = Operator(Cow::Borrowed("!="));
    pub const GT: Self = Operator(Cow::Borrowed(">"));
    pub const LT: Self = Operator(Cow::Borrowed("<"));
    pub const GTE: Self = Operator(Cow::Borrowed(">="));
    pub const LTE: Self = Operator(Cow::Borrowed("<="));
    pub const LIKE: Self = Operator(Cow::Borrowed("LIKE"));
    pub const ILIKE: Self = Operator(Cow::Borrowed("ILIKE"));

    /// Create a custom operator for database-specific comparisons
    ///
    /// # Examples
    /// ```
    /// use quill_core::Operator;
    ///
    /// // PostgreSQL full-text search
    /// let fts_op = Operator::custom("@@");
    /// assert_eq!(fts_op.as_str(), "@@");
    /// ```
    pub const fn custom(op: &'static str) -> Self {
        Operator(Cow::Borrowed(op))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for types that can be converted to SQL operators
pub trait IntoOperator {
    fn into_operator(self) -> Operator;
}

impl IntoOperator for Operator {
    fn into_operator(self) -> Operator {
        self
    }
}

/// Strings map onto the known operators; anything else is taken verbatim
impl IntoOperator for &str {
    fn into_operator(self) -> Operator {
        match self {
            "=" => Operator::EQ,
            "!=" | "<>" => Operator::NEQ,
            ">" => Operator::GT,
            "<" => Operator::LT,
            ">=" => Operator::GTE,
            "<=" => Operator::LTE,
            "LIKE" | "like" => Operator::LIKE,
            "ILIKE" | "ilike" => Operator::ILIKE,
            other => Operator(Cow::Owned(other.to_string())),
        }
    }
}

impl IntoOperator for String {
    fn into_operator(self) -> Operator {
        self.as_str().into_operator()
    }
}

impl IntoOperator for &String {
    fn into_operator(self) -> Operator {
        self.as_str().into_operator()
    }
}

/// Convenience module for operator constants
pub mod op {
    use super::Operator;

    pub const EQ: Operator = Operator::EQ;
    pub const NEQ: Operator = Operator::NEQ;
    pub const GT: Operator = Operator::GT;
    pub const LT: Operator = Operator::LT;
    pub const GTE: Operator = Operator::GTE;
    pub const LTE: Operator = Operator::LTE;
    pub const LIKE: Operator = Operator::LIKE;
    pub const ILIKE: Operator = Operator::ILIKE;
}
