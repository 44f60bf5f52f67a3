//! State and clause types shared by the builder and the grammar

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;

use crate::grammar::{bind_key, compile_bindings};
use crate::{Operator, Value};

/// Bind key (`:name`) to value, in the order keys were first bound
pub type Bindings = IndexMap<String, Value>;

/// Column/value pairs handed to `insert` and `update`
pub type Fields = Vec<(String, Value)>;

/// The kind of statement a terminal operation compiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    InsertGetId,
    Update,
    Delete,
}

/// How WHERE conditions are connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhereConnector {
    #[default]
    And,
    Or,
}

impl std::fmt::Display for WhereConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WhereConnector::And => write!(f, "AND"),
            WhereConnector::Or => write!(f, "OR"),
        }
    }
}

/// A WHERE condition
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
    /// Ignored for the first clause of a statement, which renders as `WHERE`
    pub connector: WhereConnector,
}

/// JOIN types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinType::Inner => write!(f, "JOIN"),
            JoinType::Left => write!(f, "LEFT JOIN"),
            JoinType::Right => write!(f, "RIGHT JOIN"),
            JoinType::Full => write!(f, "FULL OUTER JOIN"),
            JoinType::Cross => write!(f, "CROSS JOIN"),
        }
    }
}

/// A JOIN clause: `<type> <table> ON <first> <operator> <second>`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub first: String,
    pub operator: Operator,
    pub second: String,
}

/// Everything a builder has accumulated for the statement in progress.
///
/// `Default` is the reset state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    pub table: String,
    /// Empty selects every column
    pub select_columns: Vec<String>,
    pub insert_columns: Vec<String>,
    pub update_columns: Vec<String>,
    pub joins: Vec<JoinClause>,
    pub wheres: Vec<WhereClause>,
    pub bindings: Bindings,
}

impl QueryState {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn push_where(&mut self, clause: WhereClause) {
        self.bindings
            .insert(bind_key(&clause.column), clause.value.clone());
        self.wheres.push(clause);
    }

    pub(crate) fn push_insert_fields(&mut self, fields: Fields) {
        self.bindings.extend(compile_bindings(&fields));
        self.insert_columns
            .extend(fields.into_iter().map(|(column, _)| column));
    }

    pub(crate) fn push_update_fields(&mut self, fields: Fields) {
        self.bindings.extend(compile_bindings(&fields));
        self.update_columns
            .extend(fields.into_iter().map(|(column, _)| column));
    }
}

/// Trait to convert various types into columns
pub trait IntoColumns {
    fn into_columns(self) -> Vec<String>;
}

impl IntoColumns for &str {
    fn into_columns(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoColumns for String {
    fn into_columns(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoColumns for Vec<String> {
    fn into_columns(self) -> Vec<String> {
        self
    }
}

impl IntoColumns for Vec<&str> {
    fn into_columns(self) -> Vec<String> {
        self.into_iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoColumns for [&str; N] {
    fn into_columns(self) -> Vec<String> {
        self.into_iter().map(|s| s.to_string()).collect()
    }
}

impl IntoColumns for (&str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string()]
    }
}

impl IntoColumns for (&str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string(), self.2.to_string()]
    }
}

/// Trait for types that can be converted to INSERT/UPDATE data.
///
/// Ordered inputs keep their order in the generated SQL; `HashMap` iteration
/// order is unspecified.
pub trait IntoFields {
    fn into_fields(self) -> Fields;
}

impl<K, V> IntoFields for Vec<(K, V)>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_fields(self) -> Fields {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

impl<K, V, const N: usize> IntoFields for [(K, V); N]
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_fields(self) -> Fields {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

impl IntoFields for IndexMap<String, Value> {
    fn into_fields(self) -> Fields {
        self.into_iter().collect()
    }
}

impl IntoFields for BTreeMap<String, Value> {
    fn into_fields(self) -> Fields {
        self.into_iter().collect()
    }
}

impl IntoFields for HashMap<String, Value> {
    fn into_fields(self) -> Fields {
        self.into_iter().collect()
    }
}
