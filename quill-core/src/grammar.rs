//! Translation of accumulated builder state into SQL text and bindings.
//!
//! Everything here is pure: the same state always compiles to the same text,
//! and nothing touches the connection. Placeholders are named (`:key`); the
//! connector turns them into the driver's positional form at execution time.

use crate::builder::{Bindings, Fields, QueryState, StatementKind};
use crate::{Dialect, Error, Result};

/// Column the returning-id protocol reads back
pub const RETURNING_ID_COLUMN: &str = "id";

/// Strip any qualifying prefix and identifier quoting from a column:
/// `users.id` becomes `id`, `t."group"` becomes `group`.
pub fn format_bind_key(column: &str) -> &str {
    column
        .rsplit('.')
        .next()
        .unwrap_or(column)
        .trim_matches(|c| matches!(c, '"' | '`' | '[' | ']'))
}

/// The full placeholder name for a column, e.g. `:id`.
///
/// Characters a placeholder cannot carry (spaces in a quoted identifier) are
/// replaced with `_`.
pub fn bind_key(column: &str) -> String {
    let key: String = format_bind_key(column)
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!(":{key}")
}

/// Binding map for a set of insert/update fields
pub fn compile_bindings(fields: &Fields) -> Bindings {
    fields
        .iter()
        .map(|(column, value)| (bind_key(column), value.clone()))
        .collect()
}

/// A statement ready to hand to a connection
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub kind: StatementKind,
    pub sql: String,
    pub bindings: Bindings,
}

/// SQL compiler for one dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grammar {
    dialect: Dialect,
}

impl Grammar {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Compile `state` as a statement of the given kind.
    ///
    /// Only `InsertGetId` can fail, when the dialect has no `RETURNING`.
    pub fn compile(&self, state: &QueryState, kind: StatementKind) -> Result<CompiledQuery> {
        let sql = match kind {
            StatementKind::Select => self.compile_select(state),
            StatementKind::Insert => self.compile_insert(state),
            StatementKind::InsertGetId => self.compile_insert_get_id(state)?,
            StatementKind::Update => self.compile_update(state),
            StatementKind::Delete => self.compile_delete(state),
        };

        Ok(CompiledQuery {
            kind,
            sql,
            bindings: state.bindings.clone(),
        })
    }

    pub fn compile_insert(&self, state: &QueryState) -> String {
        let placeholders: Vec<String> = state.insert_columns.iter().map(|c| bind_key(c)).collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            state.table,
            state.insert_columns.join(", "),
            placeholders.join(", ")
        )
    }

    pub fn compile_insert_get_id(&self, state: &QueryState) -> Result<String> {
        if !self.dialect.supports_returning() {
            return Err(Error::unsupported("insert_get_id", self.dialect));
        }

        Ok(format!(
            "{} RETURNING {}",
            self.compile_insert(state),
            RETURNING_ID_COLUMN
        ))
    }

    pub fn compile_update(&self, state: &QueryState) -> String {
        let assignments: Vec<String> = state
            .update_columns
            .iter()
            .map(|column| format!("{} = {}", column, bind_key(column)))
            .collect();

        let mut sql = format!("UPDATE {} SET {}", state.table, assignments.join(", "));
        sql.push_str(&self.compile_wheres(state));
        sql
    }

    /// SELECT, then joins, then wheres: joins always precede filters.
    pub fn compile_select(&self, state: &QueryState) -> String {
        let columns = if state.select_columns.is_empty() {
            "*".to_string()
        } else {
            state.select_columns.join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", columns, state.table);
        sql.push_str(&self.compile_joins(state));
        sql.push_str(&self.compile_wheres(state));
        sql
    }

    pub fn compile_delete(&self, state: &QueryState) -> String {
        let mut sql = format!("DELETE FROM {}", state.table);
        sql.push_str(&self.compile_wheres(state));
        sql
    }

    /// Each clause renders as ` <BOOLEAN> <column> <operator> :<key>`; the
    /// first clause's boolean is always `WHERE`.
    pub fn compile_wheres(&self, state: &QueryState) -> String {
        let mut sql = String::new();

        for (i, clause) in state.wheres.iter().enumerate() {
            let boolean = if i == 0 {
                "WHERE".to_string()
            } else {
                clause.connector.to_string()
            };

            sql.push_str(&format!(
                " {} {} {} {}",
                boolean,
                clause.column,
                clause.operator,
                bind_key(&clause.column)
            ));
        }

        sql
    }

    pub fn compile_joins(&self, state: &QueryState) -> String {
        state
            .joins
            .iter()
            .map(|join| {
                format!(
                    " {} {} ON {} {} {}",
                    join.join_type, join.table, join.first, join.operator, join.second
                )
            })
            .collect()
    }
}
