//! The fluent, stateful query builder.
//!
//! A [`QueryBuilder`] accumulates clauses through `&mut self` calls, and every
//! terminal operation (`get`, `insert`, `insert_get_id`, `update`, `delete`)
//! moves the accumulated state out before doing anything else. The builder is
//! therefore back to its empty state when the call returns, whether the
//! statement succeeded, failed validation, or was rejected by the database.

pub mod common;

pub use common::{
    Bindings, Fields, IntoColumns, IntoFields, JoinClause, JoinType, QueryState, StatementKind,
    WhereClause, WhereConnector,
};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::connector::{Connection, Connector};
use crate::grammar::{CompiledQuery, Grammar, RETURNING_ID_COLUMN};
use crate::value::row_to_json;
use crate::{Error, IntoOperator, Result, Row, Value};

/// What a statement produced, classified by the kind that was compiled
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// INSERT, UPDATE or DELETE ran
    Success { rows_affected: u64 },
    /// SELECT rows, in result order
    Rows(Vec<Row>),
    /// Identifier handed back by an insert
    InsertedId(i64),
}

impl QueryResult {
    /// The rows of a SELECT, `None` for any other statement
    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            QueryResult::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn rows_affected(&self) -> Option<u64> {
        match self {
            QueryResult::Success { rows_affected } => Some(*rows_affected),
            _ => None,
        }
    }

    pub fn inserted_id(&self) -> Option<i64> {
        match self {
            QueryResult::InsertedId(id) => Some(*id),
            _ => None,
        }
    }
}

/// Fluent SQL builder bound to one connection.
///
/// # Examples
/// ```no_run
/// use quill_core::{ConnectionConfig, Connector, QueryBuilder};
///
/// let connector = Connector::new(ConnectionConfig::sqlite_memory())?;
/// let mut query = QueryBuilder::new(connector);
///
/// query.table("users").insert([("name", "Ada")])?;
/// let rows = query.table("users").where_("name", "=", "Ada").get()?;
/// assert_eq!(rows.len(), 1);
/// # Ok::<(), quill_core::Error>(())
/// ```
pub struct QueryBuilder<C: Connection = Connector> {
    state: QueryState,
    grammar: Grammar,
    connection: C,
}

impl<C: Connection> QueryBuilder<C> {
    /// Create a builder compiling for the connection's dialect
    pub fn new(connection: C) -> Self {
        let grammar = Grammar::new(connection.dialect());
        Self {
            state: QueryState::default(),
            grammar,
            connection,
        }
    }

    /// The clauses accumulated so far
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    pub fn into_connection(self) -> C {
        self.connection
    }

    /// Set the target table, replacing any previous one
    pub fn table(&mut self, name: &str) -> &mut Self {
        self.state.table = name.to_string();
        self
    }

    /// Add columns to read. Without any, every column is selected.
    pub fn select<T>(&mut self, columns: T) -> &mut Self
    where
        T: IntoColumns,
    {
        self.state.select_columns.extend(columns.into_columns());
        self
    }

    /// Add an AND WHERE condition
    ///
    /// # Examples
    /// ```no_run
    /// # use quill_core::{ConnectionConfig, Connector, QueryBuilder, op};
    /// # let mut query = QueryBuilder::new(Connector::new(ConnectionConfig::sqlite_memory())?);
    /// query.table("users").where_("age", op::GT, 18).where_("status", "=", "active");
    /// # Ok::<(), quill_core::Error>(())
    /// ```
    pub fn where_<O, V>(&mut self, column: &str, operator: O, value: V) -> &mut Self
    where
        O: IntoOperator,
        V: Into<Value>,
    {
        self.where_with(column, operator, value, WhereConnector::And)
    }

    /// Add an OR WHERE condition
    pub fn or_where<O, V>(&mut self, column: &str, operator: O, value: V) -> &mut Self
    where
        O: IntoOperator,
        V: Into<Value>,
    {
        self.where_with(column, operator, value, WhereConnector::Or)
    }

    /// Add a WHERE condition with an explicit connector.
    ///
    /// The connector of the first condition is never rendered.
    pub fn where_with<O, V>(
        &mut self,
        column: &str,
        operator: O,
        value: V,
        connector: WhereConnector,
    ) -> &mut Self
    where
        O: IntoOperator,
        V: Into<Value>,
    {
        self.state.push_where(WhereClause {
            column: column.to_string(),
            operator: operator.into_operator(),
            value: value.into(),
            connector,
        });
        self
    }

    /// Add an inner JOIN
    pub fn join<O>(&mut self, table: &str, first: &str, operator: O, second: &str) -> &mut Self
    where
        O: IntoOperator,
    {
        self.join_with(table, first, operator, second, JoinType::Inner)
    }

    pub fn left_join<O>(&mut self, table: &str, first: &str, operator: O, second: &str) -> &mut Self
    where
        O: IntoOperator,
    {
        self.join_with(table, first, operator, second, JoinType::Left)
    }

    pub fn join_with<O>(
        &mut self,
        table: &str,
        first: &str,
        operator: O,
        second: &str,
        join_type: JoinType,
    ) -> &mut Self
    where
        O: IntoOperator,
    {
        self.state.joins.push(JoinClause {
            join_type,
            table: table.to_string(),
            first: first.to_string(),
            operator: operator.into_operator(),
            second: second.to_string(),
        });
        self
    }

    /// Compile the accumulated state without executing or resetting it
    pub fn compile(&self, kind: StatementKind) -> Result<CompiledQuery> {
        self.prepare(&self.state, kind)
    }

    pub fn to_sql(&self, kind: StatementKind) -> Result<String> {
        self.compile(kind).map(|query| query.sql)
    }

    /// Run the SELECT and return every row
    pub fn get(&mut self) -> Result<Vec<Row>> {
        let state = self.take_state();
        let query = self.prepare(&state, StatementKind::Select)?;
        self.fetch_rows(&query)
    }

    /// Run the SELECT and deserialize each row into `T`
    pub fn get_as<T>(&mut self) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.get()?
            .iter()
            .map(|row| Ok(serde_json::from_value(row_to_json(row))?))
            .collect()
    }

    /// Insert one record
    pub fn insert<F>(&mut self, fields: F) -> Result<bool>
    where
        F: IntoFields,
    {
        let mut state = self.take_state();
        state.push_insert_fields(fields.into_fields());
        let query = self.prepare(&state, StatementKind::Insert)?;
        self.affect(&query).map(|_| true)
    }

    /// Insert one record and return the `id` the database generated for it
    pub fn insert_get_id<F>(&mut self, fields: F) -> Result<i64>
    where
        F: IntoFields,
    {
        let mut state = self.take_state();
        state.push_insert_fields(fields.into_fields());
        let query = self.prepare(&state, StatementKind::InsertGetId)?;
        self.fetch_id(&query)
    }

    /// Update the matching records
    pub fn update<F>(&mut self, fields: F) -> Result<bool>
    where
        F: IntoFields,
    {
        let mut state = self.take_state();
        state.push_update_fields(fields.into_fields());
        let query = self.prepare(&state, StatementKind::Update)?;
        self.affect(&query).map(|_| true)
    }

    /// Delete the matching records
    pub fn delete(&mut self) -> Result<bool> {
        let state = self.take_state();
        let query = self.prepare(&state, StatementKind::Delete)?;
        self.affect(&query).map(|_| true)
    }

    /// Execute an already compiled statement.
    ///
    /// The result shape follows `query.kind`, never the SQL text. Driver
    /// failures come back as [`Error::QueryExecution`] carrying the SQL.
    pub fn execute(&mut self, query: &CompiledQuery) -> Result<QueryResult> {
        match query.kind {
            StatementKind::Select => self.fetch_rows(query).map(QueryResult::Rows),
            StatementKind::InsertGetId => self.fetch_id(query).map(QueryResult::InsertedId),
            StatementKind::Insert | StatementKind::Update | StatementKind::Delete => self
                .affect(query)
                .map(|rows_affected| QueryResult::Success { rows_affected }),
        }
    }

    /// Start a transaction. Nothing commits or rolls back on its own.
    pub fn begin(&mut self) -> Result<()> {
        self.connection.begin()
    }

    pub fn commit(&mut self) -> Result<()> {
        self.connection.commit()
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.connection.rollback()
    }

    pub(crate) fn reset(&mut self) {
        self.state = QueryState::default();
    }

    fn take_state(&mut self) -> QueryState {
        std::mem::take(&mut self.state)
    }

    fn prepare(&self, state: &QueryState, kind: StatementKind) -> Result<CompiledQuery> {
        validate(state, kind)?;
        self.grammar.compile(state, kind)
    }

    fn fetch_rows(&mut self, query: &CompiledQuery) -> Result<Vec<Row>> {
        log_start(query);
        let rows = self
            .connection
            .fetch_all(&query.sql, &query.bindings)
            .map_err(|err| failed(err, query))?;
        debug!(rows = rows.len(), "statement complete");
        Ok(rows)
    }

    fn fetch_id(&mut self, query: &CompiledQuery) -> Result<i64> {
        log_start(query);
        let id = self
            .connection
            .fetch_all(&query.sql, &query.bindings)
            .and_then(|rows| returned_id(&rows))
            .map_err(|err| failed(err, query))?;
        debug!(id, "statement complete");
        Ok(id)
    }

    fn affect(&mut self, query: &CompiledQuery) -> Result<u64> {
        log_start(query);
        let rows_affected = self
            .connection
            .execute(&query.sql, &query.bindings)
            .map_err(|err| failed(err, query))?;
        debug!(rows_affected, "statement complete");
        Ok(rows_affected)
    }
}

fn log_start(query: &CompiledQuery) {
    debug!(kind = ?query.kind, sql = %query.sql, bindings = query.bindings.len(), "executing statement");
}

fn failed(err: Error, query: &CompiledQuery) -> Error {
    let err = err.with_sql(&query.sql);
    warn!(error = %err, "statement failed");
    err
}

impl<C: Connection + std::fmt::Debug> std::fmt::Debug for QueryBuilder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("state", &self.state)
            .field("grammar", &self.grammar)
            .field("connection", &self.connection)
            .finish()
    }
}

fn validate(state: &QueryState, kind: StatementKind) -> Result<()> {
    if state.table.is_empty() {
        return Err(Error::invalid_query("no table set, call table() first"));
    }

    match kind {
        StatementKind::Insert | StatementKind::InsertGetId if state.insert_columns.is_empty() => {
            Err(Error::invalid_query("INSERT requires at least one field"))
        }
        StatementKind::Update if state.update_columns.is_empty() => {
            Err(Error::invalid_query("UPDATE requires at least one field"))
        }
        _ => Ok(()),
    }
}

fn returned_id(rows: &[Row]) -> Result<i64> {
    let row = rows.first().ok_or(sqlx::Error::RowNotFound)?;
    row.get(RETURNING_ID_COLUMN)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::Database(sqlx::Error::ColumnNotFound(RETURNING_ID_COLUMN.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op;
    use crate::test_support::FakeConnection;
    use crate::Dialect;
    use serde::Deserialize;

    fn builder() -> QueryBuilder<FakeConnection> {
        QueryBuilder::new(FakeConnection::new(Dialect::Postgres))
    }

    #[test]
    fn test_select_where_compiles() {
        let mut query = builder();
        query.table("users").where_("id", "=", 5);

        let compiled = query.compile(StatementKind::Select).unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM users WHERE id = :id");
        assert_eq!(compiled.bindings.len(), 1);
        assert_eq!(compiled.bindings[":id"], Value::I32(5));
        // previewing does not reset
        assert!(!query.state().is_empty());
    }

    #[test]
    fn test_get_executes_and_resets() {
        let mut query = builder();
        query.connection_mut().rows = vec![Row::from([("id".to_string(), Value::I64(5))])];

        let rows = query
            .table("users")
            .select(("id", "name"))
            .where_("id", op::EQ, 5)
            .get()
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert!(query.state().is_empty());
        let (sql, bindings) = &query.connection().statements[0];
        assert_eq!(sql, "SELECT id, name FROM users WHERE id = :id");
        assert_eq!(bindings[":id"], Value::I32(5));
    }

    #[test]
    fn test_joins_then_wheres() {
        let mut query = builder();
        query
            .table("users")
            .select(["users.name", "orders.total"])
            .where_("users.id", "=", 1)
            .join("orders", "orders.user_id", "=", "users.id")
            .left_join("coupons", "coupons.order_id", "=", "orders.id")
            .or_where("orders.total", op::GT, 100);

        assert_eq!(
            query.to_sql(StatementKind::Select).unwrap(),
            "SELECT users.name, orders.total FROM users \
             JOIN orders ON orders.user_id = users.id \
             LEFT JOIN coupons ON coupons.order_id = orders.id \
             WHERE users.id = :id OR orders.total > :total"
        );
    }

    #[test]
    fn test_insert() {
        let mut query = builder();
        let ok = query
            .table("users")
            .insert([("name", Value::from("Ada")), ("age", Value::from(36))])
            .unwrap();

        assert!(ok);
        let (sql, bindings) = &query.connection().statements[0];
        assert_eq!(sql, "INSERT INTO users (name, age) VALUES (:name, :age)");
        assert_eq!(bindings[":name"], Value::from("Ada"));
        assert_eq!(bindings[":age"], Value::I32(36));
        assert!(query.state().is_empty());
    }

    #[test]
    fn test_insert_get_id() {
        let mut query = builder();
        query.connection_mut().rows = vec![Row::from([("id".to_string(), Value::I64(42))])];

        let id = query.table("users").insert_get_id([("name", "a")]).unwrap();

        assert_eq!(id, 42);
        assert_eq!(
            query.connection().statements[0].0,
            "INSERT INTO users (name) VALUES (:name) RETURNING id"
        );
    }

    #[test]
    fn test_insert_get_id_without_returned_row() {
        let mut query = builder();

        let err = query.table("users").insert_get_id([("name", "a")]).unwrap_err();

        assert!(matches!(
            err,
            Error::QueryExecution {
                source: sqlx::Error::RowNotFound,
                ..
            }
        ));
        assert!(query.state().is_empty());
    }

    #[test]
    fn test_insert_get_id_unsupported_executes_nothing() {
        let mut query = QueryBuilder::new(FakeConnection::new(Dialect::MySql));

        let err = query.table("users").insert_get_id([("name", "a")]).unwrap_err();

        assert!(matches!(err, Error::UnsupportedOperation { .. }));
        assert!(query.connection().statements.is_empty());
        assert!(query.state().is_empty());
    }

    #[test]
    fn test_update() {
        let mut query = builder();
        query
            .table("users")
            .where_("users.id", "=", 7)
            .update([("email", "new@example.com")])
            .unwrap();

        let (sql, bindings) = &query.connection().statements[0];
        assert_eq!(sql, "UPDATE users SET email = :email WHERE users.id = :id");
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[":id"], Value::I32(7));
    }

    #[test]
    fn test_update_without_fields_fails_before_execution() {
        let mut query = builder();

        let err = query
            .table("users")
            .where_("id", "=", 1)
            .update(Vec::<(&str, Value)>::new())
            .unwrap_err();

        assert!(matches!(err, Error::InvalidQuery { .. }));
        assert!(query.connection().statements.is_empty());
        assert!(query.state().is_empty());
    }

    #[test]
    fn test_delete() {
        let mut query = builder();
        assert!(query.table("sessions").where_("expired", "=", true).delete().unwrap());
        assert_eq!(
            query.connection().statements[0].0,
            "DELETE FROM sessions WHERE expired = :expired"
        );
    }

    #[test]
    fn test_missing_table() {
        let mut query = builder();
        let err = query.where_("id", "=", 1).get().unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
        assert!(query.state().is_empty());
    }

    #[test]
    fn test_failure_resets_and_carries_sql() {
        let mut query = builder();
        query.connection_mut().fail = true;

        let err = query
            .table("users")
            .join("orders", "orders.user_id", "=", "users.id")
            .where_("users.id", "=", 1)
            .get()
            .unwrap_err();

        assert_eq!(
            err.sql(),
            Some("SELECT * FROM users JOIN orders ON orders.user_id = users.id WHERE users.id = :id")
        );
        assert!(query.state().is_empty());

        // The next statement on the same instance sees none of the previous clauses
        query.connection_mut().fail = false;
        query.table("posts").get().unwrap();
        let (sql, bindings) = query.connection().statements.last().unwrap();
        assert_eq!(sql, "SELECT * FROM posts");
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_get_as() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct User {
            id: i64,
            name: String,
        }

        let mut query = builder();
        query.connection_mut().rows = vec![Row::from([
            ("id".to_string(), Value::I64(1)),
            ("name".to_string(), Value::from("Ada")),
        ])];

        let users: Vec<User> = query.table("users").get_as().unwrap();
        assert_eq!(
            users,
            vec![User {
                id: 1,
                name: "Ada".to_string()
            }]
        );
    }

    #[test]
    fn test_transactions_leave_state_alone() {
        let mut query = builder();
        query.table("users").where_("id", "=", 1);

        query.begin().unwrap();
        query.commit().unwrap();
        query.begin().unwrap();
        query.rollback().unwrap();

        assert_eq!(
            query.connection().transactions,
            vec!["BEGIN", "COMMIT", "BEGIN", "ROLLBACK"]
        );
        assert_eq!(query.state().table, "users");
        assert_eq!(query.state().wheres.len(), 1);
    }

    #[test]
    fn test_update_same_column_in_set_and_where_shares_key() {
        let mut query = builder();
        query
            .table("orders")
            .where_("status", "=", "old")
            .update([("status", "new")])
            .unwrap();

        // One key for both placeholders: the SET value replaces the filter value
        let (sql, bindings) = &query.connection().statements[0];
        assert_eq!(sql, "UPDATE orders SET status = :status WHERE status = :status");
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[":status"], Value::from("new"));
    }

    #[test]
    fn test_where_with_runtime_operator() {
        let filters = vec![
            ("age".to_string(), ">=".to_string(), Value::I32(18)),
            ("tags".to_string(), "@>".to_string(), Value::from("{rust}")),
        ];

        let mut query = builder();
        query.table("users");
        for (column, operator, value) in filters {
            query.where_(&column, operator, value);
        }

        assert_eq!(
            query.to_sql(StatementKind::Select).unwrap(),
            "SELECT * FROM users WHERE age >= :age AND tags @> :tags"
        );
    }

    #[test]
    fn test_execute_classifies_by_kind() {
        let mut query = builder();
        query.connection_mut().rows = vec![Row::from([("id".to_string(), Value::I64(3))])];
        query.table("users").where_("id", "=", 3);
        let select = query.compile(StatementKind::Select).unwrap();

        let result = query.execute(&select).unwrap();
        assert_eq!(result.rows_affected(), None);
        assert_eq!(result.into_rows().map(|rows| rows.len()), Some(1));

        let delete = query.compile(StatementKind::Delete).unwrap();
        let result = query.execute(&delete).unwrap();
        assert_eq!(result.rows_affected(), Some(1));
        assert_eq!(result.inserted_id(), None);
        assert_eq!(result.into_rows(), None);
    }
}
