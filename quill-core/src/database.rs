//! A shared entry point holding one builder.
//!
//! [`Database`] is created once by the application and passed around by
//! reference. Each statement locks the builder for as long as the returned
//! [`QueryGuard`] lives, so two callers chaining clauses at the same time are
//! serialized instead of mixing their clauses.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::connector::{Connection, Connector};
use crate::{ConnectionConfig, QueryBuilder, Result};

pub struct Database<C: Connection = Connector> {
    builder: Mutex<QueryBuilder<C>>,
}

/// Exclusive access to the shared builder for one chained statement
pub struct QueryGuard<'a, C: Connection> {
    guard: MutexGuard<'a, QueryBuilder<C>>,
}

impl<C: Connection> Deref for QueryGuard<'_, C> {
    type Target = QueryBuilder<C>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<C: Connection> DerefMut for QueryGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl Database<Connector> {
    /// Prepare a database for `config`; the connection opens on first use
    pub fn connect(config: ConnectionConfig) -> Result<Self> {
        Ok(Self::new(Connector::new(config)?))
    }
}

impl<C: Connection> Database<C> {
    pub fn new(connection: C) -> Self {
        Self::from_builder(QueryBuilder::new(connection))
    }

    pub fn from_builder(builder: QueryBuilder<C>) -> Self {
        Self {
            builder: Mutex::new(builder),
        }
    }

    /// Lock the builder.
    ///
    /// A builder whose previous holder panicked mid-chain is handed out reset.
    pub fn query(&self) -> QueryGuard<'_, C> {
        let guard = self.builder.lock().unwrap_or_else(|poisoned| {
            let mut guard = PoisonError::into_inner(poisoned);
            guard.reset();
            guard
        });
        QueryGuard { guard }
    }

    /// Lock the builder and start a statement on `name`
    ///
    /// # Examples
    /// ```no_run
    /// use quill_core::{ConnectionConfig, Database};
    ///
    /// let db = Database::connect(ConnectionConfig::sqlite_memory())?;
    /// let rows = db.table("users").where_("id", "=", 5).get()?;
    /// # Ok::<(), quill_core::Error>(())
    /// ```
    pub fn table(&self, name: &str) -> QueryGuard<'_, C> {
        let mut guard = self.query();
        guard.table(name);
        guard
    }

    pub fn begin(&self) -> Result<()> {
        self.query().begin()
    }

    pub fn commit(&self) -> Result<()> {
        self.query().commit()
    }

    pub fn rollback(&self) -> Result<()> {
        self.query().rollback()
    }

    pub fn into_inner(self) -> QueryBuilder<C> {
        self.builder
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeConnection;
    use crate::{Dialect, Value};

    #[test]
    fn test_table_chain() {
        let db = Database::new(FakeConnection::new(Dialect::Sqlite));

        db.table("users").where_("id", "=", 5).get().unwrap();
        db.table("users").insert([("name", "Ada")]).unwrap();

        let builder = db.into_inner();
        let statements = &builder.connection().statements;
        assert_eq!(statements[0].0, "SELECT * FROM users WHERE id = :id");
        assert_eq!(statements[1].0, "INSERT INTO users (name) VALUES (:name)");
        assert!(builder.state().is_empty());
    }

    #[test]
    fn test_transactions_forwarded() {
        let db = Database::new(FakeConnection::new(Dialect::Postgres));
        db.begin().unwrap();
        db.rollback().unwrap();

        assert_eq!(
            db.into_inner().connection().transactions,
            vec!["BEGIN", "ROLLBACK"]
        );
    }

    #[test]
    fn test_concurrent_callers_do_not_mix_clauses() {
        let db = Database::new(FakeConnection::new(Dialect::Postgres));

        std::thread::scope(|scope| {
            for i in 0..4i64 {
                let db = &db;
                scope.spawn(move || {
                    for _ in 0..25 {
                        db.table(&format!("t{i}"))
                            .where_("id", "=", i)
                            .where_("flag", "=", true)
                            .get()
                            .unwrap();
                    }
                });
            }
        });

        let builder = db.into_inner();
        let statements = &builder.connection().statements;
        assert_eq!(statements.len(), 100);
        for (sql, bindings) in statements {
            let id = bindings[":id"].as_i64().unwrap();
            assert_eq!(
                sql,
                &format!("SELECT * FROM t{id} WHERE id = :id AND flag = :flag")
            );
            assert_eq!(bindings[":flag"], Value::Bool(true));
        }
    }
}
