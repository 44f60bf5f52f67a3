//! In-memory connection used by unit tests

use crate::builder::Bindings;
use crate::connector::Connection;
use crate::{Dialect, Error, Result, Row};

/// Records every statement instead of running it
#[derive(Debug)]
pub(crate) struct FakeConnection {
    pub dialect: Dialect,
    pub statements: Vec<(String, Bindings)>,
    pub transactions: Vec<&'static str>,
    /// Returned by every `fetch_all`
    pub rows: Vec<Row>,
    pub fail: bool,
}

impl FakeConnection {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            statements: Vec::new(),
            transactions: Vec::new(),
            rows: Vec::new(),
            fail: false,
        }
    }

    fn record(&mut self, sql: &str, bindings: &Bindings) -> Result<()> {
        self.statements.push((sql.to_string(), bindings.clone()));
        if self.fail {
            return Err(Error::Database(sqlx::Error::Protocol(
                "simulated failure".to_string(),
            )));
        }
        Ok(())
    }
}

impl Connection for FakeConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(&mut self, sql: &str, bindings: &Bindings) -> Result<u64> {
        self.record(sql, bindings)?;
        Ok(1)
    }

    fn fetch_all(&mut self, sql: &str, bindings: &Bindings) -> Result<Vec<Row>> {
        self.record(sql, bindings)?;
        Ok(self.rows.clone())
    }

    fn begin(&mut self) -> Result<()> {
        self.transactions.push("BEGIN");
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.transactions.push("COMMIT");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.transactions.push("ROLLBACK");
        Ok(())
    }
}
