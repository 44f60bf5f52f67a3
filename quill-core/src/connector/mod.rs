//! The database connection the builder executes against.
//!
//! [`Connector`] owns exactly one native connection, opened on first use and
//! kept for the connector's lifetime. There is no pool and no retry. The public
//! API blocks: the connector drives the async driver on a private
//! current-thread runtime, so it must not be called from inside an async task.

mod bind;
mod row;

use sqlx::AnyConnection;
use sqlx::{Connection as _, Executor as _};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::builder::Bindings;
use crate::{ConnectionConfig, Dialect, Error, Result, Row};

/// A live connection a builder can run statements on.
///
/// Statements arrive with named `:key` placeholders and their bindings.
/// Errors from the driver are returned as [`Error::Database`]; the builder
/// attaches the statement text.
pub trait Connection {
    /// The dialect statements should be compiled for
    fn dialect(&self) -> Dialect;

    /// Run a statement that returns no rows, returning the affected row count
    fn execute(&mut self, sql: &str, bindings: &Bindings) -> Result<u64>;

    /// Run a statement and collect every row it returns
    fn fetch_all(&mut self, sql: &str, bindings: &Bindings) -> Result<Vec<Row>>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}

/// Lazily opened connection backed by `sqlx`'s `Any` driver
pub struct Connector {
    config: ConnectionConfig,
    dialect: Dialect,
    // dropped before the runtime that drives it
    conn: Option<AnyConnection>,
    runtime: Runtime,
}

impl Connector {
    /// Validate `config` and prepare a connector. Nothing is opened yet.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let dialect = config.dialect()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::connection(format!("could not start driver runtime: {e}")))?;

        Ok(Self {
            config,
            dialect,
            conn: None,
            runtime,
        })
    }

    /// Build a connector from `DB_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ConnectionConfig::from_env()?)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// The live native handle, opened on the first call.
    pub fn connection(&mut self) -> Result<&mut AnyConnection> {
        self.live().map(|(_, conn)| conn)
    }

    fn live(&mut self) -> Result<(&Runtime, &mut AnyConnection)> {
        if self.conn.is_none() {
            self.open()?;
        }

        match self.conn.as_mut() {
            Some(conn) => Ok((&self.runtime, conn)),
            None => Err(Error::connection("connection unavailable")),
        }
    }

    fn open(&mut self) -> Result<()> {
        sqlx::any::install_default_drivers();

        let dsn = self.config.dsn();
        let url = self.config.url()?;
        let conn = self
            .runtime
            .block_on(AnyConnection::connect(&url))
            .map_err(|e| Error::connection_failed(format!("could not connect to {dsn}"), e))?;

        info!(dsn = %dsn, "database connection established");
        self.conn = Some(conn);
        Ok(())
    }

    fn raw(&mut self, statement: &'static str) -> Result<()> {
        let (runtime, conn) = self.live()?;
        debug!(statement, "transaction control");
        runtime
            .block_on(conn.execute(statement))
            .map_err(|e| Error::Database(e).with_sql(statement))?;
        Ok(())
    }
}

impl Connection for Connector {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(&mut self, sql: &str, bindings: &Bindings) -> Result<u64> {
        let dialect = self.dialect;
        let (sql, params) = bind::to_positional(sql, bindings, dialect)?;
        let (runtime, conn) = self.live()?;

        let query = row::bind_values(sqlx::query(&sql), &params);
        let result = runtime.block_on(query.execute(conn))?;
        Ok(result.rows_affected())
    }

    fn fetch_all(&mut self, sql: &str, bindings: &Bindings) -> Result<Vec<Row>> {
        let dialect = self.dialect;
        let (sql, params) = bind::to_positional(sql, bindings, dialect)?;
        let (runtime, conn) = self.live()?;

        let query = row::bind_values(sqlx::query(&sql), &params);
        let rows = runtime.block_on(query.fetch_all(conn))?;
        rows.iter().map(row::decode_row).collect()
    }

    fn begin(&mut self) -> Result<()> {
        self.raw("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.raw("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.raw("ROLLBACK")
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("config", &self.config)
            .field("dialect", &self.dialect)
            .field("connected", &self.is_connected())
            .finish()
    }
}
