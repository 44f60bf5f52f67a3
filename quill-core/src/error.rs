//! Error types for Quill

use thiserror::Error;

use crate::Dialect;

/// The main error type for Quill operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration missing or invalid, or the connection could not be opened
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// Builder state is insufficient to compile a statement
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// The configured dialect lacks a feature the statement needs
    #[error("Unsupported operation: {operation} is not available for {dialect}")]
    UnsupportedOperation {
        operation: &'static str,
        dialect: Dialect,
    },

    /// The driver rejected or failed the statement
    #[error("Query execution failed: {source}. Sql Query: {sql}")]
    QueryExecution {
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    /// Driver error not yet tied to a statement
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience Result type for Quill operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new connection error without an underlying driver error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new connection error wrapping the driver's failure
    pub fn connection_failed(message: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a new invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create a new unsupported operation error
    pub fn unsupported(operation: &'static str, dialect: Dialect) -> Self {
        Self::UnsupportedOperation { operation, dialect }
    }

    /// Attach the failing SQL text to a raw driver error.
    ///
    /// Errors that are not driver errors pass through unchanged.
    pub(crate) fn with_sql(self, sql: &str) -> Self {
        match self {
            Self::Database(source) => Self::QueryExecution {
                sql: sql.to_string(),
                source,
            },
            other => other,
        }
    }

    /// The SQL text of a failed statement, if this error carries one
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::QueryExecution { sql, .. } => Some(sql),
            _ => None,
        }
    }
}
