//! Connection configuration

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Dialect, Error, Result};

/// Everything needed to open a connection.
///
/// Deserializes from any serde format, so it can sit inside an application's
/// own config file:
///
/// ```
/// use quill_core::ConnectionConfig;
///
/// let config: ConnectionConfig = serde_json::from_str(
///     r#"{"driver": "pgsql", "host": "localhost", "port": 5432, "dbname": "app"}"#,
/// ).unwrap();
/// assert_eq!(config.dsn(), "pgsql:host=localhost;port=5432;dbname=app;");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub driver: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    pub dbname: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Driver-specific options, passed through as URL query parameters
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ConnectionConfig {
    pub fn new(driver: impl Into<String>, dbname: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            host: None,
            port: None,
            dbname: dbname.into(),
            user: None,
            password: None,
            options: BTreeMap::new(),
        }
    }

    /// An in-memory SQLite database
    pub fn sqlite_memory() -> Self {
        Self::new("sqlite", ":memory:")
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Load from `DB_CONNECTION`, `DB_HOST`, `DB_PORT`, `DB_DATABASE`,
    /// `DB_USERNAME` and `DB_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| Error::connection(format!("missing configuration key '{key}'")))
        };

        let port = match lookup("DB_PORT") {
            Some(raw) => Some(raw.parse::<u16>().map_err(|_| {
                Error::connection(format!("invalid DB_PORT '{raw}'"))
            })?),
            None => None,
        };

        Ok(Self {
            driver: required("DB_CONNECTION")?,
            host: lookup("DB_HOST"),
            port,
            dbname: required("DB_DATABASE")?,
            user: lookup("DB_USERNAME"),
            password: lookup("DB_PASSWORD"),
            options: BTreeMap::new(),
        })
    }

    /// The dialect named by `driver`
    pub fn dialect(&self) -> Result<Dialect> {
        Dialect::from_driver(&self.driver)
            .ok_or_else(|| Error::connection(format!("unknown driver '{}'", self.driver)))
    }

    /// Check that every key the dialect needs is present.
    pub fn validate(&self) -> Result<()> {
        let dialect = self.dialect()?;

        if self.dbname.is_empty() {
            return Err(Error::connection("missing configuration key 'dbname'"));
        }

        if dialect != Dialect::Sqlite && self.host.as_deref().map_or(true, str::is_empty) {
            return Err(Error::connection("missing configuration key 'host'"));
        }

        Ok(())
    }

    /// The data source name: `<driver>:host=<host>;port=<port>;dbname=<dbname>;`
    pub fn dsn(&self) -> String {
        let port = self
            .port
            .or_else(|| self.dialect().ok().and_then(|d| d.default_port()))
            .map(|p| p.to_string())
            .unwrap_or_default();

        format!(
            "{}:host={};port={};dbname={};",
            self.driver,
            self.host.as_deref().unwrap_or_default(),
            port,
            self.dbname
        )
    }

    /// The URL handed to the driver. Contains credentials: never log it.
    pub fn url(&self) -> Result<String> {
        let dialect = self.dialect()?;

        if dialect == Dialect::Sqlite {
            let mut url = format!("sqlite:{}", self.dbname);
            if !self.options.is_empty() {
                let mut query = url::form_urlencoded::Serializer::new(String::new());
                query.extend_pairs(&self.options);
                url.push('?');
                url.push_str(&query.finish());
            }
            return Ok(url);
        }

        let host = self.host.as_deref().unwrap_or_default();
        let invalid = |what: &str| Error::connection(format!("invalid {what} in configuration"));

        let mut url = Url::parse(&format!("{}://{}", dialect.scheme(), host))
            .map_err(|_| invalid("host"))?;
        url.set_port(self.port.or(dialect.default_port()))
            .map_err(|_| invalid("port"))?;
        if let Some(user) = &self.user {
            url.set_username(user).map_err(|_| invalid("user"))?;
        }
        if let Some(password) = &self.password {
            url.set_password(Some(password))
                .map_err(|_| invalid("password"))?;
        }
        url.set_path(&format!("/{}", self.dbname));
        if !self.options.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.options);
        }

        Ok(url.to_string())
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("options", &self.options)
            .finish()
    }
}
