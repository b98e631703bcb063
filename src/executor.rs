//! `LifeExecutor` - the connection capability the migrator runs on.
//!
//! Catalog queries select every column as text, so rows come back as
//! [`CatalogRow`] values that any executor (a live `may_postgres` client, a
//! dry-run writer, or the in-memory fake catalog used by tests) can produce.

use may_postgres::types::ToSql;
use may_postgres::{Client, Error as PostgresError, Row};
use std::fmt;
use std::time::Instant;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// `LifeExecutor` error type
#[derive(Debug)]
pub enum LifeError {
    /// `PostgreSQL` error from `may_postgres`
    PostgresError(PostgresError),
    /// Query execution error
    QueryError(String),
    /// Row parsing/conversion error
    ParseError(String),
    /// Other execution errors
    Other(String),
}

impl fmt::Display for LifeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifeError::PostgresError(e) => {
                write!(f, "PostgreSQL error: {e}")
            }
            LifeError::QueryError(s) => {
                write!(f, "Query error: {s}")
            }
            LifeError::ParseError(s) => {
                write!(f, "Parse error: {s}")
            }
            LifeError::Other(s) => {
                write!(f, "Execution error: {s}")
            }
        }
    }
}

impl std::error::Error for LifeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LifeError::PostgresError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PostgresError> for LifeError {
    fn from(err: PostgresError) -> Self {
        LifeError::PostgresError(err)
    }
}

/// A catalog row with every column rendered as optional text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRow {
    values: Vec<Option<String>>,
}

impl CatalogRow {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value at `idx`; `None` for SQL NULL or an out-of-range index.
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }

    /// Non-null text value at `idx`.
    pub fn text(&self, idx: usize) -> Result<&str, LifeError> {
        match self.values.get(idx) {
            Some(Some(v)) => Ok(v),
            Some(None) => Err(LifeError::ParseError(format!("column {idx} is NULL"))),
            None => Err(LifeError::ParseError(format!(
                "column {idx} out of range for row with {} columns",
                self.values.len()
            ))),
        }
    }

    /// Nullable integer value at `idx`.
    pub fn opt_i64(&self, idx: usize) -> Result<Option<i64>, LifeError> {
        match self.get(idx) {
            None => Ok(None),
            Some(v) => v
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|e| LifeError::ParseError(format!("column {idx}: {v:?} is not an integer: {e}"))),
        }
    }

    /// Boolean value at `idx`; accepts PostgreSQL's text renderings.
    pub fn bool(&self, idx: usize) -> Result<bool, LifeError> {
        let v = self.text(idx)?;
        match v.to_ascii_lowercase().as_str() {
            "t" | "true" | "yes" | "on" | "1" => Ok(true),
            "f" | "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(LifeError::ParseError(format!("column {idx}: {v:?} is not a boolean"))),
        }
    }
}

impl<S: Into<String>> From<Vec<Option<S>>> for CatalogRow {
    fn from(values: Vec<Option<S>>) -> Self {
        Self::new(values.into_iter().map(|v| v.map(Into::into)).collect())
    }
}

/// Trait for executing database operations
///
/// The migrator depends on this trait only, so a live connection, a dry-run
/// writer and test doubles are interchangeable. Parameters are text values
/// bound positionally as `$1`, `$2`, ...
pub trait LifeExecutor {
    /// Execute a statement and return the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the statement is rejected.
    fn execute(&self, query: &str, params: &[&str]) -> Result<u64, LifeError>;

    /// Run a query and return every row, fully drained.
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query fails or a value cannot be read as text.
    fn query_all(&self, query: &str, params: &[&str]) -> Result<Vec<CatalogRow>, LifeError>;

    /// Run a query expected to return exactly one row.
    fn query_one(&self, query: &str, params: &[&str]) -> Result<CatalogRow, LifeError> {
        let mut rows = self.query_all(query, params)?;
        match rows.len() {
            1 => Ok(rows.remove(0)),
            n => Err(LifeError::QueryError(format!("expected one row, query returned {n}"))),
        }
    }
}

impl<E: LifeExecutor + ?Sized> LifeExecutor for &E {
    fn execute(&self, query: &str, params: &[&str]) -> Result<u64, LifeError> {
        (**self).execute(query, params)
    }

    fn query_all(&self, query: &str, params: &[&str]) -> Result<Vec<CatalogRow>, LifeError> {
        (**self).query_all(query, params)
    }
}

/// Implementation of `LifeExecutor` for `may_postgres::Client`
pub struct MayPostgresExecutor {
    client: Client,
}

impl MayPostgresExecutor {
    /// Create a new executor from a `may_postgres::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Consume the executor and return the underlying client
    pub fn into_client(self) -> Client {
        self.client
    }
}

fn bind<'a>(params: &'a [&'a str]) -> Vec<&'a dyn ToSql> {
    params.iter().map(|p| p as &dyn ToSql).collect()
}

fn to_catalog_row(row: &Row) -> Result<CatalogRow, LifeError> {
    let mut values = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        let value = row
            .try_get::<usize, Option<String>>(idx)
            .map_err(|e| LifeError::ParseError(format!("column {idx} is not text: {e}")))?;
        values.push(value);
    }
    Ok(CatalogRow::new(values))
}

impl LifeExecutor for MayPostgresExecutor {
    fn execute(&self, query: &str, params: &[&str]) -> Result<u64, LifeError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(query).entered();

        let start = Instant::now();
        let result = self.client.execute(query, &bind(params)).map_err(|e| {
            #[cfg(feature = "metrics")]
            METRICS.record_query_error();
            LifeError::PostgresError(e)
        });

        let duration = start.elapsed();
        #[cfg(feature = "metrics")]
        METRICS.record_query_duration(duration);
        log::trace!("executed in {duration:?}: {query}");

        result
    }

    fn query_all(&self, query: &str, params: &[&str]) -> Result<Vec<CatalogRow>, LifeError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(query).entered();

        let start = Instant::now();
        let rows = self.client.query(query, &bind(params)).map_err(|e| {
            #[cfg(feature = "metrics")]
            METRICS.record_query_error();
            LifeError::PostgresError(e)
        })?;

        let duration = start.elapsed();
        #[cfg(feature = "metrics")]
        METRICS.record_query_duration(duration);
        log::trace!("queried {} rows in {duration:?}", rows.len());

        rows.iter().map(to_catalog_row).collect()
    }
}
