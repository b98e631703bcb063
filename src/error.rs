//! Error taxonomy for schema migration runs.
//!
//! Every failure aborts the run. Errors are wrapped with the operation that
//! produced them (table, column, statement) through [`SchemaError::context`],
//! and the underlying category stays reachable through [`SchemaError::kind`].

use crate::executor::LifeError;
use thiserror::Error;

/// Errors produced while introspecting, diffing or applying a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// I/O failure reported by the driver while running a catalog query.
    #[error("connection error: {0}")]
    Connection(#[from] LifeError),

    /// The server is older than the minimum version the dialect supports.
    #[error("unsupported {dialect} version: {version} (minimum supported is {minimum})")]
    UnsupportedVersion {
        dialect: &'static str,
        version: String,
        minimum: String,
    },

    /// Malformed catalog row, or a reference to a table/column that was not loaded.
    #[error("introspecting table {table:?}: {message}")]
    Introspection { table: String, message: String },

    /// A generated statement was rejected by the server.
    #[error("executing `{statement}`: {source}")]
    Ddl {
        statement: String,
        #[source]
        source: LifeError,
    },

    /// Contradictory or unsupported option combination, or an invalid target model.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The live schema cannot be moved to the target without an unsupported change.
    #[error("cannot migrate table {table:?}: {message}")]
    Diff { table: String, message: String },

    /// Writing dry-run output failed.
    #[error("writing statements: {0}")]
    Io(#[from] std::io::Error),

    /// Any of the above, annotated with the operation that failed.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<SchemaError>,
    },
}

/// Coarse error category, independent of how many context layers wrap it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    UnsupportedVersion,
    Introspection,
    Ddl,
    Configuration,
    Diff,
    Io,
}

impl SchemaError {
    pub fn introspection(table: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Introspection {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        SchemaError::Configuration(message.into())
    }

    pub fn diff(table: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Diff {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Wrap this error with a description of the operation that failed.
    pub fn context(self, context: impl Into<String>) -> Self {
        SchemaError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The category of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::Connection(_) => ErrorKind::Connection,
            SchemaError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            SchemaError::Introspection { .. } => ErrorKind::Introspection,
            SchemaError::Ddl { .. } => ErrorKind::Ddl,
            SchemaError::Configuration(_) => ErrorKind::Configuration,
            SchemaError::Diff { .. } => ErrorKind::Diff,
            SchemaError::Io(_) => ErrorKind::Io,
            SchemaError::Context { source, .. } => source.kind(),
        }
    }
}

/// Attach operation context to fallible results.
pub trait ResultExt<T> {
    fn context<C, F>(self, f: F) -> Result<T, SchemaError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> ResultExt<T> for Result<T, SchemaError> {
    fn context<C, F>(self, f: F) -> Result<T, SchemaError>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.context(f()))
    }
}

/// Result alias used across the crate.
pub type Result<T, E = SchemaError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_survives_context_layers() {
        let err = SchemaError::configuration("universal ids need a single-column key")
            .context("validating table \"pets\"")
            .context("migrating schema");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let msg = err.to_string();
        assert!(msg.starts_with("migrating schema"));
    }

    #[test]
    fn test_result_ext_wraps_errors_only() {
        let ok: Result<u8> = Ok(1);
        assert_eq!(ok.context(|| "never used").unwrap(), 1);

        let err: Result<u8> = Err(SchemaError::introspection("users", "missing column"));
        let err = err.context(|| "reading \"users\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Introspection);
        assert!(err.to_string().contains("reading \"users\""));
    }

    #[test]
    fn test_ddl_display_includes_statement() {
        let err = SchemaError::Ddl {
            statement: "DROP INDEX \"users_name\"".to_string(),
            source: LifeError::QueryError("index does not exist".to_string()),
        };
        let display = err.to_string();
        assert!(display.contains("DROP INDEX"));
        assert!(display.contains("index does not exist"));
        assert_eq!(err.kind(), ErrorKind::Ddl);
    }
}
