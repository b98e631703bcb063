//! # Undertow
//!
//! Declarative schema migration for PostgreSQL on the `may` runtime.
//!
//! Describe the tables you want, and [`Migrator`] reads the live catalog,
//! diffs every table and runs the DDL that closes the gap: structure first,
//! foreign keys once every table exists. The same statements can be written
//! to any `std::io::Write` sink instead with [`migration::WriteDriver`].

pub mod config;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod identifier;
pub mod metrics;
pub mod migration;
pub mod schema;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod transaction;

pub use config::MigrateOptions;
pub use connection::{connect, connect_executor, ConnectionError};
pub use dialect::{Dialect, Postgres, ServerVersion};
pub use error::{ErrorKind, Result, ResultExt, SchemaError};
pub use executor::{CatalogRow, LifeError, LifeExecutor, MayPostgresExecutor};
pub use migration::{MigrationReport, Migrator};
pub use schema::{CheckConstraint, Column, ColumnType, DefaultValue, ForeignKey, Index, ReferenceOption, Table};
