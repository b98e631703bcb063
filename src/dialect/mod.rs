//! Dialect capability: everything that depends on the database product.
//!
//! A migration run selects one [`Dialect`] value up front; the engine never
//! branches on the product after that. Catalog reads take the connection
//! capability, statement generation is pure.

pub mod postgres;

pub use postgres::Postgres;

use crate::error::Result;
use crate::executor::LifeExecutor;
use crate::schema::{Column, DefaultValue, ForeignKey, Index, Table};
use std::fmt;

/// Three-part server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Catalog introspection and DDL generation for one database product.
pub trait Dialect {
    /// Key used in [`Column::schema_type`] overrides.
    fn name(&self) -> &'static str;

    /// Read the server version and reject servers below the supported floor.
    fn init(&mut self, conn: &dyn LifeExecutor) -> Result<ServerVersion>;

    fn table_exists(&self, conn: &dyn LifeExecutor, table: &str) -> Result<bool>;

    fn foreign_key_exists(&self, conn: &dyn LifeExecutor, symbol: &str) -> Result<bool>;

    /// Whether `name` is a uniqueness constraint rather than a plain index.
    fn unique_constraint_exists(&self, conn: &dyn LifeExecutor, name: &str) -> Result<bool>;

    /// Local columns of an existing foreign-key constraint, in key order.
    fn foreign_key_columns(&self, conn: &dyn LifeExecutor, table: &str, symbol: &str) -> Result<Vec<String>>;

    /// Columns, primary key and indexes of a live table.
    fn introspect_table(&self, conn: &dyn LifeExecutor, table: &str) -> Result<Table>;

    /// Fill `foreign_keys` on every table; references resolve within `tables`.
    fn introspect_foreign_keys(&self, conn: &dyn LifeExecutor, tables: &mut [Table]) -> Result<()>;

    fn create_table_statement(&self, table: &Table) -> Result<String>;

    fn column_definition(&self, column: &Column) -> Result<String>;

    /// One ALTER TABLE covering every column change, or `None` when there is nothing to do.
    fn alter_column_statements(
        &self,
        table: &str,
        add: &[Column],
        modify: &[Column],
        drop: &[Column],
    ) -> Result<Option<String>>;

    fn create_index_statement(&self, index: &Index, table: &str) -> Result<String>;

    /// Drop a live index; constraint-backed indexes go through the constraint.
    fn drop_index_statement(&self, index: &Index, table: &str, is_constraint: bool) -> Result<String>;

    fn rename_column_statement(&self, table: &str, from: &str, to: &str) -> Result<String>;

    /// Rename the live index `from` so it is found as `to` on the next read.
    fn rename_index_statement(&self, table: &str, from: &Index, to: &Index) -> Result<String>;

    fn set_primary_key_sequence_start(&self, table: &Table, value: u64) -> Result<String>;

    fn add_foreign_keys_statement(&self, table: &str, fks: &[ForeignKey]) -> Result<String>;

    /// Native type for a column; overrides win.
    fn column_type(&self, column: &Column) -> Result<String>;

    /// Whether moving `live` to `target` requires a type change.
    fn needs_conversion(&self, live: &Column, target: &Column) -> Result<bool>;

    /// Whether the live default already satisfies the target default.
    fn defaults_match(&self, live: &DefaultValue, target: &DefaultValue) -> bool;

    /// Whether `index` is the one the server creates for a UNIQUE column.
    fn is_implicit_index(&self, index: &Index, column: &Column) -> bool;

    /// Catalog name a target index is stored under.
    fn index_storage_name(&self, index: &Index, table: &str) -> String;

    /// Logical name recovered from a catalog index name.
    fn live_index_name(&self, catalog_name: &str, table: &str, columns: &[String]) -> String;

    /// Spell out native types an introspected table only carries implicitly,
    /// so the table can be fed back in as a target.
    fn pin_native_types(&self, table: &mut Table) -> Result<()>;
}
