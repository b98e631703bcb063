//! Reads live tables through a dialect and settles key information.

use crate::dialect::Dialect;
use crate::error::{Result, ResultExt, SchemaError};
use crate::executor::LifeExecutor;
use crate::schema::Table;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// Live schema reader.
pub struct Introspector<'a, D: Dialect + ?Sized> {
    dialect: &'a D,
    conn: &'a dyn LifeExecutor,
}

impl<'a, D: Dialect + ?Sized> Introspector<'a, D> {
    pub fn new(dialect: &'a D, conn: &'a dyn LifeExecutor) -> Self {
        Self { dialect, conn }
    }

    /// Columns, primary key and indexes of one table. Foreign keys are not
    /// read here; see [`Introspector::tables`].
    pub fn table(&self, name: &str) -> Result<Table> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::introspect_table_span(name).entered();

        let mut table = self
            .dialect
            .introspect_table(self.conn, name)
            .context(|| format!("reading table {name:?}"))?;
        settle_keys(&mut table)?;

        #[cfg(feature = "metrics")]
        METRICS.record_table_introspected();
        log::debug!(
            "read {name:?}: {} columns, {} indexes",
            table.columns.len(),
            table.indexes.len()
        );
        Ok(table)
    }

    /// Several tables, then the foreign-key pass across all of them.
    pub fn tables<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Table>> {
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if !self.dialect.table_exists(self.conn, name)? {
                return Err(SchemaError::introspection(name, "table does not exist"));
            }
            tables.push(self.table(name)?);
        }
        self.dialect
            .introspect_foreign_keys(self.conn, &mut tables)
            .context(|| "reading foreign keys")?;
        Ok(tables)
    }

    /// Like [`Introspector::tables`], with every native type pinned so the
    /// result works as a target schema file.
    pub fn export<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Table>> {
        let mut tables = self.tables(names)?;
        for table in &mut tables {
            self.dialect.pin_native_types(table)?;
        }
        Ok(tables)
    }
}

/// Promote primary-index columns into the primary key and mark columns
/// covered by a single-column unique index.
///
/// The primary index leaves the index list; unique indexes stay in it.
pub fn settle_keys(table: &mut Table) -> Result<()> {
    let table_name = table.name.clone();
    let indexes = std::mem::take(&mut table.indexes);
    for idx in indexes {
        if idx.primary {
            for name in &idx.columns {
                if !table.has_column(name) {
                    return Err(SchemaError::introspection(
                        &table_name,
                        format!("primary index {:?} uses unknown column {name:?}", idx.storage_name()),
                    ));
                }
                table.primary_key.push(name.clone());
            }
            continue;
        }
        if idx.unique && idx.columns.len() == 1 {
            let name = &idx.columns[0];
            let column = table.column_mut(name).ok_or_else(|| {
                SchemaError::introspection(
                    &table_name,
                    format!("index {:?} uses unknown column {name:?}", idx.storage_name()),
                )
            })?;
            column.unique = true;
        }
        table.indexes.push(idx);
    }
    Ok(())
}
