//! PostgreSQL dialect (server 10 and later).

pub(crate) mod queries;
pub mod typemap;

use super::{Dialect, ServerVersion};
use crate::config::MigrateOptions;
use crate::error::{Result, SchemaError};
use crate::executor::{LifeError, LifeExecutor};
use crate::identifier::{quote, quote_list, symbol, validate_check_expr};
use crate::schema::{Column, DefaultValue, ForeignKey, Index, ReferenceOption, Table};
use typemap::{ColumnDescription, MAX_CHAR_SIZE};

/// Oldest supported server.
pub const MINIMUM_VERSION: ServerVersion = ServerVersion::new(10, 0, 0);

/// Parse `server_version_num` (`150002` is 15.0.2, `90624` is 9.6.24).
pub fn parse_server_version(raw: &str) -> Option<ServerVersion> {
    let n: u32 = raw.trim().parse().ok()?;
    if n < 10_000 {
        return None;
    }
    Some(ServerVersion::new(n / 10_000, (n / 100) % 100, n % 100))
}

/// PostgreSQL catalog reader and DDL writer.
#[derive(Debug, Clone)]
pub struct Postgres {
    schema: Option<String>,
    max_char_size: u64,
    version: Option<ServerVersion>,
}

impl Default for Postgres {
    fn default() -> Self {
        Self {
            schema: None,
            max_char_size: MAX_CHAR_SIZE,
            version: None,
        }
    }
}

impl Postgres {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read this schema instead of `CURRENT_SCHEMA()`.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_max_char_size(mut self, size: u64) -> Self {
        self.max_char_size = size;
        self
    }

    pub fn from_options(options: &MigrateOptions) -> Self {
        Self {
            schema: options.schema.clone(),
            max_char_size: options.max_char_size,
            version: None,
        }
    }

    /// Server version, once [`Dialect::init`] has run.
    pub fn version(&self) -> Option<ServerVersion> {
        self.version
    }

    fn schema(&self) -> Result<&str> {
        self.schema
            .as_deref()
            .ok_or_else(|| SchemaError::configuration("postgres dialect used before init resolved the schema"))
    }

    fn count(&self, conn: &dyn LifeExecutor, query: &str, params: &[&str]) -> Result<bool> {
        let row = conn.query_one(query, params)?;
        let n = row
            .opt_i64(0)
            .map_err(|e| SchemaError::introspection(params.get(1).copied().unwrap_or_default(), e.to_string()))?;
        Ok(n.unwrap_or(0) > 0)
    }

    fn constraint_exists(&self, conn: &dyn LifeExecutor, kind: &str, name: &str) -> Result<bool> {
        let schema = self.schema()?;
        self.count(conn, queries::CONSTRAINT_EXISTS, &[schema, kind, name])
    }

    fn quote_collation(collation: &str) -> Result<String> {
        if collation.is_empty() || collation.contains('"') || collation.contains('\0') {
            return Err(SchemaError::configuration(format!("invalid collation {collation:?}")));
        }
        Ok(format!("\"{collation}\""))
    }

    fn alter_column(&self, c: &Column) -> Result<Vec<String>> {
        let name = quote(&c.name)?;
        let mut ops = vec![format!("ALTER COLUMN {name} TYPE {}", self.column_type(c)?)];
        if c.nullable {
            ops.push(format!("ALTER COLUMN {name} DROP NOT NULL"));
        } else {
            ops.push(format!("ALTER COLUMN {name} SET NOT NULL"));
        }
        if let Some(default) = typemap::render_default(c) {
            ops.push(format!("ALTER COLUMN {name} SET DEFAULT {default}"));
        }
        Ok(ops)
    }

    fn foreign_key_clause(fk: &ForeignKey) -> Result<String> {
        let mut clause = format!(
            "CONSTRAINT {} FOREIGN KEY({}) REFERENCES {}({})",
            quote(&fk.symbol)?,
            quote_list(&fk.columns)?,
            quote(&fk.ref_table)?,
            quote_list(&fk.ref_columns)?
        );
        if let Some(action) = fk.on_update {
            clause.push_str(&format!(" ON UPDATE {action}"));
        }
        if let Some(action) = fk.on_delete {
            clause.push_str(&format!(" ON DELETE {action}"));
        }
        Ok(clause)
    }
}

/// Whether an index name differs from its column-derived name, so it is
/// stored as written rather than behind a `<table>_` prefix.
fn has_unique_name(index: &Index) -> bool {
    let name = index.name.strip_suffix("_key").unwrap_or(&index.name);
    let suffix = index.column_suffix();
    if !name.ends_with(&suffix) {
        return true;
    }
    name != suffix
}

fn introspection_row(table: &str) -> impl Fn(LifeError) -> SchemaError + '_ {
    move |e| SchemaError::introspection(table, format!("malformed catalog row: {e}"))
}

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        typemap::DIALECT
    }

    fn init(&mut self, conn: &dyn LifeExecutor) -> Result<ServerVersion> {
        let row = conn
            .query_one(queries::SERVER_VERSION, &[])
            .map_err(|e| SchemaError::from(e).context("querying server version"))?;
        let raw = row.text(0).map_err(introspection_row("server_version_num"))?;
        let unsupported = |version: String| SchemaError::UnsupportedVersion {
            dialect: "postgres",
            version,
            minimum: MINIMUM_VERSION.to_string(),
        };
        let version = parse_server_version(raw).ok_or_else(|| unsupported(format!("malformed {raw:?}")))?;
        if version < MINIMUM_VERSION {
            return Err(unsupported(version.to_string()));
        }

        if self.schema.is_none() {
            let row = conn
                .query_one(queries::CURRENT_SCHEMA, &[])
                .map_err(|e| SchemaError::from(e).context("resolving the current schema"))?;
            let schema = row.get(0).ok_or_else(|| {
                SchemaError::configuration("search_path selects no schema; set the schema option")
            })?;
            self.schema = Some(schema.to_string());
        }
        log::debug!(
            "postgres {version}, schema {:?}",
            self.schema.as_deref().unwrap_or_default()
        );
        self.version = Some(version);
        Ok(version)
    }

    fn table_exists(&self, conn: &dyn LifeExecutor, table: &str) -> Result<bool> {
        let schema = self.schema()?;
        self.count(conn, queries::TABLE_EXISTS, &[schema, table])
    }

    fn foreign_key_exists(&self, conn: &dyn LifeExecutor, symbol: &str) -> Result<bool> {
        self.constraint_exists(conn, "FOREIGN KEY", symbol)
    }

    fn unique_constraint_exists(&self, conn: &dyn LifeExecutor, name: &str) -> Result<bool> {
        self.constraint_exists(conn, "UNIQUE", name)
    }

    fn foreign_key_columns(&self, conn: &dyn LifeExecutor, table: &str, symbol: &str) -> Result<Vec<String>> {
        let schema = self.schema()?;
        conn.query_all(queries::FOREIGN_KEY_COLUMNS, &[schema, table, symbol])?
            .iter()
            .map(|row| row.text(0).map(str::to_string).map_err(introspection_row(table)))
            .collect()
    }

    fn introspect_table(&self, conn: &dyn LifeExecutor, table: &str) -> Result<Table> {
        let schema = self.schema()?;
        let rows = conn.query_all(queries::COLUMNS, &[schema, table])?;
        if rows.is_empty() {
            return Err(SchemaError::introspection(
                table,
                format!("no columns found in schema {schema:?}"),
            ));
        }
        let mut t = Table::new(table);
        for row in &rows {
            let desc = ColumnDescription::from_row(row).map_err(introspection_row(table))?;
            let column = typemap::scan_column(&desc, self.max_char_size)
                .map_err(|message| SchemaError::introspection(table, message))?;
            t.columns.push(column);
        }

        let rows = conn.query_all(queries::INDEXES, &[schema, table])?;
        let mut indexes: Vec<Index> = Vec::new();
        for row in &rows {
            let read = introspection_row(table);
            let catalog_name = row.text(0).map_err(&read)?;
            let column = row.text(1).map_err(&read)?;
            match indexes.last_mut() {
                Some(idx) if idx.catalog_name.as_deref() == Some(catalog_name) => {
                    idx.columns.push(column.to_string());
                }
                _ => {
                    let mut idx = Index::new(catalog_name, [column]);
                    idx.primary = row.bool(2).map_err(&read)?;
                    idx.unique = row.bool(3).map_err(&read)?;
                    idx.catalog_name = Some(catalog_name.to_string());
                    indexes.push(idx);
                }
            }
        }
        for idx in &mut indexes {
            if let Some(catalog_name) = &idx.catalog_name {
                idx.name = self.live_index_name(catalog_name, table, &idx.columns);
            }
        }
        t.indexes = indexes;
        Ok(t)
    }

    fn introspect_foreign_keys(&self, conn: &dyn LifeExecutor, tables: &mut [Table]) -> Result<()> {
        let schema = self.schema()?;
        for i in 0..tables.len() {
            let table = tables[i].name.clone();
            let rows = conn.query_all(queries::FOREIGN_KEYS, &[schema, table.as_str()])?;
            let mut fks: Vec<ForeignKey> = Vec::new();
            for row in &rows {
                let read = introspection_row(&table);
                let symbol = row.text(0).map_err(&read)?;
                let column = row.text(1).map_err(&read)?;
                let ref_table = row.text(2).map_err(&read)?;
                let ref_column = row.text(3).map_err(&read)?;

                let referenced = tables.iter().find(|t| t.name == ref_table).ok_or_else(|| {
                    SchemaError::introspection(
                        &table,
                        format!("foreign key {symbol:?} references table {ref_table:?}, which was not loaded"),
                    )
                })?;
                if !referenced.has_column(ref_column) {
                    return Err(SchemaError::introspection(
                        &table,
                        format!("foreign key {symbol:?} references unknown column {ref_table}.{ref_column}"),
                    ));
                }
                if !tables[i].has_column(column) {
                    return Err(SchemaError::introspection(
                        &table,
                        format!("foreign key {symbol:?} uses unknown column {column:?}"),
                    ));
                }

                match fks.iter_mut().find(|fk| fk.symbol == symbol) {
                    Some(fk) => {
                        if !fk.column_pairs().any(|pair| pair == (column, ref_column)) {
                            fk.columns.push(column.to_string());
                            fk.ref_columns.push(ref_column.to_string());
                        }
                    }
                    None => {
                        let mut fk = ForeignKey::new(symbol, [column], ref_table, [ref_column]);
                        fk.on_update = row.get(4).and_then(ReferenceOption::from_rule);
                        fk.on_delete = row.get(5).and_then(ReferenceOption::from_rule);
                        fks.push(fk);
                    }
                }
            }
            tables[i].foreign_keys = fks;
        }
        Ok(())
    }

    fn create_table_statement(&self, table: &Table) -> Result<String> {
        let mut parts = table
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect::<Result<Vec<_>>>()?;
        if !table.primary_key.is_empty() {
            parts.push(format!("PRIMARY KEY({})", quote_list(&table.primary_key)?));
        }
        for check in &table.checks {
            validate_check_expr(&check.expr)?;
            match &check.name {
                Some(name) => parts.push(format!("CONSTRAINT {} CHECK ({})", quote(name)?, check.expr)),
                None => parts.push(format!("CHECK ({})", check.expr)),
            }
        }
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {}({})",
            quote(&table.name)?,
            parts.join(", ")
        ))
    }

    fn column_definition(&self, column: &Column) -> Result<String> {
        let mut def = format!("{} {}", quote(&column.name)?, self.column_type(column)?);
        if column.unique {
            def.push_str(" UNIQUE");
        }
        if column.increment {
            def.push_str(" GENERATED BY DEFAULT AS IDENTITY");
        }
        def.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        if let Some(default) = typemap::render_default(column) {
            def.push_str(&format!(" DEFAULT {default}"));
        }
        if let Some(collation) = &column.collation {
            def.push_str(&format!(" COLLATE {}", Self::quote_collation(collation)?));
        }
        Ok(def)
    }

    fn alter_column_statements(
        &self,
        table: &str,
        add: &[Column],
        modify: &[Column],
        drop: &[Column],
    ) -> Result<Option<String>> {
        let mut ops = Vec::new();
        for c in add {
            ops.push(format!("ADD COLUMN {}", self.column_definition(c)?));
        }
        for c in modify {
            ops.extend(self.alter_column(c)?);
        }
        for c in drop {
            ops.push(format!("DROP COLUMN {}", quote(&c.name)?));
        }
        if ops.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!("ALTER TABLE {} {}", quote(table)?, ops.join(", "))))
    }

    fn create_index_statement(&self, index: &Index, table: &str) -> Result<String> {
        let unique = if index.unique { "UNIQUE " } else { "" };
        Ok(format!(
            "CREATE {unique}INDEX IF NOT EXISTS {} ON {}({})",
            quote(&self.index_storage_name(index, table))?,
            quote(table)?,
            quote_list(&index.columns)?
        ))
    }

    fn drop_index_statement(&self, index: &Index, table: &str, is_constraint: bool) -> Result<String> {
        let name = quote(index.storage_name())?;
        if is_constraint {
            Ok(format!("ALTER TABLE {} DROP CONSTRAINT {name}", quote(table)?))
        } else {
            Ok(format!("DROP INDEX {name}"))
        }
    }

    fn rename_column_statement(&self, table: &str, from: &str, to: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            quote(table)?,
            quote(from)?,
            quote(to)?
        ))
    }

    fn rename_index_statement(&self, table: &str, from: &Index, to: &Index) -> Result<String> {
        let old = from.storage_name();
        let mut new = self.index_storage_name(to, table);
        // Constraint-backed indexes keep the server's `_key` suffix.
        if old.ends_with("_key") && !new.ends_with("_key") {
            new = symbol(&format!("{new}_key"));
        }
        Ok(format!("ALTER INDEX {} RENAME TO {}", quote(old)?, quote(&new)?))
    }

    fn set_primary_key_sequence_start(&self, table: &Table, value: u64) -> Result<String> {
        let pk = table.single_primary_key().ok_or_else(|| {
            SchemaError::configuration(format!(
                "table {:?}: universal ids need a single-column primary key",
                table.name
            ))
        })?;
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {} RESTART WITH {}",
            quote(&table.name)?,
            quote(&pk.name)?,
            value.max(1)
        ))
    }

    fn add_foreign_keys_statement(&self, table: &str, fks: &[ForeignKey]) -> Result<String> {
        let clauses = fks
            .iter()
            .map(|fk| Self::foreign_key_clause(fk).map(|c| format!("ADD {c}")))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("ALTER TABLE {} {}", quote(table)?, clauses.join(", ")))
    }

    fn column_type(&self, column: &Column) -> Result<String> {
        typemap::native_type(column, self.max_char_size)
    }

    fn needs_conversion(&self, live: &Column, target: &Column) -> Result<bool> {
        Ok(typemap::needs_conversion(&self.column_type(live)?, &self.column_type(target)?))
    }

    fn defaults_match(&self, live: &DefaultValue, target: &DefaultValue) -> bool {
        typemap::defaults_match(live, target)
    }

    fn is_implicit_index(&self, index: &Index, column: &Column) -> bool {
        column.unique && index.name.strip_suffix("_key").unwrap_or(&index.name) == column.name
    }

    fn index_storage_name(&self, index: &Index, table: &str) -> String {
        if let Some(catalog_name) = &index.catalog_name {
            return catalog_name.clone();
        }
        if has_unique_name(index) {
            symbol(&index.name)
        } else {
            symbol(&format!("{table}_{}", index.name))
        }
    }

    fn pin_native_types(&self, table: &mut Table) -> Result<()> {
        for column in &mut table.columns {
            typemap::pin_native_type(column, self.max_char_size)?;
        }
        Ok(())
    }

    fn live_index_name(&self, catalog_name: &str, table: &str, columns: &[String]) -> String {
        let suffix = columns.join("_");
        let short = catalog_name
            .strip_prefix(table)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(catalog_name);
        if short.ends_with(&suffix) {
            return short.to_string();
        }
        let trimmed = short
            .strip_suffix("_key")
            .or_else(|| short.strip_suffix("_idx"))
            .unwrap_or(short);
        if trimmed.ends_with(&suffix) {
            return trimmed.to_string();
        }
        catalog_name.to_string()
    }
}
