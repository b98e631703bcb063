//! In-memory fake catalog for tests.
//!
//! [`MockExecutor`] answers the PostgreSQL catalog queries from a list of
//! seeded tables, described the way the server stores them after the
//! migrator created them: a `<table>_pkey` primary index, a `<table>_<col>_key`
//! constraint per UNIQUE column, and every other index under its storage name.
//! Statements are recorded, not applied.

use crate::dialect::postgres::queries;
use crate::dialect::postgres::typemap::{self, MAX_CHAR_SIZE};
use crate::dialect::{Dialect, Postgres};
use crate::executor::{CatalogRow, LifeError, LifeExecutor};
use crate::migration::dry_run::render_params;
use crate::schema::{Column, ReferenceOption, Table};
use std::cell::RefCell;

struct MockState {
    server_version: String,
    schema: String,
    tables: Vec<Table>,
    executed: Vec<String>,
    fail_on: Option<String>,
}

/// Fake connection over seeded tables.
pub struct MockExecutor {
    state: RefCell<MockState>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    /// An empty `public` schema on a 15.0.2 server.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(MockState {
                server_version: "150002".to_string(),
                schema: "public".to_string(),
                tables: Vec::new(),
                executed: Vec::new(),
                fail_on: None,
            }),
        }
    }

    pub fn with_server_version(self, version: &str) -> Self {
        self.state.borrow_mut().server_version = version.to_string();
        self
    }

    pub fn with_schema(self, schema: &str) -> Self {
        self.state.borrow_mut().schema = schema.to_string();
        self
    }

    pub fn with_table(self, table: Table) -> Self {
        self.state.borrow_mut().tables.push(table);
        self
    }

    pub fn with_tables(self, tables: impl IntoIterator<Item = Table>) -> Self {
        self.state.borrow_mut().tables.extend(tables);
        self
    }

    /// Reject every statement containing `fragment`.
    pub fn fail_on(self, fragment: &str) -> Self {
        self.state.borrow_mut().fail_on = Some(fragment.to_string());
        self
    }

    /// Statements executed so far, parameters rendered inline.
    pub fn executed(&self) -> Vec<String> {
        self.state.borrow().executed.clone()
    }

    pub fn clear(&self) {
        self.state.borrow_mut().executed.clear();
    }
}

fn param<'p>(params: &[&'p str], idx: usize) -> Result<&'p str, LifeError> {
    params
        .get(idx)
        .copied()
        .ok_or_else(|| LifeError::QueryError(format!("missing parameter ${}", idx + 1)))
}

fn row<const N: usize>(values: [Option<String>; N]) -> CatalogRow {
    CatalogRow::new(Vec::from(values))
}

fn count(n: usize) -> Vec<CatalogRow> {
    vec![row([Some(n.to_string())])]
}

fn yes_no(v: bool) -> Option<String> {
    Some(if v { "YES" } else { "NO" }.to_string())
}

/// `(data_type, udt_name, character_maximum_length, numeric_precision, numeric_scale)`
/// for a native type as `information_schema.columns` reports it.
fn catalog_type(native: &str) -> (String, String, Option<String>, Option<String>, Option<String>) {
    let args = |prefix: &str| {
        native
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(')'))
            .map(str::to_string)
    };
    if let Some(len) = args("varchar(") {
        return ("character varying".into(), "varchar".into(), Some(len), None, None);
    }
    if native == "varchar" {
        return ("character varying".into(), "varchar".into(), None, None, None);
    }
    if let Some(len) = args("char(") {
        return ("character".into(), "bpchar".into(), Some(len), None, None);
    }
    if let Some(ps) = args("numeric(") {
        let (p, s) = ps.split_once(',').unwrap_or((ps.as_str(), "0"));
        return (
            "numeric".into(),
            "numeric".into(),
            None,
            Some(p.trim().to_string()),
            Some(s.trim().to_string()),
        );
    }
    if typemap::is_array_type(native) {
        let element = native.split('[').next().unwrap_or(native);
        return ("ARRAY".into(), format!("_{element}"), None, None, None);
    }
    (native.to_string(), native.to_string(), None, None, None)
}

fn column_row(c: &Column) -> Result<CatalogRow, LifeError> {
    let native = typemap::native_type(c, MAX_CHAR_SIZE).map_err(|e| LifeError::Other(e.to_string()))?;
    let (data_type, udt, len, precision, scale) = catalog_type(&native);
    let default = typemap::render_default(c).map(|d| {
        if d.starts_with('\'') {
            format!("{d}::{data_type}")
        } else {
            d
        }
    });
    Ok(row([
        Some(c.name.clone()),
        Some(data_type),
        yes_no(c.nullable),
        default,
        Some(udt),
        len,
        precision,
        scale,
        yes_no(c.increment),
        c.collation.clone(),
    ]))
}

/// `(catalog name, column, primary, unique)` rows ordered like the index query.
fn index_rows(table: &Table) -> Vec<(String, String, bool, bool)> {
    let dialect = Postgres::default();
    let mut indexes: Vec<(String, Vec<String>, bool, bool)> = Vec::new();
    if !table.primary_key.is_empty() {
        indexes.push((format!("{}_pkey", table.name), table.primary_key.clone(), true, true));
    }
    for c in table.columns.iter().filter(|c| c.unique) {
        indexes.push((format!("{}_{}_key", table.name, c.name), vec![c.name.clone()], false, true));
    }
    for idx in &table.indexes {
        if table.columns.iter().any(|c| dialect.is_implicit_index(idx, c)) {
            continue;
        }
        indexes.push((
            dialect.index_storage_name(idx, &table.name),
            idx.columns.clone(),
            false,
            idx.unique,
        ));
    }
    indexes.sort_by(|a, b| a.0.cmp(&b.0));
    indexes
        .into_iter()
        .flat_map(|(name, columns, primary, unique)| {
            columns
                .into_iter()
                .map(move |c| (name.clone(), c, primary, unique))
        })
        .collect()
}

fn rule(action: Option<ReferenceOption>) -> String {
    action.unwrap_or(ReferenceOption::NoAction).as_sql().to_string()
}

impl MockState {
    fn table(&self, schema: &str, name: &str) -> Option<&Table> {
        if schema != self.schema {
            return None;
        }
        self.tables.iter().find(|t| t.name == name)
    }

    fn unique_constraint(&self, name: &str) -> bool {
        self.tables.iter().any(|t| {
            t.columns
                .iter()
                .any(|c| c.unique && format!("{}_{}_key", t.name, c.name) == name)
        })
    }

    fn foreign_key(&self, name: &str) -> bool {
        self.tables
            .iter()
            .any(|t| t.foreign_keys.iter().any(|fk| fk.symbol == name))
    }
}

impl LifeExecutor for MockExecutor {
    fn execute(&self, query: &str, params: &[&str]) -> Result<u64, LifeError> {
        let mut state = self.state.borrow_mut();
        if let Some(fragment) = &state.fail_on {
            if query.contains(fragment.as_str()) {
                return Err(LifeError::QueryError(format!("statement rejected: {query}")));
            }
        }
        state.executed.push(render_params(query, params));
        Ok(0)
    }

    fn query_all(&self, query: &str, params: &[&str]) -> Result<Vec<CatalogRow>, LifeError> {
        let state = self.state.borrow();
        match query {
            queries::SERVER_VERSION => Ok(vec![row([Some(state.server_version.clone())])]),
            queries::CURRENT_SCHEMA => Ok(vec![row([Some(state.schema.clone())])]),
            queries::TABLE_EXISTS => {
                let found = state.table(param(params, 0)?, param(params, 1)?).is_some();
                Ok(count(usize::from(found)))
            }
            queries::CONSTRAINT_EXISTS => {
                if param(params, 0)? != state.schema {
                    return Ok(count(0));
                }
                let name = param(params, 2)?;
                let found = match param(params, 1)? {
                    "FOREIGN KEY" => state.foreign_key(name),
                    "UNIQUE" => state.unique_constraint(name),
                    _ => false,
                };
                Ok(count(usize::from(found)))
            }
            queries::FOREIGN_KEY_COLUMNS => {
                let Some(table) = state.table(param(params, 0)?, param(params, 1)?) else {
                    return Ok(Vec::new());
                };
                let symbol = param(params, 2)?;
                Ok(table
                    .foreign_keys
                    .iter()
                    .filter(|fk| fk.symbol == symbol)
                    .flat_map(|fk| fk.columns.iter().map(|c| row([Some(c.clone())])))
                    .collect())
            }
            queries::COLUMNS => match state.table(param(params, 0)?, param(params, 1)?) {
                Some(table) => table.columns.iter().map(column_row).collect(),
                None => Ok(Vec::new()),
            },
            queries::INDEXES => match state.table(param(params, 0)?, param(params, 1)?) {
                Some(table) => Ok(index_rows(table)
                    .into_iter()
                    .map(|(name, column, primary, unique)| {
                        row([
                            Some(name),
                            Some(column),
                            Some(primary.to_string()),
                            Some(unique.to_string()),
                        ])
                    })
                    .collect()),
                None => Ok(Vec::new()),
            },
            queries::FOREIGN_KEYS => match state.table(param(params, 0)?, param(params, 1)?) {
                Some(table) => Ok(table
                    .foreign_keys
                    .iter()
                    .flat_map(|fk| {
                        fk.column_pairs().map(move |(column, ref_column)| {
                            row([
                                Some(fk.symbol.clone()),
                                Some(column.to_string()),
                                Some(fk.ref_table.clone()),
                                Some(ref_column.to_string()),
                                Some(rule(fk.on_update)),
                                Some(rule(fk.on_delete)),
                            ])
                        })
                    })
                    .collect()),
                None => Ok(Vec::new()),
            },
            _ => Err(LifeError::QueryError(format!("unexpected query: {query}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnType, Index};

    #[test]
    fn test_catalog_types() {
        assert_eq!(catalog_type("varchar(255)").2.as_deref(), Some("255"));
        assert_eq!(catalog_type("numeric(10,2)").3.as_deref(), Some("10"));
        assert_eq!(catalog_type("int[]").1, "_int");
        assert_eq!(catalog_type("bigint").0, "bigint");
    }

    #[test]
    fn test_index_rows() {
        let t = Table::new("users")
            .with_column(Column::new("id", ColumnType::Int64))
            .with_column(Column::new("email", ColumnType::String).unique())
            .with_column(Column::new("name", ColumnType::String))
            .with_primary_key(["id"])
            .with_index(Index::new("email", ["email"]).unique())
            .with_index(Index::new("by_name", ["name", "email"]));
        let names: Vec<String> = index_rows(&t).into_iter().map(|r| r.0).collect();
        assert_eq!(names, vec!["by_name", "by_name", "users_email_key", "users_pkey"]);
    }

    #[test]
    fn test_failures_are_not_recorded() {
        let mock = MockExecutor::new().fail_on("DROP");
        assert!(mock.execute("DROP INDEX \"x\"", &[]).is_err());
        mock.execute("CREATE INDEX \"y\" ON \"t\"(\"a\")", &[]).unwrap();
        assert_eq!(mock.executed().len(), 1);
    }
}
