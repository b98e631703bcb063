//! Table definition and model invariants.

use super::{Column, ForeignKey, Index};
use crate::error::{Result, SchemaError};
use crate::identifier::{validate_check_expr, validate_identifier};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A CHECK constraint annotation. Rendered inline in CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub expr: String,
}

impl CheckConstraint {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            name: None,
            expr: expr.into(),
        }
    }

    pub fn named(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            expr: expr.into(),
        }
    }
}

/// A table, either declared (target) or read from the catalog (live).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Primary-key column names in key order.
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<CheckConstraint>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            checks: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn with_check(mut self, check: CheckConstraint) -> Self {
        self.checks.push(check);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c == column)
    }

    /// The primary-key column when the key has exactly one column.
    pub fn single_primary_key(&self) -> Option<&Column> {
        match self.primary_key.as_slice() {
            [only] => self.column(only),
            _ => None,
        }
    }

    /// Check the model invariants: unique column names, key and index
    /// columns that exist, paired foreign-key columns and safe identifiers.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(SchemaError::configuration(format!("table {:?}: {message}", self.name)));

        validate_identifier(&self.name)?;

        let mut seen = HashSet::new();
        for column in &self.columns {
            validate_identifier(&column.name)?;
            if !seen.insert(column.name.as_str()) {
                return fail(format!("duplicate column {:?}", column.name));
            }
            if column.scale.is_some() && column.precision.is_none() {
                return fail(format!("column {:?} has a scale but no precision", column.name));
            }
            if let (Some(p), Some(s)) = (column.precision, column.scale) {
                if s > p {
                    return fail(format!("column {:?} has scale {s} above precision {p}", column.name));
                }
            }
        }

        for key in &self.primary_key {
            if !seen.contains(key.as_str()) {
                return fail(format!("primary key column {key:?} is not a column of the table"));
            }
        }

        let mut index_names = HashSet::new();
        for index in &self.indexes {
            validate_identifier(&index.name)?;
            if !index_names.insert(index.name.as_str()) {
                return fail(format!("duplicate index {:?}", index.name));
            }
            if index.columns.is_empty() {
                return fail(format!("index {:?} has no columns", index.name));
            }
            if let Some(missing) = index.columns.iter().find(|c| !seen.contains(c.as_str())) {
                return fail(format!("index {:?} references unknown column {missing:?}", index.name));
            }
        }

        for fk in &self.foreign_keys {
            validate_identifier(&fk.symbol)?;
            validate_identifier(&fk.ref_table)?;
            if fk.columns.is_empty() || fk.columns.len() != fk.ref_columns.len() {
                return fail(format!(
                    "foreign key {:?} pairs {} local columns with {} referenced columns",
                    fk.symbol,
                    fk.columns.len(),
                    fk.ref_columns.len()
                ));
            }
            if let Some(missing) = fk.columns.iter().find(|c| !seen.contains(c.as_str())) {
                return fail(format!("foreign key {:?} references unknown column {missing:?}", fk.symbol));
            }
        }

        for check in &self.checks {
            if let Some(name) = &check.name {
                validate_identifier(name)?;
            }
            validate_check_expr(&check.expr)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::ColumnType;

    fn users() -> Table {
        Table::new("users")
            .with_column(Column::new("id", ColumnType::Int64).increment())
            .with_column(Column::new("name", ColumnType::String).nullable())
            .with_primary_key(["id"])
            .with_index(Index::new("name", ["name"]).unique())
    }

    #[test]
    fn test_valid_table() {
        let t = users();
        assert!(t.validate().is_ok());
        assert_eq!(t.single_primary_key().map(|c| c.name.as_str()), Some("id"));
        assert!(t.is_primary_key("id"));
        assert!(t.index("name").is_some());
    }

    #[test]
    fn test_rejects_unknown_primary_key_column() {
        let t = users().with_primary_key(["uid"]);
        let err = t.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("uid"));
    }

    #[test]
    fn test_rejects_duplicate_columns_and_bad_indexes() {
        let dup = users().with_column(Column::new("name", ColumnType::String));
        assert!(dup.validate().is_err());

        let empty = users().with_index(Index::new("nothing", Vec::<String>::new()));
        assert!(empty.validate().is_err());

        let unknown = users().with_index(Index::new("by_age", ["age"]));
        assert!(unknown.validate().unwrap_err().to_string().contains("age"));
    }

    #[test]
    fn test_rejects_unpaired_foreign_keys_and_unsafe_checks() {
        let fk = users().with_foreign_key(ForeignKey::new("users_org", ["name"], "orgs", ["id", "name"]));
        assert!(fk.validate().is_err());

        let check = users().with_check(CheckConstraint::new("id > 0); DROP TABLE users; --"));
        assert!(check.validate().is_err());
    }

    #[test]
    fn test_composite_key_has_no_single_column() {
        let t = Table::new("edges")
            .with_column(Column::new("a", ColumnType::Int64))
            .with_column(Column::new("b", ColumnType::Int64))
            .with_primary_key(["a", "b"]);
        assert!(t.single_primary_key().is_none());
        assert!(Table::new("empty").single_primary_key().is_none());
    }
}
