//! Target-vs-live comparison for one table.

use crate::dialect::Dialect;
use crate::error::{Result, SchemaError};
use crate::schema::{Column, Index, Table};
use std::fmt;

/// Changes that move one live table to its target.
///
/// Statements are applied in field order: renames, index drops, one
/// ALTER TABLE for the columns, index creations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub table: String,
    /// (live name, target name)
    pub rename_columns: Vec<(String, String)>,
    /// (live index, target index)
    pub rename_indexes: Vec<(Index, Index)>,
    /// Live indexes that must go before the target can be reached.
    pub drop_indexes: Vec<Index>,
    /// Live indexes the target does not mention.
    pub extra_indexes: Vec<Index>,
    pub add_columns: Vec<Column>,
    pub modify_columns: Vec<Column>,
    /// Live columns the target does not mention.
    pub extra_columns: Vec<Column>,
    pub add_indexes: Vec<Index>,
}

impl ChangeSet {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rename_columns.is_empty()
            && self.rename_indexes.is_empty()
            && self.drop_indexes.is_empty()
            && self.extra_indexes.is_empty()
            && self.add_columns.is_empty()
            && self.modify_columns.is_empty()
            && self.extra_columns.is_empty()
            && self.add_indexes.is_empty()
    }

    fn drop_index(&mut self, index: &Index) {
        let name = index.storage_name();
        if !self.drop_indexes.iter().any(|i| i.storage_name() == name) {
            self.drop_indexes.push(index.clone());
        }
    }

    fn add_index<D: Dialect + ?Sized>(&mut self, dialect: &D, index: Index) {
        let name = dialect.index_storage_name(&index, &self.table);
        if !self
            .add_indexes
            .iter()
            .any(|i| dialect.index_storage_name(i, &self.table) == name)
        {
            self.add_indexes.push(index);
        }
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.table)?;
        for (from, to) in &self.rename_columns {
            writeln!(f, "  > column {from} -> {to}")?;
        }
        for (from, to) in &self.rename_indexes {
            writeln!(f, "  > index {} -> {}", from.storage_name(), to.name)?;
        }
        for idx in &self.drop_indexes {
            writeln!(f, "  - index {}", idx.storage_name())?;
        }
        for idx in &self.extra_indexes {
            writeln!(f, "  ? index {} (not in target)", idx.storage_name())?;
        }
        for c in &self.add_columns {
            let nullable = if c.nullable { " (nullable)" } else { "" };
            writeln!(f, "  + column {}: {}{nullable}", c.name, c.column_type)?;
        }
        for c in &self.modify_columns {
            writeln!(f, "  ~ column {}", c.name)?;
        }
        for c in &self.extra_columns {
            writeln!(f, "  ? column {} (not in target)", c.name)?;
        }
        for idx in &self.add_indexes {
            let unique = if idx.unique { "unique " } else { "" };
            writeln!(f, "  + {unique}index {} ({})", idx.name, idx.columns.join(", "))?;
        }
        Ok(())
    }
}

/// Whether the live index `live` is the stored form of the target index `target`.
pub fn index_matches<D: Dialect + ?Sized>(dialect: &D, table: &str, live: &Index, target: &Index) -> bool {
    live.name == target.name || live.storage_name() == dialect.index_storage_name(target, table)
}

/// Whether the live column needs an ALTER to reach the target column.
fn column_changed<D: Dialect + ?Sized>(dialect: &D, live: &Column, target: &Column) -> Result<bool> {
    if dialect.needs_conversion(live, target)? || live.nullable != target.nullable {
        return Ok(true);
    }
    Ok(match (&live.default, &target.default) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(l), Some(t)) => !dialect.defaults_match(l, t),
    })
}

/// Apply a column rename to the in-memory live table.
pub(crate) fn rename_live_column(live: &mut Table, from: &str, to: &str) {
    if let Some(c) = live.column_mut(from) {
        c.name = to.to_string();
    }
    for key in live.primary_key.iter_mut().filter(|k| k.as_str() == from) {
        *key = to.to_string();
    }
    for idx in &mut live.indexes {
        for c in idx.columns.iter_mut().filter(|c| c.as_str() == from) {
            *c = to.to_string();
        }
    }
}

/// Compute the changes that move `live` to `target`.
///
/// Both tables describe the same name. Renames come only from explicit
/// `renamed_from` markers; a primary-key change is rejected.
pub fn diff<D: Dialect + ?Sized>(dialect: &D, target: &Table, live: &Table) -> Result<ChangeSet> {
    let table = target.name.as_str();
    let mut changes = ChangeSet::new(table);
    let mut live = live.clone();

    for column in &target.columns {
        let Some(from) = &column.renamed_from else {
            continue;
        };
        if live.has_column(from) && !live.has_column(&column.name) {
            changes.rename_columns.push((from.clone(), column.name.clone()));
            rename_live_column(&mut live, from, &column.name);
        }
    }

    if target.primary_key != live.primary_key {
        return Err(SchemaError::diff(
            table,
            format!(
                "changing the primary key from ({}) to ({}) is not supported",
                live.primary_key.join(", "),
                target.primary_key.join(", ")
            ),
        ));
    }

    let unique_index_on = |t: &Table, column: &str| {
        t.indexes
            .iter()
            .any(|i| i.unique && i.covers_only(column))
    };

    for target_col in &target.columns {
        let Some(live_col) = live.column(&target_col.name) else {
            changes.add_columns.push(target_col.clone());
            continue;
        };
        if column_changed(dialect, live_col, target_col)? {
            changes.modify_columns.push(target_col.clone());
        }
        if target_col.unique && !live_col.unique {
            changes.add_index(
                dialect,
                Index::new(target_col.name.clone(), [target_col.name.clone()]).unique(),
            );
        }
        if !target_col.unique
            && live_col.unique
            && !live.is_primary_key(&live_col.name)
            && !unique_index_on(target, &target_col.name)
        {
            for idx in live
                .indexes
                .iter()
                .filter(|i| i.unique && i.covers_only(&live_col.name))
            {
                changes.drop_index(idx);
            }
        }
    }
    for live_col in &live.columns {
        if !target.has_column(&live_col.name) {
            changes.extra_columns.push(live_col.clone());
        }
    }

    // Index renames: the target names the live index it replaces.
    let mut renamed: Vec<String> = Vec::new();
    for idx in &target.indexes {
        let Some(from) = &idx.renamed_from else {
            continue;
        };
        if live.indexes.iter().any(|l| index_matches(dialect, table, l, idx)) {
            continue;
        }
        if let Some(old) = live
            .indexes
            .iter()
            .find(|l| !l.primary && (l.name == *from || l.storage_name() == from))
        {
            renamed.push(old.storage_name().to_string());
            changes.rename_indexes.push((old.clone(), idx.clone()));
        }
    }

    for live_idx in live.indexes.iter().filter(|i| !i.primary) {
        if renamed.iter().any(|r| r == live_idx.storage_name()) {
            continue;
        }
        match target
            .indexes
            .iter()
            .find(|t| index_matches(dialect, table, live_idx, t))
        {
            Some(target_idx) => {
                if !live_idx.same_as(target_idx) {
                    changes.drop_index(live_idx);
                    changes.add_index(dialect, target_idx.clone());
                }
            }
            None => {
                let implicit = live_idx.unique
                    && target
                        .columns
                        .iter()
                        .any(|c| live_idx.covers_only(&c.name) && dialect.is_implicit_index(live_idx, c));
                let dropped = changes
                    .drop_indexes
                    .iter()
                    .any(|d| d.storage_name() == live_idx.storage_name());
                if !implicit && !dropped {
                    changes.extra_indexes.push(live_idx.clone());
                }
            }
        }
    }

    for target_idx in &target.indexes {
        if changes.rename_indexes.iter().any(|(_, to)| to.name == target_idx.name) {
            continue;
        }
        if live
            .indexes
            .iter()
            .any(|l| index_matches(dialect, table, l, target_idx))
        {
            continue;
        }
        // Satisfied by the column's UNIQUE attribute.
        if target.columns.iter().any(|c| dialect.is_implicit_index(target_idx, c)) {
            continue;
        }
        changes.add_index(dialect, target_idx.clone());
    }

    Ok(changes)
}
