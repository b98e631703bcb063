//! One-time rename of legacy foreign-key columns.
//!
//! Older models named foreign-key columns differently. When the target keeps
//! the constraint symbol but names another local column, the live column is
//! renamed in place instead of being re-added, together with the
//! single-column indexes that followed it.

use super::diff::{index_matches, rename_live_column};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::executor::LifeExecutor;
use crate::schema::Table;
use once_cell::sync::Lazy;
use regex::Regex;

static LEGACY_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*_id$").expect("legacy column pattern is valid"));

/// Statements renaming legacy foreign-key columns of `live` to the names in
/// `target`. `live` is updated in memory to match.
pub(crate) fn legacy_renames<D: Dialect + ?Sized>(
    dialect: &D,
    conn: &dyn LifeExecutor,
    target: &Table,
    live: &mut Table,
) -> Result<Vec<String>> {
    let table = target.name.as_str();
    let mut statements = Vec::new();

    for fk in &target.foreign_keys {
        if !dialect.foreign_key_exists(conn, &fk.symbol)? {
            continue;
        }
        let live_columns = dialect.foreign_key_columns(conn, table, &fk.symbol)?;
        for (old, new) in live_columns.iter().zip(&fk.columns) {
            if old == new {
                continue;
            }
            if !LEGACY_COLUMN.is_match(old) || !live.has_column(old) || live.has_column(new) {
                log::warn!(
                    "table {table:?}: foreign key {:?} uses {old:?}, not renaming it to {new:?}",
                    fk.symbol
                );
                continue;
            }
            log::info!("table {table:?}: renaming legacy column {old:?} to {new:?}");
            statements.push(dialect.rename_column_statement(table, old, new)?);
            rename_live_column(live, old, new);

            for i in 0..live.indexes.len() {
                let current = &live.indexes[i];
                if current.primary || !current.covers_only(new) {
                    continue;
                }
                let replacement = target.indexes.iter().find(|t| {
                    t.same_as(current) && !live.indexes.iter().any(|l| index_matches(dialect, table, l, t))
                });
                let Some(to) = replacement else {
                    continue;
                };
                statements.push(dialect.rename_index_statement(table, current, to)?);
                let storage = dialect.index_storage_name(to, table);
                let idx = &mut live.indexes[i];
                idx.name = to.name.clone();
                idx.catalog_name = Some(storage);
            }
        }
    }
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_pattern() {
        assert!(LEGACY_COLUMN.is_match("user_id"));
        assert!(LEGACY_COLUMN.is_match("pet_owner_id"));
        assert!(!LEGACY_COLUMN.is_match("owner"));
        assert!(!LEGACY_COLUMN.is_match("UserId"));
        assert!(!LEGACY_COLUMN.is_match("_id"));
    }
}
