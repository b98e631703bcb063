//! Index definition.

use serde::{Deserialize, Serialize};

/// A table index. Column order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Logical name.
    pub name: String,
    #[serde(default)]
    pub unique: bool,
    pub columns: Vec<String>,
    /// Backs the primary key; only set on live indexes.
    #[serde(skip)]
    pub primary: bool,
    /// Name stored in the catalog, when it differs from the logical name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_name: Option<String>,
    /// Logical or catalog name of a live index this index replaces through a rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
}

impl Index {
    pub fn new<S: Into<String>>(name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            columns: columns.into_iter().map(Into::into).collect(),
            primary: false,
            catalog_name: None,
            renamed_from: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn renamed_from(mut self, previous: impl Into<String>) -> Self {
        self.renamed_from = Some(previous.into());
        self
    }

    /// The name derived from the column list (`a_b` for columns `a`, `b`).
    pub fn column_suffix(&self) -> String {
        self.columns.join("_")
    }

    /// Name the index is stored under in the catalog.
    pub fn storage_name(&self) -> &str {
        self.catalog_name.as_deref().unwrap_or(&self.name)
    }

    /// True for a single-column index on `column`.
    pub fn covers_only(&self, column: &str) -> bool {
        self.columns.len() == 1 && self.columns[0] == column
    }

    /// Same cardinality over the same ordered columns.
    pub fn same_as(&self, other: &Index) -> bool {
        self.unique == other.unique && self.columns == other.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_and_storage_name() {
        let mut idx = Index::new("name_age", ["name", "age"]).unique();
        assert_eq!(idx.column_suffix(), "name_age");
        assert_eq!(idx.storage_name(), "name_age");
        idx.catalog_name = Some("users_name_age".to_string());
        assert_eq!(idx.storage_name(), "users_name_age");
    }

    #[test]
    fn test_same_as_is_order_sensitive() {
        let a = Index::new("a", ["x", "y"]);
        let b = Index::new("b", ["x", "y"]);
        let c = Index::new("c", ["y", "x"]);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
        assert!(!a.same_as(&b.clone().unique()));
        assert!(Index::new("x", ["x"]).covers_only("x"));
        assert!(!a.covers_only("x"));
    }
}
