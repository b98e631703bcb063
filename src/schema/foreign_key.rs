//! Foreign-key constraints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Referential action for ON UPDATE / ON DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceOption {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferenceOption {
    pub fn as_sql(self) -> &'static str {
        match self {
            ReferenceOption::NoAction => "NO ACTION",
            ReferenceOption::Restrict => "RESTRICT",
            ReferenceOption::Cascade => "CASCADE",
            ReferenceOption::SetNull => "SET NULL",
            ReferenceOption::SetDefault => "SET DEFAULT",
        }
    }

    /// Parse an `information_schema.referential_constraints` rule.
    pub fn from_rule(rule: &str) -> Option<Self> {
        match rule.trim().to_ascii_uppercase().as_str() {
            "NO ACTION" => Some(ReferenceOption::NoAction),
            "RESTRICT" => Some(ReferenceOption::Restrict),
            "CASCADE" => Some(ReferenceOption::Cascade),
            "SET NULL" => Some(ReferenceOption::SetNull),
            "SET DEFAULT" => Some(ReferenceOption::SetDefault),
            _ => None,
        }
    }
}

impl fmt::Display for ReferenceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A foreign key from local columns to columns of a referenced table.
///
/// `columns[i]` references `ref_columns[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub symbol: String,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferenceOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferenceOption>,
}

impl ForeignKey {
    pub fn new<S: Into<String>, R: Into<String>>(
        symbol: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
        ref_table: impl Into<String>,
        ref_columns: impl IntoIterator<Item = R>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            ref_table: ref_table.into(),
            ref_columns: ref_columns.into_iter().map(Into::into).collect(),
            on_update: None,
            on_delete: None,
        }
    }

    pub fn on_delete(mut self, action: ReferenceOption) -> Self {
        self.on_delete = Some(action);
        self
    }

    pub fn on_update(mut self, action: ReferenceOption) -> Self {
        self.on_update = Some(action);
        self
    }

    /// (local, referenced) column pairs in declaration order.
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.ref_columns.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_rules_round_trip() {
        for opt in [
            ReferenceOption::NoAction,
            ReferenceOption::Restrict,
            ReferenceOption::Cascade,
            ReferenceOption::SetNull,
            ReferenceOption::SetDefault,
        ] {
            assert_eq!(ReferenceOption::from_rule(opt.as_sql()), Some(opt));
        }
        assert_eq!(ReferenceOption::from_rule("bogus"), None);
    }

    #[test]
    fn test_column_pairs() {
        let fk = ForeignKey::new("pets_owner", ["owner_id", "owner_org"], "users", ["id", "org"]);
        let pairs: Vec<_> = fk.column_pairs().collect();
        assert_eq!(pairs, vec![("owner_id", "id"), ("owner_org", "org")]);
    }
}
