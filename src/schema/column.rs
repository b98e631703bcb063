//! Column definition.

use super::types::{ColumnType, DefaultValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A table column, on either the target or the live side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Maximum length for character and binary types; 0 when unbounded.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default)]
    pub increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    /// Per-dialect native type overrides, keyed by dialect name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schema_type: BTreeMap<String, String>,
    /// Name of a live column this column replaces through a rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
    /// Native type as read from the catalog; set by introspection only.
    #[serde(skip)]
    pub(crate) native_type: Option<String>,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            unique: false,
            default: None,
            size: 0,
            precision: None,
            scale: None,
            increment: false,
            collation: None,
            schema_type: BTreeMap::new(),
            renamed_from: None,
            native_type: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn increment(mut self) -> Self {
        self.increment = true;
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn default_value(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn schema_type(mut self, dialect: &str, native: impl Into<String>) -> Self {
        self.schema_type.insert(dialect.to_string(), native.into());
        self
    }

    pub fn renamed_from(mut self, previous: impl Into<String>) -> Self {
        self.renamed_from = Some(previous.into());
        self
    }

    /// The override for `dialect`, if one is set and non-empty.
    pub fn type_override(&self, dialect: &str) -> Option<&str> {
        self.schema_type
            .get(dialect)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    /// Native type recorded during introspection.
    pub fn native_type(&self) -> Option<&str> {
        self.native_type.as_deref()
    }

    /// The introspected native type, or `fallback` for target columns.
    pub fn native_type_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.native_type.as_deref().unwrap_or(fallback)
    }

    pub(crate) fn with_native_type(mut self, native: impl Into<String>) -> Self {
        self.native_type = Some(native.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let c = Column::new("price", ColumnType::Float64)
            .nullable()
            .precision(10, 2)
            .default_value(0.0)
            .collation("C");
        assert!(c.nullable);
        assert_eq!(c.precision, Some(10));
        assert_eq!(c.scale, Some(2));
        assert_eq!(c.default, Some(DefaultValue::Float(0.0)));
        assert_eq!(c.collation.as_deref(), Some("C"));
        assert!(c.native_type().is_none());
    }

    #[test]
    fn test_type_override_ignores_empty() {
        let c = Column::new("tags", ColumnType::Other)
            .schema_type("postgres", "text[]")
            .schema_type("mysql", "");
        assert_eq!(c.type_override("postgres"), Some("text[]"));
        assert_eq!(c.type_override("mysql"), None);
        assert_eq!(c.type_override("sqlite"), None);
    }

    #[test]
    fn test_native_type_fallback() {
        let target = Column::new("at", ColumnType::Time);
        assert_eq!(target.native_type_or("timestamp with time zone"), "timestamp with time zone");
        let live = Column::new("at", ColumnType::Time).with_native_type("date");
        assert_eq!(live.native_type_or("timestamp with time zone"), "date");
    }

    #[test]
    fn test_deserialize_from_toml() {
        let c: Column = toml::from_str(
            r#"
            name = "status"
            type = "enum"
            nullable = true
            default = "draft"
            "#,
        )
        .unwrap();
        assert_eq!(c.column_type, ColumnType::Enum);
        assert!(c.nullable);
        assert_eq!(c.default, Some(DefaultValue::string("draft")));
    }
}
