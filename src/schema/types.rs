//! Dialect-neutral column types and default values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic column type, mapped onto native types by each dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
    Bytes,
    Time,
    Json,
    Uuid,
    Enum,
    /// Opaque pass-through; the native type comes from an override or the catalog.
    Other,
}

impl ColumnType {
    pub const ALL: [ColumnType; 18] = [
        ColumnType::Bool,
        ColumnType::Int8,
        ColumnType::Int16,
        ColumnType::Int32,
        ColumnType::Int64,
        ColumnType::Uint8,
        ColumnType::Uint16,
        ColumnType::Uint32,
        ColumnType::Uint64,
        ColumnType::Float32,
        ColumnType::Float64,
        ColumnType::String,
        ColumnType::Bytes,
        ColumnType::Time,
        ColumnType::Json,
        ColumnType::Uuid,
        ColumnType::Enum,
        ColumnType::Other,
    ];

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ColumnType::Int8
                | ColumnType::Int16
                | ColumnType::Int32
                | ColumnType::Int64
                | ColumnType::Uint8
                | ColumnType::Uint16
                | ColumnType::Uint32
                | ColumnType::Uint64
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            ColumnType::Uint8 | ColumnType::Uint16 | ColumnType::Uint32 | ColumnType::Uint64
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, ColumnType::Float32 | ColumnType::Float64)
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::Int8 => "int8",
            ColumnType::Int16 => "int16",
            ColumnType::Int32 => "int32",
            ColumnType::Int64 => "int64",
            ColumnType::Uint8 => "uint8",
            ColumnType::Uint16 => "uint16",
            ColumnType::Uint32 => "uint32",
            ColumnType::Uint64 => "uint64",
            ColumnType::Float32 => "float32",
            ColumnType::Float64 => "float64",
            ColumnType::String => "string",
            ColumnType::Bytes => "bytes",
            ColumnType::Time => "time",
            ColumnType::Json => "json",
            ColumnType::Uuid => "uuid",
            ColumnType::Enum => "enum",
            ColumnType::Other => "other",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column default: a typed literal or a verbatim SQL expression.
///
/// In schema files a default is written as a plain value (`default = 0`,
/// `default = "draft"`) or as `{ expr = "now()" }` for an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Expr { expr: String },
}

impl DefaultValue {
    pub fn expr(expr: impl Into<String>) -> Self {
        DefaultValue::Expr { expr: expr.into() }
    }

    pub fn string(value: impl Into<String>) -> Self {
        DefaultValue::String(value.into())
    }

    /// Parse a catalog default literal according to the column type.
    ///
    /// Unparseable numbers and booleans fall back to a verbatim expression.
    pub fn parse_literal(column_type: ColumnType, raw: &str) -> Self {
        match column_type {
            ColumnType::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => DefaultValue::Bool(true),
                "false" | "f" | "0" => DefaultValue::Bool(false),
                _ => DefaultValue::expr(raw),
            },
            t if t.is_integer() => raw
                .parse::<i64>()
                .map(DefaultValue::Int)
                .or_else(|_| raw.parse::<u64>().map(DefaultValue::Uint))
                .unwrap_or_else(|_| DefaultValue::expr(raw)),
            ColumnType::Float32 | ColumnType::Float64 => raw
                .parse::<f64>()
                .map(DefaultValue::Float)
                .unwrap_or_else(|_| DefaultValue::expr(raw)),
            _ => DefaultValue::String(raw.to_string()),
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Bool(v) => write!(f, "{v}"),
            DefaultValue::Int(v) => write!(f, "{v}"),
            DefaultValue::Uint(v) => write!(f, "{v}"),
            DefaultValue::Float(v) => write!(f, "{v}"),
            DefaultValue::String(v) => f.write_str(v),
            DefaultValue::Expr { expr } => f.write_str(expr),
        }
    }
}

impl From<bool> for DefaultValue {
    fn from(v: bool) -> Self {
        DefaultValue::Bool(v)
    }
}

impl From<i64> for DefaultValue {
    fn from(v: i64) -> Self {
        DefaultValue::Int(v)
    }
}

impl From<i32> for DefaultValue {
    fn from(v: i32) -> Self {
        DefaultValue::Int(i64::from(v))
    }
}

impl From<f64> for DefaultValue {
    fn from(v: f64) -> Self {
        DefaultValue::Float(v)
    }
}

impl From<&str> for DefaultValue {
    fn from(v: &str) -> Self {
        DefaultValue::String(v.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(v: String) -> Self {
        DefaultValue::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_classification() {
        assert!(ColumnType::Uint16.is_integer());
        assert!(ColumnType::Uint16.is_unsigned());
        assert!(ColumnType::Float32.is_numeric());
        assert!(!ColumnType::String.is_numeric());
        assert!(!ColumnType::Time.is_numeric());
        assert_eq!(ColumnType::ALL.len(), 18);
    }

    #[test]
    fn test_parse_literal_by_type() {
        assert_eq!(DefaultValue::parse_literal(ColumnType::Bool, "true"), DefaultValue::Bool(true));
        assert_eq!(DefaultValue::parse_literal(ColumnType::Int32, "-7"), DefaultValue::Int(-7));
        assert_eq!(
            DefaultValue::parse_literal(ColumnType::Uint64, "18446744073709551615"),
            DefaultValue::Uint(u64::MAX)
        );
        assert_eq!(DefaultValue::parse_literal(ColumnType::Float64, "1.5"), DefaultValue::Float(1.5));
        assert_eq!(
            DefaultValue::parse_literal(ColumnType::String, "O'Brien"),
            DefaultValue::string("O'Brien")
        );
        assert_eq!(
            DefaultValue::parse_literal(ColumnType::Int64, "nextval"),
            DefaultValue::expr("nextval")
        );
    }

    #[test]
    fn test_default_value_deserializes_untagged() {
        #[derive(Deserialize)]
        struct Holder {
            default: DefaultValue,
        }
        let h: Holder = serde_json::from_str(r#"{"default": 3}"#).unwrap();
        assert_eq!(h.default, DefaultValue::Int(3));
        let h: Holder = serde_json::from_str(r#"{"default": "draft"}"#).unwrap();
        assert_eq!(h.default, DefaultValue::string("draft"));
        let h: Holder = serde_json::from_str(r#"{"default": {"expr": "now()"}}"#).unwrap();
        assert_eq!(h.default, DefaultValue::expr("now()"));
        let h: Holder = serde_json::from_str(r#"{"default": false}"#).unwrap();
        assert_eq!(h.default, DefaultValue::Bool(false));
    }
}
