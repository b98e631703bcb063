//! Mapping between semantic column types and PostgreSQL native types,
//! in both directions, plus default-value rendering and parsing.

use crate::error::{Result, SchemaError};
use crate::executor::{CatalogRow, LifeError};
use crate::schema::{Column, ColumnType, DefaultValue};

/// Key for PostgreSQL entries in [`Column::schema_type`].
pub const DIALECT: &str = "postgres";

/// Largest size kept as a bounded `varchar`; larger strings become `text` (10 MiB).
pub const MAX_CHAR_SIZE: u64 = 10 << 20;

/// One row of the column catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnDescription {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub udt_name: Option<String>,
    pub char_max_len: Option<i64>,
    pub numeric_precision: Option<i64>,
    pub numeric_scale: Option<i64>,
    pub identity: bool,
    pub collation: Option<String>,
}

impl ColumnDescription {
    pub fn from_row(row: &CatalogRow) -> std::result::Result<Self, LifeError> {
        Ok(Self {
            name: row.text(0)?.to_string(),
            data_type: row.text(1)?.to_string(),
            nullable: row.get(2) == Some("YES"),
            default: row.get(3).map(str::to_string),
            udt_name: row.get(4).map(str::to_string),
            char_max_len: row.opt_i64(5)?,
            numeric_precision: row.opt_i64(6)?,
            numeric_scale: row.opt_i64(7)?,
            identity: row.get(8) == Some("YES"),
            collation: row.get(9).map(str::to_string),
        })
    }
}

fn to_u32(column: &str, what: &str, v: i64) -> std::result::Result<u32, String> {
    u32::try_from(v).map_err(|_| format!("column {column:?} has invalid {what} {v}"))
}

/// Build a live column from its catalog description.
pub fn scan_column(desc: &ColumnDescription, max_char_size: u64) -> std::result::Result<Column, String> {
    let mut c = Column::new(desc.name.clone(), ColumnType::Other).with_native_type(desc.data_type.clone());
    c.nullable = desc.nullable;
    c.increment = desc.identity;
    c.collation = desc.collation.clone();

    let udt = || {
        desc.udt_name
            .clone()
            .ok_or_else(|| format!("missing user-defined type for column {:?}", desc.name))
    };

    match desc.data_type.as_str() {
        "boolean" => c.column_type = ColumnType::Bool,
        "smallint" => c.column_type = ColumnType::Int16,
        "integer" => c.column_type = ColumnType::Int32,
        "bigint" => c.column_type = ColumnType::Int64,
        "real" => c.column_type = ColumnType::Float32,
        "double precision" => c.column_type = ColumnType::Float64,
        "numeric" | "decimal" => {
            c.column_type = ColumnType::Float64;
            if let Some(p) = desc.numeric_precision {
                c.precision = Some(to_u32(&desc.name, "precision", p)?);
                c.scale = Some(to_u32(&desc.name, "scale", desc.numeric_scale.unwrap_or(0))?);
            }
        }
        "text" => {
            c.column_type = ColumnType::String;
            c.size = max_char_size + 1;
        }
        "character varying" => {
            c.column_type = ColumnType::String;
            if let Some(len) = desc.char_max_len {
                c.size = u64::from(to_u32(&desc.name, "length", len)?);
            }
        }
        "character" => {
            c.column_type = ColumnType::String;
            if let Some(len) = desc.char_max_len {
                c.size = u64::from(to_u32(&desc.name, "length", len)?);
                c.schema_type.insert(DIALECT.to_string(), format!("char({len})"));
            }
        }
        "date"
        | "time"
        | "time with time zone"
        | "time without time zone"
        | "timestamp"
        | "timestamp with time zone"
        | "timestamp without time zone" => c.column_type = ColumnType::Time,
        "bytea" => c.column_type = ColumnType::Bytes,
        "json" | "jsonb" => c.column_type = ColumnType::Json,
        "uuid" => c.column_type = ColumnType::Uuid,
        // The element type is in udt_name (`_int4`, `_text`); sizes and
        // dimensions are not recorded by the server.
        "ARRAY" => {
            c.native_type = Some(udt()?);
            c.schema_type.insert(DIALECT.to_string(), "ARRAY".to_string());
        }
        "USER-DEFINED" | "tstzrange" | "interval" => {
            c.schema_type.insert(DIALECT.to_string(), udt()?);
        }
        // cidr, inet, macaddr and anything else pass through verbatim.
        _ => {}
    }

    c.default = desc
        .default
        .as_deref()
        .and_then(|raw| scan_default(c.column_type, raw));
    Ok(c)
}

/// Native type for `c`. Overrides win; introspected columns keep the exact
/// native spelling for the families that have several.
pub fn native_type(c: &Column, max_char_size: u64) -> Result<String> {
    if let Some(t) = c.type_override(DIALECT) {
        return Ok(t.to_string());
    }
    let t = match c.column_type {
        ColumnType::Bool => "boolean".to_string(),
        ColumnType::Int8 | ColumnType::Uint8 | ColumnType::Int16 | ColumnType::Uint16 => "smallint".to_string(),
        ColumnType::Int32 | ColumnType::Uint32 => "integer".to_string(),
        ColumnType::Int64 | ColumnType::Uint64 => "bigint".to_string(),
        ColumnType::Float32 => c.native_type_or("real").to_string(),
        ColumnType::Float64 => match c.precision {
            Some(p) => format!("numeric({p},{})", c.scale.unwrap_or(0)),
            None => c.native_type_or("double precision").to_string(),
        },
        ColumnType::String => {
            if c.size > max_char_size {
                "text".to_string()
            } else if c.size > 0 {
                format!("varchar({})", c.size)
            } else {
                "varchar".to_string()
            }
        }
        ColumnType::Enum => "varchar".to_string(),
        ColumnType::Bytes => "bytea".to_string(),
        ColumnType::Json => c.native_type_or("jsonb").to_string(),
        ColumnType::Uuid => "uuid".to_string(),
        ColumnType::Time => c.native_type_or("timestamp with time zone").to_string(),
        ColumnType::Other => match c.native_type() {
            Some(t) => t.to_string(),
            None => {
                return Err(SchemaError::configuration(format!(
                    "column {:?} has type other and no {DIALECT} schema_type",
                    c.name
                )))
            }
        },
    };
    Ok(t)
}

/// Record an introspected column's native spelling as a schema_type
/// override when the semantic type alone would spell it differently.
pub fn pin_native_type(c: &mut Column, max_char_size: u64) -> Result<()> {
    if c.native_type.is_none() {
        return Ok(());
    }
    let live = match (c.type_override(DIALECT), c.native_type()) {
        // Arrays read back as `ARRAY` with the element type in udt_name (`_text`).
        (Some("ARRAY"), Some(udt)) => match udt.strip_prefix('_') {
            Some(element) => format!("{element}[]"),
            None => return Ok(()),
        },
        _ => native_type(c, max_char_size)?,
    };
    let mut portable = c.clone();
    portable.native_type = None;
    portable.schema_type.remove(DIALECT);
    if native_type(&portable, max_char_size).ok().as_deref() != Some(live.as_str()) {
        c.schema_type.insert(DIALECT.to_string(), live);
    }
    Ok(())
}

/// Whether changing from `old` to `new` native type needs a conversion.
/// Array columns read back as `ARRAY` match any array type.
pub fn needs_conversion(old: &str, new: &str) -> bool {
    old != new && (old != "ARRAY" || !is_array_type(new))
}

/// `ident(...)`, where the parenthesized list runs to the end of the value
/// (an optional trailing `::type` cast is ignored).
pub fn is_call_expr(s: &str) -> bool {
    let mut s = s.trim();
    if let Some((head, _)) = s.split_once("::") {
        if !s.ends_with(')') && head.ends_with(')') {
            s = head;
        }
    }
    let (Some(open), Some(close)) = (s.find('('), s.rfind(')')) else {
        return false;
    };
    if open == 0 || open > close || close != s.len() - 1 {
        return false;
    }
    s[..open]
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_alphabetic() || c == '_' || (i > 0 && c.is_ascii_digit()))
}

/// `int[]`, `text[2]`.
pub fn is_array_type(t: &str) -> bool {
    let (Some(open), Some(close)) = (t.rfind('['), t.rfind(']')) else {
        return false;
    };
    open < close && t[open + 1..close].chars().all(|c| c.is_ascii_digit())
}

/// DEFAULT clause value for `c`, if it declares one.
pub fn render_default(c: &Column) -> Option<String> {
    let value = c.default.as_ref()?;
    let rendered = match value {
        DefaultValue::Bool(b) => b.to_string(),
        DefaultValue::Int(v) => v.to_string(),
        DefaultValue::Uint(v) => v.to_string(),
        DefaultValue::Float(v) if v.is_nan() => "'NaN'".to_string(),
        DefaultValue::Float(v) if v.is_infinite() => {
            let literal = if *v > 0.0 { "'Infinity'" } else { "'-Infinity'" };
            literal.to_string()
        }
        DefaultValue::Float(v) => v.to_string(),
        DefaultValue::Expr { expr } => expr.clone(),
        DefaultValue::String(s) => {
            let t = c.column_type;
            if is_call_expr(s) || t == ColumnType::Uuid || t == ColumnType::Time || t.is_numeric() {
                s.clone()
            } else {
                format!("'{}'", s.replace('\'', "''"))
            }
        }
    };
    Some(rendered)
}

/// Split a leading `'...'` literal (with `''` escapes) from the rest of `raw`.
fn split_quoted(raw: &str) -> Option<(String, &str)> {
    let body = raw.strip_prefix('\'')?;
    let mut literal = String::new();
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                literal.push('\'');
                continue;
            }
            return Some((literal, &body[i + 1..]));
        }
        literal.push(c);
    }
    None
}

/// Parse a catalog `column_default` value.
///
/// Call expressions and time defaults stay verbatim expressions; quoted
/// literals lose their cast and escaping.
pub fn scan_default(column_type: ColumnType, raw: &str) -> Option<DefaultValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if column_type == ColumnType::Time || is_call_expr(raw) {
        return Some(DefaultValue::expr(raw));
    }
    if let Some((literal, rest)) = split_quoted(raw) {
        if !(rest.is_empty() || rest.starts_with("::")) {
            return Some(DefaultValue::expr(raw));
        }
        return Some(match column_type {
            t if t == ColumnType::Bool || t.is_numeric() => DefaultValue::parse_literal(t, &literal),
            _ => DefaultValue::String(literal),
        });
    }
    let head = raw.split_once("::").map_or(raw, |(head, _)| head).trim();
    if head.eq_ignore_ascii_case("null") {
        return None;
    }
    if column_type == ColumnType::Bool || column_type.is_numeric() {
        let head = head
            .strip_prefix('(')
            .and_then(|h| h.strip_suffix(')'))
            .unwrap_or(head);
        return Some(DefaultValue::parse_literal(column_type, head));
    }
    Some(DefaultValue::expr(raw))
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn as_f64(v: &DefaultValue) -> Option<f64> {
    match v {
        DefaultValue::Int(i) => Some(*i as f64),
        DefaultValue::Uint(u) => Some(*u as f64),
        DefaultValue::Float(f) => Some(*f),
        _ => None,
    }
}

/// Whether a live default already satisfies the target default.
pub fn defaults_match(live: &DefaultValue, target: &DefaultValue) -> bool {
    match (live, target) {
        (DefaultValue::Bool(a), DefaultValue::Bool(b)) => a == b,
        (DefaultValue::String(a), DefaultValue::String(b)) => a == b,
        _ => match (as_f64(live), as_f64(target)) {
            (Some(a), Some(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => normalize(&live.to_string()) == normalize(&target.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// What the catalog reports for a column created with `native`.
    fn describe(native: &str) -> ColumnDescription {
        let mut d = ColumnDescription {
            name: "c".to_string(),
            data_type: native.to_string(),
            nullable: false,
            ..Default::default()
        };
        if let Some(len) = native.strip_prefix("varchar(").and_then(|s| s.strip_suffix(')')) {
            d.data_type = "character varying".to_string();
            d.char_max_len = len.parse().ok();
        } else if native == "varchar" {
            d.data_type = "character varying".to_string();
        } else if let Some(ps) = native.strip_prefix("numeric(").and_then(|s| s.strip_suffix(')')) {
            let (p, s) = ps.split_once(',').unwrap();
            d.data_type = "numeric".to_string();
            d.numeric_precision = p.parse().ok();
            d.numeric_scale = s.parse().ok();
        } else if native.ends_with("[]") {
            d.data_type = "ARRAY".to_string();
            d.udt_name = Some(format!("_{}", native.trim_end_matches("[]")));
        }
        d
    }

    fn round_trip(c: &Column) -> Column {
        let native = native_type(c, MAX_CHAR_SIZE).unwrap();
        scan_column(&describe(&native), MAX_CHAR_SIZE).unwrap()
    }

    #[test]
    fn test_lossless_types_round_trip() {
        for t in [
            ColumnType::Bool,
            ColumnType::Int16,
            ColumnType::Int32,
            ColumnType::Int64,
            ColumnType::Float32,
            ColumnType::Float64,
            ColumnType::String,
            ColumnType::Bytes,
            ColumnType::Time,
            ColumnType::Json,
            ColumnType::Uuid,
        ] {
            let back = round_trip(&Column::new("c", t));
            assert_eq!(back.column_type, t, "{t} did not survive the round trip");
        }
        let other = Column::new("c", ColumnType::Other).schema_type(DIALECT, "inet");
        assert_eq!(round_trip(&other).column_type, ColumnType::Other);
    }

    #[test]
    fn test_int8_reads_back_as_int16() {
        assert_eq!(round_trip(&Column::new("c", ColumnType::Int8)).column_type, ColumnType::Int16);
    }

    #[test]
    fn test_uint8_reads_back_as_int16() {
        assert_eq!(round_trip(&Column::new("c", ColumnType::Uint8)).column_type, ColumnType::Int16);
    }

    #[test]
    fn test_uint16_reads_back_as_int16() {
        assert_eq!(round_trip(&Column::new("c", ColumnType::Uint16)).column_type, ColumnType::Int16);
    }

    #[test]
    fn test_uint32_reads_back_as_int32() {
        assert_eq!(round_trip(&Column::new("c", ColumnType::Uint32)).column_type, ColumnType::Int32);
    }

    #[test]
    fn test_uint64_reads_back_as_int64() {
        assert_eq!(round_trip(&Column::new("c", ColumnType::Uint64)).column_type, ColumnType::Int64);
    }

    #[test]
    fn test_enum_reads_back_as_string() {
        assert_eq!(round_trip(&Column::new("c", ColumnType::Enum)).column_type, ColumnType::String);
    }

    #[test]
    fn test_numeric_precision_round_trips() {
        let target = Column::new("price", ColumnType::Float64).precision(10, 2);
        assert_eq!(native_type(&target, MAX_CHAR_SIZE).unwrap(), "numeric(10,2)");
        let live = round_trip(&target);
        assert_eq!(live.column_type, ColumnType::Float64);
        assert_eq!((live.precision, live.scale), (Some(10), Some(2)));
        assert_eq!(native_type(&live, MAX_CHAR_SIZE).unwrap(), "numeric(10,2)");
    }

    #[test]
    fn test_string_sizes() {
        let sized = Column::new("s", ColumnType::String).size(255);
        assert_eq!(native_type(&sized, MAX_CHAR_SIZE).unwrap(), "varchar(255)");
        assert_eq!(round_trip(&sized).size, 255);

        let big = Column::new("s", ColumnType::String).size(MAX_CHAR_SIZE + 1);
        assert_eq!(native_type(&big, MAX_CHAR_SIZE).unwrap(), "text");
        let live = round_trip(&big);
        assert_eq!(native_type(&live, MAX_CHAR_SIZE).unwrap(), "text");

        // A smaller configured ceiling moves the text boundary.
        assert_eq!(native_type(&sized, 100).unwrap(), "text");
    }

    #[test]
    fn test_native_spellings_are_kept() {
        let live = scan_column(&describe("date"), MAX_CHAR_SIZE).unwrap();
        assert_eq!(live.column_type, ColumnType::Time);
        assert_eq!(native_type(&live, MAX_CHAR_SIZE).unwrap(), "date");

        let live = scan_column(&describe("json"), MAX_CHAR_SIZE).unwrap();
        assert_eq!(native_type(&live, MAX_CHAR_SIZE).unwrap(), "json");
        let target = Column::new("j", ColumnType::Json);
        assert!(needs_conversion("json", &native_type(&target, MAX_CHAR_SIZE).unwrap()));
    }

    #[test]
    fn test_arrays_and_user_defined_types() {
        let live = scan_column(&describe("text[]"), MAX_CHAR_SIZE).unwrap();
        assert_eq!(live.column_type, ColumnType::Other);
        assert_eq!(live.native_type(), Some("_text"));
        assert_eq!(native_type(&live, MAX_CHAR_SIZE).unwrap(), "ARRAY");
        assert!(!needs_conversion("ARRAY", "text[]"));
        assert!(!needs_conversion("ARRAY", "int[3]"));
        assert!(needs_conversion("ARRAY", "text"));

        let desc = ColumnDescription {
            name: "mood".to_string(),
            data_type: "USER-DEFINED".to_string(),
            udt_name: Some("mood".to_string()),
            ..Default::default()
        };
        let live = scan_column(&desc, MAX_CHAR_SIZE).unwrap();
        assert_eq!(live.type_override(DIALECT), Some("mood"));

        let missing = ColumnDescription {
            udt_name: None,
            ..desc
        };
        assert!(scan_column(&missing, MAX_CHAR_SIZE).is_err());
    }

    #[test]
    fn test_other_without_native_type_is_rejected() {
        let err = native_type(&Column::new("x", ColumnType::Other), MAX_CHAR_SIZE).unwrap_err();
        assert!(err.to_string().contains("schema_type"));
    }

    #[test]
    fn test_call_expr() {
        assert!(is_call_expr("now()"));
        assert!(is_call_expr("gen_random_uuid()"));
        assert!(is_call_expr("nextval('users_id_seq'::regclass)"));
        assert!(is_call_expr("to_char(now(), 'YYYY')::text"));
        assert!(!is_call_expr("'O''Brien'::character varying"));
        assert!(!is_call_expr("(1)"));
        assert!(!is_call_expr("now() + 1"));
        assert!(!is_call_expr("1fn()"));
    }

    #[test]
    fn test_array_type() {
        assert!(is_array_type("int[]"));
        assert!(is_array_type("text[2]"));
        assert!(!is_array_type("text"));
        assert!(!is_array_type("text[n]"));
    }

    #[test]
    fn test_render_default() {
        let s = Column::new("name", ColumnType::String).default_value("O'Brien");
        assert_eq!(render_default(&s).as_deref(), Some("'O''Brien'"));

        let b = Column::new("active", ColumnType::Bool).default_value(true);
        assert_eq!(render_default(&b).as_deref(), Some("true"));

        let t = Column::new("at", ColumnType::Time).default_value("CURRENT_TIMESTAMP");
        assert_eq!(render_default(&t).as_deref(), Some("CURRENT_TIMESTAMP"));

        let call = Column::new("id", ColumnType::String).default_value("gen_random_uuid()");
        assert_eq!(render_default(&call).as_deref(), Some("gen_random_uuid()"));

        let n = Column::new("n", ColumnType::Int32).default_value(7);
        assert_eq!(render_default(&n).as_deref(), Some("7"));
        assert_eq!(render_default(&Column::new("x", ColumnType::Int32)), None);
    }

    #[test]
    fn test_non_finite_float_defaults() {
        let cases = [
            (f64::NAN, "'NaN'"),
            (f64::INFINITY, "'Infinity'"),
            (f64::NEG_INFINITY, "'-Infinity'"),
        ];
        for (value, rendered) in cases {
            let c = Column::new("ratio", ColumnType::Float64).default_value(value);
            assert_eq!(render_default(&c).as_deref(), Some(rendered));

            let live = scan_default(ColumnType::Float64, &format!("{rendered}::double precision")).unwrap();
            assert!(defaults_match(&live, &DefaultValue::Float(value)), "{rendered}");
        }
        assert!(!defaults_match(&DefaultValue::Float(f64::NAN), &DefaultValue::Float(0.0)));
    }

    #[test]
    fn test_scan_default() {
        assert_eq!(
            scan_default(ColumnType::String, "'O''Brien'::character varying"),
            Some(DefaultValue::string("O'Brien"))
        );
        assert_eq!(scan_default(ColumnType::Int32, "0"), Some(DefaultValue::Int(0)));
        assert_eq!(scan_default(ColumnType::Int64, "'-1'::integer"), Some(DefaultValue::Int(-1)));
        assert_eq!(scan_default(ColumnType::Bool, "false"), Some(DefaultValue::Bool(false)));
        assert_eq!(scan_default(ColumnType::Float64, "1.5"), Some(DefaultValue::Float(1.5)));
        assert_eq!(
            scan_default(ColumnType::Int64, "nextval('users_id_seq'::regclass)"),
            Some(DefaultValue::expr("nextval('users_id_seq'::regclass)"))
        );
        assert_eq!(
            scan_default(ColumnType::Time, "CURRENT_TIMESTAMP"),
            Some(DefaultValue::expr("CURRENT_TIMESTAMP"))
        );
        assert_eq!(scan_default(ColumnType::String, "NULL::character varying"), None);
    }

    #[test]
    fn test_defaults_match() {
        assert!(defaults_match(&DefaultValue::Int(1), &DefaultValue::Float(1.0)));
        assert!(defaults_match(&DefaultValue::expr("now()"), &DefaultValue::expr("NOW( )")));
        assert!(defaults_match(
            &DefaultValue::expr("CURRENT_TIMESTAMP"),
            &DefaultValue::string("CURRENT_TIMESTAMP")
        ));
        assert!(!defaults_match(&DefaultValue::string("a"), &DefaultValue::string("b")));
        assert!(!defaults_match(&DefaultValue::Bool(true), &DefaultValue::Bool(false)));
    }

    #[test]
    fn test_pin_native_type() {
        let mut c = scan_column(&describe("timestamp without time zone"), MAX_CHAR_SIZE).unwrap();
        pin_native_type(&mut c, MAX_CHAR_SIZE).unwrap();
        assert_eq!(c.type_override(DIALECT), Some("timestamp without time zone"));

        let mut c = scan_column(&describe("jsonb"), MAX_CHAR_SIZE).unwrap();
        pin_native_type(&mut c, MAX_CHAR_SIZE).unwrap();
        assert_eq!(c.type_override(DIALECT), None);

        let mut c = scan_column(&describe("text[]"), MAX_CHAR_SIZE).unwrap();
        pin_native_type(&mut c, MAX_CHAR_SIZE).unwrap();
        assert_eq!(c.type_override(DIALECT), Some("text[]"));

        let mut c = scan_column(&describe("inet"), MAX_CHAR_SIZE).unwrap();
        pin_native_type(&mut c, MAX_CHAR_SIZE).unwrap();
        assert_eq!(c.type_override(DIALECT), Some("inet"));

        // Target columns carry no native type and are left alone.
        let mut target = Column::new("at", ColumnType::Time);
        pin_native_type(&mut target, MAX_CHAR_SIZE).unwrap();
        assert!(target.schema_type.is_empty());
    }
}
