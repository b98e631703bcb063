//! Identifier validation and quoting for generated DDL.
//!
//! Identifiers cannot be bound as statement parameters, so every table, column,
//! index and constraint name interpolated into DDL text goes through
//! [`quote`], which checks it against an allow-list before quoting.

use crate::error::{Result, SchemaError};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// PostgreSQL truncates identifiers to NAMEDATALEN - 1 bytes.
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("identifier pattern is valid"));

/// Check that `name` is safe to interpolate into statement text.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SchemaError::configuration("identifier cannot be empty"));
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(SchemaError::configuration(format!(
            "identifier {name:?} exceeds {MAX_IDENTIFIER_LENGTH} bytes"
        )));
    }
    if !IDENTIFIER.is_match(name) {
        return Err(SchemaError::configuration(format!(
            "identifier {name:?} contains characters outside [A-Za-z0-9_$]"
        )));
    }
    Ok(())
}

/// Validate and double-quote an identifier.
pub fn quote(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{name}\""))
}

/// Validate, quote and comma-join a list of identifiers.
pub fn quote_list<S: AsRef<str>>(names: &[S]) -> Result<String> {
    let quoted = names
        .iter()
        .map(|n| quote(n.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(quoted.join(", "))
}

/// Shorten a symbol that would exceed the identifier limit.
///
/// The result keeps a readable prefix and appends a hash of the full name, so
/// the same input always maps to the same stored symbol.
pub fn symbol(name: &str) -> String {
    if name.len() <= MAX_IDENTIFIER_LENGTH {
        return name.to_string();
    }
    let digest = Sha256::digest(name.as_bytes());
    let hash: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    let mut cut = MAX_IDENTIFIER_LENGTH - hash.len() - 1;
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}_{}", &name[..cut], hash)
}

/// Check a CHECK-constraint expression for statement-injection patterns.
pub fn validate_check_expr(expr: &str) -> Result<()> {
    if expr.trim().is_empty() {
        return Err(SchemaError::configuration("check expression cannot be empty"));
    }
    if expr.contains(';') {
        return Err(SchemaError::configuration(format!(
            "check expression contains a statement separator: {expr:?}"
        )));
    }
    if expr.contains("--") || expr.contains("/*") || expr.contains("*/") {
        return Err(SchemaError::configuration(format!(
            "check expression contains comment markers: {expr:?}"
        )));
    }
    let mut depth = 0i32;
    for c in expr.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            break;
        }
    }
    if depth != 0 {
        return Err(SchemaError::configuration(format!(
            "check expression has unbalanced parentheses: {expr:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_accepts_plain_names() {
        assert_eq!(quote("users").unwrap(), "\"users\"");
        assert_eq!(quote("_tmp$1").unwrap(), "\"_tmp$1\"");
        assert_eq!(quote_list(&["a", "b_c"]).unwrap(), "\"a\", \"b_c\"");
    }

    #[test]
    fn test_quote_rejects_injection_surfaces() {
        for bad in ["", "users\"; DROP TABLE x", "1users", "na me", "users\0", "sch.tbl"] {
            assert!(quote(bad).is_err(), "should reject {bad:?}");
        }
        assert!(quote(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_symbol_is_stable_and_bounded() {
        assert_eq!(symbol("users_name"), "users_name");
        let long = format!("{}_{}", "a".repeat(40), "b".repeat(40));
        let short = symbol(&long);
        assert_eq!(short.len(), MAX_IDENTIFIER_LENGTH);
        assert_eq!(short, symbol(&long));
        assert!(short.starts_with("aaaa"));
        assert!(validate_identifier(&short).is_ok());
    }

    #[test]
    fn test_check_expr_validation() {
        assert!(validate_check_expr("age >= 0").is_ok());
        assert!(validate_check_expr("status IN ('a', 'b')").is_ok());
        assert!(validate_check_expr("1=1; DROP TABLE users").is_err());
        assert!(validate_check_expr("age > 0 -- note").is_err());
        assert!(validate_check_expr("(age > 0").is_err());
        assert!(validate_check_expr("   ").is_err());
    }
}
