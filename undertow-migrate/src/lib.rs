//! Undertow Migration Library
//!
//! Schema file loading and report rendering for the `undertow-migrate` CLI.

pub mod schema_file;
pub mod summary;

/// Environment variables consulted for the database URL, in order.
pub const DATABASE_URL_VARS: [&str; 2] = ["UNDERTOW_DATABASE_URL", "DATABASE_URL"];

/// The `--database-url` flag, else the first variable of
/// [`DATABASE_URL_VARS`] that `lookup` finds.
pub fn resolve_database_url(flag: Option<String>, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    flag.or_else(|| DATABASE_URL_VARS.iter().find_map(|name| lookup(name)))
        .filter(|url| !url.trim().is_empty())
}
