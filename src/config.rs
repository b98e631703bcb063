//! Migration options.
//!
//! Options can be built in code or loaded with [`MigrateOptions::load`] from
//! the `[migrate]` section of `config/migrate.toml` and from
//! `UNDERTOW__MIGRATE__*` environment variables, which take precedence.

use crate::dialect::postgres::typemap::MAX_CHAR_SIZE;
use crate::error::{Result, SchemaError};
use crate::identifier::validate_identifier;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "config/migrate.toml";

/// Options recognized by the migrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateOptions {
    /// Give every table a disjoint 2^32 identifier range, by position in the table list.
    pub universal_id: bool,
    /// Drop live columns that are not in the target.
    pub drop_columns: bool,
    /// Drop live indexes that are not in the target.
    pub drop_indexes: bool,
    /// Rename legacy foreign-key columns to their current names.
    pub with_fixture: bool,
    /// Create missing foreign keys in the second pass.
    pub with_foreign_keys: bool,
    /// Run every statement inside one BEGIN/COMMIT.
    pub transactional: bool,
    /// Schema to read; the connection's current schema when unset.
    pub schema: Option<String>,
    /// Longest string kept as `varchar`.
    pub max_char_size: u64,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            universal_id: false,
            drop_columns: false,
            drop_indexes: false,
            with_fixture: false,
            with_foreign_keys: true,
            transactional: false,
            schema: None,
            max_char_size: MAX_CHAR_SIZE,
        }
    }
}

impl MigrateOptions {
    pub fn universal_id(mut self, enabled: bool) -> Self {
        self.universal_id = enabled;
        self
    }

    pub fn drop_columns(mut self, enabled: bool) -> Self {
        self.drop_columns = enabled;
        self
    }

    pub fn drop_indexes(mut self, enabled: bool) -> Self {
        self.drop_indexes = enabled;
        self
    }

    pub fn with_fixture(mut self, enabled: bool) -> Self {
        self.with_fixture = enabled;
        self
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.with_foreign_keys = enabled;
        self
    }

    pub fn transactional(mut self, enabled: bool) -> Self {
        self.transactional = enabled;
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn max_char_size(mut self, size: u64) -> Self {
        self.max_char_size = size;
        self
    }

    /// Reject contradictory combinations before anything touches the database.
    pub fn validate(&self) -> Result<()> {
        if self.with_fixture && !self.with_foreign_keys {
            return Err(SchemaError::configuration(
                "with_fixture needs with_foreign_keys: legacy columns are found through their foreign keys",
            ));
        }
        if self.max_char_size == 0 {
            return Err(SchemaError::configuration("max_char_size must be positive"));
        }
        if let Some(schema) = &self.schema {
            validate_identifier(schema)?;
        }
        Ok(())
    }

    /// Load from `config/migrate.toml` (optional) and the environment.
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from `path` (optional) and the environment.
    pub fn load_from(path: &str) -> std::result::Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("UNDERTOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match settings.get::<MigrateOptions>("migrate") {
            Ok(options) => Ok(options),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "migrate options could not be loaded from {path} or the environment: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let o = MigrateOptions::default();
        assert!(o.with_foreign_keys);
        assert!(!o.drop_columns && !o.drop_indexes && !o.with_fixture && !o.universal_id);
        assert_eq!(o.max_char_size, 10 << 20);
        assert!(o.validate().is_ok());
    }

    #[test]
    fn test_fixture_requires_foreign_keys() {
        let o = MigrateOptions::default().with_fixture(true).with_foreign_keys(false);
        assert_eq!(o.validate().unwrap_err().kind(), ErrorKind::Configuration);
        assert!(MigrateOptions::default().with_fixture(true).validate().is_ok());
    }

    #[test]
    fn test_invalid_schema_name() {
        let o = MigrateOptions::default().schema("app; drop");
        assert!(o.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[migrate]\ndrop_columns = true\nuniversal_id = true\nschema = \"app\"\nmax_char_size = 4096"
        )
        .unwrap();
        let o = MigrateOptions::load_from(file.path().to_str().unwrap()).unwrap();
        assert!(o.drop_columns);
        assert!(o.universal_id);
        assert!(o.with_foreign_keys);
        assert_eq!(o.schema.as_deref(), Some("app"));
        assert_eq!(o.max_char_size, 4096);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let o = MigrateOptions::load_from("does/not/exist.toml").unwrap();
        assert_eq!(o, MigrateOptions::default());
    }
}
