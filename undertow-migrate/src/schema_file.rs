//! Target schema files.
//!
//! A schema file lists the target tables in migration order, as TOML
//! (`[[tables]]` entries) or JSON (`{"tables": [...]}`), chosen by extension.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use undertow::Table;

#[derive(Debug, Error)]
pub enum SchemaFileError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("{path}: unsupported schema file extension (expected .toml or .json)")]
    UnsupportedFormat { path: PathBuf },

    #[error("{path}: no tables declared")]
    Empty { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// Parse `content` as TOML or JSON, per `path`'s extension.
pub fn parse_schema(path: &Path, content: &str) -> Result<Vec<Table>, SchemaFileError> {
    let parse_error = |message: String| SchemaFileError::Parse {
        path: path.to_path_buf(),
        message,
    };
    let file: SchemaFile = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        Some("json") => serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        _ => {
            return Err(SchemaFileError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };
    if file.tables.is_empty() {
        return Err(SchemaFileError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(file.tables)
}

/// Read and parse a schema file.
pub fn load_schema(path: &Path) -> Result<Vec<Table>, SchemaFileError> {
    let content = fs::read_to_string(path).map_err(|source| SchemaFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let tables = parse_schema(path, &content)?;
    log::debug!("loaded {} tables from {}", tables.len(), path.display());
    Ok(tables)
}
