use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Table presence report for a candidate reference store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaReport {
    pub available_tables: Vec<String>,
    pub required_tables: Vec<String>,
    pub found_tables: Vec<String>,
    pub missing_tables: Vec<String>,
    pub is_valid: bool,
}

/// Errors raised by the store, resolver, form model and assembler.
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("missing required parameters: {}", .fields.join(", "))]
    Validation { fields: Vec<String> },

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("invalid database file: {}", .path.display())]
    InvalidDatabase {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error(
        "database schema not recognized: missing tables [{}]; available tables [{}]",
        .0.missing_tables.join(", "),
        .0.available_tables.join(", ")
    )]
    SchemaMismatch(SchemaReport),

    #[error("{entity} '{key}' not found in {table}")]
    NotFound {
        entity: &'static str,
        key: String,
        table: &'static str,
    },

    #[error("reference store not initialized; upload a reference database first")]
    StoreUninitialized,

    #[error("failed to {action}: {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reference store query failed")]
    Query(#[from] rusqlite::Error),
}

impl BuilderError {
    pub fn missing<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Validation {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// HTTP-style status class for the failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. }
            | Self::InvalidValue { .. }
            | Self::InvalidDatabase { .. }
            | Self::SchemaMismatch(_)
            | Self::StoreUninitialized => 400,
            Self::NotFound { .. } => 404,
            Self::Io { .. } | Self::Query(_) => 500,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.status_code() {
            400 => 2,
            404 => 3,
            _ => 1,
        }
    }
}
