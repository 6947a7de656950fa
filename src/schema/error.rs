use std::path::PathBuf;
use thiserror::Error;

/// Malformed schema input. Fatal at startup: a process that fails to load
/// its schema must not serve queries.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table name must not be empty")]
    EmptyTableName,

    #[error("invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: &'static str },

    #[error("table '{0}' declares no columns")]
    NoColumns(String),

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("column '{column}' has unrecognized type '{raw}'")]
    UnknownType { column: String, raw: String },

    #[error("column '{0}' has an empty role set")]
    EmptyRoles(String),

    #[error("column '{column}' cannot take role '{role}': {reason}")]
    InvalidRole {
        column: String,
        role: String,
        reason: &'static str,
    },

    #[error("column '{column}' has invalid allowed value {value}: {reason}")]
    InvalidAllowedValue {
        column: String,
        value: String,
        reason: &'static str,
    },

    #[error("table '{0}' enables time-window filtering but has no datetime column")]
    MissingTimeColumn(String),

    #[error("time column '{0}' is not a column of the table")]
    UnknownTimeColumn(String),

    #[error("time column '{column}' has type {found}, expected datetime")]
    TimeColumnNotDatetime { column: String, found: String },

    #[error("table '{0}' enables duration filtering but has no datetime columns")]
    MissingDurationColumns(String),

    #[error("invalid row limits: {0}")]
    InvalidLimits(String),

    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed schema definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown schema '{0}'")]
    UnknownSchema(String),
}
