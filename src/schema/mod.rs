//! # Schema Model
//!
//! The canonical in-memory description of the one queryable table: its
//! name, its columns with their types and roles, the primary time column,
//! and the row limits. Both the grammar compiler and the verifier read it;
//! neither can mutate it after [`TableSchema::load`].
//!
//! ## Loading
//!
//! ```text
//! schema.json ──serde──> SchemaDefinition ──load()──> TableSchema
//!                                              │
//!                                              ├── identifier validation
//!                                              ├── type parsing + role convention
//!                                              ├── duplicate detection
//!                                              ├── time column resolution
//!                                              └── limit validation
//! ```
//!
//! ## Time Column Resolution
//!
//! 1. `datetime_column` if declared; it must exist and be a datetime column
//! 2. Otherwise the first datetime column in declaration order
//! 3. If none exists and time-window filtering is enabled, loading fails
//!
//! ## Row Limits
//!
//! | Field | Default | Valid range |
//! |-------|---------|-------------|
//! | `max_limit` | 1000 | 1..=9999 |
//! | `default_limit` | min(100, max_limit) | 1..=max_limit |
//!
//! ## Identifier Matching
//!
//! Column lookups are case-sensitive, matching ClickHouse identifier
//! semantics.
//!
//! ## Sharing
//!
//! `TableSchema` holds only owned data and is `Send + Sync`; wrap it in an
//! `Arc` to share across threads (see [`SchemaRegistry`]).

mod definition;
mod error;
mod registry;
mod types;

pub use definition::{parse_column_type, validate_identifier, ColumnDefinition, SchemaDefinition};
pub use error::SchemaError;
pub use registry::{CompiledSchema, SchemaRegistry};
pub use types::{ColumnRole, ColumnSpec, ColumnType, RoleSet};

use crate::config::{DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, NUMERIC_LITERAL_CEILING};
use crate::language::AggregateFunction;
use hashbrown::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

/// Definition of the demo NYC taxi `trips` table shipped with the crate.
pub const TRIPS_DEFINITION: &str = include_str!("../../schemas/trips.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    description: Option<String>,
    columns: Vec<ColumnSpec>,
    index: HashMap<String, usize>,
    primary_time_column: Option<usize>,
    time_window_filtering: bool,
    duration_filtering: bool,
    limits: RowLimits,
}

impl TableSchema {
    pub fn load(definition: &SchemaDefinition) -> Result<Self, SchemaError> {
        if definition.table.trim().is_empty() {
            return Err(SchemaError::EmptyTableName);
        }
        validate_identifier(&definition.table)?;

        if definition.columns.is_empty() {
            return Err(SchemaError::NoColumns(definition.table.clone()));
        }

        let mut columns = Vec::with_capacity(definition.columns.len());
        let mut index = HashMap::with_capacity(definition.columns.len());
        for column_def in &definition.columns {
            let spec = column_def.to_spec()?;
            if index.insert(spec.name().to_string(), columns.len()).is_some() {
                return Err(SchemaError::DuplicateColumn(spec.name().to_string()));
            }
            columns.push(spec);
        }

        let primary_time_column = match &definition.datetime_column {
            Some(declared) => {
                let &position = index
                    .get(declared.as_str())
                    .ok_or_else(|| SchemaError::UnknownTimeColumn(declared.clone()))?;
                let found = columns[position].column_type();
                if found != ColumnType::Datetime {
                    return Err(SchemaError::TimeColumnNotDatetime {
                        column: declared.clone(),
                        found: found.to_string(),
                    });
                }
                Some(position)
            }
            None => columns
                .iter()
                .position(|col| col.column_type() == ColumnType::Datetime),
        };

        if definition.time_window_filtering && primary_time_column.is_none() {
            return Err(SchemaError::MissingTimeColumn(definition.table.clone()));
        }

        let has_datetime = columns
            .iter()
            .any(|col| col.column_type() == ColumnType::Datetime);
        if definition.duration_filtering && !has_datetime {
            return Err(SchemaError::MissingDurationColumns(definition.table.clone()));
        }

        let limits = resolve_limits(definition.default_limit, definition.max_limit)?;

        debug!(
            table = %definition.table,
            columns = columns.len(),
            max_limit = limits.max_limit,
            "loaded table schema"
        );

        Ok(Self {
            name: definition.table.clone(),
            description: definition.description.clone(),
            columns,
            index,
            primary_time_column,
            time_window_filtering: definition.time_window_filtering,
            duration_filtering: definition.duration_filtering,
            limits,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let definition: SchemaDefinition = serde_json::from_str(json)?;
        Self::load(&definition)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// The bundled `trips` demo schema.
    pub fn trips() -> Result<Self, SchemaError> {
        Self::from_json_str(TRIPS_DEFINITION)
    }

    pub fn table_name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Columns carrying `role`, in declaration order.
    pub fn columns_with_role(&self, role: ColumnRole) -> impl Iterator<Item = &ColumnSpec> + '_ {
        self.columns.iter().filter(move |col| col.has_role(role))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.index.get(name).map(|&position| &self.columns[position])
    }

    pub fn primary_time_column(&self) -> Option<&ColumnSpec> {
        self.primary_time_column.map(|position| &self.columns[position])
    }

    pub fn datetime_columns(&self) -> impl Iterator<Item = &ColumnSpec> + '_ {
        self.columns
            .iter()
            .filter(|col| col.column_type() == ColumnType::Datetime)
    }

    pub fn limits(&self) -> RowLimits {
        self.limits
    }

    pub fn supports_time_window(&self) -> bool {
        self.time_window_filtering && self.primary_time_column.is_some()
    }

    pub fn supports_duration_filter(&self) -> bool {
        self.duration_filtering
    }

    /// Plain-text schema description handed to the SQL generator.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Table: {}", self.name);
        if let Some(description) = &self.description {
            let _ = writeln!(out, "Description: {}", description);
        }
        out.push_str("Columns:\n");

        for col in &self.columns {
            let _ = write!(out, "  - {} ({})", col.name(), col.column_type());
            if let Some(description) = col.description() {
                let _ = write!(out, ": {}", description);
            }
            let roles: Vec<_> = col.roles().iter().map(|role| role.as_str()).collect();
            let _ = write!(out, " [{}]", roles.join(", "));
            if !col.allowed_values().is_empty() {
                let _ = write!(out, " [allowed: {}]", col.allowed_values().join(", "));
            }
            out.push('\n');
        }

        out.push('\n');
        if let Some(time_column) = self.primary_time_column() {
            let _ = writeln!(out, "Datetime column for time filters: {}", time_column.name());
        }
        let aggregates: Vec<_> = AggregateFunction::ALL.iter().map(|agg| agg.name()).collect();
        let _ = writeln!(out, "Supported aggregates: {}", aggregates.join(", "));
        let _ = write!(out, "Max result limit: {}", self.limits.max_limit);
        out
    }
}

fn resolve_limits(default_limit: Option<u32>, max_limit: Option<u32>) -> Result<RowLimits, SchemaError> {
    let max_limit = max_limit.unwrap_or(MAX_ROW_LIMIT);
    if max_limit == 0 || u64::from(max_limit) > NUMERIC_LITERAL_CEILING {
        return Err(SchemaError::InvalidLimits(format!(
            "max_limit {} outside 1..={}",
            max_limit, NUMERIC_LITERAL_CEILING
        )));
    }

    let default_limit = default_limit.unwrap_or(DEFAULT_ROW_LIMIT.min(max_limit));
    if default_limit == 0 || default_limit > max_limit {
        return Err(SchemaError::InvalidLimits(format!(
            "default_limit {} outside 1..={}",
            default_limit, max_limit
        )));
    }

    Ok(RowLimits {
        default_limit,
        max_limit,
    })
}
