//! # Declarative Schema Definition
//!
//! The serde shape of a schema file and its conversion into validated
//! [`ColumnSpec`] values. A definition looks like:
//!
//! ```json
//! {
//!   "table": "trips",
//!   "datetime_column": "pickup_datetime",
//!   "duration_filtering": true,
//!   "max_limit": 1000,
//!   "columns": [
//!     { "name": "pickup_datetime", "type": "DateTime" },
//!     { "name": "fare_amount", "type": "Float64", "description": "Fare in USD" },
//!     { "name": "payment_type", "type": "UInt8", "allowed_values": [1, 2, 3, 4] }
//!   ]
//! }
//! ```
//!
//! ## Type Names
//!
//! | Accepted spelling (case-insensitive) | Column type |
//! |--------------------------------------|-------------|
//! | `datetime`, `DateTime`, `DateTime64(3)`, `Date`, `Date32`, `timestamp` | datetime |
//! | `integer`, `int`, `bigint`, `Int8`..`Int256`, `UInt8`..`UInt256` | integer |
//! | `float`, `double`, `Float32`, `Float64`, `Decimal(p, s)` | float |
//! | `string`, `String`, `FixedString(n)`, `text` | string |
//! | `Enum8(..)`, `Enum16(..)` | string, categorical |
//!
//! `Nullable(T)` unwraps to `T`. `LowCardinality(T)` unwraps to `T` and
//! marks the column categorical.
//!
//! ## Role Convention
//!
//! Unless a column lists explicit `roles`:
//!
//! ```text
//! datetime                      → {filterable}
//! categorical (any non-datetime) → {filterable, groupable}
//! numeric                       → {filterable, metric}
//! string                        → {filterable}
//! ```
//!
//! A column is categorical when it sets `"categorical": true`, uses
//! `LowCardinality`/`Enum`, or declares `allowed_values`.

use super::error::SchemaError;
use super::types::{ColumnRole, ColumnSpec, ColumnType, RoleSet};
use crate::config::MAX_IDENTIFIER_LEN;
use crate::sql::is_keyword;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime_column: Option<String>,
    #[serde(default = "default_true")]
    pub time_window_filtering: bool,
    #[serde(default)]
    pub duration_filtering: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub categorical: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<serde_json::Value>,
    /// Explicit role override; replaces the type-based convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            description: None,
            categorical: false,
            allowed_values: Vec::new(),
            roles: None,
        }
    }

    pub(crate) fn to_spec(&self) -> Result<ColumnSpec, SchemaError> {
        validate_identifier(&self.name)?;

        let (column_type, type_is_categorical) =
            parse_column_type(&self.column_type).ok_or_else(|| SchemaError::UnknownType {
                column: self.name.clone(),
                raw: self.column_type.clone(),
            })?;

        let allowed_values = self.allowed_values(column_type)?;
        let categorical = column_type != ColumnType::Datetime
            && (self.categorical || type_is_categorical || !allowed_values.is_empty());

        let roles = match &self.roles {
            Some(names) => self.explicit_roles(names, column_type)?,
            None => conventional_roles(column_type, categorical),
        };

        let mut spec = ColumnSpec::new(self.name.clone(), column_type, roles).with_allowed_values(allowed_values);
        if let Some(description) = &self.description {
            spec = spec.with_description(description.clone());
        }
        Ok(spec)
    }

    fn allowed_values(&self, column_type: ColumnType) -> Result<Vec<String>, SchemaError> {
        let invalid = |value: &serde_json::Value, reason| SchemaError::InvalidAllowedValue {
            column: self.name.clone(),
            value: value.to_string(),
            reason,
        };

        if column_type == ColumnType::Datetime && !self.allowed_values.is_empty() {
            return Err(invalid(&self.allowed_values[0], "datetime columns take no allowed values"));
        }

        let mut values = Vec::with_capacity(self.allowed_values.len());
        for value in &self.allowed_values {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => return Err(invalid(value, "must be a string or a number")),
            };
            match column_type {
                ColumnType::Integer if !is_plain_number(&text, false) => {
                    return Err(invalid(value, "not an integer literal"));
                }
                ColumnType::Float if !is_plain_number(&text, true) => {
                    return Err(invalid(value, "not a decimal literal"));
                }
                _ => {}
            }
            if values.contains(&text) {
                return Err(invalid(value, "listed more than once"));
            }
            values.push(text);
        }
        Ok(values)
    }

    fn explicit_roles(&self, names: &[String], column_type: ColumnType) -> Result<RoleSet, SchemaError> {
        let mut roles = RoleSet::empty();
        for name in names {
            let role = ColumnRole::from_name(name).ok_or_else(|| SchemaError::InvalidRole {
                column: self.name.clone(),
                role: name.clone(),
                reason: "unknown role",
            })?;
            if role == ColumnRole::Metric && !column_type.is_numeric() {
                return Err(SchemaError::InvalidRole {
                    column: self.name.clone(),
                    role: name.clone(),
                    reason: "metric requires a numeric column",
                });
            }
            roles.insert(role);
        }
        if roles.is_empty() {
            return Err(SchemaError::EmptyRoles(self.name.clone()));
        }
        Ok(roles)
    }
}

fn conventional_roles(column_type: ColumnType, categorical: bool) -> RoleSet {
    let roles = RoleSet::empty().with(ColumnRole::Filterable);
    match column_type {
        ColumnType::Datetime => roles,
        _ if categorical => roles.with(ColumnRole::Groupable),
        ColumnType::Integer | ColumnType::Float => roles.with(ColumnRole::Metric),
        ColumnType::String => roles,
    }
}

/// Parses a type spelling into a column type and whether the spelling
/// itself implies a categorical column.
pub fn parse_column_type(raw: &str) -> Option<(ColumnType, bool)> {
    let trimmed = raw.trim();

    if let Some(inner) = strip_wrapper(trimmed, "Nullable") {
        return parse_column_type(inner);
    }
    if let Some(inner) = strip_wrapper(trimmed, "LowCardinality") {
        return parse_column_type(inner).map(|(column_type, _)| (column_type, true));
    }

    let base = trimmed.split('(').next().unwrap_or("").trim().to_ascii_lowercase();
    let digits_only = |rest: &str| rest.bytes().all(|b| b.is_ascii_digit());

    let parsed = match base.as_str() {
        "datetime" | "datetime64" | "date" | "date32" | "timestamp" => (ColumnType::Datetime, false),
        "integer" | "int" | "bigint" | "smallint" | "tinyint" => (ColumnType::Integer, false),
        "float" | "double" | "real" | "decimal" => (ColumnType::Float, false),
        "string" | "fixedstring" | "text" | "varchar" => (ColumnType::String, false),
        "enum" | "enum8" | "enum16" => (ColumnType::String, true),
        other => {
            if let Some(rest) = other.strip_prefix("uint").or_else(|| other.strip_prefix("int")) {
                if !rest.is_empty() && digits_only(rest) {
                    return Some((ColumnType::Integer, false));
                }
            }
            if let Some(rest) = other.strip_prefix("float").or_else(|| other.strip_prefix("decimal")) {
                if !rest.is_empty() && digits_only(rest) {
                    return Some((ColumnType::Float, false));
                }
            }
            return None;
        }
    };
    Some(parsed)
}

fn strip_wrapper<'a>(raw: &'a str, wrapper: &str) -> Option<&'a str> {
    let prefix = raw.get(..wrapper.len())?;
    if !prefix.eq_ignore_ascii_case(wrapper) {
        return None;
    }
    raw[wrapper.len()..]
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
        .map(str::trim)
}

/// `[-]digits` or, with `allow_fraction`, `[-]digits.digits`.
fn is_plain_number(text: &str, allow_fraction: bool) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) if allow_fraction => (whole, Some(fraction)),
        Some(_) => return false,
        None => (unsigned, None),
    };
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    is_digits(whole) && fraction.map_or(true, is_digits)
}

/// Table and column names must lex as plain identifiers so that grammar
/// terminals and normalized SQL never need quoting.
pub fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    let invalid = |reason| SchemaError::InvalidIdentifier {
        name: name.to_string(),
        reason,
    };

    let mut bytes = name.bytes();
    match bytes.next() {
        None => return Err(invalid("identifier is empty")),
        Some(first) if !(first.is_ascii_alphabetic() || first == b'_') => {
            return Err(invalid("must start with a letter or underscore"));
        }
        Some(_) => {}
    }
    if !bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(invalid("may contain only letters, digits and underscores"));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid("exceeds the maximum identifier length"));
    }
    if is_keyword(name) {
        return Err(invalid("is a reserved SQL keyword"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clickhouse_type_spellings() {
        assert_eq!(parse_column_type("DateTime"), Some((ColumnType::Datetime, false)));
        assert_eq!(parse_column_type("DateTime64(3)"), Some((ColumnType::Datetime, false)));
        assert_eq!(parse_column_type("UInt8"), Some((ColumnType::Integer, false)));
        assert_eq!(parse_column_type("Int64"), Some((ColumnType::Integer, false)));
        assert_eq!(parse_column_type("Float64"), Some((ColumnType::Float, false)));
        assert_eq!(parse_column_type("Decimal(10, 2)"), Some((ColumnType::Float, false)));
        assert_eq!(parse_column_type("FixedString(3)"), Some((ColumnType::String, false)));
        assert_eq!(parse_column_type("integer"), Some((ColumnType::Integer, false)));
    }

    #[test]
    fn wrappers_unwrap() {
        assert_eq!(parse_column_type("Nullable(Float32)"), Some((ColumnType::Float, false)));
        assert_eq!(
            parse_column_type("LowCardinality(String)"),
            Some((ColumnType::String, true))
        );
        assert_eq!(
            parse_column_type("LowCardinality(Nullable(String))"),
            Some((ColumnType::String, true))
        );
        assert_eq!(parse_column_type("Enum8('a' = 1)"), Some((ColumnType::String, true)));
    }

    #[test]
    fn rejects_unknown_types() {
        assert_eq!(parse_column_type("Array(String)"), None);
        assert_eq!(parse_column_type("interval"), None);
        assert_eq!(parse_column_type("UInt"), None);
        assert_eq!(parse_column_type(""), None);
    }

    #[test]
    fn conventional_roles_by_type() {
        let metric = ColumnDefinition::new("fare_amount", "Float64").to_spec().unwrap();
        assert!(metric.has_role(ColumnRole::Metric));
        assert!(metric.has_role(ColumnRole::Filterable));
        assert!(!metric.has_role(ColumnRole::Groupable));

        let time = ColumnDefinition::new("pickup_datetime", "DateTime").to_spec().unwrap();
        let roles: Vec<_> = time.roles().iter().collect();
        assert_eq!(roles, vec![ColumnRole::Filterable]);

        let mut payment = ColumnDefinition::new("payment_type", "UInt8");
        payment.allowed_values = vec![serde_json::json!(1), serde_json::json!(2)];
        let payment = payment.to_spec().unwrap();
        assert!(payment.has_role(ColumnRole::Groupable));
        assert!(!payment.has_role(ColumnRole::Metric));
        assert_eq!(payment.allowed_values(), ["1", "2"]);
    }

    #[test]
    fn explicit_metric_on_string_is_rejected() {
        let mut col = ColumnDefinition::new("zone", "String");
        col.roles = Some(vec!["metric".into()]);
        assert!(matches!(col.to_spec(), Err(SchemaError::InvalidRole { .. })));
    }

    #[test]
    fn explicit_empty_roles_are_rejected() {
        let mut col = ColumnDefinition::new("zone", "String");
        col.roles = Some(Vec::new());
        assert!(matches!(col.to_spec(), Err(SchemaError::EmptyRoles(_))));
    }

    #[test]
    fn integer_allowed_values_must_be_integers() {
        let mut col = ColumnDefinition::new("payment_type", "UInt8");
        col.allowed_values = vec![serde_json::json!("cash")];
        assert!(matches!(
            col.to_spec(),
            Err(SchemaError::InvalidAllowedValue { .. })
        ));
    }

    #[test]
    fn identifier_rules() {
        assert!(validate_identifier("trip_distance").is_ok());
        assert!(validate_identifier("_x1").is_ok());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("fare amount").is_err());
        assert!(validate_identifier("select").is_err());
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LEN + 1)).is_err());
    }

    #[test]
    fn plain_numbers() {
        assert!(is_plain_number("42", false));
        assert!(is_plain_number("-3", false));
        assert!(!is_plain_number("1.5", false));
        assert!(is_plain_number("1.5", true));
        assert!(!is_plain_number("1.", true));
        assert!(!is_plain_number("1e5", true));
    }
}
