//! # Column Types and Roles
//!
//! Logical column types and the operation roles a column may play in a
//! query. Roles are stored as a compact bitmask; iteration order always
//! follows [`ColumnRole::ALL`] so anything rendered from a role set is
//! deterministic.
//!
//! | Role | Query position |
//! |------|----------------|
//! | Filterable | WHERE predicates |
//! | Groupable | GROUP BY, bare select items, ORDER BY keys |
//! | Metric | `sum`/`avg`/`min`/`max` argument |

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Datetime,
    Integer,
    Float,
    String,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Datetime => "datetime",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::String => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Filterable,
    Groupable,
    Metric,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 3] = [ColumnRole::Filterable, ColumnRole::Groupable, ColumnRole::Metric];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::Filterable => "filterable",
            ColumnRole::Groupable => "groupable",
            ColumnRole::Metric => "metric",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(name))
    }

    const fn bit(self) -> u8 {
        match self {
            ColumnRole::Filterable => 1 << 0,
            ColumnRole::Groupable => 1 << 1,
            ColumnRole::Metric => 1 << 2,
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn with(self, role: ColumnRole) -> Self {
        Self(self.0 | role.bit())
    }

    pub fn insert(&mut self, role: ColumnRole) {
        self.0 |= role.bit();
    }

    pub fn contains(&self, role: ColumnRole) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = ColumnRole> + '_ {
        ColumnRole::ALL.into_iter().filter(|role| self.contains(*role))
    }
}

impl FromIterator<ColumnRole> for RoleSet {
    fn from_iter<I: IntoIterator<Item = ColumnRole>>(iter: I) -> Self {
        let mut set = RoleSet::empty();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    name: String,
    column_type: ColumnType,
    roles: RoleSet,
    description: Option<String>,
    allowed_values: Vec<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType, roles: RoleSet) -> Self {
        Self {
            name: name.into(),
            column_type,
            roles,
            description: None,
            allowed_values: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_allowed_values(mut self, values: Vec<String>) -> Self {
        self.allowed_values = values;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn roles(&self) -> RoleSet {
        self.roles
    }

    pub fn has_role(&self, role: ColumnRole) -> bool {
        self.roles.contains(role)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Closed value set for equality predicates; empty when unknown.
    pub fn allowed_values(&self) -> &[String] {
        &self.allowed_values
    }

    /// Renders `value` as a SQL literal of this column's type: strings are
    /// single-quoted with `'` doubled and `\` escaped, numbers are emitted
    /// bare.
    pub fn literal(&self, value: &str) -> String {
        match self.column_type {
            ColumnType::Integer | ColumnType::Float => value.to_string(),
            ColumnType::String | ColumnType::Datetime => {
                format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_set_iterates_in_canonical_order() {
        let roles = RoleSet::empty()
            .with(ColumnRole::Metric)
            .with(ColumnRole::Filterable);
        let collected: Vec<_> = roles.iter().collect();
        assert_eq!(collected, vec![ColumnRole::Filterable, ColumnRole::Metric]);
        assert!(!roles.contains(ColumnRole::Groupable));
    }

    #[test]
    fn role_set_from_iterator() {
        let roles: RoleSet = [ColumnRole::Groupable].into_iter().collect();
        assert!(roles.contains(ColumnRole::Groupable));
        assert!(!roles.is_empty());
        assert!(RoleSet::empty().is_empty());
    }

    #[test]
    fn string_literal_escapes_quotes() {
        let col = ColumnSpec::new("vendor", ColumnType::String, RoleSet::empty());
        assert_eq!(col.literal("O'Hare"), "'O''Hare'");
    }

    #[test]
    fn string_literal_escapes_backslashes() {
        let col = ColumnSpec::new("path", ColumnType::String, RoleSet::empty());
        assert_eq!(col.literal(r"C:\"), r"'C:\\'");
        assert_eq!(col.literal(r"a\'"), r"'a\\'''");
    }

    #[test]
    fn numeric_literal_is_bare() {
        let col = ColumnSpec::new("payment_type", ColumnType::Integer, RoleSet::empty());
        assert_eq!(col.literal("2"), "2");
    }
}
