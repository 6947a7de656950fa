//! # Grammar Compiler
//!
//! Derives a context-free grammar from a [`TableSchema`] such that every
//! sentence the grammar can produce is a safe query over that schema. The
//! artifact is handed to the SQL generator as a decoding constraint; the
//! verifier never trusts it and re-checks every candidate independently.
//!
//! ## Produced Language
//!
//! ```text
//! start           → aggregate_query | grouped_query
//! aggregate_query → "SELECT " select_list " FROM " table [where_clause] limit_clause
//! grouped_query   → "SELECT " <d>_select_list " FROM " table [where_clause]
//!                   " GROUP BY <d>" more_dims <d>_order_clause limit_clause
//!                   (one alternative per groupable column <d>)
//! condition       → time_window | equality | duration
//! predicate       → condition (" AND " condition)*
//! ```
//!
//! The only bare column `<d>_select_list` and `<d>_order_clause` can name
//! is `<d>` itself, which every grouped shape groups on first.
//!
//! `grouped_query` exists only when the schema has groupable columns, and
//! each condition form only when the schema supports it. The table name,
//! every column name, every allowed value and every keyword is a terminal;
//! there is no production that can spell an identifier the schema does not
//! define.
//!
//! ## Numeric Literals
//!
//! | Position | Production | Range |
//! |----------|------------|-------|
//! | `INTERVAL n`, duration threshold, integer equality | `positive_int` | 1..=9999, no leading zero |
//! | `LIMIT n` | `limit_value` | 1..=max_limit, exact |
//!
//! `limit_value` is an exact digit-wise decomposition of the integer range,
//! so the LIMIT ceiling is enforced by the grammar's terminals rather than
//! by a post-check.
//!
//! ## Determinism
//!
//! Rules appear in a fixed order and alternatives follow column declaration
//! order, then the fixed operator order of [`crate::language`]. Two
//! compilations of the same schema produce identical rules and identical
//! Lark text.
//!
//! ## Artifact Shape
//!
//! ```text
//! GrammarArtifact
//!     ├── rules: Vec<Rule>            (name → ordered alternatives)
//!     ├── start_symbol: "start"
//!     ├── allowed_tables: {table}
//!     ├── allowed_columns: {table → columns used by any terminal}
//!     └── allowed_aggregates: {count, sum, avg, min, max}
//! ```

mod compiler;
mod lark;
mod sample;

pub use compiler::compile;

use hashbrown::HashMap;
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub const START_SYMBOL: &str = "start";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    /// Terminal text emitted verbatim.
    Literal(String),
    /// Reference to another rule by name.
    Rule(String),
}

impl Symbol {
    pub fn literal(text: impl Into<String>) -> Self {
        Symbol::Literal(text.into())
    }

    pub fn rule(name: impl Into<String>) -> Self {
        Symbol::Rule(name.into())
    }
}

/// One alternative of a rule. Empty means epsilon.
pub type Production = SmallVec<[Symbol; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub name: String,
    pub alternatives: Vec<Production>,
}

impl Rule {
    pub fn is_nullable(&self) -> bool {
        self.alternatives.iter().any(|alt| alt.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarBuildError {
    #[error("table '{0}' has no metric columns, so no aggregate query is expressible")]
    NoMetricColumns(String),

    #[error("table '{0}' has no metric, groupable or filterable columns")]
    Degenerate(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrammarArtifact {
    rules: Vec<Rule>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    min_heights: Vec<usize>,
    start_symbol: String,
    allowed_tables: BTreeSet<String>,
    allowed_columns: BTreeMap<String, BTreeSet<String>>,
    allowed_aggregates: BTreeSet<String>,
}

impl GrammarArtifact {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.index.get(name).map(|&position| &self.rules[position])
    }

    pub fn start_symbol(&self) -> &str {
        &self.start_symbol
    }

    pub fn allowed_tables(&self) -> &BTreeSet<String> {
        &self.allowed_tables
    }

    pub fn allowed_columns(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.allowed_columns
    }

    pub fn allowed_aggregates(&self) -> &BTreeSet<String> {
        &self.allowed_aggregates
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn rule_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableSchema;

    fn trips_grammar() -> GrammarArtifact {
        compile(&TableSchema::trips().unwrap()).unwrap()
    }

    #[test]
    fn artifact_exposes_allowed_identifiers() {
        let grammar = trips_grammar();
        assert_eq!(grammar.start_symbol(), START_SYMBOL);
        assert!(grammar.allowed_tables().contains("trips"));
        let columns = &grammar.allowed_columns()["trips"];
        assert!(columns.contains("fare_amount"));
        assert!(columns.contains("pickup_datetime"));
        assert!(!columns.contains("store_and_fwd_flag"));
        assert_eq!(grammar.allowed_aggregates().len(), 5);
    }

    #[test]
    fn rule_lookup_by_name() {
        let grammar = trips_grammar();
        let table = grammar.rule("table").unwrap();
        assert_eq!(table.alternatives.len(), 1);
        assert_eq!(table.alternatives[0].as_slice(), &[Symbol::literal("trips")]);
        assert!(grammar.rule("nonexistent").is_none());
    }

    #[test]
    fn every_referenced_rule_is_defined() {
        let grammar = trips_grammar();
        for rule in grammar.rules() {
            for alt in &rule.alternatives {
                for symbol in alt {
                    if let Symbol::Rule(name) = symbol {
                        assert!(grammar.rule(name).is_some(), "{} references undefined {}", rule.name, name);
                    }
                }
            }
        }
    }

    #[test]
    fn json_serializes_rules_and_symbols() {
        let json = trips_grammar().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["start_symbol"], "start");
        assert_eq!(value["rules"][0]["name"], "start");
        assert_eq!(value["allowed_tables"][0], "trips");
        assert!(value.get("index").is_none());
    }

    #[test]
    fn nullable_rules() {
        let grammar = trips_grammar();
        assert!(grammar.rule("where_clause").unwrap().is_nullable());
        assert!(!grammar.rule("select_list").unwrap().is_nullable());
    }
}
