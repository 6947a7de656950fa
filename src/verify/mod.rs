//! # Query Verifier
//!
//! Decides whether a SQL string is inside the language the schema allows
//! and, when it is, returns the canonical rendering of the query.
//! Verification is independent of the grammar: any SQL string can be
//! checked, whether it came from constrained decoding or from a human.
//!
//! ## Pipeline
//!
//! ```text
//! sql ──> scan ──────> parse ──────> trailing input ──> checks ──> normalize
//!         │             │             │                 │
//!         │ statement   │ SYNTAX_     │ MULTIPLE_       │ UNKNOWN_*, DISALLOWED_*,
//!         │ + denylist  │ ERROR       │ STATEMENTS      │ UNSUPPORTED_CLAUSE,
//!         └─ stop ──────┴─ stop ──────┴─ stop           │ LIMIT_EXCEEDED
//!                                                       └─ all reported together
//! ```
//!
//! The scan runs on tokens before the parser sees anything, so a leading
//! `DROP` or a denylisted keyword anywhere outside strings and comments is
//! reported even when the rest of the input would not parse. Semantic
//! checks never stop at the first finding.
//!
//! ## Violation Codes
//!
//! | Code | Raised for |
//! |------|------------|
//! | `FORBIDDEN_STATEMENT` | statement does not begin with SELECT |
//! | `FORBIDDEN_TOKEN` | denylisted keyword outside strings and comments |
//! | `SYNTAX_ERROR` | input does not parse, or is empty |
//! | `MULTIPLE_STATEMENTS` | more input after a `;` |
//! | `UNKNOWN_TABLE` | table other than the schema's, qualified names |
//! | `UNKNOWN_COLUMN` | column missing, or present without the needed role |
//! | `DISALLOWED_OPERATOR` | OR, NOT, !=, IN, LIKE, BETWEEN, arithmetic |
//! | `DISALLOWED_FUNCTION` | function outside the allowed set, window calls |
//! | `UNSUPPORTED_CLAUSE` | DISTINCT, HAVING, OFFSET, joins, subqueries, `*` |
//! | `LIMIT_EXCEEDED` | LIMIT above the ceiling under the reject policy |
//!
//! ## Usage Example
//!
//! ```ignore
//! use sqlfence::schema::TableSchema;
//! use sqlfence::verify::verify;
//!
//! let schema = TableSchema::trips()?;
//! let result = verify("SELECT count() FROM trips", &schema);
//! assert!(result.accepted);
//! ```

mod checks;
mod normalize;
mod scan;

use crate::config::VerifierConfig;
use crate::schema::TableSchema;
use crate::sql::{Parser, Span, Token};
use bumpalo::Bump;
use serde::Serialize;
use std::fmt;
use tracing::debug;

pub use normalize::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    ForbiddenStatement,
    ForbiddenToken,
    SyntaxError,
    MultipleStatements,
    UnknownTable,
    UnknownColumn,
    DisallowedOperator,
    DisallowedFunction,
    UnsupportedClause,
    LimitExceeded,
}

impl ViolationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationCode::ForbiddenStatement => "FORBIDDEN_STATEMENT",
            ViolationCode::ForbiddenToken => "FORBIDDEN_TOKEN",
            ViolationCode::SyntaxError => "SYNTAX_ERROR",
            ViolationCode::MultipleStatements => "MULTIPLE_STATEMENTS",
            ViolationCode::UnknownTable => "UNKNOWN_TABLE",
            ViolationCode::UnknownColumn => "UNKNOWN_COLUMN",
            ViolationCode::DisallowedOperator => "DISALLOWED_OPERATOR",
            ViolationCode::DisallowedFunction => "DISALLOWED_FUNCTION",
            ViolationCode::UnsupportedClause => "UNSUPPORTED_CLAUSE",
            ViolationCode::LimitExceeded => "LIMIT_EXCEEDED",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reason a query was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub code: ViolationCode,
    pub message: String,
    /// Byte range `(start, end)` of the offending token, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<(usize, usize)>,
}

impl Violation {
    pub fn new(code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            span: None,
        }
    }

    pub fn at(code: ViolationCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span: Some(span.range()),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub accepted: bool,
    /// Canonical rendering; present exactly when the query is accepted.
    pub normalized_sql: Option<String>,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    fn rejected(violations: Vec<Violation>) -> Self {
        Self {
            accepted: false,
            normalized_sql: None,
            violations,
        }
    }

    fn accepted(normalized_sql: String) -> Self {
        Self {
            accepted: true,
            normalized_sql: Some(normalized_sql),
            violations: Vec::new(),
        }
    }

    pub fn has(&self, code: ViolationCode) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }

    pub fn codes(&self) -> Vec<ViolationCode> {
        self.violations.iter().map(|v| v.code).collect()
    }

    /// All violation messages joined into one line, for error surfaces
    /// that carry a single string.
    pub fn error_message(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Verifier bound to one schema and one limit configuration.
///
/// Holds no mutable state, so a single verifier can serve concurrent
/// callers by shared reference.
#[derive(Debug, Clone, Copy)]
pub struct Verifier<'s> {
    schema: &'s TableSchema,
    config: VerifierConfig,
}

impl<'s> Verifier<'s> {
    pub fn new(schema: &'s TableSchema, config: VerifierConfig) -> Self {
        Self { schema, config }
    }

    pub fn for_schema(schema: &'s TableSchema) -> Self {
        Self::new(schema, VerifierConfig::for_schema(schema))
    }

    pub fn schema(&self) -> &'s TableSchema {
        self.schema
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn verify(&self, sql: &str) -> ValidationResult {
        let violations = scan::scan(sql);
        if !violations.is_empty() {
            debug!(count = violations.len(), "query rejected by token scan");
            return ValidationResult::rejected(violations);
        }

        let arena = Bump::new();
        let mut parser = Parser::new(sql, &arena);
        let select = match parser.parse_statement() {
            Ok(select) => select,
            Err(err) => {
                let error = parser.error_from_report(err);
                debug!(error = error.message, "query failed to parse");
                return ValidationResult::rejected(vec![Violation::at(
                    ViolationCode::SyntaxError,
                    error.message,
                    error.span,
                )]);
            }
        };

        let mut terminated = false;
        while parser.consume_token(&Token::Semicolon) {
            terminated = true;
        }
        if !parser.is_at_end() {
            let violation = if terminated {
                Violation::at(
                    ViolationCode::MultipleStatements,
                    "only one statement is allowed",
                    parser.current_span(),
                )
            } else {
                Violation::at(
                    ViolationCode::SyntaxError,
                    format!("unexpected {} after end of query", parser.peek()),
                    parser.current_span(),
                )
            };
            return ValidationResult::rejected(vec![violation]);
        }

        let mut checker = checks::Checker::new(self.schema, &self.config);
        checker.check_select(select);
        let outcome = checker.finish();
        if !outcome.violations.is_empty() {
            debug!(count = outcome.violations.len(), "query rejected by semantic checks");
            return ValidationResult::rejected(outcome.violations);
        }

        let normalized = normalize::normalize_with_limit(select, outcome.limit);
        debug!(sql = %normalized, "query accepted");
        ValidationResult::accepted(normalized)
    }
}

/// Verifies `sql` against `schema` with the schema's own limit ceiling and
/// the reject policy.
pub fn verify(sql: &str, schema: &TableSchema) -> ValidationResult {
    Verifier::for_schema(schema).verify(sql)
}
