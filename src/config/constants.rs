//! # sqlfence Configuration Constants
//!
//! This module centralizes the numeric limits shared by the schema loader,
//! the grammar compiler and the query verifier. Values that bound each other
//! are co-located and their relationships are checked at compile time, so the
//! grammar can never derive a literal that the verifier would refuse.
//!
//! ## Dependency Graph
//!
//! ```text
//! MAX_NUMERIC_DIGITS (4)
//!       │
//!       └─> NUMERIC_LITERAL_CEILING (derived: 10^digits - 1 = 9999)
//!             Largest literal the bounded digit production can emit.
//!             │
//!             └─> MAX_ROW_LIMIT (1000, must be <=)
//!                   Default LIMIT ceiling; a schema may lower it, never
//!                   raise it above the literal ceiling.
//!                   │
//!                   └─> DEFAULT_ROW_LIMIT (100, must be <=)
//! ```
//!
//! ## Critical Invariants
//!
//! 1. `DEFAULT_ROW_LIMIT <= MAX_ROW_LIMIT`
//! 2. `MAX_ROW_LIMIT <= NUMERIC_LITERAL_CEILING`
//! 3. `NUMERIC_LITERAL_CEILING == 10^MAX_NUMERIC_DIGITS - 1`
//!
//! ## Usage
//!
//! ```ignore
//! use sqlfence::config::{DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT};
//! ```

// ============================================================================
// ROW LIMITS
// Bound result sizes; shared by schema validation, grammar and verifier
// ============================================================================

/// Maximum number of digits in an `INTERVAL`, duration or `LIMIT` literal.
pub const MAX_NUMERIC_DIGITS: usize = 4;

/// Largest integer the bounded digit production can derive.
pub const NUMERIC_LITERAL_CEILING: u64 = 10u64.pow(MAX_NUMERIC_DIGITS as u32) - 1;

/// Hard ceiling on `LIMIT` when a schema does not declare its own.
pub const MAX_ROW_LIMIT: u32 = 1000;

/// Row limit appended to queries without a `LIMIT` when injection is enabled.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

const _: () = assert!(
    DEFAULT_ROW_LIMIT <= MAX_ROW_LIMIT,
    "DEFAULT_ROW_LIMIT must not exceed MAX_ROW_LIMIT"
);

const _: () = assert!(
    MAX_ROW_LIMIT as u64 <= NUMERIC_LITERAL_CEILING,
    "MAX_ROW_LIMIT must be derivable by the bounded digit production"
);

const _: () = assert!(
    NUMERIC_LITERAL_CEILING == 9999,
    "NUMERIC_LITERAL_CEILING derivation mismatch"
);

// ============================================================================
// SCHEMA LOADING
// ============================================================================

/// Registry key for the schema loaded from the primary definition file.
pub const DEFAULT_SCHEMA_NAME: &str = "default";

/// File extension of schema definitions picked up from a schema directory.
pub const SCHEMA_FILE_EXTENSION: &str = "json";

/// Longest table or column name accepted by the schema loader.
pub const MAX_IDENTIFIER_LEN: usize = 128;

// ============================================================================
// PARSING
// ============================================================================

/// Deepest nesting of expressions, subqueries and joins the parser builds.
/// Every later pass walks the tree recursively, so this also bounds their
/// stack use.
pub const MAX_EXPR_DEPTH: usize = 128;

// ============================================================================
// GRAMMAR SAMPLING
// ============================================================================

/// Default derivation depth budget for random sentence sampling.
/// Deep enough to reach every rule of a compiled grammar at least once.
pub const DEFAULT_SAMPLE_DEPTH: usize = 12;

const _: () = assert!(DEFAULT_SAMPLE_DEPTH >= 8, "sampling depth too shallow to reach leaf rules");

// ============================================================================
// EVALUATION
// ============================================================================

/// Fraction of stability samples that must verify for a case to pass.
pub const DETERMINISM_PASS_RATE: f64 = 0.8;

/// Samples drawn per stability case when the case does not say.
pub const DEFAULT_DETERMINISM_SAMPLES: usize = 5;
