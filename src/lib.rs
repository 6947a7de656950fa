//! # sqlfence - Schema-Fenced Analytical SQL
//!
//! sqlfence turns a table schema into the definition of a small, safe,
//! read-only query language and enforces it twice:
//!
//! - **Grammar Compiler**: derives a context-free grammar from the schema so
//!   a constrained decoder can only emit well-formed, schema-bound queries
//! - **Query Verifier**: independently parses any SQL string and accepts it
//!   only if it is inside the same language, returning a canonical rendering
//!
//! Neither side trusts the other: the verifier runs on every candidate, even
//! grammar-constrained ones, and is the only gate before execution.
//!
//! ## Quick Start
//!
//! ```ignore
//! use sqlfence::grammar::compile;
//! use sqlfence::schema::TableSchema;
//! use sqlfence::verify::verify;
//!
//! let schema = TableSchema::from_path("schemas/trips.json")?;
//! let grammar = compile(&schema)?;
//! println!("{}", grammar.to_lark());
//!
//! let result = verify("select COUNT(*) from trips", &schema);
//! assert_eq!(result.normalized_sql.as_deref(), Some("SELECT count() FROM trips"));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   CLI / QueryService / Evals         │
//! ├──────────────────┬──────────────────┤
//! │ Grammar Compiler │  Query Verifier   │
//! │  (grammar)       │  (verify + sql)   │
//! ├──────────────────┴──────────────────┤
//! │     Supported Language (language)    │
//! ├─────────────────────────────────────┤
//! │   Schema Model + Registry (schema)   │
//! ├─────────────────────────────────────┤
//! │     Limits and Settings (config)     │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`]: Numeric limits, verifier configuration, environment settings
//! - [`schema`]: Schema model, JSON loading, multi-schema registry
//! - [`language`]: Aggregates, functions, units and forbidden keywords
//! - [`grammar`]: Grammar artifact, compiler, Lark output, sampling
//! - [`sql`]: Lexer, arena AST and parser for a general SELECT dialect
//! - [`verify`]: Token scan, semantic checks, canonical rendering
//! - [`service`]: Generate, verify, execute orchestration over traits
//! - [`evals`]: Offline evaluation harness
//! - [`cli`]: Interactive REPL

pub mod cli;
pub mod config;
pub mod evals;
pub mod grammar;
pub mod language;
pub mod schema;
pub mod service;
pub mod sql;
pub mod verify;

pub use grammar::{compile, GrammarArtifact, GrammarBuildError};
pub use schema::{SchemaError, SchemaRegistry, TableSchema};
pub use verify::{verify, ValidationResult, Verifier, Violation, ViolationCode};
