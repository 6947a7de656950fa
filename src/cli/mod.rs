//! # sqlfence CLI Module
//!
//! This module provides an interactive command-line interface for checking
//! queries against a schema, similar to the MySQL CLI. It supports:
//!
//! - Interactive SQL verification with query history
//! - ASCII table-formatted violation display
//! - Dot commands for schema and grammar introspection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CLI Entry Point                        │
//! │                     (bin/sqlfence.rs)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                         REPL Loop                           │
//! │  - Reads input via rustyline                                │
//! │  - Dispatches to command handler or verifier                │
//! │  - Formats and displays verdicts                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │     Commands          │    Table Formatter    │   History   │
//! │  (.quit, .schema,     │  ASCII box drawing    │  Persistent │
//! │   .grammar, .sample)  │  for violations       │ ~/.sqlfence*│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # REPL against the bundled trips schema
//! sqlfence
//!
//! # REPL against a schema file
//! sqlfence schemas/trips.json
//!
//! # Print the grammar
//! sqlfence --grammar schemas/trips.json
//! ```
//!
//! ## History
//!
//! Command history is persisted to `~/.sqlfence_history` by default.
//! This can be overridden with the `SQLFENCE_HISTORY` environment variable.
//!
//! ## Module Organization
//!
//! - `repl`: Main read-eval-print loop with rustyline integration
//! - `commands`: Dot command parsing and execution
//! - `table`: ASCII table formatter for violations and rows
//! - `history`: History file path resolution

pub mod commands;
pub mod history;
pub mod repl;
pub mod table;

pub use repl::Repl;
