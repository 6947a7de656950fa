//! # Dot Command Handler
//!
//! Parses and executes SQLite-style dot commands for schema and grammar
//! introspection and CLI control. Dot commands start with a period and are
//! not SQL.
//!
//! ## Supported Commands
//!
//! | Command              | Description                              |
//! |----------------------|------------------------------------------|
//! | `.quit` / `.exit`    | Exit the CLI                             |
//! | `.schema`            | Show the schema summary                  |
//! | `.columns`           | Table of columns, types and roles        |
//! | `.grammar`           | Print the Lark grammar                   |
//! | `.sample [N]`        | Derive N random queries from the grammar |
//! | `.help`              | Show available commands                  |
//!
//! ## Parsing
//!
//! Commands are case-insensitive. Arguments are whitespace-separated.
//! Unrecognized commands return an error message.
//!
//! ## Implementation
//!
//! Each command is implemented as a function that returns a CommandResult:
//! - Output: Text to display to the user
//! - Exit: Signal to terminate the REPL
//! - Error: Error message to display

use super::table::TableFormatter;
use crate::config::DEFAULT_SAMPLE_DEPTH;
use crate::schema::CompiledSchema;

const DEFAULT_SAMPLE_COUNT: usize = 5;
const MAX_SAMPLE_COUNT: usize = 100;

#[derive(Debug, PartialEq)]
pub enum CommandResult {
    Output(String),
    Exit,
    Continue,
    Error(String),
}

pub struct CommandHandler;

impl CommandHandler {
    pub fn is_command(input: &str) -> bool {
        input.trim().starts_with('.')
    }

    pub fn execute(input: &str, entry: &CompiledSchema) -> CommandResult {
        let input = input.trim();
        let parts: Vec<&str> = input.split_whitespace().collect();

        if parts.is_empty() {
            return CommandResult::Continue;
        }

        let cmd = parts[0].to_lowercase();
        let args = &parts[1..];

        match cmd.as_str() {
            ".quit" | ".exit" | ".q" => CommandResult::Exit,
            ".help" | ".h" | ".?" => CommandResult::Output(help_text()),
            ".schema" => CommandResult::Output(entry.schema().summary()),
            ".columns" => list_columns(entry),
            ".grammar" => show_grammar(entry),
            ".sample" => sample_queries(entry, args),
            _ => CommandResult::Error(format!("Unknown command: {}. Type .help for available commands.", cmd)),
        }
    }
}

fn help_text() -> String {
    r#"sqlfence CLI Commands:

  .quit, .exit, .q     Exit the CLI
  .help, .h, .?        Show this help message
  .schema              Show the schema summary
  .columns             List columns with their types and roles
  .grammar             Print the compiled grammar in Lark syntax
  .sample [N]          Derive N random queries from the grammar (default 5)

SQL queries should end with a semicolon (;) and are verified, not executed.
Multi-line queries are supported - press Enter to continue on next line.
Use Ctrl+C to cancel a multi-line query.
Use Ctrl+D or .quit to exit."#
        .to_string()
}

fn list_columns(entry: &CompiledSchema) -> CommandResult {
    let headers = ["column", "type", "roles", "allowed values"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = entry
        .schema()
        .columns()
        .iter()
        .map(|col| {
            let roles: Vec<_> = col.roles().iter().map(|role| role.as_str()).collect();
            vec![
                col.name().to_string(),
                col.column_type().to_string(),
                roles.join(", "),
                col.allowed_values().join(", "),
            ]
        })
        .collect();
    let formatter = TableFormatter::new(headers, rows);
    CommandResult::Output(format!("{}{} columns", formatter.render(), formatter.row_count()))
}

fn show_grammar(entry: &CompiledSchema) -> CommandResult {
    match entry.grammar() {
        Ok(grammar) => CommandResult::Output(grammar.to_lark()),
        Err(err) => CommandResult::Error(format!("Grammar unavailable: {}", err)),
    }
}

fn sample_queries(entry: &CompiledSchema, args: &[&str]) -> CommandResult {
    let count = match args.first() {
        None => DEFAULT_SAMPLE_COUNT,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if (1..=MAX_SAMPLE_COUNT).contains(&n) => n,
            _ => {
                return CommandResult::Error(format!(
                    "Usage: .sample [N] with N between 1 and {}",
                    MAX_SAMPLE_COUNT
                ))
            }
        },
    };

    let grammar = match entry.grammar() {
        Ok(grammar) => grammar,
        Err(err) => return CommandResult::Error(format!("Grammar unavailable: {}", err)),
    };

    let mut rng = rand::thread_rng();
    let samples: Vec<String> = (0..count)
        .map(|_| grammar.sample(&mut rng, DEFAULT_SAMPLE_DEPTH))
        .collect();
    CommandResult::Output(samples.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableSchema;
    use crate::verify::verify;

    fn entry() -> CompiledSchema {
        CompiledSchema::new("default", TableSchema::trips().unwrap())
    }

    #[test]
    fn is_command_detects_dot_prefix() {
        assert!(CommandHandler::is_command(".quit"));
        assert!(CommandHandler::is_command("  .help"));
        assert!(!CommandHandler::is_command("SELECT count() FROM trips;"));
    }

    #[test]
    fn quit_variants_exit() {
        let entry = entry();
        for cmd in [".quit", ".exit", ".q", ".QUIT"] {
            assert_eq!(CommandHandler::execute(cmd, &entry), CommandResult::Exit);
        }
    }

    #[test]
    fn unknown_command_is_an_error() {
        let result = CommandHandler::execute(".tables", &entry());
        assert!(matches!(result, CommandResult::Error(msg) if msg.contains(".tables")));
    }

    #[test]
    fn columns_lists_every_column() {
        let CommandResult::Output(output) = CommandHandler::execute(".columns", &entry()) else {
            panic!("expected output");
        };
        assert!(output.contains("pickup_borough"));
        assert!(output.contains("groupable"));
        assert!(output.ends_with("10 columns"));
    }

    #[test]
    fn grammar_prints_lark() {
        let CommandResult::Output(output) = CommandHandler::execute(".grammar", &entry()) else {
            panic!("expected output");
        };
        assert!(output.contains("start: "));
    }

    #[test]
    fn samples_are_verified_queries() {
        let entry = entry();
        let CommandResult::Output(output) = CommandHandler::execute(".sample 3", &entry) else {
            panic!("expected output");
        };
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            assert!(verify(line, entry.schema()).accepted, "{line}");
        }
    }

    #[test]
    fn sample_count_is_bounded() {
        let entry = entry();
        assert!(matches!(CommandHandler::execute(".sample 0", &entry), CommandResult::Error(_)));
        assert!(matches!(CommandHandler::execute(".sample lots", &entry), CommandResult::Error(_)));
    }
}
