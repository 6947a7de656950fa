//! # REPL - Read-Eval-Print Loop
//!
//! The interactive loop of the sqlfence CLI. Handles:
//!
//! - Reading input with rustyline (history, line editing)
//! - Dispatching dot commands vs SQL statements
//! - Verifying SQL and printing the verdict
//! - Multi-line statement handling
//!
//! ## Input Handling
//!
//! The REPL distinguishes between:
//! - Dot commands: Start with `.`, executed immediately
//! - SQL statements: Accumulated until `;` is encountered
//!
//! Multi-line SQL is supported. The prompt changes from `sqlfence>` to
//! `       ->` to indicate continuation mode.
//!
//! ## Execution Flow
//!
//! ```text
//! Read Line ──> starts with '.'? ──yes──> Execute Command ──┐
//!                    │ no                                   │
//!                    v                                      │
//!              Accumulate SQL ──> ends with ';'? ──no──┐    │
//!                                      │ yes           │    │
//!                                      v               │    │
//!                                  Verify SQL          │    │
//!                                      │               │    │
//!                                      v               v    v
//!                                  Print Verdict ──────> [Loop]
//! ```
//!
//! ## Verdict Display
//!
//! ```text
//! REJECTED (2 violations)
//! +-----------------+-------+------------------------------+
//! | code            | at    | message                      |
//! +-----------------+-------+------------------------------+
//! | UNKNOWN_COLUMN  | 11:22 | unknown column 'tip_percent' |
//! ...
//! ```
//!
//! Rejections are displayed but do not terminate the REPL.
//! Use `.quit` or Ctrl+D to exit.

use crate::cli::commands::{CommandHandler, CommandResult};
use crate::cli::history::history_path;
use crate::cli::table::TableFormatter;
use crate::config::VerifierConfig;
use crate::schema::CompiledSchema;
use crate::verify::{ValidationResult, Verifier};
use eyre::{Result, WrapErr};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use std::time::{Duration, Instant};

const PRIMARY_PROMPT: &str = "sqlfence> ";
const CONTINUATION_PROMPT: &str = "       -> ";

pub struct Repl {
    entry: Arc<CompiledSchema>,
    config: VerifierConfig,
    editor: DefaultEditor,
    sql_buffer: String,
}

impl Repl {
    pub fn new(entry: Arc<CompiledSchema>, config: VerifierConfig) -> Result<Self> {
        let mut editor = DefaultEditor::new().wrap_err("failed to initialize line editor")?;

        if let Some(history_file) = history_path() {
            let _ = editor.load_history(&history_file);
        }

        Ok(Self {
            entry,
            config,
            editor,
            sql_buffer: String::new(),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        self.print_welcome();

        loop {
            let prompt = if self.sql_buffer.is_empty() {
                PRIMARY_PROMPT
            } else {
                CONTINUATION_PROMPT
            };

            match self.editor.readline(prompt) {
                Ok(line) => {
                    if !self.handle_line(&line) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    self.sql_buffer.clear();
                    println!("^C");
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye");
                    break;
                }
                Err(err) => {
                    eprintln!("Error reading input: {}", err);
                    break;
                }
            }
        }

        self.save_history();
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return true;
        }

        if self.sql_buffer.is_empty() && CommandHandler::is_command(trimmed) {
            self.editor.add_history_entry(trimmed).ok();
            return self.execute_command(trimmed);
        }

        if !self.sql_buffer.is_empty() {
            self.sql_buffer.push(' ');
        }
        self.sql_buffer.push_str(trimmed);

        if self.sql_buffer.trim_end().ends_with(';') {
            let sql = std::mem::take(&mut self.sql_buffer);
            self.editor.add_history_entry(&sql).ok();
            self.verify_sql(&sql);
        }

        true
    }

    fn execute_command(&mut self, input: &str) -> bool {
        match CommandHandler::execute(input, &self.entry) {
            CommandResult::Exit => false,
            CommandResult::Output(text) => {
                println!("{}", text);
                true
            }
            CommandResult::Continue => true,
            CommandResult::Error(msg) => {
                eprintln!("Error: {}", msg);
                true
            }
        }
    }

    fn verify_sql(&self, sql: &str) {
        let start = Instant::now();
        let result = Verifier::new(self.entry.schema(), self.config).verify(sql);
        println!("{}", render_verdict(&result, start.elapsed()));
    }

    fn print_welcome(&self) {
        println!("sqlfence version {}", env!("CARGO_PKG_VERSION"));
        println!("Enter \".help\" for usage hints.");
        println!(
            "Verifying against table '{}' (schema '{}', max LIMIT {}, {} policy)",
            self.entry.schema().table_name(),
            self.entry.name(),
            self.config.max_limit(),
            self.config.limit_policy()
        );
        println!();
    }

    fn save_history(&mut self) {
        if let Some(history_file) = history_path() {
            if let Err(e) = self.editor.save_history(&history_file) {
                eprintln!("Warning: could not save history: {}", e);
            }
        }
    }
}

pub fn render_verdict(result: &ValidationResult, elapsed: Duration) -> String {
    if let Some(sql) = result.normalized_sql.as_deref().filter(|_| result.accepted) {
        return format!("ACCEPTED ({:.3} sec)\n{}", elapsed.as_secs_f64(), sql);
    }

    let headers = ["code", "at", "message"].iter().map(|h| h.to_string()).collect();
    let rows = result
        .violations
        .iter()
        .map(|v| {
            let at = v
                .span
                .map(|(start, end)| format!("{}:{}", start, end))
                .unwrap_or_default();
            vec![v.code.to_string(), at, v.message.clone()]
        })
        .collect();
    let formatter = TableFormatter::new(headers, rows);
    let count = formatter.row_count();
    format!(
        "REJECTED ({} violation{}, {:.3} sec)\n{}",
        count,
        if count == 1 { "" } else { "s" },
        elapsed.as_secs_f64(),
        formatter.render().trim_end()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableSchema;
    use crate::verify::verify;

    #[test]
    fn accepted_verdict_shows_normalized_sql() {
        let schema = TableSchema::trips().unwrap();
        let result = verify("select count(*) from trips;", &schema);
        let text = render_verdict(&result, Duration::from_millis(1));
        assert!(text.starts_with("ACCEPTED"));
        assert!(text.ends_with("\nSELECT count() FROM trips"));
    }

    #[test]
    fn rejected_verdict_tabulates_violations() {
        let schema = TableSchema::trips().unwrap();
        let result = verify("SELECT sum(tip_percent) FROM trips;", &schema);
        let text = render_verdict(&result, Duration::ZERO);
        assert!(text.starts_with("REJECTED (1 violation,"));
        assert!(text.contains("| UNKNOWN_COLUMN |"));
        assert!(text.contains("11:22"));
    }
}
