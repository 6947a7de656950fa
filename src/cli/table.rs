//! # ASCII Table Formatter
//!
//! Renders tabular output (violations, schema columns) as MySQL-style
//! ASCII tables.
//!
//! ## Output Format
//!
//! ```text
//! +----------------+--------+---------------------------+
//! | code           | at     | message                   |
//! +----------------+--------+---------------------------+
//! | UNKNOWN_COLUMN | 11:22  | unknown column 'tip_perc' |
//! +----------------+--------+---------------------------+
//! ```
//!
//! ## Column Width Calculation
//!
//! Column widths are the maximum of the header length and the longest
//! value in that column, at least 1 and at most 60 characters. Longer
//! values are truncated with "...".

use std::fmt::Write;

const MAX_COLUMN_WIDTH: usize = 60;

pub struct TableFormatter {
    headers: Vec<String>,
    widths: Vec<usize>,
    rows: Vec<Vec<String>>,
}

impl TableFormatter {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count().max(1)).collect();

        for row in &rows {
            for (i, value) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(value.chars().count()).min(MAX_COLUMN_WIDTH);
                }
            }
        }

        Self { headers, widths, rows }
    }

    pub fn render(&self) -> String {
        let mut output = String::new();

        self.write_separator(&mut output);
        self.write_row(&mut output, &self.headers);
        self.write_separator(&mut output);

        for row in &self.rows {
            self.write_row(&mut output, row);
        }

        self.write_separator(&mut output);

        output
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn write_separator(&self, output: &mut String) {
        output.push('+');
        for width in &self.widths {
            for _ in 0..(*width + 2) {
                output.push('-');
            }
            output.push('+');
        }
        output.push('\n');
    }

    fn write_row(&self, output: &mut String, row: &[String]) {
        output.push('|');
        for (i, width) in self.widths.iter().enumerate() {
            let value = row.get(i).map(String::as_str).unwrap_or("");
            let _ = write!(output, " {:<width$} |", truncate(value, *width), width = *width);
        }
        output.push('\n');
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let mut result: String = s.chars().take(max_len - 3).collect();
        result.push_str("...");
        result
    }
}
