//! Lark rendering of a grammar artifact, the format the constrained
//! decoding service consumes.
//!
//! ```text
//! start: aggregate_query | grouped_query
//! where_clause: (" WHERE " predicate)?
//! table: "trips"
//! ```
//!
//! A rule with an epsilon alternative renders its remaining alternatives as
//! an optional group.

use super::{GrammarArtifact, Production, Symbol};
use std::fmt::Write as _;

impl GrammarArtifact {
    pub fn to_lark(&self) -> String {
        let mut out = String::new();
        let table = self.allowed_tables.iter().next().map(String::as_str).unwrap_or("");
        let _ = writeln!(out, "// Query grammar for table {}", table);
        out.push('\n');

        for rule in &self.rules {
            let body: Vec<String> = rule
                .alternatives
                .iter()
                .filter(|alt| !alt.is_empty())
                .map(render_alternative)
                .collect();
            let body = body.join(" | ");
            if rule.is_nullable() {
                let _ = writeln!(out, "{}: ({})?", rule.name, body);
            } else {
                let _ = writeln!(out, "{}: {}", rule.name, body);
            }
        }
        out
    }
}

fn render_alternative(alt: &Production) -> String {
    alt.iter()
        .map(|symbol| match symbol {
            Symbol::Literal(text) => quote(text),
            Symbol::Rule(name) => name.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}
