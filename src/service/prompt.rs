//! Generation context handed to the SQL generator.

use crate::config::DEFAULT_ROW_LIMIT;
use crate::grammar::GrammarArtifact;
use crate::schema::TableSchema;
use std::sync::Arc;

/// Everything the generator needs for one question: the question, the
/// schema description and the grammar its output is constrained to.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub question: String,
    pub schema_summary: String,
    pub grammar: Arc<GrammarArtifact>,
}

impl PromptContext {
    pub fn new(question: impl Into<String>, schema: &TableSchema, grammar: Arc<GrammarArtifact>) -> Self {
        Self {
            question: question.into(),
            schema_summary: schema.summary(),
            grammar,
        }
    }

    /// Renders the instruction prompt. The grammar travels separately, as
    /// the constraint on decoding.
    pub fn prompt(&self) -> String {
        format!(
            "You are a SQL assistant that converts natural language questions into ClickHouse SQL queries.\n\
             \n\
             Rules:\n\
             1. Generate ONLY valid ClickHouse SQL - no explanations, no markdown, just SQL\n\
             2. Use only the columns and table provided in the schema\n\
             3. For time-based questions like \"last N hours/days\", use: column >= now() - INTERVAL N UNIT\n\
             4. Use appropriate aggregate functions: count(), sum(), avg(), min(), max()\n\
             5. Include GROUP BY when using aggregates with non-aggregated columns\n\
             6. Add reasonable LIMIT (default {limit}) to prevent huge result sets\n\
             7. Use ORDER BY for meaningful result ordering\n\
             \n\
             Schema context:\n\
             {schema}\n\
             \n\
             User question: {question}\n\
             \n\
             Generate the SQL query:",
            limit = DEFAULT_ROW_LIMIT,
            schema = self.schema_summary,
            question = self.question,
        )
    }
}
