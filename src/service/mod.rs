//! # Query Service
//!
//! Orchestrates one natural-language request end to end:
//!
//! ```text
//! QueryRequest ──> resolve schema ──> PromptContext ──> SqlGenerator
//!                                                           │ candidate SQL
//!                                                           v
//!                      QueryBackend <── normalized SQL <── Verifier
//!                           │
//!                           v
//!                     QueryResponse
//! ```
//!
//! The generator and the backend are external collaborators behind traits;
//! this crate ships no network client for either. The verifier is always
//! consulted, even though the generator is grammar-constrained, and the
//! backend only ever receives the verifier's normalized SQL.
//!
//! ## Failure Classes
//!
//! | Stage | Class | Error prefix |
//! |-------|-------|--------------|
//! | empty question, unknown schema | `InvalidRequest` | |
//! | grammar cannot be built | `Schema` | |
//! | generator error | `Generation` | `SQL generation failed:` |
//! | verifier rejection | `Verification` | `SQL validation failed:` |
//! | backend error, not retryable | `Execution` | `Query execution failed:` |
//! | backend error, retryable | `Unavailable` | `Query execution failed:` |

mod error;
mod prompt;

pub use error::{ExternalErrorKind, ExternalServiceError, ServiceKind};
pub use prompt::PromptContext;

use crate::config::{LimitPolicy, VerifierConfig};
use crate::schema::SchemaRegistry;
use crate::verify::Verifier;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Produces candidate SQL for a question. Implementations are expected to
/// constrain decoding with `context.grammar`.
pub trait SqlGenerator: Send + Sync {
    fn generate(&self, context: &PromptContext) -> Result<String, ExternalServiceError>;
}

/// Executes verified SQL and returns rows.
pub trait QueryBackend: Send + Sync {
    fn execute(&self, sql: &str, row_limit: u32) -> Result<QueryOutput, ExternalServiceError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    pub rows: Vec<Map<String, Value>>,
    pub columns: Vec<String>,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    /// Registry name; the default schema when absent.
    #[serde(default)]
    pub schema: Option<String>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    InvalidRequest,
    Schema,
    Generation,
    Verification,
    Execution,
    Unavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    /// The normalized SQL that ran, or the rejected candidate on
    /// verification failure.
    pub sql: Option<String>,
    pub data: Vec<Map<String, Value>>,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub elapsed_ms: f64,
    pub error: Option<String>,
    pub failure: Option<FailureClass>,
}

impl QueryResponse {
    fn failure(class: FailureClass, error: String, sql: Option<String>) -> Self {
        Self {
            success: false,
            sql,
            error: Some(error),
            failure: Some(class),
            ..Self::default()
        }
    }
}

pub struct QueryService<G, B> {
    registry: Arc<SchemaRegistry>,
    generator: G,
    backend: B,
    limit_policy: LimitPolicy,
}

impl<G: SqlGenerator, B: QueryBackend> QueryService<G, B> {
    pub fn new(registry: Arc<SchemaRegistry>, generator: G, backend: B) -> Self {
        Self {
            registry,
            generator,
            backend,
            limit_policy: LimitPolicy::default(),
        }
    }

    pub fn with_limit_policy(mut self, policy: LimitPolicy) -> Self {
        self.limit_policy = policy;
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn handle(&self, request: &QueryRequest) -> QueryResponse {
        let question = request.question.trim();
        if question.is_empty() {
            return QueryResponse::failure(
                FailureClass::InvalidRequest,
                "Query cannot be empty".to_string(),
                None,
            );
        }

        let entry = match self.registry.resolve(request.schema.as_deref()) {
            Ok(entry) => entry,
            Err(err) => return QueryResponse::failure(FailureClass::InvalidRequest, err.to_string(), None),
        };
        let grammar = match entry.grammar() {
            Ok(grammar) => grammar,
            Err(err) => {
                error!(schema = entry.name(), error = %err, "grammar unavailable");
                return QueryResponse::failure(FailureClass::Schema, err.to_string(), None);
            }
        };

        let context = PromptContext::new(question, entry.schema(), grammar);
        let candidate = match self.generator.generate(&context) {
            Ok(sql) => sql,
            Err(err) => {
                warn!(error = %err, "SQL generation failed");
                return QueryResponse::failure(
                    FailureClass::Generation,
                    format!("SQL generation failed: {}", err),
                    None,
                );
            }
        };

        let config = VerifierConfig::builder()
            .max_limit(entry.schema().limits().max_limit)
            .limit_policy(self.limit_policy)
            .build();
        let verdict = Verifier::new(entry.schema(), config).verify(&candidate);
        let sql = match verdict.normalized_sql {
            Some(sql) if verdict.accepted => sql,
            _ => {
                warn!(
                    sql = %candidate,
                    violations = verdict.violations.len(),
                    "generated SQL rejected by verifier"
                );
                return QueryResponse::failure(
                    FailureClass::Verification,
                    format!("SQL validation failed: {}", verdict.error_message()),
                    Some(candidate),
                );
            }
        };

        let row_limit = entry.schema().limits().max_limit;
        match self.backend.execute(&sql, row_limit) {
            Ok(output) => {
                info!(sql = %sql, rows = output.rows.len(), elapsed_ms = output.elapsed_ms, "query executed");
                QueryResponse {
                    success: true,
                    sql: Some(sql),
                    row_count: output.rows.len(),
                    data: output.rows,
                    columns: output.columns,
                    elapsed_ms: output.elapsed_ms,
                    error: None,
                    failure: None,
                }
            }
            Err(err) => {
                error!(sql = %sql, error = %err, "query execution failed");
                let class = if err.is_retryable() {
                    FailureClass::Unavailable
                } else {
                    FailureClass::Execution
                };
                QueryResponse::failure(class, format!("Query execution failed: {}", err), Some(sql))
            }
        }
    }
}
