//! Request handling across generator, verifier and backend.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{Map, Value};
use sqlfence::config::DEFAULT_SAMPLE_DEPTH;
use sqlfence::schema::{SchemaRegistry, TableSchema};
use sqlfence::service::{
    ExternalErrorKind, ExternalServiceError, FailureClass, PromptContext, QueryBackend, QueryOutput,
    QueryRequest, QueryService, SqlGenerator,
};
use sqlfence::verify::verify;
use std::sync::{Arc, Mutex};

/// Stands in for a grammar-constrained decoder by sampling the grammar.
struct GrammarSampler {
    rng: Mutex<StdRng>,
}

impl GrammarSampler {
    fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl SqlGenerator for GrammarSampler {
    fn generate(&self, context: &PromptContext) -> Result<String, ExternalServiceError> {
        let mut rng = self.rng.lock().unwrap();
        Ok(context.grammar.sample(&mut *rng, DEFAULT_SAMPLE_DEPTH))
    }
}

struct Fixed(&'static str);

impl SqlGenerator for Fixed {
    fn generate(&self, _context: &PromptContext) -> Result<String, ExternalServiceError> {
        Ok(self.0.to_string())
    }
}

#[derive(Default)]
struct Backend {
    calls: Arc<Mutex<Vec<(String, u32)>>>,
    failure: Option<ExternalErrorKind>,
}

impl QueryBackend for Backend {
    fn execute(&self, sql: &str, row_limit: u32) -> Result<QueryOutput, ExternalServiceError> {
        self.calls.lock().unwrap().push((sql.to_string(), row_limit));
        if let Some(kind) = self.failure {
            return Err(ExternalServiceError::backend(kind, "backend said no"));
        }
        let mut row = Map::new();
        row.insert("count()".to_string(), Value::from(3));
        Ok(QueryOutput {
            rows: vec![row],
            columns: vec!["count()".to_string()],
            elapsed_ms: 1.5,
        })
    }
}

fn registry() -> Arc<SchemaRegistry> {
    let mut registry = SchemaRegistry::new(TableSchema::trips().unwrap());
    registry.insert(
        "payments",
        TableSchema::from_json_str(
            r#"{
                "table": "payments",
                "time_window_filtering": false,
                "max_limit": 50,
                "columns": [
                    { "name": "amount", "type": "Float64" },
                    { "name": "currency", "type": "String", "allowed_values": ["EUR", "USD"] }
                ]
            }"#,
        )
        .unwrap(),
    );
    Arc::new(registry)
}

#[test]
fn sampled_generations_always_reach_the_backend() {
    let service = QueryService::new(registry(), GrammarSampler::new(11), Backend::default());
    let schema = TableSchema::trips().unwrap();

    for _ in 0..50 {
        let response = service.handle(&QueryRequest::new("how many trips?"));
        assert!(response.success, "{:?}", response.error);
        let sql = response.sql.unwrap();
        assert_eq!(verify(&sql, &schema).normalized_sql.as_deref(), Some(sql.as_str()));
        assert_eq!(response.row_count, 1);
    }
}

#[test]
fn named_schema_uses_its_own_limits() {
    let backend = Backend::default();
    let calls = Arc::clone(&backend.calls);
    let service = QueryService::new(registry(), GrammarSampler::new(3), backend);

    let response = service.handle(&QueryRequest::new("total by currency").with_schema("payments"));
    assert!(response.success, "{:?}", response.error);
    assert!(response.sql.unwrap().contains(" FROM payments"));
    assert_eq!(calls.lock().unwrap()[0].1, 50);
}

#[test]
fn backend_receives_normalized_sql_and_ceiling() {
    let backend = Backend::default();
    let calls = Arc::clone(&backend.calls);
    let service = QueryService::new(registry(), Fixed("select   count(*)   from trips ;"), backend);
    let response = service.handle(&QueryRequest::new("count"));

    assert!(response.success);
    assert_eq!(response.sql.as_deref(), Some("SELECT count() FROM trips"));
    assert_eq!(
        *calls.lock().unwrap(),
        vec![("SELECT count() FROM trips".to_string(), 1000)]
    );
    assert_eq!(response.columns, vec!["count()".to_string()]);
    assert_eq!(response.elapsed_ms, 1.5);
}

#[test]
fn unknown_schema_is_an_invalid_request() {
    let service = QueryService::new(registry(), Fixed("SELECT count() FROM trips"), Backend::default());
    let response = service.handle(&QueryRequest::new("count").with_schema("missing"));
    assert!(!response.success);
    assert_eq!(response.failure, Some(FailureClass::InvalidRequest));
    assert!(response.error.unwrap().contains("missing"));
}

#[test]
fn unsafe_candidate_never_executes() {
    let backend = Backend::default();
    let calls = Arc::clone(&backend.calls);
    let service = QueryService::new(registry(), Fixed("SELECT count() FROM trips; DROP TABLE trips"), backend);
    let response = service.handle(&QueryRequest::new("count then drop"));

    assert!(calls.lock().unwrap().is_empty());
    assert!(!response.success);
    assert_eq!(response.failure, Some(FailureClass::Verification));
    assert_eq!(response.sql.as_deref(), Some("SELECT count() FROM trips; DROP TABLE trips"));
    let error = response.error.unwrap();
    assert!(error.starts_with("SQL validation failed: "));
    assert!(error.contains("DROP"));
}

#[test]
fn backend_failures_are_classified_by_retryability() {
    for (kind, expected) in [
        (ExternalErrorKind::Unreachable, FailureClass::Unavailable),
        (ExternalErrorKind::Timeout, FailureClass::Unavailable),
        (ExternalErrorKind::Status(503), FailureClass::Unavailable),
        (ExternalErrorKind::Status(400), FailureClass::Execution),
        (ExternalErrorKind::Malformed, FailureClass::Execution),
    ] {
        let backend = Backend {
            failure: Some(kind),
            ..Backend::default()
        };
        let service = QueryService::new(registry(), Fixed("SELECT count() FROM trips"), backend);
        let response = service.handle(&QueryRequest::new("count"));
        assert!(!response.success);
        assert_eq!(response.failure, Some(expected), "{kind:?}");
        assert_eq!(response.sql.as_deref(), Some("SELECT count() FROM trips"));
        assert!(response.error.unwrap().starts_with("Query execution failed: "));
    }
}

#[test]
fn response_serializes_for_the_wire() {
    let service = QueryService::new(registry(), Fixed("SELECT count() FROM trips"), Backend::default());
    let response = service.handle(&QueryRequest::new("count"));
    let json: Value = serde_json::to_value(&response).unwrap();
    assert_eq!(json["success"], Value::Bool(true));
    assert_eq!(json["row_count"], Value::from(1));
    assert_eq!(json["data"][0]["count()"], Value::from(3));
}

#[test]
fn request_deserializes_without_schema() {
    let request: QueryRequest = serde_json::from_str(r#"{"question": "how many trips"}"#).unwrap();
    assert_eq!(request, QueryRequest::new("how many trips"));
}
