//! Schema files on disk: single-file loading and directory registries.

use sqlfence::grammar::GrammarBuildError;
use sqlfence::schema::{ColumnRole, SchemaError, SchemaRegistry, TableSchema};
use sqlfence::verify::verify;
use std::fs;
use tempfile::TempDir;

const EVENTS: &str = r#"{
    "table": "events",
    "columns": [
        { "name": "created_at", "type": "DateTime64(3)" },
        { "name": "latency_ms", "type": "UInt32" },
        { "name": "region", "type": "LowCardinality(String)" }
    ]
}"#;

fn write(dir: &TempDir, name: &str, body: &str) {
    fs::write(dir.path().join(name), body).unwrap();
}

#[test]
fn schema_file_loads_with_role_convention() {
    let dir = TempDir::new().unwrap();
    write(&dir, "events.json", EVENTS);

    let schema = TableSchema::from_path(dir.path().join("events.json")).unwrap();
    assert_eq!(schema.table_name(), "events");
    assert_eq!(schema.primary_time_column().unwrap().name(), "created_at");
    assert!(schema.column("latency_ms").unwrap().has_role(ColumnRole::Metric));
    assert!(schema.column("region").unwrap().has_role(ColumnRole::Groupable));
    assert_eq!(schema.limits().max_limit, 1000);
}

#[test]
fn missing_file_reports_its_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");
    let err = TableSchema::from_path(&path).unwrap_err();
    assert!(matches!(err, SchemaError::Io { .. }));
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn malformed_json_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(&dir, "broken.json", "{ \"table\": ");
    let err = TableSchema::from_path(dir.path().join("broken.json")).unwrap_err();
    assert!(matches!(err, SchemaError::Json(_)));
}

#[test]
fn directory_registers_every_json_file_by_stem() {
    let dir = TempDir::new().unwrap();
    write(&dir, "events.json", EVENTS);
    write(&dir, "trips.json", sqlfence::schema::TRIPS_DEFINITION);
    write(&dir, "notes.txt", "not a schema");

    let mut registry = SchemaRegistry::new(TableSchema::trips().unwrap());
    assert_eq!(registry.load_dir(dir.path()).unwrap(), 2);
    assert_eq!(registry.names(), vec!["default", "events", "trips"]);

    let events = registry.resolve(Some("events")).unwrap();
    assert!(verify("SELECT max(latency_ms) FROM events", events.schema()).accepted);
    assert!(!verify("SELECT max(latency_ms) FROM trips", events.schema()).accepted);
}

#[test]
fn default_json_replaces_the_default_entry() {
    let dir = TempDir::new().unwrap();
    write(&dir, "default.json", EVENTS);

    let mut registry = SchemaRegistry::new(TableSchema::trips().unwrap());
    registry.load_dir(dir.path()).unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.resolve(None).unwrap().schema().table_name(), "events");
}

#[test]
fn one_bad_file_fails_the_whole_directory() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.json", EVENTS);
    write(
        &dir,
        "b.json",
        r#"{ "table": "b", "columns": [ { "name": "x", "type": "Blob" } ] }"#,
    );

    let mut registry = SchemaRegistry::new(TableSchema::trips().unwrap());
    let err = registry.load_dir(dir.path()).unwrap_err();
    assert!(matches!(err, SchemaError::UnknownType { .. }));
}

#[test]
fn compiled_grammar_is_shared_between_lookups() {
    let registry = SchemaRegistry::new(TableSchema::trips().unwrap());
    let first = registry.resolve(None).unwrap().grammar().unwrap();
    let second = registry.get("default").unwrap().grammar().unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn directory_schema_without_metrics_fails_eager_compile() {
    let dir = TempDir::new().unwrap();
    write(&dir, "events.json", EVENTS);
    write(
        &dir,
        "labels.json",
        r#"{ "table": "labels", "time_window_filtering": false,
             "columns": [ { "name": "label", "type": "LowCardinality(String)" } ] }"#,
    );

    let mut registry = SchemaRegistry::new(TableSchema::trips().unwrap());
    assert_eq!(registry.load_dir(dir.path()).unwrap(), 2);
    assert_eq!(
        registry.compile_all(),
        Err(GrammarBuildError::NoMetricColumns("labels".to_string()))
    );
    assert!(registry.get("events").unwrap().grammar().is_ok());
}
