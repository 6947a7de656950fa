//! # Schema Registry
//!
//! The registry holds every schema a deployment serves, keyed by name.
//! Single-table deployments only ever use the default entry; multi-schema
//! deployments add one entry per `<name>.json` found in a directory.
//!
//! ```text
//! SchemaRegistry
//!     ├── "default" ──> Arc<CompiledSchema> { TableSchema, OnceLock<grammar> }
//!     ├── "rides"   ──> Arc<CompiledSchema>
//!     └── "events"  ──> Arc<CompiledSchema>
//! ```
//!
//! Entries are immutable once inserted. A schema's grammar is compiled on
//! first request and the result (including a build failure) is kept for
//! the life of the entry, so every caller sees the same artifact. Startup
//! calls [`SchemaRegistry::compile_all`] so that a schema without a grammar
//! fails the process before it serves anything.

use super::{SchemaError, TableSchema};
use crate::config::{DEFAULT_SCHEMA_NAME, SCHEMA_FILE_EXTENSION};
use crate::grammar::{compile, GrammarArtifact, GrammarBuildError};
use hashbrown::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::debug;

#[derive(Debug)]
pub struct CompiledSchema {
    name: String,
    schema: TableSchema,
    grammar: OnceLock<Result<Arc<GrammarArtifact>, GrammarBuildError>>,
}

impl CompiledSchema {
    pub fn new(name: impl Into<String>, schema: TableSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            grammar: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Compiles the grammar on first call; later calls share the result.
    pub fn grammar(&self) -> Result<Arc<GrammarArtifact>, GrammarBuildError> {
        self.grammar
            .get_or_init(|| {
                debug!(schema = %self.name, "compiling grammar");
                compile(&self.schema).map(Arc::new)
            })
            .clone()
    }
}

#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<CompiledSchema>>,
    default_schema: String,
}

impl SchemaRegistry {
    /// A registry whose default entry is `schema`.
    pub fn new(schema: TableSchema) -> Self {
        let mut registry = Self {
            schemas: HashMap::new(),
            default_schema: DEFAULT_SCHEMA_NAME.to_string(),
        };
        registry.insert(DEFAULT_SCHEMA_NAME, schema);
        registry
    }

    /// Loads the default schema from `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        Ok(Self::new(TableSchema::from_path(path)?))
    }

    /// Adds every `<name>.json` in `dir` under its file stem, in name order.
    /// A file named `default.json` replaces the default entry.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, SchemaError> {
        let dir = dir.as_ref();
        let io_error = |source| SchemaError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut found = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some(SCHEMA_FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                found.push((stem.to_string(), path.clone()));
            }
        }
        found.sort();

        for (name, path) in &found {
            let schema = TableSchema::from_path(path)?;
            debug!(schema = %name, table = schema.table_name(), "registered schema");
            self.insert(name.clone(), schema);
        }
        Ok(found.len())
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: TableSchema) -> Arc<CompiledSchema> {
        let name = name.into();
        let entry = Arc::new(CompiledSchema::new(name.clone(), schema));
        self.schemas.insert(name, Arc::clone(&entry));
        entry
    }

    /// Compiles every entry's grammar in name order, stopping at the first
    /// failure.
    pub fn compile_all(&self) -> Result<(), GrammarBuildError> {
        for name in self.names() {
            self.schemas[name].grammar()?;
            debug!(schema = name, "grammar ready");
        }
        Ok(())
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<Arc<CompiledSchema>, SchemaError> {
        self.schemas
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownSchema(name.to_string()))
    }

    /// Looks up `name`, or the default entry when `name` is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<CompiledSchema>, SchemaError> {
        self.get(name.unwrap_or(&self.default_schema))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new(TableSchema::trips().unwrap())
    }

    #[test]
    fn default_entry_is_registered() {
        let registry = registry();
        assert_eq!(registry.default_schema(), DEFAULT_SCHEMA_NAME);
        assert_eq!(registry.resolve(None).unwrap().schema().table_name(), "trips");
        assert_eq!(registry.names(), vec!["default"]);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = registry().get("nope").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownSchema(name) if name == "nope"));
    }

    #[test]
    fn grammar_is_compiled_once_and_shared() {
        let entry = registry().resolve(None).unwrap();
        let first = entry.grammar().unwrap();
        let second = entry.grammar().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn grammar_failure_is_cached_too() {
        let schema = TableSchema::from_json_str(
            r#"{"table": "events", "time_window_filtering": false,
                "columns": [{"name": "label", "type": "String"}]}"#,
        )
        .unwrap();
        let mut registry = registry();
        let entry = registry.insert("events", schema);
        let first = entry.grammar().unwrap_err();
        assert_eq!(entry.grammar().unwrap_err(), first);
    }

    #[test]
    fn compile_all_fails_on_a_schema_without_grammar() {
        let mut registry = registry();
        assert_eq!(registry.compile_all(), Ok(()));

        let schema = TableSchema::from_json_str(
            r#"{"table": "labels", "columns": [
                {"name": "created_at", "type": "DateTime"},
                {"name": "label", "type": "LowCardinality(String)"}]}"#,
        )
        .unwrap();
        registry.insert("labels", schema);
        assert_eq!(
            registry.compile_all(),
            Err(GrammarBuildError::NoMetricColumns("labels".into()))
        );
    }

    #[test]
    fn entries_are_shared_across_threads() {
        let registry = Arc::new(registry());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.resolve(None).unwrap().grammar().unwrap().rules().len())
            })
            .collect();
        let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(counts.windows(2).all(|w| w[0] == w[1]));
    }
}
