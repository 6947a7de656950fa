//! # Offline Evaluation Harness
//!
//! Runs suites of natural-language questions through a [`SqlGenerator`]
//! and scores the output with the verifier. No backend is involved.
//!
//! | Suite | Passes a case when |
//! |-------|--------------------|
//! | `schema_correctness` | the generated SQL verifies |
//! | `intent_checks` | the generated SQL contains every expected pattern (case-insensitive) |
//! | `determinism` | at least 80% of repeated samples verify |
//!
//! Cases are a JSON document:
//!
//! ```text
//! {
//!   "schema_correctness": [{"id": "sc1", "query": "How many trips?"}],
//!   "intent_checks": [{"id": "ic1", "query": "...", "expected_patterns": ["GROUP BY"]}],
//!   "determinism": [{"id": "d1", "query": "...", "samples": 5}]
//! }
//! ```

use crate::config::{DEFAULT_DETERMINISM_SAMPLES, DETERMINISM_PASS_RATE};
use crate::grammar::GrammarArtifact;
use crate::service::{PromptContext, SqlGenerator};
use crate::verify::Verifier;
use eyre::{bail, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Bundled example cases for the `trips` schema.
pub const TRIPS_CASES: &str = include_str!("../evals/cases.json");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalCases {
    #[serde(default)]
    pub schema_correctness: Vec<QuestionCase>,
    #[serde(default)]
    pub intent_checks: Vec<IntentCase>,
    #[serde(default)]
    pub determinism: Vec<DeterminismCase>,
}

impl EvalCases {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).wrap_err("malformed eval cases")
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read eval cases from {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionCase {
    pub id: String,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentCase {
    pub id: String,
    pub query: String,
    pub expected_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeterminismCase {
    pub id: String,
    pub query: String,
    #[serde(default = "default_samples")]
    pub samples: usize,
}

fn default_samples() -> usize {
    DEFAULT_DETERMINISM_SAMPLES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalKind {
    Schema,
    Intent,
    Determinism,
    All,
}

impl EvalKind {
    fn includes(self, other: EvalKind) -> bool {
        self == EvalKind::All || self == other
    }
}

impl FromStr for EvalKind {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "schema" => Ok(EvalKind::Schema),
            "intent" => Ok(EvalKind::Intent),
            "determinism" => Ok(EvalKind::Determinism),
            "all" => Ok(EvalKind::All),
            other => bail!("unknown eval '{}', expected schema, intent, determinism or all", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub id: String,
    pub passed: bool,
    /// Generated SQL, one entry per sample; `None` where generation failed.
    pub sqls: Vec<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteReport {
    pub name: &'static str,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<CaseResult>,
}

impl SuiteReport {
    fn new(name: &'static str, results: Vec<CaseResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            name,
            passed,
            failed: results.len() - passed,
            results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalReport {
    pub suites: Vec<SuiteReport>,
    pub total_passed: usize,
    pub total_failed: usize,
}

impl EvalReport {
    pub fn total(&self) -> usize {
        self.total_passed + self.total_failed
    }
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for suite in &self.suites {
            writeln!(f, "  {}: {}/{} passed", suite.name, suite.passed, suite.passed + suite.failed)?;
        }
        write!(f, "  TOTAL: {}/{} passed", self.total_passed, self.total())
    }
}

struct Harness<'a, G: ?Sized> {
    generator: &'a G,
    verifier: &'a Verifier<'a>,
    grammar: Arc<GrammarArtifact>,
}

impl<G: SqlGenerator + ?Sized> Harness<'_, G> {
    fn generate(&self, question: &str) -> Result<String, String> {
        let context = PromptContext::new(question, self.verifier.schema(), Arc::clone(&self.grammar));
        self.generator.generate(&context).map_err(|err| err.to_string())
    }

    fn schema_case(&self, case: &QuestionCase) -> CaseResult {
        match self.generate(&case.query) {
            Ok(sql) => {
                let verdict = self.verifier.verify(&sql);
                CaseResult {
                    id: case.id.clone(),
                    passed: verdict.accepted,
                    detail: (!verdict.accepted).then(|| verdict.error_message()),
                    sqls: vec![Some(sql)],
                }
            }
            Err(err) => generation_failed(&case.id, err),
        }
    }

    fn intent_case(&self, case: &IntentCase) -> CaseResult {
        match self.generate(&case.query) {
            Ok(sql) => {
                let upper = sql.to_uppercase();
                let missing: Vec<&str> = case
                    .expected_patterns
                    .iter()
                    .filter(|pattern| !upper.contains(&pattern.to_uppercase()))
                    .map(String::as_str)
                    .collect();
                CaseResult {
                    id: case.id.clone(),
                    passed: missing.is_empty(),
                    detail: (!missing.is_empty()).then(|| format!("missing patterns: {}", missing.join(", "))),
                    sqls: vec![Some(sql)],
                }
            }
            Err(err) => generation_failed(&case.id, err),
        }
    }

    fn determinism_case(&self, case: &DeterminismCase) -> CaseResult {
        let mut valid = 0;
        let mut sqls = Vec::with_capacity(case.samples);
        for _ in 0..case.samples {
            match self.generate(&case.query) {
                Ok(sql) => {
                    if self.verifier.verify(&sql).accepted {
                        valid += 1;
                    }
                    sqls.push(Some(sql));
                }
                Err(_) => sqls.push(None),
            }
        }

        let rate = if case.samples == 0 {
            0.0
        } else {
            valid as f64 / case.samples as f64
        };
        CaseResult {
            id: case.id.clone(),
            passed: rate >= DETERMINISM_PASS_RATE,
            sqls,
            detail: Some(format!("{}/{} valid ({:.0}%)", valid, case.samples, rate * 100.0)),
        }
    }
}

fn generation_failed(id: &str, err: String) -> CaseResult {
    CaseResult {
        id: id.to_string(),
        passed: false,
        sqls: vec![None],
        detail: Some(format!("generation failed: {}", err)),
    }
}

pub fn run_evals<G: SqlGenerator + ?Sized>(
    kind: EvalKind,
    cases: &EvalCases,
    generator: &G,
    verifier: &Verifier<'_>,
    grammar: Arc<GrammarArtifact>,
) -> EvalReport {
    let harness = Harness {
        generator,
        verifier,
        grammar,
    };
    let mut suites = Vec::new();

    if kind.includes(EvalKind::Schema) {
        let results = cases.schema_correctness.iter().map(|c| harness.schema_case(c)).collect();
        suites.push(SuiteReport::new("schema_correctness", results));
    }
    if kind.includes(EvalKind::Intent) {
        let results = cases.intent_checks.iter().map(|c| harness.intent_case(c)).collect();
        suites.push(SuiteReport::new("intent_checks", results));
    }
    if kind.includes(EvalKind::Determinism) {
        let results = cases.determinism.iter().map(|c| harness.determinism_case(c)).collect();
        suites.push(SuiteReport::new("determinism", results));
    }

    for suite in &suites {
        debug!(suite = suite.name, passed = suite.passed, failed = suite.failed, "eval suite finished");
    }

    EvalReport {
        total_passed: suites.iter().map(|s| s.passed).sum(),
        total_failed: suites.iter().map(|s| s.failed).sum(),
        suites,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::compile;
    use crate::schema::TableSchema;
    use crate::service::ExternalServiceError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Cycles through a fixed list of answers.
    struct Scripted {
        answers: Vec<&'static str>,
        next: AtomicUsize,
    }

    impl Scripted {
        fn new(answers: Vec<&'static str>) -> Self {
            Self {
                answers,
                next: AtomicUsize::new(0),
            }
        }
    }

    impl SqlGenerator for Scripted {
        fn generate(&self, _context: &PromptContext) -> Result<String, ExternalServiceError> {
            let i = self.next.fetch_add(1, Ordering::Relaxed);
            Ok(self.answers[i % self.answers.len()].to_string())
        }
    }

    fn run(kind: EvalKind, cases: &EvalCases, generator: &Scripted) -> EvalReport {
        let schema = TableSchema::trips().unwrap();
        let grammar = Arc::new(compile(&schema).unwrap());
        let verifier = Verifier::for_schema(&schema);
        run_evals(kind, cases, generator, &verifier, grammar)
    }

    #[test]
    fn bundled_cases_parse() {
        let cases = EvalCases::from_json_str(TRIPS_CASES).unwrap();
        assert!(!cases.schema_correctness.is_empty());
        assert!(!cases.intent_checks.is_empty());
        assert!(cases.determinism.iter().all(|c| c.samples > 0));
    }

    #[test]
    fn schema_suite_scores_verification() {
        let cases = EvalCases {
            schema_correctness: vec![
                QuestionCase { id: "a".into(), query: "count".into() },
                QuestionCase { id: "b".into(), query: "tip".into() },
            ],
            ..EvalCases::default()
        };
        let generator = Scripted::new(vec!["SELECT count() FROM trips", "SELECT sum(tip_percent) FROM trips"]);
        let report = run(EvalKind::Schema, &cases, &generator);
        assert_eq!((report.total_passed, report.total_failed), (1, 1));
        assert!(report.suites[0].results[1].detail.as_deref().unwrap().contains("tip_percent"));
    }

    #[test]
    fn intent_patterns_are_case_insensitive() {
        let cases = EvalCases {
            intent_checks: vec![IntentCase {
                id: "i".into(),
                query: "by borough".into(),
                expected_patterns: vec!["group by".into(), "PICKUP_BOROUGH".into()],
            }],
            ..EvalCases::default()
        };
        let generator = Scripted::new(vec!["SELECT pickup_borough, count() FROM trips GROUP BY pickup_borough"]);
        assert_eq!(run(EvalKind::All, &cases, &generator).total_passed, 1);
    }

    #[test]
    fn determinism_threshold_is_eighty_percent() {
        let cases = EvalCases {
            determinism: vec![DeterminismCase { id: "d".into(), query: "q".into(), samples: 5 }],
            ..EvalCases::default()
        };
        let four_of_five = Scripted::new(vec![
            "SELECT count() FROM trips",
            "SELECT count() FROM trips",
            "SELECT count() FROM trips",
            "SELECT count() FROM trips",
            "DROP TABLE trips",
        ]);
        assert_eq!(run(EvalKind::Determinism, &cases, &four_of_five).total_passed, 1);

        let three_of_five = Scripted::new(vec![
            "SELECT count() FROM trips",
            "SELECT count() FROM trips",
            "SELECT count() FROM trips",
            "DROP TABLE trips",
            "DROP TABLE trips",
        ]);
        assert_eq!(run(EvalKind::Determinism, &cases, &three_of_five).total_failed, 1);
    }

    #[test]
    fn eval_kind_parses() {
        assert_eq!("Intent".parse::<EvalKind>().unwrap(), EvalKind::Intent);
        assert!("bogus".parse::<EvalKind>().is_err());
    }
}
