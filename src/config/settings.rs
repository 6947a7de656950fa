//! # Process Settings
//!
//! Environment-driven settings read once by the binary at startup.
//!
//! | Variable                | Meaning                                   |
//! |-------------------------|-------------------------------------------|
//! | `SQLFENCE_SCHEMA`       | Path to the primary schema definition     |
//! | `SQLFENCE_SCHEMA_DIR`   | Directory of additional `<name>.json`     |
//! | `SQLFENCE_LIMIT_POLICY` | `reject` (default) or `clamp`             |
//! | `SQLFENCE_LOG`          | `tracing` filter directive, e.g. `debug`  |
//!
//! Command-line flags take precedence over these values.

use std::env;
use std::path::PathBuf;

use eyre::{Result, WrapErr};

use super::verifier::LimitPolicy;

pub const SCHEMA_ENV_VAR: &str = "SQLFENCE_SCHEMA";
pub const SCHEMA_DIR_ENV_VAR: &str = "SQLFENCE_SCHEMA_DIR";
pub const LIMIT_POLICY_ENV_VAR: &str = "SQLFENCE_LIMIT_POLICY";
pub const LOG_ENV_VAR: &str = "SQLFENCE_LOG";

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub schema_path: Option<PathBuf>,
    pub schema_dir: Option<PathBuf>,
    pub limit_policy: LimitPolicy,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_path: None,
            schema_dir: None,
            limit_policy: LimitPolicy::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let limit_policy = match non_empty(LIMIT_POLICY_ENV_VAR) {
            Some(raw) => raw
                .parse()
                .wrap_err_with(|| format!("invalid {}", LIMIT_POLICY_ENV_VAR))?,
            None => LimitPolicy::default(),
        };

        Ok(Self {
            schema_path: non_empty(SCHEMA_ENV_VAR).map(PathBuf::from),
            schema_dir: non_empty(SCHEMA_DIR_ENV_VAR).map(PathBuf::from),
            limit_policy,
            log_filter: non_empty(LOG_ENV_VAR).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn reads_paths_and_policy() {
        let settings = Settings::from_lookup(lookup_from(&[
            (SCHEMA_ENV_VAR, "/etc/sqlfence/trips.json"),
            (SCHEMA_DIR_ENV_VAR, "/etc/sqlfence/schemas"),
            (LIMIT_POLICY_ENV_VAR, "clamp"),
            (LOG_ENV_VAR, "sqlfence=debug"),
        ]))
        .unwrap();

        assert_eq!(settings.schema_path, Some(PathBuf::from("/etc/sqlfence/trips.json")));
        assert_eq!(settings.schema_dir, Some(PathBuf::from("/etc/sqlfence/schemas")));
        assert_eq!(settings.limit_policy, LimitPolicy::Clamp);
        assert_eq!(settings.log_filter, "sqlfence=debug");
    }

    #[test]
    fn blank_values_are_ignored() {
        let settings = Settings::from_lookup(lookup_from(&[
            (SCHEMA_ENV_VAR, "  "),
            (LIMIT_POLICY_ENV_VAR, ""),
        ]))
        .unwrap();

        assert_eq!(settings.schema_path, None);
        assert_eq!(settings.limit_policy, LimitPolicy::Reject);
    }

    #[test]
    fn invalid_policy_is_an_error() {
        let err = Settings::from_lookup(lookup_from(&[(LIMIT_POLICY_ENV_VAR, "sometimes")]))
            .unwrap_err();
        assert!(err.to_string().contains(LIMIT_POLICY_ENV_VAR));
    }
}
