//! # Verifier Configuration
//!
//! Controls how the query verifier treats `LIMIT` clauses. The ceiling comes
//! from the schema (or [`MAX_ROW_LIMIT`] when the schema is silent) and the
//! policy decides what happens when a query asks for more:
//!
//! | Policy   | `LIMIT` above ceiling                         |
//! |----------|-----------------------------------------------|
//! | `Reject` | `LIMIT_EXCEEDED` violation, query refused      |
//! | `Clamp`  | Accepted, normalized SQL carries the ceiling   |
//!
//! `Reject` is the default so that callers always learn when a generated
//! query asked for more than it may receive.
//!
//! A default limit can also be configured. When set, an accepted query that
//! has no `LIMIT` gets one appended during normalization.
//!
//! ## Usage
//!
//! ```ignore
//! let config = VerifierConfig::builder()
//!     .max_limit(500)
//!     .limit_policy(LimitPolicy::Clamp)
//!     .default_limit(100)
//!     .build();
//! ```

use std::fmt;
use std::str::FromStr;

use eyre::{bail, Result};
use serde::{Deserialize, Serialize};

use super::constants::MAX_ROW_LIMIT;
use crate::schema::TableSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitPolicy {
    #[default]
    Reject,
    Clamp,
}

impl FromStr for LimitPolicy {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(LimitPolicy::Reject),
            "clamp" => Ok(LimitPolicy::Clamp),
            other => bail!("unknown limit policy '{}', expected 'reject' or 'clamp'", other),
        }
    }
}

impl fmt::Display for LimitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitPolicy::Reject => write!(f, "reject"),
            LimitPolicy::Clamp => write!(f, "clamp"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierConfig {
    max_limit: u32,
    limit_policy: LimitPolicy,
    default_limit: Option<u32>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_limit: MAX_ROW_LIMIT,
            limit_policy: LimitPolicy::Reject,
            default_limit: None,
        }
    }
}

impl VerifierConfig {
    pub fn builder() -> VerifierConfigBuilder {
        VerifierConfigBuilder::new()
    }

    /// Ceiling taken from the schema's declared limits, reject policy,
    /// no default limit injection.
    pub fn for_schema(schema: &TableSchema) -> Self {
        Self {
            max_limit: schema.limits().max_limit,
            ..Self::default()
        }
    }

    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }

    pub fn limit_policy(&self) -> LimitPolicy {
        self.limit_policy
    }

    pub fn default_limit(&self) -> Option<u32> {
        self.default_limit
    }
}

/// Fluent builder for [`VerifierConfig`].
///
/// Starts from [`VerifierConfig::default`] (or a schema's limits via
/// [`VerifierConfigBuilder::from_schema`]). A default limit above the
/// ceiling is lowered to the ceiling when the config is built.
#[derive(Debug, Clone)]
pub struct VerifierConfigBuilder {
    config: VerifierConfig,
}

impl Default for VerifierConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifierConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: VerifierConfig::default(),
        }
    }

    pub fn from_schema(schema: &TableSchema) -> Self {
        Self {
            config: VerifierConfig::for_schema(schema),
        }
    }

    pub fn max_limit(mut self, max_limit: u32) -> Self {
        self.config.max_limit = max_limit.max(1);
        self
    }

    pub fn limit_policy(mut self, policy: LimitPolicy) -> Self {
        self.config.limit_policy = policy;
        self
    }

    pub fn default_limit(mut self, limit: u32) -> Self {
        self.config.default_limit = Some(limit.max(1));
        self
    }

    pub fn build(self) -> VerifierConfig {
        let mut config = self.config;
        if let Some(limit) = config.default_limit {
            config.default_limit = Some(limit.min(config.max_limit));
        }
        config
    }
}
