//! # sqlfence Configuration Module
//!
//! This module centralizes configuration for the verifier and the binary.
//! Numeric limits live in [`constants`] with compile-time checks on their
//! relationships; runtime knobs are split between the verifier's limit policy
//! and environment-driven process settings.
//!
//! ## Module Organization
//!
//! - [`constants`]: Numeric limits with dependency documentation
//! - [`verifier`]: `VerifierConfig` and the `LimitPolicy` choice
//! - [`settings`]: `Settings::from_env()` for the binary and REPL

pub mod constants;
pub mod settings;
pub mod verifier;

pub use constants::*;
pub use settings::Settings;
pub use verifier::{LimitPolicy, VerifierConfig, VerifierConfigBuilder};
