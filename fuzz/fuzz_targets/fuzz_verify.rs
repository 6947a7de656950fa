//! Fuzz testing for the query verifier.
//!
//! Feeds arbitrary text to `verify` under both LIMIT policies. The verifier
//! must never panic, every accepted query must carry normalized SQL, and
//! re-verifying that SQL must reproduce it exactly.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use sqlfence::config::{LimitPolicy, VerifierConfig};
use sqlfence::schema::TableSchema;
use sqlfence::verify::Verifier;

#[derive(Debug, Arbitrary)]
struct VerifyInput {
    sql: String,
    clamp: bool,
}

fuzz_target!(|input: VerifyInput| {
    let Ok(schema) = TableSchema::trips() else {
        return;
    };
    let policy = if input.clamp {
        LimitPolicy::Clamp
    } else {
        LimitPolicy::Reject
    };
    let config = VerifierConfig::builder().limit_policy(policy).build();
    let verifier = Verifier::new(&schema, config);

    let result = verifier.verify(&input.sql);
    if !result.accepted {
        assert!(!result.violations.is_empty());
        return;
    }

    let normalized = result.normalized_sql.expect("accepted query without normalized SQL");
    let again = verifier.verify(&normalized);
    assert!(again.accepted, "normalized form rejected: {normalized}");
    assert_eq!(again.normalized_sql.as_deref(), Some(normalized.as_str()));
});
