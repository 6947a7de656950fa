//! End-to-end verifier behavior against the bundled trips schema.

use proptest::prelude::*;
use sqlfence::config::{LimitPolicy, VerifierConfig};
use sqlfence::grammar::{compile, GrammarBuildError};
use sqlfence::language::FORBIDDEN_KEYWORDS;
use sqlfence::schema::TableSchema;
use sqlfence::verify::{verify, Verifier, ViolationCode};

fn trips() -> TableSchema {
    TableSchema::trips().unwrap()
}

#[test]
fn plain_count_is_accepted() {
    let result = verify("SELECT count() FROM trips", &trips());
    assert!(result.accepted);
    assert!(result.violations.is_empty());
    assert_eq!(result.normalized_sql.as_deref(), Some("SELECT count() FROM trips"));
}

#[test]
fn stacked_drop_is_rejected_naming_drop() {
    let sql = "SELECT count() FROM trips; DROP TABLE trips";
    let result = verify(sql, &trips());
    assert!(!result.accepted);
    assert!(result.normalized_sql.is_none());

    let violation = result
        .violations
        .iter()
        .find(|v| v.code == ViolationCode::ForbiddenToken)
        .expect("FORBIDDEN_TOKEN violation");
    let (start, end) = violation.span.unwrap();
    assert_eq!(&sql[start..end], "DROP");
}

#[test]
fn unknown_filter_column_is_rejected() {
    let sql = "SELECT sum(fare_amount) FROM trips WHERE bogus_col = 1";
    let result = verify(sql, &trips());
    assert!(!result.accepted);
    assert_eq!(result.codes(), vec![ViolationCode::UnknownColumn]);
    assert!(result.violations[0].message.contains("bogus_col"));
}

#[test]
fn other_table_is_rejected() {
    let result = verify("SELECT count() FROM other_table", &trips());
    assert!(!result.accepted);
    assert!(result.has(ViolationCode::UnknownTable));
}

#[test]
fn relative_time_window_is_accepted_with_uppercase_keywords() {
    let result = verify(
        "select count() from trips where pickup_datetime >= now() - interval 24 hour",
        &trips(),
    );
    assert!(result.accepted, "{:?}", result.violations);
    assert_eq!(
        result.normalized_sql.as_deref(),
        Some("SELECT count() FROM trips WHERE pickup_datetime >= now() - INTERVAL 24 HOUR")
    );
}

#[test]
fn schema_without_metrics_fails_to_compile() {
    let schema = TableSchema::from_json_str(
        r#"{
            "table": "events",
            "columns": [
                { "name": "created_at", "type": "DateTime" },
                { "name": "kind", "type": "String" }
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(
        compile(&schema).unwrap_err(),
        GrammarBuildError::NoMetricColumns("events".to_string())
    );
}

#[test]
fn every_forbidden_keyword_is_rejected_as_leading_statement() {
    let schema = trips();
    for keyword in FORBIDDEN_KEYWORDS {
        let word = keyword.to_string();
        for sql in [
            format!("{} trips", word),
            format!("  {} trips", word.to_lowercase()),
            format!("/* note */ -- line\n\t{} trips", word),
        ] {
            let result = verify(&sql, &schema);
            assert!(!result.accepted, "{sql}");
            assert_eq!(result.violations[0].code, ViolationCode::ForbiddenStatement, "{sql}");
        }
    }
}

#[test]
fn forbidden_keywords_inside_literals_are_not_tokens() {
    let result = verify(
        "SELECT count() FROM trips WHERE pickup_borough = 'DROP' -- DELETE",
        &trips(),
    );
    assert!(!result.has(ViolationCode::ForbiddenToken));
    assert!(!result.has(ViolationCode::ForbiddenStatement));
}

#[test]
fn or_and_not_connectors_are_disallowed() {
    let schema = trips();
    for sql in [
        "SELECT count() FROM trips WHERE payment_type = 1 OR payment_type = 2",
        "SELECT count() FROM trips WHERE NOT payment_type = 1",
    ] {
        let result = verify(sql, &schema);
        assert!(result.has(ViolationCode::DisallowedOperator), "{sql}");
    }
}

#[test]
fn non_whitelisted_aggregate_is_disallowed() {
    let result = verify("SELECT median(fare_amount) FROM trips", &trips());
    assert!(!result.accepted);
    assert!(result.has(ViolationCode::DisallowedFunction));
}

#[test]
fn limit_policy_changes_outcome_not_parse() {
    let schema = trips();
    let sql = "SELECT pickup_borough, count() FROM trips GROUP BY pickup_borough LIMIT 2000";

    let rejected = verify(sql, &schema);
    assert_eq!(rejected.codes(), vec![ViolationCode::LimitExceeded]);

    let clamp = VerifierConfig::builder().limit_policy(LimitPolicy::Clamp).build();
    let clamped = Verifier::new(&schema, clamp).verify(sql);
    assert!(clamped.accepted);
    assert!(clamped.normalized_sql.unwrap().ends_with(" LIMIT 1000"));
}

#[test]
fn normalized_output_is_a_fixed_point() {
    let schema = trips();
    for sql in [
        "select   pickup_borough , AVG(fare_amount)\nfrom trips group by pickup_borough order by avg(fare_amount) desc limit 10",
        "SELECT count(*) FROM trips WHERE dateDiff('minute', pickup_datetime, dropoff_datetime) > 30",
        "SELECT max(tip_amount) FROM trips WHERE pickup_borough = 'Staten Island' AND payment_type = 1;",
    ] {
        let first = verify(sql, &schema);
        assert!(first.accepted, "{sql}: {:?}", first.violations);
        let normalized = first.normalized_sql.unwrap();
        let second = verify(&normalized, &schema);
        assert_eq!(second.normalized_sql.as_deref(), Some(normalized.as_str()));
    }
}

#[test]
fn backslash_escaped_quote_does_not_end_the_literal() {
    let schema = trips();
    let sql = r"SELECT count() FROM trips WHERE pickup_borough = 'a\' AND pickup_borough = ' OR fare_amount IN (SELECT 1 FROM system.users) --'";
    let result = verify(sql, &schema);
    assert!(!result.accepted);
    assert!(result.normalized_sql.is_none());
    let violation = result
        .violations
        .iter()
        .find(|v| v.code == ViolationCode::ForbiddenToken)
        .expect("FORBIDDEN_TOKEN violation");
    let (start, end) = violation.span.unwrap();
    assert_eq!(&sql[start..end], "system");

    let quoted = r"SELECT count() FROM trips WHERE store_and_fwd_flag = 'a\' OR fare_amount > 0 --'";
    let first = verify(quoted, &schema);
    assert!(first.accepted, "{:?}", first.violations);
    let normalized = first.normalized_sql.unwrap();
    assert_eq!(
        normalized,
        "SELECT count() FROM trips WHERE store_and_fwd_flag = 'a'' OR fare_amount > 0 --'"
    );
    let second = verify(&normalized, &schema);
    assert_eq!(second.normalized_sql.as_deref(), Some(normalized.as_str()));
}

#[test]
fn normalized_aliases_reverify_unchanged() {
    let schema = trips();
    let injected = r#"SELECT count() AS "x"", (SELECT 1 FROM secrets) AS y FROM trips; DROP TABLE trips; --" FROM trips"#;
    assert!(!verify(injected, &schema).accepted);

    let sql = "SELECT pickup_borough AS borough, max(tip_amount) AS top FROM trips AS t \
               GROUP BY pickup_borough ORDER BY top DESC LIMIT 3";
    let first = verify(sql, &schema);
    assert!(first.accepted, "{:?}", first.violations);
    let normalized = first.normalized_sql.unwrap();
    let second = verify(&normalized, &schema);
    assert!(second.accepted, "{normalized}: {:?}", second.violations);
    assert_eq!(second.normalized_sql.as_deref(), Some(normalized.as_str()));
}

#[test]
fn select_and_order_columns_must_be_grouped() {
    let result = verify(
        "SELECT payment_type, count() FROM trips GROUP BY pickup_borough ORDER BY payment_type",
        &trips(),
    );
    assert!(!result.accepted);
    assert_eq!(
        result.codes(),
        vec![ViolationCode::UnsupportedClause, ViolationCode::UnsupportedClause]
    );
}

#[test]
fn deep_nesting_is_rejected_without_overflow() {
    let schema = trips();
    for sql in [
        format!("SELECT count() FROM trips WHERE {}1{} = 1", "(".repeat(10_000), ")".repeat(10_000)),
        format!("SELECT count() FROM trips WHERE fare_amount > {}1", "-".repeat(10_000)),
        format!("SELECT count() FROM trips WHERE fare_amount > 1{}", " AND fare_amount > 1".repeat(10_000)),
    ] {
        let result = verify(&sql, &schema);
        assert_eq!(result.codes(), vec![ViolationCode::SyntaxError]);
    }
}

fn unknown_column_name() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{2,12}".prop_filter("not a schema column or keyword", |name| {
        !trips().has_column(name) && !sqlfence::sql::is_keyword(name)
    })
}

proptest! {
    #[test]
    fn unknown_columns_are_always_named(name in unknown_column_name()) {
        let schema = trips();
        for sql in [
            format!("SELECT sum({name}) FROM trips"),
            format!("SELECT count() FROM trips WHERE {name} = 1"),
            format!("SELECT {name}, count() FROM trips GROUP BY {name}"),
        ] {
            let result = verify(&sql, &schema);
            prop_assert!(!result.accepted);
            let needle = format!("'{name}'");
            prop_assert!(result
                .violations
                .iter()
                .any(|v| v.code == ViolationCode::UnknownColumn
                    && v.message.contains(&needle)));
        }
    }
}
