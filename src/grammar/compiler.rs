//! Rule construction for [`compile`].
//!
//! Rules are emitted top-down in the order a reader walks a query, which
//! is also the order the Lark text lists them.

use super::sample::min_heights;
use super::{GrammarArtifact, GrammarBuildError, Production, Rule, Symbol, START_SYMBOL};
use crate::config::MAX_NUMERIC_DIGITS;
use crate::language::{AggregateFunction, Comparator, DurationUnit, IntervalUnit, ScalarFunction};
use crate::schema::{ColumnRole, ColumnSpec, ColumnType, TableSchema};
use crate::sql::OrderDirection;
use hashbrown::HashMap;
use smallvec::smallvec;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

fn lit(text: impl Into<String>) -> Symbol {
    Symbol::literal(text)
}

fn rule(name: &str) -> Symbol {
    Symbol::rule(name)
}

struct GrammarBuilder {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
    columns: BTreeSet<String>,
}

impl GrammarBuilder {
    fn new() -> Self {
        Self {
            rules: Vec::new(),
            index: HashMap::new(),
            columns: BTreeSet::new(),
        }
    }

    fn add(&mut self, name: &str, alternatives: Vec<Production>) {
        debug_assert!(!self.index.contains_key(name), "rule {name} defined twice");
        self.index.insert(name.to_string(), self.rules.len());
        self.rules.push(Rule {
            name: name.to_string(),
            alternatives,
        });
    }

    /// One alternative per column, each a single column-name terminal.
    fn add_column_choice<'s>(&mut self, name: &str, columns: impl IntoIterator<Item = &'s ColumnSpec>) {
        let alternatives: Vec<Production> = columns
            .into_iter()
            .map(|col| {
                self.columns.insert(col.name().to_string());
                smallvec![lit(col.name())]
            })
            .collect();
        self.add(name, alternatives);
    }

    /// `name → item | item sep name`
    fn add_list(&mut self, name: &str, item: &str, separator: &str) {
        self.add(
            name,
            vec![smallvec![rule(item)], smallvec![rule(item), lit(separator), rule(name)]],
        );
    }
}

/// Compiles the grammar of safe queries over `schema`.
pub fn compile(schema: &TableSchema) -> Result<GrammarArtifact, GrammarBuildError> {
    let table = schema.table_name();
    let metrics: Vec<&ColumnSpec> = schema.columns_with_role(ColumnRole::Metric).collect();
    let dimensions: Vec<&ColumnSpec> = schema.columns_with_role(ColumnRole::Groupable).collect();
    let equality_columns: Vec<&ColumnSpec> = dimensions
        .iter()
        .copied()
        .filter(|col| col.has_role(ColumnRole::Filterable) && supports_equality(col))
        .collect();

    let time_column = schema.primary_time_column().filter(|_| schema.supports_time_window());
    let datetime_columns: Vec<&ColumnSpec> = if schema.supports_duration_filter() {
        schema.datetime_columns().collect()
    } else {
        Vec::new()
    };

    let mut conditions: Vec<&str> = Vec::new();
    if time_column.is_some() {
        conditions.push("time_window");
    }
    if !equality_columns.is_empty() {
        conditions.push("equality");
    }
    if !datetime_columns.is_empty() {
        conditions.push("duration");
    }
    let grouped = !dimensions.is_empty();

    if metrics.is_empty() {
        if !grouped && conditions.is_empty() {
            return Err(GrammarBuildError::Degenerate(table.to_string()));
        }
        return Err(GrammarBuildError::NoMetricColumns(table.to_string()));
    }

    let mut builder = GrammarBuilder::new();

    // statement skeletons
    let mut starts: Vec<Production> = vec![smallvec![rule("aggregate_query")]];
    if grouped {
        starts.push(smallvec![rule("grouped_query")]);
    }
    builder.add(START_SYMBOL, starts);

    let mut aggregate_query: Production = smallvec![
        lit("SELECT "),
        rule("select_list"),
        lit(" FROM "),
        rule("table")
    ];
    if !conditions.is_empty() {
        aggregate_query.push(rule("where_clause"));
    }
    aggregate_query.push(rule("limit_clause"));
    builder.add("aggregate_query", vec![aggregate_query]);

    // One grouped shape per leading dimension. The leading dimension is
    // always grouped on and is the only bare column the select list and
    // ORDER BY may name.
    if grouped {
        let shapes: Vec<Production> = dimensions
            .iter()
            .map(|dim| {
                let mut shape: Production = smallvec![
                    lit("SELECT "),
                    rule(&format!("{}_select_list", dim.name())),
                    lit(" FROM "),
                    rule("table")
                ];
                if !conditions.is_empty() {
                    shape.push(rule("where_clause"));
                }
                shape.extend([
                    lit(format!(" GROUP BY {}", dim.name())),
                    rule("more_dims"),
                    rule(&format!("{}_order_clause", dim.name())),
                    rule("limit_clause"),
                ]);
                shape
            })
            .collect();
        builder.add("grouped_query", shapes);
    }

    // select lists
    builder.add_list("select_list", "agg_item", ", ");
    for dim in &dimensions {
        let list = format!("{}_select_list", dim.name());
        let item = format!("{}_item", dim.name());
        builder.add_list(&list, &item, ", ");
        builder.add(&item, vec![smallvec![rule("agg_item")], smallvec![lit(dim.name())]]);
    }

    let agg_items: Vec<Production> = AggregateFunction::ALL
        .iter()
        .map(|agg| {
            if agg.takes_metric() {
                smallvec![lit(format!("{}(", agg.name())), rule("metric_column"), lit(")")]
            } else {
                smallvec![lit(format!("{}()", agg.name()))]
            }
        })
        .collect();
    builder.add("agg_item", agg_items);
    builder.add_column_choice("metric_column", metrics.iter().copied());

    if grouped {
        builder.add_column_choice("dimension", dimensions.iter().copied());
        builder.add_list("dim_list", "dimension", ", ");
        builder.add(
            "more_dims",
            vec![smallvec![], smallvec![lit(", "), rule("dim_list")]],
        );
    }

    builder.add("table", vec![smallvec![lit(table)]]);

    // WHERE
    if !conditions.is_empty() {
        builder.add(
            "where_clause",
            vec![smallvec![], smallvec![lit(" WHERE "), rule("predicate")]],
        );
        builder.add_list("predicate", "condition", " AND ");
        builder.add(
            "condition",
            conditions.iter().map(|name| smallvec![rule(name)]).collect(),
        );
    }

    if let Some(time_column) = time_column {
        builder.columns.insert(time_column.name().to_string());
        builder.add(
            "time_window",
            vec![smallvec![
                lit(format!(
                    "{} >= {}() - INTERVAL ",
                    time_column.name(),
                    ScalarFunction::Now.name()
                )),
                rule("positive_int"),
                lit(" "),
                rule("interval_unit")
            ]],
        );
        builder.add(
            "interval_unit",
            IntervalUnit::ALL
                .iter()
                .map(|unit| smallvec![lit(unit.keyword())])
                .collect(),
        );
    }

    if !equality_columns.is_empty() {
        let mut alternatives = Vec::with_capacity(equality_columns.len());
        let mut value_rules = Vec::new();
        for col in &equality_columns {
            builder.columns.insert(col.name().to_string());
            let prefix = lit(format!("{} = ", col.name()));
            if col.allowed_values().is_empty() {
                alternatives.push(smallvec![prefix, rule("positive_int")]);
            } else {
                let value_rule = format!("{}_value", col.name());
                alternatives.push(smallvec![prefix, rule(&value_rule)]);
                let values: Vec<Production> = col
                    .allowed_values()
                    .iter()
                    .map(|value| smallvec![lit(col.literal(value))])
                    .collect();
                value_rules.push((value_rule, values));
            }
        }
        builder.add("equality", alternatives);
        for (name, values) in value_rules {
            builder.add(&name, values);
        }
    }

    if !datetime_columns.is_empty() {
        builder.add(
            "duration",
            vec![smallvec![
                lit(format!("{}('", ScalarFunction::DateDiff.name())),
                rule("duration_unit"),
                lit("', "),
                rule("datetime_column"),
                lit(", "),
                rule("datetime_column"),
                lit(") "),
                rule("comparator"),
                lit(" "),
                rule("positive_int")
            ]],
        );
        builder.add(
            "duration_unit",
            DurationUnit::ALL
                .iter()
                .map(|unit| smallvec![lit(unit.name())])
                .collect(),
        );
        builder.add_column_choice("datetime_column", datetime_columns.iter().copied());
        builder.add(
            "comparator",
            Comparator::ALL
                .iter()
                .map(|cmp| smallvec![lit(cmp.symbol())])
                .collect(),
        );
    }

    // ORDER BY
    if grouped {
        for dim in &dimensions {
            let clause = format!("{}_order_clause", dim.name());
            let key = format!("{}_order_key", dim.name());
            builder.add(
                &clause,
                vec![smallvec![], smallvec![lit(" ORDER BY "), rule(&key), rule("order_direction")]],
            );
            builder.add(&key, vec![smallvec![lit(dim.name())], smallvec![rule("agg_item")]]);
        }
        let mut directions: Vec<Production> = vec![smallvec![]];
        directions.extend(
            OrderDirection::ALL
                .iter()
                .map(|dir| -> Production { smallvec![lit(format!(" {}", dir.as_str()))] }),
        );
        builder.add("order_direction", directions);
    }

    // LIMIT
    builder.add(
        "limit_clause",
        vec![smallvec![], smallvec![lit(" LIMIT "), rule("limit_value")]],
    );
    builder.add("limit_value", bounded_range(schema.limits().max_limit));

    // digits
    let positive_int = (1..=MAX_NUMERIC_DIGITS)
        .map(|len| {
            let mut alt: Production = smallvec![rule("nonzero_digit")];
            alt.extend((1..len).map(|_| rule("digit")));
            alt
        })
        .collect();
    builder.add("positive_int", positive_int);
    builder.add(
        "nonzero_digit",
        (1..=9).map(|d: u8| smallvec![lit(d.to_string())]).collect(),
    );
    builder.add(
        "digit",
        (0..=9).map(|d: u8| smallvec![lit(d.to_string())]).collect(),
    );

    let min_heights = min_heights(&builder.rules, &builder.index);

    debug!(
        table,
        rules = builder.rules.len(),
        columns = builder.columns.len(),
        grouped,
        "compiled query grammar"
    );

    Ok(GrammarArtifact {
        rules: builder.rules,
        index: builder.index,
        min_heights,
        start_symbol: START_SYMBOL.to_string(),
        allowed_tables: BTreeSet::from([table.to_string()]),
        allowed_columns: BTreeMap::from([(table.to_string(), builder.columns)]),
        allowed_aggregates: AggregateFunction::ALL
            .iter()
            .map(|agg| agg.name().to_string())
            .collect(),
    })
}

/// Equality needs a closed value set, or an integer column whose values
/// the bounded digit production can spell.
fn supports_equality(col: &ColumnSpec) -> bool {
    !col.allowed_values().is_empty() || col.column_type() == ColumnType::Integer
}

/// Alternatives deriving exactly the decimal integers in `1..=max`.
///
/// Numbers shorter than `max` are a nonzero digit followed by free digits.
/// Numbers as long as `max` share a prefix with it, then take a smaller
/// digit at the first position where they differ, then free digits.
fn bounded_range(max: u32) -> Vec<Production> {
    let digits: Vec<u8> = max.to_string().bytes().map(|b| b - b'0').collect();
    let len = digits.len();
    let mut alternatives: Vec<Production> = Vec::new();

    for shorter in 1..len {
        let mut alt: Production = smallvec![rule("nonzero_digit")];
        alt.extend((1..shorter).map(|_| rule("digit")));
        alternatives.push(alt);
    }

    let mut prefix = String::new();
    for (position, &bound) in digits.iter().enumerate() {
        let lowest = if position == 0 { 1 } else { 0 };
        for digit in lowest..bound {
            let mut alt: Production = smallvec![lit(format!("{}{}", prefix, digit))];
            alt.extend((position + 1..len).map(|_| rule("digit")));
            alternatives.push(alt);
        }
        prefix.push(char::from(b'0' + bound));
    }
    alternatives.push(smallvec![lit(prefix)]);

    alternatives
}
