//! Semantic checks over a parsed statement.
//!
//! The checker walks every clause and records a violation for each
//! construct outside the supported language. It never stops at the first
//! finding, so a rejection lists every offending identifier and operator.
//!
//! ## Positions and Their Rules
//!
//! | Position | Accepted | Otherwise |
//! |----------|----------|-----------|
//! | FROM | the schema's table, optionally aliased | UNKNOWN_TABLE / UNSUPPORTED_CLAUSE |
//! | select item | aggregate over a metric, groupable column named in GROUP BY | UNKNOWN_COLUMN / DISALLOWED_* / UNSUPPORTED_CLAUSE |
//! | alias | plain identifier | UNSUPPORTED_CLAUSE |
//! | WHERE | comparisons joined by AND, equality within a column's allowed values | DISALLOWED_OPERATOR |
//! | WHERE operand | column, literal, `now()`, `today()`, `dateDiff`, `INTERVAL`, `+`/`-` | DISALLOWED_* |
//! | GROUP BY | groupable column | UNKNOWN_COLUMN / DISALLOWED_OPERATOR |
//! | ORDER BY | select alias, groupable column named in GROUP BY, aggregate | UNKNOWN_COLUMN / DISALLOWED_* |
//! | INTERVAL | integer literal from 1 to the literal ceiling | DISALLOWED_OPERATOR |
//! | LIMIT | integer literal from 1 to the ceiling | LIMIT_EXCEEDED / UNSUPPORTED_CLAUSE |

use super::{Violation, ViolationCode};
use crate::config::{LimitPolicy, VerifierConfig, NUMERIC_LITERAL_CEILING};
use crate::language::{AggregateFunction, DurationUnit, IntervalUnit, ScalarFunction};
use crate::schema::{validate_identifier, ColumnRole, ColumnSpec, ColumnType, TableSchema};
use crate::sql::{
    unescape, BinaryOperator, ColumnRef, Distinct, Expr, FromClause, FunctionArgs, FunctionCall, Literal,
    NullsOrder, OrderByItem, SelectColumn, SelectStmt, Span, TableRef, UnaryOperator,
};
use tracing::debug;

pub(super) struct CheckOutcome {
    pub violations: Vec<Violation>,
    /// Row limit the normalized statement carries, after clamping or
    /// default injection.
    pub limit: Option<u64>,
}

pub(super) struct Checker<'s, 'a> {
    schema: &'s TableSchema,
    config: &'s VerifierConfig,
    table_alias: Option<&'a str>,
    select_aliases: Vec<&'a str>,
    grouped: bool,
    group_columns: Vec<&'a str>,
    violations: Vec<Violation>,
    limit: Option<u64>,
}

impl<'s, 'a> Checker<'s, 'a> {
    pub fn new(schema: &'s TableSchema, config: &'s VerifierConfig) -> Self {
        Self {
            schema,
            config,
            table_alias: None,
            select_aliases: Vec::new(),
            grouped: false,
            group_columns: Vec::new(),
            violations: Vec::new(),
            limit: None,
        }
    }

    pub fn finish(self) -> CheckOutcome {
        CheckOutcome {
            violations: self.violations,
            limit: self.limit,
        }
    }

    fn report(&mut self, code: ViolationCode, message: impl Into<String>) {
        self.violations.push(Violation::new(code, message));
    }

    fn report_at(&mut self, code: ViolationCode, message: impl Into<String>, span: Span) {
        self.violations.push(Violation::at(code, message, span));
    }

    pub fn check_select(&mut self, select: &SelectStmt<'a>) {
        self.grouped = !select.group_by.is_empty();
        self.group_columns = select
            .group_by
            .iter()
            .filter_map(|key| match key {
                Expr::Column(column) => Some(column.column),
                _ => None,
            })
            .collect();

        if select.distinct == Distinct::Distinct {
            self.report(ViolationCode::UnsupportedClause, "SELECT DISTINCT is not supported");
        }

        match select.from {
            Some(from) => self.check_from(from),
            None => self.report(
                ViolationCode::UnknownTable,
                format!(
                    "query has no FROM clause, expected table '{}'",
                    self.schema.table_name()
                ),
            ),
        }

        for column in select.columns {
            match column {
                SelectColumn::AllColumns => {
                    self.report(ViolationCode::UnsupportedClause, "SELECT * is not supported")
                }
                SelectColumn::TableAllColumns(qualifier) => self.report(
                    ViolationCode::UnsupportedClause,
                    format!("SELECT {}.* is not supported", qualifier),
                ),
                SelectColumn::Expr { expr, alias } => {
                    self.check_select_item(expr);
                    if let Some(alias) = alias {
                        self.check_alias(alias);
                        self.select_aliases.push(*alias);
                    }
                }
            }
        }

        if let Some(predicate) = select.where_clause {
            self.check_predicate(predicate);
        }

        for key in select.group_by {
            self.check_group_key(key);
        }

        if select.having.is_some() {
            self.report(ViolationCode::UnsupportedClause, "HAVING is not supported");
        }

        for item in select.order_by {
            self.check_order_item(item);
        }

        self.check_limit(select);

        if select.offset.is_some() {
            self.report(ViolationCode::UnsupportedClause, "OFFSET is not supported");
        }

        if let Some(set_op) = select.set_op {
            self.report(
                ViolationCode::UnsupportedClause,
                format!("{} is not supported", set_op.op.as_str()),
            );
        }
    }

    fn check_from(&mut self, from: &FromClause<'a>) {
        match from {
            FromClause::Table(table) => {
                self.check_table(table);
                if let Some(alias) = table.alias {
                    self.check_alias(alias);
                }
                self.table_alias = table.alias;
            }
            FromClause::Join(join) => {
                self.report(ViolationCode::UnsupportedClause, "joins are not supported");
                self.check_from_leaf(join.left);
                self.check_from_leaf(join.right);
            }
            FromClause::Subquery { .. } => self.report(
                ViolationCode::UnknownTable,
                format!(
                    "subquery in FROM is not allowed, expected table '{}'",
                    self.schema.table_name()
                ),
            ),
        }
    }

    fn check_from_leaf(&mut self, from: &FromClause<'a>) {
        match from {
            FromClause::Table(table) => self.check_table(table),
            other => self.check_from(other),
        }
    }

    fn check_table(&mut self, table: &TableRef<'a>) {
        if let Some(schema) = table.schema {
            self.report_at(
                ViolationCode::UnknownTable,
                format!("qualified table '{}.{}' is not allowed", schema, table.name),
                table.span,
            );
        } else if table.name != self.schema.table_name() {
            self.report_at(
                ViolationCode::UnknownTable,
                format!("unknown table '{}'", table.name),
                table.span,
            );
        }
    }

    /// Aliases are echoed into the normalized statement, so they must be
    /// names that never need quoting.
    fn check_alias(&mut self, alias: &str) {
        if validate_identifier(alias).is_err() {
            self.report(
                ViolationCode::UnsupportedClause,
                format!("alias '{}' must be a plain identifier", alias),
            );
        }
    }

    /// A bare column outside an aggregate must be one of the GROUP BY keys.
    fn require_grouped(&mut self, column: &ColumnRef<'a>, context: &str) {
        if !self.grouped {
            self.report_at(
                ViolationCode::UnsupportedClause,
                format!("{} column '{}' requires GROUP BY", context, column.column),
                column.span,
            );
        } else if !self.group_columns.contains(&column.column) {
            self.report_at(
                ViolationCode::UnsupportedClause,
                format!("{} column '{}' must appear in GROUP BY", context, column.column),
                column.span,
            );
        }
    }

    /// Resolves a column reference, reporting unknown qualifiers and names.
    fn resolve_column(&mut self, column: &ColumnRef<'a>) -> Option<&'s ColumnSpec> {
        if let Some(schema) = column.schema {
            self.report_at(
                ViolationCode::UnknownTable,
                format!("qualified column '{}.{}' is not allowed", schema, column.column),
                column.span,
            );
        } else if let Some(qualifier) = column.table {
            if qualifier != self.schema.table_name() && Some(qualifier) != self.table_alias {
                self.report_at(
                    ViolationCode::UnknownTable,
                    format!("unknown table qualifier '{}'", qualifier),
                    column.span,
                );
            }
        }

        let schema = self.schema;
        let spec = schema.column(column.column);
        if spec.is_none() {
            self.report_at(
                ViolationCode::UnknownColumn,
                format!("unknown column '{}'", column.column),
                column.span,
            );
        }
        spec
    }

    fn require_role(&mut self, column: &ColumnRef<'a>, role: ColumnRole, context: &str) {
        if let Some(spec) = self.resolve_column(column) {
            if !spec.has_role(role) {
                self.report_at(
                    ViolationCode::UnknownColumn,
                    format!("column '{}' is not {} and cannot be used in {}", spec.name(), role, context),
                    column.span,
                );
            }
        }
    }

    /// Reports unknown columns anywhere inside an expression that is
    /// already rejected for its shape.
    fn visit_columns(&mut self, expr: &Expr<'a>) {
        match expr {
            Expr::Column(column) => {
                self.resolve_column(column);
            }
            Expr::BinaryOp { left, right, .. } => {
                self.visit_columns(left);
                self.visit_columns(right);
            }
            Expr::UnaryOp { expr, .. } | Expr::IsNull { expr, .. } | Expr::Cast { expr, .. } => {
                self.visit_columns(expr)
            }
            Expr::Between { expr, low, high, .. } => {
                self.visit_columns(expr);
                self.visit_columns(low);
                self.visit_columns(high);
            }
            Expr::Like { expr, pattern, .. } => {
                self.visit_columns(expr);
                self.visit_columns(pattern);
            }
            Expr::InList { expr, list, .. } => {
                self.visit_columns(expr);
                for item in *list {
                    self.visit_columns(item);
                }
            }
            Expr::InSubquery { expr, .. } => self.visit_columns(expr),
            Expr::Function(call) => {
                for arg in call.args.as_slice() {
                    self.visit_columns(arg);
                }
            }
            Expr::Case {
                operand,
                conditions,
                else_result,
            } => {
                if let Some(operand) = operand {
                    self.visit_columns(operand);
                }
                for when in *conditions {
                    self.visit_columns(when.condition);
                    self.visit_columns(when.result);
                }
                if let Some(else_result) = else_result {
                    self.visit_columns(else_result);
                }
            }
            Expr::Interval { value, .. } => self.visit_columns(value),
            Expr::Literal(_) | Expr::Subquery(_) | Expr::Exists { .. } => {}
        }
    }

    fn check_select_item(&mut self, expr: &Expr<'a>) {
        match expr {
            Expr::Function(call) => match AggregateFunction::from_name(call.name) {
                Some(aggregate) => self.check_aggregate(call, aggregate),
                None => {
                    self.report_at(
                        ViolationCode::DisallowedFunction,
                        format!("function '{}' is not allowed in the select list", call.name),
                        call.span,
                    );
                    self.visit_columns(expr);
                }
            },
            Expr::Column(column) => {
                self.require_role(column, ColumnRole::Groupable, "the select list");
                self.require_grouped(column, "bare");
            }
            Expr::Subquery(_) | Expr::Exists { .. } | Expr::InSubquery { .. } => {
                self.report(ViolationCode::UnsupportedClause, "subqueries are not supported")
            }
            other => {
                self.report(
                    ViolationCode::DisallowedOperator,
                    "select items must be aggregates or groupable columns",
                );
                self.visit_columns(other);
            }
        }
    }

    fn check_aggregate(&mut self, call: &FunctionCall<'a>, aggregate: AggregateFunction) {
        let name = aggregate.name();
        if call.over {
            self.report_at(
                ViolationCode::DisallowedFunction,
                format!("window function {}() OVER is not allowed", name),
                call.span,
            );
        }
        if call.distinct {
            self.report_at(
                ViolationCode::UnsupportedClause,
                format!("DISTINCT inside {}() is not supported", name),
                call.span,
            );
        }

        match (call.args, aggregate.takes_metric()) {
            (FunctionArgs::None | FunctionArgs::Star, false) => {}
            (FunctionArgs::None | FunctionArgs::Star, true) => self.report_at(
                ViolationCode::DisallowedOperator,
                format!("{}() requires a metric column argument", name),
                call.span,
            ),
            (FunctionArgs::Args([argument]), _) => self.check_metric_argument(argument, name),
            (FunctionArgs::Args(args), _) => {
                self.report_at(
                    ViolationCode::DisallowedOperator,
                    format!("{}() takes a single column argument", name),
                    call.span,
                );
                for arg in args {
                    self.visit_columns(arg);
                }
            }
        }
    }

    fn check_metric_argument(&mut self, argument: &Expr<'a>, function: &str) {
        match argument {
            Expr::Column(column) => {
                if let Some(spec) = self.resolve_column(column) {
                    if !spec.has_role(ColumnRole::Metric) {
                        self.report_at(
                            ViolationCode::UnknownColumn,
                            format!("column '{}' is not a metric column and cannot be aggregated", spec.name()),
                            column.span,
                        );
                    }
                }
            }
            other => {
                self.report(
                    ViolationCode::DisallowedOperator,
                    format!("{}() argument must be a metric column", function),
                );
                self.visit_columns(other);
            }
        }
    }

    fn check_predicate(&mut self, expr: &Expr<'a>) {
        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                self.check_predicate(left);
                self.check_predicate(right);
            }
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Or,
                right,
            } => {
                self.report(
                    ViolationCode::DisallowedOperator,
                    "OR is not allowed, combine conditions with AND",
                );
                self.check_predicate(left);
                self.check_predicate(right);
            }
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr,
            } => {
                self.report(ViolationCode::DisallowedOperator, "NOT is not allowed");
                self.check_predicate(expr);
            }
            Expr::BinaryOp { left, op, right } if op.is_comparison() => {
                if *op == BinaryOperator::NotEq {
                    self.report(ViolationCode::DisallowedOperator, "operator != is not allowed");
                }
                self.check_operand(left);
                self.check_operand(right);
                if *op == BinaryOperator::Eq {
                    self.check_allowed_value(left, right);
                    self.check_allowed_value(right, left);
                }
            }
            Expr::Between { .. } => self.reject_predicate(expr, "BETWEEN"),
            Expr::Like {
                case_insensitive, ..
            } => self.reject_predicate(expr, if *case_insensitive { "ILIKE" } else { "LIKE" }),
            Expr::InList { .. } => self.reject_predicate(expr, "IN"),
            Expr::IsNull { .. } => self.reject_predicate(expr, "IS NULL"),
            Expr::Subquery(_) | Expr::Exists { .. } | Expr::InSubquery { .. } => {
                self.report(ViolationCode::UnsupportedClause, "subqueries are not supported")
            }
            other => {
                self.report(
                    ViolationCode::DisallowedOperator,
                    "WHERE conditions must be comparisons",
                );
                self.visit_columns(other);
            }
        }
    }

    /// Equality against a column with a closed value set must name one of
    /// its values.
    fn check_allowed_value(&mut self, column: &Expr<'a>, value: &Expr<'a>) {
        let Expr::Column(column) = column else {
            return;
        };
        let schema = self.schema;
        let Some(spec) = schema.column(column.column) else {
            return;
        };
        if spec.allowed_values().is_empty() {
            return;
        }

        let text = match value {
            Expr::Literal(Literal::String(raw)) => unescape(raw, '\''),
            Expr::Literal(Literal::Integer(digits) | Literal::Float(digits)) => (*digits).into(),
            _ => return,
        };
        if !spec.allowed_values().iter().any(|allowed| *allowed == text) {
            self.report_at(
                ViolationCode::DisallowedOperator,
                format!(
                    "value {} is not one of the allowed values of column '{}'",
                    spec.literal(&text),
                    spec.name()
                ),
                column.span,
            );
        }
    }

    fn reject_predicate(&mut self, expr: &Expr<'a>, operator: &str) {
        self.report(
            ViolationCode::DisallowedOperator,
            format!("operator {} is not allowed", operator),
        );
        self.visit_columns(expr);
    }

    fn check_operand(&mut self, expr: &Expr<'a>) {
        match expr {
            Expr::Column(column) => {
                self.resolve_column(column);
            }
            Expr::Literal(_) => {}
            Expr::Function(call) => self.check_scalar_call(call),
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Plus | BinaryOperator::Minus,
                right,
            } => {
                self.check_operand(left);
                self.check_operand(right);
            }
            Expr::BinaryOp { op, .. } => {
                self.report(
                    ViolationCode::DisallowedOperator,
                    format!("operator {} is not allowed in a comparison operand", op.as_str()),
                );
                self.visit_columns(expr);
            }
            Expr::UnaryOp {
                op: UnaryOperator::Minus | UnaryOperator::Plus,
                expr,
            } => self.check_operand(expr),
            Expr::UnaryOp { .. } => {
                self.report(ViolationCode::DisallowedOperator, "NOT is not allowed");
                self.visit_columns(expr);
            }
            Expr::Interval { value, unit } => self.check_interval(value, unit),
            Expr::Cast { data_type, .. } => {
                self.report(
                    ViolationCode::DisallowedFunction,
                    format!("CAST to {} is not allowed", data_type),
                );
                self.visit_columns(expr);
            }
            Expr::Case { .. } => {
                self.report(ViolationCode::DisallowedOperator, "CASE is not allowed");
                self.visit_columns(expr);
            }
            Expr::Between { .. } => self.reject_predicate(expr, "BETWEEN"),
            Expr::Like { .. } => self.reject_predicate(expr, "LIKE"),
            Expr::InList { .. } => self.reject_predicate(expr, "IN"),
            Expr::IsNull { .. } => self.reject_predicate(expr, "IS NULL"),
            Expr::Subquery(_) | Expr::Exists { .. } | Expr::InSubquery { .. } => {
                self.report(ViolationCode::UnsupportedClause, "subqueries are not supported")
            }
        }
    }

    fn check_scalar_call(&mut self, call: &FunctionCall<'a>) {
        if let Some(aggregate) = AggregateFunction::from_name(call.name) {
            self.report_at(
                ViolationCode::DisallowedFunction,
                format!("aggregate {}() is not allowed in WHERE", aggregate.name()),
                call.span,
            );
            return;
        }

        let Some(function) = ScalarFunction::from_name(call.name) else {
            self.report_at(
                ViolationCode::DisallowedFunction,
                format!("function '{}' is not allowed", call.name),
                call.span,
            );
            for arg in call.args.as_slice() {
                self.visit_columns(arg);
            }
            return;
        };

        if call.over || call.distinct {
            self.report_at(
                ViolationCode::DisallowedFunction,
                format!("{}() does not take DISTINCT or OVER", function.name()),
                call.span,
            );
        }

        match function {
            ScalarFunction::Now | ScalarFunction::Today => {
                if call.args != FunctionArgs::None {
                    self.report_at(
                        ViolationCode::DisallowedFunction,
                        format!("{}() takes no arguments", function.name()),
                        call.span,
                    );
                }
            }
            ScalarFunction::DateDiff => self.check_date_diff(call),
        }
    }

    fn check_date_diff(&mut self, call: &FunctionCall<'a>) {
        let FunctionArgs::Args([unit, start, end]) = call.args else {
            self.report_at(
                ViolationCode::DisallowedFunction,
                "dateDiff() takes a unit and two datetime columns",
                call.span,
            );
            return;
        };

        match unit {
            Expr::Literal(Literal::String(name)) if DurationUnit::from_name(name).is_some() => {}
            _ => {
                let allowed: Vec<_> = DurationUnit::ALL.iter().map(|u| u.name()).collect();
                self.report_at(
                    ViolationCode::DisallowedFunction,
                    format!("dateDiff() unit must be one of '{}'", allowed.join("', '")),
                    call.span,
                );
            }
        }

        for arg in [start, end] {
            match arg {
                Expr::Column(column) => {
                    if let Some(spec) = self.resolve_column(column) {
                        if spec.column_type() != ColumnType::Datetime {
                            self.report_at(
                                ViolationCode::DisallowedFunction,
                                format!("dateDiff() argument '{}' is not a datetime column", spec.name()),
                                column.span,
                            );
                        }
                    }
                }
                other => {
                    self.report_at(
                        ViolationCode::DisallowedFunction,
                        "dateDiff() arguments must be datetime columns",
                        call.span,
                    );
                    self.visit_columns(other);
                }
            }
        }
    }

    fn check_interval(&mut self, value: &Expr<'a>, unit: &str) {
        let in_range = match value {
            Expr::Literal(Literal::Integer(digits)) => digits
                .parse::<u64>()
                .map_or(false, |n| (1..=NUMERIC_LITERAL_CEILING).contains(&n)),
            _ => false,
        };
        if !in_range {
            self.report(
                ViolationCode::DisallowedOperator,
                format!(
                    "INTERVAL value must be an integer literal from 1 to {}",
                    NUMERIC_LITERAL_CEILING
                ),
            );
            self.visit_columns(value);
        }

        if IntervalUnit::from_name(unit).is_none() {
            let allowed: Vec<_> = IntervalUnit::ALL.iter().map(|u| u.keyword()).collect();
            self.report(
                ViolationCode::DisallowedOperator,
                format!("INTERVAL unit '{}' is not allowed, use {}", unit, allowed.join(" or ")),
            );
        }
    }

    fn check_group_key(&mut self, key: &Expr<'a>) {
        match key {
            Expr::Column(column) => self.require_role(column, ColumnRole::Groupable, "GROUP BY"),
            other => {
                self.report(ViolationCode::DisallowedOperator, "GROUP BY accepts only column names");
                self.visit_columns(other);
            }
        }
    }

    fn check_order_item(&mut self, item: &OrderByItem<'a>) {
        if item.nulls != NullsOrder::Default {
            self.report(ViolationCode::UnsupportedClause, "NULLS FIRST/LAST is not supported");
        }

        match item.expr {
            Expr::Column(column)
                if column.table.is_none() && self.select_aliases.contains(&column.column) => {}
            Expr::Column(column) => {
                self.require_role(column, ColumnRole::Groupable, "ORDER BY");
                self.require_grouped(column, "ORDER BY");
            }
            Expr::Function(call) => match AggregateFunction::from_name(call.name) {
                Some(aggregate) => self.check_aggregate(call, aggregate),
                None => {
                    self.report_at(
                        ViolationCode::DisallowedFunction,
                        format!("function '{}' is not allowed in ORDER BY", call.name),
                        call.span,
                    );
                    self.visit_columns(item.expr);
                }
            },
            other => {
                self.report(
                    ViolationCode::DisallowedOperator,
                    "ORDER BY accepts only columns, aliases and aggregates",
                );
                self.visit_columns(other);
            }
        }
    }

    fn check_limit(&mut self, select: &SelectStmt<'a>) {
        let Some(limit) = select.limit else {
            self.limit = self.config.default_limit().map(u64::from);
            return;
        };

        let Expr::Literal(Literal::Integer(digits)) = limit.expr else {
            self.report_at(
                ViolationCode::UnsupportedClause,
                "LIMIT must be an integer literal",
                limit.span,
            );
            return;
        };

        let max = u64::from(self.config.max_limit());
        // digit strings too long for u64 are over any ceiling
        let requested = digits.parse::<u64>().unwrap_or(u64::MAX);
        if requested == 0 {
            self.report_at(
                ViolationCode::UnsupportedClause,
                "LIMIT must be at least 1",
                limit.span,
            );
            return;
        }
        if requested <= max {
            self.limit = Some(requested);
            return;
        }

        match self.config.limit_policy() {
            LimitPolicy::Reject => self.report_at(
                ViolationCode::LimitExceeded,
                format!("LIMIT {} exceeds the maximum of {}", digits, max),
                limit.span,
            ),
            LimitPolicy::Clamp => {
                debug!(requested = %digits, max, "clamping LIMIT to ceiling");
                self.limit = Some(max);
            }
        }
    }
}
