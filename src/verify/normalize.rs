//! Canonical SQL rendering.
//!
//! Two queries that differ only in keyword case, whitespace, comments,
//! redundant parentheses, `count(*)` versus `count()`, function name case,
//! or column qualification render to the same string. Rendering the output
//! of a render is a fixed point.
//!
//! ```text
//! select COUNT(*) from trips t where t.pickup_datetime >= NOW() - interval 24 hour
//!   → SELECT count() FROM trips WHERE pickup_datetime >= now() - INTERVAL 24 HOUR
//! ```
//!
//! The printer covers the whole parsed dialect so it can also be used on
//! statements the verifier rejects, for logging and fuzzing.

use crate::language::{AggregateFunction, ScalarFunction};
use crate::sql::{
    is_keyword, unescape, Distinct, Expr, FromClause, FunctionArgs, FunctionCall, JoinCondition, JoinType,
    Literal, NullsOrder, SelectColumn, SelectStmt, UnaryOperator, PREDICATE_BINDING_POWER,
};

/// Precedence of atoms: literals, columns, calls, parenthesized forms.
const ATOM: u8 = u8::MAX;

/// Renders a statement in canonical form, keeping its own LIMIT.
pub fn normalize(select: &SelectStmt<'_>) -> String {
    let mut out = String::with_capacity(128);
    write_select(&mut out, select, None);
    out
}

/// Renders a statement in canonical form with `limit` in place of the
/// statement's LIMIT clause. `None` drops the clause.
pub(super) fn normalize_with_limit(select: &SelectStmt<'_>, limit: Option<u64>) -> String {
    let mut out = String::with_capacity(128);
    write_select(&mut out, select, Some(limit));
    out
}

/// `limit_override` is `Some` only for the outermost statement.
fn write_select(out: &mut String, select: &SelectStmt<'_>, limit_override: Option<Option<u64>>) {
    out.push_str("SELECT ");
    if select.distinct == Distinct::Distinct {
        out.push_str("DISTINCT ");
    }

    for (i, column) in select.columns.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match column {
            SelectColumn::AllColumns => out.push('*'),
            SelectColumn::TableAllColumns(table) => {
                write_ident(out, table);
                out.push_str(".*");
            }
            SelectColumn::Expr { expr, alias } => {
                write_expr(out, expr);
                if let Some(alias) = alias {
                    out.push_str(" AS ");
                    write_ident(out, alias);
                }
            }
        }
    }

    if let Some(from) = select.from {
        out.push_str(" FROM ");
        write_from(out, from);
    }

    if let Some(predicate) = select.where_clause {
        out.push_str(" WHERE ");
        write_expr(out, predicate);
    }

    if !select.group_by.is_empty() {
        out.push_str(" GROUP BY ");
        write_expr_list(out, select.group_by);
    }

    if let Some(having) = select.having {
        out.push_str(" HAVING ");
        write_expr(out, having);
    }

    for (i, item) in select.order_by.iter().enumerate() {
        out.push_str(if i == 0 { " ORDER BY " } else { ", " });
        write_expr(out, item.expr);
        if let Some(direction) = item.direction {
            out.push(' ');
            out.push_str(direction.as_str());
        }
        match item.nulls {
            NullsOrder::Default => {}
            NullsOrder::First => out.push_str(" NULLS FIRST"),
            NullsOrder::Last => out.push_str(" NULLS LAST"),
        }
    }

    match limit_override {
        Some(Some(limit)) => {
            out.push_str(" LIMIT ");
            out.push_str(&limit.to_string());
        }
        Some(None) => {}
        None => {
            if let Some(limit) = select.limit {
                out.push_str(" LIMIT ");
                write_expr(out, limit.expr);
            }
        }
    }

    if let Some(offset) = select.offset {
        out.push_str(" OFFSET ");
        write_expr(out, offset);
    }

    if let Some(set_op) = select.set_op {
        out.push(' ');
        out.push_str(set_op.op.as_str());
        if set_op.all {
            out.push_str(" ALL");
        }
        out.push(' ');
        write_select(out, set_op.right, None);
    }
}

fn write_from(out: &mut String, from: &FromClause<'_>) {
    match from {
        FromClause::Table(table) => {
            if let Some(schema) = table.schema {
                write_ident(out, schema);
                out.push('.');
            }
            write_ident(out, table.name);
        }
        FromClause::Join(join) => {
            write_from(out, join.left);
            out.push_str(match join.join_type {
                JoinType::Inner => " JOIN ",
                JoinType::Left => " LEFT JOIN ",
                JoinType::Right => " RIGHT JOIN ",
                JoinType::Full => " FULL JOIN ",
                JoinType::Cross => " CROSS JOIN ",
            });
            write_from(out, join.right);
            match join.condition {
                JoinCondition::On(condition) => {
                    out.push_str(" ON ");
                    write_expr(out, condition);
                }
                JoinCondition::Using(columns) => {
                    out.push_str(" USING (");
                    for (i, column) in columns.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        write_ident(out, column);
                    }
                    out.push(')');
                }
                JoinCondition::None => {}
            }
        }
        FromClause::Subquery { query, alias } => {
            out.push('(');
            write_select(out, query, None);
            out.push(')');
            if let Some(alias) = alias {
                out.push_str(" AS ");
                write_ident(out, alias);
            }
        }
    }
}

fn precedence(expr: &Expr<'_>) -> u8 {
    match expr {
        Expr::BinaryOp { op, .. } => op.binding_power(),
        Expr::Between { .. } | Expr::Like { .. } | Expr::InList { .. } | Expr::InSubquery { .. } | Expr::IsNull { .. } => {
            PREDICATE_BINDING_POWER
        }
        // parenthesized wherever it is not the whole predicate
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            ..
        } => 1,
        _ => ATOM,
    }
}

fn write_operand(out: &mut String, expr: &Expr<'_>, parenthesize: bool) {
    if parenthesize {
        out.push('(');
        write_expr(out, expr);
        out.push(')');
    } else {
        write_expr(out, expr);
    }
}

fn write_expr(out: &mut String, expr: &Expr<'_>) {
    match expr {
        Expr::Literal(literal) => write_literal(out, literal),
        Expr::Column(column) => write_ident(out, column.column),
        Expr::BinaryOp { left, op, right } => {
            let power = op.binding_power();
            write_operand(out, left, precedence(left) < power);
            out.push(' ');
            out.push_str(op.as_str());
            out.push(' ');
            write_operand(out, right, precedence(right) <= power);
        }
        Expr::UnaryOp { op, expr: operand } => {
            let wrap = precedence(operand) != ATOM || matches!(operand, Expr::UnaryOp { .. });
            match op {
                UnaryOperator::Not => {
                    out.push_str("NOT ");
                    write_operand(out, operand, wrap);
                }
                UnaryOperator::Minus => {
                    out.push('-');
                    write_operand(out, operand, wrap);
                }
                UnaryOperator::Plus => {
                    out.push('+');
                    write_operand(out, operand, wrap);
                }
            }
        }
        Expr::Between {
            expr: subject,
            negated,
            low,
            high,
        } => {
            write_predicate_subject(out, subject);
            out.push_str(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
            write_operand(out, low, precedence(low) <= PREDICATE_BINDING_POWER);
            out.push_str(" AND ");
            write_operand(out, high, precedence(high) <= PREDICATE_BINDING_POWER);
        }
        Expr::Like {
            expr: subject,
            negated,
            pattern,
            case_insensitive,
        } => {
            write_predicate_subject(out, subject);
            out.push_str(match (negated, case_insensitive) {
                (false, false) => " LIKE ",
                (true, false) => " NOT LIKE ",
                (false, true) => " ILIKE ",
                (true, true) => " NOT ILIKE ",
            });
            write_operand(out, pattern, precedence(pattern) <= PREDICATE_BINDING_POWER);
        }
        Expr::InList {
            expr: subject,
            negated,
            list,
        } => {
            write_predicate_subject(out, subject);
            out.push_str(if *negated { " NOT IN (" } else { " IN (" });
            write_expr_list(out, list);
            out.push(')');
        }
        Expr::InSubquery {
            expr: subject,
            negated,
            subquery,
        } => {
            write_predicate_subject(out, subject);
            out.push_str(if *negated { " NOT IN (" } else { " IN (" });
            write_select(out, subquery, None);
            out.push(')');
        }
        Expr::IsNull {
            expr: subject,
            negated,
        } => {
            write_predicate_subject(out, subject);
            out.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
        }
        Expr::Function(call) => write_call(out, call),
        Expr::Case {
            operand,
            conditions,
            else_result,
        } => {
            out.push_str("CASE");
            if let Some(operand) = operand {
                out.push(' ');
                write_expr(out, operand);
            }
            for when in *conditions {
                out.push_str(" WHEN ");
                write_expr(out, when.condition);
                out.push_str(" THEN ");
                write_expr(out, when.result);
            }
            if let Some(else_result) = else_result {
                out.push_str(" ELSE ");
                write_expr(out, else_result);
            }
            out.push_str(" END");
        }
        Expr::Cast {
            expr: inner,
            data_type,
        } => {
            out.push_str("CAST(");
            write_expr(out, inner);
            out.push_str(" AS ");
            out.push_str(data_type);
            out.push(')');
        }
        Expr::Interval { value, unit } => {
            out.push_str("INTERVAL ");
            write_operand(out, value, precedence(value) != ATOM);
            out.push(' ');
            out.push_str(&unit.to_ascii_uppercase());
        }
        Expr::Subquery(subquery) => {
            out.push('(');
            write_select(out, subquery, None);
            out.push(')');
        }
        Expr::Exists { subquery, negated } => {
            out.push_str(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
            write_select(out, subquery, None);
            out.push(')');
        }
    }
}

fn write_predicate_subject(out: &mut String, subject: &Expr<'_>) {
    write_operand(out, subject, precedence(subject) <= PREDICATE_BINDING_POWER);
}

fn write_expr_list(out: &mut String, exprs: &[&Expr<'_>]) {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(out, expr);
    }
}

fn write_call(out: &mut String, call: &FunctionCall<'_>) {
    let aggregate = AggregateFunction::from_name(call.name);
    match (aggregate, ScalarFunction::from_name(call.name)) {
        (Some(aggregate), _) => out.push_str(aggregate.name()),
        (None, Some(scalar)) => out.push_str(scalar.name()),
        (None, None) => write_ident(out, call.name),
    }

    out.push('(');
    if call.distinct {
        out.push_str("DISTINCT ");
    }
    match call.args {
        FunctionArgs::None => {}
        FunctionArgs::Star if aggregate == Some(AggregateFunction::Count) => {}
        FunctionArgs::Star => out.push('*'),
        FunctionArgs::Args(args) => write_expr_list(out, args),
    }
    out.push(')');

    if call.over {
        out.push_str(" OVER ()");
    }
}

fn write_literal(out: &mut String, literal: &Literal<'_>) {
    match literal {
        Literal::Null => out.push_str("NULL"),
        Literal::Boolean(true) => out.push_str("true"),
        Literal::Boolean(false) => out.push_str("false"),
        Literal::Integer(digits) | Literal::Float(digits) => out.push_str(digits),
        Literal::String(raw) => write_string(out, raw),
    }
}

/// Quotes are always written doubled. Other backslash escapes are kept as
/// written so the literal's value does not change.
fn write_string(out: &mut String, raw: &str) {
    out.push('\'');
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push_str("''"),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push_str("\\\\"),
            },
            c => out.push(c),
        }
    }
    out.push('\'');
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !is_keyword(name)
}

/// Quoted names are decoded, then written double-quoted with `"` doubled
/// and `\` escaped.
fn write_ident(out: &mut String, name: &str) {
    if is_plain_identifier(name) {
        out.push_str(name);
        return;
    }
    out.push('"');
    for c in unescape(name, '"').chars() {
        match c {
            '"' => out.push_str("\"\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('"');
}
