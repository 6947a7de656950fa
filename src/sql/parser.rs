//! # SQL Parser - Arena-Allocated AST Builder
//!
//! This module implements a recursive descent parser for SELECT statements
//! that produces an arena-allocated AST. It is a general-purpose parser: it
//! accepts joins, subqueries, set operations, CASE, CAST, IN, BETWEEN, LIKE,
//! IS NULL, window clauses and arbitrary arithmetic, all of which the
//! constrained grammar never produces. The verifier relies on this breadth
//! to report *which* construct is disallowed instead of failing to parse.
//!
//! ## Design Goals
//!
//! 1. **Arena allocation**: All AST nodes allocated in a bumpalo arena
//! 2. **Zero-copy identifiers**: String slices borrow from input
//! 3. **Positioned errors**: Failures carry the span of the offending token
//! 4. **Pratt parsing**: Operator precedence via binding powers
//!
//! ## Parser Architecture
//!
//! ```text
//! Input SQL → Lexer → Parser → SelectStmt (arena-allocated)
//! ```
//!
//! Statement-level structure uses recursive descent in clause order
//! (SELECT, FROM, WHERE, GROUP BY, HAVING, ORDER BY, LIMIT, OFFSET, set
//! operation). Expressions use Pratt parsing; binding powers are defined on
//! [`BinaryOperator`] so the normalizer can parenthesize with the same table.
//!
//! ## Keywords as Identifiers
//!
//! A handful of non-structural keywords (`FIRST`, `LAST`, `LEFT`, `RIGHT`,
//! `NULLS`, `FORMAT`, `SETTINGS`, `PARTITION`) may be used as column or
//! function names. The identifier keeps its source spelling.
//!
//! ## Usage Example
//!
//! ```ignore
//! use sqlfence::sql::Parser;
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let mut parser = Parser::new("SELECT count() FROM trips", &arena);
//! let select = parser.parse_statement()?;
//! assert!(parser.is_at_end());
//! ```

use super::ast::*;
use super::lexer::Lexer;
use super::token::{Keyword, Span, Token};
use crate::config::MAX_EXPR_DEPTH;
use bumpalo::Bump;
use eyre::{bail, Result};

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<'a>(sql: &'a str, arena: &'a Bump) -> &'a SelectStmt<'a> {
        let mut parser = Parser::new(sql, arena);
        let select = parser.parse_statement().unwrap();
        assert!(parser.is_at_end(), "trailing input after {sql}");
        select
    }

    #[test]
    fn parser_peek_returns_current_token() {
        let arena = Bump::new();
        let parser = Parser::new("SELECT FROM", &arena);
        assert!(matches!(parser.peek(), Token::Keyword(Keyword::Select)));
        assert!(matches!(parser.peek(), Token::Keyword(Keyword::Select)));
    }

    #[test]
    fn parser_advance_moves_to_next_token() {
        let arena = Bump::new();
        let mut parser = Parser::new("SELECT FROM", &arena);
        parser.advance();
        assert!(matches!(parser.peek(), Token::Keyword(Keyword::From)));
    }

    #[test]
    fn parser_expect_keyword_fails_with_location() {
        let arena = Bump::new();
        let mut parser = Parser::new("SELECT FROM", &arena);
        let err = parser.expect_keyword(Keyword::From).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn parse_count_from_table() {
        let arena = Bump::new();
        let select = parse("SELECT count() FROM trips", &arena);

        assert_eq!(select.columns.len(), 1);
        if let SelectColumn::Expr { expr: Expr::Function(call), alias } = select.columns[0] {
            assert_eq!(call.name, "count");
            assert_eq!(call.args, FunctionArgs::None);
            assert_eq!(alias, None);
        } else {
            panic!("expected function call");
        }
        if let Some(FromClause::Table(table)) = select.from {
            assert_eq!(table.name, "trips");
            assert_eq!(table.span, Span::new(20, 5));
        } else {
            panic!("expected table reference");
        }
    }

    #[test]
    fn parse_count_star() {
        let arena = Bump::new();
        let select = parse("select COUNT(*) from trips", &arena);
        if let SelectColumn::Expr { expr: Expr::Function(call), .. } = select.columns[0] {
            assert_eq!(call.name, "COUNT");
            assert_eq!(call.args, FunctionArgs::Star);
        } else {
            panic!("expected function call");
        }
    }

    #[test]
    fn parse_time_window_predicate() {
        let arena = Bump::new();
        let select = parse(
            "SELECT count() FROM trips WHERE pickup_datetime >= now() - INTERVAL 24 HOUR",
            &arena,
        );

        let Some(Expr::BinaryOp { left, op, right }) = select.where_clause else {
            panic!("expected comparison");
        };
        assert_eq!(*op, BinaryOperator::GtEq);
        assert!(matches!(left, Expr::Column(c) if c.column == "pickup_datetime"));
        let Expr::BinaryOp { left: now, op: BinaryOperator::Minus, right: interval } = right else {
            panic!("expected subtraction");
        };
        assert!(matches!(now, Expr::Function(f) if f.name == "now"));
        assert!(matches!(
            interval,
            Expr::Interval { value: Expr::Literal(Literal::Integer("24")), unit: "HOUR" }
        ));
    }

    #[test]
    fn parse_and_binds_tighter_than_or() {
        let arena = Bump::new();
        let select = parse("SELECT count() FROM t WHERE a = 1 OR b = 2 AND c = 3", &arena);
        let Some(Expr::BinaryOp { op, right, .. }) = select.where_clause else {
            panic!("expected binary op");
        };
        assert_eq!(*op, BinaryOperator::Or);
        assert!(matches!(right, Expr::BinaryOp { op: BinaryOperator::And, .. }));
    }

    #[test]
    fn parse_group_order_limit() {
        let arena = Bump::new();
        let select = parse(
            "SELECT payment_type, sum(total_amount) AS total FROM trips \
             GROUP BY payment_type ORDER BY total DESC LIMIT 10",
            &arena,
        );

        assert_eq!(select.group_by.len(), 1);
        assert_eq!(select.order_by.len(), 1);
        assert_eq!(select.order_by[0].direction, Some(OrderDirection::Desc));
        assert!(matches!(
            select.limit,
            Some(LimitClause { expr: Expr::Literal(Literal::Integer("10")), .. })
        ));
        if let SelectColumn::Expr { alias, .. } = select.columns[1] {
            assert_eq!(alias, Some("total"));
        }
    }

    #[test]
    fn parse_order_direction_is_recorded_as_written() {
        let arena = Bump::new();
        let select = parse("SELECT count() FROM t ORDER BY a, b ASC", &arena);
        assert_eq!(select.order_by[0].direction, None);
        assert_eq!(select.order_by[1].direction, Some(OrderDirection::Asc));
    }

    #[test]
    fn parse_limit_comma_form_splits_offset() {
        let arena = Bump::new();
        let select = parse("SELECT count() FROM t LIMIT 5, 10", &arena);
        assert!(matches!(select.offset, Some(Expr::Literal(Literal::Integer("5")))));
        assert!(matches!(
            select.limit,
            Some(LimitClause { expr: Expr::Literal(Literal::Integer("10")), .. })
        ));
    }

    #[test]
    fn parse_table_alias_and_qualified_column() {
        let arena = Bump::new();
        let select = parse("SELECT sum(t.fare) FROM trips t", &arena);
        if let Some(FromClause::Table(table)) = select.from {
            assert_eq!(table.alias, Some("t"));
        } else {
            panic!("expected table");
        }
        if let SelectColumn::Expr { expr: Expr::Function(call), .. } = select.columns[0] {
            let args = call.args.as_slice();
            assert!(matches!(args[0], Expr::Column(c) if c.table == Some("t") && c.column == "fare"));
        } else {
            panic!("expected function");
        }
    }

    #[test]
    fn parse_join() {
        let arena = Bump::new();
        let select = parse("SELECT count() FROM a JOIN b ON a.id = b.id", &arena);
        assert!(matches!(select.from, Some(FromClause::Join(j)) if j.join_type == JoinType::Inner));
    }

    #[test]
    fn parse_subquery_in_from() {
        let arena = Bump::new();
        let select = parse("SELECT count() FROM (SELECT count() FROM trips) AS sub", &arena);
        assert!(matches!(select.from, Some(FromClause::Subquery { alias: Some("sub"), .. })));
    }

    #[test]
    fn parse_in_list_and_not_in() {
        let arena = Bump::new();
        let select = parse("SELECT count() FROM t WHERE a NOT IN (1, 2)", &arena);
        assert!(matches!(
            select.where_clause,
            Some(Expr::InList { negated: true, list, .. }) if list.len() == 2
        ));
    }

    #[test]
    fn parse_between_like_is_null() {
        let arena = Bump::new();
        let select = parse(
            "SELECT count() FROM t WHERE a BETWEEN 1 AND 5 AND b LIKE 'x%' AND c IS NOT NULL",
            &arena,
        );
        assert!(select.where_clause.is_some());
    }

    #[test]
    fn parse_union() {
        let arena = Bump::new();
        let select = parse("SELECT count() FROM a UNION ALL SELECT count() FROM b", &arena);
        let set_op = select.set_op.unwrap();
        assert_eq!(set_op.op, SetOperator::Union);
        assert!(set_op.all);
    }

    #[test]
    fn parse_case_and_cast() {
        let arena = Bump::new();
        let select = parse(
            "SELECT CASE WHEN a > 1 THEN 'big' ELSE 'small' END, CAST(b AS Float64) FROM t",
            &arena,
        );
        assert!(matches!(select.columns[0], SelectColumn::Expr { expr: Expr::Case { .. }, .. }));
        assert!(matches!(
            select.columns[1],
            SelectColumn::Expr { expr: Expr::Cast { data_type: "Float64", .. }, .. }
        ));
    }

    #[test]
    fn parse_window_function() {
        let arena = Bump::new();
        let select = parse("SELECT sum(a) OVER (PARTITION BY b ORDER BY c) FROM t", &arena);
        assert!(matches!(
            select.columns[0],
            SelectColumn::Expr { expr: Expr::Function(FunctionCall { over: true, .. }), .. }
        ));
    }

    #[test]
    fn parse_select_star_and_table_star() {
        let arena = Bump::new();
        let select = parse("SELECT *, t.* FROM trips t", &arena);
        assert_eq!(select.columns[0], SelectColumn::AllColumns);
        assert_eq!(select.columns[1], SelectColumn::TableAllColumns("t"));
    }

    #[test]
    fn parse_quoted_identifier() {
        let arena = Bump::new();
        let select = parse("SELECT sum(\"fare_amount\") FROM `trips`", &arena);
        if let Some(FromClause::Table(table)) = select.from {
            assert_eq!(table.name, "trips");
        }
    }

    #[test]
    fn parse_keyword_as_identifier_keeps_source_spelling() {
        let arena = Bump::new();
        let select = parse("SELECT count() FROM t WHERE last = 1", &arena);
        assert!(matches!(
            select.where_clause,
            Some(Expr::BinaryOp { left: Expr::Column(c), .. }) if c.column == "last"
        ));
    }

    #[test]
    fn column_span_points_at_identifier() {
        let arena = Bump::new();
        let select = parse("SELECT count() FROM trips WHERE bogus_col = 1", &arena);
        let Some(Expr::BinaryOp { left: Expr::Column(c), .. }) = select.where_clause else {
            panic!("expected column");
        };
        assert_eq!(c.span, Span::new(32, 9));
    }

    #[test]
    fn structural_keyword_in_expression_is_error() {
        let arena = Bump::new();
        let mut parser = Parser::new("SELECT FROM trips", &arena);
        assert!(parser.parse_statement().is_err());
    }

    #[test]
    fn missing_closing_paren_is_error_with_span() {
        let arena = Bump::new();
        let mut parser = Parser::new("SELECT count( FROM trips", &arena);
        let err = parser.parse_statement().unwrap_err();
        let error = parser.error_from_report(err);
        assert_eq!(error.span, Span::new(14, 4));
        assert_eq!(error.line, 1);
    }

    #[test]
    fn lexer_error_surfaces_as_parse_error() {
        let arena = Bump::new();
        let mut parser = Parser::new("SELECT count() FROM trips WHERE a = 'oops", &arena);
        let err = parser.parse_statement().unwrap_err();
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn semicolon_terminates_statement() {
        let arena = Bump::new();
        let mut parser = Parser::new("SELECT count() FROM trips; DROP TABLE trips", &arena);
        parser.parse_statement().unwrap();
        assert!(parser.consume_token(&Token::Semicolon));
        assert!(matches!(parser.peek(), Token::Keyword(Keyword::Drop)));
    }

    fn nesting_error(sql: &str) -> String {
        let arena = Bump::new();
        let mut parser = Parser::new(sql, &arena);
        parser.parse_statement().unwrap_err().to_string()
    }

    #[test]
    fn deeply_nested_expressions_are_errors() {
        let parens = format!(
            "SELECT count() FROM trips WHERE {}1{} = 1",
            "(".repeat(10_000),
            ")".repeat(10_000)
        );
        let minus = format!("SELECT count() FROM trips WHERE a > {}1", "-".repeat(10_000));
        let chain = format!("SELECT count() FROM trips WHERE a = 1{}", " + 1".repeat(10_000));
        for sql in [parens, minus, chain] {
            assert!(nesting_error(&sql).contains("nested deeper than"));
        }
    }

    #[test]
    fn deeply_nested_subqueries_and_joins_are_errors() {
        let subqueries = format!(
            "SELECT count() FROM {}trips{}",
            "(SELECT a FROM ".repeat(5_000),
            ")".repeat(5_000)
        );
        let joins = format!("SELECT count() FROM trips{}", ", trips".repeat(10_000));
        let unions = format!("SELECT 1{}", " UNION ALL SELECT 1".repeat(10_000));
        for sql in [subqueries, joins, unions] {
            assert!(nesting_error(&sql).contains("nested deeper than"));
        }
    }

    #[test]
    fn moderate_nesting_still_parses() {
        let arena = Bump::new();
        let sql = format!(
            "SELECT count() FROM trips WHERE {}a{} = 1{}",
            "(".repeat(40),
            ")".repeat(40),
            " AND b = 2".repeat(40)
        );
        let select = parse(&sql, &arena);
        assert!(select.where_clause.is_some());
    }
}

#[derive(Debug, Clone)]
pub struct ParseError<'a> {
    pub message: &'a str,
    pub span: Span,
    pub line: u32,
    pub column: u32,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    arena: &'a Bump,
    current: Token<'a>,
    current_span: Span,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, arena: &'a Bump) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        let current_span = lexer.span();
        Self {
            lexer,
            arena,
            current,
            current_span,
            depth: 0,
        }
    }

    pub fn is_at_end(&self) -> bool {
        matches!(self.current, Token::Eof)
    }

    pub fn peek(&self) -> &Token<'a> {
        &self.current
    }

    pub fn current_span(&self) -> Span {
        self.current_span
    }

    pub fn advance(&mut self) -> Token<'a> {
        let next = self.lexer.next_token();
        self.current_span = self.lexer.span();
        std::mem::replace(&mut self.current, next)
    }

    pub fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current, Token::Keyword(k) if *k == keyword)
    }

    pub fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            bail!(
                "expected keyword {}, found {} at line {} column {}",
                keyword,
                self.current,
                self.lexer.line(),
                self.lexer.column()
            )
        }
    }

    pub fn check_token(&self, expected: &Token<'_>) -> bool {
        std::mem::discriminant(&self.current) == std::mem::discriminant(expected)
    }

    pub fn consume_token(&mut self, expected: &Token<'_>) -> bool {
        if self.check_token(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_token(&mut self, expected: &Token<'_>) -> Result<()> {
        if self.check_token(expected) {
            self.advance();
            Ok(())
        } else {
            bail!(
                "expected {}, found {} at line {} column {}",
                expected,
                self.current,
                self.lexer.line(),
                self.lexer.column()
            )
        }
    }

    /// Enters one level of tree nesting. Callers give the levels back once
    /// their subtree is built; a failed parse is abandoned with its count.
    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_EXPR_DEPTH {
            bail!(
                "expression nested deeper than {} levels at line {} column {}",
                MAX_EXPR_DEPTH,
                self.lexer.line(),
                self.lexer.column()
            );
        }
        Ok(())
    }

    /// Positions a parse failure at the token the parser stopped on.
    pub fn error_from_report(&self, err: eyre::Report) -> ParseError<'a> {
        ParseError {
            message: self.arena.alloc_str(&err.to_string()),
            span: self.current_span,
            line: self.lexer.line(),
            column: self.lexer.column(),
        }
    }

    /// Parses one SELECT statement. Stops before a terminating `;` so the
    /// caller can decide what trailing input means.
    pub fn parse_statement(&mut self) -> Result<&'a SelectStmt<'a>> {
        let select = self.parse_select()?;
        Ok(self.arena.alloc(select))
    }

    fn parse_select(&mut self) -> Result<SelectStmt<'a>> {
        self.descend()?;
        let select = self.parse_select_body()?;
        self.depth -= 1;
        Ok(select)
    }

    fn parse_select_body(&mut self) -> Result<SelectStmt<'a>> {
        self.expect_keyword(Keyword::Select)?;

        let distinct = if self.consume_keyword(Keyword::Distinct) {
            Distinct::Distinct
        } else {
            self.consume_keyword(Keyword::All);
            Distinct::All
        };

        let columns = self.parse_select_columns()?;

        let from = if self.consume_keyword(Keyword::From) {
            Some(self.parse_from_clause()?)
        } else {
            None
        };

        let where_clause: Option<&Expr<'a>> = if self.consume_keyword(Keyword::Where) {
            Some(self.arena.alloc(self.parse_expr(0)?))
        } else {
            None
        };

        let group_by = if self.consume_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            self.parse_expr_list()?
        } else {
            &[]
        };

        let having: Option<&Expr<'a>> = if self.consume_keyword(Keyword::Having) {
            Some(self.arena.alloc(self.parse_expr(0)?))
        } else {
            None
        };

        let order_by = if self.consume_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            self.parse_order_by_list()?
        } else {
            &[]
        };

        let mut offset: Option<&Expr<'a>> = None;
        let limit = if self.consume_keyword(Keyword::Limit) {
            let span = self.current_span;
            let first: &Expr<'a> = self.arena.alloc(self.parse_expr(0)?);
            if self.consume_token(&Token::Comma) {
                // LIMIT offset, count
                let span = self.current_span;
                let count: &Expr<'a> = self.arena.alloc(self.parse_expr(0)?);
                offset = Some(first);
                Some(LimitClause { expr: count, span })
            } else {
                Some(LimitClause { expr: first, span })
            }
        } else {
            None
        };

        if self.consume_keyword(Keyword::Offset) {
            offset = Some(self.arena.alloc(self.parse_expr(0)?));
        }

        let set_op = self.parse_set_operation()?;

        Ok(SelectStmt {
            distinct,
            columns,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
            offset,
            set_op,
        })
    }

    fn parse_select_columns(&mut self) -> Result<&'a [SelectColumn<'a>]> {
        let mut columns = Vec::new();
        loop {
            if self.consume_token(&Token::Star) {
                columns.push(SelectColumn::AllColumns);
            } else {
                let expr = self.parse_expr(0)?;

                match expr {
                    Expr::Column(col) if self.check_token(&Token::Dot) => {
                        self.advance();
                        self.expect_token(&Token::Star)?;
                        columns.push(SelectColumn::TableAllColumns(col.column));
                    }
                    _ => {
                        let alias = self.parse_optional_alias()?;
                        columns.push(SelectColumn::Expr {
                            expr: self.arena.alloc(expr),
                            alias,
                        });
                    }
                }
            }

            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&columns))
    }

    fn parse_optional_alias(&mut self) -> Result<Option<&'a str>> {
        if self.consume_keyword(Keyword::As) {
            return Ok(Some(self.expect_ident()?));
        }
        match *self.peek() {
            Token::Ident(name) | Token::QuotedIdent(name) => {
                self.advance();
                Ok(Some(name))
            }
            _ => Ok(None),
        }
    }

    fn parse_from_clause(&mut self) -> Result<&'a FromClause<'a>> {
        let mut left = self.parse_table_ref()?;
        let mut joins = 0;

        while let Some(join_type) = self.parse_join_type() {
            self.descend()?;
            joins += 1;
            let right = self.parse_table_ref()?;
            let condition = self.parse_join_condition()?;

            let join = self.arena.alloc(JoinClause {
                left,
                join_type,
                right,
                condition,
            });
            left = self.arena.alloc(FromClause::Join(join));
        }

        // comma join
        while self.consume_token(&Token::Comma) {
            self.descend()?;
            joins += 1;
            let right = self.parse_table_ref()?;
            let join = self.arena.alloc(JoinClause {
                left,
                join_type: JoinType::Cross,
                right,
                condition: JoinCondition::None,
            });
            left = self.arena.alloc(FromClause::Join(join));
        }

        self.depth -= joins;
        Ok(left)
    }

    fn parse_table_ref(&mut self) -> Result<&'a FromClause<'a>> {
        if self.consume_token(&Token::LParen) {
            self.descend()?;
            let from = self.parse_parenthesized_table_ref()?;
            self.depth -= 1;
            return Ok(from);
        }

        let span = self.current_span;
        let name = self.expect_ident()?;
        let (schema, table_name, span) = if self.consume_token(&Token::Dot) {
            let span = self.current_span;
            let table_name = self.expect_ident()?;
            (Some(name), table_name, span)
        } else {
            (None, name, span)
        };

        let alias = self.parse_optional_alias()?;

        Ok(self.arena.alloc(FromClause::Table(TableRef {
            schema,
            name: table_name,
            alias,
            span,
        })))
    }

    /// Continues after the `(` of a derived table or a grouped join.
    fn parse_parenthesized_table_ref(&mut self) -> Result<&'a FromClause<'a>> {
        if self.check_keyword(Keyword::Select) {
            let query = self.parse_select()?;
            self.expect_token(&Token::RParen)?;
            let alias = self.parse_optional_alias()?;
            return Ok(self.arena.alloc(FromClause::Subquery {
                query: self.arena.alloc(query),
                alias,
            }));
        }
        let from = self.parse_from_clause()?;
        self.expect_token(&Token::RParen)?;
        Ok(from)
    }

    fn parse_join_type(&mut self) -> Option<JoinType> {
        if self.consume_keyword(Keyword::Inner) {
            self.consume_keyword(Keyword::Join);
            Some(JoinType::Inner)
        } else if self.consume_keyword(Keyword::Left) {
            self.consume_keyword(Keyword::Outer);
            self.consume_keyword(Keyword::Join);
            Some(JoinType::Left)
        } else if self.consume_keyword(Keyword::Right) {
            self.consume_keyword(Keyword::Outer);
            self.consume_keyword(Keyword::Join);
            Some(JoinType::Right)
        } else if self.consume_keyword(Keyword::Full) {
            self.consume_keyword(Keyword::Outer);
            self.consume_keyword(Keyword::Join);
            Some(JoinType::Full)
        } else if self.consume_keyword(Keyword::Cross) {
            self.consume_keyword(Keyword::Join);
            Some(JoinType::Cross)
        } else if self.consume_keyword(Keyword::Join) {
            Some(JoinType::Inner)
        } else {
            None
        }
    }

    fn parse_join_condition(&mut self) -> Result<JoinCondition<'a>> {
        if self.consume_keyword(Keyword::On) {
            let expr = self.parse_expr(0)?;
            Ok(JoinCondition::On(self.arena.alloc(expr)))
        } else if self.consume_keyword(Keyword::Using) {
            self.expect_token(&Token::LParen)?;
            let columns = self.parse_ident_list()?;
            self.expect_token(&Token::RParen)?;
            Ok(JoinCondition::Using(columns))
        } else {
            Ok(JoinCondition::None)
        }
    }

    fn parse_order_by_list(&mut self) -> Result<&'a [OrderByItem<'a>]> {
        let mut items = Vec::new();
        loop {
            let expr = self.parse_expr(0)?;
            let direction = if self.consume_keyword(Keyword::Desc) {
                Some(OrderDirection::Desc)
            } else if self.consume_keyword(Keyword::Asc) {
                Some(OrderDirection::Asc)
            } else {
                None
            };
            let nulls = if self.consume_keyword(Keyword::Nulls) {
                if self.consume_keyword(Keyword::First) {
                    NullsOrder::First
                } else {
                    self.expect_keyword(Keyword::Last)?;
                    NullsOrder::Last
                }
            } else {
                NullsOrder::Default
            };
            items.push(OrderByItem {
                expr: self.arena.alloc(expr),
                direction,
                nulls,
            });
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&items))
    }

    fn parse_set_operation(&mut self) -> Result<Option<&'a SetOperation<'a>>> {
        let op = if self.consume_keyword(Keyword::Union) {
            SetOperator::Union
        } else if self.consume_keyword(Keyword::Intersect) {
            SetOperator::Intersect
        } else if self.consume_keyword(Keyword::Except) {
            SetOperator::Except
        } else {
            return Ok(None);
        };

        let all = self.consume_keyword(Keyword::All);
        self.consume_keyword(Keyword::Distinct);

        let right = self.parse_select()?;
        Ok(Some(self.arena.alloc(SetOperation {
            op,
            all,
            right: self.arena.alloc(right),
        })))
    }

    /// Each operator folded into `lhs` deepens the tree by one level, so a
    /// long left-leaning chain counts against the same nesting limit as
    /// parentheses do.
    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr<'a>> {
        self.descend()?;
        let mut levels = 1;
        let mut lhs = self.parse_prefix()?;

        loop {
            let op = match self.peek() {
                Token::Plus => Some(BinaryOperator::Plus),
                Token::Minus => Some(BinaryOperator::Minus),
                Token::Star => Some(BinaryOperator::Multiply),
                Token::Slash => Some(BinaryOperator::Divide),
                Token::Percent => Some(BinaryOperator::Modulo),
                Token::DoublePipe => Some(BinaryOperator::Concat),
                Token::Eq => Some(BinaryOperator::Eq),
                Token::NotEq => Some(BinaryOperator::NotEq),
                Token::Lt => Some(BinaryOperator::Lt),
                Token::LtEq => Some(BinaryOperator::LtEq),
                Token::Gt => Some(BinaryOperator::Gt),
                Token::GtEq => Some(BinaryOperator::GtEq),
                Token::Keyword(Keyword::And) => Some(BinaryOperator::And),
                Token::Keyword(Keyword::Or) => Some(BinaryOperator::Or),
                _ => None,
            };

            if let Some(op) = op {
                let l_bp = op.binding_power();
                if l_bp < min_bp {
                    break;
                }
                self.advance();
                self.descend()?;
                levels += 1;
                let rhs = self.parse_expr(l_bp + 1)?;
                lhs = Expr::BinaryOp {
                    left: self.arena.alloc(lhs),
                    op,
                    right: self.arena.alloc(rhs),
                };
                continue;
            }

            if self.check_keyword(Keyword::Is) {
                if PREDICATE_BINDING_POWER < min_bp {
                    break;
                }
                self.advance();
                self.descend()?;
                levels += 1;
                let negated = self.consume_keyword(Keyword::Not);
                self.expect_keyword(Keyword::Null)?;
                lhs = Expr::IsNull {
                    expr: self.arena.alloc(lhs),
                    negated,
                };
                continue;
            }

            if !self.at_postfix_predicate() || PREDICATE_BINDING_POWER < min_bp {
                break;
            }
            self.descend()?;
            levels += 1;

            let negated = self.consume_keyword(Keyword::Not);

            if self.consume_keyword(Keyword::Between) {
                let low = self.parse_expr(PREDICATE_BINDING_POWER + 1)?;
                self.expect_keyword(Keyword::And)?;
                let high = self.parse_expr(PREDICATE_BINDING_POWER + 1)?;
                lhs = Expr::Between {
                    expr: self.arena.alloc(lhs),
                    negated,
                    low: self.arena.alloc(low),
                    high: self.arena.alloc(high),
                };
                continue;
            }

            if self.consume_keyword(Keyword::In) {
                self.expect_token(&Token::LParen)?;
                if self.check_keyword(Keyword::Select) {
                    let subquery = self.parse_select()?;
                    self.expect_token(&Token::RParen)?;
                    lhs = Expr::InSubquery {
                        expr: self.arena.alloc(lhs),
                        negated,
                        subquery: self.arena.alloc(subquery),
                    };
                } else {
                    let list = self.parse_expr_list()?;
                    self.expect_token(&Token::RParen)?;
                    lhs = Expr::InList {
                        expr: self.arena.alloc(lhs),
                        negated,
                        list,
                    };
                }
                continue;
            }

            if self.check_keyword(Keyword::Like) || self.check_keyword(Keyword::Ilike) {
                let case_insensitive = self.check_keyword(Keyword::Ilike);
                self.advance();
                let pattern = self.parse_expr(PREDICATE_BINDING_POWER + 1)?;
                lhs = Expr::Like {
                    expr: self.arena.alloc(lhs),
                    negated,
                    pattern: self.arena.alloc(pattern),
                    case_insensitive,
                };
                continue;
            }

            bail!(
                "unexpected NOT without IN, BETWEEN, or LIKE at line {} column {}",
                self.lexer.line(),
                self.lexer.column()
            );
        }

        self.depth -= levels;
        Ok(lhs)
    }

    fn at_postfix_predicate(&self) -> bool {
        self.check_keyword(Keyword::Not)
            || self.check_keyword(Keyword::Between)
            || self.check_keyword(Keyword::In)
            || self.check_keyword(Keyword::Like)
            || self.check_keyword(Keyword::Ilike)
    }

    fn parse_prefix(&mut self) -> Result<Expr<'a>> {
        let span = self.current_span;
        match self.peek().clone() {
            Token::Keyword(Keyword::Not) => {
                self.advance();
                if self.consume_keyword(Keyword::Exists) {
                    self.expect_token(&Token::LParen)?;
                    let subquery = self.parse_select()?;
                    self.expect_token(&Token::RParen)?;
                    Ok(Expr::Exists {
                        subquery: self.arena.alloc(subquery),
                        negated: true,
                    })
                } else {
                    let expr = self.parse_expr(PREFIX_BINDING_POWER)?;
                    Ok(Expr::UnaryOp {
                        op: UnaryOperator::Not,
                        expr: self.arena.alloc(expr),
                    })
                }
            }
            Token::Minus => {
                self.advance();
                let expr = self.parse_expr(PREFIX_BINDING_POWER)?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Minus,
                    expr: self.arena.alloc(expr),
                })
            }
            Token::Plus => {
                self.advance();
                let expr = self.parse_expr(PREFIX_BINDING_POWER)?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Plus,
                    expr: self.arena.alloc(expr),
                })
            }
            Token::Integer(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Integer(s)))
            }
            Token::Float(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(s)))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            Token::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            Token::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            Token::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            Token::Keyword(Keyword::Interval) => {
                self.advance();
                let value = self.parse_expr(PREFIX_BINDING_POWER)?;
                let unit = self.expect_ident()?;
                Ok(Expr::Interval {
                    value: self.arena.alloc(value),
                    unit,
                })
            }
            Token::LParen => {
                self.advance();
                if self.check_keyword(Keyword::Select) {
                    let subquery = self.parse_select()?;
                    self.expect_token(&Token::RParen)?;
                    Ok(Expr::Subquery(self.arena.alloc(subquery)))
                } else {
                    let expr = self.parse_expr(0)?;
                    self.expect_token(&Token::RParen)?;
                    Ok(expr)
                }
            }
            Token::Keyword(Keyword::Case) => self.parse_case(),
            Token::Keyword(Keyword::Cast) => self.parse_cast(),
            Token::Keyword(Keyword::Exists) => {
                self.advance();
                self.expect_token(&Token::LParen)?;
                let subquery = self.parse_select()?;
                self.expect_token(&Token::RParen)?;
                Ok(Expr::Exists {
                    subquery: self.arena.alloc(subquery),
                    negated: false,
                })
            }
            Token::Ident(name) | Token::QuotedIdent(name) => {
                self.advance();
                self.parse_name_reference(name, span)
            }
            Token::Keyword(kw) if keyword_as_identifier(kw) => {
                let name = self.lexer.text(span);
                self.advance();
                self.parse_name_reference(name, span)
            }
            Token::Error(message) => bail!(
                "{} at line {} column {}",
                message,
                self.lexer.line(),
                self.lexer.column()
            ),
            other => bail!(
                "unexpected {} in expression at line {} column {}",
                other,
                self.lexer.line(),
                self.lexer.column()
            ),
        }
    }

    /// Continues after an identifier: function call, qualified column or
    /// bare column.
    fn parse_name_reference(&mut self, name: &'a str, span: Span) -> Result<Expr<'a>> {
        if self.check_token(&Token::LParen) {
            return self.parse_function_call(name, span);
        }

        if !self.check_token(&Token::Dot) || self.lexer.peek() == Token::Star {
            return Ok(Expr::Column(ColumnRef {
                schema: None,
                table: None,
                column: name,
                span,
            }));
        }

        self.advance();
        let col_span = self.current_span;
        let col = self.expect_ident()?;
        if self.check_token(&Token::Dot) && self.lexer.peek() != Token::Star {
            self.advance();
            let col2_span = self.current_span;
            let col2 = self.expect_ident()?;
            Ok(Expr::Column(ColumnRef {
                schema: Some(name),
                table: Some(col),
                column: col2,
                span: col2_span,
            }))
        } else {
            Ok(Expr::Column(ColumnRef {
                schema: None,
                table: Some(name),
                column: col,
                span: col_span,
            }))
        }
    }

    fn parse_case(&mut self) -> Result<Expr<'a>> {
        self.expect_keyword(Keyword::Case)?;

        let operand: Option<&Expr<'a>> = if !self.check_keyword(Keyword::When) {
            Some(self.arena.alloc(self.parse_expr(0)?))
        } else {
            None
        };

        let mut conditions = Vec::new();
        while self.consume_keyword(Keyword::When) {
            let condition = self.parse_expr(0)?;
            self.expect_keyword(Keyword::Then)?;
            let result = self.parse_expr(0)?;
            conditions.push(WhenClause {
                condition: self.arena.alloc(condition),
                result: self.arena.alloc(result),
            });
        }

        let else_result: Option<&Expr<'a>> = if self.consume_keyword(Keyword::Else) {
            Some(self.arena.alloc(self.parse_expr(0)?))
        } else {
            None
        };

        self.expect_keyword(Keyword::End)?;

        Ok(Expr::Case {
            operand,
            conditions: self.arena.alloc_slice_copy(&conditions),
            else_result,
        })
    }

    fn parse_cast(&mut self) -> Result<Expr<'a>> {
        self.expect_keyword(Keyword::Cast)?;
        self.expect_token(&Token::LParen)?;
        let expr = self.parse_expr(0)?;
        self.expect_keyword(Keyword::As)?;
        let data_type = self.expect_ident()?;
        if self.check_token(&Token::LParen) {
            self.skip_parenthesized()?;
        }
        self.expect_token(&Token::RParen)?;
        Ok(Expr::Cast {
            expr: self.arena.alloc(expr),
            data_type,
        })
    }

    fn parse_function_call(&mut self, name: &'a str, span: Span) -> Result<Expr<'a>> {
        self.expect_token(&Token::LParen)?;

        let distinct = self.consume_keyword(Keyword::Distinct);

        let args = if self.consume_token(&Token::Star) {
            FunctionArgs::Star
        } else if self.check_token(&Token::RParen) {
            FunctionArgs::None
        } else {
            FunctionArgs::Args(self.parse_expr_list()?)
        };

        self.expect_token(&Token::RParen)?;

        let over = if self.consume_keyword(Keyword::Over) {
            if self.check_token(&Token::LParen) {
                self.skip_parenthesized()?;
            } else {
                self.expect_ident()?;
            }
            true
        } else {
            false
        };

        Ok(Expr::Function(FunctionCall {
            name,
            args,
            distinct,
            over,
            span,
        }))
    }

    /// Consumes a balanced parenthesized token group without building nodes.
    fn skip_parenthesized(&mut self) -> Result<()> {
        self.expect_token(&Token::LParen)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.advance() {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Eof => bail!("unbalanced parentheses"),
                Token::Error(message) => bail!("{}", message),
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_expr_list(&mut self) -> Result<&'a [&'a Expr<'a>]> {
        let mut exprs: Vec<&Expr<'a>> = Vec::new();
        loop {
            exprs.push(self.arena.alloc(self.parse_expr(0)?));
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&exprs))
    }

    fn parse_ident_list(&mut self) -> Result<&'a [&'a str]> {
        let mut idents = Vec::new();
        loop {
            idents.push(self.expect_ident()?);
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&idents))
    }

    fn expect_ident(&mut self) -> Result<&'a str> {
        let span = self.current_span;
        match self.advance() {
            Token::Ident(s) => Ok(s),
            Token::QuotedIdent(s) => Ok(s),
            Token::Keyword(kw) if keyword_as_identifier(kw) => Ok(self.lexer.text(span)),
            other => bail!(
                "expected identifier, found {} at line {} column {}",
                other,
                self.lexer.line(),
                self.lexer.column()
            ),
        }
    }
}

fn keyword_as_identifier(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::First
            | Keyword::Last
            | Keyword::Left
            | Keyword::Right
            | Keyword::Nulls
            | Keyword::Format
            | Keyword::Settings
            | Keyword::Partition
    )
}
