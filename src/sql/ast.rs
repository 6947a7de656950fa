//! # SQL Abstract Syntax Tree
//!
//! This module defines the AST produced by the SQL parser. All nodes are
//! arena-allocated using bumpalo, with string slices borrowing directly from
//! the original input.
//!
//! ## Design Philosophy
//!
//! The AST describes a SELECT dialect that is intentionally broader than
//! the language sqlfence accepts: joins, subqueries, set operations, CASE,
//! CAST, IN, BETWEEN, LIKE and window functions all parse. The verifier then
//! walks the tree and reports each construct it does not allow, which gives
//! precise violations instead of a bare syntax error.
//!
//! ## Memory Layout
//!
//! ```text
//! SelectStmt<'a>
//!     ├── columns: &'a [SelectColumn<'a>]
//!     ├── from: Option<&'a FromClause<'a>>
//!     ├── where_clause: Option<&'a Expr<'a>>
//!     ├── group_by: &'a [&'a Expr<'a>]
//!     ├── order_by: &'a [OrderByItem<'a>]
//!     └── limit: Option<LimitClause<'a>>
//! ```
//!
//! ## Spans
//!
//! Nodes that the verifier reports on (column references, function calls,
//! table references, LIMIT) carry the byte span of their leading token.
//!
//! ## Operator Precedence
//!
//! | Binding power | Operators |
//! |---------------|-----------|
//! | 2 | OR |
//! | 4 | AND |
//! | 6 | =, !=, <, >, <=, >=, IS, LIKE, IN, BETWEEN |
//! | 8 | \|\| (concat) |
//! | 10 | +, - (binary) |
//! | 12 | *, /, % |
//! | 14 | NOT, - (unary) |

use super::token::Span;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectStmt<'a> {
    pub distinct: Distinct,
    pub columns: &'a [SelectColumn<'a>],
    pub from: Option<&'a FromClause<'a>>,
    pub where_clause: Option<&'a Expr<'a>>,
    pub group_by: &'a [&'a Expr<'a>],
    pub having: Option<&'a Expr<'a>>,
    pub order_by: &'a [OrderByItem<'a>],
    pub limit: Option<LimitClause<'a>>,
    pub offset: Option<&'a Expr<'a>>,
    pub set_op: Option<&'a SetOperation<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distinct {
    All,
    Distinct,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectColumn<'a> {
    AllColumns,
    TableAllColumns(&'a str),
    Expr {
        expr: &'a Expr<'a>,
        alias: Option<&'a str>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetOperation<'a> {
    pub op: SetOperator,
    pub all: bool,
    pub right: &'a SelectStmt<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

impl SetOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetOperator::Union => "UNION",
            SetOperator::Intersect => "INTERSECT",
            SetOperator::Except => "EXCEPT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FromClause<'a> {
    Table(TableRef<'a>),
    Join(&'a JoinClause<'a>),
    Subquery {
        query: &'a SelectStmt<'a>,
        alias: Option<&'a str>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableRef<'a> {
    pub schema: Option<&'a str>,
    pub name: &'a str,
    pub alias: Option<&'a str>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinClause<'a> {
    pub left: &'a FromClause<'a>,
    pub join_type: JoinType,
    pub right: &'a FromClause<'a>,
    pub condition: JoinCondition<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinCondition<'a> {
    On(&'a Expr<'a>),
    Using(&'a [&'a str]),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderByItem<'a> {
    pub expr: &'a Expr<'a>,
    /// Direction as written; `None` when the query leaves it implicit.
    pub direction: Option<OrderDirection>,
    pub nulls: NullsOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub const ALL: [OrderDirection; 2] = [OrderDirection::Asc, OrderDirection::Desc];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    Default,
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitClause<'a> {
    pub expr: &'a Expr<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'a> {
    Literal(Literal<'a>),
    Column(ColumnRef<'a>),
    BinaryOp {
        left: &'a Expr<'a>,
        op: BinaryOperator,
        right: &'a Expr<'a>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: &'a Expr<'a>,
    },
    Between {
        expr: &'a Expr<'a>,
        negated: bool,
        low: &'a Expr<'a>,
        high: &'a Expr<'a>,
    },
    Like {
        expr: &'a Expr<'a>,
        negated: bool,
        pattern: &'a Expr<'a>,
        case_insensitive: bool,
    },
    InList {
        expr: &'a Expr<'a>,
        negated: bool,
        list: &'a [&'a Expr<'a>],
    },
    InSubquery {
        expr: &'a Expr<'a>,
        negated: bool,
        subquery: &'a SelectStmt<'a>,
    },
    IsNull {
        expr: &'a Expr<'a>,
        negated: bool,
    },
    Function(FunctionCall<'a>),
    Case {
        operand: Option<&'a Expr<'a>>,
        conditions: &'a [WhenClause<'a>],
        else_result: Option<&'a Expr<'a>>,
    },
    Cast {
        expr: &'a Expr<'a>,
        data_type: &'a str,
    },
    Interval {
        value: &'a Expr<'a>,
        unit: &'a str,
    },
    Subquery(&'a SelectStmt<'a>),
    Exists {
        subquery: &'a SelectStmt<'a>,
        negated: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Null,
    Boolean(bool),
    Integer(&'a str),
    Float(&'a str),
    /// Raw contents between the quotes.
    String(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnRef<'a> {
    pub schema: Option<&'a str>,
    pub table: Option<&'a str>,
    pub column: &'a str,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Concat => "||",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }

    /// Left binding power used by the Pratt parser. The right binding power
    /// is one higher, making every binary operator left-associative.
    pub fn binding_power(&self) -> u8 {
        match self {
            BinaryOperator::Or => 2,
            BinaryOperator::And => 4,
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq => 6,
            BinaryOperator::Concat => 8,
            BinaryOperator::Plus | BinaryOperator::Minus => 10,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 12,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.binding_power() == 6
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
}

/// Binding power of prefix operators.
pub const PREFIX_BINDING_POWER: u8 = 14;

/// Binding power of the postfix predicates (IS, LIKE, IN, BETWEEN).
pub const PREDICATE_BINDING_POWER: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionCall<'a> {
    pub name: &'a str,
    pub args: FunctionArgs<'a>,
    pub distinct: bool,
    pub over: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FunctionArgs<'a> {
    None,
    Star,
    Args(&'a [&'a Expr<'a>]),
}

impl<'a> FunctionArgs<'a> {
    pub fn as_slice(&self) -> &'a [&'a Expr<'a>] {
        match self {
            FunctionArgs::Args(args) => *args,
            FunctionArgs::None | FunctionArgs::Star => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhenClause<'a> {
    pub condition: &'a Expr<'a>,
    pub result: &'a Expr<'a>,
}
