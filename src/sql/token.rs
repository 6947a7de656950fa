//! # SQL Tokens
//!
//! Token and keyword definitions shared by the lexer, the parser and the
//! verifier's keyword scan. Tokens borrow their text from the input string.
//!
//! The keyword set is deliberately small: the clause keywords of a SELECT
//! statement, the operators the parser understands, and every statement
//! keyword on the verifier's denylist. Anything else lexes as an identifier.

use std::fmt;

/// Byte range of a token in the input: `start` offset and `len` in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> (usize, usize) {
        (self.start, self.end())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // query structure
    Select,
    From,
    Where,
    Group,
    By,
    Having,
    Order,
    Limit,
    Offset,
    As,
    Distinct,
    All,
    Asc,
    Desc,
    Nulls,
    First,
    Last,
    With,
    Format,
    Settings,
    // joins and set operations
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    Cross,
    On,
    Using,
    Union,
    Intersect,
    Except,
    // expressions
    And,
    Or,
    Not,
    In,
    Is,
    Null,
    Between,
    Like,
    Ilike,
    Exists,
    Case,
    When,
    Then,
    Else,
    End,
    Cast,
    True,
    False,
    Interval,
    Over,
    Partition,
    // statements outside the read-only subset
    Insert,
    Update,
    Delete,
    Drop,
    Create,
    Alter,
    Truncate,
    Grant,
    Revoke,
    Attach,
    Detach,
    Rename,
    Optimize,
    Kill,
    System,
    Admin,
    Set,
    Use,
    Exchange,
    Into,
    Outfile,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::Group => "GROUP",
            Keyword::By => "BY",
            Keyword::Having => "HAVING",
            Keyword::Order => "ORDER",
            Keyword::Limit => "LIMIT",
            Keyword::Offset => "OFFSET",
            Keyword::As => "AS",
            Keyword::Distinct => "DISTINCT",
            Keyword::All => "ALL",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::Nulls => "NULLS",
            Keyword::First => "FIRST",
            Keyword::Last => "LAST",
            Keyword::With => "WITH",
            Keyword::Format => "FORMAT",
            Keyword::Settings => "SETTINGS",
            Keyword::Join => "JOIN",
            Keyword::Inner => "INNER",
            Keyword::Left => "LEFT",
            Keyword::Right => "RIGHT",
            Keyword::Full => "FULL",
            Keyword::Outer => "OUTER",
            Keyword::Cross => "CROSS",
            Keyword::On => "ON",
            Keyword::Using => "USING",
            Keyword::Union => "UNION",
            Keyword::Intersect => "INTERSECT",
            Keyword::Except => "EXCEPT",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::In => "IN",
            Keyword::Is => "IS",
            Keyword::Null => "NULL",
            Keyword::Between => "BETWEEN",
            Keyword::Like => "LIKE",
            Keyword::Ilike => "ILIKE",
            Keyword::Exists => "EXISTS",
            Keyword::Case => "CASE",
            Keyword::When => "WHEN",
            Keyword::Then => "THEN",
            Keyword::Else => "ELSE",
            Keyword::End => "END",
            Keyword::Cast => "CAST",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Interval => "INTERVAL",
            Keyword::Over => "OVER",
            Keyword::Partition => "PARTITION",
            Keyword::Insert => "INSERT",
            Keyword::Update => "UPDATE",
            Keyword::Delete => "DELETE",
            Keyword::Drop => "DROP",
            Keyword::Create => "CREATE",
            Keyword::Alter => "ALTER",
            Keyword::Truncate => "TRUNCATE",
            Keyword::Grant => "GRANT",
            Keyword::Revoke => "REVOKE",
            Keyword::Attach => "ATTACH",
            Keyword::Detach => "DETACH",
            Keyword::Rename => "RENAME",
            Keyword::Optimize => "OPTIMIZE",
            Keyword::Kill => "KILL",
            Keyword::System => "SYSTEM",
            Keyword::Admin => "ADMIN",
            Keyword::Set => "SET",
            Keyword::Use => "USE",
            Keyword::Exchange => "EXCHANGE",
            Keyword::Into => "INTO",
            Keyword::Outfile => "OUTFILE",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    Keyword(Keyword),
    Ident(&'a str),
    /// Contents between the quotes, doubled quote characters left as written.
    QuotedIdent(&'a str),
    Integer(&'a str),
    Float(&'a str),
    /// Contents between the quotes, `''` escapes left as written.
    String(&'a str),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    DoublePipe,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,

    Error(&'static str),
    Eof,
}

impl Token<'_> {
    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof)
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(kw) => write!(f, "{}", kw),
            Token::Ident(s) => write!(f, "{}", s),
            Token::QuotedIdent(s) => write!(f, "\"{}\"", s),
            Token::Integer(s) | Token::Float(s) => write!(f, "{}", s),
            Token::String(s) => write!(f, "'{}'", s),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::DoublePipe => f.write_str("||"),
            Token::Eq => f.write_str("="),
            Token::NotEq => f.write_str("!="),
            Token::Lt => f.write_str("<"),
            Token::LtEq => f.write_str("<="),
            Token::Gt => f.write_str(">"),
            Token::GtEq => f.write_str(">="),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Semicolon => f.write_str(";"),
            Token::Dot => f.write_str("."),
            Token::Error(msg) => write!(f, "<error: {}>", msg),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_end_and_range() {
        let span = Span::new(7, 4);
        assert_eq!(span.end(), 11);
        assert_eq!(span.range(), (7, 11));
    }

    #[test]
    fn token_display_is_sql_like() {
        assert_eq!(Token::Keyword(Keyword::Select).to_string(), "SELECT");
        assert_eq!(Token::String("it''s").to_string(), "'it''s'");
        assert_eq!(Token::GtEq.to_string(), ">=");
        assert_eq!(Token::Eof.to_string(), "end of input");
    }
}
